//! Listener lifecycle for the HTTP service.

use std::future::Future;
use std::net::SocketAddr;

use rating_core::RatingService;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::{build_router, AppState};

/// Handle returned by [`start`]. Dropping it leaves the server running until
/// the runtime stops; call [`ServerHandle::shutdown`] to stop it gracefully.
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Base URL for clients, e.g. `http://127.0.0.1:41234`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> std::io::Result<()> {
        let _ = self.shutdown_tx.send(());
        match self.task.await {
            Ok(result) => result,
            Err(join_err) => Err(std::io::Error::other(join_err)),
        }
    }
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: RatingService,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(AppState::new(service));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind `addr` and serve in a background task. Port `0` picks a free port.
pub async fn start(addr: SocketAddr, service: RatingService) -> std::io::Result<ServerHandle> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let backend = service.backend_name();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(serve(listener, service, async move {
        let _ = shutdown_rx.await;
    }));

    tracing::info!(addr = %local_addr, backend, "rating service listening");

    Ok(ServerHandle {
        local_addr,
        shutdown_tx,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rating_state::MemorySessionStore;

    #[tokio::test]
    async fn server_starts_and_shuts_down() {
        let service = RatingService::new(Arc::new(MemorySessionStore::new()));
        let handle = start("127.0.0.1:0".parse().unwrap(), service).await.unwrap();
        assert!(handle.local_addr.port() > 0);
        assert!(handle.base_url().starts_with("http://127.0.0.1:"));
        handle.shutdown().await.unwrap();
    }
}
