//! Thin reqwest wrapper over the rating HTTP API.

use anyhow::{anyhow, bail, Context, Result};
use rating_core::{CreateSessionRequest, Session, SessionSummary, SubmitEvaluationRequest};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub struct RatingClient {
    http: reqwest::Client,
    base: String,
}

impl RatingClient {
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn health(&self) -> Result<Value> {
        let resp = self.send(self.http.get(self.url("/health"))).await?;
        decode(resp).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let resp = self.send(self.http.get(self.url("/sessions"))).await?;
        decode(resp).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Session> {
        let resp = self
            .send(self.http.get(self.url(&format!("/sessions/{id}"))))
            .await?;
        decode(resp).await
    }

    pub async fn session_summary(&self, id: &str) -> Result<SessionSummary> {
        let resp = self
            .send(self.http.get(self.url(&format!("/sessions/{id}/summary"))))
            .await?;
        decode(resp).await
    }

    pub async fn create_session(&self, request: &CreateSessionRequest) -> Result<Session> {
        let resp = self
            .send(self.http.post(self.url("/sessions")).json(request))
            .await?;
        decode(resp).await
    }

    pub async fn submit_evaluation(&self, request: &SubmitEvaluationRequest) -> Result<Session> {
        let resp = self
            .send(self.http.post(self.url("/evaluations")).json(request))
            .await?;
        decode(resp).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let resp = self
            .send(self.http.delete(self.url(&format!("/sessions/{id}"))))
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        request
            .send()
            .await
            .with_context(|| format!("failed to reach rating server at {}", self.base))
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.trim().to_string()
    };

    match status {
        StatusCode::NOT_FOUND => Err(anyhow!("not found: {message}")),
        StatusCode::BAD_REQUEST => Err(anyhow!("rejected: {message}")),
        _ => bail!("server error ({}): {message}", status.as_u16()),
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let resp = check(resp).await?;
    resp.json::<T>()
        .await
        .context("unexpected response body from rating server")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rating_core::{Criterion, RatingService, Ratings};
    use rating_state::MemorySessionStore;
    use ratingd::ServerHandle;

    async fn spawn() -> (ServerHandle, RatingClient) {
        let service = RatingService::new(Arc::new(MemorySessionStore::new()));
        let server = ratingd::start("127.0.0.1:0".parse().unwrap(), service)
            .await
            .unwrap();
        let client = RatingClient::new(&format!("{}/", server.base_url()));
        (server, client)
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RatingClient::new("http://localhost:3000/");
        assert_eq!(client.url("/sessions"), "http://localhost:3000/sessions");
    }

    #[tokio::test]
    async fn full_round_trip_through_server() {
        let (server, client) = spawn().await;

        assert_eq!(client.health().await.unwrap()["status"], "ok");

        let session = client
            .create_session(&CreateSessionRequest {
                presenter: "Alice".to_string(),
                created_by: None,
                criteria: Some(vec![Criterion::new("clarity", "Clarity", 1.0)]),
            })
            .await
            .unwrap();

        let ratings: Ratings = [("clarity".to_string(), 5)].into_iter().collect();
        let updated = client
            .submit_evaluation(&SubmitEvaluationRequest {
                session_id: session.id.clone(),
                evaluator: Some("Bob".to_string()),
                ratings,
                overall_score: Some(5.0),
            })
            .await
            .unwrap();
        assert_eq!(updated.evaluations.len(), 1);

        let summary = client.session_summary(&session.id).await.unwrap();
        assert_eq!(summary.average_overall, Some(5.0));

        assert_eq!(client.list_sessions().await.unwrap().len(), 1);
        client.delete_session(&session.id).await.unwrap();

        let err = client.get_session(&session.id).await.unwrap_err();
        assert!(err.to_string().starts_with("not found"));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn validation_errors_surface_server_message() {
        let (server, client) = spawn().await;
        let err = client
            .create_session(&CreateSessionRequest::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("presenter is required"));
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_server_is_reported() {
        let client = RatingClient::new("http://127.0.0.1:1");
        let err = client.list_sessions().await.unwrap_err();
        assert!(err.to_string().contains("failed to reach rating server"));
    }
}
