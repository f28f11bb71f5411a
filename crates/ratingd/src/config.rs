//! Command-line and environment configuration for `ratingd`.

use std::net::SocketAddr;

use clap::Parser;

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Parser)]
#[command(name = "ratingd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classroom rating HTTP service", long_about = None)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "RATING_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "RATING_LOG_JSON")]
    pub json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_parse() {
        let args =
            ServerArgs::try_parse_from(["ratingd", "--bind", "127.0.0.1:8080", "--json", "-v"])
                .unwrap();
        assert_eq!(args.bind, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(args.json);
        assert!(args.verbose);
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        assert!(ServerArgs::try_parse_from(["ratingd", "--bind", "not-an-addr"]).is_err());
    }

    #[test]
    fn default_bind_is_valid() {
        assert!(DEFAULT_BIND.parse::<SocketAddr>().is_ok());
    }
}
