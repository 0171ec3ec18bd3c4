//! Runtime configuration, read from command-line flags with environment
//! variable fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;
use tracing::warn;

use crate::application::TokenSigner;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_DATABASE: &str = "trip-ledger.db";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
const SESSION_FILE_NAME: &str = ".trip-ledger-session.json";

/// Settings for `trip-ledger serve`.
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "TRIP_LEDGER_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "TRIP_LEDGER_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Secret used to sign bearer tokens; a random one is generated when unset
    #[arg(long, env = "TRIP_LEDGER_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Lifetime of issued tokens, in hours
    #[arg(
        long,
        env = "TRIP_LEDGER_TOKEN_TTL_HOURS",
        default_value_t = DEFAULT_TOKEN_TTL_HOURS,
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    pub token_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            database: PathBuf::from(DEFAULT_DATABASE),
            token_secret: None,
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

impl ServerConfig {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }

    pub fn signer(&self) -> TokenSigner {
        match self.token_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => TokenSigner::new(secret.as_bytes(), self.token_ttl()),
            None => {
                warn!("TRIP_LEDGER_TOKEN_SECRET not set; tokens will not survive a restart");
                TokenSigner::random(self.token_ttl())
            }
        }
    }
}

/// Settings shared by every client command.
#[derive(Debug, Clone, Args)]
pub struct ClientConfig {
    /// Base URL of the trip-ledger API
    #[arg(long, global = true, env = "TRIP_LEDGER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// File holding the bearer token between invocations
    #[arg(long, global = true, env = "TRIP_LEDGER_SESSION_FILE")]
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Session file path: the configured one, else one in the home directory.
    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session_file {
            return path.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(SESSION_FILE_NAME),
            None => PathBuf::from(SESSION_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.token_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_configured_secret_is_stable() {
        let config = ServerConfig {
            token_secret: Some("s3cret".into()),
            ..ServerConfig::default()
        };
        let user = crate::domain::User::new(
            crate::domain::Registration {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                password: "secret1".into(),
            },
            String::new(),
        );
        let token = config.signer().issue(&user).unwrap();
        assert!(config.signer().verify(&token).is_ok());
    }

    #[test]
    fn test_explicit_session_file_wins() {
        let config = ClientConfig {
            session_file: Some(PathBuf::from("/tmp/s.json")),
            ..ClientConfig::default()
        };
        assert_eq!(config.session_path(), PathBuf::from("/tmp/s.json"));
    }
}
