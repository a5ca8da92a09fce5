/// Configuration for the edge gateway
///
/// # Environment Variables
///
/// - `HOST`: Host to bind to (default: 0.0.0.0)
/// - `PORT`: Port to bind to (default: 8080)
/// - `USER_SERVICE_ADDR`: identity service address (required)
/// - `BOARD_SERVICE_ADDR`, `LIST_SERVICE_ADDR`, `CARD_SERVICE_ADDR`: entity
///   service addresses (required)
/// - `CORS_ORIGINS`: comma separated origins, or `*` (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `RPC_TIMEOUT_MS`: per-request budget for internal calls (default: 5000)
///
/// # Example
///
/// ```no_run
/// use kanban_gateway::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Gateway will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use kanban_shared::config::{env_flag, env_opt, env_or, env_required};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,

    pub services: ServiceAddrs,

    /// Budget for one proxied call, forwarded as the RPC deadline
    pub rpc_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Adds HSTS to every response
    pub production: bool,
}

/// Addresses of the internal services (`host:port` or `http://host:port`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAddrs {
    pub identity: String,
    pub board: String,
    pub list: String,
    pub card: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a service address is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        let cors_origins = parse_origins(&env_opt("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()));
        let timeout_ms: u64 = env_or("RPC_TIMEOUT_MS", 5000)?;
        if timeout_ms == 0 {
            anyhow::bail!("RPC_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0".to_string())?,
                port: env_or("PORT", 8080)?,
                cors_origins,
                production: env_flag("PRODUCTION"),
            },
            services: ServiceAddrs {
                identity: env_required("USER_SERVICE_ADDR")?,
                board: env_required("BOARD_SERVICE_ADDR")?,
                list: env_required("LIST_SERVICE_ADDR")?,
                card: env_required("CARD_SERVICE_ADDR")?,
            },
            rpc_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn permissive_cors(&self) -> bool {
        self.server.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(origins: &[&str]) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: origins.iter().map(|o| o.to_string()).collect(),
                production: false,
            },
            services: ServiceAddrs {
                identity: "localhost:50051".to_string(),
                board: "localhost:50052".to_string(),
                list: "localhost:50053".to_string(),
                card: "localhost:50054".to_string(),
            },
            rpc_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config(&["*"]).bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://a.example, ,https://b.example "),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_permissive_cors() {
        assert!(config(&["*"]).permissive_cors());
        assert!(!config(&["https://app.example"]).permissive_cors());
    }
}
