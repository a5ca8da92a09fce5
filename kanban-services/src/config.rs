/// Service configuration
///
/// One binary hosts any of the four services; the service is chosen on the
/// command line and the rest comes from the environment.
///
/// # Environment Variables
///
/// - `PORT`: listen port (identity 50051, board 50052, list 50053, card 50054)
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `USER_SERVICE_ADDR`: identity service address, required by board, list
///   and card for role checks
/// - `SECRET_KEY`: JWT signing secret, identity only, at least 32 characters
/// - `RUN_MIGRATIONS`: identity applies migrations at boot when `true`
/// - `RPC_TIMEOUT_MS`: timeout for calls to the identity service (default 5000)
/// - database and broker variables, see [`DatabaseConfig`] and [`EventBusConfig`]

use anyhow::{bail, Context, Result};
use kanban_shared::config::{env_flag, env_or, env_required};
use kanban_shared::db::pool::DatabaseConfig;
use kanban_shared::events::EventBusConfig;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Minimum accepted JWT secret length
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Identity,
    Board,
    List,
    Card,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Identity => "identity",
            ServiceKind::Board => "board",
            ServiceKind::List => "list",
            ServiceKind::Card => "card",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ServiceKind::Identity => 50051,
            ServiceKind::Board => 50052,
            ServiceKind::List => 50053,
            ServiceKind::Card => 50054,
        }
    }

    /// Whether the service publishes or consumes events
    pub fn uses_event_bus(&self) -> bool {
        !matches!(self, ServiceKind::Identity)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" | "user" => Ok(ServiceKind::Identity),
            "board" => Ok(ServiceKind::Board),
            "list" => Ok(ServiceKind::List),
            "card" => Ok(ServiceKind::Card),
            other => bail!("unknown service {:?} (expected identity, board, list or card)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub kind: ServiceKind,

    pub addr: SocketAddr,

    pub database: DatabaseConfig,

    /// Broker settings; `None` for the identity service
    pub event_bus: Option<EventBusConfig>,

    /// Identity service address for role checks; `None` for identity itself
    pub identity_addr: Option<String>,

    /// JWT secret; identity only
    pub secret_key: Option<String>,

    pub run_migrations: bool,

    pub rpc_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env(kind: ServiceKind) -> Result<Self> {
        let host: String = env_or("HOST", "0.0.0.0".to_string())?;
        let port: u16 = env_or("PORT", kind.default_port())?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let database = DatabaseConfig::from_env()?;

        let event_bus = if kind.uses_event_bus() {
            Some(EventBusConfig::from_env()?)
        } else {
            None
        };

        let (identity_addr, secret_key) = match kind {
            ServiceKind::Identity => {
                let secret = env_required("SECRET_KEY")?;
                validate_secret(&secret)?;
                (None, Some(secret))
            }
            _ => (Some(env_required("USER_SERVICE_ADDR")?), None),
        };

        Ok(Self {
            kind,
            addr,
            database,
            event_bus,
            identity_addr,
            secret_key,
            run_migrations: env_flag("RUN_MIGRATIONS"),
            rpc_timeout: Duration::from_millis(env_or("RPC_TIMEOUT_MS", 5000u64)?),
        })
    }

    /// Log-safe summary
    pub fn summary(&self) -> String {
        format!(
            "service={} addr={} db={} identity={}",
            self.kind,
            self.addr,
            self.database.database,
            self.identity_addr.as_deref().unwrap_or("-"),
        )
    }
}

pub fn validate_secret(secret: &str) -> Result<()> {
    if secret.len() < MIN_SECRET_LEN {
        bail!("SECRET_KEY must be at least {} characters", MIN_SECRET_LEN);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_kind_parse() {
        assert_eq!("identity".parse::<ServiceKind>().unwrap(), ServiceKind::Identity);
        assert_eq!(" Board ".parse::<ServiceKind>().unwrap(), ServiceKind::Board);
        assert_eq!("user".parse::<ServiceKind>().unwrap(), ServiceKind::Identity);
        assert!("gateway".parse::<ServiceKind>().is_err());
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(ServiceKind::Identity.default_port(), 50051);
        assert_eq!(ServiceKind::Card.default_port(), 50054);
    }

    #[test]
    fn test_only_entity_services_use_the_bus() {
        assert!(!ServiceKind::Identity.uses_event_bus());
        assert!(ServiceKind::List.uses_event_bus());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(validate_secret("short").is_err());
        assert!(validate_secret(&"k".repeat(32)).is_ok());
    }
}
