/// Database connection pool management
///
/// A PostgreSQL pool built on sqlx, shared by every service. The pool is
/// created once at boot and injected into handlers; nothing holds it globally.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         host: "localhost".to_string(),
///         user: "kanban".to_string(),
///         password: "kanban".to_string(),
///         database: "kanban".to_string(),
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///
///     let row: (i64,) = sqlx::query_as("SELECT $1")
///         .bind(42i64)
///         .fetch_one(&pool)
///         .await?;
///
///     Ok(())
/// }
/// ```

use crate::config::{env_opt, env_or, env_required};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the database connection pool
///
/// Timeouts are in seconds so they map directly onto environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; when set it wins over the discrete fields
    pub url: Option<String>,

    /// Database host (`DB_HOST`)
    pub host: String,

    /// Database port (`DB_PORT`)
    pub port: u16,

    /// Role to connect as (`DB_USER`)
    pub user: String,

    /// Password (`DB_PASS`)
    pub password: String,

    /// Database name (`DB_NAME`)
    pub database: String,

    /// Maximum number of connections in the pool
    ///
    /// Default: 10
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool (seconds)
    pub connect_timeout_seconds: u64,

    /// How long a connection can remain idle before being closed (seconds)
    pub idle_timeout_seconds: Option<u64>,

    /// Maximum lifetime of a connection before forced recycling (seconds)
    pub max_lifetime_seconds: Option<u64>,

    /// Whether to test connections before returning them from the pool
    pub test_before_acquire: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
            test_before_acquire: true,
        }
    }
}

impl DatabaseConfig {
    /// Builds the config from `DB_*` variables
    ///
    /// `DATABASE_URL` overrides the discrete variables when present, which is
    /// what the integration tests use.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        if let Some(url) = env_opt("DATABASE_URL") {
            return Ok(Self {
                url: Some(url),
                max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
                ..defaults
            });
        }

        Ok(Self {
            url: None,
            host: env_or("DB_HOST", defaults.host.clone())?,
            port: env_or("DB_PORT", defaults.port)?,
            user: env_required("DB_USER")?,
            password: env_opt("DB_PASS").unwrap_or_default(),
            database: env_required("DB_NAME")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
            ..defaults
        })
    }

    /// Connection options for sqlx
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.url {
            return url.parse::<PgConnectOptions>();
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        Ok(options)
    }
}

/// Creates and initializes a PostgreSQL connection pool
///
/// Performs a health check before returning so a misconfigured database fails
/// at boot rather than on the first request.
///
/// # Errors
///
/// Returns an error if the options are invalid, the database is unreachable
/// or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        host = %config.host,
        database = %config.database,
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let mut pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .test_before_acquire(config.test_before_acquire);

    if let Some(idle_timeout) = config.idle_timeout_seconds {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
        debug!(idle_timeout_seconds = idle_timeout, "Set idle timeout");
    }

    if let Some(max_lifetime) = config.max_lifetime_seconds {
        pool_options = pool_options.max_lifetime(Duration::from_secs(max_lifetime));
        debug!(max_lifetime_seconds = max_lifetime, "Set max lifetime");
    }

    let pool = pool_options.connect_with(config.connect_options()?).await?;

    health_check(&pool).await?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Executes `SELECT 1` to verify the database is reachable
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");

    let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", result.0);
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}

/// Gracefully closes the connection pool during shutdown
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Database connection pool closed");
}
