/// Database layer
///
/// Connection pooling and schema migrations. Models live in the `models`
/// module at crate root level.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
