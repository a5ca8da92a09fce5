/// Environment helpers used by every binary's `from_env()`
///
/// Values come from the process environment; binaries call
/// [`load_dotenv`] first so a local `.env` file is honoured in development.
///
/// # Example
///
/// ```
/// use kanban_shared::config::env_or;
///
/// let port: u16 = env_or("KANBAN_DOC_EXAMPLE_PORT", 8080).unwrap();
/// assert_eq!(port, 8080);
/// ```

use anyhow::{bail, Context, Result};
use std::str::FromStr;

/// Loads `.env` if present; a missing file is not an error
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Reads a required variable
pub fn env_required(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{} must be set", key),
    }
}

/// Reads an optional variable, ignoring empty values
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Reads and parses a variable, falling back to `default` when unset
pub fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} is invalid: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Boolean flag (`true`/`1`/`yes`), false when unset
pub fn env_flag(key: &str) -> bool {
    env_opt(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Deployment environment name (`APP_ENV`, default `development`)
pub fn app_env() -> String {
    env_opt("APP_ENV").unwrap_or_else(|| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_parses_and_defaults() {
        std::env::set_var("KANBAN_TEST_ENV_OR", "42");
        assert_eq!(env_or::<u32>("KANBAN_TEST_ENV_OR", 7).unwrap(), 42);
        assert_eq!(env_or::<u32>("KANBAN_TEST_ENV_OR_UNSET", 7).unwrap(), 7);

        std::env::set_var("KANBAN_TEST_ENV_OR_BAD", "forty");
        assert!(env_or::<u32>("KANBAN_TEST_ENV_OR_BAD", 7).is_err());
    }

    #[test]
    fn test_env_flag() {
        std::env::set_var("KANBAN_TEST_FLAG_ON", "TRUE");
        std::env::set_var("KANBAN_TEST_FLAG_OFF", "no");
        assert!(env_flag("KANBAN_TEST_FLAG_ON"));
        assert!(!env_flag("KANBAN_TEST_FLAG_OFF"));
        assert!(!env_flag("KANBAN_TEST_FLAG_UNSET"));
    }

    #[test]
    fn test_env_required_rejects_blank() {
        std::env::set_var("KANBAN_TEST_REQUIRED_BLANK", "  ");
        assert!(env_required("KANBAN_TEST_REQUIRED_BLANK").is_err());
    }
}
