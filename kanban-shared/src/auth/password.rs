/// Password hashing using Argon2id
///
/// Hashes are PHC strings, so verification reads the parameters back from
/// the stored hash and older hashes keep verifying after the cost changes.
///
/// # Parameters
///
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: configurable, default 3 (`BCRYPT_COST` maps onto this,
///   clamped to `1..=10`)
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use kanban_shared::auth::password::{PasswordHasherConfig, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = PasswordHasherConfig::with_time_cost(1);
/// let hash = hasher.hash("pw1")?;
///
/// assert!(verify_password("pw1", &hash)?);
/// assert!(!verify_password("pw2", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

pub const DEFAULT_TIME_COST: u32 = 3;
const MIN_TIME_COST: u32 = 1;
const MAX_TIME_COST: u32 = 10;

/// Argon2id cost settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasherConfig {
    /// Iterations (t_cost)
    pub time_cost: u32,
}

impl Default for PasswordHasherConfig {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
        }
    }
}

impl PasswordHasherConfig {
    /// Builds a config with the time cost clamped to `1..=10`
    pub fn with_time_cost(time_cost: u32) -> Self {
        Self {
            time_cost: time_cost.clamp(MIN_TIME_COST, MAX_TIME_COST),
        }
    }

    /// Reads `BCRYPT_COST`; unset or unparsable values fall back to the default
    pub fn from_env() -> Self {
        std::env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(Self::with_time_cost)
            .unwrap_or_default()
    }

    /// Hashes a password with a fresh 16-byte salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let params = ParamsBuilder::new()
            .m_cost(65536)
            .t_cost(self.time_cost)
            .p_cost(4)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }
}

/// Verifies a password against a PHC hash in constant time
///
/// Returns `Ok(false)` on mismatch and an error only for malformed hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasherConfig::with_time_cost(1);
        let hash = hasher.hash("pw1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("t=1"));
        assert!(verify_password("pw1", &hash).unwrap());
        assert!(!verify_password("pw2", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let hasher = PasswordHasherConfig::with_time_cost(1);
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_time_cost_is_clamped() {
        assert_eq!(PasswordHasherConfig::with_time_cost(0).time_cost, 1);
        assert_eq!(PasswordHasherConfig::with_time_cost(12).time_cost, 10);
        assert_eq!(PasswordHasherConfig::with_time_cost(4).time_cost, 4);
        assert_eq!(PasswordHasherConfig::default().time_cost, DEFAULT_TIME_COST);
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(matches!(
            verify_password("pw", "not-a-hash"),
            Err(PasswordError::InvalidHash(_))
        ));
    }
}
