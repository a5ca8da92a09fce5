/// Opaque token helpers: email confirmation tokens and token digests
///
/// Email tokens are 16 random bytes, hex-encoded (32 characters), valid for
/// 24 hours. A new token is refused while the previous one is younger than
/// 60 seconds. Refresh tokens are stored as their SHA-256 hex digest.
///
/// # Example
///
/// ```
/// use kanban_shared::auth::tokens::{generate_email_token, hash_token, constant_time_compare};
///
/// let token = generate_email_token();
/// assert_eq!(token.len(), 32);
///
/// let digest = hash_token(&token);
/// assert_eq!(digest.len(), 64);
/// assert!(constant_time_compare(&digest, &hash_token(&token)));
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Lifetime of an email confirmation token
pub fn email_token_ttl() -> Duration {
    Duration::hours(24)
}

/// Minimum spacing between two email tokens for the same user
pub fn email_token_throttle() -> Duration {
    Duration::seconds(60)
}

/// 16 random bytes, hex-encoded
pub fn generate_email_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex digest (64 characters)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// True once the token issued at `issued_at` is older than 24 hours
pub fn is_email_token_expired(issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - issued_at > email_token_ttl()
}

/// True while a token issued at `issued_at` still blocks re-issue
pub fn is_reissue_throttled(issued_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    issued_at
        .map(|at| now - at < email_token_throttle())
        .unwrap_or(false)
}

/// Constant-time string comparison
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
