/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: access and refresh JWTs
/// - [`tokens`]: email confirmation tokens and token digests
///
/// Bearer verification itself happens in the identity service
/// (`Authenticate`); the gateway only forwards the token.
///
/// # Example
///
/// ```no_run
/// use kanban_shared::auth::password::{PasswordHasherConfig, verify_password};
/// use kanban_shared::auth::jwt::{create_token, Claims, TokenType};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = PasswordHasherConfig::from_env().hash("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(1, TokenType::Access), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod tokens;
