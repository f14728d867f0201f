use argon2::Config;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length of passwords generated for credential delivery.
const GENERATED_PASSWORD_LENGTH: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    TooShort,
    #[error(transparent)]
    Hashing(#[from] argon2::Error),
}

/// Hash a plaintext password for storage, enforcing the minimum length.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }

    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())?;
    Ok(hash)
}

/// Check a plaintext password against a stored hash.
/// A malformed hash never verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}

/// Generate a random alphanumeric password suitable for emailing to a new account.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}
