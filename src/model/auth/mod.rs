mod password;
mod token;
mod user;

pub use password::{
    generate_password, hash_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH,
};
pub use token::{session_cookie, AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};
