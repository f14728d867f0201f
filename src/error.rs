use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use reqwest::Error as HttpError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;
use crate::model::{auth::PasswordError, mongodb::is_duplicate_key_error};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Outbound request failed: {0}")]
    Http(#[from] HttpError),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Construct a [`Error::NotFound`] for the given entity description.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Construct a [`Error::Forbidden`] for a resource owned by someone else.
    pub fn not_owner(what: impl Into<String>) -> Self {
        Self::Forbidden(format!("{} belongs to another organization", what.into()))
    }

    /// Translate a duplicate key failure on a unique index into a [`Error::Conflict`],
    /// passing every other database error through untouched.
    pub fn conflict_on_duplicate(err: DbError, what: impl Into<String>) -> Self {
        if is_duplicate_key_error(&err) {
            Self::Conflict(format!("{} already exists", what.into()))
        } else {
            Self::Db(err)
        }
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(err) if is_duplicate_key_error(err) => Status::Conflict,
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::InternalServerError,
            Self::Http(_) => Status::BadGateway,
            Self::Validation(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::InvalidState(_) => Status::UnprocessableEntity,
        }
    }
}

impl From<PasswordError> for Error {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Hashing(err) => Self::Argon2(err),
            err => Self::Validation(err.to_string()),
        }
    }
}

/// Body of every error response.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(req);
        if status.code >= 500 {
            error!("req{id}: {self}");
        } else {
            debug!("req{id}: {self}");
        }
        let body = Json(ErrorBody {
            message: self.to_string(),
        });
        (status, body).respond_to(req)
    }
}
