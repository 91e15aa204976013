use reqwest::{Error as ReqwestError, StatusCode};
use serde_json::Error as SerdeJsonError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
#[error("Credential error: {hint}")]
pub struct CredentialError {
    pub hint: String,
}

#[derive(ThisError, Debug)]
pub enum RemoteError {
    #[error("Serializing error: {0}")]
    SerializingError(
        #[source]
        #[from]
        SerdeJsonError,
    ),
    #[error("Credential error: {0}")]
    Credential(#[source] CredentialError),
    #[error("Failed to read file: {0}")]
    ReadFile(#[source] std::io::Error),
    #[error("HTTP build error: {0}")]
    HttpBuilderError(#[source] ReqwestError),
    #[error("HTTP error: {0}")]
    HttpError(#[source] ReqwestError),
    #[error("Platform: bad request")]
    BadRequest,
    #[error("Platform: unauthorized")]
    Unauthorized,
    #[error("Platform: not found")]
    NotFound,
    #[error("Platform: internal server error")]
    InternalServerError,
    #[error("Platform: unknown status code: {0}")]
    UnknownStatusCode(u16),
}

impl From<StatusCode> for RemoteError {
    fn from(status_code: StatusCode) -> Self {
        match status_code {
            StatusCode::BAD_REQUEST => RemoteError::BadRequest,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
            StatusCode::NOT_FOUND => RemoteError::NotFound,
            StatusCode::INTERNAL_SERVER_ERROR => RemoteError::InternalServerError,
            _ => RemoteError::UnknownStatusCode(status_code.as_u16()),
        }
    }
}

#[derive(ThisError, Debug)]
pub enum StateError {
    #[error("Failed to read state: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to write state: {0}")]
    Write(#[source] std::io::Error),
    #[error("Failed to parse state: {0}")]
    Parse(#[source] SerdeJsonError),
    #[error("Failed to serialize state: {0}")]
    Serialize(#[source] SerdeJsonError),
}
