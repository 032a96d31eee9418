use reqwest::StatusCode;
use std::{fmt, result::Result as StdResult};
use thiserror::Error;

use crate::model::BookId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No response from the server {0}")]
    Network(#[source] reqwest::Error),

    #[error("Could not build the request {0}")]
    Request(#[source] reqwest::Error),

    #[error("Request failed ({status}): {reason}")]
    Server { status: StatusCode, reason: String },

    #[error("Not authorized, the session needs to sign in again")]
    Auth,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No such book `{0}`")]
    NotFound(BookId),

    #[error("Unexpected response body {0}")]
    Decode(#[source] reqwest::Error),

    #[error("JSON marshalling failed {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value)
        } else if value.is_builder() {
            Self::Request(value)
        } else {
            Self::Network(value)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Request,
    Server,
    Auth,
    Validation,
    NotFound,
    Decode,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) => ErrorKind::Network,
            Error::Request(_) => ErrorKind::Request,
            Error::Server { .. } => ErrorKind::Server,
            Error::Auth => ErrorKind::Auth,
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Decode(_) | Error::Json(_) => ErrorKind::Decode,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Server)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::Request => "request",
            ErrorKind::Server => "server",
            ErrorKind::Auth => "auth",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Decode => "decode",
        };
        f.write_str(name)
    }
}

pub type Result<A> = StdResult<A, Error>;
