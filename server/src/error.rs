use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid grant `{0}`, expected `owner=token` or a bare token")]
    InvalidGrant(String),
}

pub type Result<A> = std::result::Result<A, Error>;
