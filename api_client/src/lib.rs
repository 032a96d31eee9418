pub mod cache;
pub mod client;
pub mod error;
pub mod model;
pub mod validation;

pub use cache::{MutationCache, MutationKind, MutationState};
pub use client::{ApiClient, BookApi, Session};
pub use error::{Error, ErrorKind};
