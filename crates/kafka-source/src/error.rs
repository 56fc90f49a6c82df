use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The brokers could not be reached, rejected our credentials, or the
    /// subscription could not be registered. Raised only by `connect`.
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Background task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, Error>;
