use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The server could not be reached, answered with a status above 206, or
    /// the response body could not be read. Never retried.
    #[error("HTTP request failed: {}", transport_detail(.status, .reason))]
    Transport { status: Option<u16>, reason: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

fn transport_detail(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("{code} {reason}"),
        None => reason.to_string(),
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport {
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display() {
        let err = Error::Transport {
            status: Some(500),
            reason: "Internal Server Error".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP request failed: 500 Internal Server Error"
        );

        let err = Error::Transport {
            status: None,
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP request failed: connection refused");
    }
}
