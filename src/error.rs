use std::path::PathBuf;
use thiserror::Error;

/// Failures at the boundary of the two outbound HTTP clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion contained no text")]
    EmptyCompletion,
    #[error("could not read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ClientError {
    /// Builds a `Status` error, keeping at most the first 800 bytes of the body.
    pub fn status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.trim();
        let body = if body.len() > 800 {
            let mut end = 800;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body.to_string()
        };
        ClientError::Status { status, body }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
