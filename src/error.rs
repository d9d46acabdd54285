use thiserror::Error;
use std::io;

/// Shown to readers whenever the catalog could not be reached or understood.
pub const CATALOG_FAILURE_MESSAGE: &str = "An unexpected error occurred. Something may be wrong with \
     the plugin catalog or this server's configuration.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Both the secure and the plain request failed (or the only one tried).
    #[error("{message} ({detail})")]
    Transport { message: String, detail: String },
    /// The body did not decode to a JSON object or array.
    #[error("{message}")]
    MalformedResponse { message: String, body: String },
    /// The catalog answered with an explicit error, e.g. "Plugin not found."
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl FetchError {
    pub fn transport(detail: impl Into<String>) -> Self {
        FetchError::Transport {
            message: CATALOG_FAILURE_MESSAGE.to_string(),
            detail: detail.into(),
        }
    }

    pub fn malformed(body: impl Into<String>) -> Self {
        FetchError::MalformedResponse {
            message: CATALOG_FAILURE_MESSAGE.to_string(),
            body: body.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("plugin record has no slug")]
    MissingSlug,
    #[error("plugin {slug} has no icons")]
    MissingIcons { slug: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Invalid plugin: {0}")]
    Validation(#[from] ValidationError),
}
