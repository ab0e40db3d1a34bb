use thiserror::Error;

use crate::domain::Source;

#[derive(Error, Debug)]
pub enum ConfluenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{backend} request failed: {message}")]
    SourceFetch { backend: Source, message: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No network and no cached copy of {url}")]
    Unavailable { url: String },

    #[error("Both accounts must be signed in before posting (missing: {})", list_sources(.missing))]
    DualAuthRequired { missing: Vec<Source> },

    #[error("Posted to {posted} but {failed} failed: {reason}")]
    PartialPost {
        posted: Source,
        failed: Source,
        reason: String,
    },

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("A message is already being sent")]
    ComposeInFlight,

    #[error("Cache lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Unrecognized timestamp: {0}")]
    Timestamp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

fn list_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ConfluenceError>;
