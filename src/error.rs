//! Error types for report generation.
//!
//! Every variant here is fatal for the run. Recoverable conditions (a malformed
//! ticket count, a missing transition) never leave the metric extractors; they
//! collapse into an absent value for the affected metric instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    /// The tracker answered with a non-success status code.
    #[error("Jira responded with status code {status} for {path}")]
    Transport { status: u16, path: String },

    /// The request never produced a response (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A page was consumed without moving the offset while results remain.
    #[error("pagination stalled at offset {offset} of {total}")]
    PaginationStalled { offset: u64, total: u64 },

    /// The development-details endpoint returned GraphQL errors.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// A response body did not match the expected shape.
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        ReportError::Decode {
            context: context.into(),
            source,
        }
    }
}
