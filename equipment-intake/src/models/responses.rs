// Response-side models for the form-ingestion endpoint.

use serde::Deserialize;

/// Body returned by the endpoint: `{ "status": "success" }` or `{ "status": "error", "message": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponseBody {
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Normalized result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    /// `message` is `None` when the server reported failure without saying why.
    Error { message: Option<String> },
}

impl SubmitOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        SubmitOutcome::Error {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success)
    }
}
