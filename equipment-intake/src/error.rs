//! Error taxonomy for the wizard and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

use crate::scan::ScanFailure;

/// Every failure the engine reports to the user. None of these are fatal: each one leaves the
/// wizard in a state the user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// Blocks a single transition; fixed by editing the form.
    #[error("{0}")]
    Validation(String),

    /// Reference lists are unavailable; blocks forward progress until a reload succeeds.
    #[error("Could not load data: {0}. Please reload.")]
    DataLoad(String),

    /// Local to one scan attempt; session state is untouched.
    #[error(transparent)]
    Scan(#[from] ScanFailure),

    /// Submission failed; entered fields are kept for a retry.
    #[error("{0}")]
    Submission(String),
}

impl WizardError {
    pub fn kind(&self) -> &'static str {
        match self {
            WizardError::Validation(_) => "validation",
            WizardError::DataLoad(_) => "data_load",
            WizardError::Scan(_) => "scan",
            WizardError::Submission(_) => "submission",
        }
    }
}

/// Failure of a reference-data provider.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference data: {0}")]
    Parse(String),

    #[error("the {0} list is empty")]
    Empty(&'static str),
}

impl From<DataLoadError> for WizardError {
    fn from(e: DataLoadError) -> Self {
        WizardError::DataLoad(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_load_error_message_names_the_cause() {
        let err: WizardError = DataLoadError::Empty("brand").into();
        assert_eq!(err.kind(), "data_load");
        assert_eq!(
            err.to_string(),
            "Could not load data: the brand list is empty. Please reload."
        );
    }

    #[test]
    fn scan_errors_keep_their_own_message() {
        let err: WizardError = ScanFailure::NoCodeFound.into();
        assert_eq!(err.kind(), "scan");
        assert_eq!(err.to_string(), ScanFailure::NoCodeFound.to_string());
    }
}
