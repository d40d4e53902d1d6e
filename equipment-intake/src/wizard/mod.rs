pub mod engine;
pub mod gates;

pub use engine::{
    GateOutcome, PendingSubmission, ReferenceLoadTicket, ScanCommit, ScanTicket,
    SubmitDisposition, WizardEngine,
};
