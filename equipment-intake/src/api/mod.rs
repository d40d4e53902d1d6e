pub mod reference;
pub mod submission;
