// Step and submit gates.
//
// Pure checks over `WizardState`; the engine decides what to do with a failure.

use crate::error::WizardError;
use crate::models::requests::SubmissionRecord;
use crate::models::state::{FieldName, ReferenceStatus, Step, WizardState};

pub const LOADING_MESSAGE: &str = "Reference data is still loading, please wait.";
pub const REFERENCE_REQUIRED_MESSAGE: &str = "Please select or enter a project code.";
pub const BRAND_REQUIRED_MESSAGE: &str = "Please select a brand.";
pub const BASICS_INCOMPLETE_MESSAGE: &str = "Basic steps are not complete.";

/// Checks whether the current step may be left forwards.
pub fn step_gate(state: &WizardState) -> Result<(), WizardError> {
    match &state.reference_status {
        ReferenceStatus::Loading => {
            return Err(WizardError::Validation(LOADING_MESSAGE.to_string()))
        }
        ReferenceStatus::Failed(reason) => return Err(WizardError::DataLoad(reason.clone())),
        ReferenceStatus::Ready(_) => {}
    }

    match state.step {
        Step::Reference if state.selections.resolved_reference().is_empty() => Err(
            WizardError::Validation(REFERENCE_REQUIRED_MESSAGE.to_string()),
        ),
        Step::Brand if state.selections.resolved_brand().is_empty() => {
            Err(WizardError::Validation(BRAND_REQUIRED_MESSAGE.to_string()))
        }
        _ => Ok(()),
    }
}

/// Checks submit preconditions and builds the outgoing record.
pub fn submit_gate(state: &WizardState) -> Result<SubmissionRecord, WizardError> {
    let reference = state.selections.resolved_reference();
    let brand = state.selections.resolved_brand();
    let shape = match state.shape {
        Some(shape) if !reference.is_empty() && !brand.is_empty() => shape,
        _ => return Err(WizardError::Validation(BASICS_INCOMPLETE_MESSAGE.to_string())),
    };

    if !state.fields.missing(shape).is_empty() {
        return Err(WizardError::Validation(format!(
            "Please fill in {}.",
            join_labels(shape.required_fields())
        )));
    }

    Ok(SubmissionRecord::build(shape, reference, brand, &state.fields))
}

/// "PO", "PO and Code", "PO, Part Number and Seri Number".
pub fn join_labels(names: &[FieldName]) -> String {
    let labels: Vec<&str> = names.iter().map(|n| n.label()).collect();
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::reference::BuiltinReferenceData;
    use crate::models::state::{RecordShape, NEW_REFERENCE_SENTINEL};

    fn ready_state() -> WizardState {
        let mut s = WizardState::new();
        s.reference_status = ReferenceStatus::Ready(BuiltinReferenceData::data());
        s
    }

    #[test]
    fn loading_blocks_every_step() {
        let mut s = WizardState::new();
        s.selections.reference = "PROJ-ALPHA".to_string();
        assert_eq!(
            step_gate(&s),
            Err(WizardError::Validation(LOADING_MESSAGE.to_string()))
        );
    }

    #[test]
    fn failed_load_blocks_with_data_load_error() {
        let mut s = ready_state();
        s.selections.reference = "PROJ-ALPHA".to_string();
        s.reference_status = ReferenceStatus::Failed("timeout".to_string());
        assert_eq!(
            step_gate(&s),
            Err(WizardError::DataLoad("timeout".to_string()))
        );
    }

    #[test]
    fn reference_step_needs_resolved_code() {
        let mut s = ready_state();
        assert!(step_gate(&s).is_err());

        s.selections.reference = NEW_REFERENCE_SENTINEL.to_string();
        s.selections.new_reference = "   ".to_string();
        assert!(step_gate(&s).is_err());

        s.selections.new_reference = "PROJ-NEW-1".to_string();
        assert_eq!(step_gate(&s), Ok(()));
    }

    #[test]
    fn brand_step_needs_brand() {
        let mut s = ready_state();
        s.step = Step::Brand;
        s.selections.reference = "PROJ-ALPHA".to_string();
        assert_eq!(
            step_gate(&s),
            Err(WizardError::Validation(BRAND_REQUIRED_MESSAGE.to_string()))
        );
        s.selections.brand = "SONY".to_string();
        assert_eq!(step_gate(&s), Ok(()));
    }

    #[test]
    fn submit_gate_lists_required_fields() {
        let mut s = ready_state();
        s.step = Step::Entry;
        s.selections.reference = "PROJ-ALPHA".to_string();
        s.selections.brand = "SAMSUNG".to_string();

        assert_eq!(
            submit_gate(&s),
            Err(WizardError::Validation(BASICS_INCOMPLETE_MESSAGE.to_string()))
        );

        s.shape = Some(RecordShape::Basic);
        assert_eq!(
            submit_gate(&s),
            Err(WizardError::Validation("Please fill in PO and Code.".to_string()))
        );

        s.shape = Some(RecordShape::Serialized);
        s.fields.po = "PO1".to_string();
        s.fields.part_number = "P1".to_string();
        assert_eq!(
            submit_gate(&s),
            Err(WizardError::Validation(
                "Please fill in PO, Part Number and Seri Number.".to_string()
            ))
        );

        s.fields.seri_number = " S-0001 ".to_string();
        let record = submit_gate(&s).expect("record");
        assert_eq!(record.shape(), RecordShape::Serialized);
        assert_eq!(record.scanned_value(), "S-0001");
    }

    #[test]
    fn installation_needs_location_cabinet_and_code() {
        let mut s = ready_state();
        s.step = Step::Entry;
        s.selections.reference = "PROJ-GAMMA".to_string();
        s.selections.brand = "SONY".to_string();
        s.shape = Some(RecordShape::Installation);
        s.fields.location = "ROW-A".to_string();
        s.fields.code = "DEV-000123".to_string();

        assert_eq!(
            submit_gate(&s),
            Err(WizardError::Validation(
                "Please fill in Location, Cabinet No and Code.".to_string()
            ))
        );

        s.fields.cabinet_no = "CAB-07".to_string();
        let record = submit_gate(&s).expect("record");
        assert_eq!(record.shape(), RecordShape::Installation);
        assert_eq!(record.scanned_value(), "DEV-000123");
    }

    #[test]
    fn join_labels_handles_short_lists() {
        assert_eq!(join_labels(&[]), "");
        assert_eq!(join_labels(&[FieldName::Po]), "PO");
    }
}
