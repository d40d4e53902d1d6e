// Wizard session state (in-memory)
//
// NOTE: This is NOT persisted. One `WizardState` lives for one entry session and is only mutated
// through `wizard::engine::WizardEngine`, which keeps the invariants documented on each type.

use crate::models::requests::ReferenceData;
use crate::notify::Notice;

/// Reference value that switches step 1 to free-text entry of a new project code.
pub const NEW_REFERENCE_SENTINEL: &str = "NEW_CODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Reference,
    Brand,
    Entry,
}

impl Step {
    pub const FIRST: Step = Step::Reference;
    pub const LAST: Step = Step::Entry;

    /// 1-based position, as shown to the user.
    pub fn ordinal(self) -> u8 {
        match self {
            Step::Reference => 1,
            Step::Brand => 2,
            Step::Entry => 3,
        }
    }

    pub fn next(self) -> Option<Step> {
        match self {
            Step::Reference => Some(Step::Brand),
            Step::Brand => Some(Step::Entry),
            Step::Entry => None,
        }
    }

    pub fn prev(self) -> Option<Step> {
        match self {
            Step::Reference => None,
            Step::Brand => Some(Step::Reference),
            Step::Entry => Some(Step::Brand),
        }
    }
}

/// Shape-specific fields captured on the entry step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Po,
    Code,
    PartNumber,
    SeriNumber,
    Location,
    Cabinet,
}

impl FieldName {
    pub const ALL: [FieldName; 6] = [
        FieldName::Po,
        FieldName::Code,
        FieldName::PartNumber,
        FieldName::SeriNumber,
        FieldName::Location,
        FieldName::Cabinet,
    ];

    /// Wire key used in the submission payload.
    pub fn key(self) -> &'static str {
        match self {
            FieldName::Po => "po",
            FieldName::Code => "code",
            FieldName::PartNumber => "partNumber",
            FieldName::SeriNumber => "seriNumber",
            FieldName::Location => "location",
            FieldName::Cabinet => "cabinet_no",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldName::Po => "PO",
            FieldName::Code => "Code",
            FieldName::PartNumber => "Part Number",
            FieldName::SeriNumber => "Seri Number",
            FieldName::Location => "Location",
            FieldName::Cabinet => "Cabinet No",
        }
    }
}

/// Which field set the entry step requires ("form type" on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Form type 1: PO + code.
    Basic,
    /// Form type 2: PO + part number + serial number.
    Serialized,
    /// Installation batch: location + cabinet + device code. Location and cabinet carry over
    /// between saves while devices of one cabinet are scanned in.
    Installation,
}

impl RecordShape {
    pub const ALL: [RecordShape; 3] = [
        RecordShape::Basic,
        RecordShape::Serialized,
        RecordShape::Installation,
    ];

    /// Variant number used by `--form` and the endpoint settings.
    pub fn form_type(self) -> u8 {
        match self {
            RecordShape::Basic => 1,
            RecordShape::Serialized => 2,
            RecordShape::Installation => 3,
        }
    }

    /// Short name for titles: "Form 1", "Form 2", "Installation".
    pub fn title(self) -> String {
        match self {
            RecordShape::Installation => "Installation".to_string(),
            other => format!("Form {}", other.form_type()),
        }
    }

    pub fn required_fields(self) -> &'static [FieldName] {
        match self {
            RecordShape::Basic => &[FieldName::Po, FieldName::Code],
            RecordShape::Serialized => &[
                FieldName::Po,
                FieldName::PartNumber,
                FieldName::SeriNumber,
            ],
            RecordShape::Installation => {
                &[FieldName::Location, FieldName::Cabinet, FieldName::Code]
            }
        }
    }

    /// Field fed by passive and image scans.
    pub fn scan_field(self) -> FieldName {
        match self {
            RecordShape::Basic | RecordShape::Installation => FieldName::Code,
            RecordShape::Serialized => FieldName::SeriNumber,
        }
    }

    /// Fields emptied after a successful save. Batch shapes stay active and keep the rest.
    pub fn cleared_after_save(self) -> &'static [FieldName] {
        match self {
            RecordShape::Installation => &[FieldName::Code],
            _ => &FieldName::ALL,
        }
    }

    /// Whether the shape stays selected after a successful save.
    pub fn is_batch(self) -> bool {
        self == RecordShape::Installation
    }

    pub fn owns(self, field: FieldName) -> bool {
        self.required_fields().contains(&field)
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordShape::Basic => "Form 1 (PO, Code)",
            RecordShape::Serialized => "Form 2 (PO, Part, Seri)",
            RecordShape::Installation => "Installation (Location, Cabinet, Code)",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub po: String,
    pub code: String,
    pub part_number: String,
    pub seri_number: String,
    pub location: String,
    pub cabinet_no: String,
}

impl Fields {
    pub fn get(&self, name: FieldName) -> &str {
        match name {
            FieldName::Po => &self.po,
            FieldName::Code => &self.code,
            FieldName::PartNumber => &self.part_number,
            FieldName::SeriNumber => &self.seri_number,
            FieldName::Location => &self.location,
            FieldName::Cabinet => &self.cabinet_no,
        }
    }

    pub fn set(&mut self, name: FieldName, value: String) {
        match name {
            FieldName::Po => self.po = value,
            FieldName::Code => self.code = value,
            FieldName::PartNumber => self.part_number = value,
            FieldName::SeriNumber => self.seri_number = value,
            FieldName::Location => self.location = value,
            FieldName::Cabinet => self.cabinet_no = value,
        }
    }

    pub fn clear(&mut self) {
        *self = Fields::default();
    }

    /// Empties every field the given shape does not require. Fields it shares with the previous
    /// shape (PO, Code) survive.
    pub fn retain_only(&mut self, shape: RecordShape) {
        for name in FieldName::ALL {
            if !shape.owns(name) {
                self.set(name, String::new());
            }
        }
    }

    /// Required fields of `shape` that are blank after trimming.
    pub fn missing(&self, shape: RecordShape) -> Vec<FieldName> {
        shape
            .required_fields()
            .iter()
            .copied()
            .filter(|f| self.get(*f).trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    /// Raw project-code selection (may be the create-new sentinel).
    pub reference: String,
    /// Free text used when `reference` is the sentinel.
    pub new_reference: String,
    pub brand: String,
}

impl Selections {
    pub fn is_new_reference(&self) -> bool {
        self.reference == NEW_REFERENCE_SENTINEL
    }

    /// Effective project code after applying the create-new override.
    pub fn resolved_reference(&self) -> &str {
        if self.is_new_reference() {
            self.new_reference.trim()
        } else {
            self.reference.trim()
        }
    }

    pub fn resolved_brand(&self) -> &str {
        self.brand.trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    InFlight,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceStatus {
    #[default]
    Loading,
    Ready(ReferenceData),
    Failed(String),
}

impl ReferenceStatus {
    pub fn data(&self) -> Option<&ReferenceData> {
        match self {
            ReferenceStatus::Ready(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub step: Step,
    pub selections: Selections,
    pub shape: Option<RecordShape>,
    pub fields: Fields,
    pub submission_status: SubmissionStatus,
    pub reference_status: ReferenceStatus,
    pub last_message: Option<Notice>,
    /// Monotonic counter backing `Notice::token`.
    pub message_seq: u64,
    /// Bumped whenever in-progress entry is abandoned; async completions carry the value
    /// captured when they were started.
    pub generation: u64,
}

impl WizardState {
    pub fn new() -> Self {
        Self {
            step: Step::FIRST,
            selections: Selections::default(),
            shape: None,
            fields: Fields::default(),
            submission_status: SubmissionStatus::Idle,
            reference_status: ReferenceStatus::Loading,
            last_message: None,
            message_seq: 0,
            generation: 0,
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_bounds_are_closed() {
        assert_eq!(Step::FIRST.prev(), None);
        assert_eq!(Step::LAST.next(), None);
        assert_eq!(Step::Reference.next(), Some(Step::Brand));
        assert_eq!(Step::Entry.prev(), Some(Step::Brand));
        assert_eq!(Step::Entry.ordinal(), 3);
    }

    #[test]
    fn resolved_reference_prefers_override_only_for_sentinel() {
        let mut s = Selections {
            reference: "PROJ-ALPHA".to_string(),
            new_reference: "IGNORED".to_string(),
            brand: String::new(),
        };
        assert_eq!(s.resolved_reference(), "PROJ-ALPHA");

        s.reference = NEW_REFERENCE_SENTINEL.to_string();
        s.new_reference = "  PROJ-NEW-1 ".to_string();
        assert_eq!(s.resolved_reference(), "PROJ-NEW-1");

        s.new_reference = "   ".to_string();
        assert_eq!(s.resolved_reference(), "");
    }

    #[test]
    fn retain_only_keeps_shared_po() {
        let mut f = Fields {
            po: "PO1".to_string(),
            code: "C1".to_string(),
            part_number: "P1".to_string(),
            seri_number: "S1".to_string(),
            ..Fields::default()
        };
        f.retain_only(RecordShape::Serialized);
        assert_eq!(f.po, "PO1");
        assert_eq!(f.code, "");
        assert_eq!(f.part_number, "P1");
        assert_eq!(f.seri_number, "S1");

        f.retain_only(RecordShape::Basic);
        assert_eq!(f.po, "PO1");
        assert_eq!(f.part_number, "");
        assert_eq!(f.seri_number, "");
    }

    #[test]
    fn installation_shares_only_code_with_basic() {
        let mut f = Fields {
            po: "PO1".to_string(),
            code: "C1".to_string(),
            location: "ROW-A".to_string(),
            ..Fields::default()
        };
        f.retain_only(RecordShape::Installation);
        assert_eq!(f.po, "");
        assert_eq!(f.code, "C1");
        assert_eq!(f.location, "ROW-A");

        f.cabinet_no = "CAB-07".to_string();
        f.retain_only(RecordShape::Basic);
        assert_eq!(f.code, "C1");
        assert_eq!(f.location, "");
        assert_eq!(f.cabinet_no, "");
    }

    #[test]
    fn only_installation_is_a_batch_shape() {
        assert!(RecordShape::Installation.is_batch());
        assert_eq!(
            RecordShape::Installation.cleared_after_save(),
            &[FieldName::Code]
        );
        assert_eq!(RecordShape::Installation.scan_field(), FieldName::Code);
        assert!(!RecordShape::Basic.is_batch());
        assert_eq!(RecordShape::Serialized.cleared_after_save().len(), 6);
        assert_eq!(RecordShape::Installation.title(), "Installation");
        assert_eq!(RecordShape::Serialized.title(), "Form 2");
    }

    #[test]
    fn missing_treats_whitespace_as_blank() {
        let f = Fields {
            po: "PO1".to_string(),
            code: "   ".to_string(),
            ..Fields::default()
        };
        assert_eq!(f.missing(RecordShape::Basic), vec![FieldName::Code]);
        assert_eq!(
            f.missing(RecordShape::Serialized),
            vec![FieldName::PartNumber, FieldName::SeriNumber]
        );
    }
}
