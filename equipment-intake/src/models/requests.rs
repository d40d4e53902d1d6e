// Request-side models: reference lists consumed by the wizard and the record it submits.

use serde::{Deserialize, Serialize};

use super::state::{Fields, RecordShape, NEW_REFERENCE_SENTINEL};

// =========================
// Reference data
// =========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub label: String,
    pub value: String,
}

impl ReferenceItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Option lists for steps 1 (project codes) and 2 (brands).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub references: Vec<ReferenceItem>,
    #[serde(default)]
    pub brands: Vec<ReferenceItem>,
}

impl ReferenceData {
    /// Appends the create-new entry when the list does not already offer it.
    pub fn with_new_reference_option(mut self) -> Self {
        if !self
            .references
            .iter()
            .any(|r| r.value == NEW_REFERENCE_SENTINEL)
        {
            self.references
                .push(ReferenceItem::new("Create new code", NEW_REFERENCE_SENTINEL));
        }
        self
    }
}

// =========================
// Submission
// =========================

/// Completed record sent to the form-ingestion endpoint (request id is added by the client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionRecord {
    Equipment(EquipmentRecord),
    Installation(InstallationForm),
}

/// Flat camelCase body for form types 1 and 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentRecord {
    pub form_type: u8,
    pub project_code: String,
    pub brand: String,
    pub po: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seri_number: Option<String>,
}

/// Nested `form` object of an installation submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationForm {
    pub project_code: String,
    pub location: String,
    pub cabinet_no: String,
    pub code: String,
}

/// Form type sent alongside an installation record.
pub const INSTALLATION_FORM_TYPE: &str = "INSTALLATION";

impl SubmissionRecord {
    /// Builds the payload for `shape`; fields outside the shape are never sent.
    /// Installation records do not carry the brand.
    pub fn build(shape: RecordShape, project_code: &str, brand: &str, fields: &Fields) -> Self {
        let pick = |v: &str| Some(v.trim().to_string());
        let project_code = project_code.trim().to_string();
        let (code, part_number, seri_number) = match shape {
            RecordShape::Basic => (pick(fields.code.as_str()), None, None),
            RecordShape::Serialized => (
                None,
                pick(fields.part_number.as_str()),
                pick(fields.seri_number.as_str()),
            ),
            RecordShape::Installation => {
                return SubmissionRecord::Installation(InstallationForm {
                    project_code,
                    location: fields.location.trim().to_string(),
                    cabinet_no: fields.cabinet_no.trim().to_string(),
                    code: fields.code.trim().to_string(),
                })
            }
        };
        SubmissionRecord::Equipment(EquipmentRecord {
            form_type: shape.form_type(),
            project_code,
            brand: brand.trim().to_string(),
            po: fields.po.trim().to_string(),
            code,
            part_number,
            seri_number,
        })
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            SubmissionRecord::Equipment(r) if r.form_type == 2 => RecordShape::Serialized,
            SubmissionRecord::Equipment(_) => RecordShape::Basic,
            SubmissionRecord::Installation(_) => RecordShape::Installation,
        }
    }

    /// Value of the record's scan field, for log lines.
    pub fn scanned_value(&self) -> &str {
        match self {
            SubmissionRecord::Equipment(r) => r
                .code
                .as_deref()
                .or(r.seri_number.as_deref())
                .unwrap_or_default(),
            SubmissionRecord::Installation(f) => &f.code,
        }
    }
}
