// Form wizard engine
//
// Owns one `WizardState` and is the only thing that mutates it. Network, decode and list-loading
// work is split into begin/complete pairs so the terminal loop can run it on a task and feed the
// result back later; completions captured under an older `generation` are dropped.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::api::reference::ReferenceDataProvider;
use crate::api::submission::{new_request_id, SubmissionClient, GENERIC_FAILURE_MESSAGE};
use crate::error::{DataLoadError, WizardError};
use crate::models::requests::{ReferenceData, SubmissionRecord};
use crate::models::responses::SubmitOutcome;
use crate::models::state::{
    FieldName, RecordShape, ReferenceStatus, Step, SubmissionStatus, WizardState,
    NEW_REFERENCE_SENTINEL,
};
use crate::notify::{Notice, Notifier, Severity};
use crate::scan::{passive_commit, ScanResult};
use crate::utils::logging::describe_value;

use super::gates::{step_gate, submit_gate, LOADING_MESSAGE};

pub const SAVED_MESSAGE: &str = "Saved. Ready for the next record.";
pub const SUBMIT_IN_PROGRESS_MESSAGE: &str = "A submission is in progress.";
pub const NO_SHAPE_FOR_SCAN_MESSAGE: &str = "Select a form type before scanning.";
pub const PROCESSING_IMAGE_MESSAGE: &str = "Processing image...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Advanced(Step),
    Blocked(WizardError),
    /// `advance` on the entry step; submitting is a separate operation.
    AtLastStep,
}

/// A submission that passed the gate and is waiting for the client's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    request_id: String,
    record: SubmissionRecord,
    generation: u64,
}

impl PendingSubmission {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn record(&self) -> &SubmissionRecord {
        &self.record
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitDisposition {
    Saved,
    Rejected(WizardError),
    /// Entry was abandoned while the request was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceLoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
    shape: RecordShape,
}

impl ScanTicket {
    pub fn field(&self) -> FieldName {
        self.shape.scan_field()
    }
}

/// A scanned value written into the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommit {
    pub field: FieldName,
    pub value: String,
}

pub struct WizardEngine {
    state: WizardState,
    notifier: Arc<dyn Notifier>,
    load_seq: u64,
    pending_load: Option<u64>,
}

impl WizardEngine {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: WizardState::new(),
            notifier,
            load_seq: 0,
            pending_load: None,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> Step {
        self.state.step
    }

    pub fn reference_data(&self) -> Option<&ReferenceData> {
        self.state.reference_status.data()
    }

    pub fn step_title(&self) -> String {
        match self.state.step {
            Step::Reference => "Step 1: Project code".to_string(),
            Step::Brand => "Step 2: Brand".to_string(),
            Step::Entry => match self.state.shape {
                Some(shape) => format!("Step 3: Data entry ({})", shape.title()),
                None => "Step 3: Data entry (Form ...)".to_string(),
            },
        }
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.state.step == Step::Entry
            && self.state.submission_status != SubmissionStatus::InFlight
            && submit_gate(&self.state).is_ok()
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn advance(&mut self) -> GateOutcome {
        let Some(next) = self.state.step.next() else {
            return GateOutcome::AtLastStep;
        };

        if let Err(e) = step_gate(&self.state) {
            debug!(
                "[PHASE: wizard] [STEP: advance] Gate blocked at step {} ({})",
                self.state.step.ordinal(),
                e.kind()
            );
            self.notify(e.to_string(), Severity::Error);
            return GateOutcome::Blocked(e);
        }

        self.state.step = next;
        info!(
            "[PHASE: wizard] [STEP: advance] Moved to step {}",
            next.ordinal()
        );
        GateOutcome::Advanced(next)
    }

    /// Steps back one page. Leaving the entry step abandons the record in progress.
    pub fn retreat(&mut self) -> Step {
        let Some(prev) = self.state.step.prev() else {
            return self.state.step;
        };

        if self.state.step == Step::Entry {
            self.state.shape = None;
            self.state.fields.clear();
            self.bump_generation("retreat");
        }
        self.state.step = prev;
        info!(
            "[PHASE: wizard] [STEP: retreat] Moved back to step {}",
            prev.ordinal()
        );
        prev
    }

    /// Fresh session that keeps the loaded reference lists.
    pub fn restart(&mut self) {
        let reference_status = std::mem::take(&mut self.state.reference_status);
        let message_seq = self.state.message_seq;
        let generation = self.state.generation;

        self.state = WizardState::new();
        self.state.reference_status = reference_status;
        self.state.message_seq = message_seq;
        self.state.generation = generation;
        self.bump_generation("restart");
        self.notifier.dismiss();
    }

    // ---------------------------------------------------------------------
    // Assignment
    // ---------------------------------------------------------------------

    pub fn set_reference(&mut self, value: impl Into<String>) {
        let value = value.into();
        if value != NEW_REFERENCE_SENTINEL {
            self.state.selections.new_reference.clear();
        }
        self.state.selections.reference = value;
    }

    pub fn set_new_reference(&mut self, value: impl Into<String>) {
        self.state.selections.new_reference = value.into();
    }

    pub fn set_brand(&mut self, value: impl Into<String>) {
        self.state.selections.brand = value.into();
    }

    pub fn set_field(&mut self, name: FieldName, value: impl Into<String>) {
        self.state.fields.set(name, value.into());
    }

    /// Activates a record shape. Fields unique to the other shape are cleared; PO is kept.
    pub fn select_shape(&mut self, shape: RecordShape) -> bool {
        if self.state.step != Step::Entry {
            return false;
        }
        if self.state.submission_status == SubmissionStatus::InFlight {
            self.notify(SUBMIT_IN_PROGRESS_MESSAGE, Severity::Info);
            return false;
        }

        self.state.shape = Some(shape);
        self.state.fields.retain_only(shape);
        debug!(
            "[PHASE: wizard] [STEP: select_shape] {} active",
            shape.title()
        );
        true
    }

    // ---------------------------------------------------------------------
    // Submission
    // ---------------------------------------------------------------------

    /// Gate check + state transition to `InFlight`. `None` when blocked or already in flight.
    pub fn begin_submit(&mut self) -> Option<PendingSubmission> {
        if self.state.submission_status == SubmissionStatus::InFlight {
            debug!("[PHASE: submission] [STEP: begin] Ignored; a submission is already in flight");
            return None;
        }

        let record = match submit_gate(&self.state) {
            Ok(r) => r,
            Err(e) => {
                self.notify(e.to_string(), Severity::Error);
                return None;
            }
        };

        let pending = PendingSubmission {
            request_id: new_request_id(),
            record,
            generation: self.state.generation,
        };
        self.state.submission_status = SubmissionStatus::InFlight;
        info!(
            "[PHASE: submission] [STEP: begin] request_id={} form={} scanned={}",
            pending.request_id,
            pending.record.shape().title(),
            describe_value(pending.record.scanned_value())
        );
        Some(pending)
    }

    pub fn complete_submit(
        &mut self,
        pending: PendingSubmission,
        outcome: SubmitOutcome,
    ) -> SubmitDisposition {
        if pending.generation != self.state.generation {
            info!(
                "[PHASE: submission] [STEP: complete] Dropping stale result (request_id={})",
                pending.request_id
            );
            return SubmitDisposition::Stale;
        }

        match outcome {
            SubmitOutcome::Success => {
                self.state.submission_status = SubmissionStatus::Success;
                let shape = pending.record.shape();
                for name in shape.cleared_after_save() {
                    self.state.fields.set(*name, String::new());
                }
                if !shape.is_batch() {
                    self.state.shape = None;
                }
                self.notify(SAVED_MESSAGE, Severity::Success);
                SubmitDisposition::Saved
            }
            SubmitOutcome::Error { message } => {
                self.state.submission_status = SubmissionStatus::Error;
                let e = WizardError::Submission(
                    message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                );
                self.notify(format!("Error: {}", e), Severity::Error);
                SubmitDisposition::Rejected(e)
            }
        }
    }

    /// Runs a whole submission against `client`. `None` when nothing was sent.
    pub async fn submit(&mut self, client: &dyn SubmissionClient) -> Option<SubmitDisposition> {
        let pending = self.begin_submit()?;
        let outcome = client.submit(pending.request_id(), pending.record()).await;
        Some(self.complete_submit(pending, outcome))
    }

    // ---------------------------------------------------------------------
    // Reference data
    // ---------------------------------------------------------------------

    pub fn begin_reference_load(&mut self) -> ReferenceLoadTicket {
        self.load_seq += 1;
        self.pending_load = Some(self.load_seq);
        self.state.reference_status = ReferenceStatus::Loading;
        ReferenceLoadTicket(self.load_seq)
    }

    /// Applies a load result. Returns `false` when a newer load superseded this one.
    pub fn finish_reference_load(
        &mut self,
        ticket: ReferenceLoadTicket,
        result: Result<ReferenceData, DataLoadError>,
    ) -> bool {
        if self.pending_load != Some(ticket.0) {
            debug!(
                "[PHASE: reference_data] [STEP: finish] Ignoring superseded load #{}",
                ticket.0
            );
            return false;
        }
        self.pending_load = None;

        match result {
            Ok(data) => {
                info!(
                    "[PHASE: reference_data] [STEP: finish] Ready ({} project codes, {} brands)",
                    data.references.len(),
                    data.brands.len()
                );
                self.state.reference_status = ReferenceStatus::Ready(data);
            }
            Err(e) => {
                warn!("[PHASE: reference_data] [STEP: finish] Load failed: {}", e);
                let reason = e.to_string();
                let err = WizardError::DataLoad(reason.clone());
                self.state.reference_status = ReferenceStatus::Failed(reason);
                self.notify(err.to_string(), Severity::Error);
            }
        }
        true
    }

    /// Manual reload. `None` while a load is already pending.
    pub fn reload_reference_data(&mut self) -> Option<ReferenceLoadTicket> {
        if self.pending_load.is_some() {
            self.notify(LOADING_MESSAGE, Severity::Info);
            return None;
        }
        info!("[PHASE: reference_data] [STEP: reload] Reloading reference lists");
        Some(self.begin_reference_load())
    }

    pub async fn load_reference_data(&mut self, provider: &dyn ReferenceDataProvider) -> bool {
        let ticket = self.begin_reference_load();
        let result = provider.load().await;
        self.finish_reference_load(ticket, result)
    }

    // ---------------------------------------------------------------------
    // Scanning
    // ---------------------------------------------------------------------

    /// Keyboard-wedge scanner commit (terminator or blur) into the active shape's scan field.
    pub fn commit_passive_scan(&mut self, raw: &str) -> Option<ScanCommit> {
        let value = passive_commit(raw)?;
        let Some(shape) = self.state.shape else {
            self.notify(NO_SHAPE_FOR_SCAN_MESSAGE, Severity::Error);
            return None;
        };

        let field = shape.scan_field();
        debug!(
            "[PHASE: scan] [STEP: passive] Committed {} into {}",
            describe_value(&value),
            field.key()
        );
        self.state.fields.set(field, value.clone());
        Some(ScanCommit { field, value })
    }

    pub fn begin_image_scan(&mut self) -> Option<ScanTicket> {
        let Some(shape) = self.state.shape else {
            self.notify(NO_SHAPE_FOR_SCAN_MESSAGE, Severity::Error);
            return None;
        };
        self.notify(PROCESSING_IMAGE_MESSAGE, Severity::Info);
        Some(ScanTicket {
            generation: self.state.generation,
            shape,
        })
    }

    pub fn complete_image_scan(
        &mut self,
        ticket: ScanTicket,
        result: ScanResult,
    ) -> Option<ScanCommit> {
        if ticket.generation != self.state.generation || self.state.shape != Some(ticket.shape) {
            info!(
                "[PHASE: scan] [STEP: complete] Dropping scan result; the form changed meanwhile"
            );
            return None;
        }

        match result {
            Ok(value) => {
                let field = ticket.field();
                self.state.fields.set(field, value.clone());
                self.notify(format!("Scanned: {}", value), Severity::Success);
                Some(ScanCommit { field, value })
            }
            Err(failure) => {
                warn!(
                    "[PHASE: scan] [STEP: complete] Scan rejected ({})",
                    failure.code()
                );
                self.notify(WizardError::Scan(failure).to_string(), Severity::Error);
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Notices
    // ---------------------------------------------------------------------

    pub fn dismiss_notice(&mut self) {
        self.state.last_message = None;
        self.notifier.dismiss();
    }

    fn notify(&mut self, text: impl Into<String>, severity: Severity) {
        self.state.message_seq += 1;
        let notice = Notice::new(text, severity, self.state.message_seq);
        debug!(
            "[PHASE: notify] [STEP: publish] {} notice #{}",
            severity.as_str(),
            notice.token
        );
        self.notifier.publish(&notice);
        self.state.last_message = Some(notice);
    }

    fn bump_generation(&mut self, reason: &str) {
        self.state.generation += 1;
        if self.state.submission_status == SubmissionStatus::InFlight {
            self.state.submission_status = SubmissionStatus::Idle;
        }
        debug!(
            "[PHASE: wizard] [STEP: {}] generation -> {}",
            reason, self.state.generation
        );
    }
}
