// Submission client for the form-ingestion endpoint
//
// Every failure (non-2xx, malformed body, transport fault) is folded into
// `SubmitOutcome::Error` with a message that can be shown to the user as-is.

use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

use crate::models::requests::{
    EquipmentRecord, InstallationForm, SubmissionRecord, INSTALLATION_FORM_TYPE,
};
use crate::models::responses::{SubmitOutcome, SubmitResponseBody};
use crate::utils::logging::mask_endpoint;

pub const GENERIC_FAILURE_MESSAGE: &str = "Submission failed.";
pub const UNCLEAR_RESPONSE_MESSAGE: &str = "Unclear response from server.";

#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(&self, request_id: &str, record: &SubmissionRecord) -> SubmitOutcome;
}

/// Fresh identifier for one submission attempt. Never reused on retry.
pub fn new_request_id() -> String {
    format!("intake-{}", Uuid::new_v4().simple())
}

/// Wire body. Equipment records are flat camelCase; installation records nest a snake_case
/// `form` object next to `request_id` and `form_type`.
#[derive(Serialize)]
#[serde(untagged)]
enum SubmitRequest<'a> {
    Equipment(EquipmentRequest<'a>),
    Installation(InstallationRequest<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EquipmentRequest<'a> {
    request_id: &'a str,
    #[serde(flatten)]
    record: &'a EquipmentRecord,
}

#[derive(Serialize)]
struct InstallationRequest<'a> {
    request_id: &'a str,
    form_type: &'static str,
    form: &'a InstallationForm,
}

impl<'a> SubmitRequest<'a> {
    fn new(request_id: &'a str, record: &'a SubmissionRecord) -> Self {
        match record {
            SubmissionRecord::Equipment(record) => {
                SubmitRequest::Equipment(EquipmentRequest { request_id, record })
            }
            SubmissionRecord::Installation(form) => {
                SubmitRequest::Installation(InstallationRequest {
                    request_id,
                    form_type: INSTALLATION_FORM_TYPE,
                    form,
                })
            }
        }
    }
}

pub struct HttpSubmissionClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSubmissionClient {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, request_id: &str, record: &SubmissionRecord) -> SubmitOutcome {
        let started = Instant::now();
        info!(
            "[PHASE: submission] [STEP: send] POST {} (request_id={}, form={})",
            mask_endpoint(self.endpoint.as_str()),
            request_id,
            record.shape().title()
        );

        let body = SubmitRequest::new(request_id, record);
        let resp = match self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!(
                    "[PHASE: submission] [STEP: send] Transport error (request_id={}): {}",
                    request_id, e
                );
                return SubmitOutcome::error(format!("Network error: {}", e));
            }
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(t) => t,
            Err(e) => {
                error!(
                    "[PHASE: submission] [STEP: read_body] Failed reading response (request_id={}, status={}): {}",
                    request_id, status, e
                );
                return SubmitOutcome::error(format!("Network error: {}", e));
            }
        };

        let outcome = interpret_response(status, &text);
        match &outcome {
            SubmitOutcome::Success => info!(
                "[PHASE: submission] [STEP: response] Accepted (request_id={}, status={}, duration_ms={})",
                request_id,
                status.as_u16(),
                started.elapsed().as_millis()
            ),
            SubmitOutcome::Error { message } => warn!(
                "[PHASE: submission] [STEP: response] Rejected (request_id={}, status={}, duration_ms={}): {}",
                request_id,
                status.as_u16(),
                started.elapsed().as_millis(),
                message.as_deref().unwrap_or("<no message>")
            ),
        }
        outcome
    }
}

/// Maps an HTTP status + body onto the normalized outcome.
pub fn interpret_response(status: StatusCode, body: &str) -> SubmitOutcome {
    let parsed = serde_json::from_str::<SubmitResponseBody>(body).ok();
    let server_message = parsed
        .as_ref()
        .and_then(|b| b.message.as_deref())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if !status.is_success() {
        let message = server_message.unwrap_or_else(|| {
            format!(
                "API error (status: {} {}).",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        });
        return SubmitOutcome::Error {
            message: Some(message),
        };
    }

    let Some(parsed) = parsed else {
        return SubmitOutcome::error(UNCLEAR_RESPONSE_MESSAGE);
    };

    match parsed.status.as_deref().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("success") => SubmitOutcome::Success,
        Some(s) if s.eq_ignore_ascii_case("error") => SubmitOutcome::Error {
            message: server_message,
        },
        _ => SubmitOutcome::error(
            server_message.unwrap_or_else(|| UNCLEAR_RESPONSE_MESSAGE.to_string()),
        ),
    }
}
