// Collaborators wired from settings.

use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

use crate::api::reference::{BuiltinReferenceData, ReferenceDataProvider, TomlReferenceData};
use crate::api::submission::{HttpSubmissionClient, SubmissionClient};
use crate::scan::{AssumeOnline, ConnectivityProbe, ImageScanner, QrDecoder, TcpConnectivityProbe};
use crate::settings::Settings;
use crate::utils::logging::mask_endpoint;

#[derive(Clone)]
pub struct Services {
    pub reference: Arc<dyn ReferenceDataProvider>,
    pub submission: Arc<dyn SubmissionClient>,
    pub scanner: Arc<ImageScanner>,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let endpoint = settings
            .endpoint()
            .context("Submission endpoint is not configured")?;
        info!(
            "[PHASE: initialization] [STEP: services] Form {} endpoint: {}",
            settings.form_variant,
            mask_endpoint(endpoint.as_str())
        );

        let reference: Arc<dyn ReferenceDataProvider> = match &settings.reference_data_path {
            Some(path) => {
                info!(
                    "[PHASE: initialization] [STEP: services] Reference lists from {:?}",
                    path
                );
                Arc::new(TomlReferenceData::new(path.clone()))
            }
            None => Arc::new(BuiltinReferenceData),
        };

        Ok(Self {
            reference,
            scanner: Arc::new(scanner_for(settings, Some(&endpoint))),
            submission: Arc::new(HttpSubmissionClient::new(
                endpoint,
                settings.request_timeout(),
            )?),
        })
    }
}

/// Image scanner for `settings`. Without a usable endpoint the connectivity precheck is skipped.
pub fn scanner_for(settings: &Settings, endpoint: Option<&url::Url>) -> ImageScanner {
    let probe: Arc<dyn ConnectivityProbe> = match endpoint {
        Some(url) if settings.connectivity_check => {
            match TcpConnectivityProbe::for_endpoint(url, settings.connectivity_timeout()) {
                Some(p) => Arc::new(p),
                None => Arc::new(AssumeOnline),
            }
        }
        _ => Arc::new(AssumeOnline),
    };
    ImageScanner::new(probe, Arc::new(QrDecoder), settings.scan_min_length)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: Option<&str>) -> Settings {
        Settings {
            form_1_endpoint: endpoint.map(str::to_string),
            form_2_endpoint: None,
            installation_endpoint: None,
            form_variant: 1,
            request_timeout_secs: 5,
            notice_dismiss_ms: 3500,
            scan_min_length: 7,
            connectivity_check: false,
            connectivity_timeout_ms: 100,
            reference_data_path: None,
        }
    }

    #[tokio::test]
    async fn wires_builtin_lists_and_scanner_threshold() {
        let services =
            Services::from_settings(&settings(Some("http://127.0.0.1:9/forms"))).expect("services");
        assert_eq!(services.scanner.min_length(), 7);
        let data = services.reference.load().await.expect("builtin lists");
        assert!(!data.brands.is_empty());
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let err = Services::from_settings(&settings(None))
            .err()
            .expect("endpoint is required");
        assert!(
            format!("{:#}", err).contains("form_1_endpoint"),
            "unexpected error: {:#}",
            err
        );
    }
}
