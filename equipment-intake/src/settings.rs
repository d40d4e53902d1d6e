// Runtime settings
//
// Layering: built-in defaults, then an optional TOML file, then `INTAKE_*` environment variables,
// then command-line overrides.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::state::RecordShape;
use crate::utils::path_resolver::resolve_config_file;

pub const ENV_PREFIX: &str = "INTAKE";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),
    #[error("form_variant must be 1 or 2 (got {0})")]
    InvalidVariant(u8),
    #[error("{key} is not set; configure the endpoint for form {variant}")]
    MissingEndpoint { key: &'static str, variant: u8 },
    #[error("{key} is not a valid URL: {source}")]
    InvalidEndpoint {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{key} must use http or https (got {scheme})")]
    UnsupportedScheme { key: &'static str, scheme: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub form_1_endpoint: Option<String>,
    #[serde(default)]
    pub form_2_endpoint: Option<String>,
    #[serde(default)]
    pub installation_endpoint: Option<String>,
    pub form_variant: u8,
    pub request_timeout_secs: u64,
    pub notice_dismiss_ms: u64,
    pub scan_min_length: usize,
    pub connectivity_check: bool,
    pub connectivity_timeout_ms: u64,
    #[serde(default)]
    pub reference_data_path: Option<PathBuf>,
}

/// Values taken from the command line; they override every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub config_path: Option<PathBuf>,
    pub form_variant: Option<u8>,
}

impl SettingsOverrides {
    /// Recognizes `--config <path>`, `--config=<path>`, `--form <1|2|3>` and `--form=<1|2|3>`.
    pub fn from_args(args: &[String]) -> Self {
        let mut out = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--config" {
                out.config_path = iter.next().map(PathBuf::from);
            } else if let Some(v) = arg.strip_prefix("--config=") {
                out.config_path = Some(PathBuf::from(v));
            } else if arg == "--form" {
                out.form_variant = iter.next().and_then(|v| v.trim().parse().ok());
            } else if let Some(v) = arg.strip_prefix("--form=") {
                out.form_variant = v.trim().parse().ok();
            }
        }
        out
    }
}

impl Settings {
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, SettingsError> {
        Self::load_from(overrides, ENV_PREFIX)
    }

    pub fn load_from(
        overrides: &SettingsOverrides,
        env_prefix: &str,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("form_variant", 1_i64)?
            .set_default("request_timeout_secs", 15_i64)?
            .set_default("notice_dismiss_ms", 3500_i64)?
            .set_default("scan_min_length", 6_i64)?
            .set_default("connectivity_check", true)?
            .set_default("connectivity_timeout_ms", 1500_i64)?;

        if let Some(path) = resolve_config_file(overrides.config_path.as_deref()) {
            // An explicitly named file must exist; the per-user default is optional.
            let required = overrides.config_path.is_some();
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }

        builder = builder.add_source(Environment::with_prefix(env_prefix).try_parsing(true));

        if let Some(variant) = overrides.form_variant {
            builder = builder.set_override("form_variant", i64::from(variant))?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.shape()?;
        Ok(settings)
    }

    /// Record shape of the configured form variant.
    pub fn shape(&self) -> Result<RecordShape, SettingsError> {
        RecordShape::ALL
            .into_iter()
            .find(|s| s.form_type() == self.form_variant)
            .ok_or(SettingsError::InvalidVariant(self.form_variant))
    }

    /// Submission endpoint for the configured form variant.
    pub fn endpoint(&self) -> Result<Url, SettingsError> {
        let (key, raw) = match self.shape()? {
            RecordShape::Basic => ("form_1_endpoint", self.form_1_endpoint.as_deref()),
            RecordShape::Serialized => ("form_2_endpoint", self.form_2_endpoint.as_deref()),
            RecordShape::Installation => (
                "installation_endpoint",
                self.installation_endpoint.as_deref(),
            ),
        };
        let raw = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SettingsError::MissingEndpoint {
                key,
                variant: self.form_variant,
            })?;
        let url = Url::parse(raw).map_err(|source| SettingsError::InvalidEndpoint { key, source })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SettingsError::UnsupportedScheme {
                key,
                scheme: other.to_string(),
            }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.notice_dismiss_ms)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity_timeout_ms)
    }
}
