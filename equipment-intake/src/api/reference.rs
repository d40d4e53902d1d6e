// Reference data providers (project codes + brands)
//
// The wizard loads these lists once per session; a failed load blocks the step gates until the
// user reloads.

use async_trait::async_trait;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::DataLoadError;
use crate::models::requests::{ReferenceData, ReferenceItem};
use crate::models::state::NEW_REFERENCE_SENTINEL;

#[async_trait]
pub trait ReferenceDataProvider: Send + Sync {
    async fn load(&self) -> Result<ReferenceData, DataLoadError>;
}

/// Lists shipped with the application.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinReferenceData;

impl BuiltinReferenceData {
    pub fn data() -> ReferenceData {
        ReferenceData {
            references: vec![
                ReferenceItem::new("Project Alpha (PROJ-ALPHA)", "PROJ-ALPHA"),
                ReferenceItem::new("Project Beta (PROJ-BETA)", "PROJ-BETA"),
                ReferenceItem::new("Project Gamma (PROJ-GAMMA)", "PROJ-GAMMA"),
                ReferenceItem::new("Create new code", NEW_REFERENCE_SENTINEL),
            ],
            brands: vec![
                ReferenceItem::new("Samsung", "SAMSUNG"),
                ReferenceItem::new("Sony", "SONY"),
                ReferenceItem::new("LG", "LG"),
                ReferenceItem::new("Panasonic", "PANASONIC"),
            ],
        }
    }
}

#[async_trait]
impl ReferenceDataProvider for BuiltinReferenceData {
    async fn load(&self) -> Result<ReferenceData, DataLoadError> {
        Ok(Self::data())
    }
}

/// Lists read from a TOML file:
///
/// ```toml
/// [[references]]
/// label = "Project Alpha (PROJ-ALPHA)"
/// value = "PROJ-ALPHA"
///
/// [[brands]]
/// label = "Samsung"
/// value = "SAMSUNG"
/// ```
#[derive(Debug, Clone)]
pub struct TomlReferenceData {
    path: PathBuf,
}

impl TomlReferenceData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse(text: &str) -> Result<ReferenceData, DataLoadError> {
        let data: ReferenceData =
            toml::from_str(text).map_err(|e| DataLoadError::Parse(e.message().to_string()))?;

        let blank = |items: &[ReferenceItem]| items.iter().any(|i| i.value.trim().is_empty());
        if blank(&data.references) || blank(&data.brands) {
            return Err(DataLoadError::Parse(
                "every entry needs a non-empty value".to_string(),
            ));
        }
        if data.brands.is_empty() {
            return Err(DataLoadError::Empty("brand"));
        }
        if data.references.is_empty() {
            return Err(DataLoadError::Empty("project code"));
        }

        Ok(data.with_new_reference_option())
    }
}

#[async_trait]
impl ReferenceDataProvider for TomlReferenceData {
    async fn load(&self) -> Result<ReferenceData, DataLoadError> {
        let started = Instant::now();
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| DataLoadError::Io {
                path: self.path.clone(),
                source,
            })?;
        let data = Self::parse(&text)?;
        info!(
            "[PHASE: reference_data] [STEP: load] Loaded {} project codes and {} brands from {:?} (duration_ms={})",
            data.references.len(),
            data.brands.len(),
            self.path,
            started.elapsed().as_millis()
        );
        Ok(data)
    }
}
