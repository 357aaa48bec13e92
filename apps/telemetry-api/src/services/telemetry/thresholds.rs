use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::InstallationThresholds;

/// Per-installation threshold lookup. Absence means values cannot be
/// classified (they become `Unknown`); it is not an error.
pub trait ThresholdRegistry: Send + Sync {
    fn lookup(&self, installation_id: &str) -> Option<InstallationThresholds>;
}

#[derive(Debug, thiserror::Error)]
pub enum ThresholdConfigError {
    #[error("failed to read threshold config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse threshold config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Registry backed by an in-memory map, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticThresholdRegistry {
    by_installation: HashMap<String, InstallationThresholds>,
}

impl StaticThresholdRegistry {
    pub fn new(by_installation: HashMap<String, InstallationThresholds>) -> Self {
        Self { by_installation }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads `{"<installation_id>": {"voltage": {"low": 218.5, ...}, ...}}`.
    pub fn from_json_file(path: &Path) -> Result<Self, ThresholdConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ThresholdConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let by_installation: HashMap<String, InstallationThresholds> =
            serde_json::from_str(&contents).map_err(|source| ThresholdConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(
            path = %path.display(),
            installations = by_installation.len(),
            "loaded threshold registry"
        );
        Ok(Self::new(by_installation))
    }

    pub fn len(&self) -> usize {
        self.by_installation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_installation.is_empty()
    }
}

impl ThresholdRegistry for StaticThresholdRegistry {
    fn lookup(&self, installation_id: &str) -> Option<InstallationThresholds> {
        self.by_installation.get(installation_id).cloned()
    }
}
