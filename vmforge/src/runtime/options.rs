//! Runtime configuration.

use crate::capability::HostCapabilities;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vmforge_shared::errors::{VmforgeError, VmforgeResult};

/// Environment variable overriding the default home directory.
pub const HOME_ENV: &str = "VMFORGE_HOME";

/// Options for a [`VmforgeRuntime`](super::VmforgeRuntime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmforgeOptions {
    /// Root for VM bundles, logs and scratch files. Must be absolute.
    pub home_dir: PathBuf,
    /// Host capabilities the compatibility rules are evaluated against.
    #[serde(default)]
    pub host: HostCapabilities,
}

impl Default for VmforgeOptions {
    fn default() -> Self {
        Self {
            home_dir: default_home_dir(),
            host: HostCapabilities::detect(),
        }
    }
}

impl VmforgeOptions {
    pub fn with_home_dir(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            ..Self::default()
        }
    }

    /// Load options from a JSON file.
    pub fn from_file(path: &Path) -> VmforgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VmforgeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            VmforgeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write options as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> VmforgeResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| VmforgeError::Config(format!("Failed to serialize options: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// `$VMFORGE_HOME`, else `~/.vmforge`.
fn default_home_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".vmforge")
}
