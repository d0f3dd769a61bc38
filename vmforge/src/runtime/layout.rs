//! Directory layout under the vmforge home.
//!
//! ```text
//! <home>/
//! ├── vms/<name>.vmforge/Data/   VM data directory
//! ├── logs/                      daily log files
//! └── tmp/                       scratch space
//! ```

use std::path::{Path, PathBuf};

const VMS_DIR: &str = "vms";
const LOGS_DIR: &str = "logs";
const TEMP_DIR: &str = "tmp";
const BUNDLE_EXTENSION: &str = "vmforge";
const DATA_DIR: &str = "Data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemLayout {
    home_dir: PathBuf,
}

impl FilesystemLayout {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn vms_dir(&self) -> PathBuf {
        self.home_dir.join(VMS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join(LOGS_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.home_dir.join(TEMP_DIR)
    }

    /// Layout of the bundle for VM `name`.
    pub fn vm(&self, name: &str) -> VmLayout {
        VmLayout {
            root: self
                .vms_dir()
                .join(format!("{}.{}", bundle_stem(name), BUNDLE_EXTENSION)),
        }
    }

    /// Create the top-level directories.
    pub fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.home_dir)?;
        std::fs::create_dir_all(self.vms_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.temp_dir())?;
        Ok(())
    }
}

/// Paths inside one VM bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmLayout {
    root: PathBuf,
}

impl VmLayout {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }
}

/// VM names are free text; path separators would escape `vms/`.
fn bundle_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            c => c,
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => "untitled".to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_vm_data_dir() {
        let layout = FilesystemLayout::new("/home/user/.vmforge");
        assert_eq!(
            layout.vm("Ubuntu 24.04").data_dir(),
            PathBuf::from("/home/user/.vmforge/vms/Ubuntu 24.04.vmforge/Data")
        );
    }

    #[test]
    fn test_vm_name_cannot_escape_vms_dir() {
        let layout = FilesystemLayout::new("/data");
        assert_eq!(
            layout.vm("../etc").root(),
            Path::new("/data/vms/..-etc.vmforge")
        );
        assert_eq!(layout.vm("..").root(), Path::new("/data/vms/untitled.vmforge"));
    }

    #[test]
    fn test_prepare_creates_directories() {
        let dir = TempDir::new().unwrap();
        let layout = FilesystemLayout::new(dir.path().join("home"));

        layout.prepare().unwrap();
        layout.prepare().unwrap();

        assert!(layout.vms_dir().is_dir());
        assert!(layout.logs_dir().is_dir());
        assert!(layout.temp_dir().is_dir());
    }
}
