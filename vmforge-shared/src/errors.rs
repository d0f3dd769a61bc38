//! Error taxonomy for vmforge.
//!
//! Three classes of failure, each with its own recovery story:
//!
//! - [`ValidationError`]: a wizard step is missing a required field. The
//!   session stays on the current step and nothing is mutated.
//! - [`ConfigurationError`]: the selections describe an OS/backend/architecture
//!   combination no backend can run. The compile attempt is abandoned; the
//!   session remains editable.
//! - [`MaterializationError`]: an I/O step after VM creation failed. Steps that
//!   already ran are not rolled back.
//!
//! Messages are lowercase and carry the offending path or name when one is
//! available.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using vmforge's umbrella error.
pub type VmforgeResult<T> = Result<T, VmforgeError>;

/// A required field is missing at a wizard step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("select a boot image")]
    SelectBootImage,

    #[error("select a linux kernel")]
    SelectKernel,

    #[error("select a windows installer image or an existing windows disk")]
    SelectWindowsMedia,

    #[error("select a target architecture")]
    SelectArchitecture,

    #[error("select a target machine")]
    SelectTarget,

    #[error("the native virtualization backend cannot run {os} guests on this host")]
    NativeBackendUnsupported { os: String },
}

/// The selections cannot be compiled into any backend configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("virtual machine name is required")]
    MissingName,

    #[error("kernel boot selected but no kernel image was provided")]
    MissingKernel,

    #[error("macos platform descriptor or recovery image has not been resolved")]
    MissingPlatform,

    #[error("no target architecture selected")]
    MissingArchitecture,

    #[error("no target machine selected")]
    MissingTarget,

    #[error("the emulation backend cannot boot {os} guests")]
    UnsupportedBackend { os: String },

    #[error("unsupported configuration: {0}")]
    UnsupportedCombination(String),

    #[error("no defaults known for target {target} on architecture {architecture}")]
    UnknownTarget {
        target: String,
        architecture: String,
    },
}

/// A post-creation storage or attach step failed.
#[derive(Error, Debug)]
pub enum MaterializationError {
    #[error("asset copy failed: {}: {reason}", source_path.display())]
    Copy { source_path: PathBuf, reason: String },

    #[error("image conversion failed: {}: {reason}", source_path.display())]
    Conversion { source_path: PathBuf, reason: String },

    #[error("disk creation failed: {}: {reason}", path.display())]
    FatalDiskCreation { path: PathBuf, reason: String },

    #[error("shared directory attach failed: {}: {reason}", path.display())]
    SharedDirectory { path: PathBuf, reason: String },

    #[error("boot medium change failed on drive {drive}: {reason}")]
    ChangeMedium { drive: String, reason: String },

    #[error("materialization cancelled")]
    Cancelled,
}

/// Umbrella error for every vmforge operation.
#[derive(Error, Debug)]
pub enum VmforgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Materialization(#[from] MaterializationError),

    /// Invalid runtime options (home directory, logging).
    #[error("invalid options: {0}")]
    Config(String),

    /// Filesystem layout could not be prepared.
    #[error("storage operation failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VmforgeError {
    /// Whether the session may continue after this error without user
    /// intervention beyond fixing the reported field.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VmforgeError::Validation(_) | VmforgeError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_recoverable() {
        let err: VmforgeError = ValidationError::SelectBootImage.into();
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "select a boot image");
    }

    #[test]
    fn test_materialization_error_message_carries_path() {
        let err: VmforgeError = MaterializationError::FatalDiskCreation {
            path: PathBuf::from("/vms/a/Data/data.qcow2"),
            reason: "no space left on device".into(),
        }
        .into();
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/vms/a/Data/data.qcow2"));
    }
}
