//! Configuration compiler.
//!
//! Turns a completed [`SelectionState`] into exactly one backend
//! configuration, or a [`ConfigurationError`]. Compilation has no side
//! effects and never yields a partially built object.
//!
//! ```text
//! hardware virtualization && native backend → NativeConfig
//! otherwise                                 → EmulationConfig
//! ```

pub mod defaults;
mod emulation;
mod filename;
mod native;
mod types;

pub use defaults::{BuiltinDefaults, DefaultsTable, DriveInterface, TargetDefaults};
pub use filename::{asset_filename, destination_filename};
pub use types::{
    BOOT_MEDIA_DRIVE_ID, BootLoader, CompiledConfiguration, DEFAULT_EMULATION_DISK,
    DEFAULT_NATIVE_DISK, DisplayResolution, Drive, EmulationConfig, EmulationNetwork, ImageType,
    MAIN_DRIVE_ID, NativeConfig, NativeDevices, NativeDisk, NativeSharedDirectory, NetworkMode,
    ROOT_DRIVE_ID,
};

use crate::capability::{Backend, CapabilityMatrix};
use crate::selection::SelectionState;
use std::sync::Arc;
use vmforge_shared::errors::ConfigurationError;

/// Compiles selections against a fixed host and defaults table.
#[derive(Clone)]
pub struct ConfigCompiler {
    matrix: CapabilityMatrix,
    defaults: Arc<dyn DefaultsTable>,
}

impl ConfigCompiler {
    pub fn new(matrix: CapabilityMatrix, defaults: Arc<dyn DefaultsTable>) -> Self {
        Self { matrix, defaults }
    }

    pub fn with_builtin_defaults(matrix: CapabilityMatrix) -> Self {
        Self::new(matrix, Arc::new(BuiltinDefaults))
    }

    pub fn matrix(&self) -> &CapabilityMatrix {
        &self.matrix
    }

    pub fn compile(
        &self,
        state: &SelectionState,
    ) -> Result<CompiledConfiguration, ConfigurationError> {
        if state.name().trim().is_empty() {
            return Err(ConfigurationError::MissingName);
        }

        let backend = state.backend();
        let result = match backend {
            Backend::Native => native::build(state, &self.matrix).map(CompiledConfiguration::Native),
            Backend::Emulation => emulation::build(state, &self.matrix, self.defaults.as_ref())
                .map(CompiledConfiguration::Emulation),
        };

        match &result {
            Ok(_) => tracing::info!(
                vm = %state.name(),
                backend = ?backend,
                os = %state.operating_system(),
                "Compiled configuration"
            ),
            Err(e) => tracing::warn!(
                vm = %state.name(),
                backend = ?backend,
                error = %e,
                "Configuration rejected"
            ),
        }

        result
    }
}
