//! Top-level entry point tying layout, logging, compiler and materializer
//! together.

use super::layout::FilesystemLayout;
use super::options::VmforgeOptions;
use crate::capability::CapabilityMatrix;
use crate::compiler::{BuiltinDefaults, CompiledConfiguration, ConfigCompiler, DefaultsTable};
use crate::init_logging_for;
use crate::materialize::{MaterializeReport, Materializer, MaterializerServices};
use crate::vm::LiveVm;
use crate::wizard::WizardSession;
use std::future::Future;
use std::sync::Arc;
use vmforge_shared::errors::{VmforgeError, VmforgeResult};

/// Shared runtime; cheap to clone.
#[derive(Clone)]
pub struct VmforgeRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    /// Filesystem layout (immutable after init)
    layout: FilesystemLayout,
    compiler: ConfigCompiler,
    materializer: Materializer,
}

impl VmforgeRuntime {
    /// Create a runtime with the default defaults table and services.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `home_dir` is not absolute
    /// - Filesystem initialization fails
    pub fn new(options: VmforgeOptions) -> VmforgeResult<Self> {
        Self::with_services(options, Arc::new(BuiltinDefaults), MaterializerServices::default())
    }

    /// Create a runtime with an injected defaults table and I/O services.
    pub fn with_services(
        options: VmforgeOptions,
        defaults: Arc<dyn DefaultsTable>,
        services: MaterializerServices,
    ) -> VmforgeResult<Self> {
        if !options.home_dir.is_absolute() {
            return Err(VmforgeError::Config(format!(
                "home_dir must be absolute path, got: {}",
                options.home_dir.display()
            )));
        }

        let layout = FilesystemLayout::new(options.home_dir.clone());
        layout.prepare().map_err(|e| {
            VmforgeError::Storage(format!(
                "Failed to initialize filesystem at {}: {}",
                layout.home_dir().display(),
                e
            ))
        })?;

        init_logging_for(&layout)?;

        let matrix = CapabilityMatrix::new(options.host);
        let inner = Arc::new(RuntimeInner {
            layout,
            compiler: ConfigCompiler::new(matrix.clone(), defaults),
            materializer: Materializer::new(matrix, services),
        });

        tracing::debug!(
            home = %inner.layout.home_dir().display(),
            host = ?inner.compiler.matrix().host(),
            "initialized runtime"
        );
        Ok(Self { inner })
    }

    /// Create a runtime with default options.
    pub fn with_defaults() -> VmforgeResult<Self> {
        Self::new(VmforgeOptions::default())
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.inner.layout
    }

    pub fn matrix(&self) -> &CapabilityMatrix {
        self.inner.compiler.matrix()
    }

    /// Start a new VM-creation workflow.
    pub fn new_session(&self) -> WizardSession {
        WizardSession::new(self.inner.compiler.clone())
    }

    /// Materialize `config` into the data directory of its VM bundle.
    pub fn materialize(
        &self,
        session: &WizardSession,
        config: CompiledConfiguration,
        vm: Arc<dyn LiveVm>,
    ) -> impl Future<Output = VmforgeResult<MaterializeReport>> + Send + 'static {
        let data_dir = self.inner.layout.vm(config.name()).data_dir();
        session.materialize(&self.inner.materializer, config, vm, data_dir)
    }
}

impl std::fmt::Debug for VmforgeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmforgeRuntime")
            .field("home_dir", &self.inner.layout.home_dir())
            .finish()
    }
}
