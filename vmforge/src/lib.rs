//! vmforge: VM configuration synthesis.
//!
//! A wizard session collects choices into a [`SelectionState`], the
//! [`ConfigCompiler`] turns a finished selection into exactly one backend
//! configuration, and the [`Materializer`] performs the file work that
//! configuration implies once the VM exists.
//!
//! ```no_run
//! use vmforge::{VmforgeOptions, VmforgeRuntime};
//!
//! let runtime = VmforgeRuntime::new(VmforgeOptions::default())?;
//! let mut session = runtime.new_session();
//! session.selection_mut().set_name("scratch");
//! # Ok::<(), vmforge::VmforgeError>(())
//! ```

pub mod capability;
pub mod compiler;
pub mod disk;
mod logging;
pub mod materialize;
pub mod pipeline;
pub mod resolver;
pub mod runtime;
pub mod selection;
pub mod vm;
pub mod wizard;

pub use capability::{Architecture, Backend, CapabilityMatrix, HostCapabilities, OsFamily};
pub use compiler::{CompiledConfiguration, ConfigCompiler, EmulationConfig, NativeConfig};
pub use logging::init_logging_for;
pub use materialize::{MaterializeReport, Materializer, MaterializerServices};
pub use runtime::{FilesystemLayout, VmforgeOptions, VmforgeRuntime};
pub use selection::SelectionState;
pub use vm::LiveVm;
pub use wizard::{WizardSession, WizardStep};

pub use vmforge_shared::errors::{
    ConfigurationError, MaterializationError, ValidationError, VmforgeError, VmforgeResult,
};
