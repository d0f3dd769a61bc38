//! Runtime: options, filesystem layout and the [`VmforgeRuntime`] facade.

mod core;
pub mod layout;
pub mod options;

pub use self::core::VmforgeRuntime;
pub use layout::{FilesystemLayout, VmLayout};
pub use options::VmforgeOptions;
