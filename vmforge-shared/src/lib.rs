//! Types shared between the vmforge core and its front ends.

pub mod errors;

pub use errors::{
    ConfigurationError, MaterializationError, ValidationError, VmforgeError, VmforgeResult,
};
