//! Disk-image services used after VM creation.
//!
//! - [`DiskAllocator`]: create an empty virtual disk
//! - [`ImageConverter`]: convert an existing image to qcow2
//! - [`ScopedAccess`]: hold access to a user-selected file while reading it

mod access;
mod allocator;
pub mod constants;
mod converter;

pub use access::{AccessGuard, NoopScopedAccess, ScopedAccess};
pub use allocator::{DefaultDiskAllocator, DiskAllocator};
pub use converter::{ImageConverter, QemuImgConverter};
