//! Disk image constants.

/// QCOW2 image layout used for freshly allocated disks.
pub mod qcow2 {
    /// Cluster size in bits (64KB = 2^16)
    pub const CLUSTER_BITS: usize = 16;

    /// Refcount order (16-bit refcounts = 2^4)
    pub const REFCOUNT_ORDER: u8 = 4;

    /// Sector size used when laying out metadata (512 bytes)
    pub const BLOCK_SIZE: usize = 512;
}

pub const BYTES_IN_MIB: u64 = 1024 * 1024;

/// Extension that selects the qcow2 format on allocation.
pub const QCOW2_EXTENSION: &str = "qcow2";
