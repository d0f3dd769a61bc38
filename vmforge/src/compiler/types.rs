//! Backend-specific configuration produced by the compiler.

use super::defaults::DriveInterface;
use crate::capability::{Architecture, Backend, OsFamily};
use crate::resolver::{MacPlatform, RestoreImage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Drive id the compiler gives the removable boot-media drive.
pub const BOOT_MEDIA_DRIVE_ID: &str = "cdrom0";
/// Drive id of the main disk.
pub const MAIN_DRIVE_ID: &str = "drive0";
/// Drive id of an imported Linux root image.
pub const ROOT_DRIVE_ID: &str = "root";
/// File name of a freshly allocated emulation disk.
pub const DEFAULT_EMULATION_DISK: &str = "data.qcow2";
/// File name of a freshly allocated native disk.
pub const DEFAULT_NATIVE_DISK: &str = "data.img";

/// Immutable result of compiling a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CompiledConfiguration {
    Emulation(EmulationConfig),
    Native(NativeConfig),
}

impl CompiledConfiguration {
    pub fn name(&self) -> &str {
        match self {
            CompiledConfiguration::Emulation(config) => &config.name,
            CompiledConfiguration::Native(config) => &config.name,
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            CompiledConfiguration::Emulation(_) => Backend::Emulation,
            CompiledConfiguration::Native(_) => Backend::Native,
        }
    }

    pub fn as_emulation(&self) -> Option<&EmulationConfig> {
        match self {
            CompiledConfiguration::Emulation(config) => Some(config),
            CompiledConfiguration::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeConfig> {
        match self {
            CompiledConfiguration::Native(config) => Some(config),
            CompiledConfiguration::Emulation(_) => None,
        }
    }
}

// ============================================================================
// EMULATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Disk,
    Cd,
    Kernel,
    Initrd,
}

/// One emulator drive. `image_name` is relative to the VM data directory;
/// removable drives start empty and receive media after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    pub id: String,
    pub image_type: ImageType,
    pub interface: DriveInterface,
    pub image_name: Option<String>,
    pub removable: bool,
}

impl Drive {
    pub fn removable_cd(interface: DriveInterface) -> Self {
        Self {
            id: BOOT_MEDIA_DRIVE_ID.to_string(),
            image_type: ImageType::Cd,
            interface,
            image_name: None,
            removable: true,
        }
    }

    pub fn disk(id: &str, image_name: impl Into<String>, interface: DriveInterface) -> Self {
        Self {
            id: id.to_string(),
            image_type: ImageType::Disk,
            interface,
            image_name: Some(image_name.into()),
            removable: false,
        }
    }

    pub fn boot_asset(image_type: ImageType, image_name: impl Into<String>) -> Self {
        let id = match image_type {
            ImageType::Initrd => "initrd",
            _ => "kernel",
        };
        Self {
            id: id.to_string(),
            image_type,
            interface: DriveInterface::None,
            image_name: Some(image_name.into()),
            removable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// NAT through the host.
    Shared,
    Bridged,
    HostOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulationNetwork {
    pub mode: NetworkMode,
    pub card: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulationConfig {
    pub name: String,
    pub operating_system: OsFamily,
    pub architecture: Architecture,
    pub target: String,
    pub memory_mib: u64,
    pub cpu_count: u32,
    pub use_hypervisor: bool,
    pub use_uefi: bool,
    pub rtc_local_time: bool,
    pub display_card: String,
    pub drives: Vec<Drive>,
    pub networks: Vec<EmulationNetwork>,
    pub shared_directory_read_only: bool,
    /// Extra positional emulator arguments, in order.
    pub additional_arguments: Vec<String>,
}

impl EmulationConfig {
    pub fn drive(&self, id: &str) -> Option<&Drive> {
        self.drives.iter().find(|drive| drive.id == id)
    }
}

// ============================================================================
// NATIVE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BootLoader {
    MacOs {
        recovery_image: RestoreImage,
    },
    LinuxKernel {
        kernel: PathBuf,
        initial_ramdisk: Option<PathBuf>,
        command_line: String,
    },
    Efi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeDisk {
    /// Referenced in place, never copied.
    External { path: PathBuf, read_only: bool },
    /// Copied into the data directory under `image_name`.
    Imported {
        source: PathBuf,
        image_name: String,
        read_only: bool,
    },
    /// Allocated empty in the data directory.
    New { image_name: String, size_mib: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSharedDirectory {
    pub path: PathBuf,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayResolution {
    pub width: u32,
    pub height: u32,
    pub pixels_per_inch: u32,
}

impl Default for DisplayResolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1200,
            pixels_per_inch: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NativeDevices {
    pub display: Option<DisplayResolution>,
    pub audio: bool,
    pub keyboard: bool,
    pub pointer: bool,
    pub memory_balloon: bool,
    pub entropy: bool,
    pub networks: Vec<NetworkMode>,
    pub serial_console: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeConfig {
    pub name: String,
    pub operating_system: OsFamily,
    pub memory_bytes: u64,
    pub cpu_count: u32,
    pub platform: Option<MacPlatform>,
    pub boot_loader: Option<BootLoader>,
    pub disks: Vec<NativeDisk>,
    pub shared_directories: Vec<NativeSharedDirectory>,
    pub devices: NativeDevices,
}
