//! Selection → native virtualization backend configuration.

use super::filename::destination_filename;
use super::types::{
    BootLoader, DEFAULT_NATIVE_DISK, DisplayResolution, NativeConfig, NativeDevices, NativeDisk,
    NativeSharedDirectory, NetworkMode,
};
use crate::capability::{Backend, CapabilityMatrix, OsFamily};
use crate::selection::SelectionState;
use vmforge_shared::errors::ConfigurationError;

pub(super) fn build(
    state: &SelectionState,
    matrix: &CapabilityMatrix,
) -> Result<NativeConfig, ConfigurationError> {
    let os = state.operating_system();
    if !matrix.host().native_backend_available {
        return Err(ConfigurationError::UnsupportedCombination(
            "native virtualization is not available on this host".into(),
        ));
    }

    let modern = matrix.has_modern_native();
    let conversion = matrix.supports_conversion(Backend::Native);
    let mut platform = None;
    let mut boot_loader = None;
    let mut disks = Vec::new();
    let mut skip_default_disk = false;

    if !state.skip_boot_image()
        && let Some(image) = state.boot_image()
    {
        disks.push(NativeDisk::External {
            path: image.to_path_buf(),
            read_only: true,
        });
    }

    match os {
        OsFamily::Other => {}
        OsFamily::MacOs => {
            if !modern {
                return Err(ConfigurationError::UnsupportedCombination(
                    "macOS guests need a newer host virtualization framework".into(),
                ));
            }
            let descriptor = state
                .mac_platform()
                .ok_or(ConfigurationError::MissingPlatform)?;
            let recovery_image = state
                .mac_recovery_image()
                .ok_or(ConfigurationError::MissingPlatform)?;
            platform = Some(descriptor.clone());
            boot_loader = Some(BootLoader::MacOs {
                recovery_image: recovery_image.clone(),
            });
        }
        OsFamily::Linux => {
            if state.use_kernel_boot() {
                let kernel = state.kernel().ok_or(ConfigurationError::MissingKernel)?;
                boot_loader = Some(BootLoader::LinuxKernel {
                    kernel: kernel.to_path_buf(),
                    initial_ramdisk: state.initial_ramdisk().map(|p| p.to_path_buf()),
                    command_line: state.boot_arguments().to_string(),
                });
                if let Some(root) = state.root_image() {
                    disks.push(NativeDisk::Imported {
                        source: root.to_path_buf(),
                        image_name: destination_filename(root, conversion),
                        read_only: false,
                    });
                    skip_default_disk = true;
                }
            } else {
                boot_loader = Some(BootLoader::Efi);
            }
        }
        OsFamily::Windows => {
            boot_loader = Some(BootLoader::Efi);
            if let Some(disk) = state.windows_disk() {
                disks.push(NativeDisk::Imported {
                    source: disk.to_path_buf(),
                    image_name: destination_filename(disk, conversion),
                    read_only: false,
                });
                skip_default_disk = true;
            }
        }
    }

    if !skip_default_disk {
        let size_mib = state.storage_size_gib().checked_mul(1024).ok_or_else(|| {
            ConfigurationError::UnsupportedCombination(format!(
                "storage size of {} GiB is too large",
                state.storage_size_gib()
            ))
        })?;
        disks.push(NativeDisk::New {
            image_name: DEFAULT_NATIVE_DISK.to_string(),
            size_mib,
        });
    }

    let mut shared_directories = Vec::new();
    if modern && let Some(path) = state.shared_directory() {
        shared_directories.push(NativeSharedDirectory {
            path: path.to_path_buf(),
            read_only: state.shared_directory_read_only(),
        });
    }

    let mut devices = NativeDevices {
        memory_balloon: true,
        entropy: true,
        networks: vec![NetworkMode::Shared],
        serial_console: os == OsFamily::Linux,
        ..Default::default()
    };
    if modern {
        devices.display = Some(DisplayResolution::default());
        devices.audio = true;
        devices.keyboard = true;
        devices.pointer = true;
    }

    Ok(NativeConfig {
        name: state.name().to_string(),
        operating_system: os,
        memory_bytes: state.memory_bytes(),
        cpu_count: state.cpu_count(),
        platform,
        boot_loader,
        disks,
        shared_directories,
        devices,
    })
}
