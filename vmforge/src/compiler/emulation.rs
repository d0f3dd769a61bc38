//! Selection → emulation backend configuration.

use super::defaults::{DefaultsTable, DriveInterface};
use super::filename::{asset_filename, destination_filename};
use super::types::{
    DEFAULT_EMULATION_DISK, Drive, EmulationConfig, EmulationNetwork, ImageType, MAIN_DRIVE_ID,
    NetworkMode, ROOT_DRIVE_ID,
};
use crate::capability::{Backend, CapabilityMatrix, OsFamily};
use crate::selection::SelectionState;
use vmforge_shared::errors::ConfigurationError;

pub(super) fn build(
    state: &SelectionState,
    matrix: &CapabilityMatrix,
    defaults_table: &dyn DefaultsTable,
) -> Result<EmulationConfig, ConfigurationError> {
    let os = state.operating_system();
    if os == OsFamily::MacOs {
        return Err(ConfigurationError::UnsupportedBackend { os: os.to_string() });
    }

    let architecture = state
        .architecture()
        .ok_or(ConfigurationError::MissingArchitecture)?;
    let target = state
        .target()
        .ok_or(ConfigurationError::MissingTarget)?
        .to_string();
    let defaults = defaults_table
        .load_defaults(&target, architecture)
        .ok_or_else(|| ConfigurationError::UnknownTarget {
            target: target.clone(),
            architecture: architecture.to_string(),
        })?;

    let use_uefi = if os == OsFamily::Windows {
        state.use_uefi()
    } else {
        defaults.use_uefi
    };

    let mut display_card = defaults.display_card.clone();
    if state.use_display_acceleration() {
        let gl_card = format!("{}-gl", display_card);
        if defaults.supported_display_cards.contains(&gl_card) {
            display_card = gl_card;
        } else {
            tracing::debug!(
                display_card = %display_card,
                "No accelerated variant for display card, keeping default"
            );
        }
    }

    let main_interface = if architecture.is_arm64() && os == OsFamily::Windows {
        DriveInterface::Nvme
    } else {
        defaults.disk_interface
    };

    let conversion = matrix.supports_conversion(Backend::Emulation);
    let wants_boot_media = !state.skip_boot_image() && state.boot_image().is_some();
    let mut drives = Vec::new();
    let mut additional_arguments = Vec::new();
    let mut rtc_local_time = false;
    let mut has_windows_disk = false;

    if wants_boot_media && os != OsFamily::Windows {
        drives.push(Drive::removable_cd(defaults.cd_interface));
    }

    match os {
        OsFamily::Other | OsFamily::MacOs => {}
        OsFamily::Linux => {
            if state.use_kernel_boot() {
                let kernel = state.kernel().ok_or(ConfigurationError::MissingKernel)?;
                drives.push(Drive::boot_asset(ImageType::Kernel, asset_filename(kernel)));
                if let Some(initrd) = state.initial_ramdisk() {
                    drives.push(Drive::boot_asset(ImageType::Initrd, asset_filename(initrd)));
                }
                if let Some(root) = state.root_image() {
                    drives.push(Drive::disk(
                        ROOT_DRIVE_ID,
                        destination_filename(root, conversion),
                        main_interface,
                    ));
                }
                if !state.boot_arguments().is_empty() {
                    additional_arguments.push("-append".to_string());
                    additional_arguments.push(state.boot_arguments().to_string());
                }
            }
        }
        OsFamily::Windows => {
            rtc_local_time = true;
            if let Some(disk) = state.windows_disk() {
                drives.push(Drive::disk(
                    MAIN_DRIVE_ID,
                    destination_filename(disk, conversion),
                    main_interface,
                ));
                // Disk before CD so firmware boots the installed system first.
                drives.push(Drive::removable_cd(defaults.cd_interface));
                has_windows_disk = true;
            } else if wants_boot_media {
                drives.push(Drive::removable_cd(defaults.cd_interface));
            }
        }
    }

    if !has_windows_disk {
        drives.push(Drive::disk(MAIN_DRIVE_ID, DEFAULT_EMULATION_DISK, main_interface));
    }

    Ok(EmulationConfig {
        name: state.name().to_string(),
        operating_system: os,
        architecture,
        target,
        memory_mib: state.memory_mib(),
        cpu_count: state.cpu_count(),
        use_hypervisor: state.use_hardware_virtualization(),
        use_uefi,
        rtc_local_time,
        display_card,
        drives,
        networks: vec![EmulationNetwork {
            mode: NetworkMode::Shared,
            card: defaults.network_card,
        }],
        shared_directory_read_only: state.shared_directory_read_only(),
        additional_arguments,
    })
}
