//! Mutable record of the user's wizard choices.
//!
//! Fields are private; every setter applies its full cascade before it
//! returns, so the flag invariants hold after every mutation:
//!
//! - native backend implies hardware virtualization
//! - kernel boot implies `skip_boot_image` and no boot image

use crate::capability::{Architecture, Backend, OsFamily};
use crate::resolver::{MacPlatform, RestoreImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const BYTES_IN_MIB: u64 = 1024 * 1024;

/// Recommended memory and storage for a guest OS family.
pub fn recommended_sizing(os: OsFamily) -> (u64, u64) {
    match os {
        OsFamily::Windows | OsFamily::MacOs => (4096 * BYTES_IN_MIB, 64),
        OsFamily::Linux | OsFamily::Other => (512 * BYTES_IN_MIB, 8),
    }
}

/// Every choice made so far in one VM-creation workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    use_hardware_virtualization: bool,
    use_native_backend: bool,

    operating_system: OsFamily,

    use_kernel_boot: bool,
    skip_boot_image: bool,
    boot_image: Option<PathBuf>,
    kernel: Option<PathBuf>,
    initial_ramdisk: Option<PathBuf>,
    root_image: Option<PathBuf>,
    boot_arguments: String,
    windows_disk: Option<PathBuf>,
    use_uefi: bool,
    mac_platform: Option<MacPlatform>,
    mac_recovery_image: Option<RestoreImage>,

    architecture: Option<Architecture>,
    target: Option<String>,
    memory_bytes: u64,
    /// Zero selects the backend default.
    cpu_count: u32,
    storage_size_gib: u64,
    use_display_acceleration: bool,
    sizing_overridden: bool,

    shared_directory: Option<PathBuf>,
    shared_directory_read_only: bool,

    name: String,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionState {
    pub fn new() -> Self {
        let (memory_bytes, storage_size_gib) = recommended_sizing(OsFamily::Other);
        Self {
            use_hardware_virtualization: false,
            use_native_backend: false,
            operating_system: OsFamily::Other,
            use_kernel_boot: false,
            skip_boot_image: false,
            boot_image: None,
            kernel: None,
            initial_ramdisk: None,
            root_image: None,
            boot_arguments: String::new(),
            windows_disk: None,
            use_uefi: true,
            mac_platform: None,
            mac_recovery_image: None,
            architecture: None,
            target: None,
            memory_bytes,
            cpu_count: 0,
            storage_size_gib,
            use_display_acceleration: false,
            sizing_overridden: false,
            shared_directory: None,
            shared_directory_read_only: false,
            name: String::new(),
        }
    }

    // ---- backend ---------------------------------------------------------

    pub fn use_hardware_virtualization(&self) -> bool {
        self.use_hardware_virtualization
    }

    /// Turning hardware virtualization off also turns the native backend off.
    pub fn set_use_hardware_virtualization(&mut self, enabled: bool) {
        self.use_hardware_virtualization = enabled;
        if !enabled {
            self.use_native_backend = false;
        }
    }

    pub fn use_native_backend(&self) -> bool {
        self.use_native_backend
    }

    /// Turning the native backend on also turns hardware virtualization on.
    pub fn set_use_native_backend(&mut self, enabled: bool) {
        self.use_native_backend = enabled;
        if enabled {
            self.use_hardware_virtualization = true;
        }
    }

    pub fn backend(&self) -> Backend {
        if self.use_hardware_virtualization && self.use_native_backend {
            Backend::Native
        } else {
            Backend::Emulation
        }
    }

    // ---- operating system ------------------------------------------------

    pub fn operating_system(&self) -> OsFamily {
        self.operating_system
    }

    /// Select the guest OS family. Memory and storage follow the family's
    /// recommendation until the user sizes them explicitly.
    pub fn set_operating_system(&mut self, os: OsFamily) {
        self.operating_system = os;
        if !self.sizing_overridden {
            let (memory_bytes, storage_size_gib) = recommended_sizing(os);
            self.memory_bytes = memory_bytes;
            self.storage_size_gib = storage_size_gib;
        }
    }

    // ---- boot source -----------------------------------------------------

    pub fn use_kernel_boot(&self) -> bool {
        self.use_kernel_boot
    }

    /// Kernel boot replaces the boot image: `skip_boot_image` follows the
    /// flag and any selected boot image is cleared.
    pub fn set_use_kernel_boot(&mut self, enabled: bool) {
        self.use_kernel_boot = enabled;
        self.skip_boot_image = enabled;
        self.boot_image = None;
    }

    pub fn skip_boot_image(&self) -> bool {
        self.skip_boot_image
    }

    /// Clearing the flag while kernel boot is on turns kernel boot off.
    pub fn set_skip_boot_image(&mut self, skip: bool) {
        if !skip && self.use_kernel_boot {
            self.use_kernel_boot = false;
        }
        self.skip_boot_image = skip;
        if skip {
            self.boot_image = None;
        }
    }

    pub fn boot_image(&self) -> Option<&Path> {
        self.boot_image.as_deref()
    }

    /// Selecting a boot image leaves kernel boot and un-skips the image.
    pub fn set_boot_image(&mut self, path: Option<PathBuf>) {
        if path.is_some() {
            self.use_kernel_boot = false;
            self.skip_boot_image = false;
        }
        self.boot_image = path;
    }

    pub fn kernel(&self) -> Option<&Path> {
        self.kernel.as_deref()
    }

    pub fn set_kernel(&mut self, path: Option<PathBuf>) {
        self.kernel = path;
    }

    pub fn initial_ramdisk(&self) -> Option<&Path> {
        self.initial_ramdisk.as_deref()
    }

    pub fn set_initial_ramdisk(&mut self, path: Option<PathBuf>) {
        self.initial_ramdisk = path;
    }

    pub fn root_image(&self) -> Option<&Path> {
        self.root_image.as_deref()
    }

    pub fn set_root_image(&mut self, path: Option<PathBuf>) {
        self.root_image = path;
    }

    pub fn boot_arguments(&self) -> &str {
        &self.boot_arguments
    }

    pub fn set_boot_arguments(&mut self, args: impl Into<String>) {
        self.boot_arguments = args.into();
    }

    pub fn windows_disk(&self) -> Option<&Path> {
        self.windows_disk.as_deref()
    }

    pub fn set_windows_disk(&mut self, path: Option<PathBuf>) {
        self.windows_disk = path;
    }

    pub fn use_uefi(&self) -> bool {
        self.use_uefi
    }

    pub fn set_use_uefi(&mut self, enabled: bool) {
        self.use_uefi = enabled;
    }

    pub fn mac_platform(&self) -> Option<&MacPlatform> {
        self.mac_platform.as_ref()
    }

    pub fn set_mac_platform(&mut self, platform: Option<MacPlatform>) {
        self.mac_platform = platform;
    }

    pub fn mac_recovery_image(&self) -> Option<&RestoreImage> {
        self.mac_recovery_image.as_ref()
    }

    pub fn set_mac_recovery_image(&mut self, image: Option<RestoreImage>) {
        self.mac_recovery_image = image;
    }

    // ---- hardware --------------------------------------------------------

    pub fn architecture(&self) -> Option<Architecture> {
        self.architecture
    }

    /// Changing architecture invalidates the machine target.
    pub fn set_architecture(&mut self, arch: Option<Architecture>) {
        if self.architecture != arch {
            self.target = None;
        }
        self.architecture = arch;
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
    }

    pub fn memory_bytes(&self) -> u64 {
        self.memory_bytes
    }

    pub fn memory_mib(&self) -> u64 {
        self.memory_bytes / BYTES_IN_MIB
    }

    pub fn set_memory_bytes(&mut self, bytes: u64) {
        self.memory_bytes = bytes;
        self.sizing_overridden = true;
    }

    pub fn cpu_count(&self) -> u32 {
        self.cpu_count
    }

    pub fn set_cpu_count(&mut self, count: u32) {
        self.cpu_count = count;
    }

    pub fn storage_size_gib(&self) -> u64 {
        self.storage_size_gib
    }

    pub fn set_storage_size_gib(&mut self, gib: u64) {
        self.storage_size_gib = gib;
        self.sizing_overridden = true;
    }

    pub fn use_display_acceleration(&self) -> bool {
        self.use_display_acceleration
    }

    pub fn set_use_display_acceleration(&mut self, enabled: bool) {
        self.use_display_acceleration = enabled;
    }

    // ---- sharing ---------------------------------------------------------

    pub fn shared_directory(&self) -> Option<&Path> {
        self.shared_directory.as_deref()
    }

    pub fn set_shared_directory(&mut self, path: Option<PathBuf>) {
        self.shared_directory = path;
    }

    pub fn shared_directory_read_only(&self) -> bool {
        self.shared_directory_read_only
    }

    pub fn set_shared_directory_read_only(&mut self, read_only: bool) {
        self.shared_directory_read_only = read_only;
    }

    // ---- metadata --------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Ordered rows describing the pending VM, shown on the summary step.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Name", self.name.clone()),
            (
                "Engine",
                match self.backend() {
                    Backend::Native => "Native virtualization".to_string(),
                    Backend::Emulation if self.use_hardware_virtualization => {
                        "Emulation (accelerated)".to_string()
                    }
                    Backend::Emulation => "Emulation".to_string(),
                },
            ),
            ("Operating System", self.operating_system.to_string()),
        ];

        if let Some(arch) = self.architecture {
            rows.push(("Architecture", arch.to_string()));
        }
        if let Some(target) = &self.target {
            rows.push(("Machine", target.clone()));
        }
        rows.push(("Memory", format!("{} MiB", self.memory_mib())));
        rows.push((
            "CPU",
            if self.cpu_count == 0 {
                "Default".to_string()
            } else {
                format!("{} cores", self.cpu_count)
            },
        ));
        rows.push(("Storage", format!("{} GiB", self.storage_size_gib)));

        if self.use_kernel_boot {
            if let Some(kernel) = &self.kernel {
                rows.push(("Kernel", kernel.display().to_string()));
            }
            if let Some(initrd) = &self.initial_ramdisk {
                rows.push(("Initial Ramdisk", initrd.display().to_string()));
            }
            if let Some(root) = &self.root_image {
                rows.push(("Root Image", root.display().to_string()));
            }
            if !self.boot_arguments.is_empty() {
                rows.push(("Boot Arguments", self.boot_arguments.clone()));
            }
        } else if let Some(image) = &self.boot_image {
            rows.push(("Boot Image", image.display().to_string()));
        }
        if let Some(disk) = &self.windows_disk {
            rows.push(("Windows Disk", disk.display().to_string()));
        }
        if let Some(dir) = &self.shared_directory {
            let mode = if self.shared_directory_read_only {
                " (read only)"
            } else {
                ""
            };
            rows.push(("Shared Directory", format!("{}{}", dir.display(), mode)));
        }

        rows
    }
}
