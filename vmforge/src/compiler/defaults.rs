//! Per-(machine target, architecture) defaults for the emulation backend.

use crate::capability::Architecture;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bus a drive is attached to. [`DriveInterface::None`] is used for assets
/// the emulator loads directly (kernel, initrd) and renders as `""`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveInterface {
    None,
    Ide,
    Scsi,
    Sd,
    Floppy,
    Pflash,
    Virtio,
    Nvme,
    Usb,
}

impl DriveInterface {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveInterface::None => "",
            DriveInterface::Ide => "ide",
            DriveInterface::Scsi => "scsi",
            DriveInterface::Sd => "sd",
            DriveInterface::Floppy => "floppy",
            DriveInterface::Pflash => "pflash",
            DriveInterface::Virtio => "virtio",
            DriveInterface::Nvme => "nvme",
            DriveInterface::Usb => "usb",
        }
    }
}

impl fmt::Display for DriveInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defaults loaded for one machine target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefaults {
    pub display_card: String,
    pub network_card: String,
    pub disk_interface: DriveInterface,
    pub cd_interface: DriveInterface,
    pub use_uefi: bool,
    /// Every display device the architecture's emulator offers.
    pub supported_display_cards: Vec<String>,
}

/// Lookup of target defaults. Must be consulted before any field that
/// depends on the target or architecture is read.
pub trait DefaultsTable: Send + Sync {
    fn load_defaults(&self, target: &str, arch: Architecture) -> Option<TargetDefaults>;
}

/// Defaults compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDefaults;

const X86_DISPLAY_CARDS: &[&str] = &[
    "virtio-vga",
    "virtio-vga-gl",
    "virtio-gpu-pci",
    "virtio-gpu-gl-pci",
    "qxl-vga",
    "VGA",
    "cirrus-vga",
];

const ARM_DISPLAY_CARDS: &[&str] = &[
    "virtio-ramfb",
    "virtio-ramfb-gl",
    "virtio-gpu-pci",
    "virtio-gpu-gl-pci",
    "ramfb",
];

const RISCV_DISPLAY_CARDS: &[&str] = &["virtio-gpu-pci", "virtio-gpu-gl-pci", "ramfb"];

const PPC_DISPLAY_CARDS: &[&str] = &["VGA", "virtio-vga"];

fn cards(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

impl BuiltinDefaults {
    /// Machine target offered first for an architecture.
    pub fn default_target(arch: Architecture) -> &'static str {
        match arch {
            Architecture::X86_64 | Architecture::I386 => "q35",
            Architecture::Aarch64 | Architecture::Arm | Architecture::Riscv64 => "virt",
            Architecture::Ppc64 => "pseries",
        }
    }
}

impl DefaultsTable for BuiltinDefaults {
    fn load_defaults(&self, target: &str, arch: Architecture) -> Option<TargetDefaults> {
        let defaults = match (arch, target) {
            (Architecture::X86_64 | Architecture::I386, "q35") => TargetDefaults {
                display_card: "virtio-vga".into(),
                network_card: "virtio-net-pci".into(),
                disk_interface: DriveInterface::Ide,
                cd_interface: DriveInterface::Ide,
                use_uefi: true,
                supported_display_cards: cards(X86_DISPLAY_CARDS),
            },
            (Architecture::X86_64 | Architecture::I386, "pc") => TargetDefaults {
                display_card: "cirrus-vga".into(),
                network_card: "e1000".into(),
                disk_interface: DriveInterface::Ide,
                cd_interface: DriveInterface::Ide,
                use_uefi: false,
                supported_display_cards: cards(X86_DISPLAY_CARDS),
            },
            (Architecture::Aarch64, "virt") => TargetDefaults {
                display_card: "virtio-ramfb".into(),
                network_card: "virtio-net-pci".into(),
                disk_interface: DriveInterface::Virtio,
                cd_interface: DriveInterface::Usb,
                use_uefi: true,
                supported_display_cards: cards(ARM_DISPLAY_CARDS),
            },
            (Architecture::Arm, "virt") => TargetDefaults {
                display_card: "virtio-ramfb".into(),
                network_card: "virtio-net-pci".into(),
                disk_interface: DriveInterface::Virtio,
                cd_interface: DriveInterface::Usb,
                use_uefi: false,
                supported_display_cards: cards(ARM_DISPLAY_CARDS),
            },
            (Architecture::Riscv64, "virt") => TargetDefaults {
                display_card: "virtio-gpu-pci".into(),
                network_card: "virtio-net-pci".into(),
                disk_interface: DriveInterface::Virtio,
                cd_interface: DriveInterface::Scsi,
                use_uefi: false,
                supported_display_cards: cards(RISCV_DISPLAY_CARDS),
            },
            (Architecture::Ppc64, "pseries") => TargetDefaults {
                display_card: "VGA".into(),
                network_card: "virtio-net-pci".into(),
                disk_interface: DriveInterface::Scsi,
                cd_interface: DriveInterface::Scsi,
                use_uefi: false,
                supported_display_cards: cards(PPC_DISPLAY_CARDS),
            },
            _ => return None,
        };
        Some(defaults)
    }
}
