//! Compatibility rules between guest OS, backend, architecture and host.
//!
//! Everything here is a pure predicate over [`HostCapabilities`], which the
//! caller injects. Host OS version checks live outside this crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Guest operating-system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    #[default]
    Other,
    #[serde(rename = "macos")]
    MacOs,
    Linux,
    Windows,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsFamily::Other => "other",
            OsFamily::MacOs => "macOS",
            OsFamily::Linux => "linux",
            OsFamily::Windows => "windows",
        };
        f.write_str(name)
    }
}

/// Guest CPU architecture, named the way the emulator names its system targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    I386,
    Aarch64,
    Arm,
    Riscv64,
    Ppc64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::I386 => "i386",
            Architecture::Aarch64 => "aarch64",
            Architecture::Arm => "arm",
            Architecture::Riscv64 => "riscv64",
            Architecture::Ppc64 => "ppc64",
        }
    }

    /// Architecture of the machine this crate was compiled for.
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Architecture::X86_64),
            "x86" => Some(Architecture::I386),
            "aarch64" => Some(Architecture::Aarch64),
            "arm" => Some(Architecture::Arm),
            "riscv64" => Some(Architecture::Riscv64),
            "powerpc64" => Some(Architecture::Ppc64),
            _ => None,
        }
    }

    /// 64-bit ARM. Windows guests on this class need an NVMe main disk.
    pub fn is_arm64(&self) -> bool {
        matches!(self, Architecture::Aarch64)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown architecture: {0}")]
pub struct ParseArchitectureError(String);

impl FromStr for Architecture {
    type Err = ParseArchitectureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            "i386" | "x86" => Ok(Architecture::I386),
            "aarch64" | "arm64" => Ok(Architecture::Aarch64),
            "arm" => Ok(Architecture::Arm),
            "riscv64" => Ok(Architecture::Riscv64),
            "ppc64" => Ok(Architecture::Ppc64),
            other => Err(ParseArchitectureError(other.to_string())),
        }
    }
}

/// Which hypervisor backend a compiled configuration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hardware emulation, any supported guest architecture.
    Emulation,
    /// Host-architecture virtualization through the OS framework.
    Native,
}

/// Capabilities of the host, supplied by the caller.
///
/// `modern_native` gates the native-backend features that only newer host
/// OS releases provide: macOS guests, directory sharing, display and input
/// devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCapabilities {
    pub native_architecture: Architecture,
    pub native_backend_available: bool,
    pub modern_native: bool,
    /// Whether the image conversion service exists on this host.
    pub conversion_available: bool,
}

impl HostCapabilities {
    /// Capabilities derivable without asking the host OS.
    ///
    /// The native backend flags default to off; the caller turns them on
    /// after probing the host.
    pub fn detect() -> Self {
        Self {
            native_architecture: Architecture::host().unwrap_or(Architecture::X86_64),
            native_backend_available: false,
            modern_native: false,
            conversion_available: true,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Queryable compatibility matrix.
#[derive(Debug, Clone)]
pub struct CapabilityMatrix {
    host: HostCapabilities,
}

impl CapabilityMatrix {
    pub fn new(host: HostCapabilities) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &HostCapabilities {
        &self.host
    }

    pub fn has_modern_native(&self) -> bool {
        self.host.native_backend_available && self.host.modern_native
    }

    /// Whether the native backend can run `os` on `arch`.
    ///
    /// Linux and Windows run only on the host's own architecture (`None`
    /// means "the host's"). macOS guests need the modern native capability.
    /// Other guests never run natively.
    pub fn supports_native_backend(&self, os: OsFamily, arch: Option<Architecture>) -> bool {
        if !self.host.native_backend_available {
            return false;
        }
        match os {
            OsFamily::Linux | OsFamily::Windows => {
                arch.is_none_or(|arch| arch == self.host.native_architecture)
            }
            OsFamily::MacOs => self.supports_macos_guest(),
            OsFamily::Other => false,
        }
    }

    /// macOS guests run exclusively on the native backend with the modern
    /// capability present.
    pub fn supports_macos_guest(&self) -> bool {
        self.has_modern_native()
    }

    /// Whether `backend` can boot `os` at all. The emulation backend cannot
    /// boot macOS.
    pub fn supports_os(&self, backend: Backend, os: OsFamily) -> bool {
        match backend {
            Backend::Emulation => os != OsFamily::MacOs,
            Backend::Native => self.supports_native_backend(os, None),
        }
    }

    /// Emulation needs an explicit architecture and machine target; the
    /// native backend implies the host's architecture.
    pub fn requires_architecture_selection(use_native_backend: bool) -> bool {
        !use_native_backend
    }

    /// Whether imported images are converted to qcow2 rather than copied.
    pub fn supports_conversion(&self, backend: Backend) -> bool {
        backend == Backend::Emulation && self.host.conversion_available
    }

    /// Whether the native backend can share a host directory with the guest.
    pub fn supports_native_sharing(&self) -> bool {
        self.has_modern_native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(native: bool, modern: bool) -> CapabilityMatrix {
        CapabilityMatrix::new(HostCapabilities {
            native_architecture: Architecture::Aarch64,
            native_backend_available: native,
            modern_native: modern,
            conversion_available: true,
        })
    }

    #[test]
    fn test_native_backend_linux_windows_host_arch_only() {
        let matrix = host(true, false);
        assert!(matrix.supports_native_backend(OsFamily::Linux, Some(Architecture::Aarch64)));
        assert!(matrix.supports_native_backend(OsFamily::Windows, None));
        assert!(!matrix.supports_native_backend(OsFamily::Linux, Some(Architecture::X86_64)));
        assert!(!matrix.supports_native_backend(OsFamily::Other, None));
    }

    #[test]
    fn test_macos_requires_modern_native() {
        assert!(!host(true, false).supports_native_backend(OsFamily::MacOs, None));
        assert!(host(true, true).supports_native_backend(OsFamily::MacOs, None));
        assert!(!host(false, true).supports_macos_guest());
    }

    #[test]
    fn test_emulation_never_boots_macos() {
        let matrix = host(true, true);
        assert!(!matrix.supports_os(Backend::Emulation, OsFamily::MacOs));
        assert!(matrix.supports_os(Backend::Emulation, OsFamily::Other));
    }

    #[test]
    fn test_architecture_selection_required_for_emulation() {
        assert!(CapabilityMatrix::requires_architecture_selection(false));
        assert!(!CapabilityMatrix::requires_architecture_selection(true));
    }

    #[test]
    fn test_conversion_only_for_emulation() {
        let matrix = host(true, true);
        assert!(matrix.supports_conversion(Backend::Emulation));
        assert!(!matrix.supports_conversion(Backend::Native));
    }

    #[test]
    fn test_architecture_parse() {
        assert_eq!("arm64".parse::<Architecture>(), Ok(Architecture::Aarch64));
        assert_eq!("x86_64".parse::<Architecture>(), Ok(Architecture::X86_64));
        assert!("sparc".parse::<Architecture>().is_err());
    }
}
