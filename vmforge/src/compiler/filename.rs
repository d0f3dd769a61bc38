//! Names of imported images inside a VM's data directory.

use std::ffi::OsStr;
use std::path::Path;

const CONVERTED_EXTENSION: &str = "qcow2";

/// File name an imported image is stored under.
///
/// Converted images keep their stem and take a `.qcow2` extension. Without
/// conversion the image is copied and keeps its original name.
pub fn destination_filename(source: &Path, conversion_available: bool) -> String {
    let file_name = source.file_name().unwrap_or_else(|| OsStr::new("image"));
    if conversion_available {
        Path::new(file_name)
            .with_extension(CONVERTED_EXTENSION)
            .to_string_lossy()
            .into_owned()
    } else {
        file_name.to_string_lossy().into_owned()
    }
}

/// Base file name of a boot asset; the emulator loads these by name from
/// the data directory.
pub fn asset_filename(source: &Path) -> String {
    source
        .file_name()
        .unwrap_or_else(|| OsStr::new("image"))
        .to_string_lossy()
        .into_owned()
}
