//! Per-platform constants and self-location. Everything else in the host
//! is platform-independent; `libloading` and `std::fs` cover the loader
//! and directory APIs.

use std::env;
use std::io;
use std::path::PathBuf;

use crate::error::{HostError, Result};

#[cfg(windows)]
pub const CORECLR_FILE_NAME: &str = "coreclr.dll";
#[cfg(target_os = "macos")]
pub const CORECLR_FILE_NAME: &str = "libcoreclr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const CORECLR_FILE_NAME: &str = "libcoreclr.so";

/// Managed assemblies keep the `.dll` suffix on every platform.
pub const MANAGED_ASSEMBLY_EXTENSION: &str = ".dll";

/// Separator between entries of the trusted assembly list.
#[cfg(windows)]
pub const PATH_LIST_DELIMITER: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_DELIMITER: char = ':';

/// Directory containing the running executable. The runtime library and
/// the managed assemblies are expected to sit next to the host binary.
pub fn self_directory() -> Result<PathBuf> {
    let exe = env::current_exe().map_err(|source| HostError::SelfPath { source })?;
    let dir = exe.parent().ok_or_else(|| HostError::SelfPath {
        source: io::Error::new(
            io::ErrorKind::NotFound,
            "executable path has no parent directory",
        ),
    })?;
    Ok(dir.to_path_buf())
}
