use std::ffi::NulError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

/// Everything that can go wrong while driving the runtime. The first five
/// variants are fatal to the host; `Shutdown` and `LibraryUnload` are
/// reported by the caller and otherwise ignored.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to resolve the host executable directory: {source}")]
    SelfPath {
        #[source]
        source: io::Error,
    },
    #[error("failed to load CoreCLR from {}: {source}", .path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("{symbol} not found: {source}")]
    SymbolResolution {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("coreclr_initialize failed - status: {status:#010x}")]
    Initialization { status: i32 },
    #[error("coreclr_create_delegate failed - status: {status:#010x}")]
    DelegateCreation { status: i32 },
    #[error("coreclr_shutdown failed - status: {status:#010x}")]
    Shutdown { status: i32 },
    #[error("failed to unload the CoreCLR library: {source}")]
    LibraryUnload {
        #[source]
        source: libloading::Error,
    },
    #[error("host string contains an interior nul byte: {0}")]
    InvalidHostString(#[from] NulError),
}
