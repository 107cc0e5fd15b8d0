mod coreclr;
mod error;
mod host;
mod platform;
mod tpa;

use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::coreclr::CoreClr;
use crate::error::Result;

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let base_dir = platform::self_directory()?;
    let library_path = base_dir.join(platform::CORECLR_FILE_NAME);
    let clr = CoreClr::load(&library_path)?;
    info!("Loaded CoreCLR from {}", library_path.display());

    host::run(&clr, &base_dir)?;

    // Best-effort unload; the process still exits 0 if it fails.
    if let Err(err) = clr.close() {
        warn!("{err}");
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
