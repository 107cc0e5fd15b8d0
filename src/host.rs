//! The demonstration sequence: start the runtime, call
//! `ManagedLibrary.ManagedWorker.DoWork` exactly once with a progress
//! callback, print what it returned, shut the runtime down.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;

use tracing::{info, warn};

use crate::coreclr::{HostingApi, ManagedDelegate};
use crate::error::Result;
use crate::platform::MANAGED_ASSEMBLY_EXTENSION;
use crate::tpa::build_tpa_list;

/// Native callback handed to managed code for progress reports.
pub type ProgressCallbackFn = extern "C" fn(c_int) -> c_int;

/// `DoWork`'s marshalled signature:
/// `(jobName, iterations, dataSize, data, callback) -> string`.
pub type DoWorkFn = unsafe extern "C" fn(
    *const c_char,
    c_int,
    c_int,
    *const f64,
    ProgressCallbackFn,
) -> *const c_char;

const APP_DOMAIN_NAME: &str = "SampleHost";
const MANAGED_ASSEMBLY_NAME: &str = "ManagedLibrary";
const MANAGED_TYPE_NAME: &str = "ManagedLibrary.ManagedWorker";
const MANAGED_METHOD_NAME: &str = "DoWork";

const JOB_NAME: &str = "Test job";
const ITERATIONS: c_int = 3;
const SAMPLE_DATA: [f64; 4] = [0.0, 0.25, 0.5, 0.75];

/// Drives the whole demo against an already-loaded runtime library.
///
/// Initialization and delegate-creation failures abort the run; a failed
/// shutdown is logged and swallowed, the demo still counts as complete.
pub fn run<A: HostingApi>(api: &A, base_dir: &Path) -> Result<()> {
    let tpa_list = build_tpa_list(base_dir, MANAGED_ASSEMBLY_EXTENSION);
    let app_paths = base_dir.to_string_lossy();
    let properties = [
        ("TRUSTED_PLATFORM_ASSEMBLIES", tpa_list.as_str()),
        ("APP_PATHS", app_paths.as_ref()),
    ];

    let instance = api.initialize(base_dir, APP_DOMAIN_NAME, &properties)?;
    info!("CoreCLR started; AppDomain {} created", instance.domain_id);

    let raw = api.create_delegate(
        instance,
        MANAGED_ASSEMBLY_NAME,
        MANAGED_TYPE_NAME,
        MANAGED_METHOD_NAME,
    )?;
    info!("Managed delegate created");
    // SAFETY: `DoWork`'s marshalled signature is fixed by the managed
    // library; `DoWorkFn` mirrors it.
    let do_work = unsafe { ManagedDelegate::<DoWorkFn>::from_raw(raw) };

    let returned = invoke_worker(&do_work, report_progress)?;
    info!("Managed code returned: {returned}");

    match api.shutdown(instance) {
        Ok(()) => info!("CoreCLR successfully shutdown"),
        Err(err) => warn!("{err}"),
    }
    Ok(())
}

/// The single `DoWork` invocation, with the fixed sample inputs.
fn invoke_worker(
    do_work: &ManagedDelegate<DoWorkFn>,
    callback: ProgressCallbackFn,
) -> Result<String> {
    let job_name = CString::new(JOB_NAME)?;
    // SAFETY: all pointers outlive the synchronous call, `dataSize` is the
    // buffer's length, and the callback stays valid throughout.
    let returned = unsafe {
        (**do_work)(
            job_name.as_ptr(),
            ITERATIONS,
            SAMPLE_DATA.len() as c_int,
            SAMPLE_DATA.as_ptr(),
            callback,
        )
    };
    Ok(render_returned_text(returned))
}

/// Whatever comes back is treated as printable text; a null pointer
/// renders as the empty string.
fn render_returned_text(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }
    // SAFETY: a non-null return is a NUL-terminated string per the ABI.
    unsafe { CStr::from_ptr(text).to_string_lossy().into_owned() }
}

/// Called re-entrantly from managed code during the invocation; answers
/// with the negated value, the sample's acknowledgement convention.
pub extern "C" fn report_progress(progress: c_int) -> c_int {
    info!("Received status from managed code: {progress}");
    -progress
}
