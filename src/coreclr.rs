//! The CoreCLR hosting ABI: raw entry-point signatures, the [`HostingApi`]
//! capability the orchestrator is written against, and the `libloading`
//! backed adapter that resolves the real entry points.

use std::ffi::CString;
use std::marker::PhantomData;
use std::ops::Deref;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::path::Path;
use std::ptr;

use libloading::Library;

use crate::error::{HostError, Result};

type CoreClrInitializeFn = unsafe extern "C" fn(
    *const c_char,        // exePath
    *const c_char,        // appDomainFriendlyName
    c_int,                // propertyCount
    *const *const c_char, // propertyKeys
    *const *const c_char, // propertyValues
    *mut *mut c_void,     // hostHandle
    *mut c_uint,          // domainId
) -> c_int;

type CoreClrCreateDelegateFn = unsafe extern "C" fn(
    *mut c_void,      // hostHandle
    c_uint,           // domainId
    *const c_char,    // entryPointAssemblyName
    *const c_char,    // entryPointTypeName
    *const c_char,    // entryPointMethodName
    *mut *mut c_void, // delegate
) -> c_int;

type CoreClrShutdownFn = unsafe extern "C" fn(*mut c_void, c_uint) -> c_int;

const INITIALIZE_SYMBOL: &str = "coreclr_initialize";
const CREATE_DELEGATE_SYMBOL: &str = "coreclr_create_delegate";
const SHUTDOWN_SYMBOL: &str = "coreclr_shutdown";

/// Untyped function pointer to a managed static method, as produced by
/// `coreclr_create_delegate`.
pub type RawDelegate = *mut c_void;

/// Handle to a started runtime paired with the id of the app domain it
/// created. Lives exactly as long as the loaded library; every hosting
/// call after initialization takes the pair.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeInstance {
    pub handle: *mut c_void,
    pub domain_id: c_uint,
}

/// The three hosting entry points as a capability. The orchestrator only
/// sees this trait, so the demo sequence can run against a mock in tests.
pub trait HostingApi {
    /// Starts the runtime rooted at `base_path` with the given property
    /// set, returning the handle/domain pair by value.
    fn initialize(
        &self,
        base_path: &Path,
        app_domain_name: &str,
        properties: &[(&str, &str)],
    ) -> Result<RuntimeInstance>;

    /// Resolves a managed static method to a native-callable delegate.
    fn create_delegate(
        &self,
        instance: RuntimeInstance,
        assembly_name: &str,
        type_name: &str,
        method_name: &str,
    ) -> Result<RawDelegate>;

    /// Stops the runtime. A negative status becomes [`HostError::Shutdown`];
    /// callers decide whether that is fatal.
    fn shutdown(&self, instance: RuntimeInstance) -> Result<()>;
}

/// A loaded CoreCLR library with its entry points resolved up front. The
/// library is unloaded when the value is dropped or [`CoreClr::close`] is
/// called, on every exit path, including symbol-resolution failures part
/// way through [`CoreClr::load`].
#[derive(Debug)]
pub struct CoreClr {
    library: Library,
    initialize: CoreClrInitializeFn,
    create_delegate: CoreClrCreateDelegateFn,
    shutdown: CoreClrShutdownFn,
}

impl CoreClr {
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading libcoreclr runs its initializers, which are well
        // behaved; there is no safe alternative for a foreign library.
        let library = unsafe { Library::new(path) }.map_err(|source| HostError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let initialize = resolve::<CoreClrInitializeFn>(&library, INITIALIZE_SYMBOL)?;
        let create_delegate = resolve::<CoreClrCreateDelegateFn>(&library, CREATE_DELEGATE_SYMBOL)?;
        let shutdown = resolve::<CoreClrShutdownFn>(&library, SHUTDOWN_SYMBOL)?;
        Ok(Self {
            library,
            initialize,
            create_delegate,
            shutdown,
        })
    }

    /// Unloads the library. Failure is reportable but leaves nothing for
    /// the caller to repair; the process can still exit cleanly.
    pub fn close(self) -> Result<()> {
        self.library
            .close()
            .map_err(|source| HostError::LibraryUnload { source })
    }
}

fn resolve<T: Copy>(library: &Library, symbol: &'static str) -> Result<T> {
    // SAFETY: the caller names a symbol whose type matches the hosting
    // header; the copied pointer stays valid while `library` is loaded.
    unsafe {
        library
            .get::<T>(symbol.as_bytes())
            .map(|entry| *entry)
            .map_err(|source| HostError::SymbolResolution { symbol, source })
    }
}

impl HostingApi for CoreClr {
    fn initialize(
        &self,
        base_path: &Path,
        app_domain_name: &str,
        properties: &[(&str, &str)],
    ) -> Result<RuntimeInstance> {
        let base_path = CString::new(base_path.to_string_lossy().into_owned())?;
        let app_domain_name = CString::new(app_domain_name)?;
        let keys = properties
            .iter()
            .map(|(key, _)| CString::new(*key))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let values = properties
            .iter()
            .map(|(_, value)| CString::new(*value))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let key_ptrs: Vec<*const c_char> = keys.iter().map(|key| key.as_ptr()).collect();
        let value_ptrs: Vec<*const c_char> = values.iter().map(|value| value.as_ptr()).collect();

        let mut handle = ptr::null_mut();
        let mut domain_id: c_uint = 0;
        // SAFETY: every pointer outlives the synchronous call and the
        // property count matches both arrays.
        let status = unsafe {
            (self.initialize)(
                base_path.as_ptr(),
                app_domain_name.as_ptr(),
                properties.len() as c_int,
                key_ptrs.as_ptr(),
                value_ptrs.as_ptr(),
                &mut handle,
                &mut domain_id,
            )
        };
        if status < 0 {
            return Err(HostError::Initialization { status });
        }
        Ok(RuntimeInstance { handle, domain_id })
    }

    fn create_delegate(
        &self,
        instance: RuntimeInstance,
        assembly_name: &str,
        type_name: &str,
        method_name: &str,
    ) -> Result<RawDelegate> {
        let assembly_name = CString::new(assembly_name)?;
        let type_name = CString::new(type_name)?;
        let method_name = CString::new(method_name)?;
        let mut delegate = ptr::null_mut();
        // SAFETY: the handle/domain pair comes from a successful
        // initialize on this same library.
        let status = unsafe {
            (self.create_delegate)(
                instance.handle,
                instance.domain_id,
                assembly_name.as_ptr(),
                type_name.as_ptr(),
                method_name.as_ptr(),
                &mut delegate,
            )
        };
        if status < 0 {
            return Err(HostError::DelegateCreation { status });
        }
        Ok(delegate)
    }

    fn shutdown(&self, instance: RuntimeInstance) -> Result<()> {
        // SAFETY: same pair as above; the runtime is shut down at most once.
        let status = unsafe { (self.shutdown)(instance.handle, instance.domain_id) };
        if status < 0 {
            return Err(HostError::Shutdown { status });
        }
        Ok(())
    }
}

/// Typed view over a [`RawDelegate`]. `T` must be the `extern "C"` function
/// pointer type matching the managed method's marshalled signature.
pub struct ManagedDelegate<T> {
    raw: RawDelegate,
    marker: PhantomData<T>,
}

impl<T> ManagedDelegate<T> {
    /// Callers guarantee that `raw` came from `create_delegate` for a
    /// method whose marshalled signature is exactly `T`.
    pub unsafe fn from_raw(raw: RawDelegate) -> Self {
        Self {
            raw,
            marker: PhantomData,
        }
    }
}

impl<T> Deref for ManagedDelegate<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // The delegate and `T` are both a single code pointer wide, so a
        // reference to the field reinterprets as a reference to the typed
        // function pointer.
        unsafe { &*(&self.raw as *const RawDelegate as *const T) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_a_missing_library_fails_without_symbol_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("libcoreclr-not-here.so");
        let err = CoreClr::load(&missing).unwrap_err();
        assert!(matches!(err, HostError::LibraryLoad { .. }));
    }

    #[test]
    fn typed_delegate_round_trips_the_raw_pointer() {
        extern "C" fn double_it(value: c_int) -> c_int {
            value * 2
        }

        type DoubleFn = extern "C" fn(c_int) -> c_int;
        let raw = double_it as *const c_void as RawDelegate;
        // SAFETY: `raw` really is a `DoubleFn`.
        let delegate = unsafe { ManagedDelegate::<DoubleFn>::from_raw(raw) };
        assert_eq!((*delegate)(21), 42);
    }
}
