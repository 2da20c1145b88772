//! Loading compiled model libraries
//!
//! `ModelLibrary` wraps one `dlopen` of a model shared object: it resolves
//! the full `gt_*` symbol table up front, reads the library's version, and
//! hands out the function pointers every handle type calls through.
//!
//! # Unload policy
//!
//! Dropping a `ModelLibrary` leaves the OS image mapped. Unmapping code
//! that another thread may still be executing (a model evaluation, a print
//! callback) crashes or deadlocks inside the system loader, and the bridge
//! cannot see those threads. Reclaiming the mapping is therefore opt-in
//! through [`ModelLibrary::unload`], which is `unsafe` and spells out what
//! the caller must guarantee.

use crate::error::{BridgeError, Result};
use crate::ffi::{self, ErrorSlot, Symbols};
use gantry_abi::{PrintCallback, RC_OK};
use libloading::Library;
use semver::Version;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// In-process ids, one per successful open.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Canonical paths that have been opened at least once. The OS loader
/// aliases repeated opens of one path to the same image, so per-image
/// state (the print callback) is shared across them.
static OPENED: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn client_version() -> Version {
    let parse = |text: &str| text.parse().unwrap_or(0);
    Version::new(
        parse(env!("CARGO_PKG_VERSION_MAJOR")),
        parse(env!("CARGO_PKG_VERSION_MINOR")),
        parse(env!("CARGO_PKG_VERSION_PATCH")),
    )
}

/// A version pair is compatible when the majors agree and the library is
/// at least as new as the client within that major.
fn versions_compatible(library: &Version, client: &Version) -> bool {
    library.major == client.major && client.minor <= library.minor
}

/// A loaded model shared object and its resolved symbol table.
pub struct ModelLibrary {
    lib: ManuallyDrop<Library>,
    symbols: Symbols,
    path: PathBuf,
    version: Version,
    id: u64,
}

impl ModelLibrary {
    /// Opens a compiled model library.
    ///
    /// The path is canonicalized first, so a missing file fails with an
    /// I/O error before any loader call. Loading resolves every `gt_*`
    /// symbol and reads the library version; a library that opens
    /// successfully supports the full operation set.
    ///
    /// An incompatible version logs a warning and continues. Reopening a
    /// path that was opened before also logs a warning: the OS loader may
    /// reuse the first image, in which case the two handles share
    /// per-image state such as the print callback.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let requested = path.as_ref();
        let canonical = requested
            .canonicalize()
            .map_err(|source| BridgeError::LibraryOpen {
                path: requested.to_path_buf(),
                source,
            })?;

        let lib = unsafe { Library::new(&canonical) }?;
        let symbols = unsafe { Symbols::load(&lib) }?;
        let version = unsafe { ffi::read_version(&lib) }?;

        let client = client_version();
        if !versions_compatible(&version, &client) {
            tracing::warn!(
                library = %version,
                client = %client,
                path = %canonical.display(),
                "model library version is incompatible with this client; continuing"
            );
        }

        {
            let mut opened = OPENED.lock().unwrap_or_else(PoisonError::into_inner);
            if opened.contains(&canonical) {
                tracing::warn!(
                    path = %canonical.display(),
                    "path was already opened in this process; the loader may reuse the first image"
                );
            } else {
                opened.push(canonical.clone());
            }
        }

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %canonical.display(), %version, id, "loaded model library");

        Ok(Self {
            lib: ManuallyDrop::new(lib),
            symbols,
            path: canonical,
            version,
            id,
        })
    }

    /// The canonicalized path this library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The version the library reports through its data symbols.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// In-process id of this open. Distinct for every `open`, even for the
    /// same path; used to reject mixing handles across libraries.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Redirects the library's print stream, or restores stdout with
    /// `None`. The setting is per loaded image and affects every model
    /// handle backed by it, whenever constructed.
    ///
    /// # Safety
    ///
    /// The callback must stay callable for as long as the image can emit
    /// output (for a leaked image, that is the life of the process unless
    /// it is replaced or cleared). It must tolerate concurrent invocation
    /// from any thread evaluating a model, and it must not unwind.
    pub unsafe fn set_print_callback(&self, callback: Option<PrintCallback>) -> Result<()> {
        let mut slot = ErrorSlot::new(self.symbols.free_error_msg);
        let rc = (self.symbols.set_print_callback)(callback, slot.as_out());
        if rc != RC_OK {
            return Err(slot.failure("set_print_callback"));
        }
        Ok(())
    }

    /// Actually unmaps the library image.
    ///
    /// # Safety
    ///
    /// No `Model` or `ModelRng` from this library may be alive, no thread
    /// may be executing its code, and no print callback registered with it
    /// may still fire. The resolved function pointers die with the image;
    /// the caller must guarantee nothing can call through them afterwards.
    pub unsafe fn unload(mut self) {
        tracing::debug!(path = %self.path.display(), id = self.id, "unloading model library");
        // Taking the Library out is what arms the real dlclose; the rest of
        // `self` drops normally (ManuallyDrop never double-drops).
        let lib = ManuallyDrop::take(&mut self.lib);
        drop(lib);
    }
}

impl Drop for ModelLibrary {
    // The image stays mapped; see the module doc.
    fn drop(&mut self) {
        tracing::debug!(path = %self.path.display(), id = self.id, "dropping model library handle");
    }
}

impl std::fmt::Debug for ModelLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLibrary")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility_rules() {
        let client = Version::new(0, 1, 0);
        assert!(versions_compatible(&Version::new(0, 1, 0), &client));
        assert!(versions_compatible(&Version::new(0, 2, 0), &client));
        assert!(versions_compatible(&Version::new(0, 1, 9), &client));
        assert!(!versions_compatible(&Version::new(1, 1, 0), &client));
        assert!(!versions_compatible(&Version::new(0, 0, 9), &client));
    }

    #[test]
    fn test_client_version_matches_manifest() {
        let version = client_version();
        assert_eq!(version.to_string(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_open_missing_path_is_an_io_error() {
        let err = ModelLibrary::open("/no/such/model_library.so").unwrap_err();
        match err {
            BridgeError::LibraryOpen { path, .. } => {
                assert_eq!(path, PathBuf::from("/no/such/model_library.so"));
            }
            other => panic!("expected LibraryOpen, got {other:?}"),
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let first = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let second = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        assert_ne!(first, second);
    }
}
