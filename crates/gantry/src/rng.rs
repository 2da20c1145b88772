//! RNG handles for generated quantities
//!
//! The RNG lives on the native side; the bridge only owns its lifecycle.
//! State advances exclusively through `param_constrain` with generated
//! quantities enabled, which takes the RNG by `&mut`, so two draws from
//! equal seeds produce equal streams.

use crate::error::Result;
use crate::ffi::ErrorSlot;
use crate::library::ModelLibrary;
use gantry_abi::RawRng;
use std::ptr::NonNull;
use std::sync::Arc;

/// A seeded RNG owned by a model library.
pub struct ModelRng {
    raw: NonNull<RawRng>,
    lib: Arc<ModelLibrary>,
}

impl ModelRng {
    /// Constructs an RNG in `lib` from `seed`.
    pub fn new(lib: &Arc<ModelLibrary>, seed: u32) -> Result<Self> {
        let mut slot = ErrorSlot::new(lib.symbols().free_error_msg);
        let raw = unsafe { (lib.symbols().rng_construct)(seed, slot.as_out()) };
        let raw = NonNull::new(raw).ok_or_else(|| slot.construct_failure("rng_construct"))?;
        tracing::debug!(library = lib.id(), seed, "constructed rng handle");
        Ok(Self {
            raw,
            lib: Arc::clone(lib),
        })
    }

    /// Raw handle for a state-advancing native call.
    pub(crate) fn raw_ptr(&mut self) -> *mut RawRng {
        self.raw.as_ptr()
    }

    /// Id of the library this RNG belongs to.
    pub(crate) fn library_id(&self) -> u64 {
        self.lib.id()
    }
}

impl Drop for ModelRng {
    fn drop(&mut self) {
        tracing::debug!(library = self.lib.id(), "destroying rng handle");
        unsafe { (self.lib.symbols().rng_destruct)(self.raw.as_ptr()) };
    }
}

impl std::fmt::Debug for ModelRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRng")
            .field("library", &self.lib.path())
            .field("raw", &self.raw)
            .finish()
    }
}

// The handle is an exclusive owner of the native state: every path that
// advances it requires `&mut ModelRng`, and the native side holds no other
// reference to it.
unsafe impl Send for ModelRng {}
unsafe impl Sync for ModelRng {}
