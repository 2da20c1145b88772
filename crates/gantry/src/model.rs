//! Model handles and the safe operation surface
//!
//! A `Model` owns one native model instance plus an `Arc` of the library
//! that backs it, so a handle can never outlive its code. Every operation
//! validates buffer lengths against the model's own dimension queries
//! *before* the native call; the C side is entitled to assume agreed
//! lengths and a sizing mistake must fail loudly on this side of the
//! boundary, not scribble on the heap.
//!
//! Operations that fill an output vector come in two forms: an allocating
//! one returning `Vec<f64>`, and an `_into` twin writing a caller-provided
//! slice for hot loops that reuse buffers.

use crate::data::ModelData;
use crate::error::{BridgeError, Result};
use crate::ffi::ErrorSlot;
use crate::library::ModelLibrary;
use crate::rng::ModelRng;
use gantry_abi::{RawModel, RC_OK};
use std::ffi::{CStr, CString};
use std::ptr::{self, NonNull};
use std::sync::Arc;

/// Marker line a library's `info()` must carry for handles to be shared
/// across threads.
const THREADSAFE_MARKER: &str = "THREADSAFE=true";

fn check_len(name: &'static str, got: usize, want: usize) -> Result<()> {
    if got == want {
        Ok(())
    } else {
        Err(BridgeError::BufferLength { name, got, want })
    }
}

fn split_names(joined: &str) -> Vec<&str> {
    if joined.is_empty() {
        Vec::new()
    } else {
        joined.split(',').collect()
    }
}

/// A constructed model instance inside a loaded library.
pub struct Model {
    raw: NonNull<RawModel>,
    lib: Arc<ModelLibrary>,
}

impl Model {
    /// Constructs a model from a data payload and seed.
    ///
    /// Construction fails if the native side rejects the data (the
    /// library's message is carried in the error) or if the library does
    /// not report a thread-safe build. The thread-safety requirement is
    /// what lets `Model` be `Send + Sync`; a build without it cannot be
    /// used through this bridge at all.
    pub fn new(lib: &Arc<ModelLibrary>, data: ModelData, seed: u32) -> Result<Self> {
        let payload = data.into_cstring()?;
        let data_ptr = payload.as_ref().map_or(ptr::null(), |text| text.as_ptr());

        let mut slot = ErrorSlot::new(lib.symbols().free_error_msg);
        let raw = unsafe { (lib.symbols().model_construct)(data_ptr, seed, slot.as_out()) };
        let raw = NonNull::new(raw).ok_or_else(|| slot.construct_failure("model_construct"))?;

        // From here RAII owns the native handle, including the error paths
        // of the thread-safety gate below.
        let model = Self {
            raw,
            lib: Arc::clone(lib),
        };

        let info = model.info()?;
        if !info.lines().any(|line| line.trim() == THREADSAFE_MARKER) {
            let name = model.name().unwrap_or("unknown").to_string();
            return Err(BridgeError::SingleThreadedBuild(name));
        }

        tracing::debug!(
            model = model.name().unwrap_or("unknown"),
            library = model.lib.id(),
            "constructed model handle"
        );
        Ok(model)
    }

    fn symbols(&self) -> &crate::ffi::Symbols {
        self.lib.symbols()
    }

    /// Constructs an RNG from the same library, for generated quantities.
    pub fn rng(&self, seed: u32) -> Result<ModelRng> {
        ModelRng::new(&self.lib, seed)
    }

    /// The model's name.
    pub fn name(&self) -> Result<&str> {
        let text = unsafe { CStr::from_ptr((self.symbols().name)(self.raw.as_ptr())) };
        Ok(text.to_str()?)
    }

    /// The library's build and capability report, newline-separated
    /// `KEY=value` lines.
    pub fn info(&self) -> Result<&str> {
        let text = unsafe { CStr::from_ptr((self.symbols().model_info)(self.raw.as_ptr())) };
        Ok(text.to_str()?)
    }

    /// Constrained parameter names, in output order. Container entries use
    /// dot-joined 1-based indices, column-major for matrices.
    pub fn param_names(&self, include_tp: bool, include_gq: bool) -> Result<Vec<&str>> {
        let joined = unsafe {
            CStr::from_ptr((self.symbols().param_names)(
                self.raw.as_ptr(),
                include_tp,
                include_gq,
            ))
        };
        Ok(split_names(joined.to_str()?))
    }

    /// Unconstrained parameter names, in input order.
    pub fn param_unc_names(&self) -> Result<Vec<&str>> {
        let joined =
            unsafe { CStr::from_ptr((self.symbols().param_unc_names)(self.raw.as_ptr())) };
        Ok(split_names(joined.to_str()?))
    }

    /// Number of constrained parameters for a flag pair. Monotone in each
    /// flag; a pure query with no failure mode.
    pub fn param_num(&self, include_tp: bool, include_gq: bool) -> usize {
        let n = unsafe { (self.symbols().param_num)(self.raw.as_ptr(), include_tp, include_gq) };
        n.max(0) as usize
    }

    /// Number of unconstrained parameters; the dimension every density
    /// operation works in.
    pub fn param_unc_num(&self) -> usize {
        let n = unsafe { (self.symbols().param_unc_num)(self.raw.as_ptr()) };
        n.max(0) as usize
    }

    /// Maps an unconstrained point to the constrained space, appending
    /// transformed parameters and generated quantities when requested.
    ///
    /// `include_gq = true` requires an RNG constructed from the same
    /// library; both the missing and the mismatched case fail before any
    /// native call.
    pub fn param_constrain(
        &self,
        theta_unc: &[f64],
        include_tp: bool,
        include_gq: bool,
        rng: Option<&mut ModelRng>,
    ) -> Result<Vec<f64>> {
        let mut theta = vec![0.0; self.param_num(include_tp, include_gq)];
        self.param_constrain_into(theta_unc, include_tp, include_gq, rng, &mut theta)?;
        Ok(theta)
    }

    /// [`Model::param_constrain`] into a caller-provided buffer of length
    /// `param_num(include_tp, include_gq)`.
    pub fn param_constrain_into(
        &self,
        theta_unc: &[f64],
        include_tp: bool,
        include_gq: bool,
        mut rng: Option<&mut ModelRng>,
        theta: &mut [f64],
    ) -> Result<()> {
        check_len("theta_unc", theta_unc.len(), self.param_unc_num())?;
        check_len("theta", theta.len(), self.param_num(include_tp, include_gq))?;
        if include_gq && rng.is_none() {
            return Err(BridgeError::MissingRng);
        }
        if let Some(rng) = rng.as_deref() {
            if rng.library_id() != self.lib.id() {
                return Err(BridgeError::LibraryMismatch);
            }
        }
        let rng_ptr = rng.as_mut().map_or(ptr::null_mut(), |rng| rng.raw_ptr());

        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().param_constrain)(
                self.raw.as_ptr(),
                include_tp,
                include_gq,
                theta_unc.as_ptr(),
                theta.as_mut_ptr(),
                rng_ptr,
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("param_constrain"));
        }
        Ok(())
    }

    /// Maps a constrained point (base parameters only, no transformed
    /// parameters or generated quantities) back to the unconstrained space.
    pub fn param_unconstrain(&self, theta: &[f64]) -> Result<Vec<f64>> {
        let mut theta_unc = vec![0.0; self.param_unc_num()];
        self.param_unconstrain_into(theta, &mut theta_unc)?;
        Ok(theta_unc)
    }

    /// [`Model::param_unconstrain`] into a buffer of length
    /// `param_unc_num()`.
    pub fn param_unconstrain_into(&self, theta: &[f64], theta_unc: &mut [f64]) -> Result<()> {
        check_len("theta", theta.len(), self.param_num(false, false))?;
        check_len("theta_unc", theta_unc.len(), self.param_unc_num())?;

        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().param_unconstrain)(
                self.raw.as_ptr(),
                theta.as_ptr(),
                theta_unc.as_mut_ptr(),
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("param_unconstrain"));
        }
        Ok(())
    }

    /// Reads a constrained point from named JSON fields and unconstrains
    /// it. The JSON is passed through opaquely; schema errors come back as
    /// native errors.
    pub fn param_unconstrain_json(&self, json: &str) -> Result<Vec<f64>> {
        let mut theta_unc = vec![0.0; self.param_unc_num()];
        self.param_unconstrain_json_into(json, &mut theta_unc)?;
        Ok(theta_unc)
    }

    /// [`Model::param_unconstrain_json`] into a buffer of length
    /// `param_unc_num()`.
    pub fn param_unconstrain_json_into(&self, json: &str, theta_unc: &mut [f64]) -> Result<()> {
        check_len("theta_unc", theta_unc.len(), self.param_unc_num())?;
        let json = CString::new(json)?;

        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().param_unconstrain_json)(
                self.raw.as_ptr(),
                json.as_ptr(),
                theta_unc.as_mut_ptr(),
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("param_unconstrain_json"));
        }
        Ok(())
    }

    /// Log density at an unconstrained point. `propto` drops additive
    /// constants; `jacobian` includes the log-Jacobian of the constraining
    /// transform.
    pub fn log_density(&self, theta_unc: &[f64], propto: bool, jacobian: bool) -> Result<f64> {
        check_len("theta_unc", theta_unc.len(), self.param_unc_num())?;

        let mut val = 0.0;
        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().log_density)(
                self.raw.as_ptr(),
                propto,
                jacobian,
                theta_unc.as_ptr(),
                &mut val,
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("log_density"));
        }
        Ok(val)
    }

    /// Log density and its gradient.
    pub fn log_density_gradient(
        &self,
        theta_unc: &[f64],
        propto: bool,
        jacobian: bool,
    ) -> Result<(f64, Vec<f64>)> {
        let mut grad = vec![0.0; self.param_unc_num()];
        let val = self.log_density_gradient_into(theta_unc, propto, jacobian, &mut grad)?;
        Ok((val, grad))
    }

    /// [`Model::log_density_gradient`] into a gradient buffer of length
    /// `param_unc_num()`.
    pub fn log_density_gradient_into(
        &self,
        theta_unc: &[f64],
        propto: bool,
        jacobian: bool,
        grad: &mut [f64],
    ) -> Result<f64> {
        let dims = self.param_unc_num();
        check_len("theta_unc", theta_unc.len(), dims)?;
        check_len("grad", grad.len(), dims)?;

        let mut val = 0.0;
        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().log_density_gradient)(
                self.raw.as_ptr(),
                propto,
                jacobian,
                theta_unc.as_ptr(),
                &mut val,
                grad.as_mut_ptr(),
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("log_density_gradient"));
        }
        Ok(val)
    }

    /// Log density, gradient, and dense Hessian. The Hessian comes back
    /// flat, `D * D` in column-major order.
    pub fn log_density_hessian(
        &self,
        theta_unc: &[f64],
        propto: bool,
        jacobian: bool,
    ) -> Result<(f64, Vec<f64>, Vec<f64>)> {
        let dims = self.param_unc_num();
        let mut grad = vec![0.0; dims];
        let mut hessian = vec![0.0; dims * dims];
        let val =
            self.log_density_hessian_into(theta_unc, propto, jacobian, &mut grad, &mut hessian)?;
        Ok((val, grad, hessian))
    }

    /// [`Model::log_density_hessian`] into caller-provided buffers: `grad`
    /// of length `D`, `hessian` of length `D * D`.
    pub fn log_density_hessian_into(
        &self,
        theta_unc: &[f64],
        propto: bool,
        jacobian: bool,
        grad: &mut [f64],
        hessian: &mut [f64],
    ) -> Result<f64> {
        let dims = self.param_unc_num();
        check_len("theta_unc", theta_unc.len(), dims)?;
        check_len("grad", grad.len(), dims)?;
        check_len("hessian", hessian.len(), dims * dims)?;

        let mut val = 0.0;
        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().log_density_hessian)(
                self.raw.as_ptr(),
                propto,
                jacobian,
                theta_unc.as_ptr(),
                &mut val,
                grad.as_mut_ptr(),
                hessian.as_mut_ptr(),
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("log_density_hessian"));
        }
        Ok(val)
    }

    /// Log density and the Hessian-vector product `H . v`, without
    /// materializing the Hessian.
    pub fn log_density_hessian_vector_product(
        &self,
        theta_unc: &[f64],
        vector: &[f64],
        propto: bool,
        jacobian: bool,
    ) -> Result<(f64, Vec<f64>)> {
        let mut hvp = vec![0.0; self.param_unc_num()];
        let val = self.log_density_hessian_vector_product_into(
            theta_unc, vector, propto, jacobian, &mut hvp,
        )?;
        Ok((val, hvp))
    }

    /// [`Model::log_density_hessian_vector_product`] into a product buffer
    /// of length `param_unc_num()`.
    pub fn log_density_hessian_vector_product_into(
        &self,
        theta_unc: &[f64],
        vector: &[f64],
        propto: bool,
        jacobian: bool,
        hvp: &mut [f64],
    ) -> Result<f64> {
        let dims = self.param_unc_num();
        check_len("theta_unc", theta_unc.len(), dims)?;
        check_len("vector", vector.len(), dims)?;
        check_len("hvp", hvp.len(), dims)?;

        let mut val = 0.0;
        let mut slot = ErrorSlot::new(self.symbols().free_error_msg);
        let rc = unsafe {
            (self.symbols().log_density_hvp)(
                self.raw.as_ptr(),
                propto,
                jacobian,
                theta_unc.as_ptr(),
                vector.as_ptr(),
                &mut val,
                hvp.as_mut_ptr(),
                slot.as_out(),
            )
        };
        if rc != RC_OK {
            return Err(slot.failure("log_density_hessian_vector_product"));
        }
        Ok(val)
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        tracing::debug!(library = self.lib.id(), "destroying model handle");
        unsafe { (self.lib.symbols().model_destruct)(self.raw.as_ptr()) };
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("library", &self.lib.path())
            .field("raw", &self.raw)
            .finish()
    }
}

// Construction rejects any library that does not report a thread-safe
// build, so the native model may be evaluated from multiple threads, and
// every `&self` operation writes only to caller-owned buffers.
unsafe impl Send for Model {}
unsafe impl Sync for Model {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len_reports_both_sizes() {
        assert!(check_len("grad", 4, 4).is_ok());
        match check_len("grad", 3, 4) {
            Err(BridgeError::BufferLength { name, got, want }) => {
                assert_eq!(name, "grad");
                assert_eq!(got, 3);
                assert_eq!(want, 4);
            }
            other => panic!("expected BufferLength, got {other:?}"),
        }
    }

    #[test]
    fn test_split_names_handles_empty_and_multi() {
        assert_eq!(split_names(""), Vec::<&str>::new());
        assert_eq!(split_names("theta"), vec!["theta"]);
        assert_eq!(split_names("A.1.1,A.2.1"), vec!["A.1.1", "A.2.1"]);
    }
}
