//! The exported C surface
//!
//! Everything below the `extern "C"` line is transport: translating raw
//! pointers into slices, `Result`s into return codes, and messages into
//! heap C strings the caller frees through [`gt_free_error_msg`]. Model
//! math lives behind [`DensityModel`]; nothing here inspects it.
//!
//! Each handle wraps a [`ModelHost`], which precomputes every string the
//! query functions can return. Returned `const char*` pointers therefore
//! stay stable and valid until [`gt_model_destruct`].
//!
//! No call panics across the boundary: closures run under `catch_unwind`
//! and a panic becomes `-1` plus a message, same as a model error.

use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use crate::stream;
use gantry_abi::{PrintCallback, RawModel, RawRng, RC_FAILURE, RC_OK};
use std::any::Any;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_double, c_int, c_uint};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::slice;

#[allow(non_upper_case_globals)]
#[no_mangle]
pub static gt_major_version: c_int = 0;
#[allow(non_upper_case_globals)]
#[no_mangle]
pub static gt_minor_version: c_int = 1;
#[allow(non_upper_case_globals)]
#[no_mangle]
pub static gt_patch_version: c_int = 0;

/// One constructed model plus every string a query function can hand out.
///
/// Query functions return borrowed pointers, so all four flag combinations
/// of the parameter name list are materialized up front. Counts are cached
/// alongside so the evaluation wrappers can size their slices without
/// touching the name strings again.
struct ModelHost {
    model: Box<dyn DensityModel>,
    name: CString,
    info: CString,
    param_names: [CString; 4],
    param_counts: [usize; 4],
    unc_names: CString,
    unc_count: usize,
}

/// Cache slot for a flag pair, shared by names and counts.
fn flag_index(include_tp: bool, include_gq: bool) -> usize {
    usize::from(include_tp) + 2 * usize::from(include_gq)
}

fn c_string(s: String) -> ModelResult<CString> {
    CString::new(s)
        .map_err(|_| ModelError::Evaluation("model string contains a nul byte".to_string()))
}

impl ModelHost {
    /// `seed` is forwarded for models whose data block draws at
    /// construction; no zoo model currently does.
    fn new(payload: &str, _seed: c_uint) -> ModelResult<Self> {
        let model = crate::build(payload)?;
        let name = c_string(model.name().to_string())?;
        let info = c_string(format!(
            "name={}\nversion={}.{}.{}\nTHREADSAFE=true\nHESSIAN=true\n",
            model.name(),
            gt_major_version,
            gt_minor_version,
            gt_patch_version,
        ))?;

        let mut param_names: [CString; 4] = Default::default();
        let mut param_counts = [0usize; 4];
        for include_gq in [false, true] {
            for include_tp in [false, true] {
                let names = model.param_names(include_tp, include_gq);
                let idx = flag_index(include_tp, include_gq);
                param_counts[idx] = names.len();
                param_names[idx] = c_string(names.join(","))?;
            }
        }

        let unc = model.param_unc_names();
        let unc_count = unc.len();
        let unc_names = c_string(unc.join(","))?;

        Ok(Self {
            model,
            name,
            info,
            param_names,
            param_counts,
            unc_names,
            unc_count,
        })
    }

    fn param_count(&self, include_tp: bool, include_gq: bool) -> usize {
        self.param_counts[flag_index(include_tp, include_gq)]
    }
}

/// Stores `message` in the caller's slot as a freshly allocated C string.
/// A null slot drops the message. Interior nul bytes are stripped rather
/// than truncating the message at the first one.
fn store_error(error_msg: *mut *mut c_char, message: &str) {
    if error_msg.is_null() {
        return;
    }
    let clean: String = message.chars().filter(|&c| c != '\0').collect();
    let owned = CString::new(clean).unwrap_or_default();
    unsafe {
        *error_msg = owned.into_raw();
    }
}

fn panic_text(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in model code".to_string()
    }
}

/// Runs one operation under `catch_unwind`, mapping both `Err` and panic
/// to `-1` with a stored message.
fn guarded<F>(error_msg: *mut *mut c_char, op: F) -> c_int
where
    F: FnOnce() -> ModelResult<()>,
{
    match catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(())) => RC_OK,
        Ok(Err(err)) => {
            store_error(error_msg, &err.to_string());
            RC_FAILURE
        }
        Err(payload) => {
            store_error(error_msg, &panic_text(payload));
            RC_FAILURE
        }
    }
}

unsafe fn host<'a>(model: *const RawModel) -> &'a ModelHost {
    &*model.cast::<ModelHost>()
}

/// # Safety
///
/// `data` must be null or a nul-terminated string; `error_msg` must be null
/// or valid for one pointer write.
#[no_mangle]
pub unsafe extern "C" fn gt_model_construct(
    data: *const c_char,
    seed: c_uint,
    error_msg: *mut *mut c_char,
) -> *mut RawModel {
    let payload = if data.is_null() {
        String::new()
    } else {
        match CStr::from_ptr(data).to_str() {
            Ok(text) => text.to_string(),
            Err(_) => {
                store_error(error_msg, "model data is not valid UTF-8");
                return ptr::null_mut();
            }
        }
    };
    match catch_unwind(AssertUnwindSafe(|| ModelHost::new(&payload, seed))) {
        Ok(Ok(built)) => Box::into_raw(Box::new(built)).cast::<RawModel>(),
        Ok(Err(err)) => {
            store_error(error_msg, &err.to_string());
            ptr::null_mut()
        }
        Err(payload) => {
            store_error(error_msg, &panic_text(payload));
            ptr::null_mut()
        }
    }
}

/// # Safety
///
/// `model` must be null or a live handle from [`gt_model_construct`]; it is
/// dead after this call.
#[no_mangle]
pub unsafe extern "C" fn gt_model_destruct(model: *mut RawModel) {
    if model.is_null() {
        return;
    }
    drop(Box::from_raw(model.cast::<ModelHost>()));
}

/// # Safety
///
/// `msg` must be null or a message previously stored by this library; it
/// is dead after this call.
#[no_mangle]
pub unsafe extern "C" fn gt_free_error_msg(msg: *mut c_char) {
    if msg.is_null() {
        return;
    }
    drop(CString::from_raw(msg));
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_name(model: *const RawModel) -> *const c_char {
    host(model).name.as_ptr()
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_model_info(model: *const RawModel) -> *const c_char {
    host(model).info.as_ptr()
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_param_names(
    model: *const RawModel,
    include_tp: bool,
    include_gq: bool,
) -> *const c_char {
    host(model).param_names[flag_index(include_tp, include_gq)].as_ptr()
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_param_unc_names(model: *const RawModel) -> *const c_char {
    host(model).unc_names.as_ptr()
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_param_num(
    model: *const RawModel,
    include_tp: bool,
    include_gq: bool,
) -> c_int {
    host(model).param_count(include_tp, include_gq) as c_int
}

/// # Safety
///
/// `model` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn gt_param_unc_num(model: *const RawModel) -> c_int {
    host(model).unc_count as c_int
}

/// # Safety
///
/// `model` must be a live handle; `theta_unc` must hold `gt_param_unc_num`
/// doubles; `theta` must have room for `gt_param_num(include_tp,
/// include_gq)` doubles; `rng` must be null or a live RNG handle.
#[no_mangle]
pub unsafe extern "C" fn gt_param_constrain(
    model: *const RawModel,
    include_tp: bool,
    include_gq: bool,
    theta_unc: *const c_double,
    theta: *mut c_double,
    rng: *mut RawRng,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    if include_gq && rng.is_null() {
        store_error(error_msg, "generated quantities requested without an RNG");
        return RC_FAILURE;
    }
    let input = slice::from_raw_parts(theta_unc, owner.unc_count);
    let output = slice::from_raw_parts_mut(theta, owner.param_count(include_tp, include_gq));
    let rng = if rng.is_null() {
        None
    } else {
        Some(&mut *rng.cast::<SampleRng>())
    };
    guarded(error_msg, move || {
        owner
            .model
            .param_constrain(include_tp, include_gq, input, output, rng)
    })
}

/// # Safety
///
/// `model` must be a live handle; `theta` must hold `gt_param_num(false,
/// false)` doubles; `theta_unc` must have room for `gt_param_unc_num`.
#[no_mangle]
pub unsafe extern "C" fn gt_param_unconstrain(
    model: *const RawModel,
    theta: *const c_double,
    theta_unc: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let input = slice::from_raw_parts(theta, owner.param_count(false, false));
    let output = slice::from_raw_parts_mut(theta_unc, owner.unc_count);
    guarded(error_msg, move || owner.model.param_unconstrain(input, output))
}

/// # Safety
///
/// `model` must be a live handle; `json` must be a nul-terminated string;
/// `theta_unc` must have room for `gt_param_unc_num` doubles.
#[no_mangle]
pub unsafe extern "C" fn gt_param_unconstrain_json(
    model: *const RawModel,
    json: *const c_char,
    theta_unc: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let text = match CStr::from_ptr(json).to_str() {
        Ok(text) => text,
        Err(_) => {
            store_error(error_msg, "json argument is not valid UTF-8");
            return RC_FAILURE;
        }
    };
    let output = slice::from_raw_parts_mut(theta_unc, owner.unc_count);
    guarded(error_msg, move || {
        owner.model.param_unconstrain_json(text, output)
    })
}

/// # Safety
///
/// `model` must be a live handle; `theta_unc` must hold `gt_param_unc_num`
/// doubles; `val` must be valid for one double write.
#[no_mangle]
pub unsafe extern "C" fn gt_log_density(
    model: *const RawModel,
    propto: bool,
    jacobian: bool,
    theta_unc: *const c_double,
    val: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let input = slice::from_raw_parts(theta_unc, owner.unc_count);
    guarded(error_msg, move || {
        *val = owner.model.log_density(propto, jacobian, input)?;
        Ok(())
    })
}

/// # Safety
///
/// As [`gt_log_density`], plus `grad` must have room for
/// `gt_param_unc_num` doubles.
#[no_mangle]
pub unsafe extern "C" fn gt_log_density_gradient(
    model: *const RawModel,
    propto: bool,
    jacobian: bool,
    theta_unc: *const c_double,
    val: *mut c_double,
    grad: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let input = slice::from_raw_parts(theta_unc, owner.unc_count);
    let grad = slice::from_raw_parts_mut(grad, owner.unc_count);
    guarded(error_msg, move || {
        *val = owner
            .model
            .log_density_gradient(propto, jacobian, input, grad)?;
        Ok(())
    })
}

/// # Safety
///
/// As [`gt_log_density_gradient`], plus `hessian` must have room for
/// `gt_param_unc_num` squared doubles (column-major).
#[no_mangle]
pub unsafe extern "C" fn gt_log_density_hessian(
    model: *const RawModel,
    propto: bool,
    jacobian: bool,
    theta_unc: *const c_double,
    val: *mut c_double,
    grad: *mut c_double,
    hessian: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let n = owner.unc_count;
    let input = slice::from_raw_parts(theta_unc, n);
    let grad = slice::from_raw_parts_mut(grad, n);
    let hessian = slice::from_raw_parts_mut(hessian, n * n);
    guarded(error_msg, move || {
        *val = owner
            .model
            .log_density_hessian(propto, jacobian, input, grad, hessian)?;
        Ok(())
    })
}

/// # Safety
///
/// As [`gt_log_density`], plus `vector` must hold and `hvp` must have room
/// for `gt_param_unc_num` doubles.
#[no_mangle]
pub unsafe extern "C" fn gt_log_density_hessian_vector_product(
    model: *const RawModel,
    propto: bool,
    jacobian: bool,
    theta_unc: *const c_double,
    vector: *const c_double,
    val: *mut c_double,
    hvp: *mut c_double,
    error_msg: *mut *mut c_char,
) -> c_int {
    let owner = host(model);
    let n = owner.unc_count;
    let input = slice::from_raw_parts(theta_unc, n);
    let vector = slice::from_raw_parts(vector, n);
    let hvp = slice::from_raw_parts_mut(hvp, n);
    guarded(error_msg, move || {
        *val = owner
            .model
            .log_density_hvp(propto, jacobian, input, vector, hvp)?;
        Ok(())
    })
}

/// # Safety
///
/// `error_msg` must be null or valid for one pointer write.
#[no_mangle]
pub unsafe extern "C" fn gt_rng_construct(
    seed: c_uint,
    _error_msg: *mut *mut c_char,
) -> *mut RawRng {
    Box::into_raw(Box::new(SampleRng::new(seed))).cast::<RawRng>()
}

/// # Safety
///
/// `rng` must be null or a live handle from [`gt_rng_construct`]; it is
/// dead after this call.
#[no_mangle]
pub unsafe extern "C" fn gt_rng_destruct(rng: *mut RawRng) {
    if rng.is_null() {
        return;
    }
    drop(Box::from_raw(rng.cast::<SampleRng>()));
}

/// # Safety
///
/// The callback must stay callable for as long as this library image may
/// emit output, must tolerate concurrent invocation, and must not unwind.
#[no_mangle]
pub unsafe extern "C" fn gt_set_print_callback(
    callback: Option<PrintCallback>,
    _error_msg: *mut *mut c_char,
) -> c_int {
    stream::set_callback(callback);
    RC_OK
}

// ===== tests =====
