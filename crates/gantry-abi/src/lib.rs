//! The gantry C ABI contract
//!
//! A model library is a shared object exporting the `gt_*` symbols declared
//! here. The client bridge (`gantry`) resolves them at load time; reference
//! implementations (`gantry-models`) export them. Both sides compile against
//! this crate so the two halves of the protocol cannot drift apart.
//!
//! # Protocol rules
//!
//! - All functions use the C calling convention. Flags are C `bool`.
//! - Fallible calls return `0` on success and `-1` on failure, and take a
//!   trailing `char** error_msg` slot. On failure the callee may store a
//!   nul-terminated message it allocated; the caller releases it through
//!   `gt_free_error_msg` and nothing else.
//! - Constructors return a null handle on failure instead of a return code.
//! - `const char*` results from query functions are owned by the model
//!   handle and stay valid until `gt_model_destruct`. Callers must not free
//!   them.
//! - Output buffers are caller-allocated. The callee writes exactly the
//!   agreed number of doubles and never reads beyond the agreed input
//!   length; sizing them is entirely the caller's job.
//! - The three `gt_*_version` symbols are `int` data symbols, not functions.

use std::os::raw::{c_char, c_double, c_int, c_uint};

/// Opaque model handle. Only ever used behind a pointer.
#[repr(C)]
pub struct RawModel {
    _private: [u8; 0],
}

/// Opaque RNG handle. Only ever used behind a pointer.
#[repr(C)]
pub struct RawRng {
    _private: [u8; 0],
}

/// Receives print output from the library.
///
/// `data` is a byte chunk of length `len`. It is *not* nul-terminated and
/// is only valid for the duration of the call; implementations must copy
/// anything they want to keep. The library gives no serialization
/// guarantee, so the callback must tolerate concurrent invocation and must
/// never unwind into the caller.
pub type PrintCallback = extern "C" fn(data: *const c_char, len: usize);

/// Return code for a successful call.
pub const RC_OK: c_int = 0;
/// Return code for a failed call.
pub const RC_FAILURE: c_int = -1;

/// `gt_model_construct(data, seed, error_msg) -> handle or null`
pub type ModelConstructFn =
    unsafe extern "C" fn(*const c_char, c_uint, *mut *mut c_char) -> *mut RawModel;

/// `gt_model_destruct(model)`
pub type ModelDestructFn = unsafe extern "C" fn(*mut RawModel);

/// `gt_free_error_msg(msg)`
pub type FreeErrorMsgFn = unsafe extern "C" fn(*mut c_char);

/// `gt_name(model)` / `gt_model_info(model)` / `gt_param_unc_names(model)`
pub type ModelStringFn = unsafe extern "C" fn(*const RawModel) -> *const c_char;

/// `gt_param_names(model, include_tp, include_gq)`
pub type ParamNamesFn = unsafe extern "C" fn(*const RawModel, bool, bool) -> *const c_char;

/// `gt_param_num(model, include_tp, include_gq)`
pub type ParamNumFn = unsafe extern "C" fn(*const RawModel, bool, bool) -> c_int;

/// `gt_param_unc_num(model)`
pub type ParamUncNumFn = unsafe extern "C" fn(*const RawModel) -> c_int;

/// `gt_param_constrain(model, include_tp, include_gq, theta_unc, theta, rng, error_msg)`
pub type ParamConstrainFn = unsafe extern "C" fn(
    *const RawModel,
    bool,
    bool,
    *const c_double,
    *mut c_double,
    *mut RawRng,
    *mut *mut c_char,
) -> c_int;

/// `gt_param_unconstrain(model, theta, theta_unc, error_msg)`
pub type ParamUnconstrainFn = unsafe extern "C" fn(
    *const RawModel,
    *const c_double,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_param_unconstrain_json(model, json, theta_unc, error_msg)`
pub type ParamUnconstrainJsonFn = unsafe extern "C" fn(
    *const RawModel,
    *const c_char,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_log_density(model, propto, jacobian, theta_unc, val, error_msg)`
pub type LogDensityFn = unsafe extern "C" fn(
    *const RawModel,
    bool,
    bool,
    *const c_double,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_log_density_gradient(model, propto, jacobian, theta_unc, val, grad, error_msg)`
pub type LogDensityGradientFn = unsafe extern "C" fn(
    *const RawModel,
    bool,
    bool,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_log_density_hessian(model, propto, jacobian, theta_unc, val, grad, hessian, error_msg)`
///
/// The Hessian buffer holds `D * D` doubles in column-major order.
pub type LogDensityHessianFn = unsafe extern "C" fn(
    *const RawModel,
    bool,
    bool,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_log_density_hessian_vector_product(model, propto, jacobian, theta_unc, vector, val, hvp, error_msg)`
pub type LogDensityHvpFn = unsafe extern "C" fn(
    *const RawModel,
    bool,
    bool,
    *const c_double,
    *const c_double,
    *mut c_double,
    *mut c_double,
    *mut *mut c_char,
) -> c_int;

/// `gt_rng_construct(seed, error_msg) -> handle or null`
pub type RngConstructFn = unsafe extern "C" fn(c_uint, *mut *mut c_char) -> *mut RawRng;

/// `gt_rng_destruct(rng)`
pub type RngDestructFn = unsafe extern "C" fn(*mut RawRng);

/// `gt_set_print_callback(cb, error_msg)`
///
/// Passing a null callback restores the library's default stream (stdout).
/// The setting is global to the loaded library image: it affects every
/// model handle backed by that image, whenever constructed.
pub type SetPrintCallbackFn =
    unsafe extern "C" fn(Option<PrintCallback>, *mut *mut c_char) -> c_int;

/// Exported symbol names, nul-terminated for direct `dlsym` lookup.
pub mod symbols {
    pub const MAJOR_VERSION: &[u8] = b"gt_major_version\0";
    pub const MINOR_VERSION: &[u8] = b"gt_minor_version\0";
    pub const PATCH_VERSION: &[u8] = b"gt_patch_version\0";

    pub const MODEL_CONSTRUCT: &[u8] = b"gt_model_construct\0";
    pub const MODEL_DESTRUCT: &[u8] = b"gt_model_destruct\0";
    pub const FREE_ERROR_MSG: &[u8] = b"gt_free_error_msg\0";

    pub const NAME: &[u8] = b"gt_name\0";
    pub const MODEL_INFO: &[u8] = b"gt_model_info\0";
    pub const PARAM_NAMES: &[u8] = b"gt_param_names\0";
    pub const PARAM_UNC_NAMES: &[u8] = b"gt_param_unc_names\0";
    pub const PARAM_NUM: &[u8] = b"gt_param_num\0";
    pub const PARAM_UNC_NUM: &[u8] = b"gt_param_unc_num\0";

    pub const PARAM_CONSTRAIN: &[u8] = b"gt_param_constrain\0";
    pub const PARAM_UNCONSTRAIN: &[u8] = b"gt_param_unconstrain\0";
    pub const PARAM_UNCONSTRAIN_JSON: &[u8] = b"gt_param_unconstrain_json\0";

    pub const LOG_DENSITY: &[u8] = b"gt_log_density\0";
    pub const LOG_DENSITY_GRADIENT: &[u8] = b"gt_log_density_gradient\0";
    pub const LOG_DENSITY_HESSIAN: &[u8] = b"gt_log_density_hessian\0";
    pub const LOG_DENSITY_HVP: &[u8] = b"gt_log_density_hessian_vector_product\0";

    pub const RNG_CONSTRUCT: &[u8] = b"gt_rng_construct\0";
    pub const RNG_DESTRUCT: &[u8] = b"gt_rng_destruct\0";

    pub const SET_PRINT_CALLBACK: &[u8] = b"gt_set_print_callback\0";

    /// Every symbol a conforming library must export.
    pub const ALL: &[&[u8]] = &[
        MAJOR_VERSION,
        MINOR_VERSION,
        PATCH_VERSION,
        MODEL_CONSTRUCT,
        MODEL_DESTRUCT,
        FREE_ERROR_MSG,
        NAME,
        MODEL_INFO,
        PARAM_NAMES,
        PARAM_UNC_NAMES,
        PARAM_NUM,
        PARAM_UNC_NUM,
        PARAM_CONSTRAIN,
        PARAM_UNCONSTRAIN,
        PARAM_UNCONSTRAIN_JSON,
        LOG_DENSITY,
        LOG_DENSITY_GRADIENT,
        LOG_DENSITY_HESSIAN,
        LOG_DENSITY_HVP,
        RNG_CONSTRUCT,
        RNG_DESTRUCT,
        SET_PRINT_CALLBACK,
    ];
}
