//! Symbol resolution for the `gt_*` surface
//!
//! All `dlsym` lookups happen once, at library open. The resolved table
//! stores plain function pointers rather than `libloading::Symbol` guards;
//! `ModelLibrary` guarantees the backing image outlives them by never
//! unmapping it implicitly.

use crate::error::Result;
use gantry_abi::symbols;
use gantry_abi::{
    FreeErrorMsgFn, LogDensityFn, LogDensityGradientFn, LogDensityHessianFn, LogDensityHvpFn,
    ModelConstructFn, ModelDestructFn, ModelStringFn, ParamConstrainFn, ParamNamesFn, ParamNumFn,
    ParamUncNumFn, ParamUnconstrainFn, ParamUnconstrainJsonFn, RngConstructFn, RngDestructFn,
    SetPrintCallbackFn,
};
use libloading::Library;
use std::os::raw::c_int;

/// The complete function table of a conforming model library.
pub(crate) struct Symbols {
    pub model_construct: ModelConstructFn,
    pub model_destruct: ModelDestructFn,
    pub free_error_msg: FreeErrorMsgFn,
    pub name: ModelStringFn,
    pub model_info: ModelStringFn,
    pub param_names: ParamNamesFn,
    pub param_unc_names: ModelStringFn,
    pub param_num: ParamNumFn,
    pub param_unc_num: ParamUncNumFn,
    pub param_constrain: ParamConstrainFn,
    pub param_unconstrain: ParamUnconstrainFn,
    pub param_unconstrain_json: ParamUnconstrainJsonFn,
    pub log_density: LogDensityFn,
    pub log_density_gradient: LogDensityGradientFn,
    pub log_density_hessian: LogDensityHessianFn,
    pub log_density_hvp: LogDensityHvpFn,
    pub rng_construct: RngConstructFn,
    pub rng_destruct: RngDestructFn,
    pub set_print_callback: SetPrintCallbackFn,
}

unsafe fn resolve<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    Ok(*lib.get::<T>(name)?)
}

impl Symbols {
    /// Resolves every exported function. Any missing symbol fails the whole
    /// load; a library that resolves here supports the full operation set.
    ///
    /// # Safety
    ///
    /// The library must export the `gt_*` surface with the exact signatures
    /// declared in `gantry-abi`. A signature mismatch is undefined behavior
    /// at call time, not detectable here.
    pub(crate) unsafe fn load(lib: &Library) -> Result<Self> {
        Ok(Self {
            model_construct: resolve(lib, symbols::MODEL_CONSTRUCT)?,
            model_destruct: resolve(lib, symbols::MODEL_DESTRUCT)?,
            free_error_msg: resolve(lib, symbols::FREE_ERROR_MSG)?,
            name: resolve(lib, symbols::NAME)?,
            model_info: resolve(lib, symbols::MODEL_INFO)?,
            param_names: resolve(lib, symbols::PARAM_NAMES)?,
            param_unc_names: resolve(lib, symbols::PARAM_UNC_NAMES)?,
            param_num: resolve(lib, symbols::PARAM_NUM)?,
            param_unc_num: resolve(lib, symbols::PARAM_UNC_NUM)?,
            param_constrain: resolve(lib, symbols::PARAM_CONSTRAIN)?,
            param_unconstrain: resolve(lib, symbols::PARAM_UNCONSTRAIN)?,
            param_unconstrain_json: resolve(lib, symbols::PARAM_UNCONSTRAIN_JSON)?,
            log_density: resolve(lib, symbols::LOG_DENSITY)?,
            log_density_gradient: resolve(lib, symbols::LOG_DENSITY_GRADIENT)?,
            log_density_hessian: resolve(lib, symbols::LOG_DENSITY_HESSIAN)?,
            log_density_hvp: resolve(lib, symbols::LOG_DENSITY_HVP)?,
            rng_construct: resolve(lib, symbols::RNG_CONSTRUCT)?,
            rng_destruct: resolve(lib, symbols::RNG_DESTRUCT)?,
            set_print_callback: resolve(lib, symbols::SET_PRINT_CALLBACK)?,
        })
    }
}

/// Reads the three `int` version data symbols.
///
/// # Safety
///
/// The library must export `gt_major_version`, `gt_minor_version`, and
/// `gt_patch_version` as `int` data symbols.
pub(crate) unsafe fn read_version(lib: &Library) -> Result<semver::Version> {
    let read = |name: &[u8]| -> Result<u64> {
        let ptr: *const c_int = *lib.get::<*const c_int>(name)?;
        Ok((*ptr).max(0) as u64)
    };
    Ok(semver::Version::new(
        read(symbols::MAJOR_VERSION)?,
        read(symbols::MINOR_VERSION)?,
        read(symbols::PATCH_VERSION)?,
    ))
}
