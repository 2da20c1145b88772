//! The `DensityModel` trait every zoo model implements
//!
//! The trait mirrors the exported C surface one-to-one, minus the transport
//! concerns (pointers, return codes, message allocation) that `abi` owns.
//! Slices arrive already sized by the caller; implementations may assume
//! the agreed lengths.
//!
//! Second derivatives default to central finite differences over the
//! model's gradient, matching how libraries built without second-order
//! autodiff behave. Models with cheap closed forms override them.

use crate::math::{central_diff, FD_STEP};
use crate::prng::SampleRng;
use thiserror::Error;

/// Failures raised inside model code, before transport.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The data payload was parseable but wrong for this model.
    #[error("invalid data: {0}")]
    Data(String),

    /// The data payload or an inline argument was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An evaluation failed (domain violation, deliberate test failure, ...).
    #[error("{0}")]
    Evaluation(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

pub trait DensityModel: Send + Sync {
    /// Short model name, stable across calls.
    fn name(&self) -> &str;

    /// Constrained parameter names in output order. Container entries use
    /// dot-joined 1-based indices, column-major for matrices.
    fn param_names(&self, include_tp: bool, include_gq: bool) -> Vec<String>;

    /// Unconstrained parameter names in input order.
    fn param_unc_names(&self) -> Vec<String>;

    /// Log density at an unconstrained point. `propto` drops additive
    /// constants; `jacobian` adds the log-Jacobian of the constraining
    /// transform.
    fn log_density(&self, propto: bool, jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64>;

    /// Log density and its gradient. `grad` has the unconstrained length.
    fn log_density_gradient(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        grad: &mut [f64],
    ) -> ModelResult<f64> {
        for i in 0..theta_unc.len() {
            grad[i] = central_diff(
                |point| self.log_density(propto, jacobian, point),
                theta_unc,
                i,
            )?;
        }
        self.log_density(propto, jacobian, theta_unc)
    }

    /// Log density, gradient, and dense Hessian (column-major, D x D).
    fn log_density_hessian(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        grad: &mut [f64],
        hessian: &mut [f64],
    ) -> ModelResult<f64> {
        let n = theta_unc.len();
        let mut probe = theta_unc.to_vec();
        let mut hi = vec![0.0; n];
        let mut lo = vec![0.0; n];
        for j in 0..n {
            probe[j] = theta_unc[j] + FD_STEP;
            self.log_density_gradient(propto, jacobian, &probe, &mut hi)?;
            probe[j] = theta_unc[j] - FD_STEP;
            self.log_density_gradient(propto, jacobian, &probe, &mut lo)?;
            probe[j] = theta_unc[j];
            for i in 0..n {
                hessian[j * n + i] = (hi[i] - lo[i]) / (2.0 * FD_STEP);
            }
        }
        self.log_density_gradient(propto, jacobian, theta_unc, grad)
    }

    /// Log density and Hessian-vector product H·v.
    fn log_density_hvp(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        vector: &[f64],
        hvp: &mut [f64],
    ) -> ModelResult<f64> {
        let n = theta_unc.len();
        let scale = vector.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
        let h = if scale > 0.0 { FD_STEP / scale } else { FD_STEP };
        let mut hi_point = theta_unc.to_vec();
        let mut lo_point = theta_unc.to_vec();
        for i in 0..n {
            hi_point[i] += h * vector[i];
            lo_point[i] -= h * vector[i];
        }
        let mut hi = vec![0.0; n];
        let mut lo = vec![0.0; n];
        self.log_density_gradient(propto, jacobian, &hi_point, &mut hi)?;
        self.log_density_gradient(propto, jacobian, &lo_point, &mut lo)?;
        for i in 0..n {
            hvp[i] = (hi[i] - lo[i]) / (2.0 * h);
        }
        self.log_density(propto, jacobian, theta_unc)
    }

    /// Map an unconstrained point to the constrained space, appending
    /// transformed parameters and generated quantities when requested.
    /// `rng` is required exactly when `include_gq` draws anything.
    fn param_constrain(
        &self,
        include_tp: bool,
        include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        rng: Option<&mut SampleRng>,
    ) -> ModelResult<()>;

    /// Map a constrained point (parameters only, no TP/GQ) back to the
    /// unconstrained space.
    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()>;

    /// Read a constrained point from named JSON fields and unconstrain it.
    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()>;
}

/// The missing-RNG failure shared by every GQ-drawing model.
pub fn missing_rng() -> ModelError {
    ModelError::Evaluation("generated quantities requested without an RNG".to_string())
}
