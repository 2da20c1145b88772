//! Models that fail on purpose.
//!
//! One variant per block that can raise: the data block at construction,
//! the log density, transformed parameters, and generated quantities. Used
//! to verify that a failure anywhere surfaces as a return code plus a
//! retrievable message rather than tearing down the process.

use crate::model::{missing_rng, DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    LogDensity,
    TransformedParams,
    GeneratedQuantities,
}

impl FailPoint {
    fn message(self) -> &'static str {
        match self {
            Self::LogDensity => "deliberate failure in log_density",
            Self::TransformedParams => "deliberate failure in transformed parameters",
            Self::GeneratedQuantities => "deliberate failure in generated quantities",
        }
    }
}

/// Raised from the data block, before any model exists.
pub fn data_block_failure() -> ModelError {
    ModelError::Data("deliberate failure in the data block".to_string())
}

pub struct Throwing {
    fail: FailPoint,
}

#[derive(Deserialize)]
struct Point {
    theta: f64,
}

impl Throwing {
    pub fn new(fail: FailPoint) -> Self {
        Self { fail }
    }
}

impl DensityModel for Throwing {
    fn name(&self) -> &str {
        match self.fail {
            FailPoint::LogDensity => "throw_lp",
            FailPoint::TransformedParams => "throw_tp",
            FailPoint::GeneratedQuantities => "throw_gq",
        }
    }

    fn param_names(&self, include_tp: bool, include_gq: bool) -> Vec<String> {
        let mut names = vec!["theta".to_string()];
        if include_tp && self.fail == FailPoint::TransformedParams {
            names.push("eta".to_string());
        }
        if include_gq && self.fail == FailPoint::GeneratedQuantities {
            names.push("zeta".to_string());
        }
        names
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn log_density(&self, _propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        if self.fail == FailPoint::LogDensity {
            return Err(ModelError::Evaluation(self.fail.message().to_string()));
        }
        let theta = theta_unc[0];
        Ok(-0.5 * theta * theta)
    }

    fn param_constrain(
        &self,
        include_tp: bool,
        include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        rng: Option<&mut SampleRng>,
    ) -> ModelResult<()> {
        if include_tp && self.fail == FailPoint::TransformedParams {
            return Err(ModelError::Evaluation(self.fail.message().to_string()));
        }
        if include_gq {
            if self.fail == FailPoint::GeneratedQuantities {
                return Err(ModelError::Evaluation(self.fail.message().to_string()));
            }
            rng.ok_or_else(missing_rng)?;
        }
        theta[0] = theta_unc[0];
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        theta_unc[0] = theta[0];
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json)?;
        theta_unc[0] = point.theta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_density_variant_fails_only_there() {
        let m = Throwing::new(FailPoint::LogDensity);
        assert!(m.log_density(true, true, &[0.5]).is_err());
        let mut out = [0.0];
        m.param_constrain(false, false, &[0.5], &mut out, None)
            .unwrap();
        assert_eq!(out[0], 0.5);
    }

    #[test]
    fn test_gradient_default_propagates_failure() {
        let m = Throwing::new(FailPoint::LogDensity);
        let mut grad = [0.0];
        let err = m
            .log_density_gradient(true, true, &[0.5], &mut grad)
            .unwrap_err();
        assert!(err.to_string().contains("log_density"));
    }

    #[test]
    fn test_transformed_params_fail_only_when_requested() {
        let m = Throwing::new(FailPoint::TransformedParams);
        let mut out = [0.0; 2];
        assert!(m
            .param_constrain(true, false, &[1.0], &mut out, None)
            .is_err());
        m.param_constrain(false, false, &[1.0], &mut out, None)
            .unwrap();
        assert!(m.log_density(true, false, &[1.0]).is_ok());
    }

    #[test]
    fn test_generated_quantities_fail_before_rng_check() {
        let m = Throwing::new(FailPoint::GeneratedQuantities);
        let mut out = [0.0; 2];
        let err = m
            .param_constrain(false, true, &[1.0], &mut out, None)
            .unwrap_err();
        assert!(err.to_string().contains("generated quantities"));
        assert!(!err.to_string().contains("RNG"));
    }

    #[test]
    fn test_failing_block_widens_name_list() {
        let m = Throwing::new(FailPoint::GeneratedQuantities);
        assert_eq!(m.param_names(false, false).len(), 1);
        assert_eq!(m.param_names(false, true).len(), 2);
        assert_eq!(m.param_names(true, true).len(), 2);
    }
}
