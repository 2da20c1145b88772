//! One unconstrained standard normal parameter. The simplest conforming
//! model, and the default when a library is opened with no data.

use crate::math::LN_TWO_PI;
use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct StdNormal;

#[derive(Deserialize)]
struct Point {
    theta: f64,
}

impl DensityModel for StdNormal {
    fn name(&self) -> &str {
        "stdnormal"
    }

    fn param_names(&self, _include_tp: bool, _include_gq: bool) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn log_density(&self, propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let t = theta_unc[0];
        let mut lp = -0.5 * t * t;
        if !propto {
            lp -= 0.5 * LN_TWO_PI;
        }
        Ok(lp)
    }

    fn log_density_gradient(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        grad: &mut [f64],
    ) -> ModelResult<f64> {
        grad[0] = -theta_unc[0];
        self.log_density(propto, jacobian, theta_unc)
    }

    fn log_density_hessian(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        grad: &mut [f64],
        hessian: &mut [f64],
    ) -> ModelResult<f64> {
        hessian[0] = -1.0;
        self.log_density_gradient(propto, jacobian, theta_unc, grad)
    }

    fn log_density_hvp(
        &self,
        propto: bool,
        jacobian: bool,
        theta_unc: &[f64],
        vector: &[f64],
        hvp: &mut [f64],
    ) -> ModelResult<f64> {
        hvp[0] = -vector[0];
        self.log_density(propto, jacobian, theta_unc)
    }

    fn param_constrain(
        &self,
        _include_tp: bool,
        _include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        _rng: Option<&mut SampleRng>,
    ) -> ModelResult<()> {
        theta[0] = theta_unc[0];
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        theta_unc[0] = theta[0];
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json).map_err(ModelError::from)?;
        theta_unc[0] = point.theta;
        Ok(())
    }
}
