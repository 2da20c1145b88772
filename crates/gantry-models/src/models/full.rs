//! One parameter in every block.
//!
//! `alpha` is the sampled parameter, `beta` a transformed parameter,
//! `gamma` and `delta` generated quantities. `gamma` draws from the RNG,
//! `delta` is deterministic, so the pair exercises both kinds of output
//! the flag grid can produce.

use crate::math::LN_TWO_PI;
use crate::model::{missing_rng, DensityModel, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct Full;

#[derive(Deserialize)]
struct Point {
    alpha: f64,
}

impl DensityModel for Full {
    fn name(&self) -> &str {
        "full"
    }

    fn param_names(&self, include_tp: bool, include_gq: bool) -> Vec<String> {
        let mut names = vec!["alpha".to_string()];
        if include_tp {
            names.push("beta".to_string());
        }
        if include_gq {
            names.push("gamma".to_string());
            names.push("delta".to_string());
        }
        names
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["alpha".to_string()]
    }

    fn log_density(&self, propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let alpha = theta_unc[0];
        let mut lp = -0.5 * alpha * alpha;
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

    fn param_constrain(
        &self,
        include_tp: bool,
        include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        rng: Option<&mut SampleRng>,
    ) -> ModelResult<()> {
        let alpha = theta_unc[0];
        let mut next = 0;
        theta[next] = alpha;
        next += 1;
        if include_tp {
            theta[next] = 2.0 * alpha;
            next += 1;
        }
        if include_gq {
            let rng = rng.ok_or_else(missing_rng)?;
            theta[next] = 2.0 * alpha + rng.std_normal();
            theta[next + 1] = -alpha;
        }
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        theta_unc[0] = theta[0];
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json)?;
        theta_unc[0] = point.alpha;
        Ok(())
    }
}
