//! Bernoulli likelihood with a (0, 1)-constrained rate.
//!
//! Unconstrained scale is the logit. Transformed parameter `logit_theta`
//! echoes the unconstrained coordinate; generated quantity `y_sim` is one
//! posterior-predictive draw and is the zoo's RNG consumer.

use crate::math::{logit, sigmoid, softplus};
use crate::model::{missing_rng, DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct Bernoulli {
    trials: f64,
    successes: f64,
}

#[derive(Deserialize)]
struct BernoulliData {
    #[serde(rename = "N")]
    n: usize,
    y: Vec<i64>,
}

#[derive(Deserialize)]
struct Point {
    theta: f64,
}

impl Bernoulli {
    pub fn from_data(data: &serde_json::Value) -> ModelResult<Self> {
        let parsed: BernoulliData = serde_json::from_value(data.clone())?;
        if parsed.y.len() != parsed.n {
            return Err(ModelError::Data(format!(
                "y has {} entries but N is {}",
                parsed.y.len(),
                parsed.n
            )));
        }
        if let Some(bad) = parsed.y.iter().find(|&&v| v != 0 && v != 1) {
            return Err(ModelError::Data(format!(
                "y entries must be 0 or 1; found {bad}"
            )));
        }
        Ok(Self {
            trials: parsed.n as f64,
            successes: parsed.y.iter().sum::<i64>() as f64,
        })
    }

    /// Data-only part of the log density, as a function of the logit.
    fn log_likelihood(&self, q: f64) -> f64 {
        -self.successes * softplus(-q) - (self.trials - self.successes) * softplus(q)
    }
}

impl DensityModel for Bernoulli {
    fn name(&self) -> &str {
        "bernoulli"
    }

    fn param_names(&self, include_tp: bool, include_gq: bool) -> Vec<String> {
        let mut names = vec!["theta".to_string()];
        if include_tp {
            names.push("logit_theta".to_string());
        }
        if include_gq {
            names.push("y_sim".to_string());
        }
        names
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn log_density(&self, _propto: bool, jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let q = theta_unc[0];
        let mut lp = self.log_likelihood(q);
        if jacobian {
            // log |d theta / d q| = log theta + log(1 - theta)
            lp -= softplus(-q) + softplus(q);
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
        let q = theta_unc[0];
        let theta = sigmoid(q);
        let mut g = self.successes - self.trials * theta;
        if jacobian {
            g += 1.0 - 2.0 * theta;
        }
        grad[0] = g;
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
        let theta = sigmoid(theta_unc[0]);
        let slope = theta * (1.0 - theta);
        let mut h = -self.trials * slope;
        if jacobian {
            h -= 2.0 * slope;
        }
        hessian[0] = h;
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
        let q = theta_unc[0];
        let p = sigmoid(q);
        let mut at = 0;
        theta[at] = p;
        at += 1;
        if include_tp {
            theta[at] = q;
            at += 1;
        }
        if include_gq {
            let rng = rng.ok_or_else(missing_rng)?;
            theta[at] = rng.bernoulli(p);
        }
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        let p = theta[0];
        if !(0.0..=1.0).contains(&p) {
            return Err(ModelError::Evaluation(format!(
                "theta is {p} but must be in [0, 1]"
            )));
        }
        theta_unc[0] = logit(p);
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json).map_err(ModelError::from)?;
        self.param_unconstrain(&[point.theta], theta_unc)
    }
}
