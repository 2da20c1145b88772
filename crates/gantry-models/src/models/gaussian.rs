//! Normal likelihood with unknown location and positive scale.
//!
//! `sigma` is log-transformed, which makes this the canonical check that a
//! Jacobian adjustment equals the unconstrained coordinate it comes from.

use crate::math::LN_TWO_PI;
use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct Gaussian {
    y: Vec<f64>,
}

#[derive(Deserialize)]
struct GaussianData {
    #[serde(rename = "N")]
    n: usize,
    y: Vec<f64>,
}

#[derive(Deserialize)]
struct Point {
    mu: f64,
    sigma: f64,
}

impl Gaussian {
    pub fn from_data(data: &serde_json::Value) -> ModelResult<Self> {
        let parsed: GaussianData = serde_json::from_value(data.clone())?;
        if parsed.y.len() != parsed.n {
            return Err(ModelError::Data(format!(
                "y has {} entries but N is {}",
                parsed.y.len(),
                parsed.n
            )));
        }
        if parsed.y.is_empty() {
            return Err(ModelError::Data("y must not be empty".to_string()));
        }
        Ok(Self { y: parsed.y })
    }

    fn n(&self) -> f64 {
        self.y.len() as f64
    }

    fn residual_sum(&self, mu: f64) -> f64 {
        self.y.iter().map(|y| (y - mu) * (y - mu)).sum()
    }
}

impl DensityModel for Gaussian {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn param_names(&self, _include_tp: bool, _include_gq: bool) -> Vec<String> {
        vec!["mu".to_string(), "sigma".to_string()]
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["mu".to_string(), "sigma".to_string()]
    }

    fn log_density(&self, propto: bool, jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let (mu, s) = (theta_unc[0], theta_unc[1]);
        let sigma = s.exp();
        let mut lp = -self.n() * s - self.residual_sum(mu) / (2.0 * sigma * sigma);
        if !propto {
            lp -= 0.5 * self.n() * LN_TWO_PI;
        }
        if jacobian {
            lp += s;
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
        let (mu, s) = (theta_unc[0], theta_unc[1]);
        let inv_var = (-2.0 * s).exp();
        let shifted: f64 = self.y.iter().map(|y| y - mu).sum();
        grad[0] = shifted * inv_var;
        grad[1] = -self.n() + self.residual_sum(mu) * inv_var;
        if jacobian {
            grad[1] += 1.0;
        }
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
        let (mu, s) = (theta_unc[0], theta_unc[1]);
        let inv_var = (-2.0 * s).exp();
        let shifted: f64 = self.y.iter().map(|y| y - mu).sum();
        let h_mu_mu = -self.n() * inv_var;
        let h_mu_s = -2.0 * shifted * inv_var;
        let h_s_s = -2.0 * self.residual_sum(mu) * inv_var;
        hessian[0] = h_mu_mu;
        hessian[1] = h_mu_s;
        hessian[2] = h_mu_s;
        hessian[3] = h_s_s;
        self.log_density_gradient(propto, jacobian, theta_unc, grad)
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
        theta[1] = theta_unc[1].exp();
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        let sigma = theta[1];
        if sigma <= 0.0 {
            return Err(ModelError::Evaluation(format!(
                "sigma is {sigma} but must be positive"
            )));
        }
        theta_unc[0] = theta[0];
        theta_unc[1] = sigma.ln();
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json).map_err(ModelError::from)?;
        self.param_unconstrain(&[point.mu, point.sigma], theta_unc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::central_diff;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn model() -> Gaussian {
        Gaussian::from_data(&json!({
            "N": 4,
            "y": [0.5, -1.0, 2.0, 0.25],
        }))
        .unwrap()
    }

    #[test]
    fn test_jacobian_term_equals_unconstrained_sigma() {
        let m = model();
        let point = [0.4, -0.9];
        let with = m.log_density(false, true, &point).unwrap();
        let without = m.log_density(false, false, &point).unwrap();
        assert_abs_diff_eq!(with - without, -0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_log_density_closed_form() {
        let m = model();
        let (mu, s): (f64, f64) = (0.1, 0.3);
        let sigma: f64 = s.exp();
        let want: f64 = m
            .y
            .iter()
            .map(|y| {
                -0.5 * ((y - mu) / sigma).powi(2) - sigma.ln() - 0.5 * LN_TWO_PI
            })
            .sum();
        let lp = m.log_density(false, false, &[mu, s]).unwrap();
        assert_abs_diff_eq!(lp, want, epsilon = 1e-10);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let m = model();
        let point = [0.7, -0.2];
        for &jacobian in &[false, true] {
            let mut grad = [0.0; 2];
            m.log_density_gradient(false, jacobian, &point, &mut grad)
                .unwrap();
            for i in 0..2 {
                let fd =
                    central_diff(|t| m.log_density(false, jacobian, t), &point, i).unwrap();
                assert_abs_diff_eq!(grad[i], fd, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_hessian_matches_finite_difference_of_gradient() {
        let m = model();
        let point = [0.7, -0.2];
        let mut grad = [0.0; 2];
        let mut hessian = [0.0; 4];
        m.log_density_hessian(false, false, &point, &mut grad, &mut hessian)
            .unwrap();
        for j in 0..2 {
            for i in 0..2 {
                let fd = central_diff(
                    |t| {
                        let mut g = [0.0; 2];
                        m.log_density_gradient(false, false, t, &mut g)?;
                        Ok(g[i])
                    },
                    &point,
                    j,
                )
                .unwrap();
                assert_abs_diff_eq!(hessian[j * 2 + i], fd, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_unconstrain_json() {
        let m = model();
        let mut out = [0.0; 2];
        m.param_unconstrain_json(r#"{"mu": 0.2, "sigma": 1.9}"#, &mut out)
            .unwrap();
        assert_abs_diff_eq!(out[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 1.9_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_unconstrain_rejects_nonpositive_sigma() {
        let m = model();
        let mut out = [0.0; 2];
        let err = m.param_unconstrain(&[0.0, -1.0], &mut out).unwrap_err();
        assert!(err.to_string().contains("positive"));
        assert!(m.param_unconstrain(&[0.0, 0.0], &mut out).is_err());
    }

    #[test]
    fn test_round_trip() {
        let m = model();
        let unc = [1.25, -0.4];
        let mut constrained = [0.0; 2];
        let mut back = [0.0; 2];
        m.param_constrain(false, false, &unc, &mut constrained, None)
            .unwrap();
        m.param_unconstrain(&constrained, &mut back).unwrap();
        assert_abs_diff_eq!(back[0], unc[0], epsilon = 1e-12);
        assert_abs_diff_eq!(back[1], unc[1], epsilon = 1e-12);
    }
}
