//! Uniform density over the unit simplex via the stick-breaking transform.
//!
//! The constrained space has one more coordinate than the unconstrained one,
//! so buffer sizing must track the two dimensions separately. Derivatives are
//! left to the finite-difference defaults, which keeps the transform itself
//! the only code under test.

use crate::math::{logit, sigmoid};
use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

const SUM_TOLERANCE: f64 = 1e-8;

pub struct Simplex {
    k: usize,
}

fn default_k() -> usize {
    5
}

#[derive(Deserialize)]
struct SimplexData {
    #[serde(rename = "K", default = "default_k")]
    k: usize,
}

#[derive(Deserialize)]
struct Point {
    theta: Vec<f64>,
}

impl Simplex {
    pub fn from_data(data: &serde_json::Value) -> ModelResult<Self> {
        let parsed: SimplexData = serde_json::from_value(data.clone())?;
        if parsed.k < 2 {
            return Err(ModelError::Data(format!(
                "K is {} but must be at least 2",
                parsed.k
            )));
        }
        Ok(Self { k: parsed.k })
    }

    /// Stick-breaking transform. Fills `theta` and returns the log absolute
    /// determinant of the Jacobian.
    fn forward(&self, theta_unc: &[f64], theta: &mut [f64]) -> f64 {
        let mut stick: f64 = 1.0;
        let mut log_jac = 0.0;
        for (i, &y) in theta_unc.iter().enumerate().take(self.k - 1) {
            let adj = ((self.k - i - 1) as f64).ln();
            let z = sigmoid(y - adj);
            log_jac += stick.ln() + z.ln() + (1.0 - z).ln();
            theta[i] = stick * z;
            stick -= theta[i];
        }
        theta[self.k - 1] = stick;
        log_jac
    }
}

impl DensityModel for Simplex {
    fn name(&self) -> &str {
        "simplex"
    }

    fn param_names(&self, _include_tp: bool, _include_gq: bool) -> Vec<String> {
        (1..=self.k).map(|i| format!("theta.{i}")).collect()
    }

    fn param_unc_names(&self) -> Vec<String> {
        (1..self.k).map(|i| format!("theta.{i}")).collect()
    }

    fn log_density(&self, _propto: bool, jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let mut theta = vec![0.0; self.k];
        let log_jac = self.forward(theta_unc, &mut theta);
        Ok(if jacobian { log_jac } else { 0.0 })
    }

    fn param_constrain(
        &self,
        _include_tp: bool,
        _include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        _rng: Option<&mut SampleRng>,
    ) -> ModelResult<()> {
        self.forward(theta_unc, theta);
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        for &x in theta {
            if x < 0.0 {
                return Err(ModelError::Evaluation(format!(
                    "theta entries must be nonnegative; found {x}"
                )));
            }
        }
        let total: f64 = theta.iter().sum();
        if (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(ModelError::Evaluation(format!(
                "theta sums to {total} but must sum to 1"
            )));
        }
        let mut stick = 1.0;
        for i in 0..self.k - 1 {
            let z = theta[i] / stick;
            theta_unc[i] = logit(z) + ((self.k - i - 1) as f64).ln();
            stick -= theta[i];
        }
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json)?;
        if point.theta.len() != self.k {
            return Err(ModelError::Evaluation(format!(
                "theta has {} entries; this model has {}",
                point.theta.len(),
                self.k
            )));
        }
        self.param_unconstrain(&point.theta, theta_unc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;
    use serde_json::json;

    fn model(k: usize) -> Simplex {
        Simplex::from_data(&json!({ "K": k })).unwrap()
    }

    #[test]
    fn test_default_size() {
        let m = Simplex::from_data(&json!({})).unwrap();
        assert_eq!(m.param_names(false, false).len(), 5);
        assert_eq!(m.param_unc_names().len(), 4);
    }

    #[test]
    fn test_rejects_degenerate_size() {
        assert!(Simplex::from_data(&json!({ "K": 1 })).is_err());
    }

    #[rstest]
    #[case(vec![0.0, 0.0, 0.0])]
    #[case(vec![1.2, -0.7, 0.3])]
    #[case(vec![-4.0, 4.0, 0.0])]
    fn test_constrain_lands_on_simplex(#[case] unc: Vec<f64>) {
        let m = model(4);
        let mut theta = [0.0; 4];
        m.param_constrain(false, false, &unc, &mut theta, None)
            .unwrap();
        let total: f64 = theta.iter().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        assert!(theta.iter().all(|&x| (0.0..=1.0).contains(&x)));
    }

    #[test]
    fn test_origin_maps_to_uniform_point() {
        let m = model(5);
        let mut theta = [0.0; 5];
        m.param_constrain(false, false, &[0.0; 4], &mut theta, None)
            .unwrap();
        for &x in &theta {
            assert_abs_diff_eq!(x, 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let m = model(4);
        let unc = [0.3, -1.1, 2.4];
        let mut theta = [0.0; 4];
        let mut back = [0.0; 3];
        m.param_constrain(false, false, &unc, &mut theta, None)
            .unwrap();
        m.param_unconstrain(&theta, &mut back).unwrap();
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], unc[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_jacobian_closed_form_for_two_bins() {
        let m = model(2);
        let lp = m.log_density(true, true, &[0.0]).unwrap();
        assert_abs_diff_eq!(lp, -2.0 * 2.0_f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            m.log_density(true, false, &[0.0]).unwrap(),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_unconstrain_rejects_bad_input() {
        let m = model(3);
        let mut out = [0.0; 2];
        let err = m
            .param_unconstrain(&[0.5, 0.4, 0.3], &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("sum to 1"));
        let err = m
            .param_unconstrain(&[-0.1, 0.6, 0.5], &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("nonnegative"));
    }

    #[test]
    fn test_unconstrain_json_checks_length() {
        let m = model(3);
        let mut out = [0.0; 2];
        let err = m
            .param_unconstrain_json(r#"{"theta": [0.5, 0.5]}"#, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("2 entries"));
    }
}
