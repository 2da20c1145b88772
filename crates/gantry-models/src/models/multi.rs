//! Diagonal standard normal in `n` dimensions: gradient -θ, Hessian -I.

use crate::math::LN_TWO_PI;
use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct Multi {
    dim: usize,
}

#[derive(Deserialize)]
struct MultiData {
    n: usize,
}

#[derive(Deserialize)]
struct Point {
    mu: Vec<f64>,
}

impl Multi {
    pub fn from_data(data: &serde_json::Value) -> ModelResult<Self> {
        let parsed: MultiData = serde_json::from_value(data.clone())?;
        if parsed.n == 0 {
            return Err(ModelError::Data("n must be at least 1".to_string()));
        }
        Ok(Self { dim: parsed.n })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl DensityModel for Multi {
    fn name(&self) -> &str {
        "multi"
    }

    fn param_names(&self, _include_tp: bool, _include_gq: bool) -> Vec<String> {
        (1..=self.dim).map(|i| format!("mu.{i}")).collect()
    }

    fn param_unc_names(&self) -> Vec<String> {
        self.param_names(false, false)
    }

    fn log_density(&self, propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let mut lp = -0.5 * theta_unc.iter().map(|t| t * t).sum::<f64>();
        if !propto {
            lp -= 0.5 * self.dim as f64 * LN_TWO_PI;
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
        for (g, t) in grad.iter_mut().zip(theta_unc) {
            *g = -t;
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
        let n = self.dim;
        hessian.fill(0.0);
        for i in 0..n {
            hessian[i * n + i] = -1.0;
        }
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
        for (out, v) in hvp.iter_mut().zip(vector) {
            *out = -v;
        }
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
        theta.copy_from_slice(theta_unc);
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        theta_unc.copy_from_slice(theta);
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json).map_err(ModelError::from)?;
        if point.mu.len() != self.dim {
            return Err(ModelError::Evaluation(format!(
                "mu has {} entries; this model has {}",
                point.mu.len(),
                self.dim
            )));
        }
        theta_unc.copy_from_slice(&point.mu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn model(n: usize) -> Multi {
        Multi::from_data(&json!({ "n": n })).unwrap()
    }

    #[test]
    fn test_requires_dimension() {
        assert!(Multi::from_data(&json!({})).is_err());
        assert!(Multi::from_data(&json!({ "n": 0 })).is_err());
    }

    #[test]
    fn test_names_are_indexed() {
        let m = model(3);
        assert_eq!(m.param_names(false, false), vec!["mu.1", "mu.2", "mu.3"]);
    }

    #[test]
    fn test_gradient_is_negated_point() {
        let m = model(4);
        let point = [0.0, 1.0, -2.0, 3.5];
        let mut grad = [0.0; 4];
        let lp = m
            .log_density_gradient(true, false, &point, &mut grad)
            .unwrap();
        assert_abs_diff_eq!(lp, -0.5 * (1.0 + 4.0 + 12.25), epsilon = 1e-12);
        for (g, t) in grad.iter().zip(&point) {
            assert_abs_diff_eq!(*g, -t);
        }
    }

    #[test]
    fn test_hessian_is_negative_identity() {
        let m = model(3);
        let mut grad = [0.0; 3];
        let mut hessian = [0.0; 9];
        m.log_density_hessian(true, false, &[0.1, 0.2, 0.3], &mut grad, &mut hessian)
            .unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let want = if i == j { -1.0 } else { 0.0 };
                assert_abs_diff_eq!(hessian[j * 3 + i], want);
            }
        }
    }

    #[test]
    fn test_unconstrain_json_length_mismatch() {
        let m = model(3);
        let mut out = [0.0; 3];
        let err = m
            .param_unconstrain_json(r#"{"mu": [1.0, 2.0]}"#, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("2 entries"));
    }
}
