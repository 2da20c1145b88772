//! Standard normal density over a matrix-valued parameter.
//!
//! Exists to pin down name indexing: a `rows x cols` matrix flattens in
//! column-major order and its entries are named `A.<row>.<col>` with 1-based
//! indices. The transformed block doubles the matrix as `B`.

use crate::math::LN_TWO_PI;
use crate::model::{DensityModel, ModelError, ModelResult};
use crate::prng::SampleRng;
use serde::Deserialize;

pub struct MatrixNormal {
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct MatrixData {
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct Point {
    #[serde(rename = "A")]
    a: Vec<f64>,
}

impl MatrixNormal {
    pub fn from_data(data: &serde_json::Value) -> ModelResult<Self> {
        let parsed: MatrixData = serde_json::from_value(data.clone())?;
        if parsed.rows < 1 || parsed.cols < 1 {
            return Err(ModelError::Data(format!(
                "rows and cols must be at least 1; got {} x {}",
                parsed.rows, parsed.cols
            )));
        }
        Ok(Self {
            rows: parsed.rows,
            cols: parsed.cols,
        })
    }

    fn dim(&self) -> usize {
        self.rows * self.cols
    }

    fn entry_names(&self, label: &str) -> impl Iterator<Item = String> + '_ {
        let rows = self.rows;
        let label = label.to_string();
        (1..=self.cols)
            .flat_map(move |j| (1..=rows).map(move |i| (i, j)))
            .map(move |(i, j)| format!("{label}.{i}.{j}"))
    }
}

impl DensityModel for MatrixNormal {
    fn name(&self) -> &str {
        "matrix"
    }

    fn param_names(&self, include_tp: bool, _include_gq: bool) -> Vec<String> {
        let mut names: Vec<String> = self.entry_names("A").collect();
        if include_tp {
            names.extend(self.entry_names("B"));
        }
        names
    }

    fn param_unc_names(&self) -> Vec<String> {
        self.entry_names("A").collect()
    }

    fn log_density(&self, propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        let mut lp = -0.5 * theta_unc.iter().map(|a| a * a).sum::<f64>();
        if !propto {
            lp -= 0.5 * self.dim() as f64 * LN_TWO_PI;
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
        for (g, &a) in grad.iter_mut().zip(theta_unc) {
            *g = -a;
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
        let n = self.dim();
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
        for (p, &v) in hvp.iter_mut().zip(vector) {
            *p = -v;
        }
        self.log_density(propto, jacobian, theta_unc)
    }

    fn param_constrain(
        &self,
        include_tp: bool,
        _include_gq: bool,
        theta_unc: &[f64],
        theta: &mut [f64],
        _rng: Option<&mut SampleRng>,
    ) -> ModelResult<()> {
        let n = self.dim();
        theta[..n].copy_from_slice(theta_unc);
        if include_tp {
            for i in 0..n {
                theta[n + i] = 2.0 * theta_unc[i];
            }
        }
        Ok(())
    }

    fn param_unconstrain(&self, theta: &[f64], theta_unc: &mut [f64]) -> ModelResult<()> {
        theta_unc.copy_from_slice(&theta[..self.dim()]);
        Ok(())
    }

    fn param_unconstrain_json(&self, json: &str, theta_unc: &mut [f64]) -> ModelResult<()> {
        let point: Point = serde_json::from_str(json)?;
        if point.a.len() != self.dim() {
            return Err(ModelError::Evaluation(format!(
                "A has {} entries; this model has {}",
                point.a.len(),
                self.dim()
            )));
        }
        theta_unc.copy_from_slice(&point.a);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn model() -> MatrixNormal {
        MatrixNormal::from_data(&json!({ "rows": 3, "cols": 2 })).unwrap()
    }

    #[test]
    fn test_names_are_column_major() {
        let m = model();
        assert_eq!(
            m.param_names(false, false),
            vec!["A.1.1", "A.2.1", "A.3.1", "A.1.2", "A.2.2", "A.3.2"]
        );
    }

    #[test]
    fn test_transformed_names_follow_base_block() {
        let m = model();
        let names = m.param_names(true, false);
        assert_eq!(names.len(), 12);
        assert_eq!(names[6], "B.1.1");
        assert_eq!(names[11], "B.3.2");
    }

    #[test]
    fn test_constrain_doubles_into_transformed_block() {
        let m = model();
        let unc: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let mut theta = [0.0; 12];
        m.param_constrain(true, false, &unc, &mut theta, None)
            .unwrap();
        assert_eq!(&theta[..6], unc.as_slice());
        for i in 0..6 {
            assert_eq!(theta[6 + i], 2.0 * unc[i]);
        }
    }

    #[test]
    fn test_rejects_empty_shape() {
        assert!(MatrixNormal::from_data(&json!({ "rows": 0, "cols": 2 })).is_err());
        assert!(MatrixNormal::from_data(&json!({ "rows": 2 })).is_err());
    }

    #[test]
    fn test_unconstrain_json_checks_length() {
        let m = model();
        let mut out = [0.0; 6];
        let err = m
            .param_unconstrain_json(r#"{"A": [1.0, 2.0]}"#, &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("2 entries"));
    }
}
