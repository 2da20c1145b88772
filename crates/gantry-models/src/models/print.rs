//! Model whose log density writes to the print stream.
//!
//! Every `log_density` call emits one fixed line through [`crate::stream`],
//! so a capture test can count lines against call counts. The gradient is
//! closed-form; the finite-difference default would evaluate the density
//! several times per call and make the line count depend on step logic.

use crate::model::{DensityModel, ModelResult};
use crate::prng::SampleRng;
use crate::stream;
use serde::Deserialize;

pub const PRINT_LINE: &str = "hello from the log density\n";

pub struct PrintModel;

#[derive(Deserialize)]
struct Point {
    theta: f64,
}

impl DensityModel for PrintModel {
    fn name(&self) -> &str {
        "print"
    }

    fn param_names(&self, _include_tp: bool, _include_gq: bool) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn param_unc_names(&self) -> Vec<String> {
        vec!["theta".to_string()]
    }

    fn log_density(&self, _propto: bool, _jacobian: bool, theta_unc: &[f64]) -> ModelResult<f64> {
        stream::emit(PRINT_LINE);
        let theta = theta_unc[0];
        Ok(-0.5 * theta * theta)
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
        let point: Point = serde_json::from_str(json)?;
        theta_unc[0] = point.theta;
        Ok(())
    }
}
