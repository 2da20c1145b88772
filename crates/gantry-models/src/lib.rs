//! Reference model zoo for the gantry bridge
//!
//! Compiled as a `cdylib`, this crate is a complete conforming model
//! library: it exports every `gt_*` symbol the bridge resolves and backs
//! them with small closed-form densities. The bridge's integration suite
//! loads the built artifact; the zoo is both that test fixture and the
//! worked example of what a model library must do.
//!
//! - [`model`] declares the [`DensityModel`] trait the zoo implements.
//! - [`models`] holds the zoo itself, one module per density.
//! - [`abi`] is the exported C surface over a constructed model.
//! - [`prng`], [`stream`], and [`math`] are the shared plumbing: seeded
//!   draws, the print stream, and finite-difference helpers.
//!
//! Model selection rides inside the data payload: the reserved top-level
//! `"model"` key names a zoo entry and the remaining keys are that model's
//! data block. An empty payload selects `stdnormal`.

pub mod abi;
pub mod math;
pub mod model;
pub mod models;
pub mod prng;
pub mod stream;

pub use model::{DensityModel, ModelError, ModelResult};

use models::throw::data_block_failure;
use models::{
    Bernoulli, FailPoint, Full, Gaussian, MatrixNormal, Multi, PrintModel, Simplex, StdNormal,
    Throwing,
};

/// Every model the zoo can construct, in registry order.
pub const NAMES: &[&str] = &[
    "stdnormal",
    "multi",
    "bernoulli",
    "gaussian",
    "full",
    "simplex",
    "matrix",
    "throw_data",
    "throw_lp",
    "throw_tp",
    "throw_gq",
    "print",
];

/// Constructs the model a data payload selects.
///
/// An empty payload means `stdnormal`; otherwise the payload must be a
/// JSON object whose optional `"model"` key names a [`NAMES`] entry.
pub fn build(data: &str) -> ModelResult<Box<dyn DensityModel>> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return Ok(Box::new(StdNormal));
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)?;
    if !value.is_object() {
        return Err(ModelError::Data("data must be a JSON object".to_string()));
    }
    let name = match value.get("model") {
        None => "stdnormal",
        Some(serde_json::Value::String(name)) => name.as_str(),
        Some(other) => {
            return Err(ModelError::Data(format!(
                "model key must be a string, got {other}"
            )))
        }
    };
    match name {
        "stdnormal" => Ok(Box::new(StdNormal)),
        "multi" => Ok(Box::new(Multi::from_data(&value)?)),
        "bernoulli" => Ok(Box::new(Bernoulli::from_data(&value)?)),
        "gaussian" => Ok(Box::new(Gaussian::from_data(&value)?)),
        "full" => Ok(Box::new(Full)),
        "simplex" => Ok(Box::new(Simplex::from_data(&value)?)),
        "matrix" => Ok(Box::new(MatrixNormal::from_data(&value)?)),
        "throw_data" => Err(data_block_failure()),
        "throw_lp" => Ok(Box::new(Throwing::new(FailPoint::LogDensity))),
        "throw_tp" => Ok(Box::new(Throwing::new(FailPoint::TransformedParams))),
        "throw_gq" => Ok(Box::new(Throwing::new(FailPoint::GeneratedQuantities))),
        "print" => Ok(Box::new(PrintModel)),
        other => Err(ModelError::Data(format!("unknown model: {other}"))),
    }
}

/// A payload that constructs the named model, for tests and smoke checks.
/// `throw_data` fails at construction like any of its payloads.
pub fn minimal_payload(name: &str) -> String {
    match name {
        "stdnormal" => String::new(),
        "multi" => r#"{"model": "multi", "n": 3}"#.to_string(),
        "bernoulli" => r#"{"model": "bernoulli", "N": 4, "y": [0, 1, 1, 0]}"#.to_string(),
        "gaussian" => r#"{"model": "gaussian", "N": 2, "y": [0.4, -0.7]}"#.to_string(),
        "matrix" => r#"{"model": "matrix", "rows": 2, "cols": 3}"#.to_string(),
        other => format!(r#"{{"model": "{other}"}}"#),
    }
}

// ===== tests =====
