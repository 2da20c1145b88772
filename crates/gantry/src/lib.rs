//! Gantry - A safe client bridge for compiled statistical model libraries
//!
//! A model library is a shared object exporting the `gt_*` C surface over
//! one statistical model: its data, constraining transforms, log density
//! with derivatives, and generated quantities. This crate loads such a
//! library and wraps every operation in a safe API:
//! - Library loading and symbol resolution ([`ModelLibrary`])
//! - Model and RNG handle lifecycle ([`Model`], [`ModelRng`])
//! - Buffer sizing validated before any native call
//! - Error transport over the library's out-of-band message channel
//! - Print stream capture per loaded image ([`capture`])
//!
//! The bridge computes nothing itself: samplers, optimizers, and the
//! models they drive all live elsewhere. It is the seam between them.
//!
//! # Example
//!
//! ```no_run
//! use gantry::{Model, ModelData, ModelLibrary};
//! use std::sync::Arc;
//!
//! fn main() -> gantry::Result<()> {
//!     let lib = Arc::new(ModelLibrary::open("model.so")?);
//!     let model = Model::new(&lib, ModelData::Empty, 42)?;
//!     let point = vec![0.0; model.param_unc_num()];
//!     let (val, grad) = model.log_density_gradient(&point, true, true)?;
//!     println!("lp = {val}, grad = {grad:?}");
//!     Ok(())
//! }
//! ```

/// Bridge version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod capture;
pub mod data;
pub mod error;
pub mod library;
pub mod model;
pub mod rng;

// Native call plumbing (symbol table, error slot)
mod ffi;

// Re-export commonly used types
pub use capture::{forward_to_stdout, PrintCallback};
pub use data::ModelData;
pub use error::{BridgeError, Result};
pub use library::ModelLibrary;
pub use model::Model;
pub use rng::ModelRng;
