//! The reference model zoo
//!
//! Each model has a closed-form density and transforms, so tests can pin
//! exact values. The `throw_*` family fails on purpose at a named stage and
//! exists to exercise the error channel; `print` exists to exercise the
//! print stream.

pub mod bernoulli;
pub mod full;
pub mod gaussian;
pub mod matrix;
pub mod multi;
pub mod print;
pub mod simplex;
pub mod stdnormal;
pub mod throw;

pub use bernoulli::Bernoulli;
pub use full::Full;
pub use gaussian::Gaussian;
pub use matrix::MatrixNormal;
pub use multi::Multi;
pub use print::PrintModel;
pub use simplex::Simplex;
pub use stdnormal::StdNormal;
pub use throw::{FailPoint, Throwing};
