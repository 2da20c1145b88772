//! Native call plumbing
//!
//! Everything that touches raw pointers on the client side lives here:
//! - [`Symbols`]: the full `gt_*` function table, resolved once at load.
//! - [`ErrorSlot`]: RAII transport for the out-of-band `char**` message
//!   channel, freeing native allocations on every path.
//!
//! The handle types (`ModelLibrary`, `Model`, `ModelRng`) own the safety
//! argument; this module only makes the calls expressible.

mod slot;
mod symbols;

pub(crate) use slot::ErrorSlot;
pub(crate) use symbols::{read_version, Symbols};
