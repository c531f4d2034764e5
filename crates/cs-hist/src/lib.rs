//! # cs-hist
//!
//! Sparse N-dimensional histogram used as the input and output tensor of the
//! CutScan engines: named axes (uniform, variable-width, or categorical),
//! 1-based bin indexing with per-axis active ranges, projection and slicing,
//! additive combination, and JSON persistence with deterministic cell order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod error;
pub mod io;
pub mod sparse;

pub use axis::{Axis, Binning};
pub use error::{HistError, Result};
pub use sparse::SparseHist;
