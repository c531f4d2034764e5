//! # cs-core
//!
//! Shared foundation for CutScan: the consolidated error type, the
//! role-labelled [`Coordinate`] addressing a single output cell, and the
//! [`Storage`] collaborator trait with its local-filesystem backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{LocalStorage, Storage};
pub use types::{AxisKind, Coordinate};
