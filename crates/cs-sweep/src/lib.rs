//! # cs-sweep
//!
//! The CutScan control plane: given sparse input histograms and a declarative
//! set of per-axis cuts (sub-ranges with optional rebin grouping), enumerate
//! every combination of grouped bins, drive a per-cell callback on the
//! restricted inputs, collect scalar results into a guarded output tensor,
//! and persist everything to a deterministic directory layout that a merge
//! step can later recombine into one file.
//!
//! Modules, leaves first:
//! - [`rebin`] — base ⇄ grouped bin arithmetic,
//! - [`config`] — the typed, validated sweep configuration,
//! - [`nditer`] — generic N-dimensional index-space iteration,
//! - [`result`] — the result tensor and its write guard,
//! - [`layout`] — the deterministic output-path scheme,
//! - [`engine`] — the Cartesian sweep itself,
//! - [`merge`] — recombination of per-cell outputs,
//! - [`distribute`] — re-sharding of a combined tensor into per-cell files.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distribute;
pub mod engine;
pub mod layout;
pub mod merge;
pub mod nditer;
pub mod rebin;
pub mod result;

pub use config::{CutSpec, ProcessMode, ResultAxisSpec, SweepConfig, WriteOptions};
pub use distribute::{distribute, DistributeReport};
pub use engine::{ArtifactSink, CellCallback, CellOutcome, SweepEngine, SweepReport};
pub use layout::OutputLayout;
pub use merge::merge;
pub use result::{PersistedResult, ResultTensor, WriteRejected};
