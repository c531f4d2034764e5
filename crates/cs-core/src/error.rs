//! Error types for CutScan

use thiserror::Error;

/// CutScan error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed cut/axis/result configuration (fatal, detected before any I/O)
    #[error("Config error: {0}")]
    Config(String),

    /// Result-tensor schema cannot be built (fatal)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Histogram-level failure from the sparse-tensor collaborator
    #[error("Histogram error: {0}")]
    Hist(String),

    /// Rebin addressing produced a base window outside the axis
    #[error("grouped bin {bin} maps to base window [{min}, {max}] outside [1, {nbins}]")]
    OutOfRange {
        /// Grouped bin being resolved.
        bin: u32,
        /// Lower edge of the computed base window.
        min: i64,
        /// Upper edge of the computed base window.
        max: i64,
        /// Number of base bins on the axis.
        nbins: u32,
    },

    /// Explicit process-range override outside the natural grouped range
    #[error(
        "process range [{lo}, {hi}] on axis '{axis}' outside grouped range [{start}, {end}]"
    )]
    RangeOutOfBounds {
        /// Axis the override applies to.
        axis: String,
        /// Requested lower grouped bin.
        lo: u32,
        /// Requested upper grouped bin.
        hi: u32,
        /// Natural first grouped bin.
        start: u32,
        /// Natural last grouped bin.
        end: u32,
    },

    /// N-dimensional iteration bounds are inverted or mismatched
    #[error("invalid iteration bounds: {0}")]
    InvalidBounds(String),

    /// The cell callback requested immediate termination of the sweep
    #[error("sweep aborted by cell callback at coordinate {0}")]
    CellFatal(String),

    /// The sweep was cancelled cooperatively before completing
    #[error("sweep cancelled")]
    Cancelled,

    /// Merge found no per-cell files under the computed base path
    #[error("nothing to merge under {0}")]
    NothingToMerge(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
