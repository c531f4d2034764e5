//! Error type for histogram operations

use thiserror::Error;

/// Histogram error type
#[derive(Error, Debug)]
pub enum HistError {
    /// A histogram needs at least one axis
    #[error("histogram '{0}' has no axes")]
    EmptyAxes(String),

    /// Axis name not present on the histogram
    #[error("unknown axis '{0}'")]
    UnknownAxis(String),

    /// Coordinate length does not match the number of axes
    #[error("coordinate has {got} slots, histogram has {expected} axes")]
    DimensionMismatch {
        /// Slots supplied.
        got: usize,
        /// Axes on the histogram.
        expected: usize,
    },

    /// Bin index outside `[1, n_bins]`
    #[error("bin {bin} out of range [1, {nbins}] on axis '{axis}'")]
    BinOutOfRange {
        /// Offending axis name.
        axis: String,
        /// Requested bin.
        bin: u32,
        /// Bins on the axis.
        nbins: u32,
    },

    /// Two histograms cannot be combined
    #[error("incompatible histogram schemas: {0}")]
    IncompatibleSchema(String),
}

impl From<HistError> for cs_core::Error {
    fn from(e: HistError) -> Self {
        cs_core::Error::Hist(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HistError>;
