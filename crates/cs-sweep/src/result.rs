//! Result tensor and its guarded write path.
//!
//! The sweep engine owns one [`ResultTensor`] per base output file. The only
//! sanctioned way to put a scalar into it is [`ResultTensor::write`], which
//! validates (and optionally normalizes) the value before insertion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cs_core::{AxisKind, Coordinate, Error, Result};
use cs_hist::SparseHist;

use crate::config::WriteOptions;

/// A scalar result refused by the write guard. Recoverable: the metric is
/// logged and omitted, the sweep continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteRejected {
    /// Value or error is NaN or infinite.
    #[error("non-finite result: value={value}, error={error}")]
    NonFinite {
        /// Offending value.
        value: f64,
        /// Offending error.
        error: f64,
    },

    /// Negative value with `only_positive` set.
    #[error("negative value {value} rejected (only_positive)")]
    Negative {
        /// Offending value.
        value: f64,
    },

    /// Statistically indistinguishable from noise at the threshold.
    #[error("insignificant signal: {threshold} * |{value}| < {error}")]
    InsignificantSignal {
        /// Reported value.
        value: f64,
        /// Reported error.
        error: f64,
        /// Configured threshold.
        threshold: f64,
    },

    /// Metric name not among the configured parameter labels.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
}

/// The shared output tensor: axis 0 is the parameter axis, the remaining
/// axes mirror process axes, enabled cuts, and result axes, in that order.
#[derive(Debug, Clone)]
pub struct ResultTensor {
    hist: SparseHist,
    kinds: Vec<AxisKind>,
    param_labels: Vec<String>,
    cut_width_product: f64,
    rejected: usize,
}

impl ResultTensor {
    /// Wrap a schema histogram. `kinds` must label every axis and start with
    /// the parameter axis.
    pub fn new(hist: SparseHist, kinds: Vec<AxisKind>, param_labels: Vec<String>) -> Result<Self> {
        if kinds.len() != hist.n_dims() {
            return Err(Error::Schema(format!(
                "{} axis kinds for {} axes",
                kinds.len(),
                hist.n_dims()
            )));
        }
        if kinds.first() != Some(&AxisKind::Parameter) {
            return Err(Error::Schema("axis 0 must be the parameter axis".into()));
        }
        if param_labels.len() as u32 != hist.axis(0).n_bins() {
            return Err(Error::Schema(format!(
                "{} parameter labels for {} parameter bins",
                param_labels.len(),
                hist.axis(0).n_bins()
            )));
        }
        Ok(Self { hist, kinds, param_labels, cut_width_product: 1.0, rejected: 0 })
    }

    /// The underlying histogram.
    pub fn hist(&self) -> &SparseHist {
        &self.hist
    }

    /// Axis roles, in axis order.
    pub fn kinds(&self) -> &[AxisKind] {
        &self.kinds
    }

    /// Writes refused by the guard since construction.
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    /// A zeroed copy sharing the schema (axes, roles, labels).
    pub fn fresh_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.hist.clear();
        copy.cut_width_product = 1.0;
        copy.rejected = 0;
        copy
    }

    /// Product of cut-axis bin widths at the current cut coordinate, set by
    /// the engine before each cell. Used for width normalization only.
    pub fn set_cut_width_product(&mut self, width: f64) {
        self.cut_width_product = width;
    }

    /// Guarded write of one scalar `(value, error)` under the metric `name`
    /// at `coord` (whose parameter slot is resolved here). Returns the full
    /// raw bin vector the result landed at.
    pub fn write(
        &mut self,
        name: &str,
        coord: &Coordinate,
        value: f64,
        error: f64,
        opts: &WriteOptions,
    ) -> std::result::Result<Vec<u32>, WriteRejected> {
        let param_bin = match self.guard(name, value, error, opts) {
            Ok(bin) => bin,
            Err(e) => {
                self.rejected += 1;
                log::warn!(
                    "write rejected ({e}): name={name} coord={coord} value={value} error={error} threshold={}",
                    opts.significance_threshold
                );
                return Err(e);
            }
        };

        let (mut value, mut error) = (value, error);
        if opts.normalize_to_width && self.cut_width_product > 0.0 {
            value /= self.cut_width_product;
            error /= self.cut_width_product;
        }

        let bins = coord.with_parameter(param_bin);
        // Coordinate and schema are built by the same engine; a mismatch here
        // is a schema bug, surfaced as an unknown-parameter rejection.
        if self.hist.set_bin(&bins, value, error).is_err() {
            self.rejected += 1;
            log::warn!("write rejected (bad coordinate): name={name} coord={coord}");
            return Err(WriteRejected::UnknownParameter(name.to_string()));
        }
        Ok(bins)
    }

    fn guard(
        &self,
        name: &str,
        value: f64,
        error: f64,
        opts: &WriteOptions,
    ) -> std::result::Result<u32, WriteRejected> {
        if !value.is_finite() || !error.is_finite() {
            return Err(WriteRejected::NonFinite { value, error });
        }
        if opts.only_positive && value < 0.0 {
            return Err(WriteRejected::Negative { value });
        }
        let threshold = opts.significance_threshold;
        if threshold > 0.0 && threshold * value.abs() < error {
            return Err(WriteRejected::InsignificantSignal { value, error, threshold });
        }
        self.param_labels
            .iter()
            .position(|l| l == name)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| WriteRejected::UnknownParameter(name.to_string()))
    }
}

/// What lands in one base output file: the tensor plus the axis-type
/// manifest (`mapAxesType`), one tag per axis in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedResult {
    /// The result tensor.
    pub tensor: SparseHist,
    /// Axis roles, in axis order.
    #[serde(rename = "mapAxesType")]
    pub map_axes_type: Vec<AxisKind>,
}

impl PersistedResult {
    /// Snapshot a tensor for persistence.
    pub fn from_tensor(tensor: &ResultTensor) -> Self {
        Self { tensor: tensor.hist.clone(), map_axes_type: tensor.kinds.clone() }
    }
}
