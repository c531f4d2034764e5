//! Common data types for CutScan

use serde::{Deserialize, Serialize};

/// Role of one result-tensor axis, as recorded in the `mapAxesType` manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisKind {
    /// Axis 0: one categorical label per scalar metric the callback reports.
    #[serde(rename = "parameter")]
    Parameter,
    /// A swept cut axis (grouped-bin granularity).
    #[serde(rename = "projection")]
    Projection,
    /// An external data dimension mirrored from the process configuration.
    #[serde(rename = "external-data")]
    ExternalData,
    /// A label-driven result axis.
    #[serde(rename = "result-in")]
    ResultIn,
    /// A range-driven result axis.
    #[serde(rename = "result-out")]
    ResultOut,
}

/// One fully addressed output cell: an ordered vector of 1-based bins, one
/// slot per result-tensor axis, each slot labelled with its [`AxisKind`].
///
/// Slot 0 is always the parameter axis; its bin is left at 0 until the write
/// guard resolves a metric name to a parameter label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    bins: Vec<u32>,
    kinds: Vec<AxisKind>,
}

impl Coordinate {
    /// Create a coordinate with every bin unset (0) for the given axis roles.
    ///
    /// Panics if `kinds` is empty or does not start with
    /// [`AxisKind::Parameter`]; the engine builds the role vector, so this is
    /// an internal contract rather than a recoverable condition.
    pub fn new(kinds: Vec<AxisKind>) -> Self {
        assert!(
            kinds.first() == Some(&AxisKind::Parameter),
            "coordinate must start with the parameter axis"
        );
        let bins = vec![0; kinds.len()];
        Self { bins, kinds }
    }

    /// Number of axes.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True if the coordinate has no axes (never the case for valid schemas).
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// All bins in axis order (slot 0 = parameter, possibly 0/unset).
    pub fn bins(&self) -> &[u32] {
        &self.bins
    }

    /// Axis roles in axis order.
    pub fn kinds(&self) -> &[AxisKind] {
        &self.kinds
    }

    /// Set the bin of slot `i`.
    pub fn set(&mut self, i: usize, bin: u32) {
        self.bins[i] = bin;
    }

    /// Bin of slot `i`.
    pub fn get(&self, i: usize) -> u32 {
        self.bins[i]
    }

    /// Bins of every slot with the given role, in axis order.
    pub fn bins_of(&self, kind: AxisKind) -> Vec<u32> {
        self.bins
            .iter()
            .zip(&self.kinds)
            .filter(|(_, k)| **k == kind)
            .map(|(b, _)| *b)
            .collect()
    }

    /// Grouped bins of the cut axes, in configuration order.
    pub fn cut_bins(&self) -> Vec<u32> {
        self.bins_of(AxisKind::Projection)
    }

    /// Bins of the external-data (process) axes.
    pub fn process_bins(&self) -> Vec<u32> {
        self.bins_of(AxisKind::ExternalData)
    }

    /// Bins of the result axes (label- and range-driven), in axis order.
    pub fn result_bins(&self) -> Vec<u32> {
        self.bins
            .iter()
            .zip(&self.kinds)
            .filter(|(_, k)| matches!(k, AxisKind::ResultIn | AxisKind::ResultOut))
            .map(|(b, _)| *b)
            .collect()
    }

    /// Full raw bin vector with the parameter slot replaced by `param_bin`.
    pub fn with_parameter(&self, param_bin: u32) -> Vec<u32> {
        let mut bins = self.bins.clone();
        bins[0] = param_bin;
        bins
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.bins.iter().map(|b| b.to_string()).collect();
        write!(f, "[{}]", parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds() -> Vec<AxisKind> {
        vec![
            AxisKind::Parameter,
            AxisKind::Projection,
            AxisKind::Projection,
            AxisKind::ResultIn,
        ]
    }

    #[test]
    fn role_accessors() {
        let mut c = Coordinate::new(kinds());
        c.set(1, 3);
        c.set(2, 7);
        c.set(3, 2);
        assert_eq!(c.cut_bins(), vec![3, 7]);
        assert_eq!(c.result_bins(), vec![2]);
        assert_eq!(c.with_parameter(1), vec![1, 3, 7, 2]);
        assert_eq!(c.get(0), 0, "parameter slot stays unset");
    }

    #[test]
    fn display_joins_bins() {
        let mut c = Coordinate::new(kinds());
        c.set(1, 1);
        c.set(2, 2);
        c.set(3, 3);
        assert_eq!(c.to_string(), "[0/1/2/3]");
    }
}
