//! Typed sweep configuration.
//!
//! The whole document is deserialized once and validated in a single pass;
//! everything downstream reads statically typed fields. There is no ambient
//! global configuration object.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cs_core::{Error, Result};

use crate::rebin;

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

/// One per-axis cut: a swept sub-range at grouped-bin granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutSpec {
    /// Name of the input axis this cut applies to.
    pub axis: String,
    /// Disabled cuts contribute neither a sweep dimension nor a path segment.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base bins per grouped bin.
    #[serde(default = "default_one")]
    pub rebin: u32,
    /// Base-bin anchor of the first group.
    #[serde(default = "default_one")]
    pub rebin_start: u32,
}

impl CutSpec {
    /// First group's shrink offset (see [`rebin::rebin_minimum`]).
    pub fn rebin_minimum(&self) -> u32 {
        rebin::rebin_minimum(self.rebin, self.rebin_start)
    }
}

/// A named sub-range of a range-driven result axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRange {
    /// Range name (becomes the bin label on the result axis).
    pub name: String,
    /// Optional lower bound, interpreted by the cell callback.
    #[serde(default)]
    pub min: Option<f64>,
    /// Optional upper bound, interpreted by the cell callback.
    #[serde(default)]
    pub max: Option<f64>,
}

/// An output-only axis: categorical labels or named ranges, exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultAxisSpec {
    /// Axis name.
    pub name: String,
    /// Ordered bin labels (label-driven axis).
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Ordered named ranges (range-driven axis).
    #[serde(default)]
    pub ranges: Option<Vec<NamedRange>>,
}

impl ResultAxisSpec {
    /// Bin labels of the axis, whichever variant drives it.
    pub fn bin_labels(&self) -> Result<Vec<String>> {
        match (&self.labels, &self.ranges) {
            (Some(labels), None) => Ok(labels.clone()),
            (None, Some(ranges)) => Ok(ranges.iter().map(|r| r.name.clone()).collect()),
            _ => Err(Error::Schema(format!(
                "result axis '{}' must have exactly one of labels/ranges",
                self.name
            ))),
        }
    }

    /// True for label-driven axes (already validated).
    pub fn is_label_driven(&self) -> bool {
        self.labels.is_some()
    }
}

/// Scalar-metric labels the callback may report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// One label per metric (axis 0 of the result tensor).
    pub labels: Vec<String>,
}

/// Write-guard policy flags, applied to every reported scalar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct WriteOptions {
    /// Divide value and error by the product of cut-axis bin widths.
    #[serde(default)]
    pub normalize_to_width: bool,
    /// Reject negative values.
    #[serde(default)]
    pub only_positive: bool,
    /// Reject results with `threshold * |value| < error` (0 disables).
    #[serde(default)]
    pub significance_threshold: f64,
}

/// Result-tensor section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultConfig {
    /// Output-only axes.
    #[serde(default)]
    pub axes: Vec<ResultAxisSpec>,
    /// Parameter-axis labels.
    pub parameters: ParameterConfig,
    /// Write-guard defaults.
    #[serde(default)]
    pub write: WriteOptions,
}

/// Where outputs land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Storage host; empty or `"local"` selects the local filesystem.
    #[serde(default)]
    pub host: String,
    /// Base output directory.
    pub dir: PathBuf,
    /// Output file name written per base cell and by the merge step.
    pub file: String,
}

/// Sweep extent selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// Process exactly one grouped bin per cut (the lower edge of each range).
    Single,
    /// Sweep the full grouped range of every enabled cut.
    #[default]
    All,
}

/// An external data dimension mirrored into the result tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessAxisSpec {
    /// Axis name.
    pub name: String,
    /// One label per bin.
    pub labels: Vec<String>,
}

/// Process section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProcessConfig {
    /// Single-point or full sweep.
    #[serde(default, rename = "type")]
    pub mode: ProcessMode,
    /// Optional grouped-bin overrides, one `[lo, hi]` per enabled cut.
    #[serde(default)]
    pub ranges: Option<Vec<[u32; 2]>>,
    /// External data axes.
    #[serde(default)]
    pub axes: Vec<ProcessAxisSpec>,
}

/// The fully validated sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Per-axis cuts, in sweep and path order.
    pub cuts: Vec<CutSpec>,
    /// Result-tensor section.
    pub result: ResultConfig,
    /// Environment tag (first path segment under the output directory).
    pub environment: String,
    /// Output destination.
    pub output: OutputConfig,
    /// Process section.
    #[serde(default)]
    pub process: ProcessConfig,
}

impl SweepConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let cfg: SweepConfig = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate every invariant in one pass. Called by [`SweepConfig::load`]
    /// and again after explicit mutation.
    pub fn validate(&self) -> Result<()> {
        for cut in &self.cuts {
            if cut.rebin < 1 || cut.rebin_start < 1 {
                return Err(Error::Config(format!(
                    "cut '{}': rebin and rebin_start must be >= 1",
                    cut.axis
                )));
            }
            if cut.rebin > 1 && cut.rebin_start >= cut.rebin {
                return Err(Error::Config(format!(
                    "cut '{}': rebin_start {} must be < rebin {}",
                    cut.axis, cut.rebin_start, cut.rebin
                )));
            }
        }
        for axis in &self.result.axes {
            axis.bin_labels()?;
            if axis.bin_labels()?.is_empty() {
                return Err(Error::Schema(format!(
                    "result axis '{}' has no bins",
                    axis.name
                )));
            }
        }
        if self.result.parameters.labels.is_empty() {
            return Err(Error::Config("result.parameters.labels is empty".into()));
        }
        let n_enabled = self.enabled_cuts().count();
        if let Some(ranges) = &self.process.ranges {
            if ranges.len() != n_enabled {
                return Err(Error::Config(format!(
                    "process.ranges has {} entries for {} enabled cuts",
                    ranges.len(),
                    n_enabled
                )));
            }
        } else if self.process.mode == ProcessMode::Single {
            return Err(Error::Config(
                "process.type = \"single\" requires process.ranges".into(),
            ));
        }
        if self.output.file.is_empty() {
            return Err(Error::Config("output.file is empty".into()));
        }
        Ok(())
    }

    /// Enabled cuts in configuration order.
    pub fn enabled_cuts(&self) -> impl Iterator<Item = &CutSpec> {
        self.cuts.iter().filter(|c| c.enabled)
    }

    /// Re-bin one cut axis (the `SetBinning` command) and re-validate.
    pub fn set_binning(&mut self, axis: &str, rebin: u32, rebin_start: u32) -> Result<()> {
        let cut = self
            .cuts
            .iter_mut()
            .find(|c| c.axis == axis)
            .ok_or_else(|| Error::Config(format!("no cut for axis '{axis}'")))?;
        cut.rebin = rebin;
        cut.rebin_start = rebin_start;
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cfg() -> SweepConfig {
        serde_json::from_value(serde_json::json!({
            "cuts": [
                {"axis": "pt", "rebin": 2, "rebin_start": 1},
                {"axis": "cent", "enabled": false}
            ],
            "result": {
                "axes": [{"name": "method", "labels": ["sideband", "mc"]}],
                "parameters": {"labels": ["Integral"]}
            },
            "environment": "test",
            "output": {"dir": "/tmp/out", "file": "result.json"}
        }))
        .unwrap()
    }

    #[test]
    fn valid_config_passes() {
        base_cfg().validate().unwrap();
    }

    #[test]
    fn rebin_start_must_stay_below_rebin() {
        let mut cfg = base_cfg();
        cfg.cuts[0].rebin_start = 2;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn result_axis_needs_exactly_one_variant() {
        let mut cfg = base_cfg();
        cfg.result.axes[0].ranges = Some(vec![NamedRange {
            name: "sig".into(),
            min: Some(0.0),
            max: Some(1.0),
        }]);
        assert!(matches!(cfg.validate(), Err(Error::Schema(_))));
        cfg.result.axes[0].labels = None;
        cfg.validate().unwrap();
        cfg.result.axes[0].ranges = None;
        assert!(matches!(cfg.validate(), Err(Error::Schema(_))));
    }

    #[test]
    fn single_mode_requires_ranges() {
        let mut cfg = base_cfg();
        cfg.process.mode = ProcessMode::Single;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
        cfg.process.ranges = Some(vec![[2, 2]]);
        cfg.validate().unwrap();
    }

    #[test]
    fn ranges_must_match_enabled_cuts() {
        let mut cfg = base_cfg();
        cfg.process.ranges = Some(vec![[1, 2], [1, 2]]);
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn set_binning_revalidates() {
        let mut cfg = base_cfg();
        cfg.set_binning("pt", 5, 3).unwrap();
        assert_eq!(cfg.cuts[0].rebin, 5);
        assert!(cfg.set_binning("pt", 2, 3).is_err());
        assert!(cfg.set_binning("mass", 1, 1).is_err(), "unknown axis");
    }
}
