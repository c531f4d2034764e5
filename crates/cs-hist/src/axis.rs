//! Histogram axis: name, title, and binning.

use serde::{Deserialize, Serialize};

/// Binning of one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Binning {
    /// `n` equal-width bins over `[min, max)`.
    Uniform {
        /// Number of bins.
        n: u32,
        /// Lower edge of the first bin.
        min: f64,
        /// Upper edge of the last bin.
        max: f64,
    },
    /// Variable-width bins; `edges` has length `n_bins + 1`, sorted.
    Variable {
        /// Bin edges.
        edges: Vec<f64>,
    },
    /// Categorical axis with one string label per bin.
    Labels {
        /// Bin labels, in bin order.
        labels: Vec<String>,
    },
}

/// An immutable axis of a sparse histogram. Bin indices are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis name (unique within a histogram).
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Binning.
    pub binning: Binning,
}

impl Axis {
    /// Uniformly binned numeric axis.
    pub fn uniform(name: &str, title: &str, n: u32, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            binning: Binning::Uniform { n, min, max },
        }
    }

    /// Variable-width numeric axis from sorted edges.
    pub fn variable(name: &str, title: &str, edges: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            binning: Binning::Variable { edges },
        }
    }

    /// Categorical axis with one bin per label.
    pub fn labels(name: &str, title: &str, labels: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            binning: Binning::Labels { labels },
        }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> u32 {
        match &self.binning {
            Binning::Uniform { n, .. } => *n,
            Binning::Variable { edges } => (edges.len().saturating_sub(1)) as u32,
            Binning::Labels { labels } => labels.len() as u32,
        }
    }

    /// True for label-binned axes.
    pub fn is_categorical(&self) -> bool {
        matches!(self.binning, Binning::Labels { .. })
    }

    /// Width of `bin` (1-based). Categorical bins have unit width.
    pub fn bin_width(&self, bin: u32) -> f64 {
        match &self.binning {
            Binning::Uniform { n, min, max } => {
                if *n == 0 {
                    0.0
                } else {
                    (max - min) / *n as f64
                }
            }
            Binning::Variable { edges } => {
                let i = bin as usize;
                if i >= 1 && i < edges.len() {
                    edges[i] - edges[i - 1]
                } else {
                    0.0
                }
            }
            Binning::Labels { .. } => {
                let _ = bin;
                1.0
            }
        }
    }

    /// Lower edge of `bin` (1-based); `None` for categorical axes.
    pub fn bin_lower(&self, bin: u32) -> Option<f64> {
        match &self.binning {
            Binning::Uniform { n, min, max } => {
                if bin >= 1 && bin <= *n {
                    Some(min + (max - min) * (bin - 1) as f64 / *n as f64)
                } else {
                    None
                }
            }
            Binning::Variable { edges } => edges.get(bin as usize - 1).copied(),
            Binning::Labels { .. } => None,
        }
    }

    /// Bin containing `x` (1-based); `None` outside the axis or categorical.
    pub fn find_bin(&self, x: f64) -> Option<u32> {
        match &self.binning {
            Binning::Uniform { n, min, max } => {
                if x < *min || x >= *max || *n == 0 {
                    None
                } else {
                    Some(((x - min) / (max - min) * *n as f64) as u32 + 1)
                }
            }
            Binning::Variable { edges } => {
                if edges.len() < 2 || x < edges[0] || x >= *edges.last().unwrap() {
                    return None;
                }
                let i = edges.partition_point(|e| *e <= x);
                Some(i as u32)
            }
            Binning::Labels { .. } => None,
        }
    }

    /// Bin of the given label (1-based); `None` on numeric axes or misses.
    pub fn label_bin(&self, label: &str) -> Option<u32> {
        match &self.binning {
            Binning::Labels { labels } => {
                labels.iter().position(|l| l == label).map(|i| i as u32 + 1)
            }
            _ => None,
        }
    }

    /// Label of `bin` (1-based) on a categorical axis.
    pub fn bin_label(&self, bin: u32) -> Option<&str> {
        match &self.binning {
            Binning::Labels { labels } => labels.get(bin as usize - 1).map(|s| s.as_str()),
            _ => None,
        }
    }
}
