//! Deterministic output-path scheme.
//!
//! Every artifact of a run lands under
//! `dir / environment / <axis1>_<axis2>_…_ / <rebin1>-<min1>_<rebin2>-<min2>_…_ / bins / <g1> / <g2> / …`,
//! where only enabled cuts contribute segments, in configuration order, and
//! `<gi>` are grouped bin indices. The same arithmetic is used to write
//! per-cell artifacts and to locate them again for the merge step.

use std::path::PathBuf;

use crate::config::SweepConfig;

/// Path builder bound to one configuration.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    environment: String,
    cut_axes: Vec<String>,
    rebins: Vec<(u32, u32)>,
    file_name: String,
}

impl OutputLayout {
    /// Build the layout from a validated configuration.
    pub fn from_config(cfg: &SweepConfig) -> Self {
        let cut_axes = cfg.enabled_cuts().map(|c| c.axis.clone()).collect();
        let rebins = cfg
            .enabled_cuts()
            .map(|c| (c.rebin, c.rebin_minimum()))
            .collect();
        Self {
            root: cfg.output.dir.clone(),
            environment: cfg.environment.clone(),
            cut_axes,
            rebins,
            file_name: cfg.output.file.clone(),
        }
    }

    /// Output file name (per base cell, and of the merged file).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `dir/environment/<axes>_/<rebins>_`, shared by every cell of the run.
    pub fn base_path(&self) -> PathBuf {
        let axes_seg: String = self.cut_axes.iter().map(|a| format!("{a}_")).collect();
        let rebin_seg: String = self
            .rebins
            .iter()
            .map(|(rebin, min)| format!("{rebin}-{min}_"))
            .collect();
        self.root
            .join(&self.environment)
            .join(axes_seg)
            .join(rebin_seg)
    }

    /// Root of the per-cell tree: `base_path()/bins`.
    pub fn bins_root(&self) -> PathBuf {
        self.base_path().join("bins")
    }

    /// Directory of one cut coordinate: one segment per grouped bin.
    pub fn cell_dir(&self, grouped: &[u32]) -> PathBuf {
        let mut path = self.bins_root();
        for bin in grouped {
            path.push(bin.to_string());
        }
        path
    }

    /// Base output file of one cut coordinate.
    pub fn cell_file(&self, grouped: &[u32]) -> PathBuf {
        self.cell_dir(grouped).join(&self.file_name)
    }

    /// Leaf directory of one full cell: the cut coordinate's directory plus
    /// one numeric segment per result-axis bin.
    pub fn leaf_dir(&self, grouped: &[u32], result_bins: &[u32]) -> PathBuf {
        let mut path = self.cell_dir(grouped);
        for bin in result_bins {
            path.push(bin.to_string());
        }
        path
    }

    /// Destination of the merged file: `base_path()/<file>`.
    pub fn merged_file(&self) -> PathBuf {
        self.base_path().join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> OutputLayout {
        let cfg: SweepConfig = serde_json::from_value(serde_json::json!({
            "cuts": [
                {"axis": "pt", "rebin": 2, "rebin_start": 1},
                {"axis": "cent", "enabled": false},
                {"axis": "y", "rebin": 3, "rebin_start": 2}
            ],
            "result": {"parameters": {"labels": ["Integral"]}},
            "environment": "pp13TeV",
            "output": {"dir": "/data/sweeps", "file": "result.json"}
        }))
        .unwrap();
        cfg.validate().unwrap();
        OutputLayout::from_config(&cfg)
    }

    #[test]
    fn base_path_segments() {
        assert_eq!(
            layout().base_path(),
            PathBuf::from("/data/sweeps/pp13TeV/pt_y_/2-1_3-2_"),
            "disabled cuts contribute no segment"
        );
    }

    #[test]
    fn cell_and_leaf_paths() {
        let l = layout();
        assert_eq!(
            l.cell_file(&[4, 1]),
            PathBuf::from("/data/sweeps/pp13TeV/pt_y_/2-1_3-2_/bins/4/1/result.json")
        );
        assert_eq!(
            l.leaf_dir(&[4, 1], &[2]),
            PathBuf::from("/data/sweeps/pp13TeV/pt_y_/2-1_3-2_/bins/4/1/2")
        );
        assert_eq!(
            l.merged_file(),
            PathBuf::from("/data/sweeps/pp13TeV/pt_y_/2-1_3-2_/result.json")
        );
    }
}
