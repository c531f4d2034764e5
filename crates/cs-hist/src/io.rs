//! JSON persistence helpers for local histogram files.

use std::path::Path;

use cs_core::Result;

use crate::sparse::SparseHist;

/// Read a histogram from a JSON file.
pub fn read_hist(path: &Path) -> Result<SparseHist> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write a histogram to a JSON file, creating parent directories.
pub fn write_hist(path: &Path, hist: &SparseHist) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(hist)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
