//! Recombination of per-cell outputs into one file.
//!
//! Lists every base output file under the layout's `bins/` tree through the
//! storage collaborator, adds their tensors together (the combination is
//! associative and order-independent), and writes the aggregate next to the
//! tree. Merging is **not** idempotent: an existing merged file at the
//! destination is folded into the new result, so callers must delete the
//! previous output before a re-run.

use std::path::PathBuf;

use cs_core::{Error, Result, Storage};

use crate::layout::OutputLayout;
use crate::result::PersistedResult;

/// Merge every per-cell output under `layout.bins_root()` into
/// `layout.merged_file()`. Returns the merged path.
pub fn merge(storage: &dyn Storage, layout: &OutputLayout) -> Result<PathBuf> {
    let bins_root = layout.bins_root();
    let files = storage.list(&bins_root, layout.file_name())?;
    if files.is_empty() {
        return Err(Error::NothingToMerge(bins_root.display().to_string()));
    }
    log::info!("merging {} files under {}", files.len(), bins_root.display());

    // An existing destination is folded in rather than replaced.
    let destination = layout.merged_file();
    let mut merged: Option<PersistedResult> = match storage.read_raw(&destination) {
        Ok(bytes) => {
            log::warn!(
                "existing merged file at {} is folded into the new result",
                destination.display()
            );
            Some(serde_json::from_slice(&bytes)?)
        }
        Err(_) => None,
    };

    for file in &files {
        let bytes = storage.read_raw(file)?;
        let part: PersistedResult = serde_json::from_slice(&bytes)?;
        match &mut merged {
            None => merged = Some(part),
            Some(acc) => {
                acc.tensor.add(&part.tensor).map_err(cs_core::Error::from)?;
            }
        }
    }
    let merged = match merged {
        Some(m) => m,
        None => return Err(Error::NothingToMerge(bins_root.display().to_string())),
    };

    let bytes = serde_json::to_vec_pretty(&merged)?;
    if storage.is_remote() {
        // Stage locally, copy to the final location, drop the staging file.
        let staging = std::env::temp_dir().join(format!("cutscan-merge-{}", std::process::id()));
        std::fs::write(&staging, &bytes)?;
        let staged = std::fs::read(&staging)?;
        storage.write_raw(&destination, &staged)?;
        std::fs::remove_file(&staging)?;
    } else {
        storage.write_raw(&destination, &bytes)?;
    }
    log::info!("merged into {}", destination.display());
    Ok(destination)
}
