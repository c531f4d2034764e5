//! Re-sharding of a combined tensor into per-cell files.
//!
//! The complement of the merge step restricted to a chosen axis subset:
//! walk the projection axes' bin ranges, slice the combined tensor at each
//! point, and persist one reduced tensor per coordinate in the same
//! directory layout the sweep would have produced, plus a manifest ("map")
//! tensor enumerating the produced coordinates.

use std::path::PathBuf;
use std::sync::Mutex;

use cs_core::{Error, Result, Storage};
use cs_hist::SparseHist;

use crate::layout::OutputLayout;
use crate::nditer;

/// Counters and artifacts of one distribute run.
#[derive(Debug)]
pub struct DistributeReport {
    /// Per-coordinate files written.
    pub cells_written: usize,
    /// Where the manifest tensor landed.
    pub manifest_path: PathBuf,
}

/// Split `combined` along the axes at `projection` (indices into its axis
/// list), writing one reduced tensor per projection coordinate.
///
/// With `use_projection` the reduced tensor is the full projection onto the
/// orthogonal axes; otherwise the projection axes are kept as single-bin
/// markers. `num_threads > 1` slices from parallel workers, each on its own
/// clone of the combined tensor; the manifest is always filled sequentially
/// so its cell order is reproducible.
pub fn distribute(
    combined: &SparseHist,
    projection: &[usize],
    use_projection: bool,
    layout: &OutputLayout,
    storage: &dyn Storage,
    num_threads: usize,
) -> Result<DistributeReport> {
    if projection.is_empty() {
        return Err(Error::Config("distribute needs at least one projection axis".into()));
    }
    for &i in projection {
        if i >= combined.n_dims() {
            return Err(Error::Config(format!(
                "projection axis #{i} out of range for {}-dimensional tensor",
                combined.n_dims()
            )));
        }
    }
    let orthogonal: Vec<usize> =
        (0..combined.n_dims()).filter(|i| !projection.contains(i)).collect();
    if use_projection && orthogonal.is_empty() {
        return Err(Error::Config("projection covers every axis; nothing to slice".into()));
    }

    let mins = vec![1i64; projection.len()];
    let maxs: Vec<i64> = projection
        .iter()
        .map(|&i| combined.axis(i).n_bins() as i64)
        .collect();

    let slice_one = |point: &[i64]| -> Result<()> {
        let bins: Vec<u32> = point.iter().map(|b| *b as u32).collect();
        let mut view = combined.clone();
        for (&axis, &bin) in projection.iter().zip(&bins) {
            view.set_range(axis, bin, bin).map_err(cs_core::Error::from)?;
        }
        let reduced = if use_projection {
            view.project(&orthogonal).map_err(cs_core::Error::from)?
        } else {
            view.collapse_at(projection, &bins).map_err(cs_core::Error::from)?
        };
        let bytes = serde_json::to_vec_pretty(&reduced)?;
        storage.write_raw(&layout.cell_file(&bins), &bytes)?;
        Ok(())
    };

    let total: usize = maxs.iter().zip(&mins).map(|(hi, lo)| (hi - lo + 1) as usize).product();
    if num_threads > 1 {
        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        nditer::for_each_parallel(
            &mins,
            &maxs,
            |point| {
                if let Err(e) = slice_one(point) {
                    let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                    slot.get_or_insert(e);
                }
            },
            num_threads,
        )?;
        if let Some(e) = first_error.into_inner().unwrap_or_else(|p| p.into_inner()) {
            return Err(e);
        }
    } else {
        nditer::try_for_each(&mins, &maxs, slice_one)?;
    }

    // Manifest: one cell per produced coordinate, filled sequentially.
    let map_axes: Vec<_> = projection.iter().map(|&i| combined.axis(i).clone()).collect();
    let mut manifest = SparseHist::new("map", "distributed coordinates", map_axes)
        .map_err(cs_core::Error::from)?;
    nditer::try_for_each(&mins, &maxs, |point| {
        let bins: Vec<u32> = point.iter().map(|b| *b as u32).collect();
        manifest.set_bin(&bins, 1.0, 0.0).map_err(cs_core::Error::from)
    })?;
    let manifest_path = layout.base_path().join("map.json");
    storage.write_raw(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

    log::info!(
        "distributed {total} cells over axes {projection:?} under {}",
        layout.bins_root().display()
    );
    Ok(DistributeReport { cells_written: total, manifest_path })
}
