//! The Cartesian sweep engine.
//!
//! Two nested traversals: an outer walk over every combination of grouped
//! bins of the enabled cuts, and, at each cut coordinate, an inner walk over
//! the process and result axes. Each inner leaf is one *cell*, delegated to
//! the external [`CellCallback`]. The engine owns the result tensor and the
//! currently open output file; it is single-threaded and not reentrant (it
//! mutates the active ranges of the input histograms), so the parallel
//! iterator variant must never drive it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cs_core::{AxisKind, Coordinate, Error, Result, Storage};
use cs_hist::{Axis, SparseHist};

use crate::config::{ProcessMode, SweepConfig};
use crate::layout::OutputLayout;
use crate::nditer;
use crate::rebin;
use crate::result::{PersistedResult, ResultTensor};

/// Verdict of the cell callback for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOutcome {
    /// Cell processed; artifacts are persisted and the sweep continues.
    Accepted,
    /// Too little data to process; artifacts are dropped, sweep continues.
    SkippedLowData,
    /// Terminate the entire sweep immediately.
    Fatal,
}

/// Named artifact blobs produced by the callback for one cell.
///
/// Cleared by the engine between cells; on [`CellOutcome::Accepted`] each
/// blob is persisted under the cell's leaf directory.
#[derive(Debug, Default)]
pub struct ArtifactSink {
    blobs: Vec<(String, Vec<u8>)>,
}

impl ArtifactSink {
    /// Queue one named artifact.
    pub fn push(&mut self, name: &str, bytes: Vec<u8>) {
        self.blobs.push((name.to_string(), bytes));
    }

    /// Number of queued artifacts.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True if no artifacts are queued.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn clear(&mut self) {
        self.blobs.clear();
    }

    fn drain(&mut self) -> Vec<(String, Vec<u8>)> {
        std::mem::take(&mut self.blobs)
    }
}

/// The external per-cell computation.
///
/// `inputs` arrive already range-restricted to the current cut coordinate.
/// Scalar metrics go through [`ResultTensor::write`]; serialized objects go
/// into the [`ArtifactSink`].
pub trait CellCallback {
    /// Process one cell.
    fn process_cell(
        &mut self,
        coord: &Coordinate,
        inputs: &[SparseHist],
        result: &mut ResultTensor,
        artifacts: &mut ArtifactSink,
    ) -> CellOutcome;
}

/// Counters of one finished sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Cells the inner traversal reached.
    pub cells_visited: usize,
    /// Cells the callback accepted.
    pub cells_accepted: usize,
    /// Cells skipped for low data.
    pub cells_skipped: usize,
    /// Scalar writes refused by the write guard.
    pub writes_rejected: usize,
    /// Base output files written.
    pub files_written: usize,
}

/// Resolved sweep extent of one enabled cut.
struct CutPlan {
    axis: String,
    rebin: u32,
    rebin_start: u32,
    nbins: u32,
    natural_end: u32,
    sweep_lo: u32,
    sweep_hi: u32,
}

/// The sweep driver. Owns the result tensor for the duration of one run;
/// construct once per configuration.
pub struct SweepEngine<'a> {
    cfg: &'a SweepConfig,
    storage: &'a dyn Storage,
    layout: OutputLayout,
    cancel: Arc<AtomicBool>,
    schema: Option<ResultTensor>,
    base_title: Option<String>,
}

impl<'a> SweepEngine<'a> {
    /// Bind a validated configuration to a storage backend.
    pub fn new(cfg: &'a SweepConfig, storage: &'a dyn Storage) -> Self {
        Self {
            cfg,
            storage,
            layout: OutputLayout::from_config(cfg),
            cancel: Arc::new(AtomicBool::new(false)),
            schema: None,
            base_title: None,
        }
    }

    /// Cooperative cancellation flag, checked before each cell.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The layout this engine writes through.
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Run the full sweep over `inputs`, driving `callback` once per cell.
    ///
    /// Cut coordinates are visited in deterministic row-major order (last
    /// configured cut fastest). Input active ranges are mutated during the
    /// run and reset on normal completion.
    pub fn run(
        &mut self,
        inputs: &mut [SparseHist],
        callback: &mut dyn CellCallback,
    ) -> Result<SweepReport> {
        if inputs.is_empty() {
            return Err(Error::Config("sweep needs at least one input".into()));
        }
        let plans = self.resolve_plans(inputs)?;
        log::info!(
            "sweep start: {} enabled cuts, {} inputs, output {}",
            plans.len(),
            inputs.len(),
            self.layout.base_path().display()
        );

        let mut report = SweepReport::default();
        let mut windows = Vec::with_capacity(plans.len());
        let outcome =
            self.sweep_cuts(0, &plans, &mut windows, inputs, callback, &mut report);
        for input in inputs.iter_mut() {
            input.reset_ranges();
        }
        outcome?;

        log::info!(
            "sweep finished: {} cells visited, {} accepted, {} skipped, {} writes rejected, {} files",
            report.cells_visited,
            report.cells_accepted,
            report.cells_skipped,
            report.writes_rejected,
            report.files_written
        );
        Ok(report)
    }

    /// Resolve each enabled cut against the first input and the optional
    /// process-range overrides. Unknown axes and invalid overrides are fatal.
    fn resolve_plans(&self, inputs: &[SparseHist]) -> Result<Vec<CutPlan>> {
        let mut plans = Vec::new();
        for (pos, cut) in self.cfg.enabled_cuts().enumerate() {
            for input in inputs {
                input
                    .axis_index(&cut.axis)
                    .map_err(|_| {
                        Error::Config(format!(
                            "cut axis '{}' not found on input '{}'",
                            cut.axis,
                            input.name()
                        ))
                    })?;
            }
            let idx = inputs[0].axis_index(&cut.axis).map_err(cs_core::Error::from)?;
            let nbins = inputs[0].axis(idx).n_bins();
            let (start, end) = rebin::group_range(nbins, cut.rebin, cut.rebin_start);

            let (mut lo, mut hi) = (start, end);
            if let Some(ranges) = &self.cfg.process.ranges {
                let [rlo, rhi] = ranges[pos];
                if rlo < start || rhi > end || rlo > rhi {
                    return Err(Error::RangeOutOfBounds {
                        axis: cut.axis.clone(),
                        lo: rlo,
                        hi: rhi,
                        start,
                        end,
                    });
                }
                lo = rlo;
                hi = rhi;
                if self.cfg.process.mode == ProcessMode::Single {
                    hi = lo;
                }
            }
            plans.push(CutPlan {
                axis: cut.axis.clone(),
                rebin: cut.rebin,
                rebin_start: cut.rebin_start,
                nbins,
                natural_end: end,
                sweep_lo: lo,
                sweep_hi: hi,
            });
        }
        Ok(plans)
    }

    /// Outer recursion over cut axes, depth-first in configuration order.
    fn sweep_cuts(
        &mut self,
        depth: usize,
        plans: &[CutPlan],
        windows: &mut Vec<(String, u32, u32, u32)>,
        inputs: &mut [SparseHist],
        callback: &mut dyn CellCallback,
        report: &mut SweepReport,
    ) -> Result<()> {
        if depth == plans.len() {
            return self.process_single_point(plans, windows, inputs, callback, report);
        }
        let plan = &plans[depth];
        for grouped in plan.sweep_lo..=plan.sweep_hi {
            let (base_min, base_max) =
                rebin::base_range(grouped, plan.rebin, plan.rebin_start, plan.nbins)?;
            windows.push((plan.axis.clone(), grouped, base_min, base_max));
            self.sweep_cuts(depth + 1, plans, windows, inputs, callback, report)?;
            windows.pop();
        }
        Ok(())
    }

    /// One full cut coordinate: restrict inputs, refresh the tensor, walk
    /// the inner (process + result) axes, and persist the base output file.
    fn process_single_point(
        &mut self,
        plans: &[CutPlan],
        windows: &[(String, u32, u32, u32)],
        inputs: &mut [SparseHist],
        callback: &mut dyn CellCallback,
        report: &mut SweepReport,
    ) -> Result<()> {
        // (1) Apply every window to every input; a missing axis is fatal.
        for input in inputs.iter_mut() {
            for (axis, _, lo, hi) in windows {
                input
                    .set_range_by_name(axis, *lo, *hi)
                    .map_err(|e| Error::Config(e.to_string()))?;
            }
        }
        let base_title = self
            .base_title
            .get_or_insert_with(|| inputs[0].title().to_string())
            .clone();
        let postfix: String = windows
            .iter()
            .map(|(axis, _, lo, hi)| format!(" {axis}:{lo}-{hi}"))
            .collect();
        inputs[0].set_title(&format!("{base_title}{postfix}"));
        log::debug!("processing cut point{postfix}");

        // (2) Build or reuse the result-tensor schema.
        if self.schema.is_none() {
            self.schema = Some(self.build_schema(plans)?);
        }
        let mut tensor = match &self.schema {
            Some(schema) => schema.fresh_copy(),
            None => return Err(Error::Schema("result schema not built".into())),
        };
        tensor.set_cut_width_product(cut_width_product(&inputs[0], windows));

        // (3) Inner traversal over process and result axes.
        let cut_bins: Vec<u32> = windows.iter().map(|(_, g, _, _)| *g).collect();
        let mut template = Coordinate::new(tensor.kinds().to_vec());
        let n_process = self.cfg.process.axes.len();
        for (i, bin) in cut_bins.iter().enumerate() {
            template.set(1 + n_process + i, *bin);
        }

        let mut extents: Vec<i64> = self
            .cfg
            .process
            .axes
            .iter()
            .map(|a| a.labels.len() as i64)
            .collect();
        for axis in &self.cfg.result.axes {
            extents.push(axis.bin_labels()?.len() as i64);
        }
        let inner_base = 1 + n_process + cut_bins.len();

        let layout = self.layout.clone();
        let storage = self.storage;
        let cancel = Arc::clone(&self.cancel);
        let mut artifacts = ArtifactSink::default();
        let mut any_accepted = false;

        let mut leaf = |inner: &[i64],
                        tensor: &mut ResultTensor,
                        report: &mut SweepReport|
         -> Result<()> {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let mut coord = template.clone();
            for (slot, bin) in inner.iter().enumerate() {
                let i = if slot < n_process { 1 + slot } else { inner_base + slot - n_process };
                coord.set(i, *bin as u32);
            }
            report.cells_visited += 1;
            artifacts.clear();
            match callback.process_cell(&coord, inputs, tensor, &mut artifacts) {
                CellOutcome::Accepted => {
                    let inner_bins: Vec<u32> = inner.iter().map(|b| *b as u32).collect();
                    let leaf_dir = layout.leaf_dir(&cut_bins, &inner_bins);
                    for (name, bytes) in artifacts.drain() {
                        storage.write_raw(&leaf_dir.join(name), &bytes)?;
                    }
                    report.cells_accepted += 1;
                    any_accepted = true;
                    Ok(())
                }
                CellOutcome::SkippedLowData => {
                    log::info!("cell skipped (low data) at {coord}");
                    report.cells_skipped += 1;
                    Ok(())
                }
                CellOutcome::Fatal => Err(Error::CellFatal(coord.to_string())),
            }
        };

        if extents.is_empty() {
            leaf(&[], &mut tensor, report)?;
        } else {
            let mins = vec![1i64; extents.len()];
            nditer::try_for_each(&mins, &extents, |p| leaf(p, &mut tensor, report))?;
        }
        drop(leaf);

        // (4) Close the base output file for this cut coordinate.
        report.writes_rejected += tensor.rejected_count();
        if any_accepted {
            let persisted = PersistedResult::from_tensor(&tensor);
            let bytes = serde_json::to_vec_pretty(&persisted)?;
            self.storage.write_raw(&self.layout.cell_file(&cut_bins), &bytes)?;
            report.files_written += 1;
        }
        Ok(())
    }

    /// Result-tensor schema: parameter axis, process axes, one axis per
    /// enabled cut spanning its full natural grouped range, result axes.
    fn build_schema(&self, plans: &[CutPlan]) -> Result<ResultTensor> {
        let param_labels = self.cfg.result.parameters.labels.clone();
        let mut axes =
            vec![Axis::labels("parameter", "parameter", param_labels.clone())];
        let mut kinds = vec![AxisKind::Parameter];

        for paxis in &self.cfg.process.axes {
            axes.push(Axis::labels(&paxis.name, &paxis.name, paxis.labels.clone()));
            kinds.push(AxisKind::ExternalData);
        }
        for plan in plans {
            axes.push(Axis::uniform(
                &plan.axis,
                &plan.axis,
                plan.natural_end,
                0.5,
                plan.natural_end as f64 + 0.5,
            ));
            kinds.push(AxisKind::Projection);
        }
        for raxis in &self.cfg.result.axes {
            axes.push(Axis::labels(&raxis.name, &raxis.name, raxis.bin_labels()?));
            kinds.push(if raxis.is_label_driven() {
                AxisKind::ResultIn
            } else {
                AxisKind::ResultOut
            });
        }

        let hist = SparseHist::new("results", "sweep results", axes)
            .map_err(cs_core::Error::from)?;
        ResultTensor::new(hist, kinds, param_labels)
    }
}

/// Product of the cut windows' widths on the first input, in axis units.
/// Categorical axes contribute nothing.
fn cut_width_product(input: &SparseHist, windows: &[(String, u32, u32, u32)]) -> f64 {
    let mut product = 1.0;
    for (axis_name, _, lo, hi) in windows {
        let Ok(idx) = input.axis_index(axis_name) else { continue };
        let axis = input.axis(idx);
        if axis.is_categorical() {
            continue;
        }
        let width: f64 = (*lo..=*hi).map(|b| axis.bin_width(b)).sum();
        product *= width;
    }
    product
}
