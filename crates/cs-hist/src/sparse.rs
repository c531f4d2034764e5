//! Sparse N-dimensional histogram with per-axis active ranges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::{HistError, Result};

/// One filled cell: sum of weights and sum of squared errors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Cell {
    value: f64,
    error2: f64,
}

/// Sparse N-dimensional histogram.
///
/// Bins are 1-based per axis. Only filled cells are stored; cell order is
/// deterministic (sorted by coordinate), so serialization is reproducible.
/// Each axis carries an active range `[lo, hi]` (inclusive, 1-based) that
/// projection and integration respect; ranges are transient state and are
/// not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HistRecord", into = "HistRecord")]
pub struct SparseHist {
    name: String,
    title: String,
    axes: Vec<Axis>,
    cells: BTreeMap<Vec<u32>, Cell>,
    ranges: Vec<(u32, u32)>,
}

/// Serialized form: axes plus a flat cell list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistRecord {
    name: String,
    title: String,
    axes: Vec<Axis>,
    cells: Vec<CellRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellRecord {
    bins: Vec<u32>,
    value: f64,
    error: f64,
}

impl From<HistRecord> for SparseHist {
    fn from(r: HistRecord) -> Self {
        let ranges = r.axes.iter().map(|a| (1, a.n_bins())).collect();
        let mut cells = BTreeMap::new();
        for c in r.cells {
            cells.insert(c.bins, Cell { value: c.value, error2: c.error * c.error });
        }
        Self { name: r.name, title: r.title, axes: r.axes, cells, ranges }
    }
}

impl From<SparseHist> for HistRecord {
    fn from(h: SparseHist) -> Self {
        let cells = h
            .cells
            .into_iter()
            .map(|(bins, c)| CellRecord { bins, value: c.value, error: c.error2.sqrt() })
            .collect();
        Self { name: h.name, title: h.title, axes: h.axes, cells }
    }
}

impl SparseHist {
    /// Create an empty histogram with full active ranges.
    pub fn new(name: &str, title: &str, axes: Vec<Axis>) -> Result<Self> {
        if axes.is_empty() {
            return Err(HistError::EmptyAxes(name.to_string()));
        }
        let ranges = axes.iter().map(|a| (1, a.n_bins())).collect();
        Ok(Self {
            name: name.to_string(),
            title: title.to_string(),
            axes,
            cells: BTreeMap::new(),
            ranges,
        })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the title (the sweep engine appends cut postfixes).
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Number of axes.
    pub fn n_dims(&self) -> usize {
        self.axes.len()
    }

    /// All axes in order.
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Axis `i`.
    pub fn axis(&self, i: usize) -> &Axis {
        &self.axes[i]
    }

    /// Index of the axis named `name`.
    pub fn axis_index(&self, name: &str) -> Result<usize> {
        self.axes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| HistError::UnknownAxis(name.to_string()))
    }

    /// Number of filled cells.
    pub fn n_filled(&self) -> usize {
        self.cells.len()
    }

    fn check_coord(&self, bins: &[u32]) -> Result<()> {
        if bins.len() != self.axes.len() {
            return Err(HistError::DimensionMismatch {
                got: bins.len(),
                expected: self.axes.len(),
            });
        }
        for (axis, &bin) in self.axes.iter().zip(bins) {
            if bin < 1 || bin > axis.n_bins() {
                return Err(HistError::BinOutOfRange {
                    axis: axis.name.clone(),
                    bin,
                    nbins: axis.n_bins(),
                });
            }
        }
        Ok(())
    }

    /// Set one cell to `(value, error)`, replacing any previous content.
    pub fn set_bin(&mut self, bins: &[u32], value: f64, error: f64) -> Result<()> {
        self.check_coord(bins)?;
        self.cells
            .insert(bins.to_vec(), Cell { value, error2: error * error });
        Ok(())
    }

    /// Add `(value, error)` into one cell (errors combine in quadrature).
    pub fn add_bin_content(&mut self, bins: &[u32], value: f64, error: f64) -> Result<()> {
        self.check_coord(bins)?;
        let cell = self.cells.entry(bins.to_vec()).or_default();
        cell.value += value;
        cell.error2 += error * error;
        Ok(())
    }

    /// Content and error of one cell (0 for unfilled cells).
    pub fn get_bin(&self, bins: &[u32]) -> Result<(f64, f64)> {
        self.check_coord(bins)?;
        Ok(self
            .cells
            .get(bins)
            .map(|c| (c.value, c.error2.sqrt()))
            .unwrap_or((0.0, 0.0)))
    }

    /// Drop all filled cells, keeping axes and ranges.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Restrict the active range of axis `i` to `[lo, hi]` (inclusive).
    pub fn set_range(&mut self, i: usize, lo: u32, hi: u32) -> Result<()> {
        let axis = self
            .axes
            .get(i)
            .ok_or_else(|| HistError::UnknownAxis(format!("#{i}")))?;
        let nbins = axis.n_bins();
        if lo < 1 || hi > nbins || lo > hi {
            return Err(HistError::BinOutOfRange {
                axis: axis.name.clone(),
                bin: if lo < 1 { lo } else { hi },
                nbins,
            });
        }
        self.ranges[i] = (lo, hi);
        Ok(())
    }

    /// Restrict the active range of the axis named `name`.
    pub fn set_range_by_name(&mut self, name: &str, lo: u32, hi: u32) -> Result<()> {
        let i = self.axis_index(name)?;
        self.set_range(i, lo, hi)
    }

    /// Reset every axis to its full range.
    pub fn reset_ranges(&mut self) {
        for (i, axis) in self.axes.iter().enumerate() {
            self.ranges[i] = (1, axis.n_bins());
        }
    }

    /// Active range of axis `i` (inclusive, 1-based).
    pub fn range(&self, i: usize) -> (u32, u32) {
        self.ranges[i]
    }

    fn in_range(&self, bins: &[u32]) -> bool {
        bins.iter()
            .zip(&self.ranges)
            .all(|(b, (lo, hi))| *b >= *lo && *b <= *hi)
    }

    /// Sum of all in-range cell contents, with quadrature error.
    pub fn integral(&self) -> (f64, f64) {
        let mut value = 0.0;
        let mut error2 = 0.0;
        for (bins, cell) in &self.cells {
            if self.in_range(bins) {
                value += cell.value;
                error2 += cell.error2;
            }
        }
        (value, error2.sqrt())
    }

    /// Add every cell of `other` into `self`. Axes must match exactly;
    /// active ranges are ignored (the combination is total).
    pub fn add(&mut self, other: &SparseHist) -> Result<()> {
        if self.axes != other.axes {
            return Err(HistError::IncompatibleSchema(format!(
                "'{}' vs '{}'",
                self.name, other.name
            )));
        }
        for (bins, cell) in &other.cells {
            let mine = self.cells.entry(bins.clone()).or_default();
            mine.value += cell.value;
            mine.error2 += cell.error2;
        }
        Ok(())
    }

    /// Project onto the axes at `keep` (in the given order), summing the
    /// in-range cells over every other axis.
    pub fn project(&self, keep: &[usize]) -> Result<SparseHist> {
        for &i in keep {
            if i >= self.axes.len() {
                return Err(HistError::UnknownAxis(format!("#{i}")));
            }
        }
        let axes: Vec<Axis> = keep.iter().map(|&i| self.axes[i].clone()).collect();
        let mut out = SparseHist::new(&format!("{}_proj", self.name), &self.title, axes)?;
        for (bins, cell) in &self.cells {
            if !self.in_range(bins) {
                continue;
            }
            let coord: Vec<u32> = keep.iter().map(|&i| bins[i]).collect();
            let c = out.cells.entry(coord).or_default();
            c.value += cell.value;
            c.error2 += cell.error2;
        }
        Ok(out)
    }

    /// Collapse the axes at `at` to single-bin markers fixed at `bins`,
    /// keeping every other axis intact. The collapsed axes become one-bin
    /// categorical markers recording the source bin; only cells matching
    /// `bins` on the collapsed axes survive, with those slots set to 1.
    pub fn collapse_at(&self, at: &[usize], bins: &[u32]) -> Result<SparseHist> {
        if at.len() != bins.len() {
            return Err(HistError::DimensionMismatch { got: bins.len(), expected: at.len() });
        }
        for &i in at {
            if i >= self.axes.len() {
                return Err(HistError::UnknownAxis(format!("#{i}")));
            }
        }
        let mut axes = self.axes.clone();
        for (&i, &b) in at.iter().zip(bins) {
            let src = &self.axes[i];
            axes[i] = Axis::labels(&src.name, &src.title, vec![format!("bin{b}")]);
        }
        let mut out = SparseHist::new(&self.name, &self.title, axes)?;
        for (coord, cell) in &self.cells {
            let matches = at.iter().zip(bins).all(|(&i, &b)| coord[i] == b);
            if !matches {
                continue;
            }
            let mut new_coord = coord.clone();
            for &i in at {
                new_coord[i] = 1;
            }
            let c = out.cells.entry(new_coord).or_default();
            c.value += cell.value;
            c.error2 += cell.error2;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h2() -> SparseHist {
        let mut h = SparseHist::new(
            "h",
            "test",
            vec![
                Axis::uniform("x", "", 4, 0.0, 4.0),
                Axis::uniform("y", "", 3, 0.0, 3.0),
            ],
        )
        .unwrap();
        h.set_bin(&[1, 1], 2.0, 1.0).unwrap();
        h.set_bin(&[2, 2], 3.0, 1.0).unwrap();
        h.set_bin(&[4, 3], 5.0, 2.0).unwrap();
        h
    }

    #[test]
    fn set_get_and_bounds() {
        let mut h = h2();
        assert_eq!(h.get_bin(&[2, 2]).unwrap(), (3.0, 1.0));
        assert_eq!(h.get_bin(&[3, 3]).unwrap(), (0.0, 0.0));
        assert!(matches!(
            h.set_bin(&[5, 1], 1.0, 0.0),
            Err(HistError::BinOutOfRange { .. })
        ));
        assert!(matches!(
            h.get_bin(&[1]),
            Err(HistError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn ranges_gate_integral() {
        let mut h = h2();
        let (v, _) = h.integral();
        assert!((v - 10.0).abs() < 1e-12);
        h.set_range_by_name("x", 1, 2).unwrap();
        let (v, e) = h.integral();
        assert!((v - 5.0).abs() < 1e-12);
        assert!((e - 2.0_f64.sqrt()).abs() < 1e-12);
        h.reset_ranges();
        assert!((h.integral().0 - 10.0).abs() < 1e-12);
    }

    #[test]
    fn additive_combination() {
        let mut a = h2();
        let b = h2();
        a.add(&b).unwrap();
        assert_eq!(a.get_bin(&[2, 2]).unwrap().0, 6.0);
        let e = a.get_bin(&[1, 1]).unwrap().1;
        assert!((e - 2.0_f64.sqrt()).abs() < 1e-12, "errors combine in quadrature");

        let other = SparseHist::new("o", "", vec![Axis::uniform("x", "", 4, 0.0, 4.0)]).unwrap();
        assert!(matches!(a.add(&other), Err(HistError::IncompatibleSchema(_))));
    }

    #[test]
    fn projection_respects_ranges() {
        let mut h = h2();
        h.set_range_by_name("y", 1, 2).unwrap();
        let p = h.project(&[0]).unwrap();
        assert_eq!(p.n_dims(), 1);
        assert_eq!(p.get_bin(&[1]).unwrap().0, 2.0);
        assert_eq!(p.get_bin(&[2]).unwrap().0, 3.0);
        assert_eq!(p.get_bin(&[4]).unwrap().0, 0.0, "out-of-range y excluded");
    }

    #[test]
    fn collapse_keeps_other_axes() {
        let h = h2();
        let c = h.collapse_at(&[1], &[2]).unwrap();
        assert_eq!(c.n_dims(), 2);
        assert_eq!(c.axis(1).n_bins(), 1);
        assert!(c.axis(1).is_categorical());
        assert_eq!(c.get_bin(&[2, 1]).unwrap().0, 3.0);
        assert_eq!(c.n_filled(), 1);
    }

    #[test]
    fn json_roundtrip_resets_ranges() {
        let mut h = h2();
        h.set_range_by_name("x", 2, 3).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        let back: SparseHist = serde_json::from_str(&json).unwrap();
        assert_eq!(back.range(0), (1, 4), "ranges are transient");
        assert_eq!(back.get_bin(&[4, 3]).unwrap(), (5.0, 2.0));
        assert_eq!(back.axes(), h.axes());
    }
}
