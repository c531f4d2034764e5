//! Merge and distribute scenarios over a temporary output tree.

use cs_core::{AxisKind, Error, LocalStorage, Storage};
use cs_hist::{Axis, SparseHist};
use cs_sweep::result::PersistedResult;
use cs_sweep::{distribute, merge, OutputLayout, SweepConfig};

fn config(dir: &std::path::Path) -> SweepConfig {
    let cfg: SweepConfig = serde_json::from_value(serde_json::json!({
        "cuts": [{"axis": "pt", "rebin": 2, "rebin_start": 1}],
        "result": {"parameters": {"labels": ["Integral"]}},
        "environment": "test",
        "output": {"dir": dir.to_str().unwrap(), "file": "result.json"}
    }))
    .unwrap();
    cfg.validate().unwrap();
    cfg
}

fn result_schema() -> SparseHist {
    SparseHist::new(
        "results",
        "",
        vec![
            Axis::labels("parameter", "", vec!["Integral".into()]),
            Axis::uniform("pt", "", 5, 0.5, 5.5),
        ],
    )
    .unwrap()
}

/// Write one per-cell file at grouped bin `g` whose Integral is `value`.
fn write_cell(layout: &OutputLayout, g: u32, value: f64) {
    let mut tensor = result_schema();
    tensor.set_bin(&[1, g], value, value.sqrt()).unwrap();
    let persisted = PersistedResult {
        tensor,
        map_axes_type: vec![AxisKind::Parameter, AxisKind::Projection],
    };
    LocalStorage
        .write_raw(
            &layout.cell_file(&[g]),
            &serde_json::to_vec_pretty(&persisted).unwrap(),
        )
        .unwrap();
}

#[test]
fn scenario_c_merge_sums_per_cell_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let layout = OutputLayout::from_config(&cfg);
    for (g, value) in [(1, 1.0), (2, 2.0), (3, 3.0)] {
        write_cell(&layout, g, value);
    }

    let merged_path = merge(&LocalStorage, &layout).unwrap();
    assert_eq!(merged_path, layout.merged_file());
    let first: PersistedResult =
        serde_json::from_slice(&std::fs::read(&merged_path).unwrap()).unwrap();
    assert_eq!(first.tensor.get_bin(&[1, 1]).unwrap().0, 1.0);
    assert_eq!(first.tensor.get_bin(&[1, 2]).unwrap().0, 2.0);
    assert_eq!(first.tensor.get_bin(&[1, 3]).unwrap().0, 3.0);
    let (total, _) = first.tensor.integral();
    assert!((total - 6.0).abs() < 1e-12, "additive combination");
    assert_eq!(first.map_axes_type, vec![AxisKind::Parameter, AxisKind::Projection]);

    // Merging again without clearing the destination folds the old result
    // in: documented non-idempotence.
    merge(&LocalStorage, &layout).unwrap();
    let second: PersistedResult =
        serde_json::from_slice(&std::fs::read(&merged_path).unwrap()).unwrap();
    assert!((second.tensor.integral().0 - 12.0).abs() < 1e-12);
}

#[test]
fn merge_with_empty_tree_reports_nothing_to_merge() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let layout = OutputLayout::from_config(&cfg);
    let err = merge(&LocalStorage, &layout).unwrap_err();
    assert!(matches!(err, Error::NothingToMerge(_)), "{err}");
    assert!(!layout.merged_file().exists(), "no partial output");
}

/// A 3-axis combined tensor: 2 x 2 x 3, every cell filled with 1.0.
fn combined() -> SparseHist {
    let mut h = SparseHist::new(
        "combined",
        "",
        vec![
            Axis::uniform("a", "", 2, 0.0, 2.0),
            Axis::uniform("b", "", 2, 0.0, 2.0),
            Axis::uniform("c", "", 3, 0.0, 3.0),
        ],
    )
    .unwrap();
    for i in 1..=2 {
        for j in 1..=2 {
            for k in 1..=3 {
                h.set_bin(&[i, j, k], 1.0, 1.0).unwrap();
            }
        }
    }
    h
}

#[test]
fn scenario_d_distribute_shards_along_one_axis() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let layout = OutputLayout::from_config(&cfg);

    let report = distribute(&combined(), &[2], true, &layout, &LocalStorage, 1).unwrap();
    assert_eq!(report.cells_written, 3);

    for k in 1..=3u32 {
        let bytes = std::fs::read(layout.cell_file(&[k])).unwrap();
        let slice: SparseHist = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(slice.n_dims(), 2, "projected onto the orthogonal axes");
        assert!((slice.integral().0 - 4.0).abs() < 1e-12, "2x2 plane at c={k}");
    }

    let manifest: SparseHist =
        serde_json::from_slice(&std::fs::read(&report.manifest_path).unwrap()).unwrap();
    assert_eq!(manifest.n_dims(), 1);
    assert_eq!(manifest.n_filled(), 3, "one manifest entry per coordinate");
    for k in 1..=3u32 {
        assert_eq!(manifest.get_bin(&[k]).unwrap().0, 1.0);
    }
}

#[test]
fn distribute_without_projection_keeps_marker_axes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let layout = OutputLayout::from_config(&cfg);

    distribute(&combined(), &[2], false, &layout, &LocalStorage, 1).unwrap();
    let bytes = std::fs::read(layout.cell_file(&[2])).unwrap();
    let slice: SparseHist = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(slice.n_dims(), 3, "all axes kept");
    assert_eq!(slice.axis(2).n_bins(), 1, "projection axis collapsed to a marker");
    assert_eq!(slice.get_bin(&[1, 2, 1]).unwrap().0, 1.0);
}

#[test]
fn distribute_parallel_matches_sequential() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let seq_layout = OutputLayout::from_config(&config(seq_dir.path()));
    let par_layout = OutputLayout::from_config(&config(par_dir.path()));

    distribute(&combined(), &[0, 2], true, &seq_layout, &LocalStorage, 1).unwrap();
    distribute(&combined(), &[0, 2], true, &par_layout, &LocalStorage, 4).unwrap();

    for i in 1..=2u32 {
        for k in 1..=3u32 {
            let a = std::fs::read(seq_layout.cell_file(&[i, k])).unwrap();
            let b = std::fs::read(par_layout.cell_file(&[i, k])).unwrap();
            assert_eq!(a, b, "cell {i}/{k} identical across variants");
        }
    }
}

#[test]
fn distribute_rejects_bad_projection_axes() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::from_config(&config(dir.path()));
    assert!(matches!(
        distribute(&combined(), &[], true, &layout, &LocalStorage, 1),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        distribute(&combined(), &[7], true, &layout, &LocalStorage, 1),
        Err(Error::Config(_))
    ));
    assert!(matches!(
        distribute(&combined(), &[0, 1, 2], true, &layout, &LocalStorage, 1),
        Err(Error::Config(_))
    ));
}
