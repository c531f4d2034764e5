//! Rebin addressing: pure arithmetic between base and grouped bin indices.
//!
//! A cut axis with `n` base bins is swept at the granularity of *grouped*
//! bins: `rebin` consecutive base bins per group, the first group anchored at
//! `rebin_start`. All indices are 1-based.

use cs_core::{Error, Result};

/// Base-bin window `[min, max]` covered by grouped bin `bin`.
///
/// `min = rebin * (bin - 1) + rebin_start`, `max = min + rebin - 1`. Fails
/// when the window leaves `[1, axis_nbins]`.
pub fn base_range(bin: u32, rebin: u32, rebin_start: u32, axis_nbins: u32) -> Result<(u32, u32)> {
    let min = rebin as i64 * (bin as i64 - 1) + rebin_start as i64;
    let max = min + rebin as i64 - 1;
    if min < 1 || max > axis_nbins as i64 {
        return Err(Error::OutOfRange { bin, min, max, nbins: axis_nbins });
    }
    Ok((min as u32, max as u32))
}

/// Grouped bin containing base bin `bin`.
///
/// Identity when `rebin == 1`, otherwise `bin / rebin + 1` with truncating
/// integer division. The truncation does not universally invert
/// [`base_range`] when `rebin_start > 1`; that asymmetry is long-standing
/// documented behavior and is kept as-is.
pub fn grouped_from_base(bin: u32, rebin: u32) -> u32 {
    if rebin == 1 {
        bin
    } else {
        bin / rebin + 1
    }
}

/// First group's shrink offset: `rebin_start mod rebin`, or 1 if that is 0.
pub fn rebin_minimum(rebin: u32, rebin_start: u32) -> u32 {
    match rebin_start % rebin {
        0 => 1,
        m => m,
    }
}

/// Inclusive `[start, end]` of addressable grouped bins on an axis with
/// `axis_nbins` base bins.
pub fn group_range(axis_nbins: u32, rebin: u32, rebin_start: u32) -> (u32, u32) {
    if rebin_start > 1 {
        let start = rebin_start / rebin + 1;
        let end = (axis_nbins - rebin_minimum(rebin, rebin_start) + 1) / rebin;
        (start, end)
    } else if rebin == 1 {
        (1, axis_nbins)
    } else {
        (1, axis_nbins / rebin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_unrebinned() {
        for b in 1..=10 {
            assert_eq!(grouped_from_base(b, 1), b);
            assert_eq!(base_range(b, 1, 1, 10).unwrap(), (b, b));
        }
        assert_eq!(group_range(10, 1, 1), (1, 10));
    }

    #[test]
    fn pairs_of_two() {
        assert_eq!(group_range(10, 2, 1), (1, 5));
        assert_eq!(base_range(1, 2, 1, 10).unwrap(), (1, 2));
        assert_eq!(base_range(5, 2, 1, 10).unwrap(), (9, 10));
        assert!(base_range(6, 2, 1, 10).is_err());
    }

    #[test]
    fn window_stays_within_axis() {
        for rebin in 1..=4u32 {
            for rebin_start in 1..=rebin.max(2) - 1 {
                let (start, end) = group_range(12, rebin, rebin_start);
                for g in start..=end {
                    let (lo, hi) = base_range(g, rebin, rebin_start, 12).unwrap();
                    assert!(lo >= 1 && lo <= hi && hi <= 12, "g={g} rebin={rebin}");
                }
            }
        }
    }

    #[test]
    fn roundtrip_with_unit_start() {
        for rebin in 1..=4u32 {
            let (start, end) = group_range(12, rebin, 1);
            for g in start..=end {
                let (lo, _) = base_range(g, rebin, 1, 12).unwrap();
                assert_eq!(grouped_from_base(lo, rebin), g);
            }
        }
    }

    #[test]
    fn offset_start_shrinks_first_group() {
        // rebin=3, rebin_start=2 on 10 base bins: groups cover [2,4], [5,7], [8,10]
        assert_eq!(rebin_minimum(3, 2), 2);
        assert_eq!(group_range(10, 3, 2), (1, 3));
        assert_eq!(base_range(1, 3, 2, 10).unwrap(), (2, 4));
        assert_eq!(base_range(3, 3, 2, 10).unwrap(), (8, 10));
    }

    #[test]
    fn rebin_minimum_wraps_to_one() {
        assert_eq!(rebin_minimum(1, 1), 1);
        assert_eq!(rebin_minimum(2, 1), 1);
        assert_eq!(rebin_minimum(4, 3), 3);
    }

    #[test]
    fn out_of_range_reports_window() {
        let err = base_range(7, 2, 1, 10).unwrap_err();
        match err {
            cs_core::Error::OutOfRange { bin, min, max, nbins } => {
                assert_eq!((bin, min, max, nbins), (7, 13, 14, 10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
