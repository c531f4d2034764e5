//! Generic N-dimensional index-space iteration.
//!
//! Enumerates every integer point of the closed box `[min[i], max[i]]` in
//! row-major order (last axis fastest). The sequential variant is an
//! iterative odometer with no recursion-depth risk; the parallel variant
//! splits the linear index space into contiguous chunks across rayon
//! workers, decoding the N-dimensional point once per chunk and then
//! incrementing in place.

use rayon::prelude::*;

use cs_core::{Error, Result};

fn check_bounds(min: &[i64], max: &[i64]) -> Result<u64> {
    if min.len() != max.len() || min.is_empty() {
        return Err(Error::InvalidBounds(format!(
            "dimension mismatch: {} vs {}",
            min.len(),
            max.len()
        )));
    }
    let mut total: u64 = 1;
    for (i, (&lo, &hi)) in min.iter().zip(max).enumerate() {
        if lo > hi {
            return Err(Error::InvalidBounds(format!(
                "min[{i}] = {lo} > max[{i}] = {hi}"
            )));
        }
        let extent = (hi - lo + 1) as u64;
        total = total
            .checked_mul(extent)
            .ok_or_else(|| Error::InvalidBounds("index space overflows u64".into()))?;
    }
    Ok(total)
}

/// Decode linear index `idx` (row-major) into a point within the box.
fn decode(min: &[i64], max: &[i64], mut idx: u64) -> Vec<i64> {
    let mut point = vec![0; min.len()];
    for i in (0..min.len()).rev() {
        let extent = (max[i] - min[i] + 1) as u64;
        point[i] = min[i] + (idx % extent) as i64;
        idx /= extent;
    }
    point
}

/// Advance `point` to the next row-major position. Returns false on wrap.
fn increment(point: &mut [i64], min: &[i64], max: &[i64]) -> bool {
    for i in (0..point.len()).rev() {
        if point[i] < max[i] {
            point[i] += 1;
            return true;
        }
        point[i] = min[i];
    }
    false
}

/// Visit every point of the box once, in row-major order.
pub fn for_each<F>(min: &[i64], max: &[i64], mut f: F) -> Result<()>
where
    F: FnMut(&[i64]),
{
    try_for_each(min, max, |p| {
        f(p);
        Ok(())
    })
}

/// Fallible variant of [`for_each`]; the first error stops the walk.
pub fn try_for_each<F>(min: &[i64], max: &[i64], mut f: F) -> Result<()>
where
    F: FnMut(&[i64]) -> Result<()>,
{
    check_bounds(min, max)?;
    let mut point = min.to_vec();
    loop {
        f(&point)?;
        if !increment(&mut point, min, max) {
            return Ok(());
        }
    }
}

/// Visit every point of the box exactly once from parallel workers.
///
/// `f` must be safe to call concurrently; no cross-thread ordering is
/// guaranteed. `num_threads` controls the number of contiguous chunks the
/// linear index space is split into (the rayon global pool does the actual
/// scheduling); 0 or 1 chunks degrade to a single contiguous walk.
pub fn for_each_parallel<F>(min: &[i64], max: &[i64], f: F, num_threads: usize) -> Result<()>
where
    F: Fn(&[i64]) + Sync,
{
    let total = check_bounds(min, max)?;
    let chunks = num_threads.max(1) as u64;
    let chunk_len = total.div_ceil(chunks);
    (0..chunks)
        .into_par_iter()
        .for_each(|c| {
            let start = c * chunk_len;
            let end = (start + chunk_len).min(total);
            if start >= end {
                return;
            }
            let mut point = decode(min, max, start);
            for _ in start..end {
                f(&point);
                increment(&mut point, min, max);
            }
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn row_major_order() {
        let mut seen = Vec::new();
        for_each(&[1, 1], &[2, 3], |p| seen.push(p.to_vec())).unwrap();
        assert_eq!(
            seen,
            vec![
                vec![1, 1],
                vec![1, 2],
                vec![1, 3],
                vec![2, 1],
                vec![2, 2],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn parallel_visits_same_set() {
        let min = [0, -1, 3];
        let max = [2, 1, 5];
        let mut sequential = HashSet::new();
        for_each(&min, &max, |p| {
            sequential.insert(p.to_vec());
        })
        .unwrap();
        assert_eq!(sequential.len(), 27);

        for threads in [1, 2, 4, 7] {
            let parallel = Mutex::new(Vec::new());
            for_each_parallel(
                &min,
                &max,
                |p| parallel.lock().unwrap().push(p.to_vec()),
                threads,
            )
            .unwrap();
            let visited = parallel.into_inner().unwrap();
            assert_eq!(visited.len(), 27, "threads={threads}: every point once");
            let set: HashSet<_> = visited.into_iter().collect();
            assert_eq!(set, sequential, "threads={threads}");
        }
    }

    #[test]
    fn single_point_box() {
        let mut count = 0;
        for_each(&[4], &[4], |p| {
            assert_eq!(p, &[4]);
            count += 1;
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn invalid_bounds_rejected() {
        assert!(matches!(
            for_each(&[2], &[1], |_| {}),
            Err(Error::InvalidBounds(_))
        ));
        assert!(matches!(
            for_each(&[1, 1], &[2], |_| {}),
            Err(Error::InvalidBounds(_))
        ));
        assert!(matches!(
            for_each(&[], &[], |_| {}),
            Err(Error::InvalidBounds(_))
        ));
    }

    #[test]
    fn try_variant_stops_on_error() {
        let mut visited = 0;
        let res = try_for_each(&[1], &[5], |p| {
            visited += 1;
            if p[0] == 3 {
                Err(Error::Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(Error::Cancelled)));
        assert_eq!(visited, 3);
    }
}
