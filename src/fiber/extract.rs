use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::{FiberError, FiberResult};
use super::store::FiberStore;

/// Samples of one fiber, split per axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FiberCoords {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl FiberCoords {
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Samples of several fibers, each axis shaped `[fiber][sample]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FiberArrays {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
}

impl FiberArrays {
    /// Number of fiber rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn push(&mut self, fiber: FiberCoords) {
        self.x.push(fiber.x);
        self.y.push(fiber.y);
        self.z.push(fiber.z);
    }
}

impl FiberStore {
    /// Copies the samples of one fiber out of the store.
    pub fn fiber(&self, index: usize) -> FiberResult<FiberCoords> {
        let layout = self.check_fiber(index)?;
        let row = &self.coords[layout.row(index)];
        Ok(FiberCoords {
            x: row.iter().map(|p| p.x).collect(),
            y: row.iter().map(|p| p.y).collect(),
            z: row.iter().map(|p| p.z).collect(),
        })
    }

    /// Copies the fibers listed in `indices`, in that order, leaving out any
    /// index present in `exclude`. Excluded entries leave no gap rows.
    pub fn fibers(&self, indices: &[usize], exclude: &[usize]) -> FiberResult<FiberArrays> {
        let excluded: HashSet<usize> = exclude.iter().copied().collect();
        let mut arrays = FiberArrays::default();
        for &index in indices.iter().filter(|index| !excluded.contains(index)) {
            arrays.push(self.fiber(index)?);
        }
        Ok(arrays)
    }

    /// Arc length of each listed fiber, summed over consecutive samples.
    pub fn arc_lengths(&self, indices: &[usize]) -> FiberResult<Vec<f64>> {
        let layout = self.layout()?;
        if layout.points_per_fiber < 2 {
            return Err(FiberError::TooFewSamplesForLength {
                points_per_fiber: layout.points_per_fiber,
            });
        }

        indices
            .iter()
            .map(|&index| -> FiberResult<f64> {
                let layout = self.check_fiber(index)?;
                Ok(self.coords[layout.row(index)]
                    .windows(2)
                    .map(|pair| pair[0].distance_to(pair[1]))
                    .sum())
            })
            .collect()
    }
}

/// Arc lengths of `indices` in `store`; see [`FiberStore::arc_lengths`].
pub fn fiber_lengths(store: &FiberStore, indices: &[usize]) -> FiberResult<Vec<f64>> {
    store.arc_lengths(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::{FiberErrorKind, IngestOptions};
    use crate::geom::{LineSet, Tolerance};

    fn store_of(polylines: &[Vec<[f64; 3]>], points_per_fiber: usize) -> FiberStore {
        let geometry = LineSet::from_polylines(polylines);
        let mut store = FiberStore::new();
        store
            .ingest_line_set(&geometry, &IngestOptions::new(points_per_fiber))
            .unwrap();
        store
    }

    fn offset_fibers(count: usize) -> Vec<Vec<[f64; 3]>> {
        (0..count)
            .map(|f| (0..3).map(|i| [i as f64, f as f64, 0.0]).collect())
            .collect()
    }

    #[test]
    fn fiber_splits_axes() {
        let store = store_of(&offset_fibers(2), 3);
        let fiber = store.fiber(1).unwrap();
        assert_eq!(fiber.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(fiber.y, vec![1.0, 1.0, 1.0]);
        assert_eq!(fiber.z, vec![0.0, 0.0, 0.0]);
        assert_eq!(fiber.len(), 3);
    }

    #[test]
    fn fiber_out_of_range_is_not_found() {
        let store = store_of(&offset_fibers(2), 3);
        assert_eq!(store.fiber(2).unwrap_err().kind(), FiberErrorKind::NotFound);
        assert_eq!(
            FiberStore::new().fiber(0).unwrap_err().kind(),
            FiberErrorKind::NotFound
        );
    }

    #[test]
    fn excluded_fibers_leave_no_gaps() {
        let store = store_of(&offset_fibers(4), 3);
        let arrays = store.fibers(&[0, 1, 2, 3], &[1, 3]).unwrap();
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays.y[0], vec![0.0; 3]);
        assert_eq!(arrays.y[1], vec![2.0; 3]);
    }

    #[test]
    fn fibers_follow_requested_order() {
        let store = store_of(&offset_fibers(3), 3);
        let arrays = store.fibers(&[2, 0], &[]).unwrap();
        assert_eq!(arrays.y[0][0], 2.0);
        assert_eq!(arrays.y[1][0], 0.0);
    }

    #[test]
    fn extraction_does_not_mutate_store() {
        let store = store_of(&offset_fibers(3), 3);
        let snapshot = store.clone();
        let first = store.fiber(1).unwrap();
        let mut second = store.fiber(1).unwrap();
        assert_eq!(first, second);
        second.x[0] = 99.0;
        let _ = store.fibers(&[0, 1, 2], &[1]).unwrap();
        assert_eq!(store, snapshot);
        assert_eq!(store.fiber(1).unwrap(), first);
    }

    #[test]
    fn arc_length_sums_segments() {
        let store = store_of(&[vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]], 3);
        let lengths = store.arc_lengths(&[0]).unwrap();
        assert!(Tolerance::DEFAULT.approx_eq_f64(lengths[0], 2.0));
        assert_eq!(fiber_lengths(&store, &[0, 0]).unwrap().len(), 2);
    }

    #[test]
    fn arc_length_needs_two_samples() {
        let arrays = FiberArrays {
            x: vec![vec![1.0]],
            y: vec![vec![1.0]],
            z: vec![vec![1.0]],
        };
        let store = FiberStore::from_fiber_arrays(&arrays).unwrap();
        let err = store.arc_lengths(&[0]).unwrap_err();
        assert_eq!(err.kind(), FiberErrorKind::InvalidState);
        assert_eq!(
            FiberStore::new().arc_lengths(&[0]).unwrap_err(),
            FiberError::NotIngested
        );
    }
}
