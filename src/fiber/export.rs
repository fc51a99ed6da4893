use std::collections::HashSet;

use super::error::FiberResult;
use super::store::FiberStore;
use crate::geom::{LineSet, LineSetSink};

impl FiberStore {
    /// Writes every fiber not listed in `exclude` into `sink` as one polyline
    /// of `points_per_fiber` new points, in fiber index order.
    ///
    /// Only coordinates are written. Returns the number of lines emitted.
    pub fn export_into<S>(&self, sink: &mut S, exclude: &[usize]) -> FiberResult<usize>
    where
        S: LineSetSink + ?Sized,
    {
        let layout = self.layout()?;
        let excluded: HashSet<usize> = exclude.iter().copied().collect();

        let mut emitted = 0;
        for fiber in (0..layout.fiber_count).filter(|fiber| !excluded.contains(fiber)) {
            let ids = self.coords[layout.row(fiber)]
                .iter()
                .map(|&point| sink.insert_point(point))
                .collect();
            sink.insert_line(ids);
            emitted += 1;
        }

        log::debug!(
            "exported {emitted} of {} fibers as polylines",
            layout.fiber_count
        );
        Ok(emitted)
    }

    /// Rebuilds a [`LineSet`] from the stored fibers minus `exclude`.
    pub fn to_line_set(&self, exclude: &[usize]) -> FiberResult<LineSet> {
        let layout = self.layout()?;
        let mut line_set = LineSet::with_capacity(layout.len(), layout.fiber_count);
        self.export_into(&mut line_set, exclude)?;
        Ok(line_set)
    }
}

#[cfg(test)]
mod tests {
    use crate::fiber::{FiberError, FiberStore, IngestOptions};
    use crate::geom::{LineSet, LineSetSource};

    fn bundle() -> LineSet {
        LineSet::from_polylines(&[
            vec![[0.0, 0.0, 0.0], [1.0, 0.5, 0.0], [2.0, 0.0, 0.25]],
            vec![[0.0, 1.0, 0.0], [1.0, 1.5, 0.0], [2.0, 1.0, 0.25]],
            vec![[0.0, 2.0, 0.0], [1.0, 2.5, 0.0], [2.0, 2.0, 0.25]],
        ])
    }

    #[test]
    fn equal_sample_count_round_trips_exactly() {
        let source = bundle();
        let mut store = FiberStore::new();
        store.ingest_line_set(&source, &IngestOptions::new(3)).unwrap();
        let exported = store.to_line_set(&[]).unwrap();
        assert_eq!(exported, source);
    }

    #[test]
    fn excluded_fibers_are_dropped() {
        let mut store = FiberStore::new();
        store.ingest_line_set(&bundle(), &IngestOptions::new(3)).unwrap();
        let exported = store.to_line_set(&[1]).unwrap();

        assert_eq!(exported.line_count(), 2);
        assert_eq!(exported.point_count(), 6);
        assert_eq!(exported.polyline(1).unwrap()[0].y, 2.0);
        assert!(exported.has_valid_indices());
    }

    #[test]
    fn export_before_ingest_fails() {
        let store = FiberStore::new();
        assert_eq!(store.to_line_set(&[]).unwrap_err(), FiberError::NotIngested);
    }
}
