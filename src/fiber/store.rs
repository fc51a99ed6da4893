use std::collections::BTreeMap;
use std::ops::Range;

use super::cluster::ClusterAnnotations;
use super::error::{FiberError, FiberResult};
use super::extract::FiberArrays;
use super::options::IngestOptions;
use super::resample::nearest_source_indices;
use super::scalar::ScalarField;
use crate::geom::{FiberMetrics, FiberTimingReport, LineSetSource, Point3, TimingBucket};

/// Dimensions fixed by the single ingestion of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Layout {
    pub fiber_count: usize,
    pub points_per_fiber: usize,
}

impl Layout {
    pub const fn len(self) -> usize {
        self.fiber_count * self.points_per_fiber
    }

    /// Buffer range holding the samples of `fiber`.
    pub const fn row(self, fiber: usize) -> Range<usize> {
        let start = fiber * self.points_per_fiber;
        start..start + self.points_per_fiber
    }
}

/// Summary of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestDiagnostics {
    pub fiber_count: usize,
    pub points_per_fiber: usize,
    /// Total number of source points over all fibers.
    pub source_point_count: usize,
    /// Fibers with fewer source points than samples; their samples repeat
    /// source points.
    pub undersampled_fiber_count: usize,
    /// Present only when built with the `fiber_metrics` feature.
    pub timing: Option<FiberTimingReport>,
}

/// Fixed-size, per-point representation of a fiber bundle.
///
/// Coordinates are kept in one dense buffer, row-major by fiber. Named scalar
/// measurements live in their own dense buffers next to it, and cluster
/// annotations in a separate structure keyed by fiber index and label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FiberStore {
    pub(super) layout: Option<Layout>,
    pub(super) coords: Vec<Point3>,
    pub(super) scalars: BTreeMap<String, ScalarField>,
    pub(super) clusters: ClusterAnnotations,
}

impl FiberStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_ingested(&self) -> bool {
        self.layout.is_some()
    }

    /// Number of fibers, 0 before ingestion.
    #[must_use]
    pub fn fiber_count(&self) -> usize {
        self.layout.map_or(0, |layout| layout.fiber_count)
    }

    /// Samples per fiber, 0 before ingestion.
    #[must_use]
    pub fn points_per_fiber(&self) -> usize {
        self.layout.map_or(0, |layout| layout.points_per_fiber)
    }

    pub(super) fn layout(&self) -> FiberResult<Layout> {
        self.layout.ok_or(FiberError::NotIngested)
    }

    /// Layout of an ingested store, provided `fiber` is one of its fibers.
    pub(super) fn check_fiber(&self, fiber: usize) -> FiberResult<Layout> {
        match self.layout {
            Some(layout) if fiber < layout.fiber_count => Ok(layout),
            _ => Err(FiberError::FiberNotFound {
                index: fiber,
                fiber_count: self.fiber_count(),
            }),
        }
    }

    /// Stored coordinate of one sample.
    pub fn point(&self, fiber: usize, sample: usize) -> FiberResult<Point3> {
        let layout = self.check_fiber(fiber)?;
        if sample >= layout.points_per_fiber {
            return Err(FiberError::SampleNotFound {
                index: sample,
                points_per_fiber: layout.points_per_fiber,
            });
        }
        Ok(self.coords[layout.row(fiber).start + sample])
    }

    /// Resamples every line of `geometry` onto `options.points_per_fiber`
    /// nearest-neighbor samples and stores their coordinates.
    ///
    /// A store is ingested exactly once. On error the store is left empty.
    pub fn ingest_line_set<G>(
        &mut self,
        geometry: &G,
        options: &IngestOptions,
    ) -> FiberResult<IngestDiagnostics>
    where
        G: LineSetSource + ?Sized,
    {
        if self.layout.is_some() {
            return Err(FiberError::AlreadyIngested);
        }
        if options.points_per_fiber < 2 {
            return Err(FiberError::SampleCountTooSmall {
                count: options.points_per_fiber,
            });
        }

        let layout = Layout {
            fiber_count: geometry.line_count(),
            points_per_fiber: options.points_per_fiber,
        };

        if options.verbose {
            log::info!(
                "converting line set to fiber arrays: {} fibers, {} points sampled per fiber",
                layout.fiber_count,
                layout.points_per_fiber
            );
        }

        let mut diagnostics = IngestDiagnostics {
            fiber_count: layout.fiber_count,
            points_per_fiber: layout.points_per_fiber,
            ..IngestDiagnostics::default()
        };

        let mut metrics = FiberMetrics::default();
        metrics.begin();
        let coords = metrics.time(TimingBucket::Ingest, || -> FiberResult<Vec<Point3>> {
            let mut coords = Vec::with_capacity(layout.len());
            for fiber in 0..layout.fiber_count {
                let ids = geometry
                    .line_point_ids(fiber)
                    .ok_or(FiberError::MissingLine { line: fiber })?;
                if ids.len() < options.min_source_points {
                    return Err(FiberError::TooFewSourcePoints {
                        fiber,
                        point_count: ids.len(),
                        min: options.min_source_points,
                    });
                }

                diagnostics.source_point_count += ids.len();
                if ids.len() < layout.points_per_fiber {
                    diagnostics.undersampled_fiber_count += 1;
                }

                for point_id in sampled_point_ids(ids, layout.points_per_fiber)? {
                    let point = geometry
                        .point(point_id)
                        .ok_or(FiberError::UnknownPointId { fiber, point_id })?;
                    coords.push(point);
                }
            }
            Ok(coords)
        })?;
        diagnostics.timing = metrics.end();

        log::debug!(
            "ingested {} fibers from {} source points ({} undersampled)",
            diagnostics.fiber_count,
            diagnostics.source_point_count,
            diagnostics.undersampled_fiber_count
        );

        self.layout = Some(layout);
        self.coords = coords;
        Ok(diagnostics)
    }

    /// Builds a store from coordinates that are already resampled.
    ///
    /// The three arrays must share the shape `[fiber_count][points_per_fiber]`;
    /// both dimensions are taken from that shape.
    pub fn from_fiber_arrays(arrays: &FiberArrays) -> FiberResult<Self> {
        let fiber_count = arrays.x.len();
        if arrays.y.len() != fiber_count || arrays.z.len() != fiber_count {
            return Err(FiberError::malformed(format!(
                "axis arrays hold {}, {} and {} fibers",
                fiber_count,
                arrays.y.len(),
                arrays.z.len()
            )));
        }
        let points_per_fiber = arrays
            .x
            .first()
            .map(Vec::len)
            .ok_or_else(|| FiberError::malformed("no fibers"))?;
        if points_per_fiber == 0 {
            return Err(FiberError::malformed("fibers have no points"));
        }

        let layout = Layout {
            fiber_count,
            points_per_fiber,
        };
        let mut coords = Vec::with_capacity(layout.len());
        for (fiber, ((xs, ys), zs)) in arrays.x.iter().zip(&arrays.y).zip(&arrays.z).enumerate() {
            if xs.len() != points_per_fiber
                || ys.len() != points_per_fiber
                || zs.len() != points_per_fiber
            {
                return Err(FiberError::malformed(format!(
                    "fiber {fiber} does not have {points_per_fiber} points on every axis"
                )));
            }
            coords.extend(
                xs.iter()
                    .zip(ys)
                    .zip(zs)
                    .map(|((&x, &y), &z)| Point3::new(x, y, z)),
            );
        }

        Ok(Self {
            layout: Some(layout),
            coords,
            ..Self::default()
        })
    }
}

/// Point ids of one source line picked by nearest-neighbor resampling.
pub(super) fn sampled_point_ids(ids: &[u32], points_per_fiber: usize) -> FiberResult<Vec<u32>> {
    Ok(nearest_source_indices(ids.len(), points_per_fiber)?
        .into_iter()
        .map(|index| ids[index])
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::FiberErrorKind;
    use crate::geom::LineSet;

    fn straight_fiber(len: usize, y: f64) -> Vec<[f64; 3]> {
        (0..len).map(|i| [i as f64, y, 0.0]).collect()
    }

    #[test]
    fn ingest_sets_dimensions_and_endpoints() {
        let geometry = LineSet::from_polylines(&[straight_fiber(10, 0.0), straight_fiber(4, 1.0)]);
        let mut store = FiberStore::new();
        let diagnostics = store
            .ingest_line_set(&geometry, &IngestOptions::new(5))
            .unwrap();

        assert_eq!(store.fiber_count(), 2);
        assert_eq!(store.points_per_fiber(), 5);
        assert_eq!(diagnostics.source_point_count, 14);
        assert_eq!(diagnostics.undersampled_fiber_count, 1);
        assert_eq!(store.point(0, 0).unwrap(), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(store.point(0, 4).unwrap(), Point3::new(9.0, 0.0, 0.0));
        assert_eq!(store.point(1, 4).unwrap(), Point3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn ingest_twice_is_rejected() {
        let geometry = LineSet::from_polylines(&[straight_fiber(3, 0.0)]);
        let mut store = FiberStore::new();
        store.ingest_line_set(&geometry, &IngestOptions::new(3)).unwrap();
        let err = store
            .ingest_line_set(&geometry, &IngestOptions::new(3))
            .unwrap_err();
        assert_eq!(err.kind(), FiberErrorKind::InvalidState);
    }

    #[test]
    fn single_point_fiber_is_rejected_by_default() {
        let geometry = LineSet::from_polylines(&[straight_fiber(5, 0.0), straight_fiber(1, 1.0)]);
        let mut store = FiberStore::new();
        let err = store
            .ingest_line_set(&geometry, &IngestOptions::new(4))
            .unwrap_err();
        assert_eq!(
            err,
            FiberError::TooFewSourcePoints {
                fiber: 1,
                point_count: 1,
                min: 2
            }
        );
        assert!(!store.is_ingested());
        assert_eq!(store.fiber_count(), 0);
    }

    #[test]
    fn single_point_fiber_repeats_when_allowed() {
        let geometry = LineSet::from_polylines(&[straight_fiber(1, 2.0)]);
        let mut store = FiberStore::new();
        store
            .ingest_line_set(&geometry, &IngestOptions::new(3).with_min_source_points(1))
            .unwrap();
        for sample in 0..3 {
            assert_eq!(store.point(0, sample).unwrap(), Point3::new(0.0, 2.0, 0.0));
        }
    }

    #[test]
    fn unknown_point_id_is_reported() {
        let geometry = LineSet::new(vec![[0.0; 3], [1.0, 0.0, 0.0]], vec![vec![0, 1, 9]]);
        let mut store = FiberStore::new();
        let err = store
            .ingest_line_set(&geometry, &IngestOptions::new(3))
            .unwrap_err();
        assert_eq!(
            err,
            FiberError::UnknownPointId {
                fiber: 0,
                point_id: 9
            }
        );
    }

    #[test]
    fn sample_count_below_two_is_rejected() {
        let geometry = LineSet::from_polylines(&[straight_fiber(5, 0.0)]);
        let mut store = FiberStore::new();
        let err = store
            .ingest_line_set(&geometry, &IngestOptions::new(1))
            .unwrap_err();
        assert_eq!(err.kind(), FiberErrorKind::InvalidArgument);
    }

    #[test]
    fn fiber_arrays_infer_dimensions() {
        let arrays = FiberArrays {
            x: vec![vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 7.0]],
            y: vec![vec![0.0; 3], vec![1.0; 3]],
            z: vec![vec![0.0; 3], vec![2.0; 3]],
        };
        let store = FiberStore::from_fiber_arrays(&arrays).unwrap();
        assert_eq!(store.fiber_count(), 2);
        assert_eq!(store.points_per_fiber(), 3);
        assert_eq!(store.point(1, 2).unwrap(), Point3::new(7.0, 1.0, 2.0));
    }

    #[test]
    fn ragged_fiber_arrays_are_rejected() {
        let arrays = FiberArrays {
            x: vec![vec![0.0, 1.0], vec![5.0]],
            y: vec![vec![0.0; 2], vec![1.0; 2]],
            z: vec![vec![0.0; 2], vec![2.0; 2]],
        };
        let err = FiberStore::from_fiber_arrays(&arrays).unwrap_err();
        assert_eq!(err.kind(), FiberErrorKind::InvalidArgument);

        let empty = FiberArrays::default();
        assert!(FiberStore::from_fiber_arrays(&empty).is_err());
    }

    #[test]
    fn point_lookup_checks_bounds() {
        let store = FiberStore::new();
        assert_eq!(store.point(0, 0).unwrap_err().kind(), FiberErrorKind::NotFound);

        let geometry = LineSet::from_polylines(&[straight_fiber(3, 0.0)]);
        let mut store = FiberStore::new();
        store.ingest_line_set(&geometry, &IngestOptions::new(3)).unwrap();
        assert!(matches!(
            store.point(0, 3),
            Err(FiberError::SampleNotFound { index: 3, .. })
        ));
    }

    /// Records every message so ingestion logging can be inspected.
    struct CaptureLogger;

    static CAPTURED: std::sync::Mutex<Vec<(log::Level, String)>> = std::sync::Mutex::new(Vec::new());
    static LOGGER: CaptureLogger = CaptureLogger;

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut captured) = CAPTURED.lock() {
                captured.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    fn info_messages_containing(needle: &str) -> usize {
        CAPTURED
            .lock()
            .unwrap()
            .iter()
            .filter(|(level, message)| *level == log::Level::Info && message.contains(needle))
            .count()
    }

    #[test]
    fn verbose_ingest_reports_counts_at_info_level() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Debug);

        let verbose = LineSet::from_polylines(&[
            straight_fiber(4, 0.0),
            straight_fiber(4, 1.0),
            straight_fiber(4, 2.0),
        ]);
        let mut store = FiberStore::new();
        store
            .ingest_line_set(&verbose, &IngestOptions::new(7).with_verbose(true))
            .unwrap();
        assert_eq!(info_messages_containing("3 fibers, 7 points sampled per fiber"), 1);

        let quiet = LineSet::from_polylines(&[straight_fiber(4, 0.0), straight_fiber(4, 1.0)]);
        let mut store = FiberStore::new();
        store.ingest_line_set(&quiet, &IngestOptions::new(9)).unwrap();
        assert_eq!(info_messages_containing("2 fibers, 9 points sampled per fiber"), 0);
    }
}
