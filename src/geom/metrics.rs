//! Opt-in timing hooks for the fiber pipeline.
//!
//! Timing is only collected when the `fiber_metrics` feature is enabled and
//! the target is not WASM (`std::time::Instant` is unavailable there). When
//! disabled, every call compiles down to running the closure.
//!
//! ```ignore
//! use tract_engine::geom::{FiberMetrics, TimingBucket};
//!
//! let mut metrics = FiberMetrics::default();
//! metrics.begin();
//! let lengths = metrics.time(TimingBucket::Extraction, || store.arc_lengths(&indices));
//! if let Some(report) = metrics.end() {
//!     println!("extraction: {} ns", report.extraction_ns);
//! }
//! ```

/// Phases of the fiber pipeline that can be timed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Resampling line-set geometry into the store.
    Ingest,
    /// Resampling a scalar source onto stored fibers.
    ScalarAttach,
    /// Copying already-resampled scalars between stores.
    ScalarCopy,
    /// Dense extraction and arc-length computation.
    Extraction,
    /// Rebuilding line-set geometry.
    Export,
}

/// Cumulative nanoseconds per bucket.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FiberTimingReport {
    pub ingest_ns: u64,
    pub scalar_attach_ns: u64,
    pub scalar_copy_ns: u64,
    pub extraction_ns: u64,
    pub export_ns: u64,
}

impl FiberTimingReport {
    /// Returns the total time across all buckets in nanoseconds.
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.ingest_ns
            .saturating_add(self.scalar_attach_ns)
            .saturating_add(self.scalar_copy_ns)
            .saturating_add(self.extraction_ns)
            .saturating_add(self.export_ns)
    }

    /// Returns the total time in milliseconds (for display purposes).
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

/// Accumulator for timing fiber operations.
///
/// When the `fiber_metrics` feature is disabled (or on WASM), all methods
/// are no-ops and [`end`](Self::end) returns `None`.
#[derive(Debug, Default)]
pub struct FiberMetrics {
    #[cfg(all(feature = "fiber_metrics", not(target_arch = "wasm32")))]
    report: FiberTimingReport,
}

impl FiberMetrics {
    /// Resets all timing counters to zero.
    pub fn begin(&mut self) {
        #[cfg(all(feature = "fiber_metrics", not(target_arch = "wasm32")))]
        {
            self.report = FiberTimingReport::default();
        }
    }

    /// Returns the accumulated timing report, or `None` if metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<FiberTimingReport> {
        #[cfg(all(feature = "fiber_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "fiber_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Times the execution of `f` and accumulates the elapsed time in `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "fiber_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.add_to_bucket(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "fiber_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }

    #[cfg(all(feature = "fiber_metrics", not(target_arch = "wasm32")))]
    fn add_to_bucket(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::Ingest => &mut self.report.ingest_ns,
            TimingBucket::ScalarAttach => &mut self.report.scalar_attach_ns,
            TimingBucket::ScalarCopy => &mut self.report.scalar_copy_ns,
            TimingBucket::Extraction => &mut self.report.extraction_ns,
            TimingBucket::Export => &mut self.report.export_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_report_total() {
        let report = FiberTimingReport {
            ingest_ns: 1000,
            export_ns: 2000,
            extraction_ns: 3000,
            ..FiberTimingReport::default()
        };
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = FiberMetrics::default();
        metrics.begin();
        let result = metrics.time(TimingBucket::Ingest, || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_end_matches_feature_state() {
        let mut metrics = FiberMetrics::default();
        metrics.begin();
        metrics.time(TimingBucket::Export, || ());
        let report = metrics.end();
        if cfg!(all(feature = "fiber_metrics", not(target_arch = "wasm32"))) {
            assert!(report.is_some());
        } else {
            assert!(report.is_none());
        }
    }
}
