use serde::{Deserialize, Serialize};

/// Options for resampling line-set geometry into a fiber store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Number of samples kept per fiber.
    pub points_per_fiber: usize,
    /// Fibers with fewer source points are rejected.
    pub min_source_points: usize,
    /// Report fiber and sample counts at `info` level.
    pub verbose: bool,
}

impl IngestOptions {
    pub const DEFAULT_POINTS_PER_FIBER: usize = 20;
    pub const DEFAULT_MIN_SOURCE_POINTS: usize = 2;

    #[must_use]
    pub const fn new(points_per_fiber: usize) -> Self {
        Self {
            points_per_fiber,
            min_source_points: Self::DEFAULT_MIN_SOURCE_POINTS,
            verbose: false,
        }
    }

    #[must_use]
    pub const fn with_min_source_points(mut self, min_source_points: usize) -> Self {
        self.min_source_points = min_source_points;
        self
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POINTS_PER_FIBER)
    }
}
