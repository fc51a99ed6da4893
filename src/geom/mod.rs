mod core;
mod line_set;
mod metrics;

pub use self::core::{Point3, Tolerance, Vec3};
pub use line_set::{LineSet, LineSetSink, LineSetSource};
pub use metrics::{FiberMetrics, FiberTimingReport, TimingBucket};
