/// Result type for fiber store operations.
pub type FiberResult<T> = Result<T, FiberError>;

/// Coarse classification of a [`FiberError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiberErrorKind {
    /// The caller passed a value the operation cannot work with.
    InvalidArgument,
    /// The store is not in a state that allows the operation.
    InvalidState,
    /// A fiber, scalar or cluster label does not exist.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FiberError {
    #[error("target sample count must be at least 2, got {count}")]
    SampleCountTooSmall { count: usize },
    #[error("fiber {fiber} has {point_count} points, at least {min} required")]
    TooFewSourcePoints {
        fiber: usize,
        point_count: usize,
        min: usize,
    },
    #[error("cannot resample a fiber without points")]
    EmptySource,
    #[error("fiber {fiber} references unknown point id {point_id}")]
    UnknownPointId { fiber: usize, point_id: u32 },
    #[error("line {line} is missing from the geometry")]
    MissingLine { line: usize },
    #[error("coordinate arrays are malformed: {reason}")]
    MalformedArrays { reason: String },
    #[error("geometry has {actual} lines but the store holds {expected} fibers")]
    FiberCountMismatch { expected: usize, actual: usize },
    #[error("expected {expected} points per fiber, got {actual}")]
    PointCountMismatch { expected: usize, actual: usize },
    #[error("scalar source has {len} values but point id {point_id} was requested")]
    ScalarSourceTooShort { len: usize, point_id: u32 },
    #[error("destination holds {capacity} fibers but {required} would be copied")]
    DestinationTooSmall { capacity: usize, required: usize },
    #[error("got {actual} cluster labels for {expected} fibers")]
    LabelCountMismatch { expected: usize, actual: usize },
    #[error("fiber store has already been ingested")]
    AlreadyIngested,
    #[error("fiber store has not been ingested yet")]
    NotIngested,
    #[error("arc length needs at least 2 samples per fiber, store has {points_per_fiber}")]
    TooFewSamplesForLength { points_per_fiber: usize },
    #[error("fiber index {index} is out of range (fiber count {fiber_count})")]
    FiberNotFound { index: usize, fiber_count: usize },
    #[error("sample index {index} is out of range ({points_per_fiber} samples per fiber)")]
    SampleNotFound { index: usize, points_per_fiber: usize },
    #[error("scalar `{name}` is not set for fiber {fiber}")]
    ScalarNotFound { name: String, fiber: usize },
    #[error("no centroid for cluster label {label}")]
    CentroidNotFound { label: usize },
}

impl FiberError {
    #[must_use]
    pub const fn kind(&self) -> FiberErrorKind {
        match self {
            Self::SampleCountTooSmall { .. }
            | Self::TooFewSourcePoints { .. }
            | Self::EmptySource
            | Self::UnknownPointId { .. }
            | Self::MissingLine { .. }
            | Self::MalformedArrays { .. }
            | Self::FiberCountMismatch { .. }
            | Self::PointCountMismatch { .. }
            | Self::ScalarSourceTooShort { .. }
            | Self::DestinationTooSmall { .. }
            | Self::LabelCountMismatch { .. } => FiberErrorKind::InvalidArgument,
            Self::AlreadyIngested | Self::NotIngested | Self::TooFewSamplesForLength { .. } => {
                FiberErrorKind::InvalidState
            }
            Self::FiberNotFound { .. }
            | Self::SampleNotFound { .. }
            | Self::ScalarNotFound { .. }
            | Self::CentroidNotFound { .. } => FiberErrorKind::NotFound,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedArrays {
            reason: reason.into(),
        }
    }
}
