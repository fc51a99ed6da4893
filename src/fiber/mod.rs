//! Fixed-size, per-point fiber storage.
//!
//! A [`FiberStore`] is filled once, either by resampling line-set geometry
//! ([`FiberStore::ingest_line_set`]) or from dense coordinate arrays
//! ([`FiberStore::from_fiber_arrays`]). Named scalar measurements can then be
//! attached any number of times, and fibers are read back as dense copies or
//! rebuilt as geometry. Fibers are never removed; exclusion is an index list
//! passed at read or export time.

mod cluster;
mod error;
mod export;
mod extract;
mod options;
mod resample;
mod scalar;
mod store;

pub use cluster::ClusterAnnotations;
pub use error::{FiberError, FiberErrorKind, FiberResult};
pub use extract::{FiberArrays, FiberCoords, fiber_lengths};
pub use options::IngestOptions;
pub use resample::{nearest_source_indices, sample_positions};
pub use store::{FiberStore, IngestDiagnostics};
