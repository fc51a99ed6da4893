use std::collections::HashSet;

use super::error::{FiberError, FiberResult};
use super::store::{FiberStore, Layout, sampled_point_ids};
use crate::geom::LineSetSource;

/// Dense buffer for one named measurement, laid out like the coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ScalarField {
    values: Vec<f64>,
    /// Per fiber: whether the row has been written.
    filled: Vec<bool>,
}

impl ScalarField {
    fn new(layout: Layout) -> Self {
        Self {
            values: vec![0.0; layout.len()],
            filled: vec![false; layout.fiber_count],
        }
    }

    fn row(&self, layout: Layout, fiber: usize) -> Option<&[f64]> {
        self.filled
            .get(fiber)
            .copied()
            .unwrap_or(false)
            .then(|| &self.values[layout.row(fiber)])
    }
}

impl FiberStore {
    /// Allocates storage for scalar `name`. Registering an existing name is a
    /// no-op; values stay absent until written.
    pub fn register_scalar(&mut self, name: &str) -> FiberResult<()> {
        self.scalar_field_mut(name).map(|_| ())
    }

    #[must_use]
    pub fn has_scalar(&self, name: &str) -> bool {
        self.scalars.contains_key(name)
    }

    /// Registered scalar names in sorted order.
    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalars.keys().map(String::as_str)
    }

    /// Resamples `values`, indexed by geometry point id, onto every stored
    /// fiber under `name`.
    ///
    /// The sample positions are recomputed from `geometry` because scalar
    /// sources are indexed by original point id, not by resampled position.
    /// `geometry` must be the line set the store was ingested from.
    pub fn attach_scalar<G>(
        &mut self,
        geometry: &G,
        values: &[f64],
        name: &str,
        points_per_fiber: usize,
    ) -> FiberResult<()>
    where
        G: LineSetSource + ?Sized,
    {
        let layout = self.layout()?;
        if points_per_fiber != layout.points_per_fiber {
            return Err(FiberError::PointCountMismatch {
                expected: layout.points_per_fiber,
                actual: points_per_fiber,
            });
        }
        if geometry.line_count() != layout.fiber_count {
            return Err(FiberError::FiberCountMismatch {
                expected: layout.fiber_count,
                actual: geometry.line_count(),
            });
        }

        let mut resampled = Vec::with_capacity(layout.len());
        for fiber in 0..layout.fiber_count {
            let ids = geometry
                .line_point_ids(fiber)
                .ok_or(FiberError::MissingLine { line: fiber })?;
            for point_id in sampled_point_ids(ids, layout.points_per_fiber)? {
                let value = values.get(point_id as usize).copied().ok_or(
                    FiberError::ScalarSourceTooShort {
                        len: values.len(),
                        point_id,
                    },
                )?;
                resampled.push(value);
            }
        }

        let field = self.scalar_field_mut(name)?;
        field.values = resampled;
        field.filled.fill(true);

        log::debug!(
            "attached scalar `{name}` to {} fibers from {} source values",
            layout.fiber_count,
            values.len()
        );
        Ok(())
    }

    /// Copies already-resampled scalars from `source` into this store.
    ///
    /// Iterates `fiber_indices`, or every source fiber when `None` or empty, skipping
    /// indices in `exclude`. Copied rows are renumbered densely from 0 in
    /// this store. Returns the number of fibers copied. Nothing is written
    /// unless every requested value exists.
    pub fn copy_scalars<S>(
        &mut self,
        source: &FiberStore,
        names: &[S],
        fiber_indices: Option<&[usize]>,
        exclude: &[usize],
    ) -> FiberResult<usize>
    where
        S: AsRef<str>,
    {
        let layout = self.layout()?;
        let source_layout = source.layout()?;
        if source_layout.points_per_fiber != layout.points_per_fiber {
            return Err(FiberError::PointCountMismatch {
                expected: layout.points_per_fiber,
                actual: source_layout.points_per_fiber,
            });
        }

        let selected = select_fibers(fiber_indices, source_layout.fiber_count, exclude);
        if selected.len() > layout.fiber_count {
            return Err(FiberError::DestinationTooSmall {
                capacity: layout.fiber_count,
                required: selected.len(),
            });
        }

        let mut gathered = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let mut rows = Vec::with_capacity(selected.len() * layout.points_per_fiber);
            for &fiber in &selected {
                rows.extend_from_slice(source.scalar_row(fiber, name)?);
            }
            gathered.push((name, rows));
        }

        for (name, rows) in gathered {
            let field = self.scalar_field_mut(name)?;
            field.values[..rows.len()].copy_from_slice(&rows);
            field.filled[..selected.len()].fill(true);
        }

        log::debug!(
            "copied {} scalars for {} fibers ({} excluded)",
            names.len(),
            selected.len(),
            exclude.len()
        );
        Ok(selected.len())
    }

    /// Builds a new store holding the listed fibers (all when `None` or empty) minus
    /// `exclude`, renumbered from 0.
    ///
    /// Scalars set on every selected fiber are carried over. Cluster
    /// annotations refer to the original numbering and are not.
    pub fn select(&self, fiber_indices: Option<&[usize]>, exclude: &[usize]) -> FiberResult<Self> {
        let layout = self.layout()?;
        let selected = select_fibers(fiber_indices, layout.fiber_count, exclude);

        let sub_layout = Layout {
            fiber_count: selected.len(),
            points_per_fiber: layout.points_per_fiber,
        };
        let mut coords = Vec::with_capacity(sub_layout.len());
        for &fiber in &selected {
            let layout = self.check_fiber(fiber)?;
            coords.extend_from_slice(&self.coords[layout.row(fiber)]);
        }

        let mut subset = Self {
            layout: Some(sub_layout),
            coords,
            ..Self::default()
        };
        let carried: Vec<&str> = self
            .scalars
            .iter()
            .filter(|(_, field)| selected.iter().all(|&fiber| field.filled[fiber]))
            .map(|(name, _)| name.as_str())
            .collect();
        subset.copy_scalars(self, &carried, Some(selected.as_slice()), &[])?;
        Ok(subset)
    }

    /// Values of scalar `name` along one fiber.
    pub fn scalar(&self, index: usize, name: &str) -> FiberResult<Vec<f64>> {
        self.scalar_row(index, name).map(<[f64]>::to_vec)
    }

    /// Values of scalar `name` for each listed fiber, in order.
    pub fn scalars(&self, indices: &[usize], name: &str) -> FiberResult<Vec<Vec<f64>>> {
        indices.iter().map(|&index| self.scalar(index, name)).collect()
    }

    fn scalar_row(&self, index: usize, name: &str) -> FiberResult<&[f64]> {
        let layout = self.check_fiber(index)?;
        self.scalars
            .get(name)
            .and_then(|field| field.row(layout, index))
            .ok_or_else(|| FiberError::ScalarNotFound {
                name: name.to_owned(),
                fiber: index,
            })
    }

    fn scalar_field_mut(&mut self, name: &str) -> FiberResult<&mut ScalarField> {
        let layout = self.layout()?;
        Ok(self
            .scalars
            .entry(name.to_owned())
            .or_insert_with(|| ScalarField::new(layout)))
    }
}

fn select_fibers(fiber_indices: Option<&[usize]>, fiber_count: usize, exclude: &[usize]) -> Vec<usize> {
    let excluded: HashSet<usize> = exclude.iter().copied().collect();
    match fiber_indices {
        Some(indices) if !indices.is_empty() => indices
            .iter()
            .copied()
            .filter(|index| !excluded.contains(index))
            .collect(),
        // An empty list selects every fiber, same as `None`.
        _ => (0..fiber_count)
            .filter(|index| !excluded.contains(index))
            .collect(),
    }
}
