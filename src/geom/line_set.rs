//! Polyline line-set geometry consumed and produced at the crate boundary.
//!
//! Tractography files (VTK polydata, TrackVis, ...) all reduce to the same
//! shape once loaded: a shared point table plus a list of lines, each line an
//! ordered list of point ids. The fiber store only talks to that shape through
//! [`LineSetSource`] and [`LineSetSink`], so any host-side representation can
//! be plugged in. [`LineSet`] is the in-crate implementation of both.

use serde::{Deserialize, Serialize};

use super::Point3;

/// Read access to a set of polylines sharing one point table.
pub trait LineSetSource {
    /// Number of lines (fibers) in the set.
    fn line_count(&self) -> usize;

    /// Ordered point ids of line `line`, or `None` when out of range.
    fn line_point_ids(&self, line: usize) -> Option<&[u32]>;

    /// Coordinate of point `id`, or `None` when the id is unknown.
    fn point(&self, id: u32) -> Option<Point3>;
}

/// Write access used when rebuilding geometry from a fiber store.
pub trait LineSetSink {
    /// Appends a point and returns its id.
    fn insert_point(&mut self, point: Point3) -> u32;

    /// Appends a line over previously inserted point ids.
    fn insert_line(&mut self, point_ids: Vec<u32>);
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineSet {
    pub points: Vec<[f64; 3]>,
    pub lines: Vec<Vec<u32>>,
}

impl LineSet {
    #[must_use]
    pub fn new(points: Vec<[f64; 3]>, lines: Vec<Vec<u32>>) -> Self {
        Self { points, lines }
    }

    #[must_use]
    pub fn with_capacity(point_capacity: usize, line_capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(point_capacity),
            lines: Vec::with_capacity(line_capacity),
        }
    }

    /// Builds a line set where every polyline owns its own run of points.
    #[must_use]
    pub fn from_polylines<P>(polylines: &[P]) -> Self
    where
        P: AsRef<[[f64; 3]]>,
    {
        let total: usize = polylines.iter().map(|line| line.as_ref().len()).sum();
        let mut set = Self::with_capacity(total, polylines.len());
        for polyline in polylines {
            let ids = polyline
                .as_ref()
                .iter()
                .map(|&p| set.insert_point(Point3::from_array(p)))
                .collect();
            set.insert_line(ids);
        }
        set
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Resolved coordinates of one line, `None` if the line or any of its
    /// point ids is out of range.
    #[must_use]
    pub fn polyline(&self, line: usize) -> Option<Vec<Point3>> {
        self.lines
            .get(line)?
            .iter()
            .map(|&id| self.point(id))
            .collect()
    }

    /// Returns true if any point contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_points(&self) -> bool {
        self.points
            .iter()
            .any(|p| !Point3::from_array(*p).is_finite())
    }

    /// Returns true if all line point ids are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.points.len();
        self.lines
            .iter()
            .flatten()
            .all(|&id| (id as usize) < n)
    }
}

impl LineSetSource for LineSet {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_point_ids(&self, line: usize) -> Option<&[u32]> {
        self.lines.get(line).map(Vec::as_slice)
    }

    fn point(&self, id: u32) -> Option<Point3> {
        self.points.get(id as usize).copied().map(Point3::from_array)
    }
}

impl LineSetSink for LineSet {
    fn insert_point(&mut self, point: Point3) -> u32 {
        let id = self.points.len() as u32;
        self.points.push(point.to_array());
        id
    }

    fn insert_line(&mut self, point_ids: Vec<u32>) {
        self.lines.push(point_ids);
    }
}
