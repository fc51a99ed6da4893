use std::collections::{BTreeMap, BTreeSet};

use super::error::{FiberError, FiberResult};
use super::store::FiberStore;

/// Cluster labels per fiber and one centroid per label.
///
/// Kept apart from the per-point buffers so label keys can never shadow a
/// scalar name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClusterAnnotations {
    labels: Vec<Option<usize>>,
    centroids: BTreeMap<usize, Vec<f64>>,
}

impl ClusterAnnotations {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Distinct labels in ascending order.
    pub fn labels(&self) -> impl Iterator<Item = usize> + '_ {
        self.centroids.keys().copied()
    }
}

impl FiberStore {
    /// Records the cluster label of every fiber together with the centroid of
    /// each label, replacing any earlier annotation.
    ///
    /// `labels` is in fiber index order; `centroids` must hold an entry for
    /// every label that occurs. Centroids of labels no fiber carries are not
    /// stored.
    pub fn annotate_clusters(
        &mut self,
        labels: &[usize],
        centroids: &BTreeMap<usize, Vec<f64>>,
    ) -> FiberResult<()> {
        let layout = self.layout()?;
        if labels.len() != layout.fiber_count {
            return Err(FiberError::LabelCountMismatch {
                expected: layout.fiber_count,
                actual: labels.len(),
            });
        }

        let distinct: BTreeSet<usize> = labels.iter().copied().collect();
        let mut stored = BTreeMap::new();
        for label in distinct {
            let centroid = centroids
                .get(&label)
                .ok_or(FiberError::CentroidNotFound { label })?;
            stored.insert(label, centroid.clone());
        }

        log::debug!(
            "annotated {} fibers with {} cluster labels",
            labels.len(),
            stored.len()
        );
        self.clusters = ClusterAnnotations {
            labels: labels.iter().copied().map(Some).collect(),
            centroids: stored,
        };
        Ok(())
    }

    #[must_use]
    pub fn clusters(&self) -> &ClusterAnnotations {
        &self.clusters
    }

    /// Label of `fiber`, `None` when no annotation has been made.
    pub fn cluster_label(&self, fiber: usize) -> FiberResult<Option<usize>> {
        self.check_fiber(fiber)?;
        Ok(self.clusters.labels.get(fiber).copied().flatten())
    }

    pub fn is_cluster_member(&self, fiber: usize, label: usize) -> FiberResult<bool> {
        Ok(self.cluster_label(fiber)? == Some(label))
    }

    /// Fibers carrying `label`, ascending.
    #[must_use]
    pub fn cluster_members(&self, label: usize) -> Vec<usize> {
        self.clusters
            .labels
            .iter()
            .enumerate()
            .filter(|(_, assigned)| **assigned == Some(label))
            .map(|(fiber, _)| fiber)
            .collect()
    }

    /// Copy of the centroid stored for `label`.
    pub fn centroid(&self, label: usize) -> FiberResult<Vec<f64>> {
        self.clusters
            .centroids
            .get(&label)
            .cloned()
            .ok_or(FiberError::CentroidNotFound { label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::{FiberArrays, FiberErrorKind};

    fn three_fibers() -> FiberStore {
        let arrays = FiberArrays {
            x: vec![vec![0.0, 1.0]; 3],
            y: vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]],
            z: vec![vec![0.0, 0.0]; 3],
        };
        FiberStore::from_fiber_arrays(&arrays).unwrap()
    }

    fn centroids() -> BTreeMap<usize, Vec<f64>> {
        BTreeMap::from([(0, vec![1.0, 1.0, 1.0]), (1, vec![2.0, 2.0, 2.0])])
    }

    #[test]
    fn labels_and_centroids_are_recorded() {
        let mut store = three_fibers();
        store.annotate_clusters(&[0, 0, 1], &centroids()).unwrap();

        assert!(store.is_cluster_member(0, 0).unwrap());
        assert!(store.is_cluster_member(1, 0).unwrap());
        assert!(!store.is_cluster_member(2, 0).unwrap());
        assert!(store.is_cluster_member(2, 1).unwrap());
        assert_eq!(store.cluster_members(0), vec![0, 1]);
        assert_eq!(store.centroid(0).unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(store.centroid(1).unwrap(), vec![2.0, 2.0, 2.0]);
        assert_eq!(store.clusters().labels().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn unannotated_store_has_no_labels() {
        let store = three_fibers();
        assert_eq!(store.cluster_label(1).unwrap(), None);
        assert!(store.clusters().is_empty());
        assert_eq!(store.cluster_label(3).unwrap_err().kind(), FiberErrorKind::NotFound);
    }

    #[test]
    fn label_count_must_match_fibers() {
        let mut store = three_fibers();
        let err = store.annotate_clusters(&[0, 1], &centroids()).unwrap_err();
        assert_eq!(err, FiberError::LabelCountMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn every_label_needs_a_centroid() {
        let mut store = three_fibers();
        let err = store.annotate_clusters(&[0, 2, 1], &centroids()).unwrap_err();
        assert_eq!(err, FiberError::CentroidNotFound { label: 2 });
        assert!(store.clusters().is_empty());
    }

    #[test]
    fn reannotation_replaces_previous_labels() {
        let mut store = three_fibers();
        store.annotate_clusters(&[0, 0, 1], &centroids()).unwrap();
        store.annotate_clusters(&[1, 1, 1], &centroids()).unwrap();
        assert_eq!(store.cluster_members(0), Vec::<usize>::new());
        assert_eq!(store.cluster_members(1), vec![0, 1, 2]);
        assert!(store.centroid(0).is_err());
    }
}
