//! Packing of coordinate clusters into non-overlapping horizontal extents.

use crate::seqpeek::grouping::MutationsByLocation;
use crate::seqpeek::scale::{LinearScale, OrdinalBands};

/// The packing unit: all mutation ids at one coordinate.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LocationCluster {
    pub location: i64,
    /// Offset of each mutation id within the cluster.
    pub scale: OrdinalBands,
    pub left_extent: f64,
    pub right_extent: f64,
    pub width: f64,
    /// Assigned left edge in reference scale units.
    pub start_loc: f64,
}

impl LocationCluster {
    pub fn new(location: i64, scale: OrdinalBands) -> Self {
        let width = scale.range_extent();
        Self {
            location,
            scale,
            left_extent: width / 2.0,
            right_extent: width / 2.0,
            width,
            start_loc: 0.0,
        }
    }

    /// Left edge the cluster would get if centered on its coordinate.
    pub fn natural_start(&self, scale: &LinearScale) -> f64 {
        scale.apply(self.location as f64) - self.left_extent
    }

    pub fn end_loc(&self) -> f64 {
        self.start_loc + self.width
    }

    /// Horizontal center of the column of `mutation_id`, in reference scale units.
    pub fn column_center(&self, mutation_id: &str) -> Option<f64> {
        self.scale
            .offset(mutation_id)
            .map(|offset| self.start_loc + offset + self.scale.band() / 2.0)
    }
}

/// Build one cluster per coordinate, ascending by coordinate.
///
/// The entries of each coordinate must already be sorted; the cluster's bands follow
/// that order, with repeated mutation ids sharing one band.
pub fn build_location_clusters(
    by_location: &MutationsByLocation,
    shape_width: f64,
) -> Vec<LocationCluster> {
    by_location
        .iter()
        .map(|(&location, mutations)| {
            let scale = OrdinalBands::new(
                mutations.iter().map(|m| m.mutation_id.as_str()),
                shape_width,
            );
            LocationCluster::new(location, scale)
        })
        .collect()
}

/// Horizontal extent of a packed track.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Extent {
    pub left: f64,
    pub right: f64,
}

/// Pivot-and-spread packing of location clusters.
#[derive(Debug, Clone, Copy, PartialEq, derive_new::new)]
pub struct ClusterLayoutEngine {
    /// Gap between neighbouring clusters.
    pub padding: f64,
}

impl ClusterLayoutEngine {
    /// Assign `start_loc` to all `clusters`, which must be sorted by coordinate.
    ///
    /// The cluster at index `len / 2` is centered on its coordinate.  Walking right from
    /// it, a cluster keeps its natural position unless that lies left of the running
    /// cursor, in which case it is pushed to the cursor.  Walking left, a cluster keeps its
    /// natural position if its right edge lies left of the cursor, otherwise it is placed
    /// to end at the cursor.  Returns `None` for an empty slice.
    pub fn layout(&self, clusters: &mut [LocationCluster], scale: &LinearScale) -> Option<Extent> {
        if clusters.is_empty() {
            return None;
        }
        let pivot = clusters.len() / 2;
        let padding = self.padding;

        let (left, right) = clusters.split_at_mut(pivot);
        let (pivot_cluster, right) = right.split_first_mut()?;
        pivot_cluster.start_loc = pivot_cluster.natural_start(scale);

        let mut cursor = pivot_cluster.start_loc + pivot_cluster.width + padding;
        for cluster in right.iter_mut() {
            let natural = cluster.natural_start(scale);
            cluster.start_loc = if natural >= cursor { natural } else { cursor };
            cursor = cluster.start_loc + cluster.width + padding;
        }

        cursor = pivot_cluster.start_loc - padding;
        for cluster in left.iter_mut().rev() {
            let natural = cluster.natural_start(scale);
            let natural_right = scale.apply(cluster.location as f64) + cluster.right_extent;
            cluster.start_loc = if natural_right < cursor {
                natural
            } else {
                cursor - cluster.width
            };
            cursor = cluster.start_loc - padding;
        }

        tracing::trace!(
            "packed {} clusters around pivot at {}",
            clusters.len(),
            clusters[pivot].location
        );

        Some(Extent {
            left: clusters.first()?.start_loc,
            right: clusters.last()?.end_loc(),
        })
    }
}

/// Identity of a dataset for [`ClusterMemo`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    /// Bumped whenever the data is replaced.
    pub revision: u64,
    /// Labels of the tracks, in order.
    pub labels: Vec<String>,
}

/// Cache of the clusters built across all tracks.
///
/// Holds at most one entry; a lookup with a different key replaces it.
#[derive(Debug, Default)]
pub struct ClusterMemo {
    entry: Option<(MemoKey, Vec<LocationCluster>)>,
    builds: usize,
}

impl ClusterMemo {
    /// Clusters for `key`, building them with `build` on a miss.
    pub fn get_or_build<F>(&mut self, key: MemoKey, build: F) -> &[LocationCluster]
    where
        F: FnOnce() -> Vec<LocationCluster>,
    {
        let hit = matches!(&self.entry, Some((cached, _)) if *cached == key);
        if !hit {
            tracing::debug!("building shared clusters for revision {}", key.revision);
            self.builds += 1;
            self.entry = Some((key, build()));
        }
        match &self.entry {
            Some((_, clusters)) => clusters,
            None => &[],
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self, key: &MemoKey) -> bool {
        matches!(&self.entry, Some((cached, _)) if cached == key)
    }

    /// Number of times clusters were built.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
