//! Dendrogram produced by agglomerative clustering.
//!
//! Leaves are nodes `0..n`; the `s`-th merge creates node `n + s`, the same
//! numbering SciPy and MATLAB use for linkage matrices.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partition::Partition;

/// A single merge: two existing nodes joined at a height.
///
/// This is also the export record; a list of merges is enough to rebuild the
/// tree with [`Dendrogram::from_merge_records`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Node merged from the cluster holding the lower sample index.
    pub left: usize,
    /// The other merged node.
    pub right: usize,
    /// Dissimilarity at which the merge happened.
    pub height: f64,
    /// Number of leaves under the new node.
    pub size: usize,
}

/// A binary merge tree over `n_items` leaves with non-decreasing heights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
    clamped_merges: usize,
}

impl Dendrogram {
    pub(crate) fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
            clamped_merges: 0,
        }
    }

    /// Record a merge, lifting its height to the previous one if it is lower.
    pub(crate) fn push_merge(&mut self, left: usize, right: usize, height: f64, size: usize) {
        let mut height = height;
        if let Some(prev) = self.merges.last() {
            if height < prev.height {
                self.clamped_merges += 1;
                height = prev.height;
            }
        }
        self.merges.push(Merge {
            left,
            right,
            height,
            size,
        });
    }

    /// Rebuild a dendrogram from exported merge records.
    ///
    /// Requires exactly `n_items - 1` merges, each joining two distinct nodes
    /// that already exist and have not been merged before, with consistent
    /// sizes and non-decreasing finite heights.
    pub fn from_merge_records(n_items: usize, records: &[Merge]) -> Result<Self> {
        if n_items == 0 {
            return Err(Error::EmptyInput);
        }
        if records.len() != n_items - 1 {
            return Err(Error::DimensionMismatch {
                expected: n_items - 1,
                found: records.len(),
            });
        }
        let mut sizes: Vec<usize> = vec![1; n_items];
        let mut used = vec![false; 2 * n_items - 1];
        let mut prev_height = 0.0;
        for (s, m) in records.iter().enumerate() {
            let next_node = n_items + s;
            for node in [m.left, m.right] {
                if node >= next_node {
                    return Err(Error::InvalidDendrogram(format!(
                        "merge {s} references node {node} before it exists"
                    )));
                }
                if used[node] {
                    return Err(Error::InvalidDendrogram(format!(
                        "merge {s} reuses node {node}"
                    )));
                }
            }
            if m.left == m.right {
                return Err(Error::InvalidDendrogram(format!(
                    "merge {s} joins node {} with itself",
                    m.left
                )));
            }
            if !m.height.is_finite() || m.height < prev_height {
                return Err(Error::InvalidDendrogram(format!(
                    "merge {s} has height {} after {prev_height}",
                    m.height
                )));
            }
            let size = sizes[m.left] + sizes[m.right];
            if size != m.size {
                return Err(Error::InvalidDendrogram(format!(
                    "merge {s} has size {} but its children hold {size} leaves",
                    m.size
                )));
            }
            used[m.left] = true;
            used[m.right] = true;
            sizes.push(size);
            prev_height = m.height;
        }
        Ok(Self {
            merges: records.to_vec(),
            n_items,
            clamped_merges: 0,
        })
    }

    /// Partition obtained by applying the first `n_merges` merges.
    fn partition_after(&self, n_merges: usize) -> Partition {
        let n = self.n_items;
        let mut parent: Vec<usize> = (0..(n + n_merges)).collect();
        for (s, m) in self.merges.iter().take(n_merges).enumerate() {
            parent[m.left] = n + s;
            parent[m.right] = n + s;
        }
        let roots: Vec<usize> = (0..n).map(|leaf| find_root(&mut parent, leaf)).collect();
        Partition::from_groups(&roots)
    }

    /// Cluster assignments at a height threshold.
    ///
    /// Every merge with height above `threshold` is cut, leaving one cluster
    /// per remaining subtree.
    pub fn cut_at_height(&self, threshold: f64) -> Partition {
        let n_merges = self
            .merges
            .iter()
            .take_while(|m| m.height <= threshold)
            .count();
        self.partition_after(n_merges)
    }

    /// Cluster assignments with exactly `k` clusters.
    ///
    /// Applies the first `n - k` merges, which is the lowest height giving
    /// `k` clusters. When several merges share a height the ones built first
    /// are applied first, so `k` is honoured even inside a plateau.
    pub fn cut_to_k(&self, k: usize) -> Result<Partition> {
        if k == 0 || k > self.n_items {
            return Err(Error::InvalidCut {
                requested: k,
                n_items: self.n_items,
            });
        }
        Ok(self.partition_after(self.n_items - k))
    }

    /// Height at which [`Self::cut_to_k`] cuts: 0 for `k = n`.
    pub fn height_for_k(&self, k: usize) -> Result<f64> {
        if k == 0 || k > self.n_items {
            return Err(Error::InvalidCut {
                requested: k,
                n_items: self.n_items,
            });
        }
        let n_merges = self.n_items - k;
        Ok(if n_merges == 0 {
            0.0
        } else {
            self.merges[n_merges - 1].height
        })
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// How many merge heights were lifted to keep heights non-decreasing.
    pub fn clamped_merges(&self) -> usize {
        self.clamped_merges
    }

    /// Iterate over merges in construction order.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge list for export.
    pub fn merge_records(&self) -> &[Merge] {
        &self.merges
    }

    /// Merge heights in construction order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.height).collect()
    }

    /// Sorted distinct merge heights: the candidate cut points.
    pub fn distinct_heights(&self) -> Vec<f64> {
        let mut heights = self.heights();
        heights.sort_by(f64::total_cmp);
        heights.dedup();
        heights
    }

    /// Height of the root, or 0 for a single leaf.
    pub fn max_height(&self) -> f64 {
        self.merges.last().map_or(0.0, |m| m.height)
    }

    /// True if merge heights never decrease.
    pub fn is_monotone(&self) -> bool {
        self.merges.windows(2).all(|w| w[0].height <= w[1].height)
    }

    /// Leaves in left-to-right drawing order.
    pub fn leaf_order(&self) -> Vec<usize> {
        let n = self.n_items;
        if self.merges.is_empty() {
            return (0..n).collect();
        }
        let mut order = Vec::with_capacity(n);
        let mut stack = vec![n + self.merges.len() - 1];
        while let Some(node) = stack.pop() {
            if node < n {
                order.push(node);
            } else {
                let m = &self.merges[node - n];
                stack.push(m.right);
                stack.push(m.left);
            }
        }
        order
    }
}

fn find_root(parent: &mut [usize], node: usize) -> usize {
    let mut root = node;
    while parent[root] != root {
        root = parent[root];
    }
    let mut cur = node;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn merge(left: usize, right: usize, height: f64, size: usize) -> Merge {
        Merge {
            left,
            right,
            height,
            size,
        }
    }

    /// ```text
    ///         6 (1.0)
    ///        / \
    ///  (0.5)4   5 (0.7)
    ///      / \ / \
    ///     0  1 2  3
    /// ```
    fn four_leaves() -> Dendrogram {
        let merges = [merge(0, 1, 0.5, 2), merge(2, 3, 0.7, 2), merge(4, 5, 1.0, 4)];
        Dendrogram::from_merge_records(4, &merges).unwrap()
    }

    #[test]
    fn test_cut_at_height() {
        let d = four_leaves();
        assert_eq!(d.cut_at_height(0.0).n_clusters(), 4);
        assert_eq!(d.cut_at_height(0.5).assignments(), &[1, 1, 2, 3]);
        assert_eq!(d.cut_at_height(0.8).assignments(), &[1, 1, 2, 2]);
        assert_eq!(d.cut_at_height(d.max_height()).n_clusters(), 1);
    }

    #[test]
    fn test_cut_to_k() {
        let d = four_leaves();
        assert_eq!(d.cut_to_k(4).unwrap().n_clusters(), 4);
        assert_eq!(d.cut_to_k(2).unwrap().assignments(), &[1, 1, 2, 2]);
        assert_eq!(d.cut_to_k(1).unwrap().n_clusters(), 1);
        assert_eq!(d.height_for_k(2).unwrap(), 0.7);
        assert_eq!(d.height_for_k(4).unwrap(), 0.0);
    }

    #[test]
    fn test_cut_to_k_out_of_range() {
        let d = four_leaves();
        assert!(matches!(d.cut_to_k(0), Err(Error::InvalidCut { requested: 0, n_items: 4 })));
        assert!(matches!(d.cut_to_k(5), Err(Error::InvalidCut { requested: 5, n_items: 4 })));
        assert!(d.height_for_k(5).is_err());
    }

    #[test]
    fn test_cut_to_k_inside_plateau() {
        let merges = [merge(0, 1, 1.0, 2), merge(3, 2, 1.0, 3)];
        let d = Dendrogram::from_merge_records(3, &merges).unwrap();
        // No height yields two clusters, but walking merges does.
        assert_eq!(d.cut_to_k(2).unwrap().assignments(), &[1, 1, 2]);
        assert_eq!(d.distinct_heights(), vec![1.0]);
    }

    #[test]
    fn test_push_merge_clamps() {
        let mut d = Dendrogram::new(3);
        d.push_merge(0, 1, 1.0, 2);
        d.push_merge(3, 2, 1.0 - 1e-15, 3);
        assert_eq!(d.clamped_merges(), 1);
        assert!(d.is_monotone());
        assert_eq!(d.max_height(), 1.0);
    }

    #[test]
    fn test_from_merge_records_rejects_bad_trees() {
        let bad_ref = [merge(0, 3, 1.0, 2), merge(1, 2, 1.0, 2)];
        assert!(matches!(
            Dendrogram::from_merge_records(3, &bad_ref),
            Err(Error::InvalidDendrogram(_))
        ));
        let reused = [merge(0, 1, 1.0, 2), merge(0, 2, 2.0, 2)];
        assert!(Dendrogram::from_merge_records(3, &reused).is_err());
        let decreasing = [merge(0, 1, 2.0, 2), merge(3, 2, 1.0, 3)];
        assert!(Dendrogram::from_merge_records(3, &decreasing).is_err());
        let wrong_size = [merge(0, 1, 1.0, 3), merge(3, 2, 2.0, 3)];
        assert!(Dendrogram::from_merge_records(3, &wrong_size).is_err());
        assert!(matches!(
            Dendrogram::from_merge_records(3, &wrong_size[..1]),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_leaf_order() {
        let merges = [merge(1, 3, 0.1, 2), merge(0, 2, 0.2, 2), merge(5, 4, 0.9, 4)];
        let d = Dendrogram::from_merge_records(4, &merges).unwrap();
        assert_eq!(d.leaf_order(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_merge_export_shape() {
        let d = four_leaves();
        let json = serde_json::to_value(d.merge_records()).unwrap();
        assert_eq!(json[2]["left"], 4);
        assert_eq!(json[2]["height"], 1.0);
    }
}
