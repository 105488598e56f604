//! Hard assignment of samples to clusters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One row of an exported partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRecord {
    /// Sample index.
    pub sample: usize,
    /// Cluster id, starting at 1.
    pub cluster: usize,
}

/// A total, disjoint assignment of sample indices to cluster ids `1..=k`.
///
/// Cuts of a dendrogram number clusters in order of first appearance, so
/// sample 0 is always in cluster 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    assignments: Vec<usize>,
    n_clusters: usize,
}

impl Partition {
    /// Validate 1-based cluster ids: every id in `1..=max` must be used.
    pub fn from_assignments(assignments: Vec<usize>) -> Result<Self> {
        if assignments.is_empty() {
            return Err(Error::EmptyInput);
        }
        if let Some(pos) = assignments.iter().position(|&c| c == 0) {
            return Err(Error::InvalidPartition(format!(
                "sample {pos} has cluster id 0; ids start at 1"
            )));
        }
        let n_clusters = assignments.iter().copied().max().unwrap_or(0);
        if n_clusters > assignments.len() {
            return Err(Error::InvalidPartition(format!(
                "cluster id {n_clusters} exceeds the {} samples",
                assignments.len()
            )));
        }
        let mut seen = vec![false; n_clusters];
        for &c in &assignments {
            seen[c - 1] = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(Error::InvalidPartition(format!(
                "cluster {} has no members",
                missing + 1
            )));
        }
        Ok(Self {
            assignments,
            n_clusters,
        })
    }

    /// Renumber arbitrary group keys by first appearance.
    pub(crate) fn from_groups(groups: &[usize]) -> Self {
        let mut ids: HashMap<usize, usize> = HashMap::new();
        let assignments = groups
            .iter()
            .map(|&g| {
                let next = ids.len() + 1;
                *ids.entry(g).or_insert(next)
            })
            .collect();
        Self {
            assignments,
            n_clusters: ids.len(),
        }
    }

    /// Every sample in its own cluster.
    pub fn singletons(n: usize) -> Self {
        Self {
            assignments: (1..=n).collect(),
            n_clusters: n,
        }
    }

    /// Number of samples.
    pub fn n_items(&self) -> usize {
        self.assignments.len()
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Cluster id of a sample.
    pub fn cluster_of(&self, sample: usize) -> Option<usize> {
        self.assignments.get(sample).copied()
    }

    /// Cluster ids in sample order.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Sample indices in a cluster, ascending.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Size of each cluster; entry `c - 1` is the size of cluster `c`.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &c in &self.assignments {
            sizes[c - 1] += 1;
        }
        sizes
    }

    /// Export as `(sample, cluster)` rows.
    pub fn to_records(&self) -> Vec<PartitionRecord> {
        self.assignments
            .iter()
            .enumerate()
            .map(|(sample, &cluster)| PartitionRecord { sample, cluster })
            .collect()
    }

    /// Rebuild from exported rows; every sample `0..n` must appear exactly once.
    pub fn from_records(records: &[PartitionRecord]) -> Result<Self> {
        let n = records.len();
        let mut assignments = vec![0; n];
        for r in records {
            if r.sample >= n {
                return Err(Error::InvalidPartition(format!(
                    "sample index {} out of range for {n} records",
                    r.sample
                )));
            }
            if assignments[r.sample] != 0 {
                return Err(Error::InvalidPartition(format!(
                    "sample {} assigned twice",
                    r.sample
                )));
            }
            if r.cluster == 0 {
                return Err(Error::InvalidPartition(format!(
                    "sample {} has cluster id 0",
                    r.sample
                )));
            }
            assignments[r.sample] = r.cluster;
        }
        Self::from_assignments(assignments)
    }
}
