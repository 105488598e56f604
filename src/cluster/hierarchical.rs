//! Hierarchical (agglomerative) clustering.
//!
//! Bottom-up clustering that builds a **dendrogram** by iteratively
//! merging the closest clusters. You don't need to specify k in
//! advance: cut the tree at any height.
//!
//! # Linkage Methods
//!
//! The key choice: how do we define "distance between clusters"?
//!
//! | Linkage | Formula | Effect |
//! |---------|---------|--------|
//! | Single | min(d(a,b)) for a∈A, b∈B | Chaining; elongated clusters |
//! | Complete | max(d(a,b)) | Compact, spherical clusters |
//! | Average | mean(d(a,b)) | Balanced compromise |
//! | Ward | Δ variance | Minimizes within-cluster variance |
//!
//! After each merge the distances from the new cluster to every other one
//! are derived from the old ones with the Lance–Williams recurrence:
//!
//! ```text
//! d(k, i∪j) = αᵢ d(k,i) + αⱼ d(k,j) + β d(i,j) + γ |d(k,i) − d(k,j)|
//! ```
//!
//! ## Ward's Method
//!
//! Ward works on squared distances. Merge heights are reported as square
//! roots so that they stay on the scale of the input distances:
//!
//! ```text
//! Δ(A,B) = (nₐ × nᵦ)/(nₐ + nᵦ) × ||μₐ - μᵦ||²
//! ```
//!
//! # Determinism
//!
//! The closest pair is found by a full scan in ascending order of each
//! cluster's lowest sample index, keeping the first pair on ties. The same
//! matrix and linkage always give the same tree. The scan costs O(n²) per
//! merge, O(n³) overall, which suits sample sets of a few thousand.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::distance::{DistanceMatrix, SeriesDistance};
use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use crate::sample::SampleCollection;

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage (UPGMA): mean distance between clusters.
    Average,
    /// Ward's method: minimize within-cluster variance.
    #[default]
    Ward,
}

impl Linkage {
    /// Distance from cluster `k` to the union of `i` and `j`.
    ///
    /// `d_ki`, `d_kj`, `d_ij` are working distances (squared for Ward).
    #[inline]
    fn update(self, d_ki: f64, d_kj: f64, d_ij: f64, n_i: usize, n_j: usize, n_k: usize) -> f64 {
        match self {
            Linkage::Single => d_ki.min(d_kj),
            Linkage::Complete => d_ki.max(d_kj),
            Linkage::Average => {
                let (n_i, n_j) = (n_i as f64, n_j as f64);
                (n_i * d_ki + n_j * d_kj) / (n_i + n_j)
            }
            Linkage::Ward => {
                let (n_i, n_j, n_k) = (n_i as f64, n_j as f64, n_k as f64);
                let total = n_i + n_j + n_k;
                ((n_i + n_k) * d_ki + (n_j + n_k) * d_kj - n_k * d_ij) / total
            }
        }
    }

    fn to_working(self, d: f64) -> f64 {
        match self {
            Linkage::Ward => d * d,
            _ => d,
        }
    }

    fn to_height(self, w: f64) -> f64 {
        match self {
            Linkage::Ward => w.max(0.0).sqrt(),
            _ => w,
        }
    }
}

/// Hierarchical (agglomerative) clustering.
#[derive(Debug, Clone, Default)]
pub struct HierarchicalClustering {
    linkage: Linkage,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer with Ward linkage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Compute distances between samples and build their dendrogram.
    pub fn fit_samples(
        &self,
        samples: &SampleCollection,
        distance: SeriesDistance,
    ) -> Result<Dendrogram> {
        let matrix = DistanceMatrix::from_samples(samples, distance)?;
        self.fit_dendrogram(&matrix)
    }

    /// Fit and return the full dendrogram.
    pub fn fit_dendrogram(&self, distances: &DistanceMatrix) -> Result<Dendrogram> {
        let n = distances.n();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let linkage = self.linkage;

        let mut work: Array2<f64> = distances.as_array().mapv(|d| linkage.to_working(d));
        // Slot `s` holds the cluster whose lowest sample index is `s`.
        let mut active = vec![true; n];
        let mut node: Vec<usize> = (0..n).collect();
        let mut size = vec![1usize; n];
        let mut dendro = Dendrogram::new(n);

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in 0..n {
                if !active[i] {
                    continue;
                }
                for j in (i + 1)..n {
                    if !active[j] {
                        continue;
                    }
                    let d = work[(i, j)];
                    if best.map_or(true, |(_, _, b)| d < b) {
                        best = Some((i, j, d));
                    }
                }
            }
            let Some((i, j, d_ij)) = best else {
                break;
            };

            for k in 0..n {
                if !active[k] || k == i || k == j {
                    continue;
                }
                let updated =
                    linkage.update(work[(k, i)], work[(k, j)], d_ij, size[i], size[j], size[k]);
                work[(k, i)] = updated;
                work[(i, k)] = updated;
            }

            let merged_size = size[i] + size[j];
            dendro.push_merge(node[i], node[j], linkage.to_height(d_ij), merged_size);
            node[i] = n + step;
            size[i] = merged_size;
            active[j] = false;
        }

        if dendro.clamped_merges() > 0 {
            tracing::warn!(
                clamped = dendro.clamped_merges(),
                ?linkage,
                "merge heights decreased and were clamped to keep the dendrogram monotone"
            );
        }
        tracing::debug!(
            n_items = n,
            ?linkage,
            max_height = dendro.max_height(),
            "built dendrogram"
        );
        Ok(dendro)
    }
}
