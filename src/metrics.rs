//! External validity of a partition against ground-truth labels.
//!
//! Everything is derived from the label × cluster contingency table. Pair
//! counting indices classify each of the `M = C(N, 2)` sample pairs:
//!
//! | | same cluster | different cluster |
//! |---|---|---|
//! | **same label** | a | b |
//! | **different label** | c | d |
//!
//! # Indices
//!
//! | Index | Formula | Range |
//! |-------|---------|-------|
//! | [`ValidityIndex::Ari`] | `(a + d − E) / (M − E)` | [-1, 1] |
//! | [`ValidityIndex::Rand`] | `(a + d) / M` | [0, 1] |
//! | [`ValidityIndex::Jaccard`] | `a / (a + b + c)` | [0, 1] |
//! | [`ValidityIndex::FowlkesMallows`] | `a / sqrt((a + b)(a + c))` | [0, 1] |
//!
//! with `E = ((a + b)(a + c) + (c + d)(b + d)) / M`, the agreement expected
//! by chance for the same cluster and label sizes.
//!
//! A zero denominator does not fail: the score is reported as `0.0` with
//! [`ValidityScore::degenerate`] set.
//!
//! # Example
//!
//! ```rust
//! use sitsclust::metrics::{ari, purity};
//!
//! let pred = [0, 0, 1, 1, 2, 2];
//! let truth = [0, 0, 0, 1, 1, 1];
//!
//! let ari_score = ari(&pred, &truth);
//! let purity_score = purity(&pred, &truth);
//! assert!(ari_score < 1.0);
//! assert!((purity_score - 5.0 / 6.0).abs() < 1e-12);
//! ```
//!
//! # References
//!
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Fowlkes & Mallows (1983). "A method for comparing two hierarchical clusterings"

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partition::Partition;

/// Which external validity index to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityIndex {
    /// Adjusted Rand Index.
    #[default]
    Ari,
    /// Rand Index.
    Rand,
    /// Jaccard index over same-cluster pairs.
    Jaccard,
    /// Fowlkes–Mallows index.
    FowlkesMallows,
}

/// A validity index value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValidityScore {
    /// Index that produced the value.
    pub index: ValidityIndex,
    /// Score; `0.0` when degenerate.
    pub value: f64,
    /// The index denominator was zero and `value` is a sentinel.
    pub degenerate: bool,
}

impl ValidityScore {
    fn of(index: ValidityIndex, numerator: f64, denominator: f64, scale: f64) -> Self {
        if denominator.abs() <= f64::EPSILON * scale.max(1.0) {
            tracing::warn!(?index, "validity index denominator is zero");
            return Self {
                index,
                value: 0.0,
                degenerate: true,
            };
        }
        Self {
            index,
            value: numerator / denominator,
            degenerate: false,
        }
    }
}

/// Pair counts between a partition and ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairCounts {
    /// Same label, same cluster.
    pub a: u64,
    /// Same label, different cluster.
    pub b: u64,
    /// Different label, same cluster.
    pub c: u64,
    /// Different label, different cluster.
    pub d: u64,
}

impl PairCounts {
    /// Total number of pairs, `C(N, 2)`.
    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// Compute an index from the pair counts.
    pub fn score(&self, index: ValidityIndex) -> ValidityScore {
        let (a, b, c, d) = (self.a as f64, self.b as f64, self.c as f64, self.d as f64);
        let m = self.total() as f64;
        match index {
            ValidityIndex::Ari => {
                if m == 0.0 {
                    return ValidityScore::of(index, 0.0, 0.0, 1.0);
                }
                let expected = ((a + b) * (a + c) + (c + d) * (b + d)) / m;
                ValidityScore::of(index, a + d - expected, m - expected, m)
            }
            ValidityIndex::Rand => ValidityScore::of(index, a + d, m, 1.0),
            ValidityIndex::Jaccard => ValidityScore::of(index, a, a + b + c, 1.0),
            ValidityIndex::FowlkesMallows => {
                ValidityScore::of(index, a, ((a + b) * (a + c)).sqrt(), 1.0)
            }
        }
    }
}

/// Label × cluster counts.
///
/// Rows are the distinct labels in sorted order; column `c - 1` is cluster `c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    labels: Vec<String>,
    counts: Array2<usize>,
}

impl ContingencyTable {
    /// Cross-tabulate a partition with one label per sample.
    pub fn new<S: AsRef<str>>(partition: &Partition, labels: &[S]) -> Result<Self> {
        if labels.len() != partition.n_items() {
            return Err(Error::DimensionMismatch {
                expected: partition.n_items(),
                found: labels.len(),
            });
        }
        let mut rows: BTreeMap<&str, usize> = BTreeMap::new();
        for l in labels {
            rows.entry(l.as_ref()).or_insert(0);
        }
        for (i, row) in rows.values_mut().enumerate() {
            *row = i;
        }

        let mut counts = Array2::<usize>::zeros((rows.len(), partition.n_clusters()));
        for (label, &cluster) in labels.iter().zip(partition.assignments()) {
            counts[(rows[label.as_ref()], cluster - 1)] += 1;
        }
        Ok(Self {
            labels: rows.keys().map(|l| l.to_string()).collect(),
            counts,
        })
    }

    /// Distinct labels, sorted.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of clusters (columns).
    pub fn n_clusters(&self) -> usize {
        self.counts.ncols()
    }

    /// Raw counts.
    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Samples with `label` in `cluster`.
    pub fn count(&self, label: &str, cluster: usize) -> usize {
        match (self.row_of(label), cluster.checked_sub(1)) {
            (Some(r), Some(c)) if c < self.n_clusters() => self.counts[(r, c)],
            _ => 0,
        }
    }

    fn row_of(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    /// Samples per label.
    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }

    /// Samples per cluster.
    pub fn col_sums(&self) -> Vec<usize> {
        self.counts.columns().into_iter().map(|c| c.sum()).collect()
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Most frequent label in a cluster; ties go to the label sorted first.
    pub fn dominant_label(&self, cluster: usize) -> Option<&str> {
        let col = self.column(cluster)?;
        let mut best: Option<(usize, usize)> = None;
        for (r, &n) in col.iter().enumerate() {
            if best.map_or(true, |(_, b)| n > b) {
                best = Some((r, n));
            }
        }
        best.map(|(r, _)| self.labels[r].as_str())
    }

    /// Share of a cluster's samples that carry its dominant label.
    pub fn cluster_purity(&self, cluster: usize) -> Option<f64> {
        let col = self.column(cluster)?;
        let size: usize = col.iter().sum();
        if size == 0 {
            return None;
        }
        let max = col.iter().copied().max().unwrap_or(0);
        Some(max as f64 / size as f64)
    }

    /// Fraction of all samples that carry their cluster's dominant label.
    pub fn purity(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = self
            .counts
            .columns()
            .into_iter()
            .map(|c| c.iter().copied().max().unwrap_or(0))
            .sum();
        correct as f64 / total as f64
    }

    /// Percentage of each cluster's samples per label (columns sum to 100).
    pub fn frequencies(&self) -> Array2<f64> {
        let sums = self.col_sums();
        let mut freq = Array2::<f64>::zeros(self.counts.dim());
        for ((r, c), &n) in self.counts.indexed_iter() {
            if sums[c] > 0 {
                freq[(r, c)] = 100.0 * n as f64 / sums[c] as f64;
            }
        }
        freq
    }

    /// Pair counts derived from the table.
    pub fn pair_counts(&self) -> PairCounts {
        let a: u64 = self.counts.iter().map(|&n| comb2(n)).sum();
        let same_label: u64 = self.row_sums().into_iter().map(comb2).sum();
        let same_cluster: u64 = self.col_sums().into_iter().map(comb2).sum();
        let all = comb2(self.total());
        let b = same_label - a;
        let c = same_cluster - a;
        PairCounts {
            a,
            b,
            c,
            d: all - a - b - c,
        }
    }

    /// Score the partition with an index.
    pub fn score(&self, index: ValidityIndex) -> ValidityScore {
        self.pair_counts().score(index)
    }

    fn column(&self, cluster: usize) -> Option<ndarray::ArrayView1<'_, usize>> {
        let c = cluster.checked_sub(1)?;
        (c < self.n_clusters()).then(|| self.counts.column(c))
    }
}

/// Adjusted Rand Index between two clusterings.
///
/// Returns 0 when lengths differ, inputs are empty, or the index is
/// undefined.
///
/// ```rust
/// use sitsclust::metrics::ari;
///
/// let pred = [0, 0, 1, 1];
/// let truth = [0, 0, 1, 1];
/// assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
/// ```
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    slice_score(pred, truth, ValidityIndex::Ari)
}

/// Rand Index between two clusterings.
pub fn rand_index(pred: &[usize], truth: &[usize]) -> f64 {
    slice_score(pred, truth, ValidityIndex::Rand)
}

/// Jaccard index between two clusterings.
pub fn jaccard(pred: &[usize], truth: &[usize]) -> f64 {
    slice_score(pred, truth, ValidityIndex::Jaccard)
}

/// Fowlkes-Mallows Index.
///
/// Geometric mean of precision and recall of pairwise cluster membership.
pub fn fowlkes_mallows(pred: &[usize], truth: &[usize]) -> f64 {
    slice_score(pred, truth, ValidityIndex::FowlkesMallows)
}

/// Purity of clustering with respect to ground truth.
///
/// Note: Purity increases with more clusters and is 1.0 when each point
/// is its own cluster. Use with caution.
pub fn purity(pred: &[usize], truth: &[usize]) -> f64 {
    slice_table(pred, truth).map_or(0.0, |t| t.purity())
}

fn slice_table(pred: &[usize], truth: &[usize]) -> Option<ContingencyTable> {
    if pred.len() != truth.len() || pred.is_empty() {
        return None;
    }
    let partition = Partition::from_groups(pred);
    let labels: Vec<String> = truth.iter().map(|t| t.to_string()).collect();
    ContingencyTable::new(&partition, &labels).ok()
}

fn slice_score(pred: &[usize], truth: &[usize], index: ValidityIndex) -> f64 {
    slice_table(pred, truth).map_or(0.0, |t| t.score(index).value)
}

fn comb2(n: usize) -> u64 {
    let n = n as u64;
    if n < 2 {
        0
    } else {
        n * (n - 1) / 2
    }
}
