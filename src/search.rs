//! Best-cut search: choose the dendrogram height that best agrees with the
//! ground-truth labels.
//!
//! Every distinct merge height is a candidate. Each candidate is cut,
//! cross-tabulated against the labels and scored; the highest score wins,
//! with ties going to the coarser partition (fewer clusters), then to the
//! lower height.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::hierarchy::Dendrogram;
use crate::metrics::{ContingencyTable, ValidityIndex, ValidityScore};
use crate::partition::Partition;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Score of one candidate cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CutEvaluation {
    /// Cut height.
    pub height: f64,
    /// Clusters at that height.
    pub n_clusters: usize,
    /// Validity of the resulting partition.
    pub score: ValidityScore,
}

impl CutEvaluation {
    /// Preference order: higher score, then fewer clusters, then lower height.
    fn preference(&self, other: &Self) -> Ordering {
        self.score
            .value
            .total_cmp(&other.score.value)
            .then_with(|| other.n_clusters.cmp(&self.n_clusters))
            .then_with(|| other.height.total_cmp(&self.height))
    }
}

/// The winning cut.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestCut {
    /// Cut height.
    pub height: f64,
    /// Number of clusters.
    pub n_clusters: usize,
    /// Validity score at this height.
    pub score: ValidityScore,
    /// Partition at this height.
    pub partition: Partition,
}

/// Sweep of candidate cut heights scored by an external validity index.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestCutSearch {
    index: ValidityIndex,
}

impl BestCutSearch {
    /// Create a search that maximizes `index`.
    pub fn new(index: ValidityIndex) -> Self {
        Self { index }
    }

    /// Index being maximized.
    pub fn index(&self) -> ValidityIndex {
        self.index
    }

    fn candidates(dendrogram: &Dendrogram) -> Vec<f64> {
        let heights = dendrogram.distinct_heights();
        if heights.is_empty() {
            vec![0.0]
        } else {
            heights
        }
    }

    fn evaluate_at<S: AsRef<str> + Sync>(
        &self,
        dendrogram: &Dendrogram,
        labels: &[S],
        height: f64,
    ) -> Result<CutEvaluation> {
        let partition = dendrogram.cut_at_height(height);
        let table = ContingencyTable::new(&partition, labels)?;
        Ok(CutEvaluation {
            height,
            n_clusters: partition.n_clusters(),
            score: table.score(self.index),
        })
    }

    fn check_labels<S>(dendrogram: &Dendrogram, labels: &[S]) -> Result<()> {
        if labels.len() != dendrogram.n_items() {
            return Err(Error::DimensionMismatch {
                expected: dendrogram.n_items(),
                found: labels.len(),
            });
        }
        Ok(())
    }

    /// Score every distinct merge height, in ascending height order.
    ///
    /// A dendrogram without merges (one sample) is scored at height 0.
    pub fn evaluate<S: AsRef<str> + Sync>(
        &self,
        dendrogram: &Dendrogram,
        labels: &[S],
    ) -> Result<Vec<CutEvaluation>> {
        Self::check_labels(dendrogram, labels)?;
        let heights = Self::candidates(dendrogram);

        #[cfg(feature = "parallel")]
        let evaluations: Result<Vec<CutEvaluation>> = heights
            .par_iter()
            .map(|&h| self.evaluate_at(dendrogram, labels, h))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let evaluations: Result<Vec<CutEvaluation>> = heights
            .iter()
            .map(|&h| self.evaluate_at(dendrogram, labels, h))
            .collect();

        let evaluations = evaluations?;
        let degenerate = evaluations.iter().filter(|e| e.score.degenerate).count();
        if degenerate > 0 {
            tracing::warn!(
                degenerate,
                candidates = evaluations.len(),
                "some candidate cuts have a degenerate validity score"
            );
        }
        Ok(evaluations)
    }

    /// Height maximizing the index, with its partition.
    pub fn run<S: AsRef<str> + Sync>(
        &self,
        dendrogram: &Dendrogram,
        labels: &[S],
    ) -> Result<BestCut> {
        Self::check_labels(dendrogram, labels)?;
        let heights = Self::candidates(dendrogram);

        #[cfg(feature = "parallel")]
        let best = heights
            .par_iter()
            .map(|&h| self.evaluate_at(dendrogram, labels, h))
            .try_reduce_with(|x, y| Ok(pick(x, y)));
        #[cfg(not(feature = "parallel"))]
        let best = heights
            .iter()
            .map(|&h| self.evaluate_at(dendrogram, labels, h))
            .try_fold(None, |acc: Option<CutEvaluation>, e| {
                e.map(|e| Some(acc.map_or(e, |a| pick(a, e))))
            })
            .transpose();

        let best = best.ok_or(Error::EmptyInput)??;
        Ok(self.finish(dendrogram, best, heights.len()))
    }

    /// Best cut among already scored candidates, e.g. from [`Self::evaluate`].
    ///
    /// Applies the same preference as [`Self::run`] and cuts only the winning
    /// height.
    pub fn select(
        &self,
        dendrogram: &Dendrogram,
        evaluations: &[CutEvaluation],
    ) -> Result<BestCut> {
        let best = evaluations
            .iter()
            .copied()
            .reduce(pick)
            .ok_or(Error::EmptyInput)?;
        Ok(self.finish(dendrogram, best, evaluations.len()))
    }

    fn finish(&self, dendrogram: &Dendrogram, best: CutEvaluation, candidates: usize) -> BestCut {
        tracing::info!(
            index = ?self.index,
            height = best.height,
            n_clusters = best.n_clusters,
            score = best.score.value,
            candidates,
            "selected best cut"
        );
        BestCut {
            height: best.height,
            n_clusters: best.n_clusters,
            score: best.score,
            partition: dendrogram.cut_at_height(best.height),
        }
    }
}

fn pick(a: CutEvaluation, b: CutEvaluation) -> CutEvaluation {
    if b.preference(&a) == Ordering::Greater {
        b
    } else {
        a
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cluster::{HierarchicalClustering, Linkage};
    use crate::distance::DistanceMatrix;
    use crate::hierarchy::Merge;
    use proptest::prelude::*;

    fn line(xs: &[f64], linkage: Linkage) -> Dendrogram {
        let n = xs.len();
        let mut condensed = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                condensed.push((xs[i] - xs[j]).abs());
            }
        }
        let d = DistanceMatrix::from_condensed(n, &condensed).unwrap();
        HierarchicalClustering::new()
            .with_linkage(linkage)
            .fit_dendrogram(&d)
            .unwrap()
    }

    #[test]
    fn test_finds_label_aligned_cut() {
        let d = line(&[0.0, 0.2, 0.4, 10.0, 10.1, 10.3], Linkage::Average);
        let labels = ["A", "A", "A", "B", "B", "B"];
        let best = BestCutSearch::default().run(&d, &labels).unwrap();
        assert_eq!(best.n_clusters, 2);
        assert!((best.score.value - 1.0).abs() < 1e-12);
        assert_eq!(best.partition.assignments(), &[1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_evaluates_every_distinct_height() {
        let d = line(&[0.0, 1.0, 3.0, 7.0, 15.0], Linkage::Single);
        let labels = ["A", "A", "B", "B", "C"];
        let evals = BestCutSearch::new(ValidityIndex::Rand)
            .evaluate(&d, &labels)
            .unwrap();
        assert_eq!(evals.len(), 4);
        let heights: Vec<f64> = evals.iter().map(|e| e.height).collect();
        assert_eq!(heights, vec![1.0, 2.0, 4.0, 8.0]);
        assert_eq!(evals.last().unwrap().n_clusters, 1);
    }

    #[test]
    fn test_ties_prefer_fewer_clusters() {
        // Every cut scores a degenerate 0 for a single label; the root wins.
        let d = line(&[0.0, 1.0, 3.0], Linkage::Single);
        let best = BestCutSearch::default().run(&d, &["A", "A", "A"]).unwrap();
        assert_eq!(best.n_clusters, 1);
        assert!(best.score.degenerate);
    }

    #[test]
    fn test_select_matches_run() {
        let d = line(&[0.0, 0.3, 4.0, 4.2, 9.0, 9.5, 9.7], Linkage::Complete);
        let labels = ["A", "A", "B", "B", "C", "C", "C"];
        for index in [ValidityIndex::Ari, ValidityIndex::Jaccard, ValidityIndex::Rand] {
            let search = BestCutSearch::new(index);
            let evals = search.evaluate(&d, &labels).unwrap();
            assert_eq!(search.select(&d, &evals).unwrap(), search.run(&d, &labels).unwrap());
        }
        assert!(matches!(
            BestCutSearch::default().select(&d, &[]),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_single_sample() {
        let d = Dendrogram::from_merge_records(1, &[]).unwrap();
        let best = BestCutSearch::default().run(&d, &["A"]).unwrap();
        assert_eq!(best.height, 0.0);
        assert_eq!(best.n_clusters, 1);
    }

    #[test]
    fn test_label_length_mismatch() {
        let merge = Merge {
            left: 0,
            right: 1,
            height: 1.0,
            size: 2,
        };
        let d = Dendrogram::from_merge_records(2, &[merge]).unwrap();
        assert!(matches!(
            BestCutSearch::default().run(&d, &["A"]),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    proptest! {
        #[test]
        fn search_is_deterministic_and_maximal(
            points in proptest::collection::vec((-50.0f64..50.0, 0usize..3), 2..30),
        ) {
            let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
            let labels: Vec<String> = points.iter().map(|p| format!("L{}", p.1)).collect();
            let d = line(&xs, Linkage::Ward);
            let search = BestCutSearch::default();

            let first = search.run(&d, &labels).unwrap();
            let second = search.run(&d, &labels).unwrap();
            prop_assert_eq!(&first, &second);

            let evals = search.evaluate(&d, &labels).unwrap();
            prop_assert_eq!(evals.len(), d.distinct_heights().len());
            prop_assert_eq!(&search.select(&d, &evals).unwrap(), &first);
            for e in &evals {
                prop_assert!(e.score.value <= first.score.value);
            }
        }
    }
}
