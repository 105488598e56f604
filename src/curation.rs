//! Cleaning a labelled sample set with its cluster structure.
//!
//! Two policies, both driven by a `min_perc` share in `[0, 1]`:
//!
//! - [`CurationPolicy::Clean`] drops individual samples whose label is a
//!   minority inside their cluster (share of that label `< min_perc`). A
//!   threshold near 0 only catches true outliers.
//! - [`CurationPolicy::Remove`] drops whole clusters whose purity (share of
//!   the dominant label) is `< min_perc`. A threshold near 1 keeps only
//!   unambiguous clusters.
//!
//! Kept samples keep their original collection index.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::ContingencyTable;
use crate::partition::Partition;
use crate::sample::{Sample, SampleCollection};

/// How to filter samples given their clusters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum CurationPolicy {
    /// Drop samples whose own label's share in their cluster is below `min_perc`.
    Clean {
        /// Minimum share in `[0, 1]`.
        min_perc: f64,
    },
    /// Drop every sample of clusters whose purity is below `min_perc`.
    Remove {
        /// Minimum purity in `[0, 1]`.
        min_perc: f64,
    },
}

impl CurationPolicy {
    /// Threshold of either policy.
    pub fn min_perc(&self) -> f64 {
        match *self {
            CurationPolicy::Clean { min_perc } | CurationPolicy::Remove { min_perc } => min_perc,
        }
    }

    fn validate(&self) -> Result<()> {
        let p = self.min_perc();
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::invalid_parameter(
                "min_perc",
                format!("{p} is outside [0, 1]"),
            ));
        }
        Ok(())
    }
}

/// Non-fatal outcome worth the caller's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CurationWarning {
    /// The threshold removed every sample.
    AllSamplesRemoved,
}

/// A kept sample with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedSample {
    /// Index in the input collection.
    pub index: usize,
    /// Cluster the sample belonged to.
    pub cluster: usize,
    /// The sample itself.
    pub sample: Sample,
}

/// Result of applying a [`CurationPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedSamples {
    /// Kept samples in input order.
    pub samples: Vec<CuratedSample>,
    /// Input indices that were dropped, ascending.
    pub removed: Vec<usize>,
    /// Set when the result is empty.
    pub warning: Option<CurationWarning>,
}

impl CuratedSamples {
    /// Number of kept samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing was kept.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Input indices that were kept, ascending.
    pub fn kept_indices(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.index).collect()
    }

    /// Kept samples as a new collection, e.g. for classifier training.
    pub fn into_collection(self) -> Result<SampleCollection> {
        SampleCollection::new(self.samples.into_iter().map(|s| s.sample).collect())
    }
}

/// Apply a curation policy to samples grouped by `partition`.
pub fn curate(
    samples: &SampleCollection,
    partition: &Partition,
    policy: &CurationPolicy,
) -> Result<CuratedSamples> {
    policy.validate()?;
    if samples.len() != partition.n_items() {
        return Err(Error::DimensionMismatch {
            expected: partition.n_items(),
            found: samples.len(),
        });
    }
    let labels = samples.labels();
    let table = ContingencyTable::new(partition, &labels)?;
    let sizes = partition.sizes();

    let keep = |label: &str, cluster: usize| -> bool {
        match *policy {
            CurationPolicy::Clean { min_perc } => {
                let share = table.count(label, cluster) as f64 / sizes[cluster - 1] as f64;
                share >= min_perc
            }
            CurationPolicy::Remove { min_perc } => {
                table.cluster_purity(cluster).unwrap_or(0.0) >= min_perc
            }
        }
    };

    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (index, (sample, &cluster)) in samples.iter().zip(partition.assignments()).enumerate() {
        if keep(&sample.label, cluster) {
            kept.push(CuratedSample {
                index,
                cluster,
                sample: sample.clone(),
            });
        } else {
            removed.push(index);
        }
    }

    let warning = if kept.is_empty() && !samples.is_empty() {
        tracing::warn!(?policy, n_samples = samples.len(), "curation removed every sample");
        Some(CurationWarning::AllSamplesRemoved)
    } else {
        None
    };
    tracing::info!(
        ?policy,
        kept = kept.len(),
        removed = removed.len(),
        "curated samples"
    );

    Ok(CuratedSamples {
        samples: kept,
        removed,
        warning,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sample::fixtures::{collection, ndvi};

    /// Cluster 1: A A A A A A A A A A (purity 1.0)
    /// Cluster 2: A A B B             (purity 0.5)
    /// Cluster 3: B x9, C x1          (purity 0.9)
    fn fixture() -> (SampleCollection, Partition) {
        let mut labels = Vec::new();
        let mut groups = Vec::new();
        labels.extend(["A"; 10]);
        groups.extend([0; 10]);
        labels.extend(["A", "A", "B", "B"]);
        groups.extend([1; 4]);
        labels.extend(["B"; 9]);
        labels.push("C");
        groups.extend([2; 10]);
        let samples = collection(labels.iter().map(|l| ndvi(l, &[0.5, 0.6])).collect());
        (samples, Partition::from_groups(&groups))
    }

    #[test]
    fn test_remove_impure_cluster() {
        let (samples, partition) = fixture();
        let out = curate(&samples, &partition, &CurationPolicy::Remove { min_perc: 0.9 }).unwrap();
        assert_eq!(out.removed, vec![10, 11, 12, 13]);
        assert_eq!(out.len(), 20);
        assert!(out.samples.iter().all(|s| s.cluster != 2));
        assert_eq!(out.warning, None);
    }

    #[test]
    fn test_clean_minority_samples() {
        let (samples, partition) = fixture();
        let out = curate(&samples, &partition, &CurationPolicy::Clean { min_perc: 0.2 }).unwrap();
        // Only the lone C in cluster 3 (share 0.1) goes.
        assert_eq!(out.removed, vec![23]);
        assert_eq!(out.kept_indices().len(), 23);
        assert_eq!(out.samples[22].index, 22);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let (samples, partition) = fixture();
        for policy in [
            CurationPolicy::Clean { min_perc: 0.0 },
            CurationPolicy::Remove { min_perc: 0.0 },
        ] {
            let out = curate(&samples, &partition, &policy).unwrap();
            assert!(out.removed.is_empty());
        }
    }

    #[test]
    fn test_everything_removed_is_a_warning() {
        let samples = collection(vec![ndvi("A", &[0.1]), ndvi("B", &[0.2])]);
        let partition = Partition::from_groups(&[0, 0]);
        let out = curate(&samples, &partition, &CurationPolicy::Remove { min_perc: 1.0 }).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.warning, Some(CurationWarning::AllSamplesRemoved));
        assert!(out.into_collection().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_threshold() {
        let (samples, partition) = fixture();
        let policy = CurationPolicy::Clean { min_perc: 1.5 };
        let err = curate(&samples, &partition, &policy).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "min_perc", .. }));
    }

    #[test]
    fn test_size_mismatch() {
        let (samples, _) = fixture();
        let partition = Partition::from_groups(&[0, 1]);
        assert!(matches!(
            curate(&samples, &partition, &CurationPolicy::Clean { min_perc: 0.1 }),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_curated_collection_keeps_labels() {
        let (samples, partition) = fixture();
        let out = curate(&samples, &partition, &CurationPolicy::Remove { min_perc: 0.95 }).unwrap();
        let kept = out.into_collection().unwrap();
        assert_eq!(kept.len(), 10);
        assert_eq!(kept.label_counts().len(), 1);
    }
}
