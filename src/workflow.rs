//! End-to-end dendrogram analysis of a labelled sample set.
//!
//! ```text
//! samples ─► distances ─► dendrogram ─► cut (k | height | best-cut search)
//!                                          │
//!                     contingency table ◄──┴──► partition ─► curation
//! ```

use serde::Serialize;

use crate::cluster::HierarchicalClustering;
use crate::config::DendroConfig;
use crate::curation::{curate, CuratedSamples, CurationPolicy};
use crate::distance::DistanceMatrix;
use crate::error::Result;
use crate::hierarchy::{cophenetic_correlation, Dendrogram};
use crate::metrics::{ContingencyTable, ValidityScore};
use crate::partition::Partition;
use crate::sample::SampleCollection;
use crate::search::{BestCutSearch, CutEvaluation};

/// Everything derived from one run of the workflow.
#[derive(Debug, Clone, Serialize)]
pub struct DendroAnalysis {
    /// Merge tree over the samples.
    pub dendrogram: Dendrogram,
    /// Height the final partition was cut at.
    pub height: f64,
    /// Final partition.
    pub partition: Partition,
    /// Validity of the final partition.
    pub score: ValidityScore,
    /// Scores of all candidate heights; empty when the cut was fixed.
    pub evaluations: Vec<CutEvaluation>,
    /// Labels × clusters of the final partition.
    pub contingency: ContingencyTable,
    /// Correlation between input and cophenetic distances, if defined.
    pub cophenetic_correlation: Option<f64>,
}

impl DendroAnalysis {
    /// Number of clusters in the final partition.
    pub fn n_clusters(&self) -> usize {
        self.partition.n_clusters()
    }

    /// Apply a curation policy to the samples this analysis was built from.
    pub fn curate(
        &self,
        samples: &SampleCollection,
        policy: &CurationPolicy,
    ) -> Result<CuratedSamples> {
        curate(samples, &self.partition, policy)
    }
}

/// Cluster samples and pick a cut as configured.
///
/// Without a fixed `k` or `height` the cut maximizing `config.index` is used.
pub fn analyze(samples: &SampleCollection, config: &DendroConfig) -> Result<DendroAnalysis> {
    config.validate()?;
    let labels = samples.labels();

    let distances = DistanceMatrix::from_samples(samples, config.distance)?;
    let dendrogram = HierarchicalClustering::new()
        .with_linkage(config.linkage)
        .fit_dendrogram(&distances)?;
    let cophenetic = cophenetic_correlation(&dendrogram, &distances)?;

    let search = BestCutSearch::new(config.index);
    let (height, partition, evaluations) = match (config.k, config.height) {
        (Some(k), _) => (dendrogram.height_for_k(k)?, dendrogram.cut_to_k(k)?, Vec::new()),
        (None, Some(h)) => (h, dendrogram.cut_at_height(h), Vec::new()),
        (None, None) => {
            let evaluations = search.evaluate(&dendrogram, &labels)?;
            let best = search.select(&dendrogram, &evaluations)?;
            (best.height, best.partition, evaluations)
        }
    };

    let contingency = ContingencyTable::new(&partition, &labels)?;
    let score = contingency.score(config.index);
    tracing::info!(
        n_samples = samples.len(),
        linkage = ?config.linkage,
        height,
        n_clusters = partition.n_clusters(),
        score = score.value,
        degenerate = score.degenerate,
        "dendrogram analysis complete"
    );

    Ok(DendroAnalysis {
        dendrogram,
        height,
        partition,
        score,
        evaluations,
        contingency,
        cophenetic_correlation: cophenetic,
    })
}
