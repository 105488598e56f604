//! # sitsclust
//!
//! Dendrogram-based quality control for labelled satellite image time series
//! samples: compare samples pairwise, build an agglomerative merge tree, find
//! the cut that best agrees with the ground-truth labels, and drop samples or
//! clusters whose labels the structure does not support.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sitsclust::{analyze, CurationPolicy, DendroConfig, Observation, Sample, SampleCollection};
//!
//! let day = |d: u32| NaiveDate::from_ymd_opt(2021, 1, d).unwrap();
//! let sample = |label: &str, v: [f64; 3]| Sample {
//!     longitude: -55.0,
//!     latitude: -11.0,
//!     start_date: day(1),
//!     end_date: day(3),
//!     label: label.into(),
//!     bands: vec!["NDVI".into()],
//!     time_series: (0..3).map(|t| Observation::new(day(t as u32 + 1), vec![v[t]])).collect(),
//! };
//!
//! let samples = SampleCollection::new(vec![
//!     sample("Forest", [0.80, 0.82, 0.81]),
//!     sample("Forest", [0.79, 0.81, 0.80]),
//!     sample("Pasture", [0.30, 0.55, 0.35]),
//!     sample("Pasture", [0.32, 0.57, 0.33]),
//! ])
//! .unwrap();
//!
//! let analysis = analyze(&samples, &DendroConfig::default()).unwrap();
//! assert_eq!(analysis.n_clusters(), 2);
//!
//! let curated = analysis
//!     .curate(&samples, &CurationPolicy::Remove { min_perc: 0.9 })
//!     .unwrap();
//! assert_eq!(curated.len(), 4);
//! ```
//!
//! With the default `parallel` feature, distance rows and candidate cuts are
//! evaluated on the rayon thread pool.

pub mod cluster;
pub mod config;
pub mod curation;
pub mod distance;
/// Error types used across `sitsclust`.
pub mod error;
pub mod hierarchy;
pub mod metrics;
pub mod partition;
pub mod sample;
pub mod search;
pub mod workflow;


pub use cluster::{HierarchicalClustering, Linkage};
pub use config::DendroConfig;
pub use curation::{curate, CuratedSample, CuratedSamples, CurationPolicy, CurationWarning};
pub use distance::{DistanceMatrix, SeriesDistance};
pub use error::{Error, Result};
pub use hierarchy::{Dendrogram, Merge};
pub use metrics::{
    ari, fowlkes_mallows, jaccard, purity, rand_index, ContingencyTable, PairCounts,
    ValidityIndex, ValidityScore,
};
pub use partition::{Partition, PartitionRecord};
pub use sample::{Observation, Sample, SampleCollection};
pub use search::{BestCut, BestCutSearch, CutEvaluation};
pub use workflow::{analyze, DendroAnalysis};
