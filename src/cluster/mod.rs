//! Agglomerative clustering of sample time series.
//!
//! Bottom-up: start with each sample as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! **dendrogram**, a binary tree you can cut at any height to get k clusters.
//!
//! **Linkage methods** determine "distance between clusters":
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact, spherical clusters |
//! | Average | mean(pairwise) | Balanced compromise |
//! | Ward | Variance increase | Minimizes within-cluster variance |
//!
//! ## Usage
//!
//! ```rust
//! use sitsclust::cluster::{HierarchicalClustering, Linkage};
//! use sitsclust::DistanceMatrix;
//!
//! // Two obvious groups on a line: {0, 1} and {10, 11}.
//! let d = DistanceMatrix::from_condensed(4, &[1.0, 10.0, 11.0, 9.0, 10.0, 1.0]).unwrap();
//! let dendro = HierarchicalClustering::new()
//!     .with_linkage(Linkage::Average)
//!     .fit_dendrogram(&d)
//!     .unwrap();
//!
//! let partition = dendro.cut_to_k(2).unwrap();
//! assert_eq!(partition.assignments(), &[1, 1, 2, 2]);
//! ```

mod hierarchical;

pub use hierarchical::{HierarchicalClustering, Linkage};
