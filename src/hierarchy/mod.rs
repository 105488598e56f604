//! Dendrograms and the ultrametric they induce.
//!
//! Agglomerative clustering records its complete merge history:
//!
//! ```text
//!         6 (height=1.0)
//!        / \
//!       4   5 (height=0.7)
//!      / \ / \
//!     0  1 2  3 (leaves)
//! ```
//!
//! Cutting at a height keeps every merge at or below it; cutting to `k`
//! applies the first `n - k` merges. Both return a [`crate::Partition`].

mod dendrogram;
pub mod ultrametric;

pub use dendrogram::{Dendrogram, Merge};
pub use ultrametric::{cophenetic_correlation, cophenetic_matrix, is_ultrametric};
