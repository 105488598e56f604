use thiserror::Error;

/// Result alias for `sitsclust`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by distance, clustering, cutting and curation primitives.
///
/// Degenerate validity scores and curation that empties the sample set are
/// not errors: they surface as flags on [`crate::ValidityScore`] and
/// [`crate::CuratedSamples`].
#[derive(Debug, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Length mismatch between two inputs that must align.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Found length.
        found: usize,
    },

    /// A sample violates the import contract.
    #[error("invalid sample {index}: {reason}")]
    InvalidSample {
        /// Position of the sample in the collection.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Samples cannot be compared: band sets or series lengths differ.
    #[error("incompatible series at sample {sample}: {reason}")]
    IncompatibleSeries {
        /// First sample that does not match sample 0.
        sample: usize,
        /// Which shape differs.
        reason: String,
    },

    /// Requested cluster count outside `1..=n_items`.
    #[error("cannot cut {n_items} items into {requested} clusters")]
    InvalidCut {
        /// Requested count.
        requested: usize,
        /// Number of leaves in the dendrogram.
        n_items: usize,
    },

    /// Distance matrix is not square, symmetric, finite and zero on the diagonal.
    #[error("invalid distance matrix: {0}")]
    InvalidDistanceMatrix(String),

    /// Merge records do not describe a binary merge tree.
    #[error("invalid dendrogram: {0}")]
    InvalidDendrogram(String),

    /// Cluster assignments are not a total partition with ids `1..=k`.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
