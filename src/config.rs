//! Configuration of the dendrogram workflow.
//!
//! ```toml
//! linkage = "ward"
//! index = "ari"
//! # k = 6          # fixed number of clusters instead of searching
//! # height = 12.5  # fixed cut height instead of searching
//!
//! [distance]
//! kind = "dtw"
//! window = 3
//! ```

use serde::{Deserialize, Serialize};

use crate::cluster::Linkage;
use crate::distance::SeriesDistance;
use crate::error::{Error, Result};
use crate::metrics::ValidityIndex;

/// How a [`crate::workflow::DendroAnalysis`] is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DendroConfig {
    /// Linkage criterion.
    pub linkage: Linkage,
    /// Series dissimilarity.
    pub distance: SeriesDistance,
    /// Index maximized by the best-cut search.
    pub index: ValidityIndex,
    /// Cut into exactly this many clusters instead of searching.
    pub k: Option<usize>,
    /// Cut at this height instead of searching.
    pub height: Option<f64>,
}

impl Default for DendroConfig {
    fn default() -> Self {
        Self {
            linkage: Linkage::Ward,
            distance: SeriesDistance::default(),
            index: ValidityIndex::Ari,
            k: None,
            height: None,
        }
    }
}

impl DendroConfig {
    /// Create a configuration with defaults: Ward, unconstrained DTW, ARI.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Set series distance.
    pub fn with_distance(mut self, distance: SeriesDistance) -> Self {
        self.distance = distance;
        self
    }

    /// Set the index maximized by the search.
    pub fn with_index(mut self, index: ValidityIndex) -> Self {
        self.index = index;
        self
    }

    /// Cut into a fixed number of clusters.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Cut at a fixed height.
    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Check that the options are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.k.is_some() && self.height.is_some() {
            return Err(Error::invalid_parameter(
                "height",
                "`k` and `height` are mutually exclusive",
            ));
        }
        if let Some(h) = self.height {
            if !h.is_finite() || h < 0.0 {
                return Err(Error::invalid_parameter(
                    "height",
                    format!("{h} is not a finite non-negative height"),
                ));
            }
        }
        Ok(())
    }
}
