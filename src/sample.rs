//! Labelled time-series samples.
//!
//! A [`Sample`] is one ground-truth point: a location, the interval in which
//! its label is valid, and a band-by-time series of observations. A
//! [`SampleCollection`] is the ordered set handed over by whatever reads the
//! samples from files or remote services; the position of a sample in the
//! collection is its identity from then on.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One observation date with a value per band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Acquisition date.
    pub date: NaiveDate,
    /// One value per band, in the order of [`Sample::bands`].
    pub values: Vec<f64>,
}

impl Observation {
    /// Create an observation.
    pub fn new(date: NaiveDate, values: Vec<f64>) -> Self {
        Self { date, values }
    }
}

/// A labelled time series at a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// First day the label is valid.
    pub start_date: NaiveDate,
    /// Last day the label is valid.
    pub end_date: NaiveDate,
    /// Ground-truth class.
    pub label: String,
    /// Band names, e.g. `["NDVI", "EVI"]`.
    pub bands: Vec<String>,
    /// Observations ordered by date.
    pub time_series: Vec<Observation>,
}

impl Sample {
    /// Number of observation dates.
    pub fn n_times(&self) -> usize {
        self.time_series.len()
    }

    /// Time-major view of the series: `matrix[t][band]`.
    pub fn series_matrix(&self) -> Vec<&[f64]> {
        self.time_series.iter().map(|o| o.values.as_slice()).collect()
    }

    /// Values of a single band over time.
    pub fn band_values(&self, band: &str) -> Option<Vec<f64>> {
        let pos = self.bands.iter().position(|b| b == band)?;
        self.time_series
            .iter()
            .map(|o| o.values.get(pos).copied())
            .collect()
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("label is empty".into());
        }
        if self.start_date > self.end_date {
            return Err(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            ));
        }
        if self.bands.is_empty() {
            return Err("no bands".into());
        }
        if self.time_series.is_empty() {
            return Err("no observations".into());
        }
        let n_bands = self.bands.len();
        for obs in &self.time_series {
            if obs.values.len() != n_bands {
                return Err(format!(
                    "observation at {} has {} values for {} bands",
                    obs.date,
                    obs.values.len(),
                    n_bands
                ));
            }
            if obs.values.iter().any(|v| !v.is_finite()) {
                return Err(format!("observation at {} has a non-finite value", obs.date));
            }
        }
        Ok(())
    }
}

/// An ordered, validated set of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleCollection {
    samples: Vec<Sample>,
}

impl SampleCollection {
    /// Validate and wrap samples.
    ///
    /// Every sample must carry a non-empty label, a `start <= end` interval,
    /// at least one band and at least one observation, with one finite value
    /// per band in every observation.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        for (index, sample) in samples.iter().enumerate() {
            sample
                .check()
                .map_err(|reason| Error::InvalidSample { index, reason })?;
        }
        Ok(Self { samples })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `index`.
    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Iterate in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// All samples as a slice.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Ground-truth labels in collection order.
    pub fn labels(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.label.as_str()).collect()
    }

    /// Band names of the first sample.
    pub fn bands(&self) -> &[String] {
        self.samples.first().map(|s| s.bands.as_slice()).unwrap_or(&[])
    }

    /// Number of samples per label, sorted by label.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.samples {
            *counts.entry(s.label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a SampleCollection {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
