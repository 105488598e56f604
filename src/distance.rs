//! Pairwise dissimilarity between sample time series.
//!
//! All samples must share a band set and a number of observation dates (the
//! series are assumed already aligned to a common schedule). The result is a
//! symmetric N×N [`DistanceMatrix`] with a zero diagonal.
//!
//! | Distance | Local cost | Notes |
//! |----------|-----------|-------|
//! | Euclidean | squared band difference | lock-step, `sqrt` of the total |
//! | Manhattan | absolute band difference | lock-step |
//! | DTW | Euclidean distance across bands | elastic; optional Sakoe-Chiba band |

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sample::SampleCollection;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// How to compare two aligned multiband series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SeriesDistance {
    /// Euclidean distance over all (date, band) values.
    Euclidean,
    /// Sum of absolute differences over all (date, band) values.
    Manhattan,
    /// Dynamic time warping.
    Dtw {
        /// Maximum index offset between matched dates; `None` is unconstrained.
        window: Option<usize>,
    },
}

impl Default for SeriesDistance {
    fn default() -> Self {
        SeriesDistance::Dtw { window: None }
    }
}

impl SeriesDistance {
    /// Distance between two time-major series (`series[t][band]`).
    ///
    /// Every date must carry the same number of bands. The lock-step
    /// distances also need the same number of dates; DTW does not.
    pub fn between(&self, a: &[&[f64]], b: &[&[f64]]) -> Result<f64> {
        let width = a.first().or_else(|| b.first()).map_or(0, |row| row.len());
        if let Some(row) = a.iter().chain(b).find(|row| row.len() != width) {
            return Err(Error::DimensionMismatch {
                expected: width,
                found: row.len(),
            });
        }
        if !matches!(self, SeriesDistance::Dtw { .. }) && a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        Ok(match *self {
            SeriesDistance::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| squared_euclidean(x, y))
                .sum::<f64>()
                .sqrt(),
            SeriesDistance::Manhattan => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.iter().zip(y.iter()).map(|(p, q)| (p - q).abs()).sum::<f64>())
                .sum(),
            SeriesDistance::Dtw { window } => dtw(a, b, window),
        })
    }
}

#[inline]
fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Accumulated DTW cost with a rolling two-row table.
fn dtw(a: &[&[f64]], b: &[&[f64]], window: Option<usize>) -> f64 {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return 0.0;
    }
    // The band must at least cover the diagonal shift between lengths.
    let w = window.map_or(usize::MAX, |w| w.max(n.abs_diff(m)));

    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr.fill(f64::INFINITY);
        let lo = if w == usize::MAX { 1 } else { i.saturating_sub(w).max(1) };
        let hi = if w == usize::MAX { m } else { (i + w).min(m) };
        for j in lo..=hi {
            let cost = squared_euclidean(a[i - 1], b[j - 1]).sqrt();
            let best = prev[j - 1].min(prev[j]).min(curr[j - 1]);
            curr[j] = cost + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// Symmetric matrix of non-negative pairwise distances with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances between samples.
    ///
    /// Fails with [`Error::IncompatibleSeries`] when a sample's bands or
    /// number of dates differ from the first sample's.
    pub fn from_samples(samples: &SampleCollection, distance: SeriesDistance) -> Result<Self> {
        let first = samples.get(0).ok_or(Error::EmptyInput)?;
        for (idx, s) in samples.iter().enumerate().skip(1) {
            if s.bands != first.bands {
                return Err(Error::IncompatibleSeries {
                    sample: idx,
                    reason: format!("bands {:?} differ from {:?}", s.bands, first.bands),
                });
            }
            if s.n_times() != first.n_times() {
                return Err(Error::IncompatibleSeries {
                    sample: idx,
                    reason: format!(
                        "{} observations, expected {}",
                        s.n_times(),
                        first.n_times()
                    ),
                });
            }
        }

        let series: Vec<Vec<&[f64]>> = samples.iter().map(|s| s.series_matrix()).collect();
        let n = series.len();

        let row = |i: usize| -> Result<Vec<f64>> {
            ((i + 1)..n)
                .map(|j| distance.between(&series[i], &series[j]))
                .collect()
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f64>> = (0..n).into_par_iter().map(row).collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f64>> = (0..n).map(row).collect::<Result<_>>()?;

        let mut data = Array2::<f64>::zeros((n, n));
        for (i, upper) in rows.into_iter().enumerate() {
            for (offset, d) in upper.into_iter().enumerate() {
                let j = i + 1 + offset;
                data[(i, j)] = d;
                data[(j, i)] = d;
            }
        }

        tracing::debug!(n_samples = n, ?distance, "computed distance matrix");
        Self::from_array(data)
    }

    /// Wrap a precomputed square matrix after validating it.
    ///
    /// Off-diagonal pairs within `1e-9` of each other are averaged so the
    /// stored matrix is exactly symmetric.
    pub fn from_array(mut data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(Error::InvalidDistanceMatrix(format!(
                "matrix is {rows}x{cols}, expected square"
            )));
        }
        if rows == 0 {
            return Err(Error::EmptyInput);
        }
        for i in 0..rows {
            if data[(i, i)] != 0.0 {
                return Err(Error::InvalidDistanceMatrix(format!(
                    "diagonal entry {i} is {}",
                    data[(i, i)]
                )));
            }
            for j in (i + 1)..rows {
                let (x, y) = (data[(i, j)], data[(j, i)]);
                if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
                    return Err(Error::InvalidDistanceMatrix(format!(
                        "entry ({i}, {j}) is not a finite non-negative distance"
                    )));
                }
                if (x - y).abs() > SYMMETRY_TOLERANCE * x.abs().max(y.abs()).max(1.0) {
                    return Err(Error::InvalidDistanceMatrix(format!(
                        "entries ({i}, {j}) = {x} and ({j}, {i}) = {y} differ"
                    )));
                }
                let mean = 0.5 * (x + y);
                data[(i, j)] = mean;
                data[(j, i)] = mean;
            }
        }
        Ok(Self { data })
    }

    /// Build from a condensed upper triangle (row-major, length `n(n-1)/2`).
    pub fn from_condensed(n: usize, condensed: &[f64]) -> Result<Self> {
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                found: condensed.len(),
            });
        }
        let mut data = Array2::<f64>::zeros((n, n));
        let mut k = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                data[(i, j)] = condensed[k];
                data[(j, i)] = condensed[k];
                k += 1;
            }
        }
        Self::from_array(data)
    }

    /// Number of items.
    pub fn n(&self) -> usize {
        self.data.nrows()
    }

    /// Distance between items `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Underlying array.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Upper triangle, row-major.
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.n();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(self.data[(i, j)]);
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::sample::fixtures::{collection, ndvi};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    fn view(s: &[Vec<f64>]) -> Vec<&[f64]> {
        s.iter().map(|v| v.as_slice()).collect()
    }

    #[test]
    fn test_euclidean_and_manhattan() {
        let a = series(&[0.0, 0.0]);
        let b = series(&[3.0, 4.0]);
        let (a, b) = (view(&a), view(&b));
        assert!((SeriesDistance::Euclidean.between(&a, &b).unwrap() - 5.0).abs() < 1e-12);
        assert!((SeriesDistance::Manhattan.between(&a, &b).unwrap() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_between_rejects_mismatched_shapes() {
        let short = series(&[0.1, 0.2]);
        let long = series(&[0.1, 0.2, 0.3]);
        let (short, long) = (view(&short), view(&long));
        for distance in [SeriesDistance::Euclidean, SeriesDistance::Manhattan] {
            assert!(matches!(
                distance.between(&short, &long),
                Err(Error::DimensionMismatch { expected: 2, found: 3 })
            ));
        }
        // DTW aligns series of different lengths.
        assert!(SeriesDistance::default().between(&short, &long).is_ok());

        let (one_band, two_bands) = ([0.1], [0.1, 0.5]);
        let mixed: Vec<&[f64]> = vec![&one_band[..], &two_bands[..]];
        assert!(matches!(
            SeriesDistance::default().between(&short, &mixed),
            Err(Error::DimensionMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_dtw_absorbs_shift() {
        let a = series(&[0.0, 0.0, 1.0, 2.0, 1.0, 0.0]);
        let b = series(&[0.0, 1.0, 2.0, 1.0, 0.0, 0.0]);
        let (a, b) = (view(&a), view(&b));
        let dtw = SeriesDistance::Dtw { window: None }.between(&a, &b).unwrap();
        let lockstep = SeriesDistance::Dtw { window: Some(0) }.between(&a, &b).unwrap();
        assert!(dtw.abs() < 1e-12);
        assert!(lockstep > 0.0);
    }

    #[test]
    fn test_dtw_zero_window_is_pointwise() {
        let a = series(&[0.1, 0.5, 0.9]);
        let b = series(&[0.2, 0.3, 0.9]);
        let (a, b) = (view(&a), view(&b));
        let d = SeriesDistance::Dtw { window: Some(0) }.between(&a, &b).unwrap();
        assert!((d - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_from_samples_shape_checks() {
        let c = collection(vec![ndvi("A", &[0.1, 0.2]), ndvi("B", &[0.1, 0.2, 0.3])]);
        let err = DistanceMatrix::from_samples(&c, SeriesDistance::Euclidean).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSeries { sample: 1, .. }));

        let mut other = ndvi("B", &[0.1, 0.2]);
        other.bands = vec!["EVI".into()];
        let c = collection(vec![ndvi("A", &[0.1, 0.2]), other]);
        let err = DistanceMatrix::from_samples(&c, SeriesDistance::Euclidean).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSeries { sample: 1, .. }));
    }

    #[test]
    fn test_from_samples_empty() {
        let c = collection(vec![]);
        assert!(matches!(
            DistanceMatrix::from_samples(&c, SeriesDistance::Euclidean),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn test_from_array_rejects_asymmetric() {
        let data = ndarray::array![[0.0, 1.0], [2.0, 0.0]];
        assert!(matches!(
            DistanceMatrix::from_array(data),
            Err(Error::InvalidDistanceMatrix(_))
        ));
        let data = ndarray::array![[0.5, 1.0], [1.0, 0.0]];
        assert!(DistanceMatrix::from_array(data).is_err());
        let data = ndarray::array![[0.0, -1.0], [-1.0, 0.0]];
        assert!(DistanceMatrix::from_array(data).is_err());
    }

    #[test]
    fn test_condensed_layout() {
        let d = DistanceMatrix::from_condensed(3, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(d.get(0, 1), 1.0);
        assert_eq!(d.get(0, 2), 2.0);
        assert_eq!(d.get(2, 1), 3.0);
        assert_eq!(d.condensed(), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            DistanceMatrix::from_condensed(3, &[1.0]),
            Err(Error::DimensionMismatch { expected: 3, found: 1 })
        ));
    }

    proptest! {
        #[test]
        fn distance_matrix_is_symmetric_with_zero_diagonal(
            rows in proptest::collection::vec(proptest::collection::vec(-1.0f64..1.0, 6), 1..12),
            window in proptest::option::of(0usize..4),
            kind in 0usize..3,
        ) {
            let samples = collection(rows.iter().map(|r| ndvi("X", r)).collect());
            let distance = match kind {
                0 => SeriesDistance::Euclidean,
                1 => SeriesDistance::Manhattan,
                _ => SeriesDistance::Dtw { window },
            };
            let d = DistanceMatrix::from_samples(&samples, distance).unwrap();
            for i in 0..d.n() {
                prop_assert_eq!(d.get(i, i), 0.0);
                for j in 0..d.n() {
                    prop_assert_eq!(d.get(i, j), d.get(j, i));
                    prop_assert!(d.get(i, j) >= 0.0);
                }
            }
        }
    }
}
