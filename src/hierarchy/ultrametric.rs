//! Cophenetic (ultrametric) distances induced by a dendrogram.
//!
//! The cophenetic distance between two leaves is the height of their lowest
//! common ancestor. It satisfies the strong triangle inequality
//!
//! ```text
//! d(x, z) <= max(d(x, y), d(y, z))
//! ```
//!
//! and comparing it with the input dissimilarities (cophenetic correlation)
//! tells how faithfully a linkage preserved them.

use ndarray::Array2;

use super::Dendrogram;
use crate::distance::DistanceMatrix;
use crate::error::{Error, Result};

/// Leaf-to-leaf lowest-common-ancestor heights.
pub fn cophenetic_matrix(dendrogram: &Dendrogram) -> Result<DistanceMatrix> {
    let n = dendrogram.n_items();
    if n == 0 {
        return Err(Error::EmptyInput);
    }
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut data = Array2::<f64>::zeros((n, n));

    for m in dendrogram.merges() {
        let left = std::mem::take(&mut members[m.left]);
        let right = std::mem::take(&mut members[m.right]);
        for &a in &left {
            for &b in &right {
                data[(a, b)] = m.height;
                data[(b, a)] = m.height;
            }
        }
        let mut joined = left;
        joined.extend(right);
        members.push(joined);
    }

    DistanceMatrix::from_array(data)
}

/// Pearson correlation between input distances and cophenetic distances.
///
/// Returns `None` when either side has zero variance (including fewer than
/// three items).
pub fn cophenetic_correlation(
    dendrogram: &Dendrogram,
    distances: &DistanceMatrix,
) -> Result<Option<f64>> {
    if dendrogram.n_items() != distances.n() {
        return Err(Error::DimensionMismatch {
            expected: distances.n(),
            found: dendrogram.n_items(),
        });
    }
    let coph = cophenetic_matrix(dendrogram)?.condensed();
    let orig = distances.condensed();
    if orig.is_empty() {
        return Ok(None);
    }

    let len = orig.len() as f64;
    let mean_o = orig.iter().sum::<f64>() / len;
    let mean_c = coph.iter().sum::<f64>() / len;

    let mut cov = 0.0;
    let mut var_o = 0.0;
    let mut var_c = 0.0;
    for (o, c) in orig.iter().zip(&coph) {
        let (dx, dy) = (o - mean_o, c - mean_c);
        cov += dx * dy;
        var_o += dx * dx;
        var_c += dy * dy;
    }
    if var_o <= 0.0 || var_c <= 0.0 {
        return Ok(None);
    }
    Ok(Some(cov / (var_o.sqrt() * var_c.sqrt())))
}

/// Check the ultrametric inequality on every triple.
pub fn is_ultrametric(d: &DistanceMatrix, tolerance: f64) -> bool {
    let n = d.n();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                if d.get(i, k) > d.get(i, j).max(d.get(j, k)) + tolerance {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cluster::{HierarchicalClustering, Linkage};
    use crate::hierarchy::Merge;

    fn merge(left: usize, right: usize, height: f64, size: usize) -> Merge {
        Merge {
            left,
            right,
            height,
            size,
        }
    }

    #[test]
    fn test_cophenetic_matrix() {
        let merges = [merge(0, 1, 2.0, 2), merge(3, 2, 3.0, 3)];
        let d = Dendrogram::from_merge_records(3, &merges).unwrap();
        let c = cophenetic_matrix(&d).unwrap();
        assert_eq!(c.get(0, 1), 2.0);
        assert_eq!(c.get(0, 2), 3.0);
        assert_eq!(c.get(2, 1), 3.0);
        assert!(is_ultrametric(&c, 1e-12));
    }

    #[test]
    fn test_single_linkage_on_ultrametric_input_is_exact() {
        // Already ultrametric: clustering must reproduce it.
        let input = DistanceMatrix::from_condensed(4, &[1.0, 4.0, 4.0, 4.0, 4.0, 2.0]).unwrap();
        assert!(is_ultrametric(&input, 0.0));
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average] {
            let dendro = HierarchicalClustering::new()
                .with_linkage(linkage)
                .fit_dendrogram(&input)
                .unwrap();
            let coph = cophenetic_matrix(&dendro).unwrap();
            assert_eq!(coph.condensed(), input.condensed());
            let r = cophenetic_correlation(&dendro, &input).unwrap().unwrap();
            assert!((r - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_correlation_size_mismatch() {
        let input = DistanceMatrix::from_condensed(3, &[1.0, 2.0, 3.0]).unwrap();
        let d = Dendrogram::from_merge_records(2, &[merge(0, 1, 1.0, 2)]).unwrap();
        assert!(matches!(
            cophenetic_correlation(&d, &input),
            Err(Error::DimensionMismatch { .. })
        ));
        let pair = DistanceMatrix::from_condensed(2, &[1.0]).unwrap();
        assert_eq!(cophenetic_correlation(&d, &pair).unwrap(), None);
    }
}
