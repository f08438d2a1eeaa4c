//! Module summary ("eigengene") of a sample x node data submatrix
//!
//! The summary is the dominant left singular vector of the
//! submatrix. We get it from the eigen-decomposition of the smaller
//! Gram matrix, so a module of a few nodes over thousands of samples
//! only needs a `k x k` eigenproblem.

use crate::error::{Result, TopologyError};
use crate::Mat;

use matrix_util::dmatrix_util::{pearson_correlation, row_means};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct Eigengene {
    /// one value per sample, unit norm
    pub summary: DVector<f32>,
    /// largest squared singular value over the total sum of squares
    pub variance_explained: f32,
}

/// Compute the module summary and its proportion of variance
/// explained.
///
/// The sign is chosen so that the summary correlates non-negatively
/// with each sample's average over the module's nodes. If that
/// average is constant across samples, the summary is oriented to
/// have a non-negative sum instead.
///
/// * `xx` - sample x node data restricted to one module
pub fn eigengene(xx: &Mat) -> Result<Eigengene> {
    let (nsamples, nnodes) = xx.shape();

    let degenerate = || TopologyError::DegenerateModule {
        module: None,
        nodes: nnodes,
        samples: nsamples,
    };

    if nnodes < 2 || nsamples < 2 {
        return Err(degenerate());
    }

    if xx.iter().any(|x| !x.is_finite()) {
        return Err(TopologyError::invalid_input(
            "data submatrix contains non-finite values",
        ));
    }

    let xx64: DMatrix<f64> = xx.map(|x| x as f64);
    let total = xx64.norm_squared();
    if total <= 0.0 {
        return Err(degenerate());
    }

    let (lambda, uu) = if nsamples >= nnodes {
        let gram = xx64.transpose() * &xx64;
        let (lambda, vv) = top_eigen(gram);
        if lambda <= 0.0 {
            return Err(degenerate());
        }
        (lambda, (&xx64 * vv) / lambda.sqrt())
    } else {
        let gram = &xx64 * xx64.transpose();
        let (lambda, uu) = top_eigen(gram);
        if lambda <= 0.0 {
            return Err(degenerate());
        }
        (lambda, uu)
    };

    let mut summary: DVector<f32> = uu.map(|x| x as f32);
    let norm = summary.norm();
    if norm > 0.0 {
        summary /= norm;
    }

    let average = row_means(xx);
    let flip = match pearson_correlation(summary.iter(), average.iter()) {
        Some(r) => r < 0.0,
        None => summary.sum() < 0.0,
    };
    if flip {
        summary.neg_mut();
    }

    let variance_explained = ((lambda / total) as f32).clamp(0.0, 1.0);

    Ok(Eigengene {
        summary,
        variance_explained,
    })
}

/// Largest eigenvalue of a symmetric matrix and its eigenvector
fn top_eigen(gram: DMatrix<f64>) -> (f64, DVector<f64>) {
    let eig = gram.symmetric_eigen();
    let k = eig.eigenvalues.imax();
    (eig.eigenvalues[k], eig.eigenvectors.column(k).into_owned())
}

/// Correlation of each node (column) with the module summary. A
/// node with no variation gets zero.
pub fn node_contribution(xx: &Mat, summary: &DVector<f32>) -> DVector<f32> {
    DVector::from_iterator(
        xx.ncols(),
        xx.column_iter()
            .map(|x_j| pearson_correlation(x_j.iter(), summary.iter()).unwrap_or(0.0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn rank_one_plus_noise() -> Mat {
        // samples follow a common trend; the last node runs opposite
        Mat::from_row_slice(
            5,
            3,
            &[
                -2.0, -1.9, 2.1, //
                -1.0, -1.2, 0.9, //
                0.0, 0.1, 0.0, //
                1.0, 0.9, -1.1, //
                2.0, 2.1, -1.9, //
            ],
        )
    }

    #[test]
    fn single_node_is_degenerate() {
        let xx = Mat::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let err = eigengene(&xx).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::DegenerateModule {
                nodes: 1,
                samples: 4,
                ..
            }
        ));
    }

    #[test]
    fn all_zero_is_degenerate() {
        assert!(eigengene(&Mat::zeros(4, 3)).unwrap_err().is_degenerate());
    }

    #[test]
    fn summary_follows_average() {
        let xx = rank_one_plus_noise();
        let eg = eigengene(&xx).unwrap();

        assert_abs_diff_eq!(eg.summary.norm(), 1.0, epsilon = 1e-5);
        assert!(eg.variance_explained > 0.95 && eg.variance_explained <= 1.0);

        let r = pearson_correlation(eg.summary.iter(), row_means(&xx).iter()).unwrap();
        assert!(r > 0.0);

        let contrib = node_contribution(&xx, &eg.summary);
        assert!(contrib[0] > 0.9 && contrib[1] > 0.9);
        assert!(contrib[2] < -0.9);
    }

    #[test]
    fn wide_and_tall_agree() {
        // more nodes than samples takes the other Gram matrix
        let xx = rank_one_plus_noise();
        let wide = Mat::from_fn(3, 5, |i, j| xx[(j, i)]);
        let tall = Mat::from_fn(5, 3, |i, j| wide[(j, i)]);

        let eg_wide = eigengene(&wide).unwrap();
        let eg_tall = eigengene(&tall).unwrap();

        assert_eq!(eg_wide.summary.len(), 3);
        assert_eq!(eg_tall.summary.len(), 5);
        assert_abs_diff_eq!(
            eg_wide.variance_explained,
            eg_tall.variance_explained,
            epsilon = 1e-5
        );
    }
}
