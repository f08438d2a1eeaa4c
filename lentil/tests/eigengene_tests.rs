use lentil::eigengene::{eigengene, node_contribution};
use lentil::{Mat, TopologyError};

use approx::assert_abs_diff_eq;
use matrix_util::dmatrix_util::{pearson_correlation, row_means};
use matrix_util::traits::MatOps;

/// Deterministic sample x node matrices of assorted shapes
fn test_matrices() -> Vec<Mat> {
    let shapes = [(10, 3), (3, 10), (2, 2), (25, 7), (7, 25), (50, 2)];
    shapes
        .iter()
        .enumerate()
        .map(|(k, &(n, m))| {
            Mat::from_fn(n, m, |i, j| {
                let trend = (i as f32) / (n as f32);
                let wiggle = ((i * 13 + j * 7 + k * 3) as f32).sin();
                trend * (1.0 + j as f32 * 0.2) + 0.3 * wiggle
            })
        })
        .collect()
}

#[test]
fn summary_orientation_follows_own_average() -> anyhow::Result<()> {
    for xx in test_matrices() {
        let neg = -&xx;

        let pos_eg = eigengene(&xx)?;
        let neg_eg = eigengene(&neg)?;

        // each summary agrees with its own matrix's average
        let r_pos = pearson_correlation(pos_eg.summary.iter(), row_means(&xx).iter());
        let r_neg = pearson_correlation(neg_eg.summary.iter(), row_means(&neg).iter());
        let (r_pos, r_neg) = (r_pos.unwrap_or(0.0), r_neg.unwrap_or(0.0));
        assert!(r_pos >= 0.0);
        assert!(r_neg >= 0.0);

        // so negating the data negates the summary
        assert_abs_diff_eq!(pos_eg.summary, -&neg_eg.summary, epsilon = 1e-4);
        assert_abs_diff_eq!(
            pos_eg.variance_explained,
            neg_eg.variance_explained,
            epsilon = 1e-6
        );

        // contributions are invariant
        let c_pos = node_contribution(&xx, &pos_eg.summary);
        let c_neg = node_contribution(&neg, &neg_eg.summary);
        assert_abs_diff_eq!(c_pos, c_neg, epsilon = 1e-4);
    }
    Ok(())
}

#[test]
fn variance_explained_is_a_proportion() -> anyhow::Result<()> {
    for xx in test_matrices() {
        for mat in [xx.clone(), xx.scale_columns(), xx.centre_columns()] {
            let eg = eigengene(&mat)?;
            assert!((0.0..=1.0).contains(&eg.variance_explained));
            assert_abs_diff_eq!(eg.summary.norm(), 1.0, epsilon = 1e-4);
            assert_eq!(eg.summary.len(), mat.nrows());
        }
    }
    Ok(())
}

#[test]
fn rank_one_explains_everything() -> anyhow::Result<()> {
    let u = [1.0_f32, -2.0, 0.5, 3.0, 1.5];
    let v = [2.0_f32, 1.0, -1.0];
    let xx = Mat::from_fn(5, 3, |i, j| u[i] * v[j]);

    let eg = eigengene(&xx)?;
    assert_abs_diff_eq!(eg.variance_explained, 1.0, epsilon = 1e-5);

    let unorm = u.iter().map(|x| x * x).sum::<f32>().sqrt();
    let expected: Vec<f32> = u.iter().map(|x| x / unorm).collect();
    let flip = if eg.summary[0] * expected[0] < 0.0 { -1.0 } else { 1.0 };
    for (a, b) in eg.summary.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*a, flip * b, epsilon = 1e-4);
    }
    Ok(())
}

#[test]
fn too_few_samples_or_nodes() {
    for (n, m) in [(1, 5), (5, 1), (1, 1), (0, 3)] {
        let err = eigengene(&Mat::from_element(n, m, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            TopologyError::DegenerateModule { nodes, samples, .. } if nodes == m && samples == n
        ));
    }
}
