//! Preservation point statistics of a discovery module in a test
//! dataset, computed over the nodes both datasets share.

use crate::error::{Result, TopologyError};
use crate::topology::ModuleStatistics;
use crate::Mat;

use matrix_util::dmatrix_util::{pearson_correlation, upper_triangle};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreservationStatistics {
    pub module: Box<str>,
    pub discovery: Box<str>,
    pub test: Box<str>,
    pub num_shared_nodes: usize,
    pub num_absent_nodes: usize,
    /// mean edge weight within the module in the test network
    pub avg_weight: Option<f32>,
    /// mean squared node contribution in the test data
    pub coherence: Option<f32>,
    /// correlation of the two correlation structures
    pub cor_cor: Option<f32>,
    /// correlation of weighted degrees
    pub cor_degree: Option<f32>,
    /// correlation of node contributions
    pub cor_contrib: Option<f32>,
    /// mean test correlation, signed by the discovery correlation
    pub avg_cor: Option<f32>,
    /// mean test contribution, signed by the discovery contribution
    pub avg_contrib: Option<f32>,
}

fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn mean_signed(values: &[f32], signs_from: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let tot: f32 = values
        .iter()
        .zip(signs_from.iter())
        .map(|(&v, &s)| v * sign(s))
        .sum();
    Some(tot / values.len() as f32)
}

/// Compare the statistics of one module in the discovery dataset
/// with those in a test dataset
pub fn preservation(
    discovery: &ModuleStatistics,
    test: &ModuleStatistics,
) -> Result<PreservationStatistics> {
    if discovery.module != test.module {
        return Err(TopologyError::invalid_input(format!(
            "cannot compare module `{}` with module `{}`",
            discovery.module, test.module
        )));
    }

    // shared nodes in discovery order, with their positions in both
    let (disc_pos, test_pos): (Vec<usize>, Vec<usize>) = discovery
        .nodes
        .iter()
        .enumerate()
        .filter_map(|(i, node)| test.node_position(node).map(|j| (i, j)))
        .unzip();

    let nn = disc_pos.len();
    let enough = nn >= 2;

    let sub = |mat: &Mat, pos: &[usize]| Mat::from_fn(nn, nn, |i, j| mat[(pos[i], pos[j])]);
    let pick = |v: &nalgebra::DVector<f32>, pos: &[usize]| -> Vec<f32> {
        pos.iter().map(|&i| v[i]).collect()
    };

    let (cor_cor, avg_cor) = if enough {
        let disc_cor = upper_triangle(&sub(&discovery.correlation, &disc_pos));
        let test_cor = upper_triangle(&sub(&test.correlation, &test_pos));
        (
            pearson_correlation(disc_cor.iter(), test_cor.iter()),
            mean_signed(&test_cor, &disc_cor),
        )
    } else {
        (None, None)
    };

    let cor_degree = if enough {
        let d = pick(&discovery.weighted_degree, &disc_pos);
        let t = pick(&test.weighted_degree, &test_pos);
        pearson_correlation(d.iter(), t.iter())
    } else {
        None
    };

    let (cor_contrib, avg_contrib) = match (discovery.data.as_ref(), test.data.as_ref()) {
        (Some(d), Some(t)) if enough => {
            let d = pick(&d.contribution, &disc_pos);
            let t = pick(&t.contribution, &test_pos);
            (
                pearson_correlation(d.iter(), t.iter()),
                mean_signed(&t, &d),
            )
        }
        _ => (None, None),
    };

    let avg_weight = (test.num_nodes() >= 2).then_some(test.avg_edge_weight);
    let coherence = test.data.as_ref().map(|x| x.coherence);

    Ok(PreservationStatistics {
        module: test.module.clone(),
        discovery: discovery.dataset.clone(),
        test: test.dataset.clone(),
        num_shared_nodes: nn,
        num_absent_nodes: discovery.nodes.len() - nn,
        avg_weight,
        coherence,
        cor_cor,
        cor_degree,
        cor_contrib,
        avg_cor,
        avg_contrib,
    })
}
