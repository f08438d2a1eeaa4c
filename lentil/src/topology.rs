//! Per-module topology statistics in one dataset
//!
//! Weighted degree, module summary and node contribution all come
//! from submatrices restricted to the same resolved node list.

use crate::eigengene::{eigengene, node_contribution};
use crate::error::{Axis, Result, TopologyError};
use crate::indexer::{resolve_positions, restrict, Subset};
use crate::matrix_store::MatrixSource;
use crate::Mat;

use matrix_util::traits::{MatOps, MatWithNames};
use nalgebra::DVector;

/// Statistics that need the data matrix
#[derive(Debug, Clone)]
pub struct DataStatistics {
    /// samples, in data-matrix order
    pub samples: Vec<Box<str>>,
    /// module summary, one value per sample
    pub summary: DVector<f32>,
    /// correlation of each node with the summary
    pub contribution: DVector<f32>,
    pub variance_explained: f32,
    /// mean squared node contribution
    pub coherence: f32,
}

/// Statistics of one module in one (test) dataset
#[derive(Debug, Clone)]
pub struct ModuleStatistics {
    pub module: Box<str>,
    pub dataset: Box<str>,
    /// module nodes present in the dataset
    pub nodes: Vec<Box<str>>,
    /// module nodes missing from the dataset
    pub absent_nodes: Vec<Box<str>>,
    /// sum of edge weights to the other module nodes
    pub weighted_degree: DVector<f32>,
    /// mean off-diagonal edge weight
    pub avg_edge_weight: f32,
    /// node x node correlation restricted to `nodes`
    pub correlation: Mat,
    pub data: Option<DataStatistics>,
}

impl ModuleStatistics {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_position(&self, node: &str) -> Option<usize> {
        self.nodes.iter().position(|x| x.as_ref() == node)
    }

    pub fn degree_of(&self, node: &str) -> Option<f32> {
        self.node_position(node).map(|i| self.weighted_degree[i])
    }
}

/// The matrices a module is measured on
pub struct ModuleInputs<'a> {
    pub network: &'a dyn MatrixSource,
    pub correlation: &'a dyn MatrixSource,
    pub data: Option<&'a dyn MatrixSource>,
}

/// Arguments controlling one module's statistics
#[derive(Debug, Clone, Default)]
pub struct ModuleQuery {
    pub module: Box<str>,
    pub dataset: Box<str>,
    /// module nodes, by name or 1-based network position
    pub nodes: Option<Subset>,
    /// data rows to use; every sample if `None`
    pub samples: Option<Subset>,
    /// discovery members not found in this dataset
    pub absent_nodes: Vec<Box<str>>,
    /// standardize each node's data before taking the summary
    pub scale_data: bool,
}

/// Weighted degree of every node: row sums without the diagonal
pub fn weighted_degree(net: &Mat) -> DVector<f32> {
    DVector::from_iterator(
        net.nrows(),
        net.row_iter()
            .enumerate()
            .map(|(i, row)| row.sum() - row[i]),
    )
}

/// Mean off-diagonal weight of a square matrix
pub fn avg_edge_weight(net: &Mat) -> f32 {
    let kk = net.nrows();
    if kk < 2 {
        return 0.0;
    }
    weighted_degree(net).sum() / (kk * (kk - 1)) as f32
}

/// Edge weights and correlations must be numbers; a NaN would leak
/// into every degree it touches
fn ensure_finite(mat: &Mat, matrix: &str, module: &str) -> Result<()> {
    let bad = mat.iter().filter(|x| !x.is_finite()).count();
    if bad > 0 {
        return Err(TopologyError::invalid_input(format!(
            "{} non-finite value(s) in `{}` among the nodes of module {}",
            bad, matrix, module
        )));
    }
    Ok(())
}

/// Compute weighted degree, module summary and node contribution
/// for the module described by `query`.
///
/// Every node and sample index is resolved against every matrix
/// before any value is read, so an out-of-range request fails
/// without partial work.
pub fn compute_module_stats(
    inputs: &ModuleInputs,
    query: &ModuleQuery,
) -> Result<ModuleStatistics> {
    let network = inputs.network;

    // resolve nodes against the network to names, then name them
    // everywhere else so all submatrices share one node order
    let node_pos = match query.nodes.as_ref() {
        Some(s) => resolve_positions(s, network.column_names(), network.name(), Axis::Column)?,
        None => (0..network.dimensions().1).collect(),
    };
    let nodes: Vec<Box<str>> = node_pos
        .iter()
        .map(|&j| network.column_names()[j].clone())
        .collect();
    let by_name = Subset::Names(nodes.clone());

    let corr = inputs.correlation;
    resolve_positions(&by_name, corr.row_names(), corr.name(), Axis::Row)?;
    resolve_positions(&by_name, corr.column_names(), corr.name(), Axis::Column)?;

    if let Some(data) = inputs.data {
        resolve_positions(&by_name, data.column_names(), data.name(), Axis::Column)?;
        if let Some(samples) = query.samples.as_ref() {
            resolve_positions(samples, data.row_names(), data.name(), Axis::Row)?;
        }
    }

    // all indices are valid from here on
    let net_sub = restrict(network, Some(&by_name), Some(&by_name))?;
    let corr_sub = restrict(corr, Some(&by_name), Some(&by_name))?;
    ensure_finite(&net_sub.mat, network.name(), &query.module)?;
    ensure_finite(&corr_sub.mat, corr.name(), &query.module)?;

    let weighted_degree = weighted_degree(&net_sub.mat);
    let avg_edge_weight = avg_edge_weight(&net_sub.mat);

    let data = match inputs.data {
        Some(data) => {
            let MatWithNames {
                rows: samples,
                cols: _,
                mut mat,
            } = restrict(data, query.samples.as_ref(), Some(&by_name))?;

            if query.scale_data {
                mat.scale_columns_inplace();
            }

            let eg = eigengene(&mat).map_err(|e| e.for_module(&query.module))?;
            let contribution = node_contribution(&mat, &eg.summary);
            let coherence = contribution.map(|x| x * x).mean();

            Some(DataStatistics {
                samples,
                summary: eg.summary,
                contribution,
                variance_explained: eg.variance_explained,
                coherence,
            })
        }
        None => None,
    };

    Ok(ModuleStatistics {
        module: query.module.clone(),
        dataset: query.dataset.clone(),
        nodes,
        absent_nodes: query.absent_nodes.clone(),
        weighted_degree,
        avg_edge_weight,
        correlation: corr_sub.mat,
        data,
    })
}
