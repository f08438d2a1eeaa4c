//! Agglomerative hierarchical clustering for matrices
//!
//! Columns are clustered on a pairwise distance matrix and the
//! resulting dendrogram gives a one-dimensional leaf order.

use crate::dmatrix_util::pearson_correlation;
use nalgebra::DMatrix;

/// How to measure the distance between two clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// maximum pairwise distance
    #[default]
    Complete,
    /// average pairwise distance
    Average,
    /// minimum pairwise distance
    Single,
}

/// How to measure the distance between two columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnDistance {
    /// `1 - cor(x, y)`
    #[default]
    Correlation,
    /// `|| x - y ||`
    Euclidean,
}

/// Arguments for hierarchical clustering
#[derive(Debug, Clone, Default)]
pub struct HclustArgs {
    pub linkage: Linkage,
    pub distance: ColumnDistance,
}

/// One agglomeration step. Cluster ids below the number of leaves
/// are leaves; id `n + k` is the cluster created by the `k`-th merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f32,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    pub merges: Vec<Merge>,
    /// leaves from left to right
    pub order: Vec<usize>,
}

/// Cluster items given their symmetric distance matrix
///
/// # Arguments
/// * `dist` - `n x n` distance matrix
/// * `linkage` - cluster-to-cluster distance
///
/// # Returns
/// Dendrogram whose leaf order places the earlier cluster of each
/// merge on the left. Ties are broken by the lowest cluster position.
pub fn hclust(dist: &DMatrix<f32>, linkage: Linkage) -> anyhow::Result<Dendrogram> {
    let nn = dist.nrows();
    if dist.ncols() != nn {
        anyhow::bail!("distance matrix must be square: {} x {}", nn, dist.ncols());
    }
    if dist.iter().any(|d| !d.is_finite()) {
        anyhow::bail!("distance matrix contains non-finite values");
    }

    // active clusters: (cluster id, leaves)
    let mut active: Vec<(usize, Vec<usize>)> = (0..nn).map(|i| (i, vec![i])).collect();
    let mut merges = Vec::with_capacity(nn.saturating_sub(1));

    let cluster_distance = |a: &[usize], b: &[usize]| -> f32 {
        let pairs = a.iter().flat_map(|&i| b.iter().map(move |&j| dist[(i, j)]));
        match linkage {
            Linkage::Complete => pairs.fold(f32::MIN, f32::max),
            Linkage::Single => pairs.fold(f32::MAX, f32::min),
            Linkage::Average => {
                let tot: f32 = pairs.sum();
                tot / (a.len() * b.len()) as f32
            }
        }
    };

    while active.len() > 1 {
        let mut best = (0, 1, f32::MAX);
        for i in 0..active.len() {
            for j in (i + 1)..active.len() {
                let d = cluster_distance(&active[i].1, &active[j].1);
                if d < best.2 {
                    best = (i, j, d);
                }
            }
        }

        let (i, j, height) = best;
        let (right_id, right_leaves) = active.remove(j);
        let (left_id, left_leaves) = std::mem::take(&mut active[i]);

        let mut leaves = left_leaves;
        leaves.extend(right_leaves);

        merges.push(Merge {
            left: left_id,
            right: right_id,
            height,
            size: leaves.len(),
        });

        active[i] = (nn + merges.len() - 1, leaves);
    }

    let order = active.pop().map(|(_, leaves)| leaves).unwrap_or_default();

    Ok(Dendrogram { merges, order })
}

/// Trait for hierarchical clustering on matrices
pub trait Hclust {
    /// Pairwise distances between columns
    fn column_distances(&self, distance: ColumnDistance) -> DMatrix<f32>;

    /// Cluster columns and return the dendrogram
    fn hclust_columns(&self, args: &HclustArgs) -> anyhow::Result<Dendrogram>;
}

impl Hclust for DMatrix<f32> {
    fn column_distances(&self, distance: ColumnDistance) -> DMatrix<f32> {
        let nn = self.ncols();
        let mut ret = DMatrix::<f32>::zeros(nn, nn);
        for j in 0..nn {
            for i in 0..j {
                let d = match distance {
                    ColumnDistance::Correlation => {
                        // undefined correlation is treated as no correlation
                        1.0 - pearson_correlation(self.column(i).iter(), self.column(j).iter())
                            .unwrap_or(0.0)
                    }
                    ColumnDistance::Euclidean => (self.column(i) - self.column(j)).norm(),
                };
                ret[(i, j)] = d;
                ret[(j, i)] = d;
            }
        }
        ret
    }

    fn hclust_columns(&self, args: &HclustArgs) -> anyhow::Result<Dendrogram> {
        hclust(&self.column_distances(args.distance), args.linkage)
    }
}
