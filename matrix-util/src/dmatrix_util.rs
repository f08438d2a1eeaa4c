use crate::traits::MatOps;
pub use nalgebra::{DMatrix, DVector};

impl MatOps for DMatrix<f32> {
    type Mat = Self;
    type Scalar = f32;

    fn centre_columns_inplace(&mut self) {
        for mut x_j in self.column_iter_mut() {
            let mu = x_j.mean();
            x_j.add_scalar_mut(-mu);
        }
    }

    fn centre_columns(&self) -> Self::Mat {
        let mut ret = self.clone();
        ret.centre_columns_inplace();
        ret
    }

    /// Standardize each column to zero mean and unit (sample)
    /// variance; constant columns are only centred
    fn scale_columns_inplace(&mut self) {
        let nn = self.nrows();
        for mut x_j in self.column_iter_mut() {
            let mu = x_j.mean();
            x_j.add_scalar_mut(-mu);
            if nn > 1 {
                let sd = (x_j.norm_squared() / (nn - 1) as f32).sqrt();
                if sd > 0.0 {
                    x_j /= sd;
                }
            }
        }
    }

    fn scale_columns(&self) -> Self::Mat {
        let mut ret = self.clone();
        ret.scale_columns_inplace();
        ret
    }
}

/// Pearson correlation between two equally long sequences. Returns
/// `None` if either side has zero variance or they are shorter than 2.
pub fn pearson_correlation<'a, I, J>(xx: I, yy: J) -> Option<f32>
where
    I: IntoIterator<Item = &'a f32>,
    J: IntoIterator<Item = &'a f32>,
{
    let pairs: Vec<(f64, f64)> = xx
        .into_iter()
        .zip(yy)
        .map(|(&x, &y)| (x as f64, y as f64))
        .collect();

    let nn = pairs.len();
    if nn < 2 {
        return None;
    }

    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / nn as f64;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / nn as f64;

    let (mut sxy, mut sxx, mut syy) = (0_f64, 0_f64, 0_f64);
    for &(x, y) in pairs.iter() {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }

    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0) as f32)
}

/// Average of each row
pub fn row_means(xx: &DMatrix<f32>) -> DVector<f32> {
    let nc = xx.ncols().max(1) as f32;
    DVector::from_iterator(xx.nrows(), xx.row_iter().map(|r| r.sum() / nc))
}

/// Values strictly above the diagonal of a square matrix in
/// column-major order
pub fn upper_triangle(xx: &DMatrix<f32>) -> Vec<f32> {
    let nn = xx.nrows().min(xx.ncols());
    let mut ret = Vec::with_capacity(nn * nn.saturating_sub(1) / 2);
    for j in 0..nn {
        for i in 0..j {
            ret.push(xx[(i, j)]);
        }
    }
    ret
}
