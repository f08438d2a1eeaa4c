//! Bounds-checked row/column selection
//!
//! Every requested index is resolved against the matrix's names and
//! extent before any value is read.

use crate::error::{Axis, Result, TopologyError};
use crate::matrix_store::MatrixSource;
use crate::Mat;

use fnv::FnvHashMap as HashMap;
use matrix_util::traits::MatWithNames;

/// Rows or columns requested by name or by 1-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subset {
    Names(Vec<Box<str>>),
    Positions(Vec<i64>),
}

impl Subset {
    pub fn names<S: AsRef<str>>(names: &[S]) -> Self {
        Subset::Names(names.iter().map(|x| x.as_ref().into()).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Subset::Names(x) => x.len(),
            Subset::Positions(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve `subset` into 0-based positions within `names`
///
/// * `subset` - requested names or 1-based positions
/// * `names` - names along the axis; their count is the extent
/// * `matrix` - matrix name for the error message
/// * `axis` - which axis `names` runs along
pub fn resolve_positions(
    subset: &Subset,
    names: &[Box<str>],
    matrix: &str,
    axis: Axis,
) -> Result<Vec<usize>> {
    let extent = names.len();

    let (positions, invalid): (Vec<Option<usize>>, Vec<Box<str>>) = match subset {
        Subset::Positions(pos) => {
            let resolved: Vec<Option<usize>> = pos
                .iter()
                .map(|&p| {
                    if p >= 1 && (p as u64) <= extent as u64 {
                        Some((p - 1) as usize)
                    } else {
                        None
                    }
                })
                .collect();
            let invalid = pos
                .iter()
                .zip(resolved.iter())
                .filter(|(_, r)| r.is_none())
                .map(|(p, _)| p.to_string().into_boxed_str())
                .collect();
            (resolved, invalid)
        }
        Subset::Names(query) => {
            let mut name_to_pos: HashMap<&str, usize> = HashMap::default();
            for (i, x) in names.iter().enumerate() {
                name_to_pos.entry(x.as_ref()).or_insert(i);
            }
            let resolved: Vec<Option<usize>> = query
                .iter()
                .map(|q| name_to_pos.get(q.as_ref()).copied())
                .collect();
            let invalid = query
                .iter()
                .zip(resolved.iter())
                .filter(|(_, r)| r.is_none())
                .map(|(q, _)| q.clone())
                .collect();
            (resolved, invalid)
        }
    };

    if !invalid.is_empty() {
        return Err(TopologyError::OutOfRange {
            matrix: matrix.into(),
            axis,
            invalid,
            extent,
        });
    }

    Ok(positions.into_iter().flatten().collect())
}

/// Check both subsets against `matrix` and, only if both are valid,
/// read the submatrix. `None` keeps every row or column.
pub fn restrict<M>(
    matrix: &M,
    rows: Option<&Subset>,
    cols: Option<&Subset>,
) -> Result<MatWithNames<Mat>>
where
    M: MatrixSource + ?Sized,
{
    let (nrows, ncols) = matrix.dimensions();

    let row_pos = match rows {
        Some(s) => resolve_positions(s, matrix.row_names(), matrix.name(), Axis::Row)?,
        None => (0..nrows).collect(),
    };
    let col_pos = match cols {
        Some(s) => resolve_positions(s, matrix.column_names(), matrix.name(), Axis::Column)?,
        None => (0..ncols).collect(),
    };

    let mat = matrix.read_submatrix(&row_pos, &col_pos)?;

    Ok(MatWithNames {
        rows: row_pos
            .iter()
            .map(|&i| matrix.row_names()[i].clone())
            .collect(),
        cols: col_pos
            .iter()
            .map(|&j| matrix.column_names()[j].clone())
            .collect(),
        mat,
    })
}
