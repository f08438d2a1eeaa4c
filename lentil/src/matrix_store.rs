//! Out-of-core matrix store
//!
//! A matrix is either resident (already in memory) or disk-backed
//! (a parquet or delimited text file with declared names). Both
//! answer the same questions through [`MatrixSource`]. A
//! [`ResidencyState`] keeps at most one dataset's matrices loaded.

use crate::dataset::Dataset;
use crate::error::{Axis, Result, TopologyError};
use crate::Mat;

use log::{debug, info};
use matrix_util::common_io::{file_ext, peek_delim_row_column_names, Delimiter};
use matrix_util::parquet::{peek_parquet_field_names, peek_parquet_row_names};
use matrix_util::traits::{IoOps, MatWithNames};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Uniform read access to a named matrix
pub trait MatrixSource {
    /// What this matrix is, used in error messages
    fn name(&self) -> &str;

    fn dimensions(&self) -> (usize, usize);

    fn row_names(&self) -> &[Box<str>];

    fn column_names(&self) -> &[Box<str>];

    /// Read values at 0-based `rows` x `cols`. Indices are checked
    /// against the declared dimensions before anything is read.
    fn read_submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Mat>;
}

fn check_bounds(name: &str, rows: &[usize], cols: &[usize], dims: (usize, usize)) -> Result<()> {
    for (axis, idx, extent) in [(Axis::Row, rows, dims.0), (Axis::Column, cols, dims.1)] {
        let invalid: Vec<Box<str>> = idx
            .iter()
            .filter(|&&i| i >= extent)
            .map(|&i| (i + 1).to_string().into_boxed_str())
            .collect();
        if !invalid.is_empty() {
            return Err(TopologyError::OutOfRange {
                matrix: name.into(),
                axis,
                invalid,
                extent,
            });
        }
    }
    Ok(())
}

fn select(mat: &Mat, rows: &[usize], cols: &[usize]) -> Mat {
    Mat::from_fn(rows.len(), cols.len(), |i, j| mat[(rows[i], cols[j])])
}

/// A matrix held in memory along with its names
#[derive(Debug, Clone)]
pub struct ResidentMatrix {
    name: Box<str>,
    data: MatWithNames<Mat>,
}

impl ResidentMatrix {
    pub fn new(name: &str, mat: Mat, rows: Vec<Box<str>>, cols: Vec<Box<str>>) -> Result<Self> {
        if rows.len() != mat.nrows() || cols.len() != mat.ncols() {
            return Err(TopologyError::invalid_input(format!(
                "`{}` has {} x {} values but {} row and {} column names",
                name,
                mat.nrows(),
                mat.ncols(),
                rows.len(),
                cols.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            data: MatWithNames { rows, cols, mat },
        })
    }

    pub fn matrix(&self) -> &Mat {
        &self.data.mat
    }
}

impl MatrixSource for ResidentMatrix {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (usize, usize) {
        self.data.mat.shape()
    }

    fn row_names(&self) -> &[Box<str>] {
        &self.data.rows
    }

    fn column_names(&self) -> &[Box<str>] {
        &self.data.cols
    }

    fn read_submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Mat> {
        check_bounds(&self.name, rows, cols, self.dimensions())?;
        Ok(select(&self.data.mat, rows, cols))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    Parquet,
    /// header line of column names; each line starts with its row name
    Delimited,
}

impl DiskFormat {
    pub fn from_file_name(file: &str) -> Result<Self> {
        match file_ext(file).map_err(|e| TopologyError::data_access(file, e))?.as_ref() {
            "parquet" => Ok(DiskFormat::Parquet),
            "tsv" | "txt" | "csv" => Ok(DiskFormat::Delimited),
            ext => Err(TopologyError::data_access(
                file,
                format!("unsupported file extension `{}`", ext),
            )),
        }
    }
}

/// A matrix that lives in a file until it is loaded
#[derive(Debug, Clone)]
pub struct DiskMatrix {
    name: Box<str>,
    path: PathBuf,
    format: DiskFormat,
    rows: Vec<Box<str>>,
    cols: Vec<Box<str>>,
}

impl DiskMatrix {
    /// Refer to a matrix on disk with declared row and column names
    pub fn new(
        name: &str,
        path: impl AsRef<Path>,
        rows: Vec<Box<str>>,
        cols: Vec<Box<str>>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = DiskFormat::from_file_name(&path.to_string_lossy())?;
        Ok(Self {
            name: name.into(),
            path,
            format,
            rows,
            cols,
        })
    }

    /// Learn names and dimensions from the file itself without
    /// parsing any values
    pub fn describe(name: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = path.to_string_lossy().to_string();
        let format = DiskFormat::from_file_name(&file)?;

        let (rows, cols) = match format {
            DiskFormat::Parquet => {
                let rows = peek_parquet_row_names(&file, None)
                    .map_err(|e| TopologyError::data_access(name, e))?;
                let cols = peek_parquet_field_names(&file)
                    .map_err(|e| TopologyError::data_access(name, e))?
                    .into_iter()
                    .skip(1)
                    .collect();
                (rows, cols)
            }
            DiskFormat::Delimited => {
                peek_delim_row_column_names(&file, Delimiter::from_file_name(&file))
                    .map_err(|e| TopologyError::data_access(name, e))?
            }
        };

        debug!(
            "{}: {} x {} matrix in {}",
            name,
            rows.len(),
            cols.len(),
            file
        );

        Ok(Self {
            name: name.into(),
            path,
            format,
            rows,
            cols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn read_file(&self, columns: Option<&[Box<str>]>) -> Result<MatWithNames<Mat>> {
        let file = self.file();
        let out = match self.format {
            DiskFormat::Parquet => {
                Mat::from_parquet_with_indices_names(&file, None, None, columns)
            }
            DiskFormat::Delimited => {
                Mat::read_data_with_names(&file, Delimiter::from_file_name(&file))
            }
        };
        out.map_err(|e| TopologyError::data_access(&self.name, e))
    }

    /// Read the whole matrix into memory, checking that what we read
    /// is what was declared
    pub fn load(&self) -> Result<ResidentMatrix> {
        info!("loading {} from {}", self.name, self.path.display());

        let MatWithNames { rows, cols, mat } = self.read_file(None)?;

        if mat.shape() != self.dimensions() {
            return Err(TopologyError::data_access(
                &self.name,
                format!(
                    "declared {} x {} but read {} x {}",
                    self.rows.len(),
                    self.cols.len(),
                    mat.nrows(),
                    mat.ncols()
                ),
            ));
        }

        if rows != self.rows || cols != self.cols {
            return Err(TopologyError::data_access(
                &self.name,
                "row or column names differ from the declared ones",
            ));
        }

        ResidentMatrix::new(&self.name, mat, rows, cols)
    }
}

impl MatrixSource for DiskMatrix {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    fn row_names(&self) -> &[Box<str>] {
        &self.rows
    }

    fn column_names(&self) -> &[Box<str>] {
        &self.cols
    }

    fn read_submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Mat> {
        check_bounds(&self.name, rows, cols, self.dimensions())?;

        // parquet lets us skip the columns we don't need
        let col_names: Vec<Box<str>> = cols.iter().map(|&j| self.cols[j].clone()).collect();
        let projected = match self.format {
            DiskFormat::Parquet if !cols.is_empty() => Some(col_names.as_slice()),
            _ => None,
        };

        let MatWithNames {
            rows: rows_read,
            cols: cols_read,
            mat,
        } = self.read_file(projected)?;

        if rows_read != self.rows {
            return Err(TopologyError::data_access(
                &self.name,
                format!(
                    "declared {} rows but read {} with different names",
                    self.rows.len(),
                    rows_read.len()
                ),
            ));
        }

        let col_pos: fnv::FnvHashMap<&str, usize> = cols_read
            .iter()
            .enumerate()
            .map(|(j, c)| (c.as_ref(), j))
            .collect();

        let cols_local = col_names
            .iter()
            .map(|c| {
                col_pos.get(c.as_ref()).copied().ok_or_else(|| {
                    TopologyError::data_access(&self.name, format!("column `{}` is missing", c))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(select(&mat, rows, &cols_local))
    }
}

/// Either resident or disk-backed
#[derive(Debug, Clone)]
pub enum MatrixHandle {
    Resident(Arc<ResidentMatrix>),
    Disk(DiskMatrix),
}

impl MatrixHandle {
    pub fn resident(
        name: &str,
        mat: Mat,
        rows: Vec<Box<str>>,
        cols: Vec<Box<str>>,
    ) -> Result<Self> {
        let mat = ResidentMatrix::new(name, mat, rows, cols)?;
        Ok(MatrixHandle::Resident(Arc::new(mat)))
    }

    pub fn is_disk_backed(&self) -> bool {
        matches!(self, MatrixHandle::Disk(_))
    }

    /// Make this matrix addressable in memory
    pub fn resolve(&self) -> Result<Arc<ResidentMatrix>> {
        match self {
            MatrixHandle::Resident(x) => Ok(x.clone()),
            MatrixHandle::Disk(x) => Ok(Arc::new(x.load()?)),
        }
    }

    fn source(&self) -> &dyn MatrixSource {
        match self {
            MatrixHandle::Resident(x) => &**x,
            MatrixHandle::Disk(x) => x,
        }
    }
}

impl MatrixSource for MatrixHandle {
    fn name(&self) -> &str {
        self.source().name()
    }

    fn dimensions(&self) -> (usize, usize) {
        self.source().dimensions()
    }

    fn row_names(&self) -> &[Box<str>] {
        self.source().row_names()
    }

    fn column_names(&self) -> &[Box<str>] {
        self.source().column_names()
    }

    fn read_submatrix(&self, rows: &[usize], cols: &[usize]) -> Result<Mat> {
        self.source().read_submatrix(rows, cols)
    }
}

/// All matrices of one dataset, in memory
#[derive(Debug, Clone)]
pub struct ResidentMatrixSet {
    pub dataset: Box<str>,
    pub network: Arc<ResidentMatrix>,
    pub correlation: Arc<ResidentMatrix>,
    pub data: Option<Arc<ResidentMatrix>>,
}

impl ResidentMatrixSet {
    fn load(dataset: &Dataset) -> Result<Self> {
        let network = dataset.network.resolve()?;
        let correlation = dataset.correlation.resolve()?;
        let data = dataset.data.as_ref().map(|x| x.resolve()).transpose()?;
        Ok(Self {
            dataset: dataset.name.clone(),
            network,
            correlation,
            data,
        })
    }
}

/// Tracks which dataset is loaded. At most one dataset's matrix set
/// is resident; loading another evicts the current one first.
#[derive(Debug, Default)]
pub struct ResidencyState {
    current: Option<ResidentMatrixSet>,
    num_loads: usize,
    num_evictions: usize,
}

impl ResidencyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resident_dataset(&self) -> Option<&str> {
        self.current.as_ref().map(|x| x.dataset.as_ref())
    }

    pub fn is_resident(&self, dataset: &str) -> bool {
        self.resident_dataset() == Some(dataset)
    }

    pub fn num_loads(&self) -> usize {
        self.num_loads
    }

    pub fn num_evictions(&self) -> usize {
        self.num_evictions
    }

    /// Make `dataset`'s matrices resident and return them. A failed
    /// load leaves nothing resident.
    pub fn resolve(&mut self, dataset: &Dataset) -> Result<&ResidentMatrixSet> {
        if !self.is_resident(&dataset.name) {
            self.evict();
            info!("resolving dataset {}", dataset.name);
            self.current = Some(ResidentMatrixSet::load(dataset)?);
            self.num_loads += 1;
        }
        self.current
            .as_ref()
            .ok_or_else(|| TopologyError::data_access(&dataset.name, "nothing resident"))
    }

    /// Release whatever is resident
    pub fn evict(&mut self) {
        if let Some(set) = self.current.take() {
            debug!("evicting dataset {}", set.dataset);
            self.num_evictions += 1;
        }
    }

    /// Scoped acquisition: everything resolved through the returned
    /// scope is evicted when it goes out of scope, including on the
    /// error paths.
    pub fn scope(&mut self) -> ResidencyScope<'_> {
        ResidencyScope { state: self }
    }
}

pub struct ResidencyScope<'a> {
    state: &'a mut ResidencyState,
}

impl ResidencyScope<'_> {
    pub fn resolve(&mut self, dataset: &Dataset) -> Result<&ResidentMatrixSet> {
        self.state.resolve(dataset)
    }

    pub fn resident_dataset(&self) -> Option<&str> {
        self.state.resident_dataset()
    }
}

impl Drop for ResidencyScope<'_> {
    fn drop(&mut self) {
        self.state.evict();
    }
}
