use crate::common_io::{read_lines_of_words_delim, write_lines, Delimiter};
use crate::parquet::{read_parquet_columns, write_parquet_columns, ParquetMatrix};
use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};
use num_traits::{FromPrimitive, ToPrimitive};

use std::fmt::{Debug, Display};
use std::str::FromStr;

fn parse_words<T>(words: &[Box<str>], file: &str, line: usize) -> anyhow::Result<Vec<T>>
where
    T: FromStr,
    <T as FromStr>::Err: Debug,
{
    words
        .iter()
        .map(|w| {
            w.parse::<T>().map_err(|e| {
                anyhow::anyhow!("{}: failed to parse `{}` at line {}: {:?}", file, w, line, e)
            })
        })
        .collect()
}

impl<T> IoOps for DMatrix<T>
where
    T: nalgebra::Scalar + FromPrimitive + ToPrimitive + FromStr + Display + Copy + Send,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_file_delim(
        tsv_file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let hdr_line = match skip {
            Some(skip) => skip as i64,
            None => -1, // no skipping
        };

        let words = read_lines_of_words_delim(tsv_file, delim, hdr_line)?.lines;

        if words.is_empty() {
            return Err(anyhow::anyhow!("No data in file {}", tsv_file));
        }

        let ncols = words[0].len();
        let nrows = words.len();
        let mut data = Vec::with_capacity(nrows * ncols);

        for (i, w) in words.iter().enumerate() {
            if w.len() != ncols {
                return Err(anyhow::anyhow!(
                    "{}: line {} has {} fields, expected {}",
                    tsv_file,
                    i + 1,
                    w.len(),
                    ncols
                ));
            }
            data.extend(parse_words::<T>(w, tsv_file, i + 1)?);
        }

        Ok(DMatrix::<T>::from_row_iterator(nrows, ncols, data))
    }

    fn read_data_with_names(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<MatWithNames<Self::Mat>> {
        let out = read_lines_of_words_delim(file, delim, 0)?;

        // the first header field names the row-name column
        let cols: Vec<Box<str>> = out.header.into_iter().skip(1).collect();
        let ncols = cols.len();
        let nrows = out.lines.len();

        let mut rows = Vec::with_capacity(nrows);
        let mut data = Vec::with_capacity(nrows * ncols);

        for (i, w) in out.lines.iter().enumerate() {
            if w.len() != ncols + 1 {
                return Err(anyhow::anyhow!(
                    "{}: line {} has {} values, expected {}",
                    file,
                    i + 2,
                    w.len().saturating_sub(1),
                    ncols
                ));
            }
            rows.push(w[0].clone());
            data.extend(parse_words::<T>(&w[1..], file, i + 2)?);
        }

        Ok(MatWithNames {
            rows,
            cols,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }

    fn write_file_delim(&self, tsv_file: &str, delim: &str) -> anyhow::Result<()> {
        // par_iter() or par_bridge() will
        // mess up the order of the rows
        let lines = self
            .row_iter()
            .map(|row| {
                row.iter()
                    .map(|x| format!("{}", *x))
                    .collect::<Vec<String>>()
                    .join(delim)
                    .into_boxed_str()
            })
            .collect::<Vec<_>>();

        write_lines(&lines, tsv_file)?;
        Ok(())
    }

    fn write_data_with_names(
        &self,
        file: &str,
        delim: &str,
        rows: &[Box<str>],
        cols: &[Box<str>],
    ) -> anyhow::Result<()> {
        if rows.len() != self.nrows() || cols.len() != self.ncols() {
            return Err(anyhow::anyhow!(
                "names ({} x {}) don't match the matrix ({} x {})",
                rows.len(),
                cols.len(),
                self.nrows(),
                self.ncols()
            ));
        }

        let mut lines = Vec::with_capacity(self.nrows() + 1);
        let header = std::iter::once("row")
            .chain(cols.iter().map(|c| c.as_ref()))
            .collect::<Vec<_>>()
            .join(delim);
        lines.push(header.into_boxed_str());

        for (r, row) in rows.iter().zip(self.row_iter()) {
            let line = std::iter::once(r.to_string())
                .chain(row.iter().map(|x| format!("{}", *x)))
                .collect::<Vec<String>>()
                .join(delim);
            lines.push(line.into_boxed_str());
        }

        write_lines(&lines, file)
    }

    fn to_parquet_with_names(
        &self,
        file_path: &str,
        row_names: Option<&[Box<str>]>,
        column_names: Option<&[Box<str>]>,
    ) -> anyhow::Result<()> {
        let numbered = |n: usize| -> Vec<Box<str>> {
            (0..n).map(|i| i.to_string().into_boxed_str()).collect()
        };
        let rows: Vec<Box<str>> =
            row_names.map_or_else(|| numbered(self.nrows()), <[_]>::to_vec);
        let cols: Vec<Box<str>> =
            column_names.map_or_else(|| numbered(self.ncols()), <[_]>::to_vec);

        if rows.len() != self.nrows() || cols.len() != self.ncols() {
            return Err(anyhow::anyhow!(
                "names ({} x {}) don't match the matrix ({} x {})",
                rows.len(),
                cols.len(),
                self.nrows(),
                self.ncols()
            ));
        }

        let columns = self.column_iter().map(|col| {
            col.iter()
                .map(|x| {
                    x.to_f64()
                        .ok_or(anyhow::anyhow!("failed to convert {} to f64", x))
                })
                .collect::<anyhow::Result<Vec<f64>>>()
        });

        write_parquet_columns(file_path, &rows, &cols, columns)
    }

    fn from_parquet_with_indices_names(
        file_path: &str,
        row_name_index: Option<usize>,
        column_indices: Option<&[usize]>,
        column_names: Option<&[Box<str>]>,
    ) -> anyhow::Result<MatWithNames<Self>> {
        let ParquetMatrix {
            row_major_data,
            row_names,
            column_names,
        } = read_parquet_columns(file_path, row_name_index, column_indices, column_names)?;

        let data = row_major_data
            .into_iter()
            .map(|x| T::from_f64(x).ok_or(anyhow::anyhow!("failed to convert {}", x)))
            .collect::<anyhow::Result<Vec<T>>>()?;

        let (nrows, ncols) = (row_names.len(), column_names.len());
        Ok(MatWithNames {
            rows: row_names,
            cols: column_names,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }
}
