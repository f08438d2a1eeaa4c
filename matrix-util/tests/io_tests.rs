use matrix_util::common_io::{create_temp_dir_file, peek_delim_row_column_names};
use matrix_util::parquet::{peek_parquet_field_names, peek_parquet_row_names};
use matrix_util::traits::{IoOps, MatWithNames};

fn names(prefix: &str, n: usize) -> Vec<Box<str>> {
    (0..n)
        .map(|i| format!("{}{}", prefix, i).into_boxed_str())
        .collect()
}

fn test_matrix() -> nalgebra::DMatrix<f32> {
    nalgebra::DMatrix::<f32>::from_fn(7, 5, |i, j| (i as f32) * 0.5 - (j as f32) * 1.25)
}

#[test]
fn dmatrix_io_test() -> anyhow::Result<()> {
    let xx = test_matrix();

    let tsv_file = create_temp_dir_file("txt.gz")?;
    xx.to_tsv(tsv_file.to_str().unwrap())?;

    let yy = nalgebra::DMatrix::<f32>::read_file_delim(tsv_file.to_str().unwrap(), "\t", None)?;

    approx::assert_abs_diff_eq!(xx, yy);

    Ok(())
}

#[test]
fn dmatrix_named_tsv_test() -> anyhow::Result<()> {
    let xx = test_matrix();
    let rows = names("s", xx.nrows());
    let cols = names("g", xx.ncols());

    let tsv_file = create_temp_dir_file(".tsv.gz")?;
    let tsv_file = tsv_file.to_str().unwrap();
    xx.write_data_with_names(tsv_file, "\t", &rows, &cols)?;

    let (peek_rows, peek_cols) = peek_delim_row_column_names(tsv_file, "\t")?;
    assert_eq!(peek_rows, rows);
    assert_eq!(peek_cols, cols);

    let MatWithNames {
        rows: rows_in,
        cols: cols_in,
        mat,
    } = nalgebra::DMatrix::<f32>::read_data_with_names(tsv_file, "\t")?;

    assert_eq!(rows_in, rows);
    assert_eq!(cols_in, cols);
    approx::assert_abs_diff_eq!(xx, mat);
    Ok(())
}

#[test]
fn dmatrix_parquet_test() -> anyhow::Result<()> {
    let xx = test_matrix();
    let rows = names("s", xx.nrows());
    let cols = names("g", xx.ncols());

    let parquet_file = create_temp_dir_file(".parquet")?;
    let parquet_file = parquet_file.to_str().unwrap();
    xx.to_parquet_with_names(parquet_file, Some(rows.as_slice()), Some(cols.as_slice()))?;

    let fields = peek_parquet_field_names(parquet_file)?;
    assert_eq!(fields.len(), cols.len() + 1);
    assert_eq!(peek_parquet_row_names(parquet_file, None)?, rows);

    let full = nalgebra::DMatrix::<f32>::from_parquet(parquet_file)?;
    assert_eq!(full.rows, rows);
    assert_eq!(full.cols, cols);
    approx::assert_abs_diff_eq!(full.mat, xx, epsilon = 1e-6);

    let sub = nalgebra::DMatrix::<f32>::from_parquet_with_indices_names(
        parquet_file,
        None,
        None,
        Some(&cols[1..3]),
    )?;
    assert_eq!(sub.cols, cols[1..3].to_vec());
    approx::assert_abs_diff_eq!(sub.mat, xx.columns(1, 2).into_owned(), epsilon = 1e-6);
    Ok(())
}

#[test]
fn ragged_lines_are_rejected() -> anyhow::Result<()> {
    let tsv_file = create_temp_dir_file(".tsv")?;
    let tsv_file = tsv_file.to_str().unwrap();
    matrix_util::common_io::write_lines(
        &["row\ta\tb", "x\t1\t2", "y\t3"],
        tsv_file,
    )?;

    assert!(nalgebra::DMatrix::<f32>::read_data_with_names(tsv_file, "\t").is_err());
    Ok(())
}
