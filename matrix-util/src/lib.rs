pub mod clustering; // hierarchical clustering and leaf order
pub mod common_io; // delimited text (gzipped or not)
pub mod dmatrix_io; // named `DMatrix` to and from files
pub mod dmatrix_util; // column statistics and correlation
pub mod parquet; // named dense matrices in parquet
pub mod traits;
pub mod utils;
