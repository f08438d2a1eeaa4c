pub mod alignment; // order modules, nodes and samples across datasets
pub mod dataset; // datasets and module assignment
pub mod eigengene; // module summary of a data submatrix
pub mod error;
pub mod indexer; // bounds-checked submatrix selection
pub mod matrix_store; // resident and disk-backed matrices
pub mod output;
pub mod preservation;
pub mod statistics; // discovery/test statistics requests
pub mod topology; // per-module statistics in one dataset

pub type Mat = nalgebra::DMatrix<f32>;

pub use error::{Result, TopologyError};
