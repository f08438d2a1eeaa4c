//! Error types for module topology statistics.
//!
//! Every kind aborts the current statistics or alignment request.
//! Nothing here is transient, so nothing is retried.

use thiserror::Error;

/// Which dimension of a matrix an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Column => write!(f, "column"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TopologyError {
    /// Requested rows or columns don't exist in the matrix. The
    /// valid 1-based range is `[1, extent]`.
    #[error(
        "{axis} indices out of range for `{matrix}`: {{{}}}; valid range is [1, {extent}]",
        .invalid.join(", ")
    )]
    OutOfRange {
        matrix: Box<str>,
        axis: Axis,
        invalid: Vec<Box<str>>,
        extent: usize,
    },

    /// A disk-backed matrix couldn't be read or doesn't look like
    /// what it declared
    #[error("failed to access `{matrix}`: {message}")]
    DataAccess { matrix: Box<str>, message: String },

    /// Too few nodes or samples to define a module summary
    #[error(
        "degenerate module{}: {nodes} node(s) x {samples} sample(s)",
        .module.as_ref().map(|m| format!(" `{}`", m)).unwrap_or_default()
    )]
    DegenerateModule {
        module: Option<Box<str>>,
        nodes: usize,
        samples: usize,
    },

    /// Ordering asked for statistics that were never computed
    #[error("no statistics for module `{module}` in dataset `{dataset}`")]
    InconsistentAlignment { module: Box<str>, dataset: Box<str> },

    /// Malformed request at the boundary (unknown names, bad input files)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TopologyError {
    pub fn data_access(matrix: &str, message: impl std::fmt::Display) -> Self {
        TopologyError::DataAccess {
            matrix: matrix.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        TopologyError::InvalidInput(message.into())
    }

    pub fn inconsistent(module: &str, dataset: &str) -> Self {
        TopologyError::InconsistentAlignment {
            module: module.into(),
            dataset: dataset.into(),
        }
    }

    /// Attach the module name to a degenerate-module error raised
    /// by a kernel that doesn't know which module it was given
    pub fn for_module(self, name: &str) -> Self {
        match self {
            TopologyError::DegenerateModule {
                module: None,
                nodes,
                samples,
            } => TopologyError::DegenerateModule {
                module: Some(name.into()),
                nodes,
                samples,
            },
            other => other,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, TopologyError::DegenerateModule { .. })
    }
}

pub type Result<T> = std::result::Result<T, TopologyError>;
