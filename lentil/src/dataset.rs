use crate::error::{Result, TopologyError};
use crate::matrix_store::{MatrixHandle, MatrixSource};

use fnv::FnvHashMap as HashMap;
use fnv::FnvHashSet as HashSet;
use log::{info, warn};
use matrix_util::common_io::{read_lines_of_words_delim, ReadLinesOut};
use matrix_util::utils::{natural_cmp, partition_by_membership};

pub const DEFAULT_BACKGROUND: &str = "0";

/// Network, correlation and (optional) data matrices of one dataset
///
/// * `network` - node x node edge weights
/// * `correlation` - node x node correlation
/// * `data` - sample x node observations
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: Box<str>,
    pub network: MatrixHandle,
    pub correlation: MatrixHandle,
    pub data: Option<MatrixHandle>,
}

impl Dataset {
    pub fn new(
        name: &str,
        network: MatrixHandle,
        correlation: MatrixHandle,
        data: Option<MatrixHandle>,
    ) -> Result<Self> {
        for (what, x) in [("network", &network), ("correlation", &correlation)] {
            let (nr, nc) = x.dimensions();
            if nr != nc || x.row_names() != x.column_names() {
                return Err(TopologyError::invalid_input(format!(
                    "{} matrix of `{}` must be square with matching row and column names ({} x {})",
                    what, name, nr, nc
                )));
            }
        }

        if let Some(data) = data.as_ref() {
            let in_network: HashSet<&str> =
                network.row_names().iter().map(|x| x.as_ref()).collect();
            let num_shared = data
                .column_names()
                .iter()
                .filter(|x| in_network.contains(x.as_ref()))
                .count();
            if num_shared < data.column_names().len() {
                warn!(
                    "{}: {} data columns are not in the network",
                    name,
                    data.column_names().len() - num_shared
                );
            }
        }

        Ok(Self {
            name: name.into(),
            network,
            correlation,
            data,
        })
    }

    /// Nodes present in every supplied matrix, in network order
    pub fn common_nodes(&self) -> Vec<Box<str>> {
        let in_corr: HashSet<&str> = self
            .correlation
            .column_names()
            .iter()
            .map(|x| x.as_ref())
            .collect();
        let in_data: Option<HashSet<&str>> = self
            .data
            .as_ref()
            .map(|d| d.column_names().iter().map(|x| x.as_ref()).collect());

        self.network
            .column_names()
            .iter()
            .filter(|x| in_corr.contains(x.as_ref()))
            .filter(|x| in_data.as_ref().map_or(true, |d| d.contains(x.as_ref())))
            .cloned()
            .collect()
    }

    pub fn sample_names(&self) -> Option<&[Box<str>]> {
        self.data.as_ref().map(|x| x.row_names())
    }
}

/// A dataset named or numbered (0-based) within a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetRef {
    Name(Box<str>),
    Index(usize),
}

impl From<&str> for DatasetRef {
    fn from(name: &str) -> Self {
        DatasetRef::Name(name.into())
    }
}

impl From<usize> for DatasetRef {
    fn from(index: usize) -> Self {
        DatasetRef::Index(index)
    }
}

impl std::fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetRef::Name(x) => write!(f, "{}", x),
            DatasetRef::Index(i) => write!(f, "#{}", i),
        }
    }
}

/// Datasets indexed by name
#[derive(Debug, Clone, Default)]
pub struct DatasetCollection {
    datasets: Vec<Dataset>,
    name_to_index: HashMap<Box<str>, usize>,
}

impl DatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dataset: Dataset) -> Result<()> {
        if self.name_to_index.contains_key(&dataset.name) {
            return Err(TopologyError::invalid_input(format!(
                "duplicate dataset `{}`",
                dataset.name
            )));
        }
        self.name_to_index
            .insert(dataset.name.clone(), self.datasets.len());
        self.datasets.push(dataset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn names(&self) -> Vec<Box<str>> {
        self.datasets.iter().map(|x| x.name.clone()).collect()
    }

    pub fn get(&self, id: &DatasetRef) -> Result<&Dataset> {
        let idx = match id {
            DatasetRef::Name(name) => self.name_to_index.get(name).copied(),
            DatasetRef::Index(i) => Some(*i).filter(|&i| i < self.datasets.len()),
        };
        idx.map(|i| &self.datasets[i])
            .ok_or_else(|| TopologyError::invalid_input(format!("unknown dataset {}", id)))
    }
}

/// Node to module mapping defined in a discovery dataset
#[derive(Debug, Clone)]
pub struct ModuleAssignment {
    discovery: Box<str>,
    background: Box<str>,
    nodes: Vec<Box<str>>,
    module_to_nodes: HashMap<Box<str>, Vec<usize>>,
}

impl ModuleAssignment {
    /// * `discovery` - the dataset in which the modules were found
    /// * `pairs` - (node, module); a node may appear only once
    /// * `background` - label of unassigned nodes (default "0")
    pub fn from_pairs(
        discovery: &str,
        pairs: impl IntoIterator<Item = (Box<str>, Box<str>)>,
        background: Option<&str>,
    ) -> Result<Self> {
        let mut nodes = vec![];
        let mut membership = vec![];
        let mut seen = HashSet::default();

        for (node, module) in pairs {
            if !seen.insert(node.clone()) {
                return Err(TopologyError::invalid_input(format!(
                    "node `{}` is assigned more than once",
                    node
                )));
            }
            nodes.push(node);
            membership.push(module);
        }

        let module_to_nodes = partition_by_membership(&membership);

        Ok(Self {
            discovery: discovery.into(),
            background: background.unwrap_or(DEFAULT_BACKGROUND).into(),
            nodes,
            module_to_nodes,
        })
    }

    /// Each line holds a node name and its module label, separated
    /// by tab, comma or space
    pub fn from_file(file: &str, discovery: &str, background: Option<&str>) -> Result<Self> {
        let ReadLinesOut { lines, header: _ } =
            read_lines_of_words_delim(file, &['\t', ',', ' '], -1)
                .map_err(|e| TopologyError::data_access(file, e))?;

        let mut pairs = vec![];
        for (i, words) in lines.into_iter().enumerate() {
            let words: Vec<Box<str>> = words.into_iter().filter(|w| !w.is_empty()).collect();
            if words.len() < 2 {
                return Err(TopologyError::invalid_input(format!(
                    "{}: line {} should have a node and a module",
                    file,
                    i + 1
                )));
            }
            pairs.push((words[0].clone(), words[1].clone()));
        }

        let ret = Self::from_pairs(discovery, pairs, background)?;
        info!(
            "{} nodes in {} modules from {}",
            ret.nodes.len(),
            ret.module_labels().len(),
            file
        );
        Ok(ret)
    }

    pub fn discovery(&self) -> &str {
        &self.discovery
    }

    /// All module labels but the background, in natural order
    pub fn module_labels(&self) -> Vec<Box<str>> {
        let mut ret: Vec<Box<str>> = self
            .module_to_nodes
            .keys()
            .filter(|m| m.as_ref() != self.background.as_ref())
            .cloned()
            .collect();
        ret.sort_by(|a, b| natural_cmp(a, b));
        ret
    }

    pub fn has_module(&self, module: &str) -> bool {
        module != self.background.as_ref() && self.module_to_nodes.contains_key(module)
    }

    /// Nodes of `module` in the order they were assigned
    pub fn module_nodes(&self, module: &str) -> Vec<Box<str>> {
        self.module_to_nodes
            .get(module)
            .map(|idx| idx.iter().map(|&i| self.nodes[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Modules to work on: `requested` (checked) or every module
    pub fn select_modules(&self, requested: Option<&[Box<str>]>) -> Result<Vec<Box<str>>> {
        match requested {
            Some(modules) => {
                for m in modules {
                    if !self.has_module(m) {
                        return Err(TopologyError::invalid_input(format!(
                            "module `{}` is not in the assignment for `{}`",
                            m, self.discovery
                        )));
                    }
                }
                Ok(modules.to_vec())
            }
            None => Ok(self.module_labels()),
        }
    }
}
