//! Cross-dataset ordering of modules, nodes and samples
//!
//! Orderings keep every entity the request refers to. Entities
//! missing from the test dataset stay in the ordering as explicit
//! `Absent` entries.

use crate::dataset::ModuleAssignment;
use crate::error::{Result, TopologyError};
use crate::statistics::StatsTable;
use crate::topology::ModuleStatistics;
use crate::Mat;

use log::{info, warn};
use matrix_util::clustering::{Hclust, HclustArgs};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AlignmentArgs {
    /// the dataset whose presence flags the orderings report
    pub test: Box<str>,
    /// average weighted degree over these datasets; test network
    /// order, absent nodes last, if `None`
    pub order_nodes_by: Option<Vec<Box<str>>>,
    /// summary of the left-most module in this dataset; input order if `None`
    pub order_samples_by: Option<Box<str>>,
    /// cluster modules by their summaries
    pub order_modules: bool,
}

impl AlignmentArgs {
    /// Order everything by the test dataset itself
    pub fn new(test: &str) -> Self {
        Self {
            test: test.into(),
            order_nodes_by: Some(vec![test.into()]),
            order_samples_by: Some(test.into()),
            order_modules: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEntry {
    Present(Box<str>),
    Absent(Box<str>),
    /// boundary between samples shared with the ordering dataset and
    /// samples only the test dataset has
    Separator,
}

impl OrderEntry {
    pub fn label(&self) -> Option<&str> {
        match self {
            OrderEntry::Present(x) | OrderEntry::Absent(x) => Some(x),
            OrderEntry::Separator => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    pub entries: Vec<OrderEntry>,
}

impl Ordering {
    /// Labels in order, skipping separators
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().filter_map(|x| x.label()).collect()
    }

    pub fn present(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|x| match x {
                OrderEntry::Present(l) => Some(l.as_ref()),
                _ => None,
            })
            .collect()
    }

    pub fn absent(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|x| match x {
                OrderEntry::Absent(l) => Some(l.as_ref()),
                _ => None,
            })
            .collect()
    }

    pub fn num_present(&self) -> usize {
        self.present().len()
    }

    pub fn num_absent(&self) -> usize {
        self.absent().len()
    }

    pub fn has_separator(&self) -> bool {
        self.entries.contains(&OrderEntry::Separator)
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub modules: Vec<Box<str>>,
    /// nodes of every module, module by module
    pub nodes: Ordering,
    /// module of each node entry
    pub node_modules: Vec<Box<str>>,
    /// `None` if the test dataset has no data matrix
    pub samples: Option<Ordering>,
}

/// Order modules, nodes and samples for presentation
///
/// * `assignment` - discovery module membership
/// * `table` - statistics computed for the datasets the request
///   refers to; any missing (module, dataset) pair is an error
/// * `modules` - modules to draw, in the caller's order
/// * `args` - what to order by
pub fn align(
    assignment: &ModuleAssignment,
    table: &StatsTable,
    modules: &[Box<str>],
    args: &AlignmentArgs,
) -> Result<AlignmentResult> {
    if modules.is_empty() {
        return Err(TopologyError::invalid_input("no modules to align"));
    }

    let test = args.test.as_ref();
    let degree_datasets: Vec<Box<str>> = args
        .order_nodes_by
        .clone()
        .unwrap_or_else(|| vec![test.into()]);

    // every statistic we may touch must exist before we start
    for module in modules {
        table.require(test, module)?;
        if let Some(ds) = args.order_nodes_by.as_ref() {
            for d in ds {
                table.require(d, module)?;
            }
        }
        if let Some(d) = args.order_samples_by.as_ref() {
            table.require(d, module)?;
        }
    }

    let modules = if args.order_modules && modules.len() > 1 {
        order_modules(table, modules, &degree_datasets)?
    } else {
        modules.to_vec()
    };

    let mut nodes = Ordering::default();
    let mut node_modules = vec![];

    for module in modules.iter() {
        let test_stats = table.require(test, module)?;
        let members = assignment.module_nodes(module);

        let ordered = match args.order_nodes_by.as_ref() {
            Some(ds) => {
                let stats = ds
                    .iter()
                    .map(|d| table.require(d, module))
                    .collect::<Result<Vec<_>>>()?;
                order_nodes_by_degree(&members, &stats)
            }
            None => test_stats
                .nodes
                .iter()
                .chain(test_stats.absent_nodes.iter())
                .cloned()
                .collect(),
        };

        for node in ordered {
            let entry = if test_stats.node_position(&node).is_some() {
                OrderEntry::Present(node)
            } else {
                OrderEntry::Absent(node)
            };
            nodes.entries.push(entry);
            node_modules.push(module.clone());
        }
    }

    let leftmost = &modules[0];
    let samples = order_samples(table, leftmost, args)?;

    info!(
        "aligned {} module(s): {} node(s) present and {} absent in {}",
        modules.len(),
        nodes.num_present(),
        nodes.num_absent(),
        test
    );

    Ok(AlignmentResult {
        modules,
        nodes,
        node_modules,
        samples,
    })
}

/// Leaf order of a hierarchical clustering of the modules' summary
/// vectors, concatenated over `datasets`
fn order_modules(
    table: &StatsTable,
    modules: &[Box<str>],
    datasets: &[Box<str>],
) -> Result<Vec<Box<str>>> {
    let mut columns: Vec<Vec<f32>> = vec![vec![]; modules.len()];

    for d in datasets {
        for (k, module) in modules.iter().enumerate() {
            let stats = table.require(d, module)?;
            match stats.data.as_ref() {
                Some(data) => columns[k].extend(data.summary.iter()),
                None => {
                    warn!("no data in {}; keeping modules in input order", d);
                    return Ok(modules.to_vec());
                }
            }
        }
    }

    let nsamples = columns[0].len();
    if columns.iter().any(|c| c.len() != nsamples) {
        warn!("modules were measured on different samples; keeping input order");
        return Ok(modules.to_vec());
    }
    let summaries = Mat::from_fn(nsamples, modules.len(), |i, k| columns[k][i]);

    let tree = summaries
        .hclust_columns(&HclustArgs::default())
        .map_err(|e| TopologyError::invalid_input(e.to_string()))?;

    Ok(tree.order.iter().map(|&k| modules[k].clone()).collect())
}

/// Largest first; NaN after every number
fn descending(a: &f32, b: &f32) -> CmpOrdering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(a),
        (x, y) => x.cmp(&y),
    }
}

/// Sort by average weighted degree over the datasets in which a node
/// is present, largest first. Nodes present in none of them follow
/// in their input order.
fn order_nodes_by_degree(members: &[Box<str>], stats: &[&ModuleStatistics]) -> Vec<Box<str>> {
    let mut scored = vec![];
    let mut missing = vec![];

    for node in members {
        let degrees: Vec<f32> = stats.iter().filter_map(|s| s.degree_of(node)).collect();
        if degrees.is_empty() {
            missing.push(node.clone());
        } else {
            let avg = degrees.iter().sum::<f32>() / degrees.len() as f32;
            scored.push((node.clone(), avg));
        }
    }

    scored.sort_by(|a, b| descending(&a.1, &b.1));
    scored
        .into_iter()
        .map(|(x, _)| x)
        .chain(missing)
        .collect()
}

/// Samples sorted by one module's summary, largest first
fn by_summary(stats: &ModuleStatistics, keep: impl Fn(&str) -> bool) -> Vec<Box<str>> {
    let Some(data) = stats.data.as_ref() else {
        return vec![];
    };
    let mut scored: Vec<(Box<str>, f32)> = data
        .samples
        .iter()
        .zip(data.summary.iter())
        .filter(|(s, _)| keep(s))
        .map(|(s, &v)| (s.clone(), v))
        .collect();
    scored.sort_by(|a, b| descending(&a.1, &b.1));
    scored.into_iter().map(|(s, _)| s).collect()
}

fn order_samples(
    table: &StatsTable,
    module: &str,
    args: &AlignmentArgs,
) -> Result<Option<Ordering>> {
    let test = args.test.as_ref();
    let test_stats = table.require(test, module)?;

    let Some(test_data) = test_stats.data.as_ref() else {
        return Ok(None);
    };

    let present = |xs: Vec<Box<str>>| xs.into_iter().map(OrderEntry::Present);

    let ordering_stats = match args.order_samples_by.as_deref() {
        None => {
            return Ok(Some(Ordering {
                entries: present(test_data.samples.clone()).collect(),
            }));
        }
        Some(d) if d == test => {
            return Ok(Some(Ordering {
                entries: present(by_summary(test_stats, |_| true)).collect(),
            }));
        }
        Some(d) => table.require(d, module)?,
    };

    let Some(ordering_data) = ordering_stats.data.as_ref() else {
        warn!(
            "no data in {}; ordering samples by {}",
            ordering_stats.dataset, test
        );
        return Ok(Some(Ordering {
            entries: present(by_summary(test_stats, |_| true)).collect(),
        }));
    };

    let in_test: HashSet<&str> = test_data.samples.iter().map(|x| x.as_ref()).collect();
    let in_ordering: HashSet<&str> = ordering_data.samples.iter().map(|x| x.as_ref()).collect();

    let shared = by_summary(ordering_stats, |s| in_test.contains(s));
    let test_only = by_summary(test_stats, |s| !in_ordering.contains(s));
    let ordering_only = by_summary(ordering_stats, |s| !in_test.contains(s));

    let mut entries: Vec<OrderEntry> = present(shared.clone()).collect();
    if !shared.is_empty() && !test_only.is_empty() {
        entries.push(OrderEntry::Separator);
    }
    entries.extend(present(test_only));
    entries.extend(ordering_only.into_iter().map(OrderEntry::Absent));

    Ok(Some(Ordering { entries }))
}
