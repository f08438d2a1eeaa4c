//! Statistics requests: modules of a discovery dataset measured in
//! one or more test datasets.
//!
//! Each test dataset is made resident for the duration of its
//! computation. The residency scope evicts whatever is loaded when
//! the request returns, successfully or not.

use crate::dataset::{DatasetCollection, DatasetRef, ModuleAssignment};
use crate::error::{Axis, Result, TopologyError};
use crate::indexer::{resolve_positions, Subset};
use crate::matrix_store::{MatrixSource, ResidencyState};
use crate::topology::{compute_module_stats, ModuleInputs, ModuleQuery, ModuleStatistics};

use fnv::FnvHashMap as HashMap;
use indicatif::{ProgressBar, ProgressDrawTarget};
use log::{info, warn};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct StatsArgs {
    /// modules to measure; all non-background modules if `None`
    pub modules: Option<Vec<Box<str>>>,
    /// data rows (samples) to use in every test dataset
    pub samples: Option<Subset>,
    /// standardize node data before computing module summaries
    pub scale_data: bool,
    /// log and drop degenerate modules instead of failing
    pub skip_degenerate: bool,
    pub show_progress: bool,
}

impl Default for StatsArgs {
    fn default() -> Self {
        Self {
            modules: None,
            samples: None,
            scale_data: true,
            skip_degenerate: false,
            show_progress: false,
        }
    }
}

/// Module statistics keyed by (test dataset, module)
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    discovery: Box<str>,
    modules: Vec<Box<str>>,
    by_dataset: HashMap<Box<str>, HashMap<Box<str>, ModuleStatistics>>,
    dataset_order: Vec<Box<str>>,
}

impl StatsTable {
    pub fn new(discovery: &str) -> Self {
        Self {
            discovery: discovery.into(),
            ..Default::default()
        }
    }

    pub fn discovery(&self) -> &str {
        &self.discovery
    }

    /// Modules in the order they were requested
    pub fn modules(&self) -> &[Box<str>] {
        &self.modules
    }

    /// Test datasets in the order they were computed
    pub fn datasets(&self) -> &[Box<str>] {
        &self.dataset_order
    }

    pub fn insert(&mut self, stats: ModuleStatistics) {
        if !self.modules.contains(&stats.module) {
            self.modules.push(stats.module.clone());
        }
        if !self.dataset_order.contains(&stats.dataset) {
            self.dataset_order.push(stats.dataset.clone());
        }
        self.by_dataset
            .entry(stats.dataset.clone())
            .or_default()
            .insert(stats.module.clone(), stats);
    }

    pub fn get(&self, dataset: &str, module: &str) -> Option<&ModuleStatistics> {
        self.by_dataset.get(dataset)?.get(module)
    }

    /// Like `get`, but a missing entry is an alignment error
    pub fn require(&self, dataset: &str, module: &str) -> Result<&ModuleStatistics> {
        self.get(dataset, module)
            .ok_or_else(|| TopologyError::inconsistent(module, dataset))
    }

    /// Statistics of `dataset`, in module order
    pub fn dataset_stats(&self, dataset: &str) -> Vec<&ModuleStatistics> {
        self.modules
            .iter()
            .filter_map(|m| self.get(dataset, m))
            .collect()
    }
}

/// Measure the modules of `assignment` (defined in `discovery`) in
/// each of the `tests` datasets.
///
/// * `datasets` - all datasets
/// * `assignment` - node to module mapping of the discovery dataset
/// * `residency` - which dataset is loaded; empty again on return
/// * `discovery` - the dataset the modules come from
/// * `tests` - datasets to measure them in (may include discovery)
/// * `args` - which modules and samples, and how
pub fn compute_statistics(
    datasets: &DatasetCollection,
    assignment: &ModuleAssignment,
    residency: &mut ResidencyState,
    discovery: &DatasetRef,
    tests: &[DatasetRef],
    args: &StatsArgs,
) -> Result<StatsTable> {
    let discovery = datasets.get(discovery)?;
    if discovery.name.as_ref() != assignment.discovery() {
        return Err(TopologyError::invalid_input(format!(
            "module assignment belongs to `{}`, not `{}`",
            assignment.discovery(),
            discovery.name
        )));
    }

    let modules = assignment.select_modules(args.modules.as_deref())?;
    let tests = tests
        .iter()
        .map(|t| datasets.get(t))
        .collect::<Result<Vec<_>>>()?;

    // check the sample request against declared names before loading
    if let Some(samples) = args.samples.as_ref() {
        for test in tests.iter() {
            if let Some(data) = test.data.as_ref() {
                resolve_positions(samples, data.row_names(), data.name(), Axis::Row)?;
            }
        }
    }

    let mut table = StatsTable::new(&discovery.name);
    let mut scope = residency.scope();

    for test in tests {
        let common = test.common_nodes();
        let test_nodes: HashSet<&str> = common.iter().map(|x| x.as_ref()).collect();
        let resident = scope.resolve(test)?;

        let inputs = ModuleInputs {
            network: resident.network.as_ref(),
            correlation: resident.correlation.as_ref(),
            data: resident.data.as_ref().map(|x| x.as_ref() as &dyn MatrixSource),
        };

        info!(
            "{} module(s) of {} in {}",
            modules.len(),
            discovery.name,
            test.name
        );

        let pb = if args.show_progress {
            ProgressBar::new(modules.len() as u64)
        } else {
            ProgressBar::with_draw_target(Some(modules.len() as u64), ProgressDrawTarget::hidden())
        };

        for module in modules.iter() {
            let members = assignment.module_nodes(module);
            let in_module: HashSet<&str> = members.iter().map(|x| x.as_ref()).collect();

            // present nodes keep the test network's order
            let present: Vec<Box<str>> = common
                .iter()
                .filter(|x| in_module.contains(x.as_ref()))
                .cloned()
                .collect();
            let absent: Vec<Box<str>> = members
                .iter()
                .filter(|x| !test_nodes.contains(x.as_ref()))
                .cloned()
                .collect();

            if !absent.is_empty() {
                info!(
                    "module {}: {} of {} node(s) absent from {}",
                    module,
                    absent.len(),
                    absent.len() + present.len(),
                    test.name
                );
            }

            let query = ModuleQuery {
                module: module.clone(),
                dataset: test.name.clone(),
                nodes: Some(Subset::Names(present)),
                samples: args.samples.clone(),
                absent_nodes: absent,
                scale_data: args.scale_data,
            };

            match compute_module_stats(&inputs, &query) {
                Ok(stats) => table.insert(stats),
                Err(e) if e.is_degenerate() && args.skip_degenerate => {
                    warn!("skipping in {}: {}", test.name, e);
                }
                Err(e) => return Err(e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    Ok(table)
}
