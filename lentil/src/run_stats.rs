use crate::input::*;

use lentil::alignment::{align, AlignmentArgs};
use lentil::dataset::{DatasetRef, ModuleAssignment};
use lentil::indexer::Subset;
use lentil::matrix_store::ResidencyState;
use lentil::output::*;
use lentil::preservation::{preservation, PreservationStatistics};
use lentil::statistics::{compute_statistics, StatsArgs};

use clap::Args;
use log::info;
use matrix_util::common_io::{mkdir, write_lines};

#[derive(Args, Debug, Clone)]
pub struct StatsCmdArgs {
    #[command(flatten)]
    input: InputArgs,

    /// test datasets (comma-separated); every dataset if not given
    #[arg(long, short = 't', value_delimiter(','))]
    tests: Option<Vec<Box<str>>>,

    /// modules to measure (comma-separated); every module if not given
    #[arg(long, short = 'm', value_delimiter(','))]
    modules: Option<Vec<Box<str>>>,

    /// samples to use (comma-separated names); every sample if not given
    #[arg(long, short = 's', value_delimiter(','))]
    samples: Option<Vec<Box<str>>>,

    /// use the data as given instead of standardizing each node
    #[arg(long, default_value_t = false)]
    no_scale: bool,

    /// skip modules too small for a summary instead of stopping
    #[arg(long, default_value_t = false)]
    skip_degenerate: bool,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OrderCmdArgs {
    #[command(flatten)]
    input: InputArgs,

    /// the dataset whose presence the orderings report
    #[arg(long, short = 't', required = true)]
    test: Box<str>,

    /// modules to draw (comma-separated); every module if not given
    #[arg(long, short = 'm', value_delimiter(','))]
    modules: Option<Vec<Box<str>>>,

    /// order nodes by average weighted degree in these datasets
    /// (comma-separated); the test dataset if not given
    #[arg(long, value_delimiter(','))]
    order_nodes_by: Option<Vec<Box<str>>>,

    /// order samples by the left-most module's summary in this
    /// dataset; the test dataset if not given
    #[arg(long)]
    order_samples_by: Option<Box<str>>,

    /// keep nodes in the test network's order
    #[arg(long, default_value_t = false)]
    no_order_nodes: bool,

    /// keep samples in data order
    #[arg(long, default_value_t = false)]
    no_order_samples: bool,

    /// keep modules in the given order
    #[arg(long, default_value_t = false)]
    no_order_modules: bool,

    /// use the data as given instead of standardizing each node
    #[arg(long, default_value_t = false)]
    no_scale: bool,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    if verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}

fn read_assignment(input: &InputArgs) -> anyhow::Result<ModuleAssignment> {
    Ok(ModuleAssignment::from_file(
        &input.assignment_file,
        &input.discovery,
        Some(&input.background),
    )?)
}

/// Statistics of every requested module in each test dataset, plus
/// preservation against the discovery dataset
pub fn run_stats(args: &StatsCmdArgs) -> anyhow::Result<()> {
    init_logger(args.verbose);
    mkdir(&args.out)?;

    let datasets = read_datasets(&args.input)?;
    let assignment = read_assignment(&args.input)?;
    let discovery = args.input.discovery.clone();

    // discovery first, so preservation has something to compare to
    let mut tests: Vec<Box<str>> = vec![discovery.clone()];
    let requested = args.tests.clone().unwrap_or_else(|| datasets.names());
    tests.extend(requested.into_iter().filter(|t| *t != discovery));

    let stats_args = StatsArgs {
        modules: args.modules.clone(),
        samples: args.samples.clone().map(Subset::Names),
        scale_data: !args.no_scale,
        skip_degenerate: args.skip_degenerate,
        show_progress: args.verbose,
    };

    let mut residency = ResidencyState::new();
    let table = compute_statistics(
        &datasets,
        &assignment,
        &mut residency,
        &DatasetRef::Name(discovery.clone()),
        &tests.iter().map(|t| DatasetRef::from(t.as_ref())).collect::<Vec<_>>(),
        &stats_args,
    )?;

    write_node_table(&table, &format!("{}.nodes.tsv.gz", args.out))?;
    write_module_table(&table, &format!("{}.modules.tsv.gz", args.out))?;

    for dataset in table.datasets() {
        write_summaries(&table, dataset, &format!("{}.{}.summary.parquet", args.out, dataset))?;
    }

    let mut preserved: Vec<PreservationStatistics> = vec![];
    for test in tests.iter().filter(|t| **t != discovery) {
        for module in table.modules() {
            if let (Some(d), Some(t)) = (table.get(&discovery, module), table.get(test, module)) {
                preserved.push(preservation(d, t)?);
            }
        }
    }

    if !preserved.is_empty() {
        write_preservation_json(&preserved, &format!("{}.preservation.json", args.out))?;
    }

    info!("done");
    Ok(())
}

/// Orderings of modules, nodes and samples for one test dataset
pub fn run_order(args: &OrderCmdArgs) -> anyhow::Result<()> {
    init_logger(args.verbose);
    mkdir(&args.out)?;

    let datasets = read_datasets(&args.input)?;
    let assignment = read_assignment(&args.input)?;

    let mut align_args = AlignmentArgs::new(&args.test);
    align_args.order_modules = !args.no_order_modules;
    align_args.order_nodes_by = if args.no_order_nodes {
        None
    } else {
        Some(
            args.order_nodes_by
                .clone()
                .unwrap_or_else(|| vec![args.test.clone()]),
        )
    };
    align_args.order_samples_by = if args.no_order_samples {
        None
    } else {
        Some(
            args.order_samples_by
                .clone()
                .unwrap_or_else(|| args.test.clone()),
        )
    };

    // every dataset the ordering refers to needs statistics
    let mut needed: Vec<Box<str>> = vec![args.test.clone()];
    let referenced = align_args
        .order_nodes_by
        .iter()
        .flatten()
        .chain(align_args.order_samples_by.iter());
    for d in referenced {
        if !needed.contains(d) {
            needed.push(d.clone());
        }
    }

    let stats_args = StatsArgs {
        modules: args.modules.clone(),
        scale_data: !args.no_scale,
        show_progress: args.verbose,
        ..Default::default()
    };

    let mut residency = ResidencyState::new();
    let table = compute_statistics(
        &datasets,
        &assignment,
        &mut residency,
        &DatasetRef::Name(args.input.discovery.clone()),
        &needed.iter().map(|t| DatasetRef::from(t.as_ref())).collect::<Vec<_>>(),
        &stats_args,
    )?;

    let modules = assignment.select_modules(args.modules.as_deref())?;
    let aligned = align(&assignment, &table, &modules, &align_args)?;

    write_lines(&aligned.modules, &format!("{}.modules.txt", args.out))?;
    write_node_ordering(
        &aligned.nodes,
        &aligned.node_modules,
        &format!("{}.nodes.tsv", args.out),
    )?;
    if let Some(samples) = aligned.samples.as_ref() {
        write_ordering(samples, &format!("{}.samples.tsv", args.out))?;
    }

    info!("done");
    Ok(())
}
