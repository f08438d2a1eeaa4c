mod input;
mod run_stats;

use crate::run_stats::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Module topology statistics across weighted network datasets\n\
		  Each dataset has a network, a correlation and (optionally) a data\n\
		  matrix in `.parquet`, `.tsv`, `.tsv.gz` or `.csv` format.\n\
		  Modules are defined in a discovery dataset and measured in the others."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Compute module statistics in test datasets",
        long_about = "For each module and test dataset, compute:\n\
		      (1) weighted degree of each node within the module\n\
		      (2) module summary (eigengene) and variance explained\n\
		      (3) node contribution to the summary\n\
		      and compare them with the discovery dataset.\n"
    )]
    Stats(StatsCmdArgs),

    #[command(
        about = "Order modules, nodes and samples for display",
        long_about = "Order modules by the similarity of their summaries,\n\
		      nodes by weighted degree and samples by the summary\n\
		      of the left-most module. Nodes and samples missing\n\
		      from the test dataset are kept and flagged.\n"
    )]
    Order(OrderCmdArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Stats(args) => {
            run_stats(args)?;
        }
        Commands::Order(args) => {
            run_order(args)?;
        }
    }

    Ok(())
}
