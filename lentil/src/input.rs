use lentil::dataset::{Dataset, DatasetCollection};
use lentil::matrix_store::{DiskMatrix, MatrixHandle};

use clap::Args;
use log::info;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// dataset names (comma-separated), one per network file
    #[arg(long, short = 'n', value_delimiter(','), required = true)]
    pub names: Vec<Box<str>>,

    /// network (node x node edge weight) files (comma-separated) of
    /// `.parquet`, `.tsv`, `.tsv.gz` or `.csv` format
    #[arg(long, short = 'w', value_delimiter(','), required = true)]
    pub network_files: Vec<Box<str>>,

    /// correlation (node x node) files (comma-separated)
    #[arg(long, short = 'c', value_delimiter(','), required = true)]
    pub correlation_files: Vec<Box<str>>,

    /// data (sample x node) files (comma-separated). Without them,
    /// only network statistics are computed.
    #[arg(long, short = 'x', value_delimiter(','))]
    pub data_files: Option<Vec<Box<str>>>,

    /// module assignment file: each line holds a node and its module
    #[arg(long, short = 'a', required = true)]
    pub assignment_file: Box<str>,

    /// the dataset in which modules were defined
    #[arg(long, short = 'd', required = true)]
    pub discovery: Box<str>,

    /// module label of unassigned nodes
    #[arg(long, default_value = "0")]
    pub background: Box<str>,

    /// read every matrix into memory up front instead of loading
    /// one dataset at a time
    #[arg(long, default_value_t = false)]
    pub preload: bool,
}

fn open_matrix(name: &str, file: &str, preload: bool) -> anyhow::Result<MatrixHandle> {
    let disk = DiskMatrix::describe(name, file)?;
    if preload {
        Ok(MatrixHandle::Resident(Arc::new(disk.load()?)))
    } else {
        Ok(MatrixHandle::Disk(disk))
    }
}

/// Normalize the per-dataset file lists into one collection
pub fn read_datasets(args: &InputArgs) -> anyhow::Result<DatasetCollection> {
    let ndata = args.names.len();

    if args.network_files.len() != ndata || args.correlation_files.len() != ndata {
        return Err(anyhow::anyhow!(
            "# names ({}) != # network files ({}) or # correlation files ({})",
            ndata,
            args.network_files.len(),
            args.correlation_files.len()
        ));
    }

    let data_files: Vec<Option<Box<str>>> = match args.data_files.as_ref() {
        Some(files) if files.len() != ndata => {
            return Err(anyhow::anyhow!(
                "# data files ({}) != # names ({})",
                files.len(),
                ndata
            ));
        }
        Some(files) => files.iter().cloned().map(Some).collect(),
        None => vec![None; ndata],
    };

    let mut datasets = DatasetCollection::new();

    for (d, name) in args.names.iter().enumerate() {
        info!("dataset {}: {}", name, args.network_files[d]);

        let network = open_matrix(
            &format!("{}/network", name),
            &args.network_files[d],
            args.preload,
        )?;
        let correlation = open_matrix(
            &format!("{}/correlation", name),
            &args.correlation_files[d],
            args.preload,
        )?;
        let data = data_files[d]
            .as_ref()
            .map(|f| open_matrix(&format!("{}/data", name), f, args.preload))
            .transpose()?;

        datasets.push(Dataset::new(name, network, correlation, data)?)?;
    }

    Ok(datasets)
}
