//! Tabular output of statistics and orderings
//!
//! Text outputs go through `matrix_util::common_io`, so a `.gz`
//! suffix gives gzipped output.

use crate::alignment::{OrderEntry, Ordering};
use crate::preservation::PreservationStatistics;
use crate::statistics::StatsTable;
use crate::Mat;

use log::info;
use matrix_util::common_io::{file_ext, write_lines};
use matrix_util::traits::IoOps;

const MISSING: &str = "NA";

fn fmt_opt(x: Option<f32>) -> String {
    x.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_string())
}

/// One line per (dataset, module, node): weighted degree,
/// contribution and whether the node is present in the dataset.
///
/// ```text
/// dataset  module  node  present  weighted_degree  contribution
/// ```
pub fn write_node_table(table: &StatsTable, file: &str) -> anyhow::Result<()> {
    let mut lines: Vec<Box<str>> =
        vec!["dataset\tmodule\tnode\tpresent\tweighted_degree\tcontribution".into()];

    for dataset in table.datasets() {
        for stats in table.dataset_stats(dataset) {
            for (i, node) in stats.nodes.iter().enumerate() {
                let contrib = stats.data.as_ref().map(|x| x.contribution[i]);
                lines.push(
                    format!(
                        "{}\t{}\t{}\ttrue\t{}\t{}",
                        dataset,
                        stats.module,
                        node,
                        stats.weighted_degree[i],
                        fmt_opt(contrib)
                    )
                    .into_boxed_str(),
                );
            }
            for node in stats.absent_nodes.iter() {
                lines.push(
                    format!(
                        "{}\t{}\t{}\tfalse\t{}\t{}",
                        dataset, stats.module, node, MISSING, MISSING
                    )
                    .into_boxed_str(),
                );
            }
        }
    }

    write_lines(&lines, file)?;
    info!("wrote {} node rows to {}", lines.len() - 1, file);
    Ok(())
}

/// One line per (dataset, module) with the module-level values
pub fn write_module_table(table: &StatsTable, file: &str) -> anyhow::Result<()> {
    let mut lines: Vec<Box<str>> = vec![
        "dataset\tmodule\tnum_nodes\tnum_absent\tavg_edge_weight\tvariance_explained\tcoherence"
            .into(),
    ];

    for dataset in table.datasets() {
        for stats in table.dataset_stats(dataset) {
            let data = stats.data.as_ref();
            lines.push(
                format!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    dataset,
                    stats.module,
                    stats.num_nodes(),
                    stats.absent_nodes.len(),
                    stats.avg_edge_weight,
                    fmt_opt(data.map(|x| x.variance_explained)),
                    fmt_opt(data.map(|x| x.coherence)),
                )
                .into_boxed_str(),
            );
        }
    }

    write_lines(&lines, file)?;
    Ok(())
}

/// Module summaries of one dataset as a sample x module matrix.
/// Writes parquet if `file` ends with `.parquet`, delimited text
/// otherwise. Returns `false` if the dataset has no summaries.
pub fn write_summaries(table: &StatsTable, dataset: &str, file: &str) -> anyhow::Result<bool> {
    let with_data: Vec<_> = table
        .dataset_stats(dataset)
        .into_iter()
        .filter(|s| s.data.is_some())
        .collect();

    let Some(samples) = with_data
        .first()
        .and_then(|s| s.data.as_ref())
        .map(|x| x.samples.clone())
    else {
        return Ok(false);
    };

    let mut mat = Mat::zeros(samples.len(), with_data.len());
    let mut modules = Vec::with_capacity(with_data.len());

    for (k, stats) in with_data.iter().enumerate() {
        let data = stats
            .data
            .as_ref()
            .ok_or(anyhow::anyhow!("no summary for {}", stats.module))?;
        if data.samples != samples {
            anyhow::bail!(
                "module {} in {} was computed on different samples",
                stats.module,
                dataset
            );
        }
        mat.column_mut(k).copy_from(&data.summary);
        modules.push(stats.module.clone());
    }

    match file_ext(file)?.as_ref() {
        "parquet" => mat.to_parquet_with_names(
            file,
            Some(samples.as_slice()),
            Some(modules.as_slice()),
        )?,
        "csv" => mat.write_data_with_names(file, ",", &samples, &modules)?,
        _ => mat.write_data_with_names(file, "\t", &samples, &modules)?,
    }

    info!("wrote {} x {} summaries to {}", samples.len(), modules.len(), file);
    Ok(true)
}

/// One entry per line: `label<tab>present`, `label<tab>absent`, or
/// `-<tab>separator` at the shared/test-only boundary
pub fn write_ordering(ordering: &Ordering, file: &str) -> anyhow::Result<()> {
    let lines: Vec<Box<str>> = ordering
        .entries
        .iter()
        .map(|x| match x {
            OrderEntry::Present(l) => format!("{}\tpresent", l).into_boxed_str(),
            OrderEntry::Absent(l) => format!("{}\tabsent", l).into_boxed_str(),
            OrderEntry::Separator => "-\tseparator".into(),
        })
        .collect();
    write_lines(&lines, file)
}

/// Node ordering with the module of each node
pub fn write_node_ordering(
    ordering: &Ordering,
    node_modules: &[Box<str>],
    file: &str,
) -> anyhow::Result<()> {
    if ordering.entries.len() != node_modules.len() {
        anyhow::bail!(
            "{} node entries but {} module labels",
            ordering.entries.len(),
            node_modules.len()
        );
    }

    let lines: Vec<Box<str>> = ordering
        .entries
        .iter()
        .zip(node_modules.iter())
        .filter_map(|(x, m)| match x {
            OrderEntry::Present(l) => Some(format!("{}\t{}\tpresent", l, m).into_boxed_str()),
            OrderEntry::Absent(l) => Some(format!("{}\t{}\tabsent", l, m).into_boxed_str()),
            OrderEntry::Separator => None,
        })
        .collect();
    write_lines(&lines, file)
}

pub fn write_preservation_json(stats: &[PreservationStatistics], file: &str) -> anyhow::Result<()> {
    std::fs::write(file, serde_json::to_string_pretty(stats)?)?;
    info!("wrote preservation statistics to {}", file);
    Ok(())
}
