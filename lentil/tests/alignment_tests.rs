use lentil::alignment::*;
use lentil::dataset::{Dataset, DatasetCollection, ModuleAssignment};
use lentil::matrix_store::{MatrixHandle, ResidencyState};
use lentil::statistics::{compute_statistics, StatsArgs, StatsTable};
use lentil::Mat;

use std::collections::HashSet;

fn names(xs: &[&str]) -> Vec<Box<str>> {
    xs.iter().map(|&x| x.into()).collect()
}

fn sample_names(prefix: &str, n: usize) -> Vec<Box<str>> {
    (0..n)
        .map(|i| format!("{}{}", prefix, i).into_boxed_str())
        .collect()
}

/// Six nodes in three modules of two: modules 1 and 3 follow the
/// same trend across samples, module 2 alternates
fn node_data(nsamples: usize, shift: f32) -> Mat {
    Mat::from_fn(nsamples, 6, |i, j| {
        let trend = i as f32 + shift;
        let alt = if i % 2 == 0 { 1.0 } else { -1.0 };
        let noise = ((i * 5 + j * 11) as f32).sin() * 0.05;
        match j {
            0 | 1 | 4 | 5 => trend * (1.0 + j as f32 * 0.1) + noise,
            _ => alt * (1.0 + j as f32 * 0.1) + noise,
        }
    })
}

fn node_network(nodes: usize) -> Mat {
    Mat::from_fn(nodes, nodes, |i, j| {
        if i == j {
            1.0
        } else {
            0.1 * ((i + j) % 5) as f32 + 0.05
        }
    })
}

fn make_dataset(name: &str, nodes: &[&str], samples: &[Box<str>], data: Mat) -> Dataset {
    let nn = nodes.len();
    let handle = |what: &str, mat: Mat, rows: Vec<Box<str>>| {
        MatrixHandle::resident(&format!("{name}/{what}"), mat, rows, names(nodes)).unwrap()
    };
    let network = handle("network", node_network(nn), names(nodes));
    let correlation = handle("correlation", Mat::identity(nn, nn), names(nodes));
    let data = handle("data", data, samples.to_vec());
    Dataset::new(name, network, correlation, Some(data)).unwrap()
}

/// `disc` has every node and samples x0..x9; `test` lacks node n6
/// (module 3) and has samples x5..x9 plus y0..y3
fn setup() -> (DatasetCollection, ModuleAssignment, StatsTable) {
    let all = ["n1", "n2", "n3", "n4", "n5", "n6"];

    let disc = make_dataset("disc", &all, &sample_names("x", 10), node_data(10, 0.0));

    let mut test_samples = sample_names("x", 10).split_off(5);
    test_samples.extend(sample_names("y", 4));
    let test_data = node_data(9, 0.5).remove_column(5);
    let test = make_dataset("test", &all[..5], &test_samples, test_data);

    let mut datasets = DatasetCollection::new();
    datasets.push(disc).unwrap();
    datasets.push(test).unwrap();

    let pairs = [
        ("n1", "1"),
        ("n2", "1"),
        ("n3", "2"),
        ("n4", "2"),
        ("n5", "3"),
        ("n6", "3"),
        ("n7", "0"),
    ]
    .into_iter()
    .map(|(n, m)| (n.into(), m.into()));
    let assignment = ModuleAssignment::from_pairs("disc", pairs, None).unwrap();

    let mut residency = ResidencyState::new();
    let table = compute_statistics(
        &datasets,
        &assignment,
        &mut residency,
        &"disc".into(),
        &["disc".into(), "test".into()],
        &StatsArgs {
            skip_degenerate: true,
            ..Default::default()
        },
    )
    .unwrap();

    (datasets, assignment, table)
}

#[test]
fn similar_modules_are_adjacent() -> anyhow::Result<()> {
    let (_, assignment, table) = setup();

    // module 3 has one node in `test`, so order by discovery only
    let mut args = AlignmentArgs::new("disc");
    args.order_samples_by = None;

    let aligned = align(&assignment, &table, &names(&["1", "2", "3"]), &args)?;
    assert_eq!(aligned.modules, names(&["1", "3", "2"]));

    args.order_modules = false;
    let aligned = align(&assignment, &table, &names(&["1", "2", "3"]), &args)?;
    assert_eq!(aligned.modules, names(&["1", "2", "3"]));
    Ok(())
}

#[test]
fn orderings_cover_every_entity_once() -> anyhow::Result<()> {
    let (datasets, assignment, table) = setup();
    assert!(table.get("test", "3").is_none());

    let mut args = AlignmentArgs::new("test");
    args.order_nodes_by = Some(names(&["disc", "test"]));
    args.order_samples_by = Some("disc".into());
    args.order_modules = false;

    let aligned = align(&assignment, &table, &names(&["1", "2"]), &args)?;

    // nodes: every module member, none twice
    let labels = aligned.nodes.labels();
    let unique: HashSet<&str> = labels.iter().copied().collect();
    assert_eq!(labels.len(), unique.len());
    assert_eq!(unique, HashSet::from(["n1", "n2", "n3", "n4"]));
    assert_eq!(aligned.nodes.num_absent(), 0);

    // samples: union of `test` and `disc` samples
    let samples = aligned.samples.as_ref().unwrap();
    let labels = samples.labels();
    let unique: HashSet<&str> = labels.iter().copied().collect();
    assert_eq!(labels.len(), unique.len());

    let mut expected: HashSet<&str> = HashSet::new();
    for d in ["disc", "test"] {
        let ds = datasets.get(&d.into())?;
        expected.extend(ds.sample_names().unwrap().iter().map(|x| x.as_ref()));
    }
    assert_eq!(unique, expected);

    // shared samples first, then test-only, then disc-only as absent
    let entries = &samples.entries;
    let sep = entries
        .iter()
        .position(|x| *x == OrderEntry::Separator)
        .unwrap();
    assert_eq!(sep, 5);
    assert!(entries[..sep]
        .iter()
        .all(|x| matches!(x, OrderEntry::Present(s) if s.starts_with('x'))));
    assert!(entries[sep + 1..sep + 5]
        .iter()
        .all(|x| matches!(x, OrderEntry::Present(s) if s.starts_with('y'))));
    assert_eq!(samples.num_absent(), 5);
    assert!(samples.absent().iter().all(|s| s.starts_with('x')));
    Ok(())
}

#[test]
fn skipped_modules_and_input_order() -> anyhow::Result<()> {
    let (_, assignment, table) = setup();

    let mut args = AlignmentArgs::new("disc");
    args.order_nodes_by = Some(names(&["test"]));
    args.order_samples_by = None;
    args.order_modules = false;

    // module 3 was skipped in `test`
    assert!(align(&assignment, &table, &names(&["3"]), &args).is_err());

    let mut args = AlignmentArgs::new("test");
    args.order_nodes_by = None;
    args.order_samples_by = None;
    let aligned = align(&assignment, &table, &names(&["1"]), &args)?;
    assert_eq!(aligned.nodes.labels(), vec!["n1", "n2"]);

    // input order is kept for samples too
    let samples = aligned.samples.unwrap();
    assert_eq!(samples.num_present(), 9);
    assert!(!samples.has_separator());
    Ok(())
}

#[test]
fn unordered_nodes_follow_the_test_network() -> anyhow::Result<()> {
    let samples = sample_names("x", 10);
    let data = node_data(10, 0.0).columns(0, 4).into_owned();
    let mut datasets = DatasetCollection::new();
    datasets.push(make_dataset("test", &["n4", "n2", "n3", "n1"], &samples, data))?;

    let pairs = ["n1", "n2", "n3", "n4", "n5"]
        .into_iter()
        .map(|n| (n.into(), "1".into()));
    let assignment = ModuleAssignment::from_pairs("test", pairs, None)?;

    let mut residency = ResidencyState::new();
    let table = compute_statistics(
        &datasets,
        &assignment,
        &mut residency,
        &"test".into(),
        &["test".into()],
        &StatsArgs::default(),
    )?;

    let mut args = AlignmentArgs::new("test");
    args.order_nodes_by = None;
    let aligned = align(&assignment, &table, &names(&["1"]), &args)?;

    // present nodes as the network lists them, then the missing one
    assert_eq!(aligned.nodes.labels(), vec!["n4", "n2", "n3", "n1", "n5"]);
    assert_eq!(aligned.nodes.absent(), vec!["n5"]);
    Ok(())
}
