use lentil::dataset::Dataset;
use lentil::error::Axis;
use lentil::indexer::{restrict, Subset};
use lentil::matrix_store::*;
use lentil::topology::{compute_module_stats, ModuleInputs, ModuleQuery};
use lentil::{Mat, TopologyError};

use matrix_util::common_io::create_temp_dir_file;
use matrix_util::traits::IoOps;
use std::cell::Cell;
use std::sync::Arc;

fn names(prefix: &str, n: usize) -> Vec<Box<str>> {
    (0..n)
        .map(|i| format!("{}{}", prefix, i).into_boxed_str())
        .collect()
}

fn network(n: usize) -> Mat {
    Mat::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            1.0 / (1 + i + j) as f32
        }
    })
}

fn data(nsamples: usize, nnodes: usize) -> Mat {
    Mat::from_fn(nsamples, nnodes, |i, j| ((i * 7 + j * 3) as f32).sin() + i as f32 * 0.1)
}

/// Write a dataset's matrices to disk and refer to them without
/// reading any values
fn disk_dataset(name: &str, ext: &str, nnodes: usize, nsamples: usize) -> anyhow::Result<Dataset> {
    let nodes = names("n", nnodes);
    let samples = names("s", nsamples);

    let mut handles = vec![];
    for (what, mat, rows) in [
        ("network", network(nnodes), &nodes),
        ("correlation", Mat::identity(nnodes, nnodes), &nodes),
        ("data", data(nsamples, nnodes), &samples),
    ] {
        let file = create_temp_dir_file(ext)?;
        let file = file.to_str().unwrap();
        if ext.ends_with("parquet") {
            mat.to_parquet_with_names(file, Some(rows.as_slice()), Some(nodes.as_slice()))?;
        } else {
            mat.write_data_with_names(file, "\t", rows, &nodes)?;
        }
        handles.push(MatrixHandle::Disk(DiskMatrix::describe(
            &format!("{}/{}", name, what),
            file,
        )?));
    }

    let data = handles.pop();
    let correlation = handles.pop().unwrap();
    let network = handles.pop().unwrap();
    Ok(Dataset::new(name, network, correlation, data)?)
}

// ─────────────────────────────────────────────────────
// Residency
// ─────────────────────────────────────────────────────

#[test]
fn only_one_dataset_is_resident() -> anyhow::Result<()> {
    let a = disk_dataset("a", ".tsv.gz", 5, 8)?;
    let b = disk_dataset("b", ".parquet", 4, 6)?;
    assert!(a.network.is_disk_backed());

    let mut state = ResidencyState::new();

    let a_network = Arc::downgrade(&state.resolve(&a)?.network);
    assert!(state.is_resident("a"));
    assert!(a_network.upgrade().is_some());

    // resolving again reuses what is loaded
    state.resolve(&a)?;
    assert_eq!(state.num_loads(), 1);

    let set = state.resolve(&b)?;
    assert_eq!(set.dataset.as_ref(), "b");
    assert_eq!(set.network.matrix().shape(), (4, 4));
    assert_eq!(set.data.as_ref().unwrap().matrix().shape(), (6, 4));

    // a's matrices are gone
    assert!(a_network.upgrade().is_none());
    assert_eq!(state.resident_dataset(), Some("b"));
    assert_eq!(state.num_loads(), 2);
    assert_eq!(state.num_evictions(), 1);
    Ok(())
}

#[test]
fn scope_evicts_on_exit() -> anyhow::Result<()> {
    let a = disk_dataset("a", ".tsv", 3, 4)?;
    let mut state = ResidencyState::new();

    {
        let mut scope = state.scope();
        scope.resolve(&a)?;
        assert_eq!(scope.resident_dataset(), Some("a"));
    }

    assert!(state.resident_dataset().is_none());
    assert_eq!(state.num_evictions(), 1);
    Ok(())
}

#[test]
fn declared_shape_must_match_file() -> anyhow::Result<()> {
    let nodes = names("n", 4);
    let file = create_temp_dir_file(".tsv")?;
    let file = file.to_str().unwrap();
    network(4).write_data_with_names(file, "\t", &nodes, &nodes)?;

    // declares three nodes, the file has four
    let declared = names("n", 3);
    let net = DiskMatrix::new("bad/network", file, declared.clone(), declared.clone())?;
    let net = MatrixHandle::Disk(net);
    let identity = Mat::identity(3, 3);
    let corr = MatrixHandle::resident("bad/correlation", identity, declared.clone(), declared)?;
    let bad = Dataset::new("bad", net, corr, None)?;

    let mut state = ResidencyState::new();
    let err = state.resolve(&bad).unwrap_err();

    match err {
        TopologyError::DataAccess { matrix, .. } => assert_eq!(matrix.as_ref(), "bad/network"),
        other => panic!("unexpected error: {}", other),
    }
    assert!(state.resident_dataset().is_none());
    Ok(())
}

#[test]
fn parquet_submatrix_reads_selected_columns() -> anyhow::Result<()> {
    let xx = data(6, 5);
    let rows = names("s", 6);
    let cols = names("n", 5);

    let file = create_temp_dir_file(".parquet")?;
    let file = file.to_str().unwrap();
    xx.to_parquet_with_names(file, Some(rows.as_slice()), Some(cols.as_slice()))?;

    let disk = DiskMatrix::describe("data", file)?;
    assert_eq!(disk.dimensions(), (6, 5));
    assert_eq!(disk.column_names(), &cols[..]);

    let sub = disk.read_submatrix(&[4, 0], &[3, 1])?;
    assert_eq!(sub.shape(), (2, 2));
    approx::assert_abs_diff_eq!(sub[(0, 0)], xx[(4, 3)], epsilon = 1e-6);
    approx::assert_abs_diff_eq!(sub[(1, 1)], xx[(0, 1)], epsilon = 1e-6);

    let err = disk.read_submatrix(&[6], &[0]).unwrap_err();
    assert!(matches!(err, TopologyError::OutOfRange { axis: Axis::Row, extent: 6, .. }));
    Ok(())
}

// ─────────────────────────────────────────────────────
// Bounds checks come before any read
// ─────────────────────────────────────────────────────

struct CountingSource {
    inner: ResidentMatrix,
    reads: Cell<usize>,
}

impl CountingSource {
    fn new(name: &str, mat: Mat, rows: Vec<Box<str>>, cols: Vec<Box<str>>) -> Self {
        Self {
            inner: ResidentMatrix::new(name, mat, rows, cols).unwrap(),
            reads: Cell::new(0),
        }
    }
}

impl MatrixSource for CountingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimensions(&self) -> (usize, usize) {
        self.inner.dimensions()
    }

    fn row_names(&self) -> &[Box<str>] {
        self.inner.row_names()
    }

    fn column_names(&self) -> &[Box<str>] {
        self.inner.column_names()
    }

    fn read_submatrix(&self, rows: &[usize], cols: &[usize]) -> lentil::Result<Mat> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_submatrix(rows, cols)
    }
}

fn counting_inputs() -> (CountingSource, CountingSource, CountingSource) {
    let nodes = names("n", 4);
    (
        CountingSource::new("net", network(4), nodes.clone(), nodes.clone()),
        CountingSource::new("cor", Mat::identity(4, 4), nodes.clone(), nodes.clone()),
        CountingSource::new("data", data(10, 4), names("s", 10), nodes),
    )
}

#[test]
fn out_of_range_positions_fail_without_reads() -> anyhow::Result<()> {
    let (net, cor, dat) = counting_inputs();
    let inputs = ModuleInputs {
        network: &net,
        correlation: &cor,
        data: Some(&dat as &dyn MatrixSource),
    };

    let query = ModuleQuery {
        module: "1".into(),
        nodes: Some(Subset::Positions(vec![0, 5])),
        ..Default::default()
    };

    let err = compute_module_stats(&inputs, &query).unwrap_err();
    assert_eq!(
        err.to_string(),
        "column indices out of range for `net`: {0, 5}; valid range is [1, 4]"
    );
    match err {
        TopologyError::OutOfRange {
            invalid, extent, ..
        } => {
            let expected: Vec<Box<str>> = vec!["0".into(), "5".into()];
            assert_eq!(invalid, expected);
            assert_eq!(extent, 4);
        }
        other => panic!("unexpected error: {}", other),
    }

    assert_eq!(net.reads.get() + cor.reads.get() + dat.reads.get(), 0);
    Ok(())
}

#[test]
fn unknown_sample_fails_without_reads() -> anyhow::Result<()> {
    let (net, cor, dat) = counting_inputs();
    let inputs = ModuleInputs {
        network: &net,
        correlation: &cor,
        data: Some(&dat as &dyn MatrixSource),
    };

    let query = ModuleQuery {
        module: "1".into(),
        nodes: Some(Subset::Positions(vec![1, 2, 3])),
        samples: Some(Subset::names(&["s0", "s3", "nobody"])),
        ..Default::default()
    };

    let err = compute_module_stats(&inputs, &query).unwrap_err();
    assert!(matches!(
        err,
        TopologyError::OutOfRange { axis: Axis::Row, ref invalid, extent: 10, .. }
            if invalid.len() == 1 && invalid[0].as_ref() == "nobody"
    ));
    assert_eq!(net.reads.get() + cor.reads.get() + dat.reads.get(), 0);

    // the same request with valid samples reads each matrix once
    let query = ModuleQuery {
        samples: Some(Subset::names(&["s0", "s3", "s7"])),
        scale_data: true,
        ..query
    };
    let stats = compute_module_stats(&inputs, &query)?;
    assert_eq!(stats.nodes, names("n", 3));
    assert_eq!(stats.data.as_ref().unwrap().summary.len(), 3);
    assert_eq!((net.reads.get(), cor.reads.get(), dat.reads.get()), (1, 1, 1));
    Ok(())
}

#[test]
fn restrict_by_name_keeps_request_order() -> anyhow::Result<()> {
    let nodes = names("n", 4);
    let net = ResidentMatrix::new("net", network(4), nodes.clone(), nodes)?;
    let pick = Subset::names(&["n3", "n1"]);
    let sub = restrict(&net, Some(&pick), Some(&pick))?;
    assert_eq!(sub.rows, sub.cols);
    assert_eq!(sub.mat[(0, 1)], network(4)[(3, 1)]);
    Ok(())
}
