use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use ndarray::Array2;
use predicates::prelude::*;

use milbench::fvecs::write_fvecs;

macro_rules! milbench {
    ($($args:expr),*) => {{
        let mut cmd = Command::cargo_bin("milbench")?;
        $(cmd.arg($args);)*
        cmd.assert()
    }};
}

fn vectors(n: usize, dim: usize) -> Array2<f32> {
    Array2::from_shape_fn((n, dim), |(i, j)| (i + j) as f32)
}

#[test]
fn prepare_writes_dataset() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let sift = dir.path().join("sift.fvecs");
    let gist = dir.path().join("gist.fvecs");
    let output = dir.path().join("dataset.npz");

    write_fvecs(&sift, &vectors(20, 128))?;
    write_fvecs(&gist, &vectors(20, 960))?;

    milbench!("prepare", "--sift", &sift, "--gist", &gist, "--output", &output, "-n", "10")
        .success()
        .stdout(predicate::str::contains("Dataset with 10 records successfully saved"));
    assert!(output.exists());
    Ok(())
}

#[test]
fn prepare_rejects_dimension_mismatch() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let sift = dir.path().join("sift.fvecs");
    let gist = dir.path().join("gist.fvecs");

    write_fvecs(&sift, &vectors(20, 64))?;
    write_fvecs(&gist, &vectors(20, 960))?;

    milbench!(
        "prepare",
        "--sift",
        &sift,
        "--gist",
        &gist,
        "--output",
        dir.path().join("dataset.npz"),
        "-n",
        "10"
    )
    .failure()
    .stderr(predicate::str::contains("SIFT vectors should be 128D"));
    Ok(())
}

#[test]
fn prepare_rejects_insufficient_records() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let sift = dir.path().join("sift.fvecs");
    let gist = dir.path().join("gist.fvecs");

    write_fvecs(&sift, &vectors(20, 128))?;
    write_fvecs(&gist, &vectors(20, 960))?;

    milbench!(
        "prepare",
        "--sift",
        &sift,
        "--gist",
        &gist,
        "--output",
        dir.path().join("dataset.npz"),
        "-n",
        "100"
    )
    .failure()
    .stderr(predicate::str::contains("greater than the number of available vectors"));
    Ok(())
}

// 导入和搜索在连接失败时只报告，退出码保持 0
#[test]
fn import_reports_connection_failure() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    milbench!(
        "import",
        "--input",
        dir.path().join("dataset.npz"),
        "--host",
        "127.0.0.1",
        "--port",
        "1"
    )
    .success()
    .stdout(predicate::str::contains("Failed to connect to Milvus"));
    Ok(())
}

#[test]
fn search_reports_connection_failure() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    milbench!(
        "search",
        dir.path().join("dataset.npz"),
        "--host",
        "127.0.0.1",
        "--port",
        "1"
    )
    .success()
    .stdout(predicate::str::contains("Failed to connect to Milvus"));
    Ok(())
}
