use anyhow::Result;
use ndarray::{Array1, Array2};

use milbench::bench::{BENCH_FILTER, BenchOptions, QueryVectors, run_benchmark};
use milbench::config::{GIST_COLLECTION, GIST_DIM, IndexKind, MetricKind, SIFT_COLLECTION, SIFT_DIM, TOP_K};
use milbench::dataset::Dataset;
use milbench::import::{ImportOptions, run_import};
use milbench::store::{MemStore, SearchQuery, VectorStore};

const N: usize = 8;

/// 构造可控的数据集：查询向量为第 0 条记录，第 5 条被刻意放在查询附近，
/// 其余记录距离随下标递增。0、2、5 号记录满足过滤条件。
fn dataset() -> Dataset {
    let mut sift = Array2::zeros((N, SIFT_DIM));
    let mut gist = Array2::zeros((N, GIST_DIM));
    for i in 0..N {
        sift.row_mut(i).fill(i as f32 * 10.0);
        gist.row_mut(i).fill(i as f32 * 10.0);
    }
    sift.row_mut(5).fill(0.5);
    gist.row_mut(5).fill(0.5);

    let category = Array1::from_vec(
        (0..N).map(|i| if [0, 2, 5].contains(&i) { 5 } else { 1 }).collect(),
    );
    Dataset {
        sift,
        gist,
        image_id: Array1::from_iter(0..N as i32),
        category,
        confidence: Array1::from_elem(N, 0.2),
        votes: Array1::from_elem(N, 42),
    }
}

fn import_options(batch_size: usize) -> ImportOptions {
    ImportOptions {
        batch_size,
        index: IndexKind::IvfFlat,
        metric: MetricKind::L2,
        nlist: 16,
    }
}

fn bench_options(evaluate: bool) -> BenchOptions {
    BenchOptions { iterations: 2, nprobe: 32, metric: MetricKind::L2, evaluate }
}

fn queries(dataset: &Dataset) -> QueryVectors {
    QueryVectors {
        sift: dataset.sift.row(0).to_vec(),
        gist: dataset.gist.row(0).to_vec(),
    }
}

#[tokio::test]
async fn import_creates_and_fills_both_collections() -> Result<()> {
    let store = MemStore::new();
    run_import(&store, &dataset(), &import_options(3)).await?;

    assert!(store.has_collection(SIFT_COLLECTION).await?);
    assert!(store.has_collection(GIST_COLLECTION).await?);
    assert_eq!(store.count(SIFT_COLLECTION).await?, N as i64);
    assert_eq!(store.count(GIST_COLLECTION).await?, N as i64);
    Ok(())
}

#[tokio::test]
async fn reimport_replaces_previous_data() -> Result<()> {
    let store = MemStore::new();
    run_import(&store, &dataset(), &import_options(10)).await?;
    run_import(&store, &dataset(), &import_options(10)).await?;
    assert_eq!(store.count(SIFT_COLLECTION).await?, N as i64);
    Ok(())
}

#[tokio::test]
async fn nearest_record_wins() -> Result<()> {
    let store = MemStore::new();
    let dataset = dataset();
    run_import(&store, &dataset, &import_options(3)).await?;

    let query = SearchQuery {
        vector: dataset.sift.row(0).to_vec(),
        limit: TOP_K,
        nprobe: 32,
        metric: MetricKind::L2,
        filter: None,
    };
    let hits = store.search(SIFT_COLLECTION, &query).await?;
    assert_eq!(hits.len(), N);
    // 第 0 条与查询重合，第 5 条被放在它旁边
    assert_eq!(hits[0].id, 0);
    assert_eq!(hits[0].distance, 0.0);
    assert_eq!(hits[1].id, 5);
    assert_eq!(hits[2].id, 1);
    Ok(())
}

#[tokio::test]
async fn filtered_search_returns_matching_records_only() -> Result<()> {
    let store = MemStore::new();
    let dataset = dataset();
    run_import(&store, &dataset, &import_options(3)).await?;

    let query = SearchQuery {
        vector: dataset.sift.row(0).to_vec(),
        limit: TOP_K,
        nprobe: 32,
        metric: MetricKind::L2,
        filter: Some(BENCH_FILTER),
    };
    let hits = store.search(SIFT_COLLECTION, &query).await?;
    assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![0, 5, 2]);
    Ok(())
}

#[tokio::test]
async fn benchmark_reports_all_six_queries() -> Result<()> {
    let store = MemStore::new();
    let dataset = dataset();
    run_import(&store, &dataset, &import_options(3)).await?;

    let reports = run_benchmark(&store, &queries(&dataset), &bench_options(false)).await?;

    assert_eq!(reports.len(), 6);
    assert!(reports[0].name.starts_with("Q1"));
    assert!(reports[5].name.starts_with("Q6"));
    for report in &reports {
        assert!(report.avg_time_ms >= 0.0);
        assert!(report.avg_scan_time_ms.is_none());
        assert!(report.avg_recall.is_none());
    }
    // 只有单集合查询保留 top 3
    for report in &reports[..4] {
        assert!(!report.top_hits.is_empty());
        assert!(report.top_hits.len() <= 3);
        assert_eq!(report.top_hits[0].id, 0);
    }
    assert!(reports[4].top_hits.is_empty());
    assert!(reports[5].top_hits.is_empty());
    Ok(())
}

#[tokio::test]
async fn benchmark_follows_import_metric() -> Result<()> {
    let store = MemStore::new();
    let dataset = dataset();
    let mut opts = import_options(3);
    opts.metric = MetricKind::Ip;
    run_import(&store, &dataset, &opts).await?;

    // 搜索度量与导入度量不一致时应失败
    let err = run_benchmark(&store, &queries(&dataset), &bench_options(false)).await.unwrap_err();
    assert!(err.to_string().contains("does not match collection metric"));

    let mut bench = bench_options(false);
    bench.metric = MetricKind::Ip;
    let reports = run_benchmark(&store, &queries(&dataset), &bench).await?;
    assert_eq!(reports.len(), 6);
    Ok(())
}

#[tokio::test]
async fn evaluate_mode_reports_perfect_recall_for_exhaustive_backend() -> Result<()> {
    let store = MemStore::new();
    let dataset = dataset();
    run_import(&store, &dataset, &import_options(3)).await?;

    let reports = run_benchmark(&store, &queries(&dataset), &bench_options(true)).await?;

    for report in &reports {
        assert!(report.avg_scan_time_ms.is_some());
        assert_eq!(report.avg_recall, Some(1.0), "{}", report.name);
    }
    Ok(())
}
