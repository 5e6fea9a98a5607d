//! 六个固定查询的基准测试
//!
//! Q1-Q4 为单集合查询，Q5/Q6 在同一计时窗口内分别搜索两个集合。
//! 两次搜索的结果不做合并重排，召回率取两者平均。

use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::config::{GIST_COLLECTION, MetricKind, SCAN_NPROBE, SIFT_COLLECTION, TOP_K};
use crate::store::{Hit, MetaFilter, SearchQuery, VectorStore};
use crate::utils::mean;

/// 过滤查询使用的固定谓词
pub const BENCH_FILTER: MetaFilter = MetaFilter { category: 5, max_confidence: 0.5 };

#[derive(Debug, Clone, Copy)]
pub struct BenchOptions {
    pub iterations: usize,
    pub nprobe: usize,
    /// 必须与导入时建索引的度量一致
    pub metric: MetricKind,
    pub evaluate: bool,
}

/// 查询向量，取自数据集的第一条记录
#[derive(Debug, Clone)]
pub struct QueryVectors {
    pub sift: Vec<f32>,
    pub gist: Vec<f32>,
}

struct QueryCase {
    name: &'static str,
    /// 在同一计时窗口内依次搜索的 (集合, 查询向量) 列表
    targets: Vec<(&'static str, Vec<f32>)>,
    filter: Option<MetaFilter>,
}

/// 单个查询的汇总结果
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub name: String,
    pub avg_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_scan_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_recall: Option<f64>,
    /// 最后一轮迭代的前三条命中，仅单集合查询保留
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_hits: Vec<Hit>,
}

fn cases(queries: &QueryVectors) -> Vec<QueryCase> {
    let sift = || (SIFT_COLLECTION, queries.sift.clone());
    let gist = || (GIST_COLLECTION, queries.gist.clone());
    vec![
        QueryCase { name: "Q1: Single KNN on SIFT vectors", targets: vec![sift()], filter: None },
        QueryCase { name: "Q2: Single KNN on GIST vectors", targets: vec![gist()], filter: None },
        QueryCase {
            name: "Q3: Single KNN on SIFT vectors with filters",
            targets: vec![sift()],
            filter: Some(BENCH_FILTER),
        },
        QueryCase {
            name: "Q4: Single KNN on GIST vectors with filters",
            targets: vec![gist()],
            filter: Some(BENCH_FILTER),
        },
        QueryCase {
            name: "Q5: Multi KNN on SIFT and GIST vectors",
            targets: vec![sift(), gist()],
            filter: None,
        },
        QueryCase {
            name: "Q6: Multi KNN on SIFT and GIST vectors with filters",
            targets: vec![sift(), gist()],
            filter: Some(BENCH_FILTER),
        },
    ]
}

/// recall@k：命中 id 与真值 id 的交集大小除以真值大小，真值为空时记 0
pub fn recall(found: &[i64], truth: &[i64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let truth: HashSet<i64> = truth.iter().copied().collect();
    let matched = found.iter().filter(|id| truth.contains(id)).count();
    matched as f64 / truth.len() as f64
}

fn ids_of(hits: &[Hit]) -> Vec<i64> {
    hits.iter().map(|h| h.id).collect()
}

pub async fn run_benchmark<S: VectorStore>(
    store: &S,
    queries: &QueryVectors,
    opts: &BenchOptions,
) -> Result<Vec<QueryReport>> {
    let cases = cases(queries);
    let mut times = vec![Vec::new(); cases.len()];
    let mut scan_times = vec![Vec::new(); cases.len()];
    let mut recalls = vec![Vec::new(); cases.len()];
    let mut last_hits: Vec<Vec<Hit>> = vec![Vec::new(); cases.len()];

    for iteration in 0..opts.iterations {
        info!("iteration {}", iteration + 1);

        for (qi, case) in cases.iter().enumerate() {
            let start = Instant::now();
            let mut results = Vec::with_capacity(case.targets.len());
            for (collection, vector) in &case.targets {
                let query = SearchQuery {
                    vector: vector.clone(),
                    limit: TOP_K,
                    nprobe: opts.nprobe,
                    metric: opts.metric,
                    filter: case.filter,
                };
                results.push(store.search(collection, &query).await?);
            }
            times[qi].push(start.elapsed().as_secs_f64() * 1000.0);

            if opts.evaluate {
                let start = Instant::now();
                let mut truths = Vec::with_capacity(case.targets.len());
                for (collection, vector) in &case.targets {
                    let query = SearchQuery {
                        vector: vector.clone(),
                        limit: TOP_K,
                        nprobe: SCAN_NPROBE,
                        metric: opts.metric,
                        filter: case.filter,
                    };
                    truths.push(store.search(collection, &query).await?);
                }
                scan_times[qi].push(start.elapsed().as_secs_f64() * 1000.0);

                let per_target: Vec<f64> = results
                    .iter()
                    .zip(&truths)
                    .map(|(found, truth)| recall(&ids_of(found), &ids_of(truth)))
                    .collect();
                recalls[qi].push(mean(&per_target));
            }

            if case.targets.len() == 1 {
                last_hits[qi] = results.into_iter().next().unwrap_or_default();
            }
        }
    }

    Ok(cases
        .iter()
        .enumerate()
        .map(|(qi, case)| QueryReport {
            name: case.name.to_string(),
            avg_time_ms: mean(&times[qi]),
            avg_scan_time_ms: opts.evaluate.then(|| mean(&scan_times[qi])),
            avg_recall: opts.evaluate.then(|| mean(&recalls[qi])),
            top_hits: {
                let mut hits = last_hits[qi].clone();
                hits.truncate(3);
                hits
            },
        })
        .collect())
}
