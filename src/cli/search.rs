use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::{Parser, ValueEnum};
use log::warn;

use crate::bench::{BenchOptions, QueryReport, QueryVectors, run_benchmark};
use crate::cli::SubCommandExtend;
use crate::config::{
    ConnectionOptions, DEFAULT_NPROBE, GIST_COLLECTION, MetricKind, Opts, SIFT_COLLECTION,
};
use crate::dataset::Dataset;
use crate::store::{MilvusStore, VectorStore};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 数据集文件，查询向量取自第一条记录
    pub dataset: PathBuf,
    #[command(flatten)]
    pub conn: ConnectionOptions,
    /// 与全量扫描结果对比计算召回率
    #[arg(long)]
    pub evaluate: bool,
    /// 每个查询的迭代次数
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub iterations: usize,
    /// 每次搜索探查的倒排列表数量
    #[arg(long, value_name = "N", default_value_t = DEFAULT_NPROBE)]
    pub nprobe: usize,
    /// 搜索使用的距离度量，须与导入时一致
    #[arg(long, value_enum, default_value_t = MetricKind::L2)]
    pub metric_type: MetricKind,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        // 基准失败只报告，不改变退出码
        let store = match MilvusStore::connect(&self.conn.uri()).await {
            Ok(store) => store,
            Err(e) => {
                println!("Failed to connect to Milvus: {e:#}");
                return Ok(());
            }
        };
        println!("Connected to Milvus server at {}:{}", self.conn.host, self.conn.port);

        if let Err(e) = self.benchmark(&store).await {
            println!("Error running benchmark: {e:#}");
        }
        Ok(())
    }
}

impl SearchCommand {
    async fn benchmark<S: VectorStore>(&self, store: &S) -> Result<()> {
        if !store.has_collection(SIFT_COLLECTION).await?
            || !store.has_collection(GIST_COLLECTION).await?
        {
            println!("Error: sift_vectors or gist_vectors collection not found in Milvus.");
            println!("Please import the vector database first using the import step.");
            return Ok(());
        }

        store.load(SIFT_COLLECTION).await?;
        store.load(GIST_COLLECTION).await?;

        // load 之后的任何失败都要走到释放集合这一步
        let result = self.run_loaded(store).await;
        for name in [SIFT_COLLECTION, GIST_COLLECTION] {
            if let Err(e) = store.release(name).await {
                warn!("failed to release {}: {}", name, e);
            }
        }
        result
    }

    async fn run_loaded<S: VectorStore>(&self, store: &S) -> Result<()> {
        println!("Loading query vectors from {}", self.dataset.display());
        let dataset = Dataset::load(&self.dataset)?;
        ensure!(!dataset.is_empty(), "dataset {} has no records", self.dataset.display());
        let queries = QueryVectors {
            sift: dataset.sift.row(0).to_vec(),
            gist: dataset.gist.row(0).to_vec(),
        };

        println!("\nRunning benchmark with {} iterations...", self.iterations);
        let opts = BenchOptions {
            iterations: self.iterations,
            nprobe: self.nprobe,
            metric: self.metric_type,
            evaluate: self.evaluate,
        };
        let reports = run_benchmark(store, &queries, &opts).await?;
        print_reports(&reports, &self.output_format)
    }
}

fn print_reports(reports: &[QueryReport], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(reports)?),
        OutputFormat::Table => {
            println!("\n===== BENCHMARK RESULTS =====");
            for report in reports {
                println!("\n===== {} =====", report.name);
                println!("Average search time: {:.2} ms", report.avg_time_ms);
                if let Some(t) = report.avg_scan_time_ms {
                    println!("Average scan time: {:.2} ms", t);
                }
                if let Some(r) = report.avg_recall {
                    println!("Average recall: {:.4}", r);
                }
                if !report.top_hits.is_empty() {
                    println!("Top 3 results:");
                    for (i, hit) in report.top_hits.iter().enumerate() {
                        println!(
                            "  #{}: ID={}, Distance={:.4}, Category={}, Confidence={:.4}",
                            i + 1,
                            hit.id,
                            hit.distance,
                            hit.category,
                            hit.confidence
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
