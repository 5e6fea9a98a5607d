use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::*;

/// SIFT descriptors are 128-dimensional.
pub const SIFT_DIM: usize = 128;
/// GIST descriptors are 960-dimensional.
pub const GIST_DIM: usize = 960;

pub const SIFT_COLLECTION: &str = "sift_vectors";
pub const GIST_COLLECTION: &str = "gist_vectors";

/// Number of neighbours requested per query.
pub const TOP_K: usize = 100;
/// nprobe used by the timed benchmark queries.
pub const DEFAULT_NPROBE: usize = 32;
/// nprobe of the exhaustive ground-truth scan, equal to the default nlist.
pub const SCAN_NPROBE: usize = 1024;

pub const DEFAULT_NLIST: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 10000;

#[derive(Parser, Debug, Clone)]
#[command(name = "milbench", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 从 fvecs 文件构建带元数据的数据集
    Prepare(PrepareCommand),
    /// 将数据集导入 Milvus
    Import(ImportCommand),
    /// 运行搜索基准测试
    Search(SearchCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ConnectionOptions {
    /// Milvus 服务器地址
    #[arg(long, value_name = "HOST", default_value = "localhost")]
    pub host: String,
    /// Milvus 服务器端口
    #[arg(long, value_name = "PORT", default_value_t = 19530)]
    pub port: u16,
}

impl ConnectionOptions {
    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// 向量字段上的索引类型
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    IvfFlat,
    IvfSq8,
    Flat,
    Hnsw,
}

/// 向量距离度量方式
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    L2,
    Ip,
    Cosine,
}
