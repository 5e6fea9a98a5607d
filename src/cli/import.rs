use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::{
    ConnectionOptions, DEFAULT_BATCH_SIZE, DEFAULT_NLIST, IndexKind, MetricKind, Opts,
};
use crate::dataset::Dataset;
use crate::import::{ImportOptions, run_import};
use crate::store::MilvusStore;

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    /// prepare 生成的数据集文件
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
    #[command(flatten)]
    pub conn: ConnectionOptions,
    /// 每批插入的记录数
    #[arg(long, value_name = "SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// 向量字段的索引类型
    #[arg(long, value_enum, default_value_t = IndexKind::IvfFlat)]
    pub index_type: IndexKind,
    /// 索引的距离度量
    #[arg(long, value_enum, default_value_t = MetricKind::L2)]
    pub metric_type: MetricKind,
    /// 索引的倒排列表数量
    #[arg(long, value_name = "N", default_value_t = DEFAULT_NLIST)]
    pub nlist: usize,
}

impl SubCommandExtend for ImportCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        // 连接失败和导入失败都只报告，不改变退出码
        let store = match MilvusStore::connect(&self.conn.uri()).await {
            Ok(store) => store,
            Err(e) => {
                println!("Failed to connect to Milvus: {e:#}");
                return Ok(());
            }
        };
        println!("Connected to Milvus server at {}:{}", self.conn.host, self.conn.port);

        if let Err(e) = self.import(&store).await {
            println!("Error importing data to Milvus: {e:#}");
        }
        Ok(())
    }
}

impl ImportCommand {
    async fn import(&self, store: &MilvusStore) -> Result<()> {
        let dataset = Dataset::load(&self.input)?;
        println!("Loaded {} records from {}", dataset.len(), self.input.display());

        let opts = ImportOptions {
            batch_size: self.batch_size,
            index: self.index_type,
            metric: self.metric_type,
            nlist: self.nlist,
        };
        run_import(store, &dataset, &opts).await
    }
}
