use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::dataset::Dataset;
use crate::fvecs::read_fvecs;

#[derive(Parser, Debug, Clone)]
pub struct PrepareCommand {
    /// fvecs 格式的 SIFT 向量文件
    #[arg(long, value_name = "FILE")]
    pub sift: PathBuf,
    /// fvecs 格式的 GIST 向量文件
    #[arg(long, value_name = "FILE")]
    pub gist: PathBuf,
    /// 数据集输出路径
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,
    /// 数据集记录数
    #[arg(short = 'n', value_name = "N", default_value_t = 10000)]
    pub num_records: usize,
}

impl SubCommandExtend for PrepareCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let sift = read_fvecs(&self.sift)?;
        let gist = read_fvecs(&self.gist)?;
        info!("loaded {} SIFT and {} GIST vectors", sift.nrows(), gist.nrows());

        let dataset = Dataset::build(sift, gist, self.num_records)?;
        dataset.save(&self.output)?;

        println!(
            "Dataset with {} records successfully saved to {}",
            dataset.len(),
            self.output.display()
        );
        Ok(())
    }
}
