//! 导入流程：重建两个集合并按批次写入数据集

use std::ops::Range;

use anyhow::{Result, ensure};
use indicatif::ProgressBar;
use log::debug;
use ndarray::{Array2, s};

use crate::config::{
    GIST_COLLECTION, GIST_DIM, SIFT_COLLECTION, SIFT_DIM, IndexKind, MetricKind,
};
use crate::dataset::Dataset;
use crate::store::{CollectionSpec, RecordBatch, VectorStore};
use crate::utils::pb_style;

/// 两个集合共用的索引配置
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub batch_size: usize,
    pub index: IndexKind,
    pub metric: MetricKind,
    pub nlist: usize,
}

/// 把 0..total 切分为长度不超过 batch_size 的连续半开区间，
/// 区间之间无重叠无空洞
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    debug_assert!(batch_size > 0);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + batch_size).min(total);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

fn batch_of(dataset: &Dataset, vectors: &Array2<f32>, range: &Range<usize>) -> RecordBatch {
    RecordBatch {
        ids: (range.start as i64..range.end as i64).collect(),
        image_ids: dataset.image_id.slice(s![range.clone()]).to_vec(),
        categories: dataset.category.slice(s![range.clone()]).to_vec(),
        confidences: dataset.confidence.slice(s![range.clone()]).to_vec(),
        votes: dataset.votes.slice(s![range.clone()]).to_vec(),
        vectors: vectors.slice(s![range.clone(), ..]).outer_iter().map(|r| r.to_vec()).collect(),
    }
}

pub async fn run_import<S: VectorStore>(
    store: &S,
    dataset: &Dataset,
    opts: &ImportOptions,
) -> Result<()> {
    ensure!(opts.batch_size > 0, "batch size must be positive");
    let total = dataset.len();

    for (name, dim) in [(SIFT_COLLECTION, SIFT_DIM), (GIST_COLLECTION, GIST_DIM)] {
        let spec = CollectionSpec {
            name: name.to_string(),
            dim,
            index: opts.index,
            metric: opts.metric,
            nlist: opts.nlist,
        };
        store.reset_collection(&spec).await?;
        println!("Created collection: {} with dimension {}", name, dim);
    }

    let pb = ProgressBar::new(total as u64).with_style(pb_style());
    for range in batch_ranges(total, opts.batch_size) {
        store.insert(SIFT_COLLECTION, batch_of(dataset, &dataset.sift, &range)).await?;
        store.insert(GIST_COLLECTION, batch_of(dataset, &dataset.gist, &range)).await?;
        debug!("inserted batch {}-{} of {} records", range.start + 1, range.end, total);
        pb.inc(range.len() as u64);
    }
    pb.finish_and_clear();

    store.flush(&[SIFT_COLLECTION, GIST_COLLECTION]).await?;
    store.load(SIFT_COLLECTION).await?;
    store.load(GIST_COLLECTION).await?;

    println!("SIFT collection entity count: {}", store.count(SIFT_COLLECTION).await?);
    println!("GIST collection entity count: {}", store.count(GIST_COLLECTION).await?);
    println!("Import complete!");
    Ok(())
}
