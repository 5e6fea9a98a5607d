use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, bail, ensure};

use super::{CollectionSpec, Hit, RecordBatch, SearchQuery, VectorStore};
use crate::config::MetricKind;

#[derive(Debug, Clone)]
struct Row {
    id: i64,
    image_id: i32,
    category: i32,
    confidence: f32,
    votes: i32,
    vector: Vec<f32>,
}

struct Collection {
    dim: usize,
    metric: MetricKind,
    rows: Vec<Row>,
    loaded: bool,
}

/// 内存暴力检索后端，生命周期约束与真实服务一致。
/// L2 距离为平方值，与 Milvus L2 度量返回的数值口径相同；
/// IP 和 Cosine 返回相似度，分值越大越靠前。
#[derive(Default)]
pub struct MemStore {
    collections: Mutex<HashMap<String, Collection>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut HashMap<String, Collection>) -> R) -> R {
        let mut collections = self.collections.lock().expect("failed to acquire lock");
        f(&mut collections)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.with(|c| c.get(name).is_some_and(|collection| collection.loaded))
    }
}

impl VectorStore for MemStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.with(|c| c.contains_key(name)))
    }

    async fn reset_collection(&self, spec: &CollectionSpec) -> Result<()> {
        self.with(|c| {
            c.insert(
                spec.name.clone(),
                Collection { dim: spec.dim, metric: spec.metric, rows: Vec::new(), loaded: false },
            );
        });
        Ok(())
    }

    async fn insert(&self, name: &str, batch: RecordBatch) -> Result<usize> {
        self.with(|c| {
            let Some(collection) = c.get_mut(name) else {
                bail!("collection {} not found", name);
            };
            for (i, vector) in batch.vectors.iter().enumerate() {
                ensure!(
                    vector.len() == collection.dim,
                    "vector dimension {} does not match collection dimension {}",
                    vector.len(),
                    collection.dim
                );
                collection.rows.push(Row {
                    id: batch.ids[i],
                    image_id: batch.image_ids[i],
                    category: batch.categories[i],
                    confidence: batch.confidences[i],
                    votes: batch.votes[i],
                    vector: vector.clone(),
                });
            }
            Ok(batch.len())
        })
    }

    async fn flush(&self, names: &[&str]) -> Result<()> {
        self.with(|c| {
            for name in names {
                ensure!(c.contains_key(*name), "collection {} not found", name);
            }
            Ok(())
        })
    }

    async fn load(&self, name: &str) -> Result<()> {
        self.with(|c| {
            let Some(collection) = c.get_mut(name) else {
                bail!("collection {} not found", name);
            };
            collection.loaded = true;
            Ok(())
        })
    }

    async fn release(&self, name: &str) -> Result<()> {
        self.with(|c| {
            let Some(collection) = c.get_mut(name) else {
                bail!("collection {} not found", name);
            };
            collection.loaded = false;
            Ok(())
        })
    }

    async fn count(&self, name: &str) -> Result<i64> {
        self.with(|c| {
            let Some(collection) = c.get(name) else {
                bail!("collection {} not found", name);
            };
            Ok(collection.rows.len() as i64)
        })
    }

    async fn search(&self, name: &str, query: &SearchQuery) -> Result<Vec<Hit>> {
        self.with(|c| {
            let Some(collection) = c.get(name) else {
                bail!("collection {} not found", name);
            };
            ensure!(collection.loaded, "collection {} is not loaded", name);
            ensure!(
                query.metric == collection.metric,
                "metric type {:?} does not match collection metric {:?}",
                query.metric,
                collection.metric
            );
            ensure!(
                query.vector.len() == collection.dim,
                "query dimension {} does not match collection dimension {}",
                query.vector.len(),
                collection.dim
            );

            let mut hits: Vec<Hit> = collection
                .rows
                .iter()
                .filter(|row| {
                    query.filter.is_none_or(|f| f.matches(row.category, row.confidence))
                })
                .map(|row| Hit {
                    id: row.id,
                    distance: score(query.metric, &row.vector, &query.vector),
                    image_id: row.image_id,
                    category: row.category,
                    confidence: row.confidence,
                    votes: row.votes,
                })
                .collect();
            match query.metric {
                MetricKind::L2 => hits.sort_by(|a, b| a.distance.total_cmp(&b.distance)),
                MetricKind::Ip | MetricKind::Cosine => {
                    hits.sort_by(|a, b| b.distance.total_cmp(&a.distance))
                }
            }
            hits.truncate(query.limit);
            Ok(hits)
        })
    }
}

fn score(metric: MetricKind, a: &[f32], b: &[f32]) -> f32 {
    let dot = || a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    match metric {
        MetricKind::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        MetricKind::Ip => dot(),
        MetricKind::Cosine => {
            let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
            let denom = norm(a) * norm(b);
            if denom == 0.0 { 0.0 } else { dot() / denom }
        }
    }
}
