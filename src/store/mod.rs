//! 向量库会话抽象
//!
//! 基准流程只依赖 [`VectorStore`]，生产实现为 [`MilvusStore`]，
//! 测试使用内存暴力检索的 [`MemStore`]。

mod memory;
mod milvus;

use std::future::Future;

use anyhow::Result;
use serde::Serialize;

pub use self::memory::MemStore;
pub use self::milvus::MilvusStore;

use crate::config::{IndexKind, MetricKind};

/// 重建集合所需的全部参数
#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub dim: usize,
    pub index: IndexKind,
    pub metric: MetricKind,
    pub nlist: usize,
}

/// 列式插入批次，id 由导入流程按数据集顺序分配
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub ids: Vec<i64>,
    pub image_ids: Vec<i32>,
    pub categories: Vec<i32>,
    pub confidences: Vec<f32>,
    pub votes: Vec<i32>,
    pub vectors: Vec<Vec<f32>>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// 搜索时的元数据过滤条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaFilter {
    pub category: i32,
    pub max_confidence: f32,
}

impl MetaFilter {
    /// 渲染为 Milvus 布尔表达式
    pub fn expr(&self) -> String {
        format!("category == {} && confidence < {}", self.category, self.max_confidence)
    }

    pub fn matches(&self, category: i32, confidence: f32) -> bool {
        category == self.category && confidence < self.max_confidence
    }
}

/// 搜索的度量方式必须与建索引时一致，否则服务端会拒绝请求
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub nprobe: usize,
    pub metric: MetricKind,
    pub filter: Option<MetaFilter>,
}

/// 单条搜索命中及其元数据
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub id: i64,
    pub distance: f32,
    pub image_id: i32,
    pub category: i32,
    pub confidence: f32,
    pub votes: i32,
}

/// 集合生命周期：建表、插入、flush、load、搜索、release
pub trait VectorStore {
    fn has_collection(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// 如果集合已存在则先删除，然后重新建表并创建索引
    fn reset_collection(&self, spec: &CollectionSpec) -> impl Future<Output = Result<()>> + Send;

    /// 返回实际插入的记录数
    fn insert(&self, name: &str, batch: RecordBatch) -> impl Future<Output = Result<usize>> + Send;

    fn flush(&self, names: &[&str]) -> impl Future<Output = Result<()>> + Send;

    fn load(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    fn release(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    fn count(&self, name: &str) -> impl Future<Output = Result<i64>> + Send;

    fn search(
        &self,
        name: &str,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<Vec<Hit>>> + Send;
}
