use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use log::debug;
use milvus::v2::request::collection::{
    CreateCollectionRequest, DropCollectionRequest, GetCollectionStatsRequest,
    HasCollectionRequest, LoadCollectionRequest, ReleaseCollectionRequest,
};
use milvus::v2::request::dml::InsertRequest;
use milvus::v2::request::dql::SearchRequest;
use milvus::v2::request::utility::FlushRequest;
use milvus::v2::types::{
    CollectionSchema, ConnectConfig, DataType, FieldData, FieldSchema, Ids, IndexParam, IndexType,
    MetricType, SearchVectors,
};
use milvus::v2::ClientV2;

use super::{CollectionSpec, Hit, RecordBatch, SearchQuery, VectorStore};
use crate::config::{IndexKind, MetricKind};

/// 基于官方 SDK 的 Milvus 会话
pub struct MilvusStore {
    client: ClientV2,
}

impl MilvusStore {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = ClientV2::new(&ConnectConfig::new().uri(uri))
            .await
            .with_context(|| format!("failed to connect to Milvus at {uri}"))?;
        Ok(Self { client })
    }
}

impl From<IndexKind> for IndexType {
    fn from(kind: IndexKind) -> Self {
        match kind {
            IndexKind::IvfFlat => IndexType::IvfFlat,
            IndexKind::IvfSq8 => IndexType::IvfSq8,
            IndexKind::Flat => IndexType::Flat,
            IndexKind::Hnsw => IndexType::Hnsw,
        }
    }
}

impl From<MetricKind> for MetricType {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::L2 => MetricType::L2,
            MetricKind::Ip => MetricType::Ip,
            MetricKind::Cosine => MetricType::Cosine,
        }
    }
}

impl VectorStore for MilvusStore {
    async fn has_collection(&self, name: &str) -> Result<bool> {
        let resp = self
            .client
            .has_collection(HasCollectionRequest::builder().collection_name(name).build()?)
            .await?;
        Ok(resp.exists())
    }

    async fn reset_collection(&self, spec: &CollectionSpec) -> Result<()> {
        if self.has_collection(&spec.name).await? {
            self.client
                .drop_collection(
                    DropCollectionRequest::builder().collection_name(&spec.name).build()?,
                )
                .await?;
            debug!("dropped existing collection: {}", spec.name);
        }

        let schema = CollectionSchema::new()
            .description(format!("Vector collection with {}D vectors", spec.dim))
            .add_field(
                FieldSchema::new()
                    .name("id")
                    .data_type(DataType::Int64)
                    .primary_key(true)
                    .auto_id(false),
            )
            .add_field(FieldSchema::new().name("image_id").data_type(DataType::Int32))
            .add_field(FieldSchema::new().name("category").data_type(DataType::Int32))
            .add_field(FieldSchema::new().name("confidence").data_type(DataType::Float))
            .add_field(FieldSchema::new().name("votes").data_type(DataType::Int32))
            .add_field(
                FieldSchema::new()
                    .name("vector")
                    .data_type(DataType::FloatVector)
                    .dimension(spec.dim as u32),
            );
        let index = IndexParam::new()
            .field_name("vector")
            .index_type(spec.index.into())
            .metric_type(spec.metric.into())
            .extra_params(HashMap::from([("nlist".to_string(), spec.nlist.to_string())]));

        self.client
            .create_collection(
                CreateCollectionRequest::builder()
                    .collection_name(&spec.name)
                    .schema(schema)
                    .index_params(vec![index])
                    .build()?,
            )
            .await?;
        Ok(())
    }

    async fn insert(&self, name: &str, batch: RecordBatch) -> Result<usize> {
        let columns = vec![
            FieldData::int64("id", batch.ids),
            FieldData::int32("image_id", batch.image_ids),
            FieldData::int32("category", batch.categories),
            FieldData::float("confidence", batch.confidences),
            FieldData::int32("votes", batch.votes),
            FieldData::float_vector("vector", batch.vectors),
        ];
        let resp = self
            .client
            .insert(InsertRequest::builder().collection_name(name).columns(columns).build()?)
            .await?;
        Ok(resp.insert_count() as usize)
    }

    async fn flush(&self, names: &[&str]) -> Result<()> {
        self.client
            .flush(
                FlushRequest::builder()
                    .collection_names(names.iter().copied())
                    .wait_flushed_ms(60_000)
                    .build()?,
            )
            .await?;
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<()> {
        self.client
            .load_collection(
                LoadCollectionRequest::builder().collection_name(name).sync(true).build()?,
            )
            .await?;
        Ok(())
    }

    async fn release(&self, name: &str) -> Result<()> {
        self.client
            .release_collection(
                ReleaseCollectionRequest::builder().collection_name(name).build()?,
            )
            .await?;
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<i64> {
        let resp = self
            .client
            .get_collection_stats(
                GetCollectionStatsRequest::builder().collection_name(name).build()?,
            )
            .await?;
        let count = match resp.statistics().get("row_count") {
            Some(v) => v.parse::<i64>().context("invalid row_count in collection stats")?,
            None => 0,
        };
        Ok(count)
    }

    async fn search(&self, name: &str, query: &SearchQuery) -> Result<Vec<Hit>> {
        let mut request = SearchRequest::builder()
            .collection_name(name)
            .vector_field("vector")
            .vectors(SearchVectors::Float(vec![query.vector.clone()]))
            .output_fields(["image_id", "category", "confidence", "votes"])
            .limit(query.limit as i64)
            .metric_type(query.metric.into())
            .extra_params(HashMap::from([("nprobe".to_string(), query.nprobe.to_string())]));
        if let Some(filter) = &query.filter {
            request = request.filter(filter.expr());
        }

        let resp = self.client.search(request.build()?).await?;
        let Some(result) = resp.results().iter().next() else {
            bail!("search on {} returned no result set", name);
        };

        let ids = match result.get_ids() {
            Ids::Int64(ids) => ids,
            _ => bail!("unexpected primary key type in search result"),
        };
        let scores = result.get_scores();
        let image_ids = output_i32(result, "image_id");
        let categories = output_i32(result, "category");
        let confidences =
            result.get_output_field("confidence").and_then(FieldData::as_float).unwrap_or(&[]);
        let votes = output_i32(result, "votes");

        let mut hits = Vec::with_capacity(ids.len());
        for (i, (&id, &distance)) in ids.iter().zip(scores).enumerate() {
            hits.push(Hit {
                id,
                distance,
                image_id: image_ids.get(i).copied().unwrap_or_default(),
                category: categories.get(i).copied().unwrap_or_default(),
                confidence: confidences.get(i).copied().unwrap_or_default(),
                votes: votes.get(i).copied().unwrap_or_default(),
            });
        }
        Ok(hits)
    }
}

fn output_i32<'a>(result: &'a milvus::v2::types::SingleResult, name: &str) -> &'a [i32] {
    result.get_output_field(name).and_then(FieldData::as_int32).unwrap_or(&[])
}
