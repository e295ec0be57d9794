//! `VectorStore` backed by Qdrant via the `qdrant-client` crate.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use rag_core::{
    ChunkMetadata, ChunkType, CoreError, CoreResult, EmbeddingVector, KnowledgeChunk, SearchResult,
    VectorStore,
};
use serde_json::Value;

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Builds a client against `url`, optionally authenticating with
    /// `api_key`. Connection itself is lazy in `qdrant-client`; failures
    /// surface on the first real call.
    pub fn new(url: &str, api_key: Option<&str>) -> CoreResult<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|err| CoreError::Config(err.to_string()))?;
        Ok(Self { client })
    }

    fn chunk_to_point(chunk: &KnowledgeChunk) -> CoreResult<PointStruct> {
        let vector = chunk
            .vector
            .clone()
            .ok_or_else(|| CoreError::Parse("chunk has no vector to upsert".to_string()))?;

        let metadata = serde_json::to_value(&chunk.metadata)
            .map_err(|err| CoreError::Parse(err.to_string()))?;
        let mut payload = match metadata {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        payload.insert("content".to_string(), Value::String(chunk.content.clone()));

        let payload_map = payload
            .into_iter()
            .map(|(k, v)| (k, qdrant_client::qdrant::Value::from(json_to_qdrant(v))))
            .collect::<std::collections::HashMap<_, _>>();

        Ok(PointStruct::new(chunk.id.clone(), vector, payload_map))
    }
}

/// `qdrant-client`'s `Value::from` covers the JSON primitives directly; this
/// only needs to bridge `serde_json::Value` into something that conversion
/// accepts.
fn json_to_qdrant(value: Value) -> qdrant_client::qdrant::value::Kind {
    use qdrant_client::qdrant::value::Kind;
    match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s),
        other => Kind::StringValue(other.to_string()),
    }
}

fn payload_to_metadata(payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>) -> CoreResult<ChunkMetadata> {
    let get_str = |key: &str| -> String {
        payload
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    let date_added = payload
        .get("date_added")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now);

    let chunk_type_raw = get_str("type");
    let chunk_type = if chunk_type_raw.starts_with("memory:") {
        ChunkType::memory(chunk_type_raw.trim_start_matches("memory:"))
    } else {
        match chunk_type_raw.as_str() {
            "pdf" => ChunkType::pdf(),
            "txt" => ChunkType::txt(),
            "url" => ChunkType::url(),
            "notion" => ChunkType::notion(),
            _ => ChunkType::md(),
        }
    };

    Ok(ChunkMetadata {
        source: get_str("source"),
        filename: get_str("filename"),
        chunk_type,
        chunk_index: payload.get("chunk_index").and_then(|v| v.as_integer()).unwrap_or(0) as u32,
        total_chunks: payload.get("total_chunks").and_then(|v| v.as_integer()).unwrap_or(1) as u32,
        date_added,
        category: payload.get("category").and_then(|v| v.as_str()).map(str::to_string),
        importance: payload.get("importance").and_then(|v| v.as_double()),
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, name: &str, dim: usize) -> CoreResult<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        if exists {
            let info = self
                .client
                .collection_info(name)
                .await
                .map_err(|err| CoreError::Unavailable(err.to_string()))?;

            let actual_dim = info
                .result
                .and_then(|r| r.config)
                .and_then(|c| c.params)
                .and_then(|p| p.vectors_config)
                .and_then(|v| v.config)
                .and_then(|cfg| match cfg {
                    qdrant_client::qdrant::vectors_config::Config::Params(p) => Some(p.size as usize),
                    qdrant_client::qdrant::vectors_config::Config::ParamsMap(_) => None,
                });

            return match actual_dim {
                Some(actual) if actual == dim => Ok(()),
                Some(actual) => Err(CoreError::SchemaMismatch(format!(
                    "collection '{name}' has dimension {actual}, expected {dim}"
                ))),
                None => Ok(()),
            };
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        Ok(())
    }

    async fn upsert(&self, name: &str, items: &[KnowledgeChunk]) -> CoreResult<()> {
        let points = items
            .iter()
            .map(Self::chunk_to_point)
            .collect::<CoreResult<Vec<_>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        Ok(())
    }

    async fn search(&self, name: &str, vector: &EmbeddingVector, k: usize) -> CoreResult<Vec<SearchResult>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(name, vector.clone(), k as u64).with_payload(true),
            )
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        response
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };
                let content = point
                    .payload
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let metadata = payload_to_metadata(&point.payload)?;
                Ok(SearchResult {
                    id,
                    content,
                    metadata,
                    score: f64::from(point.score),
                })
            })
            .collect()
    }

    async fn scroll(&self, name: &str, limit: usize) -> CoreResult<Vec<KnowledgeChunk>> {
        let response = self
            .client
            .scroll(ScrollPointsBuilder::new(name).limit(limit as u32).with_payload(true))
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;

        response
            .result
            .into_iter()
            .map(|point| {
                let id = match point.id.and_then(|id| id.point_id_options) {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(uuid)) => uuid,
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };
                let content = point
                    .payload
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let metadata = payload_to_metadata(&point.payload)?;
                Ok(KnowledgeChunk { id, content, metadata, vector: None })
            })
            .collect()
    }

    async fn delete(&self, name: &str, ids: &[String]) -> CoreResult<()> {
        let points: Vec<PointId> = ids.iter().map(|id| PointId::from(id.clone())).collect();
        self.client
            .delete_points(qdrant_client::qdrant::DeletePointsBuilder::new(name).points(points).wait(true))
            .await
            .map_err(|err| CoreError::Unavailable(err.to_string()))?;
        Ok(())
    }
}
