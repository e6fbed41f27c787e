use crate::distance::rank_nearest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use embedding_lab_common::{EmbeddingData, LabError, NearestVector, Result, StoredVector};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, info};
use uuid::Uuid;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn insert(&self, data: EmbeddingData) -> Result<StoredVector>;
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<NearestVector>>;
    async fn count(&self) -> Result<u64>;
    /// Removes every record of the collection and returns how many were deleted.
    async fn truncate(&self) -> Result<u64>;
    async fn health_check(&self) -> Result<StoreHealth>;
}

#[derive(Debug, Clone)]
pub struct StoreHealth {
    pub status: StoreStatus,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub collection: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/embedding_lab.db".to_string(),
            collection: "vectors".to_string(),
            max_connections: 5,
            connection_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            ..Default::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// Rejects empty vectors and vectors holding NaN or infinite components.
///
/// Non-finite values serialize to JSON `null` and would make the stored row
/// unreadable.
pub fn validate_vector(vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(LabError::Validation("Vector must not be empty".to_string()));
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(LabError::Validation(format!(
            "Vector component {} is not a finite number",
            index
        )));
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct VectorRow {
    id: String,
    text: String,
    answer: Option<String>,
    vector: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VectorRow> for StoredVector {
    type Error = LabError;

    fn try_from(row: VectorRow) -> Result<Self> {
        Ok(StoredVector {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| LabError::Internal(format!("Invalid UUID: {}", e)))?,
            text: row.text,
            answer: row.answer,
            vector: serde_json::from_str(&row.vector)
                .map_err(|e| LabError::Internal(format!("Failed to deserialize vector: {}", e)))?,
            created_at: row.created_at,
        })
    }
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        if config.collection.trim().is_empty() {
            return Err(LabError::Configuration("Collection name must not be empty".to_string()));
        }

        let connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| LabError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        if !config.is_in_memory() {
            let filename = connect_options.clone().get_filename();
            if let Some(parent) = filename.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        LabError::Database(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs));

        // Every connection to an in-memory database opens a fresh database.
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| LabError::Database(format!("Failed to connect to database: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                text TEXT NOT NULL,
                answer TEXT,
                vector TEXT NOT NULL,
                dimension INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| LabError::Database(format!("Failed to create vectors table: {}", e)))?;

        info!(
            "SQLite vector store initialized (collection: {})",
            config.collection
        );

        Ok(Self {
            pool,
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, data: EmbeddingData) -> Result<StoredVector> {
        validate_vector(&data.vector)?;
        let dimension = data.dimension() as i64;
        let record = StoredVector::from_embedding(data);
        let vector_json = serde_json::to_string(&record.vector)
            .map_err(|e| LabError::Internal(format!("Failed to serialize vector: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO vectors (id, collection, text, answer, vector, dimension, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&self.collection)
        .bind(&record.text)
        .bind(&record.answer)
        .bind(vector_json)
        .bind(dimension)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| LabError::Database(format!("Failed to save vector: {}", e)))?;

        debug!("Stored vector {} ({} dimensions)", record.id, dimension);
        Ok(record)
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<NearestVector>> {
        validate_vector(query)?;
        if limit == 0 {
            return Err(LabError::Validation("Limit must be positive".to_string()));
        }

        let rows = sqlx::query_as::<_, VectorRow>(
            r#"
            SELECT id, text, answer, vector, created_at
            FROM vectors
            WHERE collection = ? AND dimension = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(&self.collection)
        .bind(query.len() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LabError::Database(format!("Failed to fetch vectors: {}", e)))?;

        let scanned = rows.len();
        let records = rows
            .into_iter()
            .map(StoredVector::try_from)
            .collect::<Result<Vec<_>>>()?;

        let nearest = rank_nearest(query, records, limit);
        debug!(
            "Ranked {} vectors, returning {} nearest",
            scanned,
            nearest.len()
        );

        Ok(nearest)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LabError::Database(format!("Failed to count vectors: {}", e)))?;

        Ok(count as u64)
    }

    async fn truncate(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vectors WHERE collection = ?")
            .bind(&self.collection)
            .execute(&self.pool)
            .await
            .map_err(|e| LabError::Database(format!("Failed to truncate vectors: {}", e)))?;

        info!(
            "Truncated {} vectors from collection {}",
            result.rows_affected(),
            self.collection
        );
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<StoreHealth> {
        let status = match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => StoreStatus::Healthy,
            Err(_) => StoreStatus::Unhealthy,
        };

        Ok(StoreHealth {
            status,
            collection: self.collection.clone(),
        })
    }
}

// Helper function to create a store instance
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
    let store = SqliteVectorStore::new(config).await?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteVectorStore {
        SqliteVectorStore::new(&StoreConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = memory_store().await;
        assert_eq!(store.count().await.unwrap(), 0);

        let stored = store
            .insert(EmbeddingData::new("question", vec![0.1, 0.2]).with_answer("answer"))
            .await
            .unwrap();

        assert_eq!(stored.text, "question");
        assert_eq!(stored.answer.as_deref(), Some("answer"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nearest_returns_sorted_records() {
        let store = memory_store().await;
        store.insert(EmbeddingData::new("far", vec![5.0, 5.0])).await.unwrap();
        store.insert(EmbeddingData::new("close", vec![1.0, 0.0])).await.unwrap();
        store.insert(EmbeddingData::new("other-dim", vec![0.0, 0.0, 0.0])).await.unwrap();
        store.insert(EmbeddingData::new("closest", vec![0.0, 0.5])).await.unwrap();

        let nearest = store.nearest(&[0.0, 0.0], 2).await.unwrap();
        let texts: Vec<_> = nearest.iter().map(|n| n.record.text.as_str()).collect();

        assert_eq!(texts, vec!["closest", "close"]);
        assert_eq!(nearest[0].distance, 0.5);
        assert_eq!(nearest[0].record.vector, vec![0.0, 0.5]);
    }

    #[tokio::test]
    async fn test_nearest_rejects_invalid_input() {
        let store = memory_store().await;
        assert!(matches!(store.nearest(&[], 5).await, Err(LabError::Validation(_))));
        assert!(matches!(store.nearest(&[1.0], 0).await, Err(LabError::Validation(_))));
    }

    #[tokio::test]
    async fn test_non_finite_vectors_are_rejected() {
        let store = memory_store().await;
        store.insert(EmbeddingData::new("ok", vec![1.0])).await.unwrap();

        for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            assert!(matches!(
                store.insert(EmbeddingData::new("bad", vec![bad])).await,
                Err(LabError::Validation(_))
            ));
            assert!(matches!(
                store.nearest(&[bad], 5).await,
                Err(LabError::Validation(_))
            ));
        }

        assert_eq!(store.count().await.unwrap(), 1);
        let nearest = store.nearest(&[1.0], 5).await.unwrap();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].record.text, "ok");
    }

    #[test]
    fn test_validate_vector() {
        assert!(validate_vector(&[0.0, -1.5, 3.0]).is_ok());
        assert!(validate_vector(&[]).is_err());
        assert!(validate_vector(&[1.0, f32::NAN]).is_err());
    }

    #[tokio::test]
    async fn test_truncate() {
        let store = memory_store().await;
        store.insert(EmbeddingData::new("a", vec![1.0])).await.unwrap();
        store.insert(EmbeddingData::new("b", vec![2.0])).await.unwrap();

        assert_eq!(store.truncate().await.unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.nearest(&[1.0], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_collection_name_is_rejected() {
        let config = StoreConfig {
            collection: " ".to_string(),
            ..StoreConfig::in_memory()
        };
        assert!(matches!(
            SqliteVectorStore::new(&config).await,
            Err(LabError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = memory_store().await;
        let health = store.health_check().await.unwrap();
        assert_eq!(health.status, StoreStatus::Healthy);
        assert_eq!(health.collection, "vectors");
    }
}
