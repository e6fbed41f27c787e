pub mod answer;
pub mod distance;
pub mod embedding;
pub mod ingest;
pub mod openai;
pub mod store;

use answer::AnswerProvider;
use embedding::{require_api_key, Embedder, EmbeddingProvider, RetryPolicy};
use embedding_lab_common::{
    EmbeddingData, IngestProgress, IngestReport, LabError, NearestVector, Result, StoredVector,
};
use ingest::Ingestor;
use openai::{OpenAiProvider, OpenAiSettings};
use std::sync::Arc;
use store::VectorStore;
use tracing::{debug, info};

pub const DEFAULT_NEAREST_LIMIT: usize = 10;

pub struct LabCore {
    pub embedder: Arc<Embedder>,
    pub answers: Arc<dyn AnswerProvider>,
    pub store: Arc<dyn VectorStore>,
    pub ingestor: Arc<Ingestor>,
    default_api_key: Option<String>,
}

impl LabCore {
    pub async fn new(config: CoreConfig) -> Result<Self> {
        let store = store::create_store(&config.store_config).await?;
        let provider = Arc::new(OpenAiProvider::new(config.openai.clone()));

        info!(
            "Using embedding model {} and chat model {}",
            config.openai.embedding_model, config.openai.chat_model
        );

        Ok(Self::with_components(&config, provider.clone(), provider, store))
    }

    pub fn with_components(
        config: &CoreConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        answers: Arc<dyn AnswerProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let embedder = Arc::new(Embedder::new(embeddings, config.retry));
        let ingestor = Arc::new(Ingestor::new(
            embedder.clone(),
            answers.clone(),
            store.clone(),
        ));

        Self {
            embedder,
            answers,
            store,
            ingestor,
            default_api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
        }
    }

    /// Picks the request credential first, then the configured one.
    pub fn resolve_api_key<'a>(&'a self, request_key: Option<&'a str>) -> Option<&'a str> {
        request_key
            .filter(|key| !key.trim().is_empty())
            .or(self.default_api_key.as_deref())
    }

    pub async fn save_vector(&self, data: EmbeddingData) -> Result<StoredVector> {
        store::validate_vector(&data.vector)?;
        self.store.insert(data).await
    }

    pub async fn nearest_vectors(&self, vector: &[f32], limit: usize) -> Result<Vec<NearestVector>> {
        store::validate_vector(vector)?;
        self.store.nearest(vector, limit).await
    }

    pub async fn vectors_count(&self) -> Result<u64> {
        self.store.count().await
    }

    pub async fn truncate_vectors(&self) -> Result<u64> {
        self.store.truncate().await
    }

    /// Embeds and stores a single question.
    ///
    /// With `auto_generate` the stored answer is always generated, even when
    /// one was supplied.
    pub async fn add_record(
        &self,
        question: &str,
        answer: Option<&str>,
        auto_generate: bool,
        api_key: Option<&str>,
    ) -> Result<StoredVector> {
        let api_key = require_api_key(self.resolve_api_key(api_key))?;

        if question.trim().is_empty() {
            return Err(LabError::Validation("Please enter a question.".to_string()));
        }
        let answer = answer.filter(|a| !a.trim().is_empty());
        if answer.is_none() && !auto_generate {
            return Err(LabError::Validation("Please enter an answer.".to_string()));
        }

        let data = self.embedder.generate_vector(question, Some(api_key)).await?;
        let answer = match answer {
            Some(answer) if !auto_generate => answer.to_string(),
            _ => self.answers.answer(question, api_key).await?,
        };

        debug!("Storing single record for question: {}", question);
        self.store.insert(data.with_answer(answer)).await
    }

    /// Embeds `prompt` and returns the stored records nearest to it.
    pub async fn simulate(
        &self,
        prompt: &str,
        limit: Option<usize>,
        api_key: Option<&str>,
    ) -> Result<Vec<NearestVector>> {
        if prompt.is_empty() {
            return Err(LabError::Validation("Please enter a prompt.".to_string()));
        }
        let api_key = require_api_key(self.resolve_api_key(api_key))?;

        let data = self.embedder.generate_vector(prompt, Some(api_key)).await?;
        self.store
            .nearest(&data.vector, limit.unwrap_or(DEFAULT_NEAREST_LIMIT))
            .await
    }

    pub async fn ingest_csv(&self, content: &str, api_key: Option<&str>) -> Result<IngestReport> {
        self.ingestor
            .ingest(content, self.resolve_api_key(api_key))
            .await
    }

    pub fn ingest_progress(&self) -> IngestProgress {
        self.ingestor.progress()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub store_config: store::StoreConfig,
    pub openai: OpenAiSettings,
    pub retry: RetryPolicy,
    pub api_key: Option<String>,
}
