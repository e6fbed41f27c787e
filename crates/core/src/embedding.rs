use async_trait::async_trait;
use embedding_lab_common::{EmbeddingData, LabError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source of embedding vectors, usually a hosted language-model API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>>;
}

/// Fixed-delay retry policy for embedding requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Delay between two consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_millis(5000),
        }
    }
}

/// Returns the credential if it is present and not blank.
pub fn require_api_key(api_key: Option<&str>) -> Result<&str> {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(LabError::MissingApiKey),
    }
}

pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy: RetryPolicy::new(policy.max_attempts, policy.interval),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Embeds `text`, retrying failed requests with a fixed delay.
    ///
    /// Fails immediately with [`LabError::MissingApiKey`] when no credential
    /// is given, and with [`LabError::RetriesExhausted`] once every attempt
    /// of the policy has failed. An empty vector counts as a failure.
    pub async fn generate_vector(&self, text: &str, api_key: Option<&str>) -> Result<EmbeddingData> {
        let api_key = require_api_key(api_key)?;
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            debug!("Requesting embedding (attempt {}/{})", attempt, max_attempts);

            match self.provider.embed(text, api_key).await {
                Ok(vector) if !vector.is_empty() => {
                    if attempt > 1 {
                        info!("Embedding succeeded after {} attempts", attempt);
                    }
                    return Ok(EmbeddingData::new(text, vector));
                }
                Ok(_) => last_error = "No embedding data returned".to_string(),
                Err(e) => last_error = e.to_string(),
            }

            warn!(
                attempt = attempt,
                max_attempts = max_attempts,
                interval_ms = self.policy.interval.as_millis() as u64,
                "Embedding request failed: {}",
                last_error
            );

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(LabError::RetriesExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}
