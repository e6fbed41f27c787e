use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Embedding types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub text: String,
    #[serde(default)]
    pub answer: Option<String>,
    pub vector: Vec<f32>,
}

impl EmbeddingData {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            answer: None,
            vector,
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A record as persisted by a vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: Uuid,
    pub text: String,
    pub answer: Option<String>,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl StoredVector {
    pub fn from_embedding(data: EmbeddingData) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: data.text,
            answer: data.answer,
            vector: data.vector,
            created_at: Utc::now(),
        }
    }
}

/// A stored record together with its distance to a query vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestVector {
    #[serde(flatten)]
    pub record: StoredVector,
    pub distance: f64,
}

// Ingestion progress types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStep {
    Idle,
    LoadFile,
    AnalyzeFile,
    Done,
    Failed,
}

impl std::fmt::Display for IngestStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestStep::Idle => write!(f, "idle"),
            IngestStep::LoadFile => write!(f, "[1/2] Load File"),
            IngestStep::AnalyzeFile => write!(f, "[2/2] Analyze File"),
            IngestStep::Done => write!(f, "done"),
            IngestStep::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestProgress {
    pub step: IngestStep,
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

impl IngestProgress {
    pub fn idle() -> Self {
        Self::at(IngestStep::Idle, 0, 0)
    }

    pub fn at(step: IngestStep, current: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((current as f64 / total as f64) * 100.0).round().min(100.0) as u8
        };

        Self {
            step,
            current,
            total,
            percent,
        }
    }
}

impl Default for IngestProgress {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub total_lines: usize,
    pub imported: usize,
    pub skipped: usize,
    pub generated_answers: usize,
}

// Error types
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API key is not set")]
    MissingApiKey,

    #[error("Embedding request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("The provided file seems to be a binary file")]
    BinaryInput,

    #[error("Another import is already running")]
    IngestInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LabError>;

// API response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_data_builder() {
        let data = EmbeddingData::new("What is Rust?", vec![0.1, 0.2, 0.3])
            .with_answer("A systems language");

        assert_eq!(data.text, "What is Rust?");
        assert_eq!(data.answer.as_deref(), Some("A systems language"));
        assert_eq!(data.dimension(), 3);
    }

    #[test]
    fn test_embedding_data_answer_defaults_to_none() {
        let data: EmbeddingData =
            serde_json::from_str(r#"{"text":"hi","vector":[1.0,2.0]}"#).unwrap();
        assert_eq!(data.answer, None);
    }

    #[test]
    fn test_nearest_vector_is_flattened() {
        let record = StoredVector::from_embedding(EmbeddingData::new("q", vec![1.0]));
        let nearest = NearestVector {
            record,
            distance: 0.5,
        };

        let json = serde_json::to_value(&nearest).unwrap();
        assert_eq!(json["text"], "q");
        assert_eq!(json["distance"], 0.5);
        assert!(json.get("record").is_none());
    }

    #[test]
    fn test_ingest_progress_percent() {
        assert_eq!(IngestProgress::at(IngestStep::AnalyzeFile, 1, 3).percent, 33);
        assert_eq!(IngestProgress::at(IngestStep::AnalyzeFile, 3, 3).percent, 100);
        assert_eq!(IngestProgress::at(IngestStep::LoadFile, 0, 0).percent, 0);
        assert_eq!(IngestProgress::default().step, IngestStep::Idle);
    }

    #[test]
    fn test_api_response() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.data, Some("data"));

        let error_response: ApiResponse<String> = ApiResponse::error("error".to_string());
        assert!(!error_response.success);
        assert_eq!(error_response.error, Some("error".to_string()));
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = LabError::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Embedding request failed after 3 attempts: timeout"
        );
    }
}
