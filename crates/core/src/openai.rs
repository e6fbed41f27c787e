use crate::{answer::{AnswerProvider, ANSWER_SYSTEM_PROMPT}, embedding::EmbeddingProvider};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateEmbeddingRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use embedding_lab_common::{LabError, Result};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_base: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_base: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
        }
    }
}

/// OpenAI-backed embedding and answer provider.
///
/// Credentials can differ between requests, so a client is built per call.
#[derive(Debug, Clone, Default)]
pub struct OpenAiProvider {
    settings: OpenAiSettings,
}

impl OpenAiProvider {
    pub fn new(settings: OpenAiSettings) -> Self {
        Self { settings }
    }

    pub fn with_embedding_model(mut self, model: String) -> Self {
        self.settings.embedding_model = model;
        self
    }

    pub fn with_chat_model(mut self, model: String) -> Self {
        self.settings.chat_model = model;
        self
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &self.settings.api_base {
            config = config.with_api_base(base);
        }
        Client::with_config(config)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str, api_key: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.settings.embedding_model)
            .input(text)
            .build()
            .map_err(|e| LabError::Embedding(format!("Invalid embedding request: {}", e)))?;

        let response = self
            .client(api_key)
            .embeddings()
            .create(request)
            .await
            .map_err(|e| LabError::Embedding(e.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| LabError::Embedding("No embedding returned".to_string()))?
            .embedding;

        debug!("Received embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl AnswerProvider for OpenAiProvider {
    async fn answer(&self, question: &str, api_key: &str) -> Result<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(ANSWER_SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| LabError::Generation(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(question)
                    .build()
                    .map_err(|e| LabError::Generation(e.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.chat_model)
            .messages(messages)
            .build()
            .map_err(|e| LabError::Generation(e.to_string()))?;

        let response = match self.client(api_key).chat().create(request).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("OpenAI API error: {}", e);
                return Err(LabError::Generation(e.to_string()));
            }
        };

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LabError::Generation("No generated text found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        let provider = OpenAiProvider::default();
        assert_eq!(provider.settings().embedding_model, "text-embedding-ada-002");
        assert_eq!(provider.settings().chat_model, "gpt-3.5-turbo");
        assert!(provider.settings().api_base.is_none());
    }

    #[test]
    fn test_model_builders() {
        let provider = OpenAiProvider::default()
            .with_embedding_model("text-embedding-3-small".to_string())
            .with_chat_model("gpt-4o-mini".to_string());

        assert_eq!(provider.settings().embedding_model, "text-embedding-3-small");
        assert_eq!(provider.settings().chat_model, "gpt-4o-mini");
    }
}
