use async_trait::async_trait;
use embedding_lab_common::Result;

pub const ANSWER_SYSTEM_PROMPT: &str = "Please summarize the following text and answer the user's question in the author's tone. \
If there's no relevant information in the text, respond with \
\"There is no applicable information. I cannot answer your question.\" \
Keep your answers in English, within 50 words, and always respond in the language used by the user.";

/// Produces an answer for a question that came without one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    async fn answer(&self, question: &str, api_key: &str) -> Result<String>;
}
