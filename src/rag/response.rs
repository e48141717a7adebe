//! RAG response generation.

use super::{context::format_context_for_prompt, ContextBuilder, ContextChunk};
use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::error::{PrateError, Result};
use crate::openai::create_client;
use crate::vector_store::SqliteIndex;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const ANSWER_SYSTEM_PROMPT: &str = "You answer questions about the user's transcribed audio \
library. Ground every answer in the provided transcript excerpts and say so when the excerpts \
don't contain the answer. Be concise.";

const CHAT_SYSTEM_PROMPT: &str = "You are a conversational assistant for the user's transcribed \
audio library. Each message comes with transcript excerpts retrieved for it; prefer them over \
prior knowledge and say so when they don't cover the question.";

/// Answer returned when retrieval finds nothing relevant.
const NO_CONTEXT_ANSWER: &str =
    "I couldn't find anything relevant to that question in this project's transcripts.";

/// Maximum chat turns retained as history.
const MAX_HISTORY_MESSAGES: usize = 20;

/// RAG engine for question answering over one project.
pub struct RagEngine {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    context_builder: ContextBuilder,
    conversation_history: Vec<ChatCompletionRequestMessage>,
}

impl RagEngine {
    /// Create an engine over an opened project index.
    pub fn new(index: Arc<SqliteIndex>, embedder: Arc<dyn Embedder>, config: &RagConfig) -> Self {
        let context_builder =
            ContextBuilder::new(index, embedder, config.top_k, config.min_score);

        Self {
            client: create_client(),
            model: config.model.clone(),
            temperature: config.temperature,
            context_builder,
            conversation_history: Vec::new(),
        }
    }

    /// Ask a single question and get a grounded answer.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        info!("Processing question");

        let context_chunks = self.context_builder.build(question).await?;

        if context_chunks.is_empty() {
            debug!("No relevant chunks; returning empty-context answer");
            return Ok(RagResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let user_prompt = format!(
            "Question: {}\n\nTranscript excerpts:\n{}",
            question,
            format_context_for_prompt(&context_chunks)
        );

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(ANSWER_SYSTEM_PROMPT)
                .build()
                .map_err(|e| PrateError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(|e| PrateError::Rag(e.to_string()))?
                .into(),
        ];

        let answer = self.complete(messages).await?;

        debug!("Generated response with {} sources", context_chunks.len());

        Ok(RagResponse {
            answer,
            sources: context_chunks,
        })
    }

    /// Continue a chat session, retrieving fresh context for each message.
    #[instrument(skip(self), fields(message = %message))]
    pub async fn chat(&mut self, message: &str) -> Result<RagResponse> {
        let context_chunks = self.context_builder.build(message).await?;

        let user_content = if context_chunks.is_empty() {
            format!(
                "Question: {}\n\n(No relevant transcript excerpts were found)",
                message
            )
        } else {
            format!(
                "Question: {}\n\nTranscript excerpts:\n{}",
                message,
                format_context_for_prompt(&context_chunks)
            )
        };

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(|e| PrateError::Rag(e.to_string()))?;
        self.conversation_history.push(user_message.into());

        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(CHAT_SYSTEM_PROMPT)
                .build()
                .map_err(|e| PrateError::Rag(e.to_string()))?
                .into(),
        ];
        messages.extend(self.conversation_history.clone());

        let answer = self.complete(messages).await?;

        let assistant_message = ChatCompletionRequestAssistantMessageArgs::default()
            .content(answer.clone())
            .build()
            .map_err(|e| PrateError::Rag(e.to_string()))?;
        self.conversation_history.push(assistant_message.into());

        if self.conversation_history.len() > MAX_HISTORY_MESSAGES {
            let excess = self.conversation_history.len() - MAX_HISTORY_MESSAGES;
            self.conversation_history.drain(..excess);
        }

        Ok(RagResponse {
            answer,
            sources: context_chunks,
        })
    }

    /// Clear conversation history.
    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
    }

    async fn complete(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| PrateError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PrateError::OpenAI(format!("Failed to generate response: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .ok_or_else(|| PrateError::Rag("Empty response from LLM".to_string()))
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Source chunks used for the answer.
    pub sources: Vec<ContextChunk>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (chunk {}, score: {:.2})",
                    source.source, source.chunk_order, source.score
                ));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeEmbedder;

    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_ask_with_empty_index_answers_gracefully() {
        let index = Arc::new(SqliteIndex::in_memory().unwrap());
        let engine = RagEngine::new(index, Arc::new(FakeEmbedder), &RagConfig::default());

        // no chunks retrieved, so no model call is made and no error raised
        let response = engine.ask("what is the meaning of life?").await.unwrap();
        assert_eq!(response.answer, NO_CONTEXT_ANSWER);
        assert!(response.sources.is_empty());
    }

    #[test]
    fn test_format_for_display_lists_sources() {
        let response = RagResponse {
            answer: "The talk covers ownership.".to_string(),
            sources: vec![ContextChunk {
                source: "rust-talk".to_string(),
                chunk_order: 4,
                content: "ownership and borrowing".to_string(),
                score: 0.88,
            }],
        };
        let display = response.format_for_display();
        assert!(display.starts_with("The talk covers ownership."));
        assert!(display.contains("rust-talk (chunk 4, score: 0.88)"));
    }
}
