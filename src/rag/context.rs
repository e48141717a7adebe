//! Context building for RAG responses.

use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::SqliteIndex;
use std::sync::Arc;

/// Builds grounding context for a question from the project index.
pub struct ContextBuilder {
    index: Arc<SqliteIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl ContextBuilder {
    /// Create a builder with explicit retrieval parameters.
    pub fn new(
        index: Arc<SqliteIndex>,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
        min_score: f32,
    ) -> Self {
        Self {
            index,
            embedder,
            top_k,
            min_score,
        }
    }

    /// Embed the question and retrieve the nearest chunks.
    ///
    /// An empty result is a valid outcome (nothing relevant indexed), not
    /// an error.
    pub async fn build(&self, question: &str) -> Result<Vec<ContextChunk>> {
        let query_embedding = self.embedder.embed(question).await?;

        let results = self
            .index
            .search(&query_embedding, self.top_k, self.min_score)?;

        Ok(results.into_iter().map(ContextChunk::from).collect())
    }
}

/// Format context chunks for inclusion in a prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "---\n[{}] {} (chunk {})\n{}\n---",
                i + 1,
                chunk.source,
                chunk.chunk_order,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format context chunks for display to the user.
pub fn format_context_for_display(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "{} (chunk {}, score: {:.2})",
                chunk.source, chunk.chunk_order, chunk.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, order: i64, content: &str, score: f32) -> ContextChunk {
        ContextChunk {
            source: source.to_string(),
            chunk_order: order,
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn test_format_for_prompt_numbers_chunks() {
        let chunks = vec![
            chunk("lecture", 0, "first passage", 0.9),
            chunk("interview", 3, "second passage", 0.7),
        ];
        let formatted = format_context_for_prompt(&chunks);
        assert!(formatted.contains("[1] lecture (chunk 0)"));
        assert!(formatted.contains("[2] interview (chunk 3)"));
        assert!(formatted.contains("first passage"));
    }

    #[test]
    fn test_format_for_display_shows_scores() {
        let formatted = format_context_for_display(&[chunk("talk", 2, "text", 0.815)]);
        assert_eq!(formatted, "talk (chunk 2, score: 0.81)");
    }
}
