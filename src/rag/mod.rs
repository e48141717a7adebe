//! Retrieval-augmented question answering over a project's index.
//!
//! Answers questions by retrieving the nearest transcript chunks from the
//! project's vector index and handing them to a chat model as grounding
//! context.

pub mod context;
mod response;

pub use context::ContextBuilder;
pub use response::{RagEngine, RagResponse};

use crate::vector_store::SearchResult;

/// A retrieved chunk formatted for prompting and display.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Transcript base name the chunk came from.
    pub source: String,
    /// Position of the chunk within the rebuild.
    pub chunk_order: i64,
    /// Chunk text.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            source: result.chunk.source,
            chunk_order: result.chunk.chunk_order,
            content: result.chunk.content,
            score: result.score,
        }
    }
}
