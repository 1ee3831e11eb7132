//! Recipe corpus side of the planner: extraction from blog posts, content-addressed embedding
//! cache, and candidate retrieval for a request.

mod embedding_cache;
mod extractor;
mod retriever;

pub use embedding_cache::{canonical_text, content_hash, EmbeddingCache, PreparedEmbedding, EMBEDDING_AGENT};
pub use extractor::{merge_tags, RecipeExtractor, EXTRACTOR_AGENT};
pub use retriever::{RecipeRetriever, RetrieverConfig};
