use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recipe extracted from a blog post. `id` is the source post id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub servings: String,
    /// Last-modified time of the source post.
    #[serde(default)]
    pub source_updated_at: Option<DateTime<Utc>>,
}

/// Stored embedding for one recipe, with the hash of the text it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub recipe_id: String,
    pub vector: Vec<f32>,
    pub content_hash: String,
}

impl EmbeddingRecord {
    pub fn new(recipe_id: impl Into<String>, vector: Vec<f32>, content_hash: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            vector,
            content_hash: content_hash.into(),
        }
    }
}

/// One `find_similar` hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecipe {
    pub recipe_id: String,
    pub score: f32,
}
