//! Structured recipe extraction from a blog post.

use std::collections::HashSet;
use std::sync::Arc;

use llm_client::{AgentMeta, TextGenerator};
use prompt::{PromptError, PromptTemplates};
use serde::{Deserialize, Serialize};
use storage::Recipe;
use tracing::{info, instrument};

use crate::core::AgentError;
use crate::ghost::BlogPost;
use crate::json::{generate_json, lenient_string, string_or_list};

pub const EXTRACTOR_AGENT: &str = "Extractor";

const TEMPLATE: &str = "extractor";

#[derive(Serialize)]
struct ExtractorContext<'a> {
    title: &'a str,
    html: &'a str,
    tags: &'a [String],
}

#[derive(Deserialize)]
struct RawRecipe {
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "string_or_list")]
    ingredients: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    instructions: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    prep_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    servings: String,
}

pub struct RecipeExtractor {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
}

impl RecipeExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, PromptError> {
        let templates =
            PromptTemplates::new().with_template(TEMPLATE, include_str!("prompts/extractor.hbs"))?;
        Ok(Self {
            generator,
            templates,
        })
    }

    /// Asks the model for the recipe in `post`. The id and source timestamp always come from
    /// the post; an empty model title falls back to the post title.
    #[instrument(skip(self, post), fields(post_id = %post.id, model = self.generator.model()))]
    pub async fn extract_recipe(&self, post: &BlogPost) -> Result<(Recipe, AgentMeta), AgentError> {
        let prompt = self.templates.render(
            TEMPLATE,
            &ExtractorContext {
                title: &post.title,
                html: &post.html,
                tags: &post.tags,
            },
        )?;

        let (raw, meta): (RawRecipe, AgentMeta) =
            generate_json(self.generator.as_ref(), EXTRACTOR_AGENT, &prompt).await?;

        let title = if raw.title.trim().is_empty() {
            post.title.trim().to_string()
        } else {
            raw.title.trim().to_string()
        };
        let recipe = Recipe {
            id: post.id.clone(),
            title,
            ingredients: raw.ingredients,
            instructions: raw.instructions,
            tags: merge_tags(&post.tags, &raw.tags),
            prep_time: raw.prep_time.trim().to_string(),
            servings: raw.servings.trim().to_string(),
            source_updated_at: post.updated_at,
        };
        info!(
            title = %recipe.title,
            ingredients = recipe.ingredients.len(),
            steps = recipe.instructions.len(),
            "step: recipe extracted"
        );
        Ok((recipe, meta))
    }
}

/// CMS tags first, then model tags; lower-cased, trimmed, empty and repeated tags dropped.
pub fn merge_tags(post_tags: &[String], model_tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    post_tags
        .iter()
        .chain(model_tags)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_tags() {
        let merged = merge_tags(&tags(&["Dinner", " Pasta "]), &tags(&["pasta", "", "quick", "DINNER"]));
        assert_eq!(merged, tags(&["dinner", "pasta", "quick"]));
    }

    #[test]
    fn test_merge_tags_without_cms_tags() {
        assert_eq!(merge_tags(&[], &tags(&["Soup"])), tags(&["soup"]));
    }
}
