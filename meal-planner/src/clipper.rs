//! Recipe clipping: a link sent to the bot becomes a blog post and a searchable recipe.
//!
//! The page is fetched and reduced to text, the extractor structures it, the result is
//! published through a [`RecipePublisher`] and then embedded and stored under the new post's id,
//! so a later `ingest --skip-unchanged` reuses it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use storage::Recipe;
use tracing::{info, instrument};

use crate::core::ClipError;
use crate::ghost::BlogPost;
use crate::ingestion::RecipeIngestor;
use crate::metrics::MetricsRecorder;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_PAGE_CHARS: usize = 20_000;
const NOISE_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "iframe", "noscript"];
const TAG_MARKER: &str = "tag:";

/// A post about to be created on the blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub html: String,
    pub tags: Vec<String>,
}

/// Where clipped recipes are published.
#[async_trait]
pub trait RecipePublisher: Send + Sync {
    /// Creates and publishes `post`, returning it as the blog now stores it.
    async fn publish(&self, post: &NewPost) -> anyhow::Result<BlogPost>;
}

/// A link plus the tags given after `tag:`, e.g. `https://example.com/soup tag: soup, quick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    pub url: String,
    pub tags: Vec<String>,
}

impl ClipRequest {
    /// `None` unless `text` starts with an http(s) link.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !(text.starts_with("http://") || text.starts_with("https://")) {
            return None;
        }
        let mut words = text.split_whitespace();
        let url = words.next()?.to_string();
        let rest: Vec<&str> = words.collect();
        let tags = match rest.iter().position(|w| w.eq_ignore_ascii_case(TAG_MARKER)) {
            Some(at) => rest[at + 1..]
                .iter()
                .flat_map(|w| w.split(','))
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };
        Some(Self { url, tags })
    }
}

#[derive(Debug, Clone)]
pub struct ClippedRecipe {
    pub post: BlogPost,
    pub recipe: Recipe,
}

pub struct RecipeClipper {
    http: reqwest::Client,
    ingestor: Arc<RecipeIngestor>,
    publisher: Arc<dyn RecipePublisher>,
    metrics: MetricsRecorder,
}

impl RecipeClipper {
    pub fn new(
        ingestor: Arc<RecipeIngestor>,
        publisher: Arc<dyn RecipePublisher>,
        metrics: MetricsRecorder,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build clipper HTTP client")?;
        Ok(Self {
            http,
            ingestor,
            publisher,
            metrics,
        })
    }

    #[instrument(skip(self), fields(url = %request.url))]
    pub async fn clip(&self, request: &ClipRequest) -> Result<ClippedRecipe, ClipError> {
        let html = self.fetch(&request.url).await?;
        let page = BlogPost {
            id: request.url.clone(),
            title: String::new(),
            html: page_text(&html),
            tags: request.tags.clone(),
            updated_at: None,
        };
        info!(chars = page.html.len(), "step: page fetched");

        let (mut recipe, meta) = self.ingestor.extract(&page).await?;
        if recipe.title.is_empty() || recipe.ingredients.is_empty() {
            self.metrics.record_meta(&meta).await;
            return Err(ClipError::NoRecipe(request.url.clone()));
        }

        let new_post = NewPost {
            title: recipe.title.clone(),
            html: recipe_html(&recipe, &request.url),
            tags: recipe.tags.clone(),
        };
        let post = match self.publisher.publish(&new_post).await {
            Ok(post) => post,
            Err(e) => {
                self.metrics.record_meta(&meta).await;
                return Err(ClipError::Publish(e));
            }
        };
        info!(post_id = %post.id, title = %post.title, "step: recipe published");

        recipe.id = post.id.clone();
        recipe.source_updated_at = post.updated_at;
        self.ingestor.store(&recipe, meta).await?;
        info!(recipe_id = %recipe.id, "step: clipped recipe indexed");
        Ok(ClippedRecipe { post, recipe })
    }

    async fn fetch(&self, url: &str) -> Result<String, ClipError> {
        let fetch_err = |source| ClipError::Fetch {
            url: url.to_string(),
            source,
        };
        let response = self.http.get(url).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClipError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(fetch_err)
    }
}

/// Visible text of an HTML page: tags dropped, script/style/navigation blocks removed,
/// whitespace collapsed, capped in length.
pub fn page_text(html: &str) -> String {
    // ASCII lower-casing keeps byte offsets, so indices found in `lower` are valid in `html`.
    let lower = html.to_ascii_lowercase();
    let mut text = String::with_capacity(html.len() / 2);
    let mut pos = 0;

    while let Some(rel) = html[pos..].find('<') {
        let start = pos + rel;
        text.push_str(&html[pos..start]);
        text.push(' ');
        let Some(close_rel) = html[start..].find('>') else {
            pos = html.len();
            break;
        };
        let tag_end = start + close_rel + 1;
        let name: String = lower[start + 1..tag_end]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        pos = tag_end;
        if NOISE_TAGS.contains(&name.as_str()) {
            let closing = format!("</{}", name);
            pos = lower[tag_end..]
                .find(&closing)
                .map_or(html.len(), |i| tag_end + i);
        }
    }
    if pos < html.len() {
        text.push_str(&html[pos..]);
    }

    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_PAGE_CHARS)
        .collect()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Post body for a clipped recipe, linking back to where it came from.
pub fn recipe_html(recipe: &Recipe, source_url: &str) -> String {
    let source = escape_html(source_url);
    let mut html = format!(
        "<p><i>Imported from: <a href=\"{0}\">{0}</a></i></p>",
        source
    );
    html.push_str("<h2>Ingredients</h2><ul>");
    for item in &recipe.ingredients {
        html.push_str(&format!("<li>{}</li>", escape_html(item)));
    }
    html.push_str("</ul><h2>Instructions</h2><ol>");
    for step in &recipe.instructions {
        html.push_str(&format!("<li>{}</li>", escape_html(step)));
    }
    html.push_str("</ol>");
    if !recipe.prep_time.is_empty() || !recipe.servings.is_empty() {
        html.push_str(&format!(
            "<hr><p><strong>Prep Time:</strong> {} | <strong>Servings:</strong> {}</p>",
            escape_html(&recipe.prep_time),
            escape_html(&recipe.servings)
        ));
    }
    html
}
