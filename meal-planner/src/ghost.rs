//! Ghost blog access. [`GhostClient`] reads posts through the Content API (tags come along with
//! `include=tags`); [`GhostPublisher`] creates posts through the Admin API for clipped recipes.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, instrument};

use crate::clipper::{NewPost, RecipePublisher};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ADMIN_AUDIENCE: &str = "/v3/admin/";
const ADMIN_TOKEN_TTL_SECS: i64 = 300;

/// A published post as the ingestion pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub html: String,
    /// Tag names in CMS order.
    pub tags: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PostsPage {
    #[serde(default)]
    posts: Vec<GhostPost>,
    meta: PageMeta,
}

#[derive(Deserialize)]
struct GhostPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Vec<GhostTag>,
}

#[derive(Deserialize, Serialize)]
struct GhostTag {
    name: String,
}

#[derive(Deserialize)]
struct CreatedPosts {
    posts: Vec<GhostPost>,
}

#[derive(Serialize)]
struct NewPostsBody<'a> {
    posts: [NewGhostPost<'a>; 1],
}

#[derive(Serialize)]
struct NewGhostPost<'a> {
    title: &'a str,
    html: &'a str,
    status: &'static str,
    tags: Vec<GhostTag>,
}

#[derive(Deserialize)]
struct PageMeta {
    pagination: Pagination,
}

#[derive(Deserialize)]
struct Pagination {
    next: Option<u32>,
}

impl From<GhostPost> for BlogPost {
    fn from(post: GhostPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            html: post.html.unwrap_or_default(),
            tags: post.tags.into_iter().map(|t| t.name).collect(),
            updated_at: post.updated_at,
        }
    }
}

pub struct GhostClient {
    http: reqwest::Client,
    api_url: String,
    content_api_key: String,
}

impl GhostClient {
    pub fn new(api_url: &str, content_api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Ghost HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            content_api_key: content_api_key.to_string(),
        })
    }

    /// Every post, following `meta.pagination.next` until it is null.
    #[instrument(skip(self), fields(api_url = %self.api_url))]
    pub async fn fetch_posts(&self) -> Result<Vec<BlogPost>> {
        let url = format!("{}/ghost/api/v3/content/posts/", self.api_url);
        let mut posts = Vec::new();
        let mut page = 1u32;

        loop {
            debug!(page, "step: fetching Ghost posts page");
            let response = self
                .http
                .get(&url)
                .query(&[
                    ("key", self.content_api_key.as_str()),
                    ("include", "tags"),
                    ("page", &page.to_string()),
                ])
                .send()
                .await
                .with_context(|| format!("Ghost request for page {} failed", page))?;

            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("Ghost Content API returned {} for page {}", status, page);
            }
            let body: PostsPage = response
                .json()
                .await
                .with_context(|| format!("Failed to decode Ghost page {}", page))?;

            posts.extend(body.posts.into_iter().map(BlogPost::from));
            match body.meta.pagination.next {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        info!(count = posts.len(), "step: Ghost posts fetched");
        Ok(posts)
    }
}

/// Publishes clipped recipes through the Ghost Admin API.
pub struct GhostPublisher {
    http: reqwest::Client,
    api_url: String,
    admin_api_key: String,
}

impl GhostPublisher {
    /// `admin_api_key` is Ghost's `<key id>:<hex secret>` pair.
    pub fn new(api_url: &str, admin_api_key: &str) -> Result<Self> {
        admin_key_parts(admin_api_key)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Ghost HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            admin_api_key: admin_api_key.to_string(),
        })
    }
}

#[async_trait]
impl RecipePublisher for GhostPublisher {
    #[instrument(skip(self, post), fields(title = %post.title))]
    async fn publish(&self, post: &NewPost) -> Result<BlogPost> {
        let token = admin_token(&self.admin_api_key, Utc::now().timestamp())?;
        let body = NewPostsBody {
            posts: [NewGhostPost {
                title: &post.title,
                html: &post.html,
                status: "published",
                tags: post.tags.iter().map(|t| GhostTag { name: t.clone() }).collect(),
            }],
        };
        let response = self
            .http
            .post(format!("{}/ghost/api/v3/admin/posts/", self.api_url))
            .query(&[("source", "html")])
            .header(reqwest::header::AUTHORIZATION, format!("Ghost {}", token))
            .json(&body)
            .send()
            .await
            .context("Ghost Admin request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ghost Admin API returned {}: {}", status, prompt::preview(&text, 200));
        }
        let created: CreatedPosts = response
            .json()
            .await
            .context("Failed to decode created Ghost post")?;
        let post = created
            .posts
            .into_iter()
            .next()
            .map(BlogPost::from)
            .context("Ghost Admin API returned no post")?;
        info!(post_id = %post.id, "step: Ghost post created");
        Ok(post)
    }
}

fn admin_key_parts(admin_api_key: &str) -> Result<(&str, Vec<u8>)> {
    let (id, secret) = admin_api_key
        .split_once(':')
        .filter(|(id, secret)| !id.is_empty() && !secret.is_empty())
        .context("Ghost admin key must look like <id>:<secret>")?;
    Ok((id, decode_hex(secret)?))
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    if !text.is_ascii() || text.len() % 2 != 0 {
        anyhow::bail!("Ghost admin secret is not hex");
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).context("Ghost admin secret is not hex"))
        .collect()
}

/// Short-lived HS256 token for the Admin API, signed with the key's secret.
fn admin_token(admin_api_key: &str, issued_at: i64) -> Result<String> {
    let (id, secret) = admin_key_parts(admin_api_key)?;
    let header = serde_json::json!({ "alg": "HS256", "typ": "JWT", "kid": id });
    let claims = serde_json::json!({
        "iat": issued_at,
        "exp": issued_at + ADMIN_TOKEN_TTL_SECS,
        "aud": ADMIN_AUDIENCE,
    });
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).context("Invalid Ghost admin secret")?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{}.{}", signing_input, signature))
}
