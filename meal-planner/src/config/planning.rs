//! Planning, model and blog settings.

use anyhow::Result;
use std::env;
use std::str::FromStr;

use crate::planner::{CadenceMode, Household};

pub const DEFAULT_ANALYST_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_EXTRACTOR_MODEL: &str = "llama-3.1-8b-instant";

/// Model id per agent stage.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub analyst: String,
    pub chef: String,
    pub reviewer: String,
    pub extractor: String,
}

impl ModelConfig {
    /// `ANALYST_MODEL`, `CHEF_MODEL`, `REVIEWER_MODEL` (both default to the analyst model),
    /// `EXTRACTOR_MODEL`.
    pub fn from_env() -> Self {
        let analyst = non_empty_var("ANALYST_MODEL").unwrap_or_else(|| DEFAULT_ANALYST_MODEL.to_string());
        Self {
            chef: non_empty_var("CHEF_MODEL").unwrap_or_else(|| analyst.clone()),
            reviewer: non_empty_var("REVIEWER_MODEL").unwrap_or_else(|| analyst.clone()),
            extractor: non_empty_var("EXTRACTOR_MODEL")
                .unwrap_or_else(|| DEFAULT_EXTRACTOR_MODEL.to_string()),
            analyst,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanningConfig {
    /// Household assumed for every request.
    pub household: Household,
    pub session_ttl_secs: u64,
    pub small_pool_threshold: usize,
    pub retrieval_top_k: usize,
    pub cadence_mode: CadenceMode,
}

impl PlanningConfig {
    pub fn from_env() -> Result<Self> {
        let adults = parse_var("DEFAULT_ADULTS", 2u32)?;
        let children = parse_var("DEFAULT_CHILDREN", 1u32)?;
        let children_ages = match non_empty_var("DEFAULT_CHILDREN_AGES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u32>().map_err(|_| {
                        anyhow::anyhow!("DEFAULT_CHILDREN_AGES contains a non-numeric age '{}'", s)
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => vec![5; children as usize],
        };
        let cadence_mode = match non_empty_var("CADENCE_MODE") {
            Some(raw) => CadenceMode::from_str(&raw).map_err(|e| anyhow::anyhow!(e))?,
            None => CadenceMode::default(),
        };

        Ok(Self {
            household: Household {
                adults,
                children,
                children_ages,
                cooking_frequency: parse_var("DEFAULT_COOKING_FREQUENCY", 5u32)?,
            },
            session_ttl_secs: parse_var("SESSION_TTL_SECS", 900u64)?,
            small_pool_threshold: parse_var("SMALL_POOL_THRESHOLD", 20usize)?,
            retrieval_top_k: parse_var("RETRIEVAL_TOP_K", 20usize)?,
            cadence_mode,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.household.adults + self.household.children == 0 {
            anyhow::bail!("DEFAULT_ADULTS and DEFAULT_CHILDREN cannot both be 0");
        }
        if self.household.children_ages.len() != self.household.children as usize {
            anyhow::bail!(
                "DEFAULT_CHILDREN_AGES lists {} ages for {} children",
                self.household.children_ages.len(),
                self.household.children
            );
        }
        if self.retrieval_top_k == 0 {
            anyhow::bail!("RETRIEVAL_TOP_K must be at least 1");
        }
        if self.session_ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECS must be at least 1");
        }
        Ok(())
    }
}

/// Ghost access. `ingest` needs the Content API key; clipping links needs the Admin API key.
#[derive(Debug, Clone, Default)]
pub struct GhostConfig {
    pub api_url: Option<String>,
    pub content_api_key: Option<String>,
    /// GHOST_ADMIN_API_KEY, `<id>:<hex secret>`
    pub admin_api_key: Option<String>,
}

impl GhostConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: non_empty_var("GHOST_API_URL"),
            content_api_key: non_empty_var("GHOST_CONTENT_API_KEY"),
            admin_api_key: non_empty_var("GHOST_ADMIN_API_KEY"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref url) = self.api_url {
            if reqwest::Url::parse(url).is_err() {
                anyhow::bail!("GHOST_API_URL is set but not a valid URL: {}", url);
            }
        }
        if let Some(ref key) = self.admin_api_key {
            if !key.contains(':') {
                anyhow::bail!("GHOST_ADMIN_API_KEY must look like <id>:<secret>");
            }
        }
        Ok(())
    }

    /// `(api_url, content_api_key)`, or an error naming the missing variable.
    pub fn require(&self) -> Result<(&str, &str)> {
        let url = self
            .api_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GHOST_API_URL must be set for ingestion"))?;
        let key = self
            .content_api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GHOST_CONTENT_API_KEY must be set for ingestion"))?;
        Ok((url, key))
    }

    /// `(api_url, admin_api_key)` when both are set; clipping is off otherwise.
    pub fn admin(&self) -> Option<(&str, &str)> {
        Some((self.api_url.as_deref()?, self.admin_api_key.as_deref()?))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got '{}'", key, raw)),
        None => Ok(default),
    }
}
