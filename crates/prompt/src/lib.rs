//! # Prompt
//!
//! Builds the text sent to text-generation models.
//!
//! ## Pieces
//!
//! - [`ChatMessage`] / [`MessageRole`]: one element of an OpenAI-style `messages` array.
//! - [`PromptTemplates`]: named handlebars templates rendered from any `Serialize` context.
//!   HTML escaping is disabled; prompts are plain text.
//!
//! ## Usage
//!
//! Each planning stage registers its template once at construction and renders a fresh prompt
//! per request. Rendering errors surface as [`PromptError`].

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// System instruction sent ahead of every structured-output prompt.
pub const JSON_SYSTEM_MESSAGE: &str =
    "You are a precise assistant. Reply with a single JSON object and nothing else.";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid template '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("Failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },
}

/// Named handlebars templates.
pub struct PromptTemplates {
    hbs: Handlebars<'static>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptTemplates {
    pub fn new() -> Self {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs }
    }

    /// Registers (or replaces) a template under `name`.
    pub fn register(&mut self, name: &str, template: &str) -> Result<(), PromptError> {
        self.hbs
            .register_template_string(name, template)
            .map_err(|e| PromptError::Template {
                name: name.to_string(),
                source: Box::new(e),
            })
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_template(mut self, name: &str, template: &str) -> Result<Self, PromptError> {
        self.register(name, template)?;
        Ok(self)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.hbs.has_template(name)
    }

    /// Renders template `name` with `context`.
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, PromptError> {
        let rendered = self
            .hbs
            .render(name, context)
            .map_err(|e| PromptError::Render {
                name: name.to_string(),
                source: Box::new(e),
            })?;
        debug!(template = name, prompt_len = rendered.len(), "step: prompt rendered");
        Ok(rendered)
    }
}

/// Returns at most `max_chars` characters of `text`, appending `...` when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
