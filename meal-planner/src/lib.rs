//! # Meal planner
//!
//! Generates and revises weekly household meal plans from a free-text request, backed by a
//! corpus of recipes ingested from a blog.
//!
//! ## Flow
//!
//! request → [`recipe::RecipeRetriever`] → [`planner::Planner`] (Analyst → Chef) → Draft saved by
//! [`lifecycle::PlanLifecycle`] → Confirm (shopping list, Final) / Adjust (session +
//! Reviewer, new Draft) / Start Over.
//!
//! A link sent to the bot goes to [`clipper::RecipeClipper`] instead: the page's recipe is
//! published to the blog and indexed.
//!
//! [`bot::ConversationHandler`] routes inbound chat updates; [`telegram`] adapts it to teloxide.

pub mod bot;
pub mod cli;
pub mod clipper;
pub mod components;
pub mod config;
pub mod core;
pub mod ghost;
pub mod ingestion;
pub mod json;
pub mod lifecycle;
pub mod metrics;
pub mod planner;
pub mod recipe;
pub mod session;
pub mod telegram;

pub use crate::core::{init_tracing, ActionButton, AgentError, BotError, ChatTransport, ClipError, TransportError};
pub use cli::{Cli, Commands};
pub use config::AppConfig;
