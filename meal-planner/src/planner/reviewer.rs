//! Reviewer stage: rewrites a draft according to free-text feedback.

use std::sync::Arc;

use chrono::Utc;
use llm_client::{AgentMeta, TextGenerator};
use prompt::{PromptError, PromptTemplates};
use serde::{Deserialize, Serialize};
use storage::{DayPlan, MealPlan, Recipe};
use tracing::{info, instrument};

use super::types::{reattach_recipe_ids, Household, RawDay, RecipeSummary};
use crate::core::AgentError;
use crate::json::generate_validated;

pub const REVIEWER_AGENT: &str = "PlanReviewer";

const TEMPLATE: &str = "reviewer";

#[derive(Serialize)]
struct ReviewerContext<'a> {
    request: &'a str,
    household: &'a Household,
    days: &'a [DayPlan],
    feedback: &'a str,
    recipes: Vec<RecipeSummary<'a>>,
}

#[derive(Deserialize)]
struct ReviewerReply {
    plan: Vec<RawDay>,
}

pub struct PlanReviewer {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
}

impl PlanReviewer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, PromptError> {
        let templates =
            PromptTemplates::new().with_template(TEMPLATE, include_str!("prompts/reviewer.hbs"))?;
        Ok(Self {
            generator,
            templates,
        })
    }

    /// The revised plan replaces the day list and keeps owner, week, status and request. It has
    /// no id and no shopping list.
    #[instrument(skip_all, fields(plan_id = ?current.id, available = available.len()))]
    pub async fn revise(
        &self,
        current: &MealPlan,
        feedback: &str,
        household: &Household,
        available: &[Recipe],
    ) -> Result<(MealPlan, AgentMeta), AgentError> {
        let prompt = self.templates.render(
            TEMPLATE,
            &ReviewerContext {
                request: &current.request,
                household,
                days: &current.days,
                feedback,
                recipes: available.iter().map(RecipeSummary::from).collect(),
            },
        )?;

        let (reply, meta): (ReviewerReply, AgentMeta) = generate_validated(
            self.generator.as_ref(),
            REVIEWER_AGENT,
            &prompt,
            |reply: &ReviewerReply| {
                if reply.plan.is_empty() {
                    return Err("revised plan has no days".to_string());
                }
                Ok(())
            },
        )
        .await?;

        let mut days: Vec<DayPlan> = reply.plan.into_iter().map(DayPlan::from).collect();
        reattach_recipe_ids(&mut days, None, available);

        let revised = MealPlan {
            id: None,
            user_id: current.user_id,
            week_start: current.week_start,
            status: current.status,
            days,
            shopping_list: None,
            request: current.request.clone(),
            created_at: Utc::now(),
        };
        info!(days = revised.days.len(), "step: plan revised");
        Ok((revised, meta))
    }
}
