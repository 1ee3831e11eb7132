//! Chef stage: formats the proposal into day entries and drafts a shopping list.

use std::sync::Arc;

use chrono::NaiveDate;
use llm_client::{AgentMeta, TextGenerator};
use prompt::{PromptError, PromptTemplates};
use serde::{Deserialize, Serialize};
use storage::{DayPlan, MealPlan};
use tracing::{info, instrument, warn};

use super::types::{reattach_recipe_ids, Household, MealAction, MealProposal, RawDay};
use crate::core::AgentError;
use crate::json::{generate_validated, string_or_list};

pub const CHEF_AGENT: &str = "Chef";

const TEMPLATE: &str = "chef";

#[derive(Serialize)]
struct ChefSlot<'a> {
    index: usize,
    day: &'a str,
    action: &'static str,
    recipe_id: Option<&'a str>,
    title: &'a str,
    ingredients: String,
    prep_time: &'a str,
}

#[derive(Serialize)]
struct ChefContext<'a> {
    household: &'a Household,
    slots: Vec<ChefSlot<'a>>,
}

#[derive(Deserialize)]
struct ChefReply {
    plan: Vec<RawDay>,
    #[serde(default, deserialize_with = "string_or_list")]
    shopping_list: Vec<String>,
}

pub struct Chef {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
}

impl Chef {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, PromptError> {
        let templates = PromptTemplates::new().with_template(TEMPLATE, include_str!("prompts/chef.hbs"))?;
        Ok(Self {
            generator,
            templates,
        })
    }

    /// Returns a Draft for `week_start` owned by `user_id`. The plan keeps the Chef's shopping
    /// list as a preview; it is cleared when the draft is persisted.
    #[instrument(skip_all, fields(user_id = user_id, week_start = %week_start, slots = proposal.planned_meals.len()))]
    pub async fn format_plan(
        &self,
        user_id: i64,
        request: &str,
        proposal: &MealProposal,
        week_start: NaiveDate,
    ) -> Result<(MealPlan, AgentMeta), AgentError> {
        let slots = proposal
            .planned_meals
            .iter()
            .enumerate()
            .map(|(index, meal)| {
                let recipe = meal
                    .recipe_id
                    .as_deref()
                    .and_then(|id| proposal.recipes.iter().find(|r| r.id == id));
                ChefSlot {
                    index,
                    day: &meal.day,
                    action: match meal.action {
                        MealAction::Cook => "Cook",
                        MealAction::Reuse => "Reuse",
                    },
                    recipe_id: meal.recipe_id.as_deref(),
                    title: &meal.recipe_title,
                    ingredients: recipe.map(|r| r.ingredients.join(", ")).unwrap_or_default(),
                    prep_time: recipe.map(|r| r.prep_time.as_str()).unwrap_or(""),
                }
            })
            .collect();
        let prompt = self.templates.render(
            TEMPLATE,
            &ChefContext {
                household: &proposal.household,
                slots,
            },
        )?;

        let (reply, meta): (ChefReply, AgentMeta) =
            generate_validated(self.generator.as_ref(), CHEF_AGENT, &prompt, |reply: &ChefReply| {
                if reply.plan.is_empty() {
                    return Err("plan has no days".to_string());
                }
                Ok(())
            })
            .await?;

        let mut days: Vec<DayPlan> = reply.plan.into_iter().map(DayPlan::from).collect();
        if days.len() != proposal.planned_meals.len() {
            warn!(
                expected = proposal.planned_meals.len(),
                got = days.len(),
                "Chef returned a different number of days than proposed"
            );
        }
        let slot_ids: Vec<Option<String>> = proposal
            .planned_meals
            .iter()
            .map(|m| m.recipe_id.clone())
            .collect();
        reattach_recipe_ids(&mut days, Some(&slot_ids), &proposal.recipes);

        let mut plan = MealPlan::new_draft(user_id, week_start, days, request);
        plan.shopping_list = Some(reply.shopping_list);
        info!(
            days = plan.days.len(),
            linked = plan.days.iter().filter(|d| d.recipe_id.is_some()).count(),
            "step: chef plan ready"
        );
        Ok((plan, meta))
    }
}
