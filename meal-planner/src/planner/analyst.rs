//! Analyst stage: picks recipes from the candidates and lays them out over the nine slots.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use llm_client::{AgentMeta, TextGenerator};
use prompt::{PromptError, PromptTemplates};
use serde::{Deserialize, Serialize};
use storage::Recipe;
use tracing::{info, instrument};

use super::types::{Household, MealAction, MealProposal, PlannedMeal, RecipeSummary, SLOT_LABELS};
use crate::core::AgentError;
use crate::json::generate_validated;

pub const ANALYST_AGENT: &str = "Analyst";

const TEMPLATE: &str = "analyst";

#[derive(Serialize)]
struct AnalystContext<'a> {
    request: &'a str,
    household: &'a Household,
    recipes: Vec<RecipeSummary<'a>>,
    slots: &'a [&'a str],
}

#[derive(Deserialize)]
struct AnalystReply {
    planned_meals: Vec<PlannedMeal>,
}

pub struct Analyst {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
}

impl Analyst {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, PromptError> {
        let templates =
            PromptTemplates::new().with_template(TEMPLATE, include_str!("prompts/analyst.hbs"))?;
        Ok(Self {
            generator,
            templates,
        })
    }

    #[instrument(skip_all, fields(candidates = candidates.len(), model = self.generator.model()))]
    pub async fn propose(
        &self,
        request: &str,
        household: &Household,
        candidates: &[Recipe],
    ) -> Result<(MealProposal, AgentMeta), AgentError> {
        let prompt = self.templates.render(
            TEMPLATE,
            &AnalystContext {
                request,
                household,
                recipes: candidates.iter().map(RecipeSummary::from).collect(),
                slots: &SLOT_LABELS,
            },
        )?;

        let (reply, meta): (AnalystReply, AgentMeta) =
            generate_validated(self.generator.as_ref(), ANALYST_AGENT, &prompt, check_slots).await?;

        let mut planned_meals = reply.planned_meals;
        let recipes = resolve_cook_meals(&mut planned_meals, candidates);
        info!(
            slots = planned_meals.len(),
            selected = recipes.len(),
            "step: analyst proposal ready"
        );

        Ok((
            MealProposal {
                planned_meals,
                recipes,
                household: household.clone(),
            },
            meta,
        ))
    }
}

fn check_slots(reply: &AnalystReply) -> Result<(), String> {
    if reply.planned_meals.len() != SLOT_LABELS.len() {
        return Err(format!(
            "expected {} planned meals, got {}",
            SLOT_LABELS.len(),
            reply.planned_meals.len()
        ));
    }
    Ok(())
}

/// Resolves Cook meals to candidates by exact title and writes the id onto the meal. Returns
/// the distinct selected recipes in first-use order; unknown titles resolve to nothing.
fn resolve_cook_meals(meals: &mut [PlannedMeal], candidates: &[Recipe]) -> Vec<Recipe> {
    let by_title: HashMap<&str, &Recipe> = candidates.iter().map(|r| (r.title.as_str(), r)).collect();
    let mut selected = Vec::new();
    let mut seen = HashSet::new();

    for meal in meals.iter_mut().filter(|m| m.action == MealAction::Cook) {
        match by_title.get(meal.recipe_title.as_str()) {
            Some(recipe) => {
                meal.recipe_id = Some(recipe.id.clone());
                if seen.insert(recipe.id.as_str()) {
                    selected.push((*recipe).clone());
                }
            }
            None => meal.recipe_id = None,
        }
    }
    selected
}
