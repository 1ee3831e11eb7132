//! Shopping-list stage, run when a draft is confirmed.

use std::sync::Arc;

use llm_client::{AgentMeta, TextGenerator};
use prompt::{PromptError, PromptTemplates};
use serde::{Deserialize, Serialize};
use storage::{DayPlan, MealPlan, Recipe};
use tracing::{info, instrument};

use super::types::Household;
use crate::core::AgentError;
use crate::json::{generate_json, string_or_list};

pub const SHOPPING_AGENT: &str = "ShoppingList";

const TEMPLATE: &str = "shopping";

#[derive(Serialize)]
struct ShoppingRecipe<'a> {
    title: &'a str,
    servings: &'a str,
    ingredients: String,
}

#[derive(Serialize)]
struct ShoppingContext<'a> {
    household: &'a Household,
    days: &'a [DayPlan],
    recipes: Vec<ShoppingRecipe<'a>>,
}

#[derive(Deserialize)]
struct ShoppingReply {
    #[serde(default, deserialize_with = "string_or_list")]
    shopping_list: Vec<String>,
}

pub struct ShoppingListGenerator {
    generator: Arc<dyn TextGenerator>,
    templates: PromptTemplates,
}

impl ShoppingListGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Result<Self, PromptError> {
        let templates =
            PromptTemplates::new().with_template(TEMPLATE, include_str!("prompts/shopping.hbs"))?;
        Ok(Self {
            generator,
            templates,
        })
    }

    /// `recipes` are the recipes the plan's days reference.
    #[instrument(skip_all, fields(plan_id = ?plan.id, recipes = recipes.len()))]
    pub async fn generate(
        &self,
        plan: &MealPlan,
        recipes: &[Recipe],
        household: &Household,
    ) -> Result<(Vec<String>, AgentMeta), AgentError> {
        let prompt = self.templates.render(
            TEMPLATE,
            &ShoppingContext {
                household,
                days: &plan.days,
                recipes: recipes
                    .iter()
                    .map(|r| ShoppingRecipe {
                        title: &r.title,
                        servings: &r.servings,
                        ingredients: r.ingredients.join(", "),
                    })
                    .collect(),
            },
        )?;

        let (reply, meta): (ShoppingReply, AgentMeta) =
            generate_json(self.generator.as_ref(), SHOPPING_AGENT, &prompt).await?;
        info!(items = reply.shopping_list.len(), "step: shopping list generated");
        Ok((reply.shopping_list, meta))
    }
}
