use serde::{Deserialize, Serialize};
use storage::{DayPlan, MealPlan, Recipe};

use crate::json::{lenient_opt_string, lenient_string};

/// Slot labels of a proposal, in order.
pub const SLOT_LABELS: [&str; 9] = [
    "Monday dinner",
    "Tuesday dinner",
    "Wednesday dinner",
    "Thursday dinner",
    "Friday dinner",
    "Saturday lunch",
    "Saturday dinner",
    "Sunday lunch",
    "Sunday dinner",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealAction {
    #[serde(alias = "cook", alias = "COOK")]
    Cook,
    /// Eat a batch cooked on an earlier slot.
    #[serde(alias = "reuse", alias = "REUSE", alias = "Leftovers", alias = "leftovers")]
    Reuse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMeal {
    #[serde(default, deserialize_with = "lenient_string")]
    pub day: String,
    pub action: MealAction,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub recipe_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipe_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: String,
}

/// Who is eating and how often the household is willing to cook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Household {
    pub adults: u32,
    pub children: u32,
    pub children_ages: Vec<u32>,
    /// Cooking sessions per week.
    pub cooking_frequency: u32,
}

impl Default for Household {
    fn default() -> Self {
        Self {
            adults: 2,
            children: 1,
            children_ages: vec![5],
            cooking_frequency: 5,
        }
    }
}

/// Analyst output: the schedule, the recipes it actually uses, and the household it was made for.
#[derive(Debug, Clone)]
pub struct MealProposal {
    pub planned_meals: Vec<PlannedMeal>,
    pub recipes: Vec<Recipe>,
    pub household: Household,
}

/// A formatted plan plus the usage record of every stage that produced it, in call order.
#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: MealPlan,
    pub metas: Vec<llm_client::AgentMeta>,
}

/// One day as the Chef and Reviewer return it.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDay {
    #[serde(default, deserialize_with = "lenient_string")]
    day: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    recipe_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    recipe_title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    prep_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    note: String,
}

impl From<RawDay> for DayPlan {
    fn from(raw: RawDay) -> Self {
        DayPlan {
            day: raw.day.trim().to_string(),
            recipe_id: raw.recipe_id,
            recipe_title: raw.recipe_title.trim().to_string(),
            prep_time: raw.prep_time.trim().to_string(),
            note: raw.note.trim().to_string(),
        }
    }
}

/// Recipe fields shown to a model.
#[derive(Debug, Serialize)]
pub(crate) struct RecipeSummary<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub tags: String,
    pub ingredients: String,
    pub prep_time: &'a str,
    pub servings: &'a str,
}

impl<'a> From<&'a Recipe> for RecipeSummary<'a> {
    fn from(recipe: &'a Recipe) -> Self {
        Self {
            id: &recipe.id,
            title: &recipe.title,
            tags: recipe.tags.join(", "),
            ingredients: recipe.ingredients.join(", "),
            prep_time: &recipe.prep_time,
            servings: &recipe.servings,
        }
    }
}

/// Drops a leading `Cook: `, `Leftovers: ` or `Reuse: ` label.
pub fn strip_action_prefix(title: &str) -> &str {
    let title = title.trim();
    for prefix in ["Cook:", "Leftovers:", "Reuse:"] {
        if title.len() >= prefix.len()
            && title.is_char_boundary(prefix.len())
            && title[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            return title[prefix.len()..].trim();
        }
    }
    title
}

/// Restores `recipe_id` on model-written days.
///
/// Per day: an echoed id that names one of `recipes` is kept; otherwise the id of the slot at
/// the same position in `slot_ids` (only when both sides have the same length); otherwise the
/// recipe whose title matches the day's title without its action label, case-insensitively;
/// otherwise unset.
pub(crate) fn reattach_recipe_ids(days: &mut [DayPlan], slot_ids: Option<&[Option<String>]>, recipes: &[Recipe]) {
    let is_known = |id: &str| recipes.iter().any(|r| r.id == id);
    let positional = slot_ids.filter(|ids| ids.len() == days.len());

    for (idx, day) in days.iter_mut().enumerate() {
        if day.recipe_id.as_deref().is_some_and(is_known) {
            continue;
        }
        let by_slot = positional
            .and_then(|ids| ids[idx].as_deref())
            .filter(|id| is_known(*id));
        let resolved = by_slot.map(str::to_string).or_else(|| {
            let title = strip_action_prefix(&day.recipe_title);
            recipes
                .iter()
                .find(|r| r.title.trim().eq_ignore_ascii_case(title))
                .map(|r| r.id.clone())
        });
        day.recipe_id = resolved;
    }
}
