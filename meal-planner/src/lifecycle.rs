//! Plan lifecycle: Draft → Final (confirm), Draft ⇄ Adjusting (feedback round), and
//! supersession when a newer draft replaces a week. At most one Draft, Adjusting or Final plan
//! exists per user and week.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use llm_client::AgentMeta;
use storage::{MealPlan, PlanRepository, PlanStatus, RecipeRepository, StorageError};
use tracing::{info, instrument};

use crate::core::LifecycleError;
use crate::planner::{is_week_start, Household, ShoppingListGenerator};

pub struct PlanLifecycle {
    plans: Arc<dyn PlanRepository>,
    recipes: Arc<dyn RecipeRepository>,
    shopping: ShoppingListGenerator,
}

impl PlanLifecycle {
    pub fn new(
        plans: Arc<dyn PlanRepository>,
        recipes: Arc<dyn RecipeRepository>,
        shopping: ShoppingListGenerator,
    ) -> Self {
        Self {
            plans,
            recipes,
            shopping,
        }
    }

    pub async fn exists_for_week(&self, user_id: i64, week_start: NaiveDate) -> Result<bool, LifecycleError> {
        Ok(self.plans.exists_for_week(user_id, week_start).await?)
    }

    /// Inserts `plan` as is. Use [`create_draft`](Self::create_draft) for new drafts.
    pub async fn save(&self, plan: &MealPlan) -> Result<i64, LifecycleError> {
        self.plans.save(plan).await.map_err(|e| occupied_or(e, plan))
    }

    pub async fn update_status(&self, plan_id: i64, status: PlanStatus) -> Result<(), LifecycleError> {
        self.plans.update_status(plan_id, status).await.map_err(|e| match e {
            StorageError::NotFound(_) => LifecycleError::PlanNotFound(plan_id),
            other => other.into(),
        })
    }

    pub async fn get_by_id(&self, plan_id: i64) -> Result<Option<MealPlan>, LifecycleError> {
        Ok(self.plans.get_by_id(plan_id).await?)
    }

    pub async fn list_recent_by_user_id(&self, user_id: i64, limit: u32) -> Result<Vec<MealPlan>, LifecycleError> {
        Ok(self.plans.list_recent_by_user_id(user_id, limit).await?)
    }

    /// Persists `plan` as a fresh Draft without a shopping list. Refuses an occupied week.
    #[instrument(skip(self, plan), fields(user_id = plan.user_id, week_start = %plan.week_start))]
    pub async fn create_draft(&self, plan: MealPlan) -> Result<MealPlan, LifecycleError> {
        require_monday(plan.week_start)?;
        if self.plans.exists_for_week(plan.user_id, plan.week_start).await? {
            return Err(LifecycleError::WeekOccupied {
                user_id: plan.user_id,
                week_start: plan.week_start,
            });
        }
        let mut draft = as_draft(plan);
        let id = self.plans.save(&draft).await.map_err(|e| occupied_or(e, &draft))?;
        draft.id = Some(id);
        info!(plan_id = id, "step: draft saved");
        Ok(draft)
    }

    /// Supersedes whatever occupies the week and persists `plan` as its Draft, in one
    /// transaction.
    #[instrument(skip(self, plan), fields(user_id = plan.user_id, week_start = %plan.week_start))]
    pub async fn replace_draft(&self, plan: MealPlan) -> Result<MealPlan, LifecycleError> {
        require_monday(plan.week_start)?;
        let mut draft = as_draft(plan);
        let id = self.plans.save_replacing_week(&draft).await?;
        draft.id = Some(id);
        info!(plan_id = id, "step: draft replaced week");
        Ok(draft)
    }

    /// Generates the shopping list for a Draft and finalizes it. A failed generation leaves the
    /// plan untouched.
    #[instrument(skip(self, household))]
    pub async fn confirm(&self, plan_id: i64, household: &Household) -> Result<(MealPlan, AgentMeta), LifecycleError> {
        let plan = self.require(plan_id).await?;
        if plan.status != PlanStatus::Draft {
            return Err(LifecycleError::InvalidTransition {
                plan_id,
                from: plan.status,
                to: PlanStatus::Final,
            });
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = plan
            .days
            .iter()
            .filter_map(|d| d.recipe_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let recipes = self.recipes.get_by_ids(&ids).await?;
        let (items, meta) = self.shopping.generate(&plan, &recipes, household).await?;

        self.plans.finalize(plan_id, &items).await.map_err(|e| match e {
            StorageError::NotFound(_) => LifecycleError::InvalidTransition {
                plan_id,
                from: plan.status,
                to: PlanStatus::Final,
            },
            other => other.into(),
        })?;
        info!(plan_id, items = items.len(), "step: plan confirmed");

        let confirmed = self.require(plan_id).await?;
        Ok((confirmed, meta))
    }

    /// Draft → Adjusting while feedback is awaited.
    pub async fn begin_adjustment(&self, plan_id: i64) -> Result<MealPlan, LifecycleError> {
        self.transition(plan_id, PlanStatus::Adjusting).await
    }

    /// Adjusting → Draft when a feedback round fails.
    pub async fn abandon_adjustment(&self, plan_id: i64) -> Result<MealPlan, LifecycleError> {
        self.transition(plan_id, PlanStatus::Draft).await
    }

    async fn transition(&self, plan_id: i64, to: PlanStatus) -> Result<MealPlan, LifecycleError> {
        let mut plan = self.require(plan_id).await?;
        if !plan.status.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                plan_id,
                from: plan.status,
                to,
            });
        }
        self.update_status(plan_id, to).await?;
        info!(plan_id, from = %plan.status, to = %to, "step: plan status changed");
        plan.status = to;
        Ok(plan)
    }

    async fn require(&self, plan_id: i64) -> Result<MealPlan, LifecycleError> {
        self.plans
            .get_by_id(plan_id)
            .await?
            .ok_or(LifecycleError::PlanNotFound(plan_id))
    }
}

fn require_monday(week_start: NaiveDate) -> Result<(), LifecycleError> {
    if !is_week_start(week_start) {
        return Err(LifecycleError::InvalidWeekStart(week_start));
    }
    Ok(())
}

fn as_draft(mut plan: MealPlan) -> MealPlan {
    plan.id = None;
    plan.status = PlanStatus::Draft;
    plan.shopping_list = None;
    plan
}

fn occupied_or(err: StorageError, plan: &MealPlan) -> LifecycleError {
    match err {
        StorageError::Conflict(_) => LifecycleError::WeekOccupied {
            user_id: plan.user_id,
            week_start: plan.week_start,
        },
        other => other.into(),
    }
}
