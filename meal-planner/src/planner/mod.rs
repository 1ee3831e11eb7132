//! # Planning orchestrator
//!
//! Retriever → [`Analyst`] → cadence check → [`Chef`] for new plans, [`PlanReviewer`] for
//! feedback on a draft, [`ShoppingListGenerator`] on confirmation. Stages run strictly in
//! sequence; each returns an [`AgentMeta`] that the caller forwards to the metrics sink.

mod analyst;
mod cadence;
mod chef;
mod reviewer;
mod shopping;
mod types;
mod week;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use llm_client::AgentMeta;
use storage::{MealPlan, Recipe};
use tracing::{info, instrument, warn};

pub use analyst::{Analyst, ANALYST_AGENT};
pub use cadence::{check_cadence, CadenceMode, CadenceViolation};
pub use chef::{Chef, CHEF_AGENT};
pub use reviewer::{PlanReviewer, REVIEWER_AGENT};
pub use shopping::{ShoppingListGenerator, SHOPPING_AGENT};
pub use types::{
    strip_action_prefix, GeneratedPlan, Household, MealAction, MealProposal, PlannedMeal, SLOT_LABELS,
};
pub use week::{is_week_start, next_monday, week_start_of};

use crate::core::AgentError;
use crate::recipe::RecipeRetriever;

pub struct Planner {
    retriever: Arc<RecipeRetriever>,
    analyst: Analyst,
    chef: Chef,
    reviewer: PlanReviewer,
    cadence_mode: CadenceMode,
}

impl Planner {
    pub fn new(retriever: Arc<RecipeRetriever>, analyst: Analyst, chef: Chef, reviewer: PlanReviewer) -> Self {
        Self {
            retriever,
            analyst,
            chef,
            reviewer,
            cadence_mode: CadenceMode::default(),
        }
    }

    pub fn with_cadence_mode(mut self, mode: CadenceMode) -> Self {
        self.cadence_mode = mode;
        self
    }

    /// New plan for `request`. Metas are returned in call order (Analyst, Chef).
    #[instrument(skip(self, request, household))]
    pub async fn generate_plan(
        &self,
        user_id: i64,
        request: &str,
        household: &Household,
        week_start: NaiveDate,
    ) -> Result<GeneratedPlan, AgentError> {
        let candidates = self.retriever.retrieve(request).await?;
        info!(candidates = candidates.len(), "step: candidates retrieved");

        let (proposal, analyst_meta) = self.analyst.propose(request, household, &candidates).await?;
        self.enforce_cadence(&proposal)?;

        let (plan, chef_meta) = self
            .chef
            .format_plan(user_id, request, &proposal, week_start)
            .await?;

        Ok(GeneratedPlan {
            plan,
            metas: vec![analyst_meta, chef_meta],
        })
    }

    /// Revised copy of `current`. The reviewer sees the recipes the plan already uses plus the
    /// candidates closest to the feedback.
    #[instrument(skip(self, current, feedback, household), fields(plan_id = ?current.id))]
    pub async fn revise_plan(
        &self,
        current: &MealPlan,
        feedback: &str,
        household: &Household,
    ) -> Result<(MealPlan, AgentMeta), AgentError> {
        let in_plan_ids: Vec<String> = current
            .days
            .iter()
            .filter_map(|d| d.recipe_id.clone())
            .collect();
        let mut available = self.retriever.recipes().get_by_ids(&in_plan_ids).await?;
        let similar = match self.retriever.retrieve_for_feedback(feedback).await {
            Ok(found) => found,
            Err(AgentError::NoCandidates) if !available.is_empty() => Vec::new(),
            Err(e) => return Err(e),
        };
        merge_unique(&mut available, similar);
        info!(available = available.len(), "step: reviewer candidates ready");

        self.reviewer
            .revise(current, feedback, household, &available)
            .await
    }

    fn enforce_cadence(&self, proposal: &MealProposal) -> Result<(), AgentError> {
        if self.cadence_mode == CadenceMode::Off {
            return Ok(());
        }
        let violations = check_cadence(&proposal.planned_meals);
        if violations.is_empty() {
            return Ok(());
        }
        for violation in &violations {
            warn!(violation = %violation, "Proposal breaks cadence");
        }
        match self.cadence_mode {
            CadenceMode::Reject => Err(AgentError::Cadence(violations)),
            _ => Ok(()),
        }
    }
}

fn merge_unique(into: &mut Vec<Recipe>, more: Vec<Recipe>) {
    let mut seen: HashSet<String> = into.iter().map(|r| r.id.clone()).collect();
    into.extend(more.into_iter().filter(|r| seen.insert(r.id.clone())));
}
