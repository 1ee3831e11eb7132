//! Conversation dispatcher.
//!
//! Every inbound update runs under its user's lock. Text is routed in this order: a pending
//! adjustment session (the text is feedback on a draft), `/metrics` for the admin, `/start` and
//! `/help`, a link to clip, and otherwise a new plan request for next week. Button presses carry a
//! [`PlanAction`]. Agent calls run under the request deadline; a failure becomes a short reply
//! and the full error goes to the log.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use llm_client::AgentMeta;
use storage::{MealPlan, PlanStatus};
use tracing::{error, info, instrument, warn};

use super::actions::PlanAction;
use super::format::{format_clipped, format_draft, format_final, format_shopping_list, HELP_TEXT};
use super::user_locks::UserLocks;
use crate::clipper::{ClipRequest, RecipeClipper};
use crate::core::{ActionButton, BotError, ChatTransport, ClipError, LifecycleError};
use crate::lifecycle::PlanLifecycle;
use crate::metrics::{exceeds_context_budget, MetricsRecorder};
use crate::planner::{next_monday, Household, Planner};
use crate::session::{ActiveAdjustment, AdjustContext, AdjustmentSessions};

const METRICS_REPORT_DAYS: u32 = 7;

/// A text message from a user.
#[derive(Debug, Clone)]
pub struct InboundText {
    pub user_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// A button press; `data` is the encoded [`PlanAction`].
#[derive(Debug, Clone)]
pub struct InboundAction {
    pub user_id: i64,
    pub chat_id: i64,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Empty allows everyone.
    pub allowed_user_ids: Vec<i64>,
    /// Receives `/metrics` and context alerts. For private chats the user id is the chat id.
    pub admin_user_id: Option<i64>,
    pub household: Household,
    pub request_timeout: Duration,
}

pub struct ConversationHandler {
    planner: Arc<Planner>,
    lifecycle: Arc<PlanLifecycle>,
    sessions: Arc<AdjustmentSessions>,
    metrics: MetricsRecorder,
    transport: Arc<dyn ChatTransport>,
    clipper: Option<Arc<RecipeClipper>>,
    locks: UserLocks,
    settings: BotSettings,
}

impl ConversationHandler {
    pub fn new(
        planner: Arc<Planner>,
        lifecycle: Arc<PlanLifecycle>,
        sessions: Arc<AdjustmentSessions>,
        metrics: MetricsRecorder,
        transport: Arc<dyn ChatTransport>,
        settings: BotSettings,
    ) -> Self {
        Self {
            planner,
            lifecycle,
            sessions,
            metrics,
            transport,
            clipper: None,
            locks: UserLocks::new(),
            settings,
        }
    }

    /// Enables saving recipes from links.
    pub fn with_clipper(mut self, clipper: Arc<RecipeClipper>) -> Self {
        self.clipper = Some(clipper);
        self
    }

    fn is_allowed(&self, user_id: i64) -> bool {
        self.settings.allowed_user_ids.is_empty() || self.settings.allowed_user_ids.contains(&user_id)
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_user_id == Some(user_id)
    }

    #[instrument(skip(self, msg), fields(user_id = msg.user_id, chat_id = msg.chat_id))]
    pub async fn handle_text(&self, msg: &InboundText) {
        if !self.is_allowed(msg.user_id) {
            warn!(user_id = msg.user_id, "Ignoring message from user outside the allow-list");
            return;
        }
        let _guard = self.locks.lock(msg.user_id).await;
        info!(text_len = msg.text.len(), "step: handling text");
        if let Err(e) = self.route_text(msg).await {
            self.report_failure(msg.chat_id, &e).await;
        }
    }

    #[instrument(skip(self, action), fields(user_id = action.user_id, chat_id = action.chat_id))]
    pub async fn handle_action(&self, action: &InboundAction) {
        if !self.is_allowed(action.user_id) {
            warn!(user_id = action.user_id, "Ignoring action from user outside the allow-list");
            return;
        }
        let _guard = self.locks.lock(action.user_id).await;
        info!(data = %action.data, "step: handling action");
        let result = match PlanAction::parse(&action.data) {
            Some(parsed) => self.route_action(action.user_id, action.chat_id, parsed).await,
            None => Err(BotError::InvalidAction(action.data.clone())),
        };
        if let Err(e) = result {
            self.report_failure(action.chat_id, &e).await;
        }
    }

    async fn route_text(&self, msg: &InboundText) -> Result<(), BotError> {
        match self.sessions.active_adjustment(msg.user_id).await {
            Ok(Some(active)) => return self.handle_feedback(msg, active).await,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Adjustment session unusable, treating text as a new request"),
        }

        let text = msg.text.trim();
        if text.starts_with('/') {
            let command = text.split_whitespace().next().unwrap_or_default();
            let command = command.split('@').next().unwrap_or(command);
            return match command {
                "/metrics" if self.is_admin(msg.user_id) => {
                    let report = self.metrics.daily_report(METRICS_REPORT_DAYS).await?;
                    Ok(self.transport.send_text(msg.chat_id, &report).await?)
                }
                _ => Ok(self.transport.send_text(msg.chat_id, HELP_TEXT).await?),
            };
        }
        if text.is_empty() {
            return Ok(self.transport.send_text(msg.chat_id, HELP_TEXT).await?);
        }
        if let Some(request) = ClipRequest::parse(text) {
            return self.clip(msg.chat_id, &request).await;
        }

        let week_start = next_monday(Utc::now().date_naive());
        self.plan_for_week(msg.user_id, msg.chat_id, text, week_start).await
    }

    async fn clip(&self, chat_id: i64, request: &ClipRequest) -> Result<(), BotError> {
        let Some(clipper) = &self.clipper else {
            return Ok(self
                .transport
                .send_text(chat_id, "Saving recipes from links is not set up.")
                .await?);
        };
        self.transport
            .send_text(chat_id, "Clipping the recipe, this can take a minute...")
            .await?;
        let clipped = self.within_deadline(clipper.clip(request)).await?;
        info!(post_id = %clipped.post.id, "step: recipe clipped");
        Ok(self.transport.send_text(chat_id, &format_clipped(&clipped)).await?)
    }

    async fn route_action(&self, user_id: i64, chat_id: i64, action: PlanAction) -> Result<(), BotError> {
        match action {
            PlanAction::Confirm { plan_id } => self.confirm(user_id, chat_id, plan_id).await,
            PlanAction::Adjust { plan_id } => self.start_adjustment(user_id, chat_id, plan_id).await,
            PlanAction::StartOver { plan_id } => {
                let plan = self.owned_plan(user_id, plan_id).await?;
                if matches!(plan.status, PlanStatus::Final | PlanStatus::Superseded) {
                    return Err(LifecycleError::InvalidTransition {
                        plan_id,
                        from: plan.status,
                        to: PlanStatus::Superseded,
                    }
                    .into());
                }
                self.close_session(user_id).await;
                self.generate_and_send(user_id, chat_id, &plan.request, plan.week_start, true)
                    .await
            }
            PlanAction::Redo { week_start, request } => {
                self.generate_and_send(user_id, chat_id, &request, week_start, true)
                    .await
            }
            PlanAction::NextWeek { week_start, request } => {
                self.plan_for_week(user_id, chat_id, &request, week_start).await
            }
        }
    }

    /// Offers Redo / Next week when `week_start` is taken, otherwise drafts a plan.
    async fn plan_for_week(&self, user_id: i64, chat_id: i64, request: &str, week_start: NaiveDate) -> Result<(), BotError> {
        if self.lifecycle.exists_for_week(user_id, week_start).await? {
            info!(%week_start, "step: week occupied, offering choices");
            let following = week_start + ChronoDuration::days(7);
            let actions = [
                ActionButton::new(
                    "Replace it",
                    PlanAction::Redo {
                        week_start,
                        request: request.to_string(),
                    }
                    .encode(),
                ),
                ActionButton::new(
                    format!("Plan week of {}", following),
                    PlanAction::NextWeek {
                        week_start: following,
                        request: request.to_string(),
                    }
                    .encode(),
                ),
            ];
            let text = format!("You already have a plan for the week of {}. What should I do?", week_start);
            return Ok(self.transport.send_with_actions(chat_id, &text, &actions).await?);
        }
        self.generate_and_send(user_id, chat_id, request, week_start, false)
            .await
    }

    async fn generate_and_send(
        &self,
        user_id: i64,
        chat_id: i64,
        request: &str,
        week_start: NaiveDate,
        replace: bool,
    ) -> Result<(), BotError> {
        self.transport
            .send_text(chat_id, &format!("Planning the week of {}, this can take a minute...", week_start))
            .await?;

        let household = &self.settings.household;
        let generated = self
            .within_deadline(self.planner.generate_plan(user_id, request, household, week_start))
            .await?;
        self.record(&generated.metas).await;

        let draft = if replace {
            self.lifecycle.replace_draft(generated.plan).await?
        } else {
            self.lifecycle.create_draft(generated.plan).await?
        };
        self.send_draft(chat_id, &draft).await
    }

    async fn send_draft(&self, chat_id: i64, draft: &MealPlan) -> Result<(), BotError> {
        let plan_id = draft.id.ok_or(LifecycleError::PlanNotFound(0))?;
        let actions = [
            ActionButton::new("Confirm", PlanAction::Confirm { plan_id }.encode()),
            ActionButton::new("Adjust", PlanAction::Adjust { plan_id }.encode()),
            ActionButton::new("Start Over", PlanAction::StartOver { plan_id }.encode()),
        ];
        Ok(self
            .transport
            .send_with_actions(chat_id, &format_draft(draft), &actions)
            .await?)
    }

    async fn confirm(&self, user_id: i64, chat_id: i64, plan_id: i64) -> Result<(), BotError> {
        let plan = self.owned_plan(user_id, plan_id).await?;
        if plan.status == PlanStatus::Adjusting {
            // Confirming instead of sending feedback ends the adjustment round.
            self.close_session(user_id).await;
            self.lifecycle.abandon_adjustment(plan_id).await?;
        }
        let (confirmed, meta) = self
            .within_deadline(self.lifecycle.confirm(plan_id, &self.settings.household))
            .await?;
        self.record(&[meta]).await;
        self.transport.send_text(chat_id, &format_final(&confirmed)).await?;
        Ok(self
            .transport
            .send_text(chat_id, &format_shopping_list(&confirmed))
            .await?)
    }

    async fn start_adjustment(&self, user_id: i64, chat_id: i64, plan_id: i64) -> Result<(), BotError> {
        let plan = self.owned_plan(user_id, plan_id).await?;
        if plan.status != PlanStatus::Adjusting {
            self.lifecycle.begin_adjustment(plan_id).await?;
        }
        let context = AdjustContext {
            plan_id,
            original_request: plan.request.clone(),
        };
        if let Err(e) = self.sessions.start(user_id, &context).await {
            if plan.status != PlanStatus::Adjusting {
                if let Err(revert) = self.lifecycle.abandon_adjustment(plan_id).await {
                    warn!(plan_id, error = %revert, "Failed to revert plan after session error");
                }
            }
            return Err(e.into());
        }
        Ok(self
            .transport
            .send_text(chat_id, "What would you like to change? Reply with your feedback.")
            .await?)
    }

    /// Revises the session's plan with `msg.text`; the session is closed whatever the outcome.
    async fn handle_feedback(&self, msg: &InboundText, active: ActiveAdjustment) -> Result<(), BotError> {
        info!(session_id = active.session_id, plan_id = active.context.plan_id, "step: feedback received");
        let outcome = self.revise(msg, &active.context).await;
        if let Err(e) = self.sessions.finish(active.session_id).await {
            warn!(session_id = active.session_id, error = %e, "Failed to close adjustment session");
        }
        outcome
    }

    async fn revise(&self, msg: &InboundText, context: &AdjustContext) -> Result<(), BotError> {
        let plan = self.owned_plan(msg.user_id, context.plan_id).await?;
        if plan.status != PlanStatus::Adjusting {
            return Err(LifecycleError::InvalidTransition {
                plan_id: context.plan_id,
                from: plan.status,
                to: PlanStatus::Draft,
            }
            .into());
        }

        let revised = self
            .within_deadline(self.planner.revise_plan(&plan, &msg.text, &self.settings.household))
            .await;
        let (revised, meta) = match revised {
            Ok(done) => done,
            Err(e) => {
                if let Err(revert) = self.lifecycle.abandon_adjustment(context.plan_id).await {
                    warn!(plan_id = context.plan_id, error = %revert, "Failed to return plan to draft");
                }
                return Err(e);
            }
        };
        self.record(&[meta]).await;

        let draft = self.lifecycle.replace_draft(revised).await?;
        self.send_draft(msg.chat_id, &draft).await
    }

    async fn owned_plan(&self, user_id: i64, plan_id: i64) -> Result<MealPlan, BotError> {
        match self.lifecycle.get_by_id(plan_id).await? {
            Some(plan) if plan.user_id == user_id => Ok(plan),
            Some(_) => {
                warn!(user_id, plan_id, "Action on a plan owned by another user");
                Err(LifecycleError::PlanNotFound(plan_id).into())
            }
            None => Err(LifecycleError::PlanNotFound(plan_id).into()),
        }
    }

    async fn close_session(&self, user_id: i64) {
        match self.sessions.active_adjustment(user_id).await {
            Ok(Some(active)) => {
                if let Err(e) = self.sessions.finish(active.session_id).await {
                    warn!(error = %e, "Failed to close adjustment session");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to look up adjustment session"),
        }
    }

    /// Runs an agent call under the request deadline. Dropping the future on timeout cancels
    /// the in-flight provider call and any retry sleep.
    async fn within_deadline<T, E, F>(&self, fut: F) -> Result<T, BotError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<BotError>,
    {
        let limit = self.settings.request_timeout;
        let result = match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(BotError::Timeout(limit)),
        };
        if let Err(ref e) = result {
            if let Some(meta) = failed_stage_meta(e) {
                self.metrics.record_meta(meta).await;
            }
        }
        result
    }

    /// Stores stage metas and alerts the admin about oversized prompts.
    async fn record(&self, metas: &[AgentMeta]) {
        self.metrics.record_all(metas).await;
        let Some(admin) = self.settings.admin_user_id else {
            return;
        };
        for meta in metas.iter().filter(|m| exceeds_context_budget(m)) {
            warn!(agent = %meta.agent_name, prompt_tokens = meta.usage.prompt_tokens, "Prompt exceeds context budget");
            let alert = format!(
                "Context alert: {} used {} prompt tokens (model {}).",
                meta.agent_name, meta.usage.prompt_tokens, meta.usage.model
            );
            if let Err(e) = self.transport.send_text(admin, &alert).await {
                warn!(error = %e, "Failed to send admin alert");
            }
        }
    }

    async fn report_failure(&self, chat_id: i64, err: &BotError) {
        error!(error = ?err, "Request failed: {}", err);
        if let Err(e) = self.transport.send_text(chat_id, &err.user_message()).await {
            warn!(error = %e, "Failed to send error reply");
        }
    }
}

fn failed_stage_meta(err: &BotError) -> Option<&AgentMeta> {
    match err {
        BotError::Agent(e)
        | BotError::Lifecycle(LifecycleError::Agent(e))
        | BotError::Clip(ClipError::Agent(e)) => e.meta(),
        _ => None,
    }
}
