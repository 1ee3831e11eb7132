//! Transport-agnostic conversation layer: routes inbound texts and button presses to the
//! planner, lifecycle and session managers, and replies through a [`crate::ChatTransport`].

mod actions;
mod dispatcher;
mod format;
mod user_locks;

pub use actions::{PlanAction, MAX_ACTION_BYTES};
pub use dispatcher::{BotSettings, ConversationHandler, InboundAction, InboundText};
pub use format::{format_clipped, format_draft, format_final, format_shopping_list, HELP_TEXT};
pub use user_locks::UserLocks;
