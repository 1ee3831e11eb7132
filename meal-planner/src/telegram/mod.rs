//! Telegram adapter: outbound [`TelegramTransport`] and the inbound update loop in [`runner`].

pub mod runner;
mod transport;

pub use runner::{build_bot, run_dispatcher};
pub use transport::TelegramTransport;
