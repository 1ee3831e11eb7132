//! Core types: errors, chat transport seam, logger.

pub mod error;
pub mod logger;
pub mod transport;

pub use error::{AgentError, BotError, ClipError, LifecycleError, SessionError, TransportError};
pub use logger::init_tracing;
pub use transport::{ActionButton, ChatTransport};
