//! Interactive client session engine for remote agent sessions.
//!
//! Two entry points share one wire stack ([`tether_api`]):
//! - [`chat::run_chat`] consumes an assistant event stream, multiplexing
//!   overlapping progress signals into one ephemeral status line while
//!   literal output text passes through untouched.
//! - [`session::DashboardSession`] drives a remote terminal dashboard:
//!   request/response ANSI frame fetches, an independent live-push channel,
//!   and raw keyboard capture for navigation and action dispatch.
//!
//! Invariant: raw keyboard input mode is a single owned resource. It is
//! acquired once per session and released on every exit path (normal quit,
//! fatal error, interrupt), and release is idempotent.

pub mod chat;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod progress;
pub mod push;
pub mod session;
pub mod terminal;

pub use chat::run_chat;
pub use config::SessionConfig;
pub use error::EngineError;
pub use keys::{Key, KeyDecoder};
pub use progress::ProgressTracker;
pub use push::{spawn_push_listener, PushListener};
pub use session::{DashboardOps, DashboardSession, InstanceDashboard, SessionTrigger};
#[cfg(unix)]
pub use session::run_dashboard;
pub use terminal::SessionTerminal;
#[cfg(unix)]
pub use terminal::ProcessTerminal;

pub use tether_api::{
    ActionDefinition, ActionOutcome, ActionSet, ActionSubmission, ApiConfig, ChatRequest,
    RelayApiError, RelayClient, SessionCursor, TuiFramePayload,
};
