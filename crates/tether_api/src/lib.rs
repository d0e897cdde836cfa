//! Wire protocol and HTTP/SSE client for the tether relay.
//!
//! Invariant: one `StreamEvent` per well-formed frame; malformed frames are
//! skipped without surfacing an error to the stream consumer.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod retry;
pub mod sse;
pub mod types;
pub mod url;

pub use client::{CancellationSignal, RelayClient};
pub use config::{ApiConfig, TokenRefresher};
pub use dispatch::EventDispatcher;
pub use error::RelayApiError;
pub use events::{EventKind, StreamEvent};
pub use retry::RetryPolicy;
pub use sse::{RawFrame, SseFrameDecoder};
pub use types::{
    ActionDefinition, ActionOutcome, ActionSet, ActionSubmission, ChatRequest, SessionCursor,
    TuiFramePayload,
};
