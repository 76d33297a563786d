//! Cross-context messages and the delivery retry policy
//!
//! Contexts share a process here, so delivery is a routed call rather than a
//! socket, but the wire shapes and the bounded-retry contract are what the
//! background service programs against.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::retry;

/// Identifies one open page context at the host.
pub type PageId = usize;

/// Requests exchanged between the background service and page contexts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Show or hide the ToC sidebar in the receiving page.
    ToggleSidebar,
    /// Open (or focus) the settings surface.
    OpenSettings,
}

impl Request {
    /// Parse a raw message. Unknown actions are a caller concern: they are
    /// acked `{success: false}` rather than dropped.
    pub fn parse(raw: &Value) -> Result<Request, String> {
        serde_json::from_value(raw.clone()).map_err(|e| format!("unknown action: {e}"))
    }
}

/// Synchronous acknowledgement for a delivered request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Bounded retry with linearly growing backoff, decoupled from any specific
/// message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry::MAX_RETRIES,
            backoff_step: Duration::from_millis(retry::BACKOFF_STEP_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): attempt N waits N * step.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Whether `attempt` retries used up the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_retries
    }
}

/// A delivery waiting for its next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    pub target: PageId,
    pub request: Request,
    /// Which retry this is, 1-based.
    pub attempt: u32,
    pub due: Instant,
}
