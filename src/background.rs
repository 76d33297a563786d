//! Background service
//!
//! Routes the trigger surface (icon clicks and page messages) to the toggle
//! entry point, establishes first-run defaults at install time, and owns the
//! delivery retry queue: a toggle aimed at a context that is not ready yet
//! is retried on a linear backoff and ends in a user-visible notice when the
//! budget runs out, never in a hang or a crash.

use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::constants::sidebar;
use crate::messenger::{Ack, PageId, PendingDelivery, Request, RetryPolicy};

/// Why the install hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
}

/// Work the host performs on the service's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundEffect {
    /// Attempt delivery of `request` to a page context. `attempt` counts
    /// retries already spent (0 for the first try).
    Deliver {
        target: PageId,
        request: Request,
        attempt: u32,
    },
    /// Open or focus the settings surface.
    OpenSettingsSurface,
    /// Show a transient notice on a page after delivery gave up.
    ShowNotice { target: PageId, text: String },
    /// Write first-run defaults into the settings store.
    EstablishDefaults,
}

pub struct BackgroundService {
    policy: RetryPolicy,
    pending: Vec<PendingDelivery>,
}

impl BackgroundService {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
        }
    }

    /// Install hook. Defaults are established exactly once, on first
    /// install; updates and reloads must not touch user edits.
    pub fn on_installed(&mut self, reason: InstallReason) -> Vec<BackgroundEffect> {
        match reason {
            InstallReason::Install => {
                info!("first install, establishing defaults");
                vec![BackgroundEffect::EstablishDefaults]
            }
            InstallReason::Update => Vec::new(),
        }
    }

    /// The action icon and the page-sent `toggleSidebar` message funnel into
    /// the same delivery path.
    pub fn on_icon_clicked(&mut self, target: PageId) -> Vec<BackgroundEffect> {
        vec![BackgroundEffect::Deliver {
            target,
            request: Request::ToggleSidebar,
            attempt: 0,
        }]
    }

    /// Handle a raw message from a page. Unknown actions are acked
    /// `{success: false}` and logged, not dropped.
    pub fn on_message(&mut self, from: PageId, raw: &Value) -> (Ack, Vec<BackgroundEffect>) {
        match Request::parse(raw) {
            Ok(request) => self.on_request(from, request),
            Err(error) => {
                warn!(from, error = %error, "unknown action in page message");
                (Ack::failed(&error), Vec::new())
            }
        }
    }

    /// Handle an already-parsed request from a page.
    pub fn on_request(&mut self, from: PageId, request: Request) -> (Ack, Vec<BackgroundEffect>) {
        match request {
            Request::ToggleSidebar => (
                Ack::ok(),
                vec![BackgroundEffect::Deliver {
                    target: from,
                    request: Request::ToggleSidebar,
                    attempt: 0,
                }],
            ),
            Request::OpenSettings => (Ack::ok(), vec![BackgroundEffect::OpenSettingsSurface]),
        }
    }

    /// Record a failed delivery attempt. Schedules the next retry on the
    /// policy's backoff, or gives up with the fallback notice once the
    /// budget is spent.
    pub fn delivery_failed(
        &mut self,
        target: PageId,
        request: Request,
        attempt: u32,
        now: Instant,
    ) -> Vec<BackgroundEffect> {
        if self.policy.exhausted(attempt) {
            warn!(target, attempt, "delivery failed after all retries");
            return vec![BackgroundEffect::ShowNotice {
                target,
                text: sidebar::DELIVERY_FAILED_TEXT.to_string(),
            }];
        }

        let next = attempt + 1;
        let due = now + self.policy.backoff(next);
        self.pending.push(PendingDelivery {
            target,
            request,
            attempt: next,
            due,
        });
        Vec::new()
    }

    /// Drain the retries whose backoff has elapsed.
    pub fn due_deliveries(&mut self, now: Instant) -> Vec<PendingDelivery> {
        let mut due = Vec::new();
        self.pending.retain(|delivery| {
            if delivery.due <= now {
                due.push(delivery.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// Earliest scheduled retry, if any.
    pub fn next_attempt_due(&self) -> Option<Instant> {
        self.pending.iter().map(|delivery| delivery.due).min()
    }
}
