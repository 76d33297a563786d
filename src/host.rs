//! In-process extension host
//!
//! Stand-in for the browser platform the contexts run on. Routes requests
//! between the background service and page contexts, broadcasts storage
//! change notifications to every live context after a write has succeeded,
//! and drives every due deadline (pending re-scans, delivery retries,
//! notice expiry) from `tick`. Contexts never share objects; everything
//! crosses this boundary as an event or an effect.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::background::{BackgroundEffect, BackgroundService, InstallReason};
use crate::clipboard::ClipboardSink;
use crate::constants::retry;
use crate::content::{ContentContext, Effect, PageEvent};
use crate::engine::Viewport;
use crate::messenger::{Ack, PageId, Request, RetryPolicy};
use crate::page::PageDocument;
use crate::settings::Settings;
use crate::settings::store::{SettingsStore, StorageChange};
use crate::view::SidebarView;

/// Transient, auto-dismissed message shown on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

struct PageSlot {
    ctx: ContentContext,
    /// Deliveries to a page whose content script has not finished loading
    /// fail and enter the retry queue.
    ready: bool,
    last_view: Option<SidebarView>,
    notices: Vec<Notice>,
}

pub struct ExtensionHost {
    store: SettingsStore,
    background: BackgroundService,
    pages: Vec<PageSlot>,
    clipboard: Box<dyn ClipboardSink>,
    settings_surface_open: bool,
}

impl ExtensionHost {
    pub fn new(store: SettingsStore, clipboard: Box<dyn ClipboardSink>) -> Self {
        Self {
            store,
            background: BackgroundService::new(RetryPolicy::default()),
            pages: Vec::new(),
            clipboard,
            settings_surface_open: false,
        }
    }

    /// Run the install hook. First install establishes defaults; nothing is
    /// clobbered on later runs.
    pub fn install(&mut self, reason: InstallReason, now: Instant) {
        let effects = self.background.on_installed(reason);
        self.run_background_effects(effects, now);
    }

    /// Register a page. A ready page gets its settings immediately; one
    /// still loading initializes in `mark_ready`.
    pub fn open_page(
        &mut self,
        hostname: &str,
        page: PageDocument,
        ready: bool,
        now: Instant,
    ) -> PageId {
        let id = self.pages.len();
        self.pages.push(PageSlot {
            ctx: ContentContext::new(hostname, page),
            ready,
            last_view: None,
            notices: Vec::new(),
        });
        info!(id, hostname, ready, "page context opened");
        if ready {
            let settings = self.store.read_settings();
            self.dispatch(id, PageEvent::Initialize(settings), now);
        }
        id
    }

    /// Content script finished loading: read settings into the context.
    pub fn mark_ready(&mut self, id: PageId, now: Instant) {
        if self.pages[id].ready {
            return;
        }
        self.pages[id].ready = true;
        let settings = self.store.read_settings();
        self.dispatch(id, PageEvent::Initialize(settings), now);
    }

    /// The extension action icon was clicked on `target`'s tab.
    pub fn click_icon(&mut self, target: PageId, now: Instant) {
        let effects = self.background.on_icon_clicked(target);
        self.run_background_effects(effects, now);
    }

    /// A page sent a raw message to the background service.
    pub fn page_request(&mut self, from: PageId, raw: &Value, now: Instant) -> Ack {
        let (ack, effects) = self.background.on_message(from, raw);
        self.run_background_effects(effects, now);
        ack
    }

    /// Partial settings write from the settings surface. The error is the
    /// caller's to surface ("save failed"), while successful changes fan out
    /// to every live context.
    pub fn write_settings(&mut self, patch: Map<String, Value>, now: Instant) -> Result<()> {
        let changes = self.store.write(patch)?;
        self.broadcast(changes, now);
        Ok(())
    }

    /// Apply a page edit and signal the mutation to that page's engine.
    pub fn mutate_page(
        &mut self,
        id: PageId,
        now: Instant,
        edit: impl FnOnce(&mut PageDocument),
    ) {
        edit(self.pages[id].ctx.page_mut());
        self.dispatch(id, PageEvent::DomMutated, now);
    }

    pub fn scroll_page(&mut self, id: PageId, viewport: Viewport, now: Instant) {
        self.dispatch(id, PageEvent::Scrolled(viewport), now);
    }

    pub fn search(&mut self, id: PageId, term: &str, now: Instant) {
        self.dispatch(id, PageEvent::SearchChanged(term.to_string()), now);
    }

    pub fn activate_entry(&mut self, id: PageId, identifier: &str, now: Instant) {
        self.dispatch(id, PageEvent::EntryActivated(identifier.to_string()), now);
    }

    pub fn resize_panel(&mut self, id: PageId, width: u32, now: Instant) {
        self.dispatch(id, PageEvent::PanelResized(width), now);
    }

    pub fn press_theme_toggle(&mut self, id: PageId, now: Instant) {
        self.dispatch(id, PageEvent::ThemeTogglePressed, now);
    }

    pub fn press_copy_markdown(&mut self, id: PageId, now: Instant) {
        self.dispatch(id, PageEvent::CopyMarkdownPressed, now);
    }

    pub fn press_close(&mut self, id: PageId, now: Instant) {
        self.dispatch(id, PageEvent::ClosePressed, now);
    }

    pub fn press_open_settings(&mut self, id: PageId, now: Instant) {
        self.dispatch(id, PageEvent::OpenSettingsPressed, now);
    }

    /// Same-context navigation to a new document (and possibly domain).
    pub fn soft_navigate(&mut self, id: PageId, hostname: &str, page: PageDocument) {
        info!(id, from = self.pages[id].ctx.hostname(), to = hostname, "page navigated");
        self.pages[id].ctx.soft_navigate(hostname, page);
        self.pages[id].last_view = None;
    }

    /// Fire everything whose deadline has passed: delivery retries, pending
    /// re-scans, notice expiry.
    pub fn tick(&mut self, now: Instant) {
        for delivery in self.background.due_deliveries(now) {
            self.attempt_delivery(delivery.target, delivery.request, delivery.attempt, now);
        }

        for id in 0..self.pages.len() {
            if self.pages[id]
                .ctx
                .pending_scan()
                .is_some_and(|due| due <= now)
            {
                self.dispatch(id, PageEvent::ScanTimerFired, now);
            }
        }

        for slot in &mut self.pages {
            slot.notices.retain(|notice| notice.expires_at > now);
        }
    }

    /// Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let scans = self.pages.iter().filter_map(|slot| slot.ctx.pending_scan());
        let notices = self
            .pages
            .iter()
            .flat_map(|slot| slot.notices.iter().map(|notice| notice.expires_at));
        scans
            .chain(notices)
            .chain(self.background.next_attempt_due())
            .min()
    }

    pub fn last_view(&self, id: PageId) -> Option<&SidebarView> {
        self.pages[id].last_view.as_ref()
    }

    pub fn notices(&self, id: PageId) -> &[Notice] {
        &self.pages[id].notices
    }

    pub fn settings_surface_open(&self) -> bool {
        self.settings_surface_open
    }

    pub fn settings(&self) -> Settings {
        self.store.read_settings()
    }

    fn dispatch(&mut self, id: PageId, event: PageEvent, now: Instant) {
        let effects = self.pages[id].ctx.handle_event(event, now);
        self.run_effects(id, effects, now);
    }

    fn run_effects(&mut self, id: PageId, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::Render(view) => {
                    self.pages[id].last_view = Some(view);
                }
                Effect::ScrollTo(request) => {
                    debug!(
                        offset = request.offset,
                        smooth = request.smooth,
                        "scrolling page to anchor"
                    );
                }
                Effect::CopyText(text) => match self.clipboard.set_text(&text) {
                    Ok(()) => debug!(bytes = text.len(), "ToC copied to clipboard"),
                    Err(e) => error!(error = %e, "Clipboard write failed"),
                },
                Effect::WriteSettings(patch) => match self.store.write(patch) {
                    Ok(changes) => self.broadcast(changes, now),
                    Err(e) => {
                        error!(error = %e, "Settings write failed");
                        self.push_notice(id, "Failed to save settings", now);
                    }
                },
                Effect::SendToBackground(request) => {
                    let (_ack, background_effects) = self.background.on_request(id, request);
                    self.run_background_effects(background_effects, now);
                }
                Effect::Ack(ack) => {
                    if !ack.success {
                        warn!(id, error = ?ack.error, "page request not acknowledged");
                    }
                }
            }
        }
    }

    fn run_background_effects(&mut self, effects: Vec<BackgroundEffect>, now: Instant) {
        for effect in effects {
            match effect {
                BackgroundEffect::Deliver {
                    target,
                    request,
                    attempt,
                } => self.attempt_delivery(target, request, attempt, now),
                BackgroundEffect::OpenSettingsSurface => {
                    self.settings_surface_open = true;
                    info!("settings surface opened");
                }
                BackgroundEffect::ShowNotice { target, text } => {
                    self.push_notice(target, &text, now);
                }
                BackgroundEffect::EstablishDefaults => {
                    match self.store.establish_defaults(&Settings::default()) {
                        Ok(changes) => self.broadcast(changes, now),
                        Err(e) => error!(error = %e, "Failed to establish default settings"),
                    }
                }
            }
        }
    }

    fn attempt_delivery(&mut self, target: PageId, request: Request, attempt: u32, now: Instant) {
        let ready = self
            .pages
            .get(target)
            .map(|slot| slot.ready)
            .unwrap_or(false);
        if ready {
            self.dispatch(target, PageEvent::Message(request), now);
        } else {
            debug!(target, attempt, "page context not ready for delivery");
            let effects = self.background.delivery_failed(target, request, attempt, now);
            self.run_background_effects(effects, now);
        }
    }

    /// Deliver per-key old/new changes to every live context, the writer's
    /// own included. Runs only after the store acknowledged the write.
    fn broadcast(&mut self, changes: Vec<StorageChange>, now: Instant) {
        if changes.is_empty() {
            return;
        }
        for id in 0..self.pages.len() {
            if self.pages[id].ready {
                self.dispatch(id, PageEvent::StorageChanged(changes.clone()), now);
            }
        }
    }

    fn push_notice(&mut self, target: PageId, text: &str, now: Instant) {
        if let Some(slot) = self.pages.get_mut(target) {
            info!(target, text, "showing notice");
            slot.notices.push(Notice {
                text: text.to_string(),
                expires_at: now + Duration::from_millis(retry::NOTICE_LIFETIME_MS),
            });
        } else {
            warn!(target, text, "notice for unknown page dropped");
        }
    }
}
