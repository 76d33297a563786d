//! Page-embedded content context
//!
//! One per open page. Owns the document, the sync engine, and the cached
//! settings copy inside it, and routes every page-side event through a
//! single handler that maps (event, current state) to the side effects the
//! host performs.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::warn;

use crate::engine::{ScrollRequest, SyncEngine, Viewport};
use crate::messenger::{Ack, Request};
use crate::page::PageDocument;
use crate::settings::Settings;
use crate::settings::store::StorageChange;
use crate::view::SidebarView;

/// Everything that can happen to a page context.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Settings read at context startup are in; the engine may leave
    /// `Uninitialized`.
    Initialize(Settings),
    /// A request delivered from the background service.
    Message(Request),
    /// Storage change notification fanned out after a successful write.
    StorageChanged(Vec<StorageChange>),
    /// The page's content changed under us.
    DomMutated,
    /// The pending re-scan deadline elapsed.
    ScanTimerFired,
    /// The page scrolled or the window resized.
    Scrolled(Viewport),
    /// The sidebar search box content changed.
    SearchChanged(String),
    /// A ToC entry was clicked.
    EntryActivated(String),
    /// The resize handle was dragged.
    PanelResized(u32),
    ThemeTogglePressed,
    CopyMarkdownPressed,
    ClosePressed,
    OpenSettingsPressed,
}

/// Side effects for the host to carry out after a handler ran.
#[derive(Debug, Clone)]
pub enum Effect {
    Render(SidebarView),
    ScrollTo(ScrollRequest),
    CopyText(String),
    /// Partial settings write; failure is surfaced back to this context.
    WriteSettings(Map<String, Value>),
    SendToBackground(Request),
    Ack(Ack),
}

pub struct ContentContext {
    hostname: String,
    page: PageDocument,
    engine: SyncEngine,
}

impl ContentContext {
    pub fn new(hostname: &str, page: PageDocument) -> Self {
        Self {
            hostname: hostname.to_string(),
            page,
            engine: SyncEngine::new(hostname),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn page_mut(&mut self) -> &mut PageDocument {
        &mut self.page
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn pending_scan(&self) -> Option<Instant> {
        self.engine.pending_scan()
    }

    /// Same-context navigation: swap in the new document and hostname,
    /// dropping the old page's view state. The cached settings survive.
    pub fn soft_navigate(&mut self, hostname: &str, page: PageDocument) {
        self.hostname = hostname.to_string();
        self.page = page;
        self.engine.reset_for_navigation(hostname);
    }

    pub fn handle_event(&mut self, event: PageEvent, now: Instant) -> Vec<Effect> {
        match event {
            PageEvent::Initialize(settings) => {
                self.engine.initialize(settings);
                Vec::new()
            }
            PageEvent::Message(Request::ToggleSidebar) => {
                let mut effects: Vec<Effect> = self
                    .engine
                    .toggle_sidebar(&mut self.page)
                    .map(Effect::Render)
                    .into_iter()
                    .collect();
                // A gated toggle is a documented no-op, still acknowledged
                effects.push(Effect::Ack(Ack::ok()));
                effects
            }
            PageEvent::Message(request) => {
                warn!(request = ?request, "request not handled by page contexts");
                vec![Effect::Ack(Ack::failed("unsupported action"))]
            }
            PageEvent::StorageChanged(changes) => self
                .engine
                .apply_storage_changes(&changes, &mut self.page)
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::DomMutated => {
                self.engine.note_mutation(now);
                Vec::new()
            }
            PageEvent::ScanTimerFired => self
                .engine
                .run_due_scan(&mut self.page, now)
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::Scrolled(viewport) => self
                .engine
                .set_viewport(viewport)
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::SearchChanged(term) => self
                .engine
                .set_filter(&term)
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::EntryActivated(identifier) => self
                .engine
                .activate_entry(&self.page, &identifier)
                .map(Effect::ScrollTo)
                .into_iter()
                .collect(),
            PageEvent::PanelResized(width) => self
                .engine
                .set_width(width)
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::ThemeTogglePressed => {
                let (view, patch) = self.engine.toggle_theme();
                let mut effects: Vec<Effect> =
                    view.map(Effect::Render).into_iter().collect();
                effects.push(Effect::WriteSettings(patch));
                effects
            }
            PageEvent::CopyMarkdownPressed => vec![Effect::CopyText(self.engine.markdown())],
            PageEvent::ClosePressed => self
                .engine
                .hide_sidebar()
                .map(Effect::Render)
                .into_iter()
                .collect(),
            PageEvent::OpenSettingsPressed => {
                vec![Effect::SendToBackground(Request::OpenSettings)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::keys;
    use serde_json::json;

    fn ready_context() -> ContentContext {
        let mut page = PageDocument::new();
        page.append(PageDocument::ROOT, "h1", "Overview");
        page.append(PageDocument::ROOT, "h2", "Details");
        let mut ctx = ContentContext::new("example.com", page);
        ctx.handle_event(PageEvent::Initialize(Settings::default()), Instant::now());
        ctx
    }

    fn render_of(effects: &[Effect]) -> Option<&SidebarView> {
        effects.iter().find_map(|effect| match effect {
            Effect::Render(view) => Some(view),
            _ => None,
        })
    }

    #[test]
    fn test_toggle_message_renders_and_acks() {
        let mut ctx = ready_context();
        let effects = ctx.handle_event(
            PageEvent::Message(Request::ToggleSidebar),
            Instant::now(),
        );

        assert!(render_of(&effects).is_some_and(|view| view.open));
        assert!(effects
            .iter()
            .any(|effect| matches!(effect, Effect::Ack(ack) if ack.success)));
    }

    #[test]
    fn test_unsupported_request_acks_failure() {
        let mut ctx = ready_context();
        let effects = ctx.handle_event(
            PageEvent::Message(Request::OpenSettings),
            Instant::now(),
        );

        assert!(matches!(
            effects.as_slice(),
            [Effect::Ack(ack)] if !ack.success
        ));
    }

    #[test]
    fn test_theme_press_writes_and_rerenders() {
        let mut ctx = ready_context();
        ctx.handle_event(PageEvent::Message(Request::ToggleSidebar), Instant::now());

        let effects = ctx.handle_event(PageEvent::ThemeTogglePressed, Instant::now());
        assert!(render_of(&effects).is_some());
        assert!(effects.iter().any(|effect| matches!(
            effect,
            Effect::WriteSettings(patch) if patch.get(keys::THEME) == Some(&json!("dark"))
        )));
    }

    #[test]
    fn test_copy_control_exports_markdown() {
        let mut ctx = ready_context();
        ctx.handle_event(PageEvent::Message(Request::ToggleSidebar), Instant::now());

        let effects = ctx.handle_event(PageEvent::CopyMarkdownPressed, Instant::now());
        assert!(matches!(
            effects.as_slice(),
            [Effect::CopyText(text)] if text.starts_with("# Table of Contents")
        ));
    }

    #[test]
    fn test_entry_activation_scrolls() {
        let mut ctx = ready_context();
        ctx.handle_event(PageEvent::Message(Request::ToggleSidebar), Instant::now());

        let effects = ctx.handle_event(
            PageEvent::EntryActivated("heading-0".to_string()),
            Instant::now(),
        );
        assert!(matches!(effects.as_slice(), [Effect::ScrollTo(_)]));
    }

    #[test]
    fn test_soft_navigation_resets_view() {
        let mut ctx = ready_context();
        ctx.handle_event(PageEvent::Message(Request::ToggleSidebar), Instant::now());
        assert!(ctx.engine().view_state().is_open);

        ctx.soft_navigate("other.org", PageDocument::new());
        assert_eq!(ctx.hostname(), "other.org");
        assert!(!ctx.engine().view_state().is_open);
    }
}
