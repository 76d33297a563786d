//! The live ToC synchronization engine
//!
//! One engine instance per page context. It owns the current snapshot and
//! view state, decides when to recompute (toggle, mutation signals, settings
//! changes), debounces mutation bursts behind a single re-armable deadline,
//! and keeps the scroll highlight current. All state lives on the instance
//! rather than in module globals, so independent instances can coexist.

mod highlight;

pub use highlight::{HighlightTarget, Viewport, active_heading};

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::constants::{debounce, sidebar};
use crate::extract::{self, TocSnapshot};
use crate::page::PageDocument;
use crate::rules;
use crate::settings::store::StorageChange;
use crate::settings::{SettingKind, Settings, keys};
use crate::view::{SidebarEntry, SidebarView};

/// Lifecycle of the scan loop. A scan runs to completion once started;
/// mutation signals landing while one is pending re-arm the deadline instead
/// of queueing additional passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Idle,
    Scanning,
}

/// Per-page presentation state. Survives hide/show so re-opening restores
/// the previous search filter and panel width; reset on navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub is_open: bool,
    pub active_heading: Option<String>,
    pub filter: String,
    pub width: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            is_open: false,
            active_heading: None,
            filter: String::new(),
            width: sidebar::DEFAULT_WIDTH,
        }
    }
}

/// Scroll the page to an anchor, produced by activating a ToC entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollRequest {
    pub offset: f32,
    pub smooth: bool,
}

pub struct SyncEngine {
    hostname: String,
    settings: Settings,
    state: EngineState,
    view: ViewState,
    snapshot: TocSnapshot,
    targets: Vec<HighlightTarget>,
    viewport: Viewport,
    scan_due: Option<Instant>,
}

impl SyncEngine {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            settings: Settings::default(),
            state: EngineState::Uninitialized,
            view: ViewState::default(),
            snapshot: TocSnapshot::default(),
            targets: Vec::new(),
            viewport: Viewport::default(),
            scan_due: None,
        }
    }

    /// Bring the engine up with the settings read at context startup.
    pub fn initialize(&mut self, settings: Settings) {
        self.settings = settings;
        self.state = EngineState::Idle;
        info!(
            hostname = %self.hostname,
            enabled = self.is_enabled(),
            "sync engine ready"
        );
    }

    /// Domain gate for the current hostname, against the cached rules.
    pub fn is_enabled(&self) -> bool {
        rules::is_enabled(&self.hostname, &self.settings.domain_rules)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn snapshot(&self) -> &TocSnapshot {
        &self.snapshot
    }

    pub fn pending_scan(&self) -> Option<Instant> {
        self.scan_due
    }

    /// Show or hide the sidebar.
    ///
    /// The gate is checked on every toggle, not only at startup, since
    /// navigation can change the effective domain without a fresh context.
    /// On a gated or uninitialized context this is a documented no-op.
    /// Showing always refreshes the snapshot; hiding keeps the accumulated
    /// view state so re-opening is instant.
    pub fn toggle_sidebar(&mut self, page: &mut PageDocument) -> Option<SidebarView> {
        if self.state == EngineState::Uninitialized {
            warn!("toggle requested before initialization, ignoring");
            return None;
        }
        if !self.is_enabled() {
            info!(hostname = %self.hostname, "ToC disabled for this domain");
            return None;
        }

        if self.view.is_open {
            self.view.is_open = false;
            // A pending re-scan has nothing to refresh once hidden
            self.scan_due = None;
            debug!("sidebar hidden");
        } else {
            self.view.is_open = true;
            self.rescan(page);
        }
        Some(self.build_view())
    }

    /// Hide without toggling (close control on the sidebar itself).
    pub fn hide_sidebar(&mut self) -> Option<SidebarView> {
        if !self.view.is_open {
            return None;
        }
        self.view.is_open = false;
        self.scan_due = None;
        Some(self.build_view())
    }

    /// Record a content-mutation signal. Relevant only while the sidebar is
    /// open; each signal re-arms the single pending deadline, so a burst of
    /// mutations collapses into one scan after the quiet window.
    pub fn note_mutation(&mut self, now: Instant) {
        if !self.view.is_open {
            return;
        }
        self.scan_due = Some(now + Duration::from_millis(debounce::QUIET_WINDOW_MS));
        debug!("re-scan scheduled after quiet window");
    }

    /// Fire the pending scan if its deadline has passed.
    pub fn run_due_scan(&mut self, page: &mut PageDocument, now: Instant) -> Option<SidebarView> {
        let due = self.scan_due?;
        if now < due {
            return None;
        }
        self.scan_due = None;
        if !self.view.is_open {
            return None;
        }
        self.rescan(page);
        Some(self.build_view())
    }

    /// Fold a storage change notification into the cached settings and
    /// refresh whatever it affects. Sidebar-affecting keys trigger a
    /// re-scan while the sidebar is shown; rule changes only update the
    /// gate consulted on the next toggle.
    pub fn apply_storage_changes(
        &mut self,
        changes: &[StorageChange],
        page: &mut PageDocument,
    ) -> Option<SidebarView> {
        let mut sidebar_affected = false;
        for change in changes {
            match self.settings.apply_change(&change.key, &change.new) {
                SettingKind::Sidebar => sidebar_affected = true,
                SettingKind::Rules => debug!(hostname = %self.hostname, "domain rules updated"),
                SettingKind::Unknown => {}
            }
        }

        if sidebar_affected && self.view.is_open {
            self.rescan(page);
            return Some(self.build_view());
        }
        None
    }

    /// Update the search filter. A view transform only: entries are hidden,
    /// never removed, and clearing the term restores everything without a
    /// re-scan.
    pub fn set_filter(&mut self, term: &str) -> Option<SidebarView> {
        self.view.filter = term.to_string();
        self.view.is_open.then(|| self.build_view())
    }

    /// Track a scroll/resize of the page viewport and recompute the
    /// highlight. Returns a view only when the active heading changed while
    /// the sidebar is shown.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Option<SidebarView> {
        self.viewport = viewport;
        let active = highlight::active_heading(&self.targets, viewport);
        if active == self.view.active_heading {
            return None;
        }
        self.view.active_heading = active;
        self.view.is_open.then(|| self.build_view())
    }

    /// Resize the panel, clamped to the supported range.
    pub fn set_width(&mut self, width: u32) -> Option<SidebarView> {
        self.view.width = width.clamp(sidebar::MIN_WIDTH, sidebar::MAX_WIDTH);
        self.view.is_open.then(|| self.build_view())
    }

    /// Resolve a clicked entry to a scroll request. An anchor that vanished
    /// since the last scan is silently ignored.
    pub fn activate_entry(&self, page: &PageDocument, identifier: &str) -> Option<ScrollRequest> {
        match page.find_by_id(identifier) {
            Some(node) => Some(ScrollRequest {
                offset: page.offset_y(node),
                smooth: self.settings.smooth_scroll,
            }),
            None => {
                debug!(identifier = %identifier, "anchor no longer on the page, ignoring");
                None
            }
        }
    }

    /// Flip the theme locally and return the partial write that makes every
    /// other context converge.
    pub fn toggle_theme(&mut self) -> (Option<SidebarView>, Map<String, Value>) {
        self.settings.theme = self.settings.theme.toggled();
        let patch = Map::from_iter([(
            keys::THEME.to_string(),
            Value::String(self.settings.theme.as_str().to_string()),
        )]);
        (self.view.is_open.then(|| self.build_view()), patch)
    }

    /// Markdown rendition of the current snapshot.
    pub fn markdown(&self) -> String {
        self.snapshot.to_markdown()
    }

    /// Forget everything tied to the old page. Settings stay cached; the
    /// next toggle re-evaluates the gate against the new hostname.
    pub fn reset_for_navigation(&mut self, hostname: &str) {
        self.hostname = hostname.to_string();
        self.snapshot = TocSnapshot::default();
        self.targets = Vec::new();
        self.view = ViewState::default();
        self.scan_due = None;
        info!(hostname = %self.hostname, "view state reset for navigation");
    }

    fn rescan(&mut self, page: &mut PageDocument) {
        self.state = EngineState::Scanning;

        let snapshot = extract::extract(page, &self.settings.heading_levels);

        // One highlight target per current heading, re-established each scan
        self.targets = snapshot
            .entries()
            .iter()
            .filter_map(|entry| {
                page.find_by_id(&entry.identifier).map(|node| HighlightTarget {
                    identifier: entry.identifier.clone(),
                    offset_y: page.offset_y(node),
                })
            })
            .collect();

        // Snapshot replacement is atomic: readers see the old or the new
        // ToC, never a partially updated one
        self.snapshot = snapshot;
        self.view.active_heading = highlight::active_heading(&self.targets, self.viewport);

        self.state = EngineState::Idle;
        info!(headings = self.snapshot.len(), "scan complete");
    }

    fn build_view(&self) -> SidebarView {
        let filter = self.view.filter.to_lowercase();
        let entries = self
            .snapshot
            .entries()
            .iter()
            .map(|entry| SidebarEntry {
                identifier: entry.identifier.clone(),
                title: entry.display_text.clone(),
                level: entry.level,
                indent: u32::from(entry.level - 1) * sidebar::INDENT_PER_LEVEL,
                number: self.settings.show_numbers.then(|| entry.sequence_index + 1),
                active: self.view.active_heading.as_deref() == Some(entry.identifier.as_str()),
                visible: filter.is_empty() || entry.display_text.to_lowercase().contains(&filter),
            })
            .collect();

        SidebarView {
            open: self.view.is_open,
            theme: self.settings.theme,
            font_size: self.settings.font_size,
            width: self.view.width,
            filter: self.view.filter.clone(),
            entries,
        }
    }
}
