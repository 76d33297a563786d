//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Re-scan scheduling constants
pub mod debounce {
    /// Quiet window after the last mutation signal before a re-scan runs (ms)
    pub const QUIET_WINDOW_MS: u64 = 300;
}

/// Scroll-highlight tracking constants
pub mod viewport {
    /// Top of the highlight band, as a fraction of viewport height from the top
    pub const BAND_TOP_FRACTION: f32 = 0.10;

    /// Bottom of the highlight band, as a fraction of viewport height from the top
    pub const BAND_BOTTOM_FRACTION: f32 = 0.20;
}

/// Message delivery retry constants
pub mod retry {
    /// Maximum delivery retries before giving up on a context
    pub const MAX_RETRIES: u32 = 3;

    /// Linear backoff step between retries (ms); attempt N waits N * step
    pub const BACKOFF_STEP_MS: u64 = 200;

    /// How long a delivery-failure notice stays visible before auto-dismissal (ms)
    pub const NOTICE_LIFETIME_MS: u64 = 3000;
}

/// Sidebar geometry and display constants
pub mod sidebar {
    /// Minimum panel width when resizing (px)
    pub const MIN_WIDTH: u32 = 250;

    /// Maximum panel width when resizing (px)
    pub const MAX_WIDTH: u32 = 600;

    /// Initial panel width for a fresh page context (px)
    pub const DEFAULT_WIDTH: u32 = 320;

    /// Horizontal indent per heading level below the first (px)
    pub const INDENT_PER_LEVEL: u32 = 20;

    /// Panel title shown in the sidebar header
    pub const TITLE: &str = "Table of Contents";

    /// Message shown when a scan matched no headings
    pub const NO_HEADINGS_TEXT: &str = "No headings found on this page";

    /// Hint shown below the no-headings message
    pub const NO_HEADINGS_HINT: &str = "Try adjusting heading levels in settings";

    /// Notice shown when the page context never acknowledged a toggle
    pub const DELIVERY_FAILED_TEXT: &str = "Unable to create Table of Contents";
}

/// Settings clamping bounds
pub mod limits {
    /// Smallest accepted sidebar font size (px)
    pub const MIN_FONT_SIZE: u32 = 8;

    /// Largest accepted sidebar font size (px)
    pub const MAX_FONT_SIZE: u32 = 40;
}

/// Settings storage layout
pub mod config {
    /// Directory under the user config dir holding persisted state
    pub const APP_DIR: &str = "pagetoc";

    /// Settings file name inside the app directory
    pub const FILENAME: &str = "settings.json";
}

/// Identifier synthesis constants
pub mod anchors {
    /// Prefix for identifiers assigned to headings that lack one
    pub const GENERATED_ID_PREFIX: &str = "heading-";
}
