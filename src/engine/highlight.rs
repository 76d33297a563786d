//! Scroll-highlight tracking
//!
//! Marks the heading the reader is currently looking at: among headings
//! inside a band near the top of the viewport, the topmost wins. The result
//! is best-effort: the band can be empty, or it can cover several headings
//! at once when sections are short.

use crate::constants::viewport;

/// Visible scroll window over the page, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub top: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(top: f32, height: f32) -> Self {
        Self { top, height }
    }

    /// The vertical slice in which a heading counts as "being read".
    fn band(&self) -> (f32, f32) {
        (
            self.top + self.height * viewport::BAND_TOP_FRACTION,
            self.top + self.height * viewport::BAND_BOTTOM_FRACTION,
        )
    }
}

/// One tracked heading anchor. The set is rebuilt on every scan, one target
/// per current heading.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightTarget {
    pub identifier: String,
    pub offset_y: f32,
}

/// Identifier of the heading to mark active: the topmost target inside the
/// viewport band, or `None` when the band covers no heading.
pub fn active_heading(targets: &[HighlightTarget], viewport: Viewport) -> Option<String> {
    let (band_top, band_bottom) = viewport.band();
    targets
        .iter()
        .filter(|target| target.offset_y >= band_top && target.offset_y <= band_bottom)
        .min_by(|a, b| a.offset_y.total_cmp(&b.offset_y))
        .map(|target| target.identifier.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(identifier: &str, offset_y: f32) -> HighlightTarget {
        HighlightTarget {
            identifier: identifier.to_string(),
            offset_y,
        }
    }

    #[test]
    fn test_heading_inside_band_is_active() {
        // Band for this viewport: 100..200 from a 1000px-high window
        let targets = vec![target("intro", 150.0)];
        let active = active_heading(&targets, Viewport::new(0.0, 1000.0));
        assert_eq!(active.as_deref(), Some("intro"));
    }

    #[test]
    fn test_topmost_of_several_wins() {
        let targets = vec![target("lower", 190.0), target("upper", 120.0)];
        let active = active_heading(&targets, Viewport::new(0.0, 1000.0));
        assert_eq!(active.as_deref(), Some("upper"));
    }

    #[test]
    fn test_empty_band_clears_highlight() {
        let targets = vec![target("above", 50.0), target("below", 900.0)];
        assert_eq!(active_heading(&targets, Viewport::new(0.0, 1000.0)), None);
    }

    #[test]
    fn test_band_follows_scroll_position() {
        let targets = vec![target("chapter", 2150.0)];
        assert_eq!(active_heading(&targets, Viewport::new(0.0, 1000.0)), None);

        let active = active_heading(&targets, Viewport::new(2000.0, 1000.0));
        assert_eq!(active.as_deref(), Some("chapter"));
    }

    #[test]
    fn test_no_targets_means_no_highlight() {
        assert_eq!(active_heading(&[], Viewport::new(0.0, 1000.0)), None);
    }
}
