//! Sidebar view model and renderer seam
//!
//! The engine produces `SidebarView`s; turning one into visible chrome is a
//! `Renderer` concern. The bundled text renderer backs the demo binary.

use std::io::{self, Write};

use crate::constants::sidebar;
use crate::settings::Theme;

/// One row of the rendered ToC.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarEntry {
    pub identifier: String,
    pub title: String,
    pub level: u8,
    /// Horizontal indent in px, derived from the level.
    pub indent: u32,
    /// 1-based position when numbering is enabled.
    pub number: Option<usize>,
    /// Whether this is the heading nearest the top of the viewport.
    pub active: bool,
    /// Cleared by the search filter; the entry stays in the view so
    /// clearing the filter restores it without a re-scan.
    pub visible: bool,
}

/// Everything a renderer needs to draw the sidebar. An empty entry list is a
/// defined display state (no headings matched), not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarView {
    pub open: bool,
    pub theme: Theme,
    pub font_size: u32,
    pub width: u32,
    pub filter: String,
    pub entries: Vec<SidebarEntry>,
}

impl SidebarView {
    pub fn has_headings(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn visible_entries(&self) -> impl Iterator<Item = &SidebarEntry> {
        self.entries.iter().filter(|entry| entry.visible)
    }
}

/// Turns view models into displayable output.
pub trait Renderer {
    fn render(&mut self, view: &SidebarView);
}

/// Plain-text sidebar for terminals. Used by the demo binary.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn render_inner(&mut self, view: &SidebarView) -> io::Result<()> {
        if !view.open {
            return writeln!(self.out, "[{} hidden]", sidebar::TITLE);
        }

        writeln!(
            self.out,
            "=== {} ({}, {}px font, {}px wide) ===",
            sidebar::TITLE,
            view.theme.as_str(),
            view.font_size,
            view.width
        )?;
        if !view.filter.is_empty() {
            writeln!(self.out, "[filter: {}]", view.filter)?;
        }

        if !view.has_headings() {
            writeln!(self.out, "{}", sidebar::NO_HEADINGS_TEXT)?;
            writeln!(self.out, "({})", sidebar::NO_HEADINGS_HINT)?;
            return Ok(());
        }

        for entry in view.visible_entries() {
            let pad = " ".repeat((entry.indent / sidebar::INDENT_PER_LEVEL) as usize * 2);
            let number = entry
                .number
                .map(|n| format!("{n}. "))
                .unwrap_or_default();
            let marker = if entry.active { " <--" } else { "" };
            writeln!(self.out, "{pad}{number}{}{marker}", entry.title)?;
        }
        Ok(())
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &SidebarView) {
        // io errors from the demo sink are ignored
        let _ = self.render_inner(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, visible: bool, active: bool) -> SidebarEntry {
        SidebarEntry {
            identifier: title.to_lowercase(),
            title: title.to_string(),
            level: 2,
            indent: sidebar::INDENT_PER_LEVEL,
            number: None,
            active,
            visible,
        }
    }

    fn view(entries: Vec<SidebarEntry>) -> SidebarView {
        SidebarView {
            open: true,
            theme: Theme::Light,
            font_size: 16,
            width: sidebar::DEFAULT_WIDTH,
            filter: String::new(),
            entries,
        }
    }

    fn rendered(view: &SidebarView) -> String {
        let mut buffer = Vec::new();
        TextRenderer::new(&mut buffer).render(view);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_no_headings_state_is_distinct() {
        let output = rendered(&view(Vec::new()));
        assert!(output.contains(sidebar::NO_HEADINGS_TEXT));
        assert!(output.contains(sidebar::NO_HEADINGS_HINT));
    }

    #[test]
    fn test_filtered_entries_are_skipped() {
        let output = rendered(&view(vec![
            entry("Introduction", true, false),
            entry("Setup", false, false),
        ]));
        assert!(output.contains("Introduction"));
        assert!(!output.contains("Setup"));
    }

    #[test]
    fn test_active_entry_is_marked() {
        let output = rendered(&view(vec![entry("Usage", true, true)]));
        assert!(output.contains("Usage <--"));
    }

    #[test]
    fn test_hidden_view_renders_placeholder() {
        let mut hidden = view(Vec::new());
        hidden.open = false;
        assert!(rendered(&hidden).contains("hidden"));
    }
}
