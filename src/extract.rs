//! Heading extraction
//!
//! Scans a page in document order and normalizes the headings enabled by the
//! current level set into the snapshot consumed by the sync engine and the
//! renderer.

use tracing::debug;

use crate::constants::anchors;
use crate::page::PageDocument;
use crate::settings::HeadingLevel;

/// One heading, normalized for display and navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Anchor identifier, unique within the page; assigned during the scan
    /// when the element had none.
    pub identifier: String,
    /// Heading level, 1 through 6.
    pub level: u8,
    /// Trimmed text with internal whitespace runs collapsed.
    pub display_text: String,
    /// Position within this scan's document-order result, starting at 0.
    pub sequence_index: usize,
}

/// Point-in-time result of one scan. Replaced wholesale on every re-scan and
/// never edited in place, so a reader always sees a complete ToC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocSnapshot {
    entries: Vec<TocEntry>,
}

impl TocSnapshot {
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the snapshot as a markdown list with anchor links, two spaces
    /// of indent per level below the first.
    pub fn to_markdown(&self) -> String {
        if self.entries.is_empty() {
            return "# No headings found on this page".to_string();
        }

        let mut markdown = String::from("# Table of Contents\n\n");
        for entry in &self.entries {
            let indent = "  ".repeat(usize::from(entry.level - 1));
            markdown.push_str(&format!(
                "{indent}- [{}](#{})\n",
                entry.display_text, entry.identifier
            ));
        }
        markdown
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scan `page` for headings whose level is enabled in `levels`, preserving
/// document order.
///
/// Headings without an identifier get `heading-<sequence>` assigned directly
/// on the element so anchors stay valid across re-renders. Existing
/// identifiers are never overwritten (external deep links keep working).
/// That assignment is the only page mutation extraction performs.
pub fn extract(page: &mut PageDocument, levels: &[HeadingLevel]) -> TocSnapshot {
    let mut entries = Vec::new();

    for node in page.document_order() {
        let Some(level) = HeadingLevel::from_tag(page.tag(node)) else {
            continue;
        };
        if !levels.contains(&level) {
            continue;
        }

        let sequence_index = entries.len();
        let identifier = match page.id(node) {
            Some(id) => id.to_string(),
            None => {
                let generated = format!("{}{}", anchors::GENERATED_ID_PREFIX, sequence_index);
                page.set_id(node, &generated);
                generated
            }
        };

        entries.push(TocEntry {
            identifier,
            level: level.level(),
            display_text: normalize_text(&page.text_content(node)),
            sequence_index,
        });
    }

    debug!(count = entries.len(), "extracted headings");
    TocSnapshot { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_page() -> PageDocument {
        let mut page = PageDocument::new();
        page.append(PageDocument::ROOT, "h1", "  Introduction  ");
        page.append(PageDocument::ROOT, "p", "Lead paragraph");
        page.append(PageDocument::ROOT, "h2", "Setup\n\tand   install");
        let keyed = page.append(PageDocument::ROOT, "h2", "Usage");
        page.set_id(keyed, "usage");
        page.append(PageDocument::ROOT, "h3", "Advanced Intro");
        page
    }

    #[test]
    fn test_extract_preserves_document_order() {
        let mut page = sample_page();
        let snapshot = extract(&mut page, &HeadingLevel::all());

        let titles: Vec<&str> = snapshot
            .entries()
            .iter()
            .map(|e| e.display_text.as_str())
            .collect();
        assert_eq!(
            titles,
            vec!["Introduction", "Setup and install", "Usage", "Advanced Intro"]
        );
        for (index, entry) in snapshot.entries().iter().enumerate() {
            assert_eq!(entry.sequence_index, index);
        }
    }

    #[test]
    fn test_extract_identifiers_unique_and_stable() {
        let mut page = sample_page();
        let snapshot = extract(&mut page, &HeadingLevel::all());

        let mut identifiers: Vec<&str> = snapshot
            .entries()
            .iter()
            .map(|e| e.identifier.as_str())
            .collect();
        assert_eq!(identifiers, vec!["heading-0", "heading-1", "usage", "heading-3"]);
        identifiers.sort_unstable();
        identifiers.dedup();
        assert_eq!(identifiers.len(), snapshot.len());
    }

    #[test]
    fn test_extract_never_overwrites_existing_id() {
        let mut page = sample_page();
        extract(&mut page, &HeadingLevel::all());

        let usage = page.find_by_id("usage").unwrap();
        assert_eq!(page.id(usage), Some("usage"));
    }

    #[test]
    fn test_extract_is_idempotent_on_unchanged_page() {
        let mut page = sample_page();
        let first = extract(&mut page, &HeadingLevel::all());
        let second = extract(&mut page, &HeadingLevel::all());

        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_honors_level_set() {
        let mut page = sample_page();
        let snapshot = extract(&mut page, &[HeadingLevel::H2]);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.entries().iter().all(|e| e.level == 2));
    }

    #[test]
    fn test_extract_empty_level_set_yields_empty_snapshot() {
        let mut page = sample_page();
        let snapshot = extract(&mut page, &[]);

        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_extract_level_from_tag_suffix() {
        let mut page = PageDocument::new();
        page.append(PageDocument::ROOT, "h4", "Deep");
        let snapshot = extract(&mut page, &HeadingLevel::all());

        assert_eq!(snapshot.entries()[0].level, 4);
    }

    #[test]
    fn test_markdown_export_indents_by_level() {
        let mut page = PageDocument::new();
        page.append(PageDocument::ROOT, "h1", "Top");
        page.append(PageDocument::ROOT, "h3", "Deep");
        let snapshot = extract(&mut page, &HeadingLevel::all());

        assert_eq!(
            snapshot.to_markdown(),
            "# Table of Contents\n\n- [Top](#heading-0)\n    - [Deep](#heading-1)\n"
        );
    }

    #[test]
    fn test_markdown_export_empty_snapshot() {
        let snapshot = TocSnapshot::default();
        assert_eq!(snapshot.to_markdown(), "# No headings found on this page");
    }
}
