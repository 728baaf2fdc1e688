use log::debug;

use crate::dom::{Document, NodeId, ScrollAlignment};
use crate::filter::{IndexFilter, text_nodes};
use crate::pattern::Pattern;

pub const HIGHLIGHT_CLASS: &str = "findbar-highlight";
pub const HIGHLIGHT_ACTIVE_CLASS: &str = "findbar-highlight--active";
pub const STYLE_MARKER_ATTRIBUTE: &str = "data-findbar-style";

const HIGHLIGHT_TAG: &str = "mark";

/// Wraps pattern matches in the page with `<mark>` elements and tracks them
/// in document order.
#[derive(Debug)]
pub struct Highlighter {
    filter: IndexFilter,
    highlights: Vec<NodeId>,
}

impl Highlighter {
    /// `container` is the search UI root, never searched.
    pub fn new(container: NodeId) -> Self {
        Self {
            filter: IndexFilter::new(Some(container)),
            highlights: Vec::new(),
        }
    }

    /// Replaces every previous highlight with the matches of `pattern` and
    /// returns how many were found.
    pub fn search(&mut self, doc: &mut Document, pattern: &Pattern) -> usize {
        self.clear(doc);
        if pattern.is_empty() {
            return 0;
        }

        let filter = self.filter;
        let candidates = text_nodes(doc, doc.body(), |doc, node| {
            filter.should_index(doc, node)
        });

        let count: usize = candidates
            .into_iter()
            .map(|node| self.highlight_text_node(doc, node, pattern))
            .sum();
        debug!("pattern /{}/ matched {} time(s)", pattern.source(), count);
        count
    }

    /// Unwraps every highlight back into plain text.
    pub fn clear(&mut self, doc: &mut Document) {
        for span in self.highlights.drain(..) {
            let Some(parent) = doc.parent(span) else {
                debug!("skipping highlight {span:?} that is no longer attached");
                continue;
            };
            let text = doc.text_content(span);
            let replacement = doc.create_text(text);
            if doc.replace_child(span, &[replacement]) {
                doc.remove(span);
                doc.normalize(parent);
            } else {
                doc.remove(replacement);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Highlight handles in document order.
    pub fn highlights(&self) -> &[NodeId] {
        &self.highlights
    }

    /// Marks the highlight at `index` active and scrolls it to the middle of
    /// the viewport. Every other highlight loses the active mark, including
    /// when `index` is out of range.
    pub fn set_active(&mut self, doc: &mut Document, index: usize) -> Option<NodeId> {
        for &span in &self.highlights {
            doc.remove_class(span, HIGHLIGHT_ACTIVE_CLASS);
        }

        let span = *self.highlights.get(index)?;
        if !doc.exists(span) {
            debug!("highlight {index} was removed from the page");
            return None;
        }
        doc.add_class(span, HIGHLIGHT_ACTIVE_CLASS);
        doc.scroll_into_view(span, ScrollAlignment::Center);
        Some(span)
    }

    fn highlight_text_node(&mut self, doc: &mut Document, node: NodeId, pattern: &Pattern) -> usize {
        let Some(text) = doc.text(node).map(str::to_owned) else {
            return 0;
        };
        if text.is_empty() || doc.parent(node).is_none() {
            return 0;
        }

        let mut pieces = Vec::new();
        let mut spans = Vec::new();
        let mut last_index = 0;

        for range in pattern.match_ranges(&text) {
            if range.start > last_index {
                pieces.push(doc.create_text(&text[last_index..range.start]));
            }
            let mark = doc.create_element(HIGHLIGHT_TAG);
            doc.add_class(mark, HIGHLIGHT_CLASS);
            let matched = doc.create_text(&text[range.clone()]);
            doc.append_child(mark, matched);
            pieces.push(mark);
            spans.push(mark);
            last_index = range.end;
        }

        if spans.is_empty() {
            return 0;
        }
        if last_index < text.len() {
            pieces.push(doc.create_text(&text[last_index..]));
        }

        if !doc.replace_child(node, &pieces) {
            for piece in pieces {
                doc.remove(piece);
            }
            return 0;
        }
        doc.remove(node);

        let count = spans.len();
        self.highlights.extend(spans);
        count
    }
}

/// Adds the highlight stylesheet to the document head once.
pub fn inject_highlight_styles(doc: &mut Document) {
    let head = doc.head();
    if doc.find_by_attribute(head, STYLE_MARKER_ATTRIBUTE).is_some() {
        return;
    }

    let style = doc.create_element("style");
    doc.set_attribute(style, STYLE_MARKER_ATTRIBUTE, "true");
    let css = format!(
        ".{HIGHLIGHT_CLASS} {{ background: rgba(234, 179, 8, 0.6); color: inherit; padding: 0 2px; border-radius: 2px; }}\n\
         .{HIGHLIGHT_CLASS}.{HIGHLIGHT_ACTIVE_CLASS} {{ outline: 2px solid #2563eb; background: rgba(37, 99, 235, 0.45); }}"
    );
    let text = doc.create_text(css);
    doc.append_child(style, text);
    doc.append_child(head, style);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SKIP_ATTRIBUTE;

    struct Page {
        doc: Document,
        overlay: NodeId,
    }

    impl Page {
        fn new(paragraphs: &[&str]) -> Self {
            let mut doc = Document::new();
            for text in paragraphs {
                let p = doc.create_element("p");
                let t = doc.create_text(*text);
                doc.append_child(p, t);
                doc.append_child(doc.body(), p);
            }
            let overlay = doc.create_element("section");
            doc.set_attribute(overlay, SKIP_ATTRIBUTE, "true");
            let counter = doc.create_text("No matches foo");
            doc.append_child(overlay, counter);
            doc.append_child(doc.body(), overlay);
            Self { doc, overlay }
        }

        fn body_text(&self) -> String {
            self.doc.text_content(self.doc.body())
        }

        fn marks(&self) -> usize {
            self.doc
                .descendants(self.doc.body())
                .filter(|&node| self.doc.has_class(node, HIGHLIGHT_CLASS))
                .count()
        }

        fn active_marks(&self) -> usize {
            self.doc
                .descendants(self.doc.body())
                .filter(|&node| self.doc.has_class(node, HIGHLIGHT_ACTIVE_CLASS))
                .count()
        }
    }

    fn pattern(source: &str) -> Pattern {
        Pattern::compile(source).expect("valid pattern")
    }

    #[test]
    fn counts_case_insensitive_matches() {
        let mut page = Page::new(&["Foo fighters find foo faster than FOO bar."]);
        let mut highlighter = Highlighter::new(page.overlay);

        assert_eq!(highlighter.search(&mut page.doc, &pattern("foo")), 3);
        assert_eq!(highlighter.size(), 3);
        assert_eq!(page.marks(), 3);
    }

    #[test]
    fn highlights_follow_document_order() {
        let mut page = Page::new(&["alpha one", "beta two", "gamma one"]);
        let mut highlighter = Highlighter::new(page.overlay);
        highlighter.search(&mut page.doc, &pattern("alpha|beta|gamma"));

        let texts: Vec<String> = highlighter
            .highlights()
            .iter()
            .map(|&span| page.doc.text_content(span))
            .collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn no_match_leaves_nodes_untouched() {
        let mut page = Page::new(&["nothing to see here"]);
        let before = page.doc.to_markup(page.doc.body());
        let original_text = page.doc.children(page.doc.body())[0];
        let original_text = page.doc.children(original_text)[0];
        let mut highlighter = Highlighter::new(page.overlay);

        assert_eq!(highlighter.search(&mut page.doc, &pattern("zebra")), 0);
        assert_eq!(page.doc.to_markup(page.doc.body()), before);
        assert!(page.doc.exists(original_text));
    }

    #[test]
    fn clear_restores_text_content() {
        let mut page = Page::new(&["one fish", "two fish", "red fish blue fish"]);
        let before = page.body_text();
        let mut highlighter = Highlighter::new(page.overlay);

        highlighter.search(&mut page.doc, &pattern("fish|e"));
        assert_ne!(page.marks(), 0);
        highlighter.clear(&mut page.doc);

        assert_eq!(page.body_text(), before);
        assert_eq!(page.marks(), 0);
        assert_eq!(highlighter.size(), 0);
        let first_p = page.doc.children(page.doc.body())[0];
        assert_eq!(page.doc.children(first_p).len(), 1);
    }

    #[test]
    fn repeated_search_does_not_accumulate() {
        let mut page = Page::new(&["abc abc abc"]);
        let mut highlighter = Highlighter::new(page.overlay);

        let first = highlighter.search(&mut page.doc, &pattern("abc"));
        let second = highlighter.search(&mut page.doc, &pattern("abc"));
        assert_eq!(first, 3);
        assert_eq!(second, 3);
        assert_eq!(page.marks(), 3);
        assert_eq!(page.body_text(), "abc abc abcNo matches foo");
    }

    #[test]
    fn overlay_text_is_never_matched() {
        let mut page = Page::new(&["plain"]);
        let mut highlighter = Highlighter::new(page.overlay);
        assert_eq!(highlighter.search(&mut page.doc, &pattern("foo")), 0);
    }

    #[test]
    fn scripts_and_styles_are_skipped() {
        let mut page = Page::new(&["needle"]);
        for tag in ["script", "style", "noscript"] {
            let element = page.doc.create_element(tag);
            let text = page.doc.create_text("needle");
            page.doc.append_child(element, text);
            page.doc.append_child(page.doc.body(), element);
        }
        let mut highlighter = Highlighter::new(page.overlay);
        assert_eq!(highlighter.search(&mut page.doc, &pattern("needle")), 1);
    }

    #[test]
    fn empty_pattern_clears_and_returns_zero() {
        let mut page = Page::new(&["abc"]);
        let mut highlighter = Highlighter::new(page.overlay);
        highlighter.search(&mut page.doc, &pattern("b"));
        assert_eq!(highlighter.search(&mut page.doc, &pattern("")), 0);
        assert_eq!(page.marks(), 0);
    }

    #[test]
    fn zero_length_matches_produce_no_highlights() {
        let mut page = Page::new(&["abc"]);
        let mut highlighter = Highlighter::new(page.overlay);
        assert_eq!(highlighter.search(&mut page.doc, &pattern("x*")), 0);
        assert_eq!(page.body_text(), "abcNo matches foo");
    }

    #[test]
    fn set_active_marks_exactly_one() {
        let mut page = Page::new(&["a a a"]);
        let mut highlighter = Highlighter::new(page.overlay);
        highlighter.search(&mut page.doc, &pattern("a"));

        let first = highlighter.set_active(&mut page.doc, 0);
        assert_eq!(first, Some(highlighter.highlights()[0]));
        let last = highlighter.set_active(&mut page.doc, 2);
        assert_eq!(last, Some(highlighter.highlights()[2]));
        assert_eq!(page.active_marks(), 1);
        assert_eq!(
            page.doc.scroll_target(),
            Some((highlighter.highlights()[2], ScrollAlignment::Center))
        );
    }

    #[test]
    fn set_active_out_of_range_clears_active() {
        let mut page = Page::new(&["a a"]);
        let mut highlighter = Highlighter::new(page.overlay);
        highlighter.search(&mut page.doc, &pattern("a"));
        highlighter.set_active(&mut page.doc, 1);

        assert_eq!(highlighter.set_active(&mut page.doc, 2), None);
        assert_eq!(highlighter.set_active(&mut page.doc, usize::MAX), None);
        assert_eq!(page.active_marks(), 0);
    }

    #[test]
    fn set_active_without_highlights_returns_none() {
        let mut page = Page::new(&["a"]);
        let mut highlighter = Highlighter::new(page.overlay);
        assert_eq!(highlighter.set_active(&mut page.doc, 0), None);
    }

    #[test]
    fn clear_tolerates_spans_removed_by_the_page() {
        let mut page = Page::new(&["keep x", "drop x"]);
        let mut highlighter = Highlighter::new(page.overlay);
        assert_eq!(highlighter.search(&mut page.doc, &pattern("x")), 2);

        let dropped = page.doc.children(page.doc.body())[1];
        page.doc.remove(dropped);
        assert_eq!(highlighter.set_active(&mut page.doc, 1), None);

        highlighter.clear(&mut page.doc);
        assert_eq!(page.body_text(), "keep xNo matches foo");
        assert_eq!(highlighter.size(), 0);
    }

    #[test]
    fn clear_without_highlights_is_a_no_op() {
        let mut page = Page::new(&["abc"]);
        let before = page.doc.to_markup(page.doc.body());
        let mut highlighter = Highlighter::new(page.overlay);
        highlighter.clear(&mut page.doc);
        assert_eq!(page.doc.to_markup(page.doc.body()), before);
    }

    #[test]
    fn styles_are_injected_once() {
        let mut doc = Document::new();
        inject_highlight_styles(&mut doc);
        inject_highlight_styles(&mut doc);
        assert_eq!(doc.children(doc.head()).len(), 1);
    }
}
