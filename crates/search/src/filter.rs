use crate::dom::{Document, NodeId};

/// Attribute marking a subtree the search must never touch.
pub const SKIP_ATTRIBUTE: &str = "data-findbar-skip";

const NON_PROSE_TAGS: &[&str] = &["script", "style", "noscript"];

/// Decides which text nodes a search visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFilter {
    container: Option<NodeId>,
}

impl IndexFilter {
    /// `container` is the search UI itself, excluded so it never matches its
    /// own input or counter.
    pub fn new(container: Option<NodeId>) -> Self {
        Self { container }
    }

    pub fn should_index(&self, doc: &Document, node: NodeId) -> bool {
        let Some(parent) = doc.parent_element(node) else {
            return false;
        };
        !(self.inside_container(doc, parent)
            || inside_exempt(doc, parent)
            || non_prose_parent(doc, parent))
    }

    fn inside_container(&self, doc: &Document, element: NodeId) -> bool {
        self.container
            .is_some_and(|container| doc.contains(container, element))
    }
}

fn inside_exempt(doc: &Document, element: NodeId) -> bool {
    doc.closest(element, |doc, node| doc.has_attribute(node, SKIP_ATTRIBUTE))
        .is_some()
}

fn non_prose_parent(doc: &Document, element: NodeId) -> bool {
    doc.tag_name(element)
        .is_some_and(|tag| NON_PROSE_TAGS.contains(&tag))
}

/// Text nodes under `root` in document order that `accept` lets through.
///
/// The walk completes before any caller mutation, so nodes inserted while
/// processing the result are never revisited.
pub fn text_nodes<F>(doc: &Document, root: NodeId, mut accept: F) -> Vec<NodeId>
where
    F: FnMut(&Document, NodeId) -> bool,
{
    doc.descendants(root)
        .filter(|&node| doc.is_text(node) && accept(doc, node))
        .collect()
}
