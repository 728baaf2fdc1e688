//! In-memory page model the search engine mutates.
//!
//! Nodes live in an arena and are addressed by generational [`NodeId`]
//! handles. Removing a node frees its slot and bumps the slot generation, so
//! a stale handle resolves to nothing instead of aliasing whatever node is
//! allocated there next.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlignment {
    Start,
    Center,
    End,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
    selection: Option<NodeId>,
    scroll_target: Option<(NodeId, ScrollAlignment)>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut slots = Vec::new();
        let mut alloc = |tag: &str| {
            let id = NodeId {
                index: slots.len() as u32,
                generation: 0,
            };
            slots.push(Slot {
                generation: 0,
                node: Some(Node {
                    kind: NodeKind::Element(ElementData {
                        tag: tag.to_string(),
                        attributes: Vec::new(),
                    }),
                    parent: None,
                    children: Vec::new(),
                }),
            });
            id
        };
        let root = alloc("html");
        let head = alloc("head");
        let body = alloc("body");

        let mut document = Self {
            slots,
            free: Vec::new(),
            root,
            head,
            body,
            focused: None,
            selection: None,
            scroll_target: None,
        };
        document.append_child(root, head);
        document.append_child(root, body);
        document
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Whether `id` still refers to a live node.
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    /// Lowercase tag name, `None` for text nodes and stale handles.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(element.tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    /// Nearest element ancestor, the DOM's `parentElement`.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.tag_name(parent).map(|_| parent)
    }

    /// Whether the node is attached below the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Inclusive ancestor test, matching `Node.contains`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.exists(ancestor) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// First inclusive ancestor element satisfying `predicate`.
    pub fn closest<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Self, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.tag_name(node).is_some() && predicate(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Preorder walk of `root` and its descendants.
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let stack = if self.exists(root) { vec![root] } else { Vec::new() };
        Descendants {
            document: self,
            stack,
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.exists(parent) || !self.exists(child) || self.contains(child, parent) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Replaces `old` in its parent with `replacements`, in order.
    ///
    /// Returns `false` and leaves the tree untouched when `old` has no parent.
    /// `old` is detached but stays alive; call [`Document::remove`] to free it.
    pub fn replace_child(&mut self, old: NodeId, replacements: &[NodeId]) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        for &replacement in replacements {
            self.detach(replacement);
        }
        let Some(position) = self
            .children(parent)
            .iter()
            .position(|&child| child == old)
        else {
            return false;
        };

        for &replacement in replacements {
            if let Some(node) = self.node_mut(replacement) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.node_mut(parent) {
            node.children
                .splice(position..=position, replacements.iter().copied());
        }
        if let Some(node) = self.node_mut(old) {
            node.parent = None;
        }
        true
    }

    /// Unlinks a node from its parent without freeing it.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&child| child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Detaches and frees a node together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.exists(id) {
            return;
        }
        self.detach(id);

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let slot = &mut self.slots[current.index as usize];
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                pending.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);

            if self.focused == Some(current) {
                self.focused = None;
            }
            if self.selection == Some(current) {
                self.selection = None;
            }
            if self.scroll_target.is_some_and(|(target, _)| target == current) {
                self.scroll_target = None;
            }
        }
    }

    /// Concatenated text of every text node under `id`, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for node in self.descendants(id) {
            if let Some(value) = self.text(node) {
                text.push_str(value);
            }
        }
        text
    }

    /// Sets the text of a text node, or replaces an element's children with a
    /// single text node.
    pub fn set_text_content(&mut self, id: NodeId, value: &str) {
        if let Some(NodeKind::Text(text)) = self.node_mut(id).map(|node| &mut node.kind) {
            value.clone_into(text);
            return;
        }
        if self.tag_name(id).is_none() {
            return;
        }
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
        if !value.is_empty() {
            let text = self.create_text(value);
            self.append_child(id, text);
        }
    }

    /// Merges adjacent text nodes and drops empty ones throughout the subtree.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;

        for child in children {
            let Some(value) = self.text(child).map(str::to_owned) else {
                previous_text = None;
                self.normalize(child);
                continue;
            };

            if value.is_empty() {
                self.remove(child);
                continue;
            }

            match previous_text {
                Some(target) => {
                    if let Some(NodeKind::Text(text)) =
                        self.node_mut(target).map(|node| &mut node.kind)
                    {
                        text.push_str(&value);
                    }
                    self.remove(child);
                }
                None => previous_text = Some(child),
            }
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => element
                .attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(NodeKind::Element(element)) = self.node_mut(id).map(|node| &mut node.kind) else {
            return;
        };
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => element
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(NodeKind::Element(element)) = self.node_mut(id).map(|node| &mut node.kind) {
            element.attributes.retain(|(key, _)| key != name);
        }
    }

    /// Sets or clears a boolean attribute such as `hidden` or `disabled`.
    pub fn toggle_attribute(&mut self, id: NodeId, name: &str, present: bool) {
        if present {
            self.set_attribute(id, name, "");
        } else {
            self.remove_attribute(id, name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) || self.tag_name(id).is_none() {
            return;
        }
        let classes = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(id, "class", &classes);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attribute(id, "class") else {
            return;
        };
        let remaining = existing
            .split_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "class", &remaining);
    }

    /// First connected element carrying `id="<value>"`.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|&node| self.attribute(node, "id") == Some(value))
    }

    /// First element under `root` (inclusive) carrying attribute `name`.
    pub fn find_by_attribute(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .find(|&node| self.has_attribute(node, name))
    }

    pub fn focus(&mut self, id: NodeId) {
        if self.exists(id) {
            self.focused = Some(id);
        }
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Selects the whole value of an input element.
    pub fn select(&mut self, id: NodeId) {
        if self.exists(id) {
            self.selection = Some(id);
        }
    }

    pub fn selection(&self) -> Option<NodeId> {
        self.selection
    }

    pub fn scroll_into_view(&mut self, id: NodeId, alignment: ScrollAlignment) {
        if self.is_connected(id) {
            self.scroll_target = Some((id, alignment));
        }
    }

    /// Element most recently scrolled into the viewport.
    pub fn scroll_target(&self) -> Option<(NodeId, ScrollAlignment)> {
        self.scroll_target
    }

    /// Serializes `id` and its subtree as markup.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(&escape_markup(text)),
            Some(NodeKind::Element(element)) => {
                let _ = write!(out, "<{}", element.tag);
                for (name, value) in &element.attributes {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", escape_markup(value));
                    }
                }
                out.push('>');
                for &child in self.children(id) {
                    self.write_markup(child, out);
                }
                let _ = write!(out, "</{}>", element.tag);
            }
            None => {}
        }
    }
}

fn escape_markup(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.document.children(id).iter().rev().copied());
        Some(id)
    }
}
