use std::{fs, path::Path};

use anyhow::{Context, Result};
use findbar_search::{Document, HIGHLIGHT_ACTIVE_CLASS, HIGHLIGHT_CLASS, NodeId, SKIP_ATTRIBUTE};

/// Builds a page with one `<p>` per blank-line separated paragraph.
pub fn document_from_text(contents: &str) -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    let mut paragraph = Vec::new();

    for line in contents.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            paragraph.push(line.trim_end());
            continue;
        }
        if paragraph.is_empty() {
            continue;
        }
        let p = doc.create_element("p");
        let text = doc.create_text(paragraph.join("\n"));
        doc.append_child(p, text);
        doc.append_child(body, p);
        paragraph.clear();
    }

    doc
}

pub fn load_document(path: &Path) -> Result<Document> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read page from {}", path.display()))?;
    Ok(document_from_text(&contents))
}

/// Page text with highlights in `[...]`, the active one in `[[...]]`, one
/// block per paragraph. The overlay and other skipped subtrees are left out.
pub fn render_page(doc: &Document) -> String {
    let mut blocks = Vec::new();
    for &child in doc.children(doc.body()) {
        if doc.has_attribute(child, SKIP_ATTRIBUTE) {
            continue;
        }
        let mut out = String::new();
        render_node(doc, child, &mut out);
        blocks.push(out);
    }
    blocks.join("\n\n")
}

fn render_node(doc: &Document, node: NodeId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(text);
        return;
    }

    let (open, close) = if doc.has_class(node, HIGHLIGHT_ACTIVE_CLASS) {
        ("[[", "]]")
    } else if doc.has_class(node, HIGHLIGHT_CLASS) {
        ("[", "]")
    } else {
        ("", "")
    };
    out.push_str(open);
    for &child in doc.children(node) {
        render_node(doc, child, out);
    }
    out.push_str(close);
}
