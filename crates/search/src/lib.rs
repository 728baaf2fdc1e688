//! Page text search and highlighting for Findbar.

mod cursor;
pub mod dom;
mod filter;
mod highlighter;
mod pattern;

pub use cursor::{Direction, MatchCursor};
pub use dom::{Document, NodeId, NodeKind, ScrollAlignment};
pub use filter::{IndexFilter, SKIP_ATTRIBUTE, text_nodes};
pub use highlighter::{
    HIGHLIGHT_ACTIVE_CLASS, HIGHLIGHT_CLASS, Highlighter, STYLE_MARKER_ATTRIBUTE,
    inject_highlight_styles,
};
pub use pattern::{MatchRanges, Pattern, PatternError};
