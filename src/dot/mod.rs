//! DOT text construction: attribute lists, deduplicating statement sets,
//! and the document writer that stitches them into a complete digraph.
//!
//! Everything that ends up in a `.dot` artifact flows through this module.
//! The statement sets give order-independent, deduplicated output; the
//! writer owns graph headers, subgraph nesting, and indentation so jobs
//! never concatenate raw braces themselves.

mod attrs;
mod graph_set;
mod writer;

pub use attrs::AttrList;
pub use graph_set::{EdgeSet, NodeSet};
pub use writer::DotWriter;

/// Quote an identifier for DOT output. Embedded quotes and backslashes are
/// escaped; newlines become the `\n` escape Graphviz renders as a line
/// break.
pub(crate) fn quote(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 2);
    out.push('"');
    for ch in id.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::quote;

    #[test]
    fn quote_wraps_plain_ids() {
        assert_eq!(quote("coal_plant"), "\"coal_plant\"");
    }

    #[test]
    fn quote_escapes_embedded_quotes_and_backslashes() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
    }
}
