use std::collections::BTreeSet;

use super::{AttrList, quote};

const EMPTY_NODES: &str = "// no nodes in this section";
const EMPTY_EDGES: &str = "// no edges in this section";

/// A deduplicating, order-independent collection of node statements.
///
/// Insertion order never matters: two builds that insert the same entries in
/// any order render byte-identical text. A node id may appear several times
/// with different attribute lists; each distinct (id, attrs) pair renders as
/// its own statement, and Graphviz resolves the duplicates.
///
/// Rendering aligns the `[ ... ]` attribute brackets into a single column.
/// The padding width is taken over the attributed entries only, so one long
/// bare node id cannot push every bracket to the right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    entries: BTreeSet<(String, Option<AttrList>)>,
}

impl NodeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node statement. Re-inserting an identical (id, attrs) pair is a
    /// no-op.
    pub fn insert(&mut self, id: impl Into<String>, attrs: Option<AttrList>) {
        let attrs = attrs.filter(|a| !a.is_empty());
        self.entries.insert((id.into(), attrs));
    }

    /// Add a bare node statement with no attribute list.
    pub fn insert_plain(&mut self, id: impl Into<String>) {
        self.insert(id, None);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Render the set as one text block. Lines after the first are prefixed
    /// with `indent` tabs; the caller supplies the first line's indentation.
    #[must_use]
    pub fn render(&self, indent: usize) -> String {
        if self.entries.is_empty() {
            return EMPTY_NODES.to_owned();
        }
        let width = self
            .entries
            .iter()
            .filter(|(_, attrs)| attrs.is_some())
            .map(|(id, _)| quote(id).len())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|(id, attrs)| match attrs {
                Some(attrs) => format!("{:<width$} [ {attrs} ] ;", quote(id)),
                None => format!("{} ;", quote(id)),
            })
            .collect();
        lines.sort();
        lines.join(&line_separator(indent))
    }
}

/// A deduplicating, order-independent collection of directed edge statements.
///
/// Alignment uses two independent widths: one over every quoted source id and
/// one over every quoted destination id. Attributed lines pad both columns so
/// the brackets align; unattributed lines pad only the source column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    entries: BTreeSet<(String, String, Option<AttrList>)>,
}

impl EdgeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge statement. Re-inserting an identical (src, dst, attrs)
    /// triple is a no-op; the same endpoint pair with different attributes
    /// renders as separate statements.
    pub fn insert(
        &mut self,
        src: impl Into<String>,
        dst: impl Into<String>,
        attrs: Option<AttrList>,
    ) {
        let attrs = attrs.filter(|a| !a.is_empty());
        self.entries.insert((src.into(), dst.into(), attrs));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn render(&self, indent: usize) -> String {
        if self.entries.is_empty() {
            return EMPTY_EDGES.to_owned();
        }
        let src_width = self
            .entries
            .iter()
            .map(|(src, _, _)| quote(src).len())
            .max()
            .unwrap_or(0);
        let dst_width = self
            .entries
            .iter()
            .map(|(_, dst, _)| quote(dst).len())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .map(|(src, dst, attrs)| match attrs {
                Some(attrs) => format!(
                    "{:<src_width$} -> {:<dst_width$} [ {attrs} ] ;",
                    quote(src),
                    quote(dst),
                ),
                None => format!("{:<src_width$} -> {} ;", quote(src), quote(dst)),
            })
            .collect();
        lines.sort();
        lines.join(&line_separator(indent))
    }
}

fn line_separator(indent: usize) -> String {
    let mut sep = String::with_capacity(1 + indent);
    sep.push('\n');
    for _ in 0..indent {
        sep.push('\t');
    }
    sep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sets_render_placeholder_comments() {
        assert_eq!(NodeSet::new().render(2), "// no nodes in this section");
        assert_eq!(EdgeSet::new().render(2), "// no edges in this section");
    }

    #[test]
    fn duplicate_nodes_collapse() {
        let mut nodes = NodeSet::new();
        nodes.insert_plain("coal");
        nodes.insert_plain("coal");
        nodes.insert("coal", Some(AttrList::new().with("color", "red")));
        nodes.insert("coal", Some(AttrList::new().with("color", "red")));
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn node_padding_ignores_unattributed_ids() {
        let mut nodes = NodeSet::new();
        nodes.insert_plain("a_very_long_bare_identifier");
        nodes.insert("b", Some(AttrList::new().with("color", "red")));
        let text = nodes.render(1);
        // Attributed subset is just "b", quoted width 3, so no extra padding.
        assert!(text.contains("\"b\" [ color=\"red\" ] ;"));
    }

    #[test]
    fn attributed_node_brackets_share_a_column() {
        let mut nodes = NodeSet::new();
        nodes.insert("n", Some(AttrList::new().with("color", "red")));
        nodes.insert("longer_node", Some(AttrList::new().with("color", "blue")));
        let text = nodes.render(0);
        let columns: Vec<usize> = text.lines().map(|l| l.find('[').unwrap()).collect();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], columns[1]);
    }

    #[test]
    fn node_lines_sort_by_rendered_text() {
        let mut a = NodeSet::new();
        a.insert_plain("zeta");
        a.insert_plain("alpha");
        let mut b = NodeSet::new();
        b.insert_plain("alpha");
        b.insert_plain("zeta");
        assert_eq!(a.render(1), b.render(1));
        assert!(a.render(1).starts_with("\"alpha\" ;"));
    }

    #[test]
    fn indent_applies_to_continuation_lines_only() {
        let mut nodes = NodeSet::new();
        nodes.insert_plain("a");
        nodes.insert_plain("b");
        assert_eq!(nodes.render(2), "\"a\" ;\n\t\t\"b\" ;");
    }

    #[test]
    fn unattributed_edges_pad_source_only() {
        let mut edges = EdgeSet::new();
        edges.insert("oil_refinery", "gasoline", None);
        edges.insert("well", "crude_oil", None);
        let text = edges.render(1);
        assert!(text.contains("\"oil_refinery\" -> \"gasoline\" ;"));
        // "well" pads to the 14-char source column, then " -> " follows.
        assert!(text.contains("\"well\"         -> \"crude_oil\" ;"));
    }

    #[test]
    fn attributed_edges_pad_both_columns() {
        let mut edges = EdgeSet::new();
        let label = |v: &str| Some(AttrList::new().with("label", v));
        edges.insert("coal", "power_plant", label("1.25"));
        edges.insert("natural_gas", "turbine", label("0.50"));
        let text = edges.render(1);
        let columns: Vec<usize> = text
            .lines()
            .map(|l| l.trim_start_matches('\t').find('[').unwrap())
            .collect();
        assert_eq!(columns[0], columns[1]);
    }

    #[test]
    fn same_endpoints_different_attrs_both_survive() {
        let mut edges = EdgeSet::new();
        edges.insert("v", "p", Some(AttrList::new().with("color", "red")));
        edges.insert("v", "p", Some(AttrList::new().with("color", "blue")));
        assert_eq!(edges.len(), 2);
    }
}
