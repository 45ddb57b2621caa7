use super::{AttrList, EdgeSet, NodeSet, quote};

/// Builds a complete DOT document: header, graph-level attributes, default
/// statements, nested subgraphs, and statement-set blocks.
///
/// The writer tracks indentation depth so subgraph bodies nest with tabs and
/// statement sets land at the right column. Subgraphs are closure-scoped,
/// which keeps braces balanced by construction.
///
/// # Examples
///
/// ```
/// use fluxdot::dot::{AttrList, DotWriter, NodeSet};
///
/// let mut nodes = NodeSet::new();
/// nodes.insert_plain("coal");
///
/// let mut w = DotWriter::strict_digraph("model");
/// w.graph_attr("rankdir", "LR");
/// w.subgraph("techs", |w| {
///     w.node_defaults(&AttrList::new().with("shape", "box"));
///     w.nodes(&nodes);
/// });
/// let text = w.finish();
/// assert!(text.starts_with("strict digraph model {"));
/// assert!(text.ends_with("}\n"));
/// ```
#[derive(Debug)]
pub struct DotWriter {
    buf: String,
    depth: usize,
}

impl DotWriter {
    /// Start a `strict digraph` document. `strict` makes Graphviz drop any
    /// duplicate statements the deduplicating sets did not already catch.
    #[must_use]
    pub fn strict_digraph(name: &str) -> Self {
        Self::with_banner(name, "")
    }

    /// Start a document with a `//` comment block above the header. Each
    /// line of `banner` becomes one comment line; an empty banner writes
    /// nothing.
    #[must_use]
    pub fn with_banner(name: &str, banner: &str) -> Self {
        let mut writer = DotWriter {
            buf: String::new(),
            depth: 0,
        };
        if !banner.is_empty() {
            for line in banner.lines() {
                if line.is_empty() {
                    writer.buf.push_str("//\n");
                } else {
                    writer.buf.push_str("// ");
                    writer.buf.push_str(line);
                    writer.buf.push('\n');
                }
            }
            writer.buf.push('\n');
        }
        writer.buf.push_str("strict digraph ");
        writer.buf.push_str(&graph_id(name));
        writer.buf.push_str(" {\n");
        writer.depth = 1;
        writer
    }

    /// Write a `//` comment line.
    pub fn comment(&mut self, text: &str) {
        self.indent();
        self.buf.push_str("// ");
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Write a graph-level attribute statement, e.g. `rankdir = "LR" ;`.
    pub fn graph_attr(&mut self, key: &str, value: impl std::fmt::Display) {
        self.indent();
        let value = value.to_string();
        self.buf.push_str(key);
        self.buf.push_str(" = ");
        self.buf.push_str(&quote(&value));
        self.buf.push_str(" ;\n");
    }

    /// Write a `node [ ... ] ;` defaults statement.
    pub fn node_defaults(&mut self, attrs: &AttrList) {
        self.defaults("node", attrs);
    }

    /// Write an `edge [ ... ] ;` defaults statement.
    pub fn edge_defaults(&mut self, attrs: &AttrList) {
        self.defaults("edge", attrs);
    }

    /// Write a rendered [`NodeSet`] block at the current indentation.
    pub fn nodes(&mut self, set: &NodeSet) {
        self.indent();
        self.buf.push_str(&set.render(self.depth));
        self.buf.push('\n');
    }

    /// Write a rendered [`EdgeSet`] block at the current indentation.
    pub fn edges(&mut self, set: &EdgeSet) {
        self.indent();
        self.buf.push_str(&set.render(self.depth));
        self.buf.push('\n');
    }

    /// Write a blank line.
    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Open `subgraph <name> { ... }`, run `body` one level deeper, close it.
    pub fn subgraph(&mut self, name: &str, body: impl FnOnce(&mut Self)) {
        self.indent();
        self.buf.push_str("subgraph ");
        self.buf.push_str(name);
        self.buf.push_str(" {\n");
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self.indent();
        self.buf.push_str("}\n");
    }

    /// Open a `cluster_<name>` subgraph, which Graphviz draws with a border.
    pub fn cluster(&mut self, name: &str, body: impl FnOnce(&mut Self)) {
        self.subgraph(&format!("cluster_{name}"), body);
    }

    /// Close the root digraph and return the finished document.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.buf.push_str("}\n");
        self.buf
    }

    fn defaults(&mut self, target: &str, attrs: &AttrList) {
        self.indent();
        self.buf.push_str(target);
        self.buf.push_str(" [ ");
        self.buf.push_str(&attrs.to_string());
        self.buf.push_str(" ] ;\n");
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push('\t');
        }
    }
}

/// Graph names pass through bare when they are valid DOT identifiers and get
/// quoted otherwise.
fn graph_id(name: &str) -> String {
    let bare = !name.is_empty()
        && !name.chars().next().is_some_and(|c| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare { name.to_owned() } else { quote(name) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn braces_balance_with_nested_subgraphs() {
        let mut w = DotWriter::strict_digraph("model");
        w.subgraph("outer", |w| {
            w.cluster("vintages", |w| {
                w.graph_attr("label", "Vintages");
            });
        });
        let text = w.finish();
        assert_eq!(text.matches('{').count(), text.matches('}').count());
        assert!(text.contains("subgraph cluster_vintages {"));
    }

    #[test]
    fn graph_names_quote_only_when_needed() {
        assert_eq!(graph_id("simple_model"), "simple_model");
        assert_eq!(graph_id("results 2025"), "\"results 2025\"");
        assert_eq!(graph_id("2025"), "\"2025\"");
    }

    #[test]
    fn empty_sets_render_as_comments_in_context() {
        let mut w = DotWriter::strict_digraph("model");
        w.subgraph("techs", |w| {
            w.nodes(&NodeSet::new());
        });
        let text = w.finish();
        assert!(text.contains("\t\t// no nodes in this section\n"));
    }

    #[test]
    fn banner_lines_precede_the_header() {
        let w = DotWriter::with_banner("model", "first line\n\nthird line");
        let text = w.finish();
        assert!(text.starts_with("// first line\n//\n// third line\n\nstrict digraph model {"));
    }

    #[test]
    fn defaults_statements_render_inline() {
        let mut w = DotWriter::strict_digraph("model");
        w.node_defaults(&AttrList::new().with("style", "filled"));
        w.edge_defaults(&AttrList::new().with("arrowhead", "vee"));
        let text = w.finish();
        assert!(text.contains("\tnode [ style=\"filled\" ] ;\n"));
        assert!(text.contains("\tedge [ arrowhead=\"vee\" ] ;\n"));
    }
}
