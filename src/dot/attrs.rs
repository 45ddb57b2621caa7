use std::fmt;

/// An ordered `key="value"` attribute list for a DOT statement.
///
/// Values are always quoted and escaped on insertion, so callers can pass
/// labels containing spaces, newlines (`\n` renders as a literal escape in
/// DOT, which Graphviz interprets as a line break), or user-provided names
/// without thinking about quoting rules.
///
/// # Examples
///
/// ```
/// use fluxdot::dot::AttrList;
///
/// let attrs = AttrList::new()
///     .with("color", "firebrick")
///     .with("label", "1.25");
/// assert_eq!(attrs.to_string(), r#"color="firebrick", label="1.25""#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrList {
    parts: Vec<(String, String)>,
}

impl AttrList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, consuming and returning the list for chaining.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.push(key, value);
        self
    }

    /// Append an attribute in place.
    pub fn push(&mut self, key: &str, value: impl fmt::Display) {
        self.parts.push((key.to_owned(), value.to_string()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for AttrList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.parts.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}=\"{}\"", escape(value))?;
        }
        Ok(())
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_insertion_order() {
        let attrs = AttrList::new()
            .with("shape", "box")
            .with("style", "filled")
            .with("color", "darkseagreen");
        assert_eq!(
            attrs.to_string(),
            r#"shape="box", style="filled", color="darkseagreen""#
        );
    }

    #[test]
    fn escapes_quotes_and_newlines_in_values() {
        let attrs = AttrList::new().with("label", "coal\nCapacity: 4.00");
        assert_eq!(attrs.to_string(), r#"label="coal\nCapacity: 4.00""#);

        let attrs = AttrList::new().with("label", "say \"hi\"");
        assert_eq!(attrs.to_string(), r#"label="say \"hi\"""#);
    }

    #[test]
    fn empty_list_renders_nothing() {
        let attrs = AttrList::new();
        assert!(attrs.is_empty());
        assert_eq!(attrs.to_string(), "");
    }
}
