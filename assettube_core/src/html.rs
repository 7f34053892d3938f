//! `<script>` and `<link>` tag helpers for templates.

use crate::registry::Registry;

impl Registry {
    /// Render a `<script>` tag for a logical path.
    ///
    /// Extra attributes are appended in order with escaped values. When
    /// integrity support is enabled an `integrity` attribute is added last.
    pub fn script_tag(&self, logical: &str, attrs: &[(&str, &str)]) -> String {
        let mut tag = format!(
            "<script src=\"{}\" type=\"text/javascript\"",
            escape(&self.asset_path(logical))
        );
        self.push_attrs(&mut tag, logical, attrs);
        tag.push_str("></script>");
        tag
    }

    /// Render a stylesheet `<link>` tag for a logical path.
    pub fn link_tag(&self, logical: &str, attrs: &[(&str, &str)]) -> String {
        let mut tag = format!(
            "<link href=\"{}\" rel=\"stylesheet\" type=\"text/css\"",
            escape(&self.asset_path(logical))
        );
        self.push_attrs(&mut tag, logical, attrs);
        tag.push_str("></link>");
        tag
    }

    fn push_attrs(&self, tag: &mut String, logical: &str, attrs: &[(&str, &str)]) {
        for (name, value) in attrs {
            push_attr(tag, name, value);
        }
        if self.config.integrity {
            push_attr(tag, "integrity", &self.integrity(logical));
        }
    }
}

fn push_attr(tag: &mut String, name: &str, value: &str) {
    tag.push(' ');
    tag.push_str(name);
    tag.push_str("=\"");
    tag.push_str(&escape(value));
    tag.push('"');
}

/// Escape a value for use inside a double-quoted HTML attribute.
fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
