//! Minimal streaming XML writer for reply documents.
//!
//! Reply documents are small, attribute-only trees (`document > section >
//! configuration > ...`), so the writer only supports elements and escaped
//! attributes. Empty elements are written as `<name attr="v" />`, matching the
//! media server's own fixtures.

use std::borrow::Cow;

#[derive(Debug, Default)]
pub struct XmlWriter {
    buf: String,
    open: Vec<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an element; it stays open until [`close`](Self::close)
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.start_tag(name, attrs);
        self.buf.push('>');
        self.open.push(name.to_string());
        self
    }

    /// Write a self-closing element
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.start_tag(name, attrs);
        self.buf.push_str(" />");
        self
    }

    /// Close the most recently opened element
    pub fn close(&mut self) -> &mut Self {
        if let Some(name) = self.open.pop() {
            self.buf.push_str("</");
            self.buf.push_str(&name);
            self.buf.push('>');
        }
        self
    }

    /// Elements still waiting for [`close`](Self::close)
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close anything left open and return the document
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.close();
        }
        self.buf
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        self.buf.push_str(name);
        for (attr, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(attr);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape_attr(value));
            self.buf.push('"');
        }
    }
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
