#![forbid(unsafe_code)]

//! Markup serialization.
//!
//! Attributes are written in insertion order with double quotes. Text
//! escapes `&`, `<`, `>` and non-breaking spaces; attribute values escape
//! `&`, `"` and non-breaking spaces. Void elements have no end tag and the
//! content of raw text elements is written verbatim.

use crate::document::Arena;
use crate::node::{NodeId, NodeKind};
use crate::parser::{is_raw_text_element, is_void_element};

/// Append `text` escaped for use as character data.
pub fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Append `value` escaped for use inside a double-quoted attribute.
pub fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

pub(crate) fn write_children(arena: &Arena, id: NodeId, out: &mut String) {
    let Ok(data) = arena.get(id) else {
        return;
    };
    let raw = data
        .element()
        .is_some_and(|el| is_raw_text_element(&el.tag));
    for child in &data.children {
        write_node(arena, *child, out, raw);
    }
}

pub(crate) fn write_node(arena: &Arena, id: NodeId, out: &mut String, raw: bool) {
    let Ok(data) = arena.get(id) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) if raw => out.push_str(text),
        NodeKind::Text(text) => escape_text(text, out),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Document | NodeKind::Fragment => write_children(arena, id, out),
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if is_void_element(&el.tag) {
                return;
            }
            write_children(arena, id, out);
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}
