#![forbid(unsafe_code)]

//! Custom element lifecycle callbacks.
//!
//! Hooks registered with [`Document::define_lifecycle`](crate::Document::define_lifecycle)
//! are invoked for every element carrying the registered tag. Calls are
//! queued while the document is being mutated and delivered in order once
//! the mutation has finished, so hooks always observe a consistent tree and
//! may mutate the document themselves.

use crate::node::{Node, NodeId};

/// Callbacks for one custom element tag.
///
/// All methods default to no-ops.
pub trait LifecycleHooks {
    /// An element with this tag was created.
    fn created(&self, _element: &Node) {}

    /// The element was inserted into the document tree.
    fn connected(&self, _element: &Node) {}

    /// The element was removed from the document tree.
    fn disconnected(&self, _element: &Node) {}

    /// The element was freed by the garbage collector. The id is no longer
    /// valid; implementations drop any state keyed by it.
    fn released(&self, _element: NodeId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleKind {
    Created,
    Connected,
    Disconnected,
    Released,
}

/// A queued hook invocation.
#[derive(Debug, Clone)]
pub(crate) struct LifecycleCall {
    pub(crate) kind: LifecycleKind,
    pub(crate) id: NodeId,
    pub(crate) tag: String,
}

/// Returns `true` if `name` is usable as a custom element tag.
///
/// Names start with an ASCII lowercase letter, contain a hyphen and
/// otherwise consist of lowercase letters, digits, `-`, `_` and `.`.
#[must_use]
pub fn is_valid_custom_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_lowercase()
        && name.contains('-')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_element_names() {
        assert!(is_valid_custom_element_name("my-button"));
        assert!(is_valid_custom_element_name("x-1.2_b"));
        assert!(!is_valid_custom_element_name("button"));
        assert!(!is_valid_custom_element_name("-button"));
        assert!(!is_valid_custom_element_name("My-Button"));
        assert!(!is_valid_custom_element_name(""));
    }
}
