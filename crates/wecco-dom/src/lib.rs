#![forbid(unsafe_code)]

//! In-memory DOM for the wecco UI framework.
//!
//! `wecco-dom` is the host adapter the rest of the framework is written
//! against. It models the small part of the browser DOM that the template
//! engine and the runtimes need:
//!
//! - [`Document`] / [`Node`] - an arena of nodes with cheap, clonable handles
//! - [`parser`] - a lenient HTML fragment parser with positioned errors
//! - [`serialize`] - `innerHTML`/`outerHTML` style serialization
//! - [`event`] - listeners, `once` registration, bubbling dispatch
//! - [`selector`] - compound selectors with descendant/child combinators
//! - [`LifecycleHooks`] - custom element `created`/`connected`/`disconnected`
//!
//! Everything is single-threaded: handles are `!Send` and every borrow of
//! the arena is released before user callbacks (listeners, lifecycle hooks)
//! run, so callbacks may freely mutate the document.
//!
//! # Example
//!
//! ```
//! use wecco_dom::Document;
//!
//! let doc = Document::new();
//! let p = doc.create_element("p");
//! p.set_attribute("class", "hero").unwrap();
//! p.append_child(&doc.create_text("Hello")).unwrap();
//! doc.body().append_child(&p).unwrap();
//!
//! assert_eq!(doc.body().inner_html(), r#"<p class="hero">Hello</p>"#);
//! ```

pub mod document;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod node;
pub mod parser;
pub mod selector;
pub mod serialize;

pub use document::{Document, DocumentConfig, WeakDocument};
pub use error::DomError;
pub use event::{Event, EventHandler, ListenerFlags, ListenerId};
pub use lifecycle::LifecycleHooks;
pub use node::{Node, NodeId, NodeType};
pub use parser::{ParseError, ParsedNode, parse_fragment};
pub use selector::{ElementSelector, Selector};

/// Resolves the element described by `selector`.
///
/// Query selectors are matched against the descendants of `parent`, which
/// defaults to the document body. A concrete element is returned as is.
/// `Ok(None)` means nothing matched.
pub fn resolve(
    document: &Document,
    selector: &ElementSelector,
    parent: Option<&Node>,
) -> Result<Option<Node>, DomError> {
    document.resolve(selector, parent)
}

/// Removes all child nodes from `node`.
pub fn remove_all_children(node: &Node) -> Result<(), DomError> {
    node.remove_all_children()
}
