#![forbid(unsafe_code)]

//! Node identifiers, node storage and the [`Node`] handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::document::{Arena, DocShared, Document};
use crate::error::DomError;
use crate::event::{self, Event, EventHandler, Listener, ListenerFlags, ListenerId};
use crate::parser::is_raw_text_element;
use crate::selector::Selector;
use crate::serialize;

/// Identifier of a node slot in a document arena.
///
/// The generation distinguishes a live node from an earlier node that
/// occupied the same slot and has since been freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
    Fragment,
}

#[derive(Debug)]
pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attributes: SmallVec<[(String, String); 4]>,
    pub(crate) listeners: Vec<Listener>,
}

impl ElementData {
    pub(crate) fn new(tag: String) -> Self {
        Self {
            tag,
            attributes: SmallVec::new(),
            listeners: Vec::new(),
        }
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
}

impl NodeKind {
    pub(crate) fn node_type(&self) -> NodeType {
        match self {
            Self::Document => NodeType::Document,
            Self::Element(_) => NodeType::Element,
            Self::Text(_) => NodeType::Text,
            Self::Comment(_) => NodeType::Comment,
            Self::Fragment => NodeType::Fragment,
        }
    }

    pub(crate) fn is_container(&self) -> bool {
        matches!(self, Self::Document | Self::Element(_) | Self::Fragment)
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// A handle to a node in a [`Document`].
///
/// Handles are cheap to clone. A node stays allocated as long as a handle
/// to it (or to any node in the same tree) exists, or while it is part of
/// the document tree.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) doc: Rc<DocShared>,
}

impl Node {
    pub(crate) fn from_id(doc: &Rc<DocShared>, id: NodeId) -> Self {
        doc.retain(id);
        Self {
            id,
            doc: Rc::clone(doc),
        }
    }

    /// The arena id of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The document owning this node.
    #[must_use]
    pub fn document(&self) -> Document {
        Document::from_shared(Rc::clone(&self.doc))
    }

    fn read<R>(&self, f: impl FnOnce(&Arena, &NodeData) -> R) -> Option<R> {
        let arena = self.doc.arena.borrow();
        let data = arena.get(self.id).ok()?;
        Some(f(&arena, data))
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Arena) -> Result<R, DomError>) -> Result<R, DomError> {
        let result = {
            let mut arena = self.doc.arena.borrow_mut();
            f(&mut arena)
        };
        self.doc.flush();
        result
    }

    fn handle(&self, id: NodeId) -> Node {
        Node::from_id(&self.doc, id)
    }

    fn check_same_document(&self, other: &Node) -> Result<(), DomError> {
        if Rc::ptr_eq(&self.doc, &other.doc) {
            Ok(())
        } else {
            Err(DomError::ForeignNode(other.id))
        }
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.read(|_, data| data.kind.node_type())
            .unwrap_or(NodeType::Fragment)
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Lowercase tag name for elements, `None` otherwise.
    #[must_use]
    pub fn tag_name(&self) -> Option<String> {
        self.read(|_, data| data.element().map(|el| el.tag.clone()))
            .flatten()
    }

    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.read(|_, data| data.parent)
            .flatten()
            .map(|id| self.handle(id))
    }

    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        let ids = self
            .read(|_, data| data.children.clone())
            .unwrap_or_default();
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.read(|_, data| data.children.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn first_child(&self) -> Option<Node> {
        self.read(|_, data| data.children.first().copied())
            .flatten()
            .map(|id| self.handle(id))
    }

    #[must_use]
    pub fn last_child(&self) -> Option<Node> {
        self.read(|_, data| data.children.last().copied())
            .flatten()
            .map(|id| self.handle(id))
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Node> {
        self.sibling(1)
    }

    #[must_use]
    pub fn previous_sibling(&self) -> Option<Node> {
        self.sibling(-1)
    }

    fn sibling(&self, offset: isize) -> Option<Node> {
        let id = self
            .read(|arena, data| {
                let parent = arena.get(data.parent?).ok()?;
                let pos = parent.children.iter().position(|c| *c == self.id)?;
                let target = pos.checked_add_signed(offset)?;
                parent.children.get(target).copied()
            })
            .flatten()?;
        Some(self.handle(id))
    }

    /// `true` if the node is part of the document tree.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.doc.arena.borrow().is_connected(self.id)
    }

    /// `true` if `other` is this node or one of its descendants.
    #[must_use]
    pub fn contains(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc)
            && self
                .doc
                .arena
                .borrow()
                .is_inclusive_ancestor(self.id, other.id)
    }

    /// Append `child`, moving it from its current parent if needed.
    /// Appending a fragment moves the fragment's children.
    pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
        self.insert_before(child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is
    /// `None`.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
        self.check_same_document(child)?;
        if let Some(reference) = reference {
            self.check_same_document(reference)?;
        }
        let reference = reference.map(|r| r.id);
        self.mutate(|arena| arena.insert(self.id, child.id, reference))
    }

    pub fn remove_child(&self, child: &Node) -> Result<(), DomError> {
        self.check_same_document(child)?;
        self.mutate(|arena| arena.remove_child(self.id, child.id))
    }

    /// Detach this node from its parent. Does nothing for detached nodes.
    pub fn remove(&self) -> Result<(), DomError> {
        self.mutate(|arena| match arena.get(self.id)?.parent {
            Some(parent) => arena.remove_child(parent, self.id),
            None => Ok(()),
        })
    }

    pub fn remove_all_children(&self) -> Result<(), DomError> {
        self.mutate(|arena| arena.remove_all_children(self.id))
    }

    /// Character data of a text or comment node.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.read(|_, data| match &data.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            _ => None,
        })
        .flatten()
    }

    /// Replace the text of this node. For text and comment nodes this sets
    /// the character data; for elements and fragments it replaces all
    /// children with a single text node.
    pub fn set_text(&self, text: &str) -> Result<(), DomError> {
        self.mutate(|arena| arena.set_text(self.id, text))
    }

    /// Concatenated text of this node and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let arena = self.doc.arena.borrow();
        let mut out = String::new();
        arena.collect_text(self.id, &mut out);
        out
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.read(|_, data| data.element()?.attribute(&name).map(str::to_string))
            .flatten()
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.read(|_, data| {
            data.element()
                .is_some_and(|el| el.attribute(&name).is_some())
        })
        .unwrap_or(false)
    }

    /// Attributes in insertion order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.read(|_, data| {
            data.element()
                .map(|el| el.attributes.to_vec())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Set an attribute. Names are lowercased; an existing attribute keeps
    /// its position.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        self.mutate(|arena| {
            let el = arena.element_mut(self.id)?;
            match el.attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => {
                    if existing.as_str() != value {
                        value.clone_into(existing);
                    }
                }
                None => el.attributes.push((name, value.to_string())),
            }
            Ok(())
        })
    }

    /// Remove an attribute, returning whether it was present.
    pub fn remove_attribute(&self, name: &str) -> Result<bool, DomError> {
        let name = name.to_ascii_lowercase();
        self.mutate(|arena| {
            let el = arena.element_mut(self.id)?;
            let before = el.attributes.len();
            el.attributes.retain(|(n, _)| *n != name);
            Ok(el.attributes.len() != before)
        })
    }

    /// Serialized children.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let arena = self.doc.arena.borrow();
        let mut out = String::new();
        serialize::write_children(&arena, self.id, &mut out);
        out
    }

    /// Serialized node including itself.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let arena = self.doc.arena.borrow();
        let mut out = String::new();
        serialize::write_node(&arena, self.id, &mut out, false);
        out
    }

    /// Replace all children with the parsed `markup`. Raw text elements
    /// take the markup as literal text.
    pub fn set_inner_html(&self, markup: &str) -> Result<(), DomError> {
        if self.tag_name().is_some_and(|tag| is_raw_text_element(&tag)) {
            return self.set_text(markup);
        }
        let fragment = self.document().parse_fragment(markup)?;
        self.remove_all_children()?;
        self.append_child(&fragment)
    }

    /// First descendant matching `selector`, in document order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        let found = selector.query_first(&self.doc.arena.borrow(), self.id);
        Ok(found.map(|id| self.handle(id)))
    }

    /// All descendants matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, DomError> {
        let selector = Selector::parse(selector)?;
        let found = selector.query_all(&self.doc.arena.borrow(), self.id);
        Ok(found.into_iter().map(|id| self.handle(id)).collect())
    }

    /// `true` if this element matches `selector`.
    pub fn matches(&self, selector: &str) -> Result<bool, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(selector.matches(&self.doc.arena.borrow(), self.id))
    }

    /// Register a listener for `event_type`.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        handler: impl Into<EventHandler>,
        flags: ListenerFlags,
    ) -> Result<ListenerId, DomError> {
        let handler = handler.into();
        self.mutate(|arena| {
            let id = arena.next_listener_id();
            arena.element_mut(self.id)?.listeners.push(Listener {
                id,
                event_type: event_type.to_string(),
                handler,
                flags,
            });
            Ok(id)
        })
    }

    /// Remove a listener, returning whether it was registered here.
    pub fn remove_event_listener(&self, listener: ListenerId) -> bool {
        let removed = {
            let mut arena = self.doc.arena.borrow_mut();
            match arena.element_mut(self.id) {
                Ok(el) => el
                    .listeners
                    .iter()
                    .position(|l| l.id == listener)
                    .map(|pos| el.listeners.remove(pos)),
                Err(_) => None,
            }
        };
        // The handler is dropped here, outside the arena borrow.
        removed.is_some()
    }

    /// Number of listeners registered for `event_type`.
    #[must_use]
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.read(|_, data| {
            data.element().map_or(0, |el| {
                el.listeners
                    .iter()
                    .filter(|l| l.event_type == event_type)
                    .count()
            })
        })
        .unwrap_or(0)
    }

    /// Dispatch `event` with this node as target. Returns `false` if a
    /// listener stopped propagation.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        event::dispatch(self, event)
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Node::from_id(&self.doc, self.id)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.doc.release(self.id);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.doc, &other.doc)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag_name() {
            Some(tag) => write!(f, "Node({} <{tag}>)", self.id),
            None => write!(f, "Node({} {:?})", self.id, self.node_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn node_id_display() {
        let id = NodeId {
            index: 3,
            generation: 1,
        };
        assert_eq!(id.to_string(), "#3v1");
    }

    #[test]
    fn siblings_and_parent() {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        ul.append_child(&a).unwrap();
        ul.append_child(&b).unwrap();

        assert_eq!(a.next_sibling(), Some(b.clone()));
        assert_eq!(b.previous_sibling(), Some(a.clone()));
        assert_eq!(a.previous_sibling(), None);
        assert_eq!(b.next_sibling(), None);
        assert_eq!(a.parent(), Some(ul.clone()));
        assert_eq!(ul.child_count(), 2);
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let doc = Document::new();
        let el = doc.create_element("div");
        el.set_attribute("b", "1").unwrap();
        el.set_attribute("A", "2").unwrap();
        el.set_attribute("b", "3").unwrap();
        assert_eq!(
            el.attributes(),
            vec![("b".to_string(), "3".to_string()), ("a".to_string(), "2".to_string())]
        );
        assert!(el.remove_attribute("b").unwrap());
        assert!(!el.remove_attribute("b").unwrap());
        assert_eq!(el.get_attribute("a").as_deref(), Some("2"));
    }

    #[test]
    fn attributes_on_text_fail() {
        let doc = Document::new();
        let text = doc.create_text("x");
        assert_eq!(
            text.set_attribute("a", "b"),
            Err(DomError::NotAnElement(text.id()))
        );
        assert!(!text.has_attribute("a"));
    }

    #[test]
    fn set_text_on_element_replaces_children() {
        let doc = Document::new();
        let p = doc.create_element("p");
        p.set_inner_html("<b>x</b><i>y</i>").unwrap();
        p.set_text("plain").unwrap();
        assert_eq!(p.inner_html(), "plain");
        assert_eq!(p.child_count(), 1);
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let doc = Document::new();
        let p = doc.create_element("p");
        p.set_inner_html("a<b>b<i>c</i></b><!--no-->d").unwrap();
        assert_eq!(p.text_content(), "abcd");
    }

    #[test]
    fn contains_is_inclusive() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        outer.append_child(&inner).unwrap();
        assert!(outer.contains(&outer));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn foreign_nodes_are_rejected() {
        let one = Document::new();
        let two = Document::new();
        let child = two.create_element("p");
        assert_eq!(
            one.body().append_child(&child),
            Err(DomError::ForeignNode(child.id()))
        );
    }

    #[test]
    fn remove_detached_node_is_noop() {
        let doc = Document::new();
        let el = doc.create_element("p");
        assert_eq!(el.remove(), Ok(()));
    }
}
