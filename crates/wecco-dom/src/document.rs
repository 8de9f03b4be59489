#![forbid(unsafe_code)]

//! The document arena.
//!
//! All nodes of a document live in one slot arena owned by [`Document`].
//! [`Node`] handles carry a [`NodeId`] and count themselves, which lets a
//! mark-and-sweep pass reclaim detached subtrees nobody can reach anymore:
//! the roots are the document tree and the whole tree of every node that
//! still has a live handle.
//!
//! Lifecycle hook invocations are queued while the arena is borrowed and
//! delivered afterwards by [`DocShared::flush`]. Collection runs at the end
//! of a flush once enough nodes have been detached, or on demand via
//! [`Document::collect_garbage`].

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::DomError;
use crate::event::ListenerId;
use crate::lifecycle::{LifecycleCall, LifecycleHooks, LifecycleKind, is_valid_custom_element_name};
use crate::node::{ElementData, Node, NodeData, NodeId, NodeKind};
use crate::parser::{ParsedNode, parse_fragment};
use crate::selector::{ElementSelector, Selector};

/// Document tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Number of detach operations after which a garbage collection pass
    /// runs automatically. `0` disables automatic collection.
    pub gc_threshold: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self { gc_threshold: 512 }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Node storage plus the bookkeeping that has to change together with it.
#[derive(Debug)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    body: NodeId,
    custom_tags: FxHashSet<String>,
    pending: VecDeque<LifecycleCall>,
    detached_since_gc: usize,
    next_listener: u64,
}

impl Arena {
    fn new() -> Self {
        let placeholder = NodeId {
            index: 0,
            generation: 0,
        };
        let mut arena = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: placeholder,
            body: placeholder,
            custom_tags: FxHashSet::default(),
            pending: VecDeque::new(),
            detached_since_gc: 0,
            next_listener: 0,
        };
        let root = arena.alloc(NodeKind::Document);
        let body = arena.alloc(NodeKind::Element(ElementData::new("body".to_string())));
        arena.root = root;
        arena.body = body;
        if let Some(data) = arena.slot_mut(root) {
            data.children.push(body);
        }
        if let Some(data) = arena.slot_mut(body) {
            data.parent = Some(root);
        }
        arena
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.data.as_mut()
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData::new(kind);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
                self.slots.push(Slot {
                    generation: 0,
                    data: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.data.as_ref())
            .ok_or(DomError::StaleNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.slot_mut(id).ok_or(DomError::StaleNode(id))
    }

    pub(crate) fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        self.get(id)?.element().ok_or(DomError::NotAnElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Element(el) => Ok(el),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    pub(crate) fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.data.is_some()).count()
    }

    fn top_ancestor(&self, mut id: NodeId) -> NodeId {
        while let Ok(data) = self.get(id) {
            match data.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    pub(crate) fn is_connected(&self, id: NodeId) -> bool {
        self.is_alive(id) && self.top_ancestor(id) == self.root
    }

    /// `true` if `ancestor` is `id` or one of its ancestors.
    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.get(node).ok().and_then(|data| data.parent);
        }
        false
    }

    /// `id` followed by its ancestors, innermost first.
    pub(crate) fn ancestors_inclusive(&self, id: NodeId) -> SmallVec<[NodeId; 8]> {
        let mut path = SmallVec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(node);
            current = self.get(node).ok().and_then(|data| data.parent);
        }
        path
    }

    /// Preorder traversal of the subtree rooted at `id`.
    pub(crate) fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Ok(data) = self.get(node) else {
                continue;
            };
            out.push(node);
            stack.extend(data.children.iter().rev().copied());
        }
        out
    }

    fn queue(&mut self, kind: LifecycleKind, id: NodeId, tag: &str) {
        if self.custom_tags.contains(tag) {
            self.pending.push_back(LifecycleCall {
                kind,
                id,
                tag: tag.to_string(),
            });
        }
    }

    fn queue_subtree(&mut self, id: NodeId, kind: LifecycleKind) {
        if self.custom_tags.is_empty() {
            return;
        }
        for node in self.preorder(id) {
            let tag = match self.element(node) {
                Ok(el) if self.custom_tags.contains(&el.tag) => el.tag.clone(),
                _ => continue,
            };
            self.pending.push_back(LifecycleCall {
                kind,
                id: node,
                tag,
            });
        }
    }

    pub(crate) fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let id = self.alloc(NodeKind::Element(ElementData::new(tag.clone())));
        self.queue(LifecycleKind::Created, id, &tag);
        id
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.get_mut(parent)?.children.retain(|c| *c != child);
        self.get_mut(child)?.parent = None;
        Ok(())
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        let children = &self.get(parent)?.children;
        let index = match before {
            Some(reference) => children
                .iter()
                .position(|c| *c == reference)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => children.len(),
        };
        self.get_mut(parent)?.children.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        if self.is_connected(parent) {
            self.queue_subtree(child, LifecycleKind::Connected);
        }
        Ok(())
    }

    /// Insert `child` into `parent` before `before` (or last). Moves the
    /// child out of its current parent; a fragment contributes its children.
    pub(crate) fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.get(parent)?.kind.is_container() {
            return Err(DomError::NotAContainer(parent));
        }
        let is_fragment = match self.get(child)?.kind {
            NodeKind::Document => return Err(DomError::HierarchyRequest { parent, child }),
            NodeKind::Fragment => true,
            _ => false,
        };
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(reference) = before {
            if self.get(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
            if reference == child {
                return Ok(());
            }
        }

        if is_fragment {
            let moved = std::mem::take(&mut self.get_mut(child)?.children);
            for id in &moved {
                self.get_mut(*id)?.parent = None;
            }
            for id in moved {
                self.attach(parent, id, before)?;
            }
            return Ok(());
        }

        if let Some(old_parent) = self.get(child)?.parent {
            let was_connected = self.is_connected(child);
            self.unlink(old_parent, child)?;
            if was_connected {
                self.queue_subtree(child, LifecycleKind::Disconnected);
            }
        }
        self.attach(parent, child, before)
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.get(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        let was_connected = self.is_connected(child);
        self.unlink(parent, child)?;
        if was_connected {
            self.queue_subtree(child, LifecycleKind::Disconnected);
        }
        self.detached_since_gc += 1;
        Ok(())
    }

    pub(crate) fn remove_all_children(&mut self, parent: NodeId) -> Result<(), DomError> {
        let connected = self.is_connected(parent);
        let children = std::mem::take(&mut self.get_mut(parent)?.children);
        self.detached_since_gc += children.len();
        for child in children {
            self.get_mut(child)?.parent = None;
            if connected {
                self.queue_subtree(child, LifecycleKind::Disconnected);
            }
        }
        Ok(())
    }

    pub(crate) fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                text.clone_into(data);
                return Ok(());
            }
            NodeKind::Document => return Err(DomError::NotAnElement(id)),
            NodeKind::Element(_) | NodeKind::Fragment => {}
        }
        self.remove_all_children(id)?;
        if !text.is_empty() {
            let node = self.alloc(NodeKind::Text(text.to_string()));
            self.attach(id, node, None)?;
        }
        Ok(())
    }

    pub(crate) fn collect_text(&self, id: NodeId, out: &mut String) {
        let Ok(data) = self.get(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            _ => {
                for child in &data.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Materialize parsed nodes as children of `parent`.
    pub(crate) fn build(&mut self, parent: NodeId, nodes: &[ParsedNode]) -> Result<(), DomError> {
        for node in nodes {
            let id = match node {
                ParsedNode::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    let id = self.create_element(tag);
                    self.element_mut(id)?
                        .attributes
                        .extend(attributes.iter().cloned());
                    self.build(id, children)?;
                    id
                }
                ParsedNode::Text(text) => self.alloc(NodeKind::Text(text.clone())),
                ParsedNode::Comment(text) => self.alloc(NodeKind::Comment(text.clone())),
            };
            self.attach(parent, id, None)?;
        }
        Ok(())
    }

    fn should_collect(&self, threshold: usize) -> bool {
        threshold > 0 && self.detached_since_gc >= threshold
    }

    /// Mark from the document root and from the top ancestor of every
    /// handled node, then free everything unmarked. Returns the freed data
    /// so it can be dropped outside the arena borrow.
    fn collect(&mut self, handled: &[NodeId]) -> Vec<NodeData> {
        let mut marked = vec![false; self.slots.len()];
        let mut roots = vec![self.root];
        roots.extend(
            handled
                .iter()
                .filter(|id| self.is_alive(**id))
                .map(|id| self.top_ancestor(*id)),
        );
        for root in roots {
            if marked[root.index as usize] {
                continue;
            }
            for id in self.preorder(root) {
                marked[id.index as usize] = true;
            }
        }

        let mut freed = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if marked[index] {
                continue;
            }
            let Some(data) = slot.data.take() else {
                continue;
            };
            let id = NodeId {
                index: u32::try_from(index).unwrap_or(u32::MAX),
                generation: slot.generation,
            };
            if let NodeKind::Element(el) = &data.kind
                && self.custom_tags.contains(&el.tag)
            {
                self.pending.push_back(LifecycleCall {
                    kind: LifecycleKind::Released,
                    id,
                    tag: el.tag.clone(),
                });
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            freed.push(data);
        }
        self.detached_since_gc = 0;
        freed
    }
}

/// State shared by a [`Document`] and all of its [`Node`] handles.
pub(crate) struct DocShared {
    pub(crate) arena: RefCell<Arena>,
    handles: RefCell<FxHashMap<NodeId, u32>>,
    lifecycle: RefCell<FxHashMap<String, Rc<dyn LifecycleHooks>>>,
    extensions: RefCell<FxHashMap<TypeId, Rc<dyn Any>>>,
    flushing: Cell<bool>,
    config: DocumentConfig,
}

/// Resets the flushing flag even if a hook panics.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl DocShared {
    pub(crate) fn retain(&self, id: NodeId) {
        if let Ok(mut handles) = self.handles.try_borrow_mut() {
            *handles.entry(id).or_insert(0) += 1;
        }
    }

    pub(crate) fn release(&self, id: NodeId) {
        if let Ok(mut handles) = self.handles.try_borrow_mut()
            && let Some(count) = handles.get_mut(&id)
        {
            *count -= 1;
            if *count == 0 {
                handles.remove(&id);
            }
        }
    }

    pub(crate) fn node(self: &Rc<Self>, id: NodeId) -> Option<Node> {
        if self.arena.borrow().is_alive(id) {
            Some(Node::from_id(self, id))
        } else {
            None
        }
    }

    /// Deliver queued lifecycle calls and collect garbage when due.
    /// Nested calls return immediately; the outermost flush drains the
    /// queue in order.
    pub(crate) fn flush(self: &Rc<Self>) {
        if self.flushing.replace(true) {
            return;
        }
        let _guard = FlushGuard(&self.flushing);
        loop {
            let call = self.arena.borrow_mut().pending.pop_front();
            match call {
                Some(call) => self.deliver(call),
                None => {
                    let due = self.arena.borrow().should_collect(self.config.gc_threshold);
                    if !due {
                        break;
                    }
                    self.collect();
                }
            }
        }
    }

    fn deliver(self: &Rc<Self>, call: LifecycleCall) {
        let hooks = self.lifecycle.borrow().get(&call.tag).cloned();
        let Some(hooks) = hooks else {
            return;
        };
        trace!(tag = %call.tag, id = %call.id, kind = ?call.kind, "lifecycle callback");
        match call.kind {
            LifecycleKind::Released => hooks.released(call.id),
            kind => {
                let Some(node) = self.node(call.id) else {
                    return;
                };
                match kind {
                    LifecycleKind::Created => hooks.created(&node),
                    LifecycleKind::Connected => hooks.connected(&node),
                    _ => hooks.disconnected(&node),
                }
            }
        }
    }

    fn collect(&self) -> usize {
        let handled: Vec<NodeId> = self.handles.borrow().keys().copied().collect();
        let freed = self.arena.borrow_mut().collect(&handled);
        let count = freed.len();
        trace!(freed = count, "garbage collection");
        // Listener closures may own node handles; drop them with no borrow held.
        drop(freed);
        count
    }
}

/// A document: the node arena plus per-document registries.
///
/// `Document` is a cheap handle; clones refer to the same document.
#[derive(Clone)]
pub struct Document {
    pub(crate) shared: Rc<DocShared>,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DocumentConfig) -> Self {
        Self {
            shared: Rc::new(DocShared {
                arena: RefCell::new(Arena::new()),
                handles: RefCell::new(FxHashMap::default()),
                lifecycle: RefCell::new(FxHashMap::default()),
                extensions: RefCell::new(FxHashMap::default()),
                flushing: Cell::new(false),
                config,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<DocShared>) -> Self {
        Self { shared }
    }

    #[must_use]
    pub fn config(&self) -> DocumentConfig {
        self.shared.config
    }

    /// The document node.
    #[must_use]
    pub fn root(&self) -> Node {
        let id = self.shared.arena.borrow().root;
        Node::from_id(&self.shared, id)
    }

    /// The `<body>` element.
    #[must_use]
    pub fn body(&self) -> Node {
        let id = self.shared.arena.borrow().body;
        Node::from_id(&self.shared, id)
    }

    /// Handle for `id` if it is still allocated.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.shared.node(id)
    }

    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.shared.arena.borrow().is_alive(id)
    }

    fn created(&self, id: NodeId) -> Node {
        let node = Node::from_id(&self.shared, id);
        self.shared.flush();
        node
    }

    pub fn create_element(&self, tag: &str) -> Node {
        let id = self.shared.arena.borrow_mut().create_element(tag);
        self.created(id)
    }

    pub fn create_text(&self, text: &str) -> Node {
        let id = self
            .shared
            .arena
            .borrow_mut()
            .alloc(NodeKind::Text(text.to_string()));
        self.created(id)
    }

    pub fn create_comment(&self, text: &str) -> Node {
        let id = self
            .shared
            .arena
            .borrow_mut()
            .alloc(NodeKind::Comment(text.to_string()));
        self.created(id)
    }

    pub fn create_fragment(&self) -> Node {
        let id = self.shared.arena.borrow_mut().alloc(NodeKind::Fragment);
        self.created(id)
    }

    /// Parse `markup` into a new fragment.
    pub fn parse_fragment(&self, markup: &str) -> Result<Node, DomError> {
        let parsed = parse_fragment(markup)?;
        self.build_fragment(&parsed)
    }

    /// Materialize already parsed nodes into a new fragment.
    pub fn build_fragment(&self, nodes: &[ParsedNode]) -> Result<Node, DomError> {
        let (id, result) = {
            let mut arena = self.shared.arena.borrow_mut();
            let id = arena.alloc(NodeKind::Fragment);
            (id, arena.build(id, nodes))
        };
        let fragment = self.created(id);
        result.map(|()| fragment)
    }

    /// Register lifecycle hooks for a custom element tag.
    ///
    /// Only elements created afterwards receive `created`; elements that
    /// already exist are not upgraded.
    pub fn define_lifecycle(
        &self,
        tag: &str,
        hooks: Rc<dyn LifecycleHooks>,
    ) -> Result<(), DomError> {
        if !is_valid_custom_element_name(tag) {
            return Err(DomError::InvalidCustomElementName(tag.to_string()));
        }
        let mut registry = self.shared.lifecycle.borrow_mut();
        if registry.contains_key(tag) {
            return Err(DomError::AlreadyDefined(tag.to_string()));
        }
        registry.insert(tag.to_string(), hooks);
        self.shared
            .arena
            .borrow_mut()
            .custom_tags
            .insert(tag.to_string());
        debug!(tag, "custom element defined");
        Ok(())
    }

    #[must_use]
    pub fn is_defined(&self, tag: &str) -> bool {
        self.shared.lifecycle.borrow().contains_key(tag)
    }

    /// Run a garbage collection pass now. Returns the number of freed nodes.
    pub fn collect_garbage(&self) -> usize {
        let count = self.shared.collect();
        self.shared.flush();
        count
    }

    /// Number of allocated nodes, including the document node and body.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.shared.arena.borrow().live_count()
    }

    /// First element in the document matching `selector`.
    pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, DomError> {
        self.root().query_selector(selector)
    }

    /// Resolve an [`ElementSelector`] against `parent` (default: body).
    pub fn resolve(
        &self,
        selector: &ElementSelector,
        parent: Option<&Node>,
    ) -> Result<Option<Node>, DomError> {
        match selector {
            ElementSelector::Element(node) => {
                if Rc::ptr_eq(&node.doc, &self.shared) {
                    Ok(Some(node.clone()))
                } else {
                    Err(DomError::ForeignNode(node.id()))
                }
            }
            ElementSelector::Query(query) => {
                let scope = match parent {
                    Some(parent) => parent.clone(),
                    None => self.body(),
                };
                let selector = Selector::parse(query)?;
                let found = selector.query_first(&self.shared.arena.borrow(), scope.id());
                Ok(found.map(|id| Node::from_id(&self.shared, id)))
            }
        }
    }

    /// Per-document value of type `T`, if one was inserted.
    #[must_use]
    pub fn extension<T: Any>(&self) -> Option<Rc<T>> {
        let value = self
            .shared
            .extensions
            .borrow()
            .get(&TypeId::of::<T>())
            .cloned()?;
        value.downcast::<T>().ok()
    }

    /// Store a per-document value, returning the previous one.
    pub fn insert_extension<T: Any>(&self, value: Rc<T>) -> Option<Rc<T>> {
        let previous = self
            .shared
            .extensions
            .borrow_mut()
            .insert(TypeId::of::<T>(), value)?;
        previous.downcast::<T>().ok()
    }

    /// Per-document value of type `T`, created with `init` on first use.
    pub fn extension_or_insert_with<T: Any>(&self, init: impl FnOnce() -> T) -> Rc<T> {
        if let Some(existing) = self.extension::<T>() {
            return existing;
        }
        let value = Rc::new(init());
        self.insert_extension(Rc::clone(&value));
        value
    }

    /// A handle that does not keep the document alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// `true` if both handles refer to the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Serialized document tree.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.root().inner_html()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Non-owning reference to a [`Document`].
///
/// State owned by the document itself (lifecycle hooks, extensions) holds
/// one of these instead of a [`Document`] to avoid reference cycles.
#[derive(Clone, Default)]
pub struct WeakDocument {
    shared: Weak<DocShared>,
}

impl WeakDocument {
    #[must_use]
    pub fn upgrade(&self) -> Option<Document> {
        self.shared.upgrade().map(Document::from_shared)
    }

    /// The live node `id`, if both the document and the node still exist.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.shared.upgrade()?.node(id)
    }
}

impl fmt::Debug for WeakDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDocument")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}
