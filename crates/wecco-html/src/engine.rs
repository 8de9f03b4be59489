#![forbid(unsafe_code)]

//! Template engine: full render and incremental patch.
//!
//! A full render materializes a template's shape into fresh nodes and
//! records, for every slot, the nodes or attribute it controls. When the
//! same template shape is applied to the same target again and the recorded
//! DOM is still intact, only the slots are revisited: unchanged text is left
//! alone, attributes are set only when their string changes, listeners are
//! rebound and content ranges are replaced in place.
//!
//! One engine is installed per [`Document`]. Records are keyed by the
//! target's [`NodeId`] and hold ids only, so they never keep nodes alive;
//! records of freed targets are pruned lazily.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug_span, warn};
use wecco_dom::parser::parse_fragment;
use wecco_dom::{Document, DomError, EventHandler, ListenerFlags, ListenerId, Node, NodeId};

use crate::cache::{CachePolicy, CacheStats, TemplateCache};
use crate::error::RenderError;
use crate::marker::MARKER_ATTRIBUTE;
use crate::shape::{Part, ProtoAttr, ProtoNode, Shape};
use crate::template::Template;
use crate::update;
use crate::value::Value;

/// Records are pruned once their count passes this, and then whenever it
/// doubles.
const INITIAL_PRUNE_THRESHOLD: usize = 64;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    pub cache_policy: CachePolicy,
}

impl EngineConfig {
    #[must_use]
    pub fn with_cache_policy(mut self, cache_policy: CachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }
}

/// Renders templates and keeps the records needed to patch them.
///
/// `Engine` is a cheap handle; clones share the cache and records.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    cache: RefCell<TemplateCache>,
    records: RefCell<FxHashMap<NodeId, Rendering>>,
    prune_at: Cell<usize>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("records", &self.inner.records.borrow().len())
            .field("cache", &self.inner.cache.borrow().stats())
            .finish()
    }
}

impl Engine {
    /// A standalone engine. Most callers want [`Engine::for_document`].
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                config,
                cache: RefCell::new(TemplateCache::new(config.cache_policy)),
                records: RefCell::new(FxHashMap::default()),
                prune_at: Cell::new(INITIAL_PRUNE_THRESHOLD),
            }),
        }
    }

    /// The engine installed on `doc`, installing a default one if needed.
    #[must_use]
    pub fn for_document(doc: &Document) -> Self {
        Self::clone(&doc.extension_or_insert_with(|| Self::new(EngineConfig::default())))
    }

    /// Install an engine with `config` on `doc`, replacing any previous one
    /// together with its records.
    pub fn install(doc: &Document, config: EngineConfig) -> Self {
        let engine = Self::new(config);
        doc.insert_extension(Rc::new(engine.clone()));
        engine
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.inner.config
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.borrow().stats()
    }

    /// `true` if a rendering of `target` is recorded.
    #[must_use]
    pub fn has_record(&self, target: &Node) -> bool {
        self.inner.records.borrow().contains_key(&target.id())
    }

    /// Drop the record for `target`; the next render starts from scratch.
    pub fn forget(&self, target: &Node) -> bool {
        let removed = self.inner.records.borrow_mut().remove(&target.id());
        removed.is_some()
    }

    fn shape(&self, template: &Template) -> Result<Rc<Shape>, RenderError> {
        template.check_arity()?;
        let shape = self.inner.cache.borrow_mut().shape_for(template)?;
        Ok(shape)
    }

    fn store(&self, doc: &Document, target: NodeId, rendering: Rendering) {
        let mut records = self.inner.records.borrow_mut();
        records.insert(target, rendering);
        if records.len() > self.inner.prune_at.get() {
            records.retain(|id, _| doc.is_alive(*id));
            self.inner
                .prune_at
                .set((records.len() * 2).max(INITIAL_PRUNE_THRESHOLD));
        }
    }

    /// Render `template` into `target`.
    ///
    /// Patches the previous rendering when it came from the same shape and
    /// is still intact; otherwise clears `target` and renders from scratch.
    pub fn render(&self, template: &Template, target: &Node) -> Result<(), RenderError> {
        let doc = target.document();
        let shape = self.shape(template)?;

        // Taken out of the map so no borrow is held while rendering.
        let mut previous = self.inner.records.borrow_mut().remove(&target.id());
        if let Some(mut rendering) = previous.take() {
            if rendering.shape.same_as(&shape) && rendering.is_intact(&doc) {
                let _span = debug_span!("wecco.patch", marker = ?shape.marker).entered();
                let plan = match rendering.plan(self, &doc, template.values()) {
                    Ok(plan) => plan,
                    Err(err) => {
                        self.store(&doc, target.id(), rendering);
                        return Err(err);
                    }
                };
                rendering.apply(&doc, plan)?;
                self.store(&doc, target.id(), rendering);
                return Ok(());
            }
            if rendering.shape.same_as(&shape) {
                warn!(node = %target.id(), "rendering record disturbed; rendering from scratch");
            } else {
                previous = Some(rendering);
            }
        }

        let _span = debug_span!(
            "wecco.render",
            marker = ?shape.marker,
            slots = shape.kinds.len()
        )
        .entered();
        let fragment = doc.create_fragment();
        let mut rendering = match self.materialize(&doc, &shape, template, &fragment) {
            Ok(rendering) => rendering,
            Err(err) => {
                // The target is untouched, so its old record still holds.
                if let Some(previous) = previous {
                    self.store(&doc, target.id(), previous);
                }
                return Err(err);
            }
        };
        target.remove_all_children()?;
        target.append_child(&fragment)?;
        rendering.set_parent(target.id());
        if shape.marker.is_some() {
            self.store(&doc, target.id(), rendering);
        }
        Ok(())
    }

    /// Render `template` into a fresh fragment and return the record with
    /// the top-level nodes, still inside the fragment.
    fn render_detached(
        &self,
        doc: &Document,
        template: &Template,
    ) -> Result<(Rendering, Vec<Node>), RenderError> {
        let shape = self.shape(template)?;
        let fragment = doc.create_fragment();
        let rendering = self.materialize(doc, &shape, template, &fragment)?;
        Ok((rendering, fragment.children()))
    }

    fn materialize(
        &self,
        doc: &Document,
        shape: &Rc<Shape>,
        template: &Template,
        container: &Node,
    ) -> Result<Rendering, RenderError> {
        let mut materializer = Materializer {
            engine: self,
            doc,
            values: template.values(),
            marker: shape.marker.as_deref(),
            bindings: Vec::new(),
            anchors: Vec::new(),
        };
        let mut top = Vec::with_capacity(shape.nodes.len());
        for proto in &shape.nodes {
            match proto {
                ProtoNode::Slot(slot) => {
                    let index = materializer.content_slot(container, *slot)?;
                    top.push(TopItem::Content(index));
                }
                other => {
                    let node = materializer.build(other)?;
                    container.append_child(&node)?;
                    top.push(TopItem::Node(node.id()));
                }
            }
        }
        Ok(Rendering {
            shape: Rc::clone(shape),
            parent: container.id(),
            top,
            bindings: materializer.bindings,
            anchors: materializer.anchors,
        })
    }

    /// Nodes for a content slot value, detached, never empty.
    fn content(
        &self,
        doc: &Document,
        value: &Value,
        slot: usize,
    ) -> Result<(ContentState, Vec<Node>), RenderError> {
        let nodes = match value {
            Value::Str(source) if is_markup(source) => {
                let parsed = parse_fragment(&**source)?;
                let nodes = non_empty(doc, doc.build_fragment(&parsed)?.children());
                let state = ContentState::Markup {
                    source: source.to_string(),
                    nodes: ids(&nodes),
                };
                return Ok((state, nodes));
            }
            Value::Str(text) => return Ok(text_content(doc, text)),
            Value::Empty => return Ok(text_content(doc, "")),
            Value::Bool(b) => return Ok(text_content(doc, bool_text(*b))),
            Value::Template(template) => {
                let (rendering, nodes) = self.render_detached(doc, template)?;
                if !nodes.is_empty() {
                    return Ok((ContentState::Nested(Box::new(rendering)), nodes));
                }
                nodes
            }
            Value::Element(node) => vec![node.clone()],
            Value::Update(request) => {
                let fragment = doc.create_fragment();
                update::dispatch(&fragment, request)?;
                fragment.children()
            }
            Value::List(items) => {
                let mut nodes = Vec::new();
                for item in items {
                    let (_, mut item_nodes) = self.content(doc, item, slot)?;
                    nodes.append(&mut item_nodes);
                }
                nodes
            }
            Value::Handler(_) => return Err(RenderError::HandlerInContent { slot }),
        };
        let nodes = non_empty(doc, nodes);
        Ok((ContentState::Nodes(ids(&nodes)), nodes))
    }

    /// Work out what a content slot needs, without touching the DOM.
    fn plan_content(
        &self,
        doc: &Document,
        content: &ContentBinding,
        value: &Value,
        slot: usize,
    ) -> Result<Step, RenderError> {
        if let ContentState::Text { text, .. } = &content.state
            && let Some(next) = plain_text(value)
        {
            return Ok(if *text == *next {
                Step::Keep
            } else {
                Step::SetText(next.into_owned())
            });
        }
        if let ContentState::Markup { source, .. } = &content.state
            && let Value::Str(next) = value
            && *source == **next
        {
            return Ok(Step::Keep);
        }
        if let ContentState::Nested(rendering) = &content.state
            && let Value::Template(template) = value
            && rendering.shape.matches(template)
            && rendering.is_intact(doc)
        {
            return Ok(Step::Nested(rendering.plan(self, doc, template.values())?));
        }
        if let ContentState::Nodes(nodes) = &content.state
            && let Value::Element(element) = value
            && nodes.as_slice() == [element.id()]
        {
            return Ok(Step::Keep);
        }
        let (state, nodes) = self.content(doc, value, slot)?;
        Ok(Step::Replace { state, nodes })
    }
}

/// Put `new_nodes` where the slot's current nodes are.
fn replace_content(
    doc: &Document,
    content: &mut ContentBinding,
    mut state: ContentState,
    new_nodes: Vec<Node>,
) -> Result<(), RenderError> {
    let parent = handle(doc, content.parent)?;
    let old = content.state.node_ids();
    let new_ids: SmallVec<[NodeId; 8]> = new_nodes.iter().map(Node::id).collect();

    let anchor = doc.create_text("");
    let first_old = old.first().and_then(|id| doc.node(*id));
    parent.insert_before(&anchor, first_old.as_ref())?;
    for node in &new_nodes {
        parent.insert_before(node, Some(&anchor))?;
    }
    for id in old.iter().filter(|id| !new_ids.contains(id)) {
        if let Some(node) = doc.node(*id)
            && node.parent().as_ref() == Some(&parent)
        {
            parent.remove_child(&node)?;
        }
    }
    parent.remove_child(&anchor)?;

    if let ContentState::Nested(rendering) = &mut state {
        rendering.set_parent(parent.id());
    }
    content.state = state;
    Ok(())
}

/// The text of values that render as a single text node.
fn plain_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Empty => Some(Cow::Borrowed("")),
        Value::Bool(b) => Some(Cow::Borrowed(bool_text(*b))),
        Value::Str(s) if !is_markup(s) => Some(Cow::Borrowed(&**s)),
        _ => None,
    }
}

fn is_markup(s: &str) -> bool {
    s.contains(['<', '&'])
}

fn bool_text(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

fn text_content(doc: &Document, text: &str) -> (ContentState, Vec<Node>) {
    let node = doc.create_text(text);
    let state = ContentState::Text {
        node: node.id(),
        text: text.to_string(),
    };
    (state, vec![node])
}

fn non_empty(doc: &Document, mut nodes: Vec<Node>) -> Vec<Node> {
    if nodes.is_empty() {
        nodes.push(doc.create_text(""));
    }
    nodes
}

fn ids(nodes: &[Node]) -> Vec<NodeId> {
    nodes.iter().map(Node::id).collect()
}

fn handle(doc: &Document, id: NodeId) -> Result<Node, RenderError> {
    doc.node(id).ok_or(RenderError::Dom(DomError::StaleNode(id)))
}

fn attribute_value(parts: &[Part], values: &[Value]) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Static(text) => out.push_str(text),
            Part::Slot(slot) => values[*slot].write_attribute(&mut out),
        }
    }
    out
}

/// The handler an event slot asks for; `None` unbinds.
fn wanted_handler(value: &Value, slot: usize) -> Result<Option<&EventHandler>, RenderError> {
    match value {
        Value::Handler(handler) => Ok(Some(handler)),
        Value::Empty => Ok(None),
        _ => Err(RenderError::NotAHandler { slot }),
    }
}

/// Replace whatever `listener` holds with `handler`.
fn rebind(
    element: &Node,
    name: &str,
    listener: &mut Option<(ListenerId, EventHandler)>,
    handler: Option<EventHandler>,
) -> Result<(), RenderError> {
    if let Some((id, _)) = listener.take() {
        element.remove_event_listener(id);
    }
    if let Some(handler) = handler {
        let id = element.add_event_listener(name, handler.clone(), ListenerFlags::empty())?;
        *listener = Some((id, handler));
    }
    Ok(())
}

/// One binding's share of a patch.
enum Step {
    Keep,
    SetText(String),
    Nested(Plan),
    Replace {
        state: ContentState,
        nodes: Vec<Node>,
    },
    SetAttribute(String),
    SetBoolean(bool),
    Bind(Option<EventHandler>),
}

/// A patch whose fallible work is done; one step per binding.
struct Plan(Vec<Step>);

#[derive(Debug)]
enum ContentState {
    /// A single text node.
    Text { node: NodeId, text: String },
    /// Nodes parsed from a markup string.
    Markup { source: String, nodes: Vec<NodeId> },
    /// A nested template that can be patched.
    Nested(Box<Rendering>),
    /// Anything else; replaced on every patch.
    Nodes(Vec<NodeId>),
}

impl ContentState {
    fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Self::Text { node, .. } => vec![*node],
            Self::Markup { nodes, .. } | Self::Nodes(nodes) => nodes.clone(),
            Self::Nested(rendering) => rendering.top_nodes(),
        }
    }
}

#[derive(Debug)]
struct ContentBinding {
    parent: NodeId,
    state: ContentState,
}

#[derive(Debug)]
enum Binding {
    Content {
        slot: usize,
        content: ContentBinding,
    },
    Attribute {
        element: NodeId,
        name: String,
        parts: Rc<[Part]>,
        current: String,
    },
    Boolean {
        slot: usize,
        element: NodeId,
        name: String,
        present: bool,
    },
    Event {
        slot: usize,
        element: NodeId,
        name: String,
        listener: Option<(ListenerId, EventHandler)>,
    },
}

#[derive(Debug, Clone, Copy)]
enum TopItem {
    Node(NodeId),
    /// Index into `Rendering::bindings`.
    Content(usize),
}

/// What a render produced, slot by slot.
#[derive(Debug)]
pub(crate) struct Rendering {
    shape: Rc<Shape>,
    /// Where the top-level nodes live.
    parent: NodeId,
    top: Vec<TopItem>,
    bindings: Vec<Binding>,
    /// Elements stamped with the marker.
    anchors: Vec<NodeId>,
}

impl Rendering {
    fn top_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.top.len());
        for item in &self.top {
            match item {
                TopItem::Node(id) => out.push(*id),
                TopItem::Content(index) => {
                    if let Some(Binding::Content { content, .. }) = self.bindings.get(*index) {
                        out.extend(content.state.node_ids());
                    }
                }
            }
        }
        out
    }

    fn set_parent(&mut self, parent: NodeId) {
        self.parent = parent;
        for item in &self.top {
            if let TopItem::Content(index) = item
                && let Some(Binding::Content { content, .. }) = self.bindings.get_mut(*index)
            {
                content.parent = parent;
                if let ContentState::Nested(nested) = &mut content.state {
                    nested.set_parent(parent);
                }
            }
        }
    }

    /// The recorded nodes are still where the render put them.
    fn is_intact(&self, doc: &Document) -> bool {
        let parent_of = |id: NodeId| doc.node(id).and_then(|n| n.parent()).map(|p| p.id());

        let marker = self.shape.marker.as_deref();
        let anchors_ok = self.anchors.iter().all(|id| {
            doc.node(*id)
                .is_some_and(|n| n.get_attribute(MARKER_ATTRIBUTE).as_deref() == marker)
        });
        if !anchors_ok {
            return false;
        }
        let top_ok = self.top.iter().all(|item| match item {
            TopItem::Node(id) => parent_of(*id) == Some(self.parent),
            TopItem::Content(_) => true,
        });
        if !top_ok {
            return false;
        }
        self.bindings.iter().all(|binding| match binding {
            Binding::Content { content, .. } => {
                let placed = content
                    .state
                    .node_ids()
                    .into_iter()
                    .all(|id| parent_of(id) == Some(content.parent));
                placed
                    && match &content.state {
                        ContentState::Nested(nested) => nested.is_intact(doc),
                        _ => true,
                    }
            }
            _ => true,
        })
    }

    /// Everything that can fail about patching with `values`: parsing
    /// markup, rendering nested templates, checking handlers.
    fn plan(&self, engine: &Engine, doc: &Document, values: &[Value]) -> Result<Plan, RenderError> {
        let mut steps = Vec::with_capacity(self.bindings.len());
        for binding in &self.bindings {
            let step = match binding {
                Binding::Content { slot, content } => {
                    engine.plan_content(doc, content, &values[*slot], *slot)?
                }
                Binding::Attribute { parts, current, .. } => {
                    let next = attribute_value(parts, values);
                    if next == *current {
                        Step::Keep
                    } else {
                        Step::SetAttribute(next)
                    }
                }
                Binding::Boolean { slot, present, .. } => {
                    let wanted = values[*slot].is_truthy();
                    if wanted == *present {
                        Step::Keep
                    } else {
                        Step::SetBoolean(wanted)
                    }
                }
                Binding::Event { slot, listener, .. } => {
                    let wanted = wanted_handler(&values[*slot], *slot)?;
                    let bound = listener.as_ref().map(|(_, handler)| handler);
                    let unchanged = match (wanted, bound) {
                        (Some(wanted), Some(bound)) => wanted.ptr_eq(bound),
                        (None, None) => true,
                        _ => false,
                    };
                    if unchanged {
                        Step::Keep
                    } else {
                        Step::Bind(wanted.cloned())
                    }
                }
            };
            steps.push(step);
        }
        Ok(Plan(steps))
    }

    /// Write a plan made by [`Rendering::plan`] to the DOM.
    fn apply(&mut self, doc: &Document, plan: Plan) -> Result<(), RenderError> {
        for (binding, step) in self.bindings.iter_mut().zip(plan.0) {
            match (binding, step) {
                (_, Step::Keep) => {}
                (Binding::Content { content, .. }, Step::SetText(next)) => {
                    if let ContentState::Text { node, text } = &mut content.state {
                        handle(doc, *node)?.set_text(&next)?;
                        *text = next;
                    }
                }
                (Binding::Content { content, .. }, Step::Nested(plan)) => {
                    if let ContentState::Nested(rendering) = &mut content.state {
                        rendering.apply(doc, plan)?;
                    }
                }
                (Binding::Content { content, .. }, Step::Replace { state, nodes }) => {
                    replace_content(doc, content, state, nodes)?;
                }
                (Binding::Attribute { element, name, current, .. }, Step::SetAttribute(next)) => {
                    handle(doc, *element)?.set_attribute(name, &next)?;
                    *current = next;
                }
                (Binding::Boolean { element, name, present, .. }, Step::SetBoolean(wanted)) => {
                    let element = handle(doc, *element)?;
                    if wanted {
                        element.set_attribute(name, name)?;
                    } else {
                        element.remove_attribute(name)?;
                    }
                    *present = wanted;
                }
                (Binding::Event { element, name, listener, .. }, Step::Bind(handler)) => {
                    let element = handle(doc, *element)?;
                    rebind(&element, name, listener, handler)?;
                }
                // Plans are built from the same bindings, so kinds line up.
                _ => {}
            }
        }
        Ok(())
    }
}

struct Materializer<'a> {
    engine: &'a Engine,
    doc: &'a Document,
    values: &'a [Value],
    marker: Option<&'a str>,
    bindings: Vec<Binding>,
    anchors: Vec<NodeId>,
}

impl Materializer<'_> {
    /// Render a content slot into `parent`, returning its binding index.
    fn content_slot(&mut self, parent: &Node, slot: usize) -> Result<usize, RenderError> {
        let (mut state, nodes) = self.engine.content(self.doc, &self.values[slot], slot)?;
        for node in &nodes {
            parent.append_child(node)?;
        }
        if let ContentState::Nested(nested) = &mut state {
            nested.set_parent(parent.id());
        }
        self.bindings.push(Binding::Content {
            slot,
            content: ContentBinding {
                parent: parent.id(),
                state,
            },
        });
        Ok(self.bindings.len() - 1)
    }

    fn build_into(&mut self, parent: &Node, protos: &[ProtoNode]) -> Result<(), RenderError> {
        for proto in protos {
            match proto {
                ProtoNode::Slot(slot) => {
                    self.content_slot(parent, *slot)?;
                }
                other => {
                    let node = self.build(other)?;
                    parent.append_child(&node)?;
                }
            }
        }
        Ok(())
    }

    /// Build one non-slot node with its subtree, detached.
    fn build(&mut self, proto: &ProtoNode) -> Result<Node, RenderError> {
        let (tag, attributes, children, marked) = match proto {
            ProtoNode::Text(text) => return Ok(self.doc.create_text(text)),
            ProtoNode::Comment(text) => return Ok(self.doc.create_comment(text)),
            ProtoNode::Slot(_) => return Ok(self.doc.create_text("")),
            ProtoNode::Element {
                tag,
                attributes,
                children,
                marked,
            } => (tag, attributes, children, *marked),
        };

        let element = self.doc.create_element(tag);
        for attr in attributes {
            match attr {
                ProtoAttr::Static { name, value } => element.set_attribute(name, value)?,
                ProtoAttr::Interpolated { name, parts } => {
                    let current = attribute_value(parts, self.values);
                    element.set_attribute(name, &current)?;
                    self.bindings.push(Binding::Attribute {
                        element: element.id(),
                        name: name.clone(),
                        parts: Rc::clone(parts),
                        current,
                    });
                }
                ProtoAttr::Boolean { .. } | ProtoAttr::Event { .. } => {}
            }
        }
        if marked {
            if let Some(marker) = self.marker {
                element.set_attribute(MARKER_ATTRIBUTE, marker)?;
            }
            self.anchors.push(element.id());
        }
        for attr in attributes {
            match attr {
                ProtoAttr::Boolean { name, slot } => {
                    let present = self.values[*slot].is_truthy();
                    if present {
                        element.set_attribute(name, name)?;
                    }
                    self.bindings.push(Binding::Boolean {
                        slot: *slot,
                        element: element.id(),
                        name: name.clone(),
                        present,
                    });
                }
                ProtoAttr::Event { name, slot } => {
                    let mut listener = None;
                    let handler = wanted_handler(&self.values[*slot], *slot)?.cloned();
                    rebind(&element, name, &mut listener, handler)?;
                    self.bindings.push(Binding::Event {
                        slot: *slot,
                        element: element.id(),
                        name: name.clone(),
                        listener,
                    });
                }
                ProtoAttr::Static { .. } | ProtoAttr::Interpolated { .. } => {}
            }
        }

        self.build_into(&element, children)?;
        Ok(element)
    }
}
