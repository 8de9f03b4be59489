#![forbid(unsafe_code)]

//! Custom element components.
//!
//! [`define`] registers a render function for a custom element tag. Every
//! element with that tag, whether created through the returned
//! [`ComponentFactory`] or parsed from markup, gets its own instance with
//! private data. Data changes go through [`Component::set_data`], which
//! stores the value and asks the configured [`Scheduler`] for a render;
//! requests made before the scheduler runs collapse into one render with
//! the latest data.
//!
//! After each successful render the element receives a non-bubbling
//! [`RENDERING_COMPLETE`] event.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, error};
use wecco_dom::{Document, ElementSelector, Event, LifecycleHooks, Node, NodeId, WeakDocument};
use wecco_html::{ElementUpdate, Engine, RenderError, update_element};

use crate::error::AppError;
use crate::render;
use crate::scheduler::{ImmediateScheduler, Scheduler};

/// Event dispatched on a component element after each settled render.
pub const RENDERING_COMPLETE: &str = "renderingComplete";

/// A component render function.
pub type RenderFn<D> = Rc<dyn Fn(&D, &ComponentContext<D>) -> ElementUpdate>;

/// Component configuration.
#[derive(Clone)]
pub struct ComponentConfig {
    /// Runs render tasks. Defaults to [`ImmediateScheduler`], which renders
    /// inline on every `set_data` and fires [`RENDERING_COMPLETE`] each time.
    /// Install a [`TickScheduler`](crate::TickScheduler) to coalesce the
    /// writes of one tick into a single render.
    pub scheduler: Rc<dyn Scheduler>,
}

impl ComponentConfig {
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            scheduler: Rc::new(ImmediateScheduler),
        }
    }
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig").finish_non_exhaustive()
    }
}

/// Resets a flag when dropped, even on panic.
struct FlagGuard<'a>(&'a Cell<bool>);

impl<'a> FlagGuard<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct Instance<D> {
    doc: WeakDocument,
    element: NodeId,
    tag: Rc<str>,
    render: RenderFn<D>,
    scheduler: Rc<dyn Scheduler>,
    /// Data of the last render.
    data: RefCell<Rc<D>>,
    /// Data waiting for the next render; latest wins.
    pending: RefCell<Option<D>>,
    /// A render has been requested and not yet performed.
    dirty: Cell<bool>,
    /// A render task is sitting in the scheduler.
    scheduled: Cell<bool>,
    rendering: Cell<bool>,
    renders: Cell<u64>,
    error: RefCell<Option<RenderError>>,
}

impl<D: 'static> Instance<D> {
    fn element(&self) -> Option<Node> {
        self.doc.node(self.element)
    }

    fn current(&self) -> Rc<D> {
        Rc::clone(&self.data.borrow())
    }

    fn set_data(self: &Rc<Self>, next: D) {
        *self.pending.borrow_mut() = Some(next);
        self.request_render();
    }

    fn update_data(self: &Rc<Self>, f: impl FnOnce(&D) -> D) {
        let pending = self.pending.borrow_mut().take();
        let next = match pending {
            Some(pending) => f(&pending),
            None => f(&self.current()),
        };
        self.set_data(next);
    }

    /// Mark the instance dirty and schedule a render if it is connected.
    /// Disconnected instances render when they are connected.
    fn request_render(self: &Rc<Self>) {
        self.dirty.set(true);
        if self.scheduled.get() {
            return;
        }
        if !self.element().is_some_and(|element| element.is_connected()) {
            return;
        }
        self.scheduled.set(true);
        let instance = Rc::clone(self);
        self.scheduler.schedule(Box::new(move || instance.run()));
    }

    fn run(self: &Rc<Self>) {
        self.scheduled.set(false);
        // Requests made while rendering are picked up by the loop below.
        if self.rendering.get() {
            return;
        }
        let _guard = FlagGuard::raise(&self.rendering);
        while self.dirty.get() {
            let Some(element) = self.element() else {
                return;
            };
            if !element.is_connected() {
                return;
            }
            self.dirty.set(false);
            let next = self.pending.borrow_mut().take();
            if let Some(next) = next {
                *self.data.borrow_mut() = Rc::new(next);
            }
            self.render(&element);
        }
    }

    fn render(self: &Rc<Self>, element: &Node) {
        let _span = debug_span!("wecco.component.render", tag = %self.tag).entered();
        let data = self.current();
        let ctx = ComponentContext {
            instance: Rc::clone(self),
        };
        let view = (self.render)(&data, &ctx);
        match render::show(element, view) {
            Ok(()) => {
                self.renders.set(self.renders.get() + 1);
                element.dispatch_event(&Event::new(RENDERING_COMPLETE));
            }
            Err(err) => {
                error!(tag = %self.tag, element = %self.element, error = %err, "component render failed");
                *self.error.borrow_mut() = Some(err);
            }
        }
    }
}

/// Handle to one component instance.
pub struct Component<D> {
    instance: Rc<Instance<D>>,
}

impl<D> Clone for Component<D> {
    fn clone(&self) -> Self {
        Self {
            instance: Rc::clone(&self.instance),
        }
    }
}

impl<D> fmt::Debug for Component<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("tag", &self.instance.tag)
            .field("element", &self.instance.element)
            .field("renders", &self.instance.renders.get())
            .finish()
    }
}

impl<D: 'static> Component<D> {
    /// The component element, unless it has been freed.
    #[must_use]
    pub fn element(&self) -> Option<Node> {
        self.instance.element()
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.instance.tag
    }

    /// Data used by the most recent render.
    #[must_use]
    pub fn data(&self) -> Rc<D> {
        self.instance.current()
    }

    /// Replace the data and request a render.
    pub fn set_data(&self, data: D) {
        self.instance.set_data(data);
    }

    /// Derive new data from the latest value, pending or rendered.
    ///
    /// ```
    /// use wecco_dom::Document;
    /// use wecco_html::html;
    /// use wecco_runtime::define;
    ///
    /// #[derive(Default, Clone)]
    /// struct Counter { label: String, count: u32 }
    ///
    /// let doc = Document::new();
    /// let counter = define(&doc, "my-counter", |d: &Counter, _ctx| {
    ///     html!("<span>" {d.label.clone()} ": " {d.count} "</span>")
    /// })
    /// .unwrap();
    /// let element = counter.create(Counter { label: "clicks".into(), count: 0 });
    /// doc.body().append_child(&element).unwrap();
    ///
    /// let component = counter.instance(&element).unwrap();
    /// component.update_data(|d| Counter { count: d.count + 1, ..d.clone() });
    /// assert_eq!(element.text_content(), "clicks: 1");
    /// ```
    pub fn update_data(&self, f: impl FnOnce(&D) -> D) {
        self.instance.update_data(f);
    }

    /// Number of successful renders.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.instance.renders.get()
    }

    /// `true` while data is waiting to be rendered.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.instance.dirty.get()
    }

    /// The error of the last failed render, if any.
    pub fn take_error(&self) -> Option<RenderError> {
        self.instance.error.borrow_mut().take()
    }

    /// Append the component element to the element `selector` resolves to
    /// below the document body.
    pub fn mount(&self, selector: impl Into<ElementSelector>) -> Result<(), AppError> {
        let selector = selector.into();
        let element = self
            .element()
            .ok_or(AppError::Dom(wecco_dom::DomError::StaleNode(self.instance.element)))?;
        let target = element
            .document()
            .resolve(&selector, None)?
            .ok_or_else(|| AppError::mount_not_found(&selector))?;
        update_element(&target, element)?;
        Ok(())
    }
}

/// What a render function can do with its component.
pub struct ComponentContext<D> {
    instance: Rc<Instance<D>>,
}

impl<D> Clone for ComponentContext<D> {
    fn clone(&self) -> Self {
        Self {
            instance: Rc::clone(&self.instance),
        }
    }
}

impl<D: 'static> ComponentContext<D> {
    #[must_use]
    pub fn element(&self) -> Option<Node> {
        self.instance.element()
    }

    #[must_use]
    pub fn component(&self) -> Component<D> {
        Component {
            instance: Rc::clone(&self.instance),
        }
    }

    pub fn set_data(&self, data: D) {
        self.instance.set_data(data);
    }

    pub fn update_data(&self, f: impl FnOnce(&D) -> D) {
        self.instance.update_data(f);
    }

    /// Dispatch a bubbling event named `name` carrying `detail` from the
    /// component element. Returns `false` if the element is gone or a
    /// listener stopped propagation.
    pub fn emit(&self, name: &str, detail: impl Any) -> bool {
        match self.element() {
            Some(element) => element.dispatch_event(&Event::bubbling(name).with_detail(detail)),
            None => false,
        }
    }
}

/// Lifecycle hooks for one component tag; owns the instances.
struct Registry<D> {
    tag: Rc<str>,
    render: RenderFn<D>,
    config: ComponentConfig,
    instances: RefCell<FxHashMap<NodeId, Rc<Instance<D>>>>,
}

impl<D: Default + 'static> Registry<D> {
    fn instance_for(&self, element: &Node) -> Rc<Instance<D>> {
        let existing = self.instances.borrow().get(&element.id()).cloned();
        if let Some(instance) = existing {
            return instance;
        }
        let instance = Rc::new(Instance {
            doc: element.document().downgrade(),
            element: element.id(),
            tag: Rc::clone(&self.tag),
            render: Rc::clone(&self.render),
            scheduler: Rc::clone(&self.config.scheduler),
            data: RefCell::new(Rc::new(D::default())),
            pending: RefCell::new(None),
            dirty: Cell::new(true),
            scheduled: Cell::new(false),
            rendering: Cell::new(false),
            renders: Cell::new(0),
            error: RefCell::new(None),
        });
        self.instances
            .borrow_mut()
            .insert(element.id(), Rc::clone(&instance));
        debug!(tag = %self.tag, element = %element.id(), "component instance created");
        instance
    }
}

impl<D: Default + 'static> LifecycleHooks for Registry<D> {
    fn created(&self, element: &Node) {
        self.instance_for(element);
    }

    fn connected(&self, element: &Node) {
        self.instance_for(element).request_render();
    }

    fn disconnected(&self, element: &Node) {
        Engine::for_document(&element.document()).forget(element);
    }

    fn released(&self, element: NodeId) {
        let removed = self.instances.borrow_mut().remove(&element);
        drop(removed);
    }
}

/// Creates component elements of one tag.
pub struct ComponentFactory<D> {
    doc: Document,
    registry: Rc<Registry<D>>,
}

impl<D> Clone for ComponentFactory<D> {
    fn clone(&self) -> Self {
        Self {
            doc: self.doc.clone(),
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<D> fmt::Debug for ComponentFactory<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("tag", &self.registry.tag)
            .field("instances", &self.registry.instances.borrow().len())
            .finish()
    }
}

impl<D: Default + 'static> ComponentFactory<D> {
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.registry.tag
    }

    /// A new, detached component element with `data`. It renders once it
    /// is connected.
    pub fn create(&self, data: D) -> Node {
        let element = self.doc.create_element(&self.registry.tag);
        self.registry.instance_for(&element).set_data(data);
        element
    }

    /// The instance behind `element`, if it is one of ours.
    #[must_use]
    pub fn instance(&self, element: &Node) -> Option<Component<D>> {
        let instance = self.registry.instances.borrow().get(&element.id()).cloned()?;
        Some(Component { instance })
    }

    /// Number of live instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.registry.instances.borrow().len()
    }
}

/// Define a component for `tag` with the default configuration.
///
/// Components defined this way render synchronously: each `set_data` or
/// `update_data` renders before it returns, so N calls mean N renders and
/// N [`RENDERING_COMPLETE`] events. Use [`define_with_config`] with a
/// [`TickScheduler`](crate::TickScheduler) for one render per tick.
pub fn define<D, R, F>(doc: &Document, tag: &str, render: F) -> Result<ComponentFactory<D>, AppError>
where
    D: Default + 'static,
    R: Into<ElementUpdate>,
    F: Fn(&D, &ComponentContext<D>) -> R + 'static,
{
    define_with_config(doc, tag, ComponentConfig::default(), render)
}

/// Define a component for `tag`.
///
/// Fails if `tag` is not a valid custom element name or is already defined
/// on `doc`.
pub fn define_with_config<D, R, F>(
    doc: &Document,
    tag: &str,
    config: ComponentConfig,
    render: F,
) -> Result<ComponentFactory<D>, AppError>
where
    D: Default + 'static,
    R: Into<ElementUpdate>,
    F: Fn(&D, &ComponentContext<D>) -> R + 'static,
{
    let render: RenderFn<D> = Rc::new(move |data: &D, ctx: &ComponentContext<D>| render(data, ctx).into());
    let registry = Rc::new(Registry {
        tag: Rc::from(tag),
        render,
        config,
        instances: RefCell::new(FxHashMap::default()),
    });
    doc.define_lifecycle(tag, Rc::clone(&registry) as Rc<dyn LifecycleHooks>)?;
    Ok(ComponentFactory {
        doc: doc.clone(),
        registry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::TickScheduler;
    use tracing_test::traced_test;
    use wecco_html::html;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Greeting {
        name: String,
    }

    fn greeter(doc: &Document) -> ComponentFactory<Greeting> {
        define(doc, "x-greeter", |d: &Greeting, _: &ComponentContext<Greeting>| {
            html!("<p>Hello, " {d.name.clone()} "</p>")
        })
        .unwrap()
    }

    #[test]
    fn renders_when_connected() {
        let doc = Document::new();
        let factory = greeter(&doc);
        let element = factory.create(Greeting { name: "world".into() });
        assert_eq!(element.child_count(), 0);

        doc.body().append_child(&element).unwrap();
        assert_eq!(element.text_content(), "Hello, world");
        assert_eq!(factory.instance(&element).unwrap().render_count(), 1);
    }

    #[test]
    fn markup_instances_start_from_default() {
        let doc = Document::new();
        let factory = greeter(&doc);
        doc.body().set_inner_html("<x-greeter></x-greeter>").unwrap();
        let element = doc.query_selector("x-greeter").unwrap().unwrap();
        let component = factory.instance(&element).unwrap();
        assert_eq!(*component.data(), Greeting::default());
        assert_eq!(element.text_content(), "Hello, ");
    }

    #[test]
    fn invalid_or_duplicate_tags_are_rejected() {
        let doc = Document::new();
        greeter(&doc);
        let duplicate = define(&doc, "x-greeter", |_: &Greeting, _: &ComponentContext<Greeting>| "");
        assert!(matches!(duplicate, Err(AppError::Dom(_))));
        let invalid = define(&doc, "greeter", |_: &Greeting, _: &ComponentContext<Greeting>| "");
        assert!(matches!(invalid, Err(AppError::Dom(_))));
    }

    #[test]
    fn tick_scheduler_coalesces() {
        let doc = Document::new();
        let scheduler = Rc::new(TickScheduler::new());
        let factory = define_with_config(
            &doc,
            "x-label",
            ComponentConfig::default().with_scheduler(scheduler.clone()),
            |d: &String, _: &ComponentContext<String>| html!("<b>" {d.clone()} "</b>"),
        )
        .unwrap();
        let element = factory.create("a".to_string());
        doc.body().append_child(&element).unwrap();
        scheduler.run_until_idle();

        let component = factory.instance(&element).unwrap();
        for s in ["b", "c", "d"] {
            component.set_data(s.to_string());
        }
        assert_eq!(scheduler.pending(), 1);
        assert!(component.is_dirty());
        scheduler.tick();
        assert_eq!(component.render_count(), 2);
        assert_eq!(element.text_content(), "d");
    }

    #[test]
    fn released_instances_are_dropped() {
        let doc = Document::new();
        let factory = greeter(&doc);
        let element = factory.create(Greeting::default());
        assert_eq!(factory.instance_count(), 1);
        drop(element);
        doc.collect_garbage();
        assert_eq!(factory.instance_count(), 0);
    }

    #[test]
    #[traced_test]
    fn failed_render_is_logged_and_kept() {
        let doc = Document::new();
        let factory = define(&doc, "x-broken", |_: &u8, _: &ComponentContext<u8>| "<p></div>").unwrap();
        let element = factory.create(1);
        doc.body().append_child(&element).unwrap();

        let component = factory.instance(&element).unwrap();
        assert_eq!(component.render_count(), 0);
        assert!(matches!(component.take_error(), Some(RenderError::Parse(_))));
        assert!(component.take_error().is_none());
        assert!(logs_contain("component render failed"));
    }
}
