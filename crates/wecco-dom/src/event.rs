#![forbid(unsafe_code)]

//! Events, listeners and dispatch.
//!
//! Dispatch computes the propagation path (target first, then ancestors for
//! bubbling events) before any listener runs. For each node on the path the
//! matching handlers are collected and `once` listeners removed while the
//! arena is borrowed; the borrow is released before the handlers are called.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::node::Node;

bitflags! {
    /// Listener registration options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListenerFlags: u8 {
        /// Remove the listener after its first invocation.
        const ONCE = 0b0000_0001;
    }
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// A shared event callback.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }

    /// `true` if both handles refer to the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<F> From<F> for EventHandler
where
    F: Fn(&Event) + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

#[derive(Debug)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event_type: String,
    pub(crate) handler: EventHandler,
    pub(crate) flags: ListenerFlags,
}

/// An event travelling through the tree.
pub struct Event {
    name: String,
    bubbles: bool,
    detail: Option<Rc<dyn Any>>,
    target: RefCell<Option<Node>>,
    current_target: RefCell<Option<Node>>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    /// A non-bubbling event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bubbles: false,
            detail: None,
            target: RefCell::new(None),
            current_target: RefCell::new(None),
            propagation_stopped: Cell::new(false),
        }
    }

    /// A bubbling event.
    pub fn bubbling(name: impl Into<String>) -> Self {
        Self {
            bubbles: true,
            ..Self::new(name)
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_detail<T: Any>(mut self, detail: T) -> Self {
        self.detail = Some(Rc::new(detail));
        self
    }

    /// Attach an already shared payload.
    #[must_use]
    pub fn with_shared_detail(mut self, detail: Rc<dyn Any>) -> Self {
        self.detail = Some(detail);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// The payload, if present and of type `T`.
    #[must_use]
    pub fn detail<T: Any>(&self) -> Option<&T> {
        self.detail.as_deref()?.downcast_ref::<T>()
    }

    #[must_use]
    pub fn shared_detail(&self) -> Option<Rc<dyn Any>> {
        self.detail.clone()
    }

    /// The node the event was dispatched on.
    #[must_use]
    pub fn target(&self) -> Option<Node> {
        self.target.borrow().clone()
    }

    /// The node whose listeners are currently running.
    #[must_use]
    pub fn current_target(&self) -> Option<Node> {
        self.current_target.borrow().clone()
    }

    /// Stop after the listeners of the current node.
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("bubbles", &self.bubbles)
            .field("has_detail", &self.detail.is_some())
            .field("propagation_stopped", &self.propagation_stopped.get())
            .finish()
    }
}

pub(crate) fn dispatch(target: &Node, event: &Event) -> bool {
    let doc = &target.doc;
    let path: SmallVec<[_; 8]> = {
        let arena = doc.arena.borrow();
        if event.bubbles {
            arena.ancestors_inclusive(target.id)
        } else {
            std::iter::once(target.id).collect()
        }
    };

    event.target.replace(Some(target.clone()));
    for id in path {
        let handlers: SmallVec<[EventHandler; 4]> = {
            let mut arena = doc.arena.borrow_mut();
            match arena.element_mut(id) {
                Ok(el) => {
                    let mut handlers = SmallVec::new();
                    el.listeners.retain(|listener| {
                        if listener.event_type != event.name {
                            return true;
                        }
                        handlers.push(listener.handler.clone());
                        !listener.flags.contains(ListenerFlags::ONCE)
                    });
                    handlers
                }
                Err(_) => SmallVec::new(),
            }
        };
        if handlers.is_empty() {
            continue;
        }

        let Some(current) = doc.node(id) else {
            continue;
        };
        event.current_target.replace(Some(current));
        for handler in handlers {
            handler.call(event);
        }
        if event.propagation_stopped.get() {
            break;
        }
    }
    event.current_target.replace(None);

    !event.propagation_stopped.get()
}
