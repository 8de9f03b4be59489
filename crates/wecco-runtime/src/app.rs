#![forbid(unsafe_code)]

//! Message-driven applications.
//!
//! An application owns one model. The only way to change it is to emit a
//! message: `update` turns the current model and the message into the next
//! model, then `view` renders the next model onto the mount point. Cycles
//! never overlap. Messages emitted while a cycle runs (from `update`,
//! `view`, or an event handler fired during patching) wait in a FIFO queue
//! and are processed, in order, right after it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, debug_span, error, info};
use wecco_dom::{Document, DomError, ElementSelector, EventHandler, Node, NodeId, WeakDocument};
use wecco_html::ElementUpdate;

use crate::error::AppError;
use crate::render;

/// Lifecycle of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Created, first render not finished.
    Uninitialized,
    /// Idle, waiting for messages.
    Mounted,
    /// Running an update/view cycle.
    Updating,
}

type UpdateFn<M, Msg> = Box<dyn Fn(&AppContext<Msg>, &M, Msg) -> M>;
type ViewFn<M, Msg> = Box<dyn Fn(&AppContext<Msg>, &M) -> ElementUpdate>;

/// Message processing, erased over the model type so contexts only carry
/// the message type.
trait Dispatch<Msg> {
    /// Queue `msg`; `true` if the caller must drain the queue.
    fn enqueue(&self, msg: Msg) -> bool;
    fn drain(&self, ctx: &AppContext<Msg>) -> Result<(), AppError>;
}

struct AppInner<M, Msg> {
    doc: WeakDocument,
    mount: NodeId,
    model: RefCell<Rc<M>>,
    queue: RefCell<VecDeque<Msg>>,
    state: Cell<AppState>,
    cycles: Cell<u64>,
    update: UpdateFn<M, Msg>,
    view: ViewFn<M, Msg>,
}

/// Marks a cycle in flight and returns to [`AppState::Mounted`] when
/// dropped, even if a callback panics.
struct CycleGuard<'a>(&'a Cell<AppState>);

impl<'a> CycleGuard<'a> {
    fn enter(state: &'a Cell<AppState>) -> Self {
        state.set(AppState::Updating);
        Self(state)
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.set(AppState::Mounted);
    }
}

impl<M: 'static, Msg: 'static> AppInner<M, Msg> {
    fn mount(&self) -> Result<Node, AppError> {
        self.doc
            .node(self.mount)
            .ok_or(AppError::Dom(DomError::StaleNode(self.mount)))
    }

    fn render(&self, ctx: &AppContext<Msg>, model: &M) -> Result<(), AppError> {
        let mount = self.mount()?;
        let view = (self.view)(ctx, model);
        render::show(&mount, view)?;
        Ok(())
    }
}

impl<M: 'static, Msg: 'static> Dispatch<Msg> for AppInner<M, Msg> {
    fn enqueue(&self, msg: Msg) -> bool {
        self.queue.borrow_mut().push_back(msg);
        self.state.get() == AppState::Mounted
    }

    fn drain(&self, ctx: &AppContext<Msg>) -> Result<(), AppError> {
        let _guard = CycleGuard::enter(&self.state);
        loop {
            let msg = self.queue.borrow_mut().pop_front();
            let Some(msg) = msg else {
                return Ok(());
            };
            let queued = self.queue.borrow().len();
            let _span = debug_span!("wecco.app.cycle", queued).entered();
            let current = Rc::clone(&self.model.borrow());
            let next = Rc::new((self.update)(ctx, &current, msg));
            *self.model.borrow_mut() = Rc::clone(&next);
            self.cycles.set(self.cycles.get() + 1);
            self.render(ctx, &next)?;
        }
    }
}

/// Handed to `update` and `view`; emits messages into the application.
pub struct AppContext<Msg> {
    inner: Rc<dyn Dispatch<Msg>>,
}

impl<Msg> Clone for AppContext<Msg> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<Msg> fmt::Debug for AppContext<Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl<Msg: 'static> AppContext<Msg> {
    /// Process `msg`.
    ///
    /// Outside a cycle this runs the cycle for `msg`, and for anything
    /// emitted meanwhile, before returning. Inside a cycle the message is
    /// queued and `Ok(())` is returned at once.
    ///
    /// If a render fails the error is returned and messages still queued
    /// stay queued until the next emit.
    pub fn emit(&self, msg: Msg) -> Result<(), AppError> {
        if self.inner.enqueue(msg) {
            self.inner.drain(self)
        } else {
            Ok(())
        }
    }

    /// An event handler that emits a clone of `msg`. Errors are logged.
    pub fn handler(&self, msg: Msg) -> EventHandler
    where
        Msg: Clone,
    {
        let ctx = self.clone();
        EventHandler::new(move |_| {
            if let Err(err) = ctx.emit(msg.clone()) {
                error!(error = %err, "message emitted by event handler failed");
            }
        })
    }
}

/// A running application.
pub struct App<M, Msg> {
    inner: Rc<AppInner<M, Msg>>,
}

impl<M, Msg> fmt::Debug for App<M, Msg> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("mount", &self.inner.mount)
            .field("state", &self.inner.state.get())
            .field("cycles", &self.inner.cycles.get())
            .finish()
    }
}

impl<M: 'static, Msg: 'static> App<M, Msg> {
    #[must_use]
    pub fn context(&self) -> AppContext<Msg> {
        AppContext {
            inner: Rc::clone(&self.inner) as Rc<dyn Dispatch<Msg>>,
        }
    }

    /// Same as [`AppContext::emit`].
    pub fn emit(&self, msg: Msg) -> Result<(), AppError> {
        self.context().emit(msg)
    }

    /// Read-only access to the current model.
    pub fn with_model<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        let model = Rc::clone(&self.inner.model.borrow());
        f(&model)
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.inner.state.get()
    }

    /// Number of completed update cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.inner.cycles.get()
    }

    /// The mount element, unless it has been freed.
    #[must_use]
    pub fn mount(&self) -> Option<Node> {
        self.inner.doc.node(self.inner.mount)
    }

    /// Messages waiting to be processed.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.queue.borrow().len()
    }
}

/// Start an application on the element `selector` resolves to below the
/// body of `doc`, and render it once.
///
/// ```
/// use wecco_dom::Document;
/// use wecco_html::html;
/// use wecco_runtime::app;
///
/// let doc = Document::new();
/// doc.body().set_inner_html(r#"<div id="app"></div>"#).unwrap();
///
/// let counter = app(
///     &doc,
///     || 0_u32,
///     |_ctx, count, step: u32| count + step,
///     |_ctx, count| html!("<p>count = " {*count} "</p>"),
///     "#app",
/// )
/// .unwrap();
///
/// counter.emit(2).unwrap();
/// assert_eq!(counter.with_model(|m| *m), 2);
/// assert_eq!(counter.mount().unwrap().text_content(), "count = 2");
/// ```
pub fn app<M, Msg, V>(
    doc: &Document,
    model: impl FnOnce() -> M,
    update: impl Fn(&AppContext<Msg>, &M, Msg) -> M + 'static,
    view: impl Fn(&AppContext<Msg>, &M) -> V + 'static,
    selector: impl Into<ElementSelector>,
) -> Result<App<M, Msg>, AppError>
where
    M: 'static,
    Msg: 'static,
    V: Into<ElementUpdate>,
{
    let selector = selector.into();
    let mount = doc
        .resolve(&selector, None)?
        .ok_or_else(|| AppError::mount_not_found(&selector))?;

    let inner = Rc::new(AppInner {
        doc: doc.downgrade(),
        mount: mount.id(),
        model: RefCell::new(Rc::new(model())),
        queue: RefCell::new(VecDeque::new()),
        state: Cell::new(AppState::Uninitialized),
        cycles: Cell::new(0),
        update: Box::new(update),
        view: Box::new(move |ctx: &AppContext<Msg>, model: &M| view(ctx, model).into()),
    });
    let app = App { inner };
    let ctx = app.context();

    {
        // Emits during the first render queue behind it.
        let _guard = CycleGuard::enter(&app.inner.state);
        let _span = debug_span!("wecco.app.cycle", queued = 0_usize).entered();
        let model = Rc::clone(&app.inner.model.borrow());
        app.inner.render(&ctx, &model)?;
    }
    info!(mount = %mount.id(), "application mounted");

    if app.queued() > 0 {
        debug!(queued = app.queued(), "draining messages emitted during first render");
        app.inner.drain(&ctx)?;
    }
    Ok(app)
}
