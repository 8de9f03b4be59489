#![forbid(unsafe_code)]

//! Runtimes for wecco.
//!
//! # Key Components
//!
//! - [`define`] / [`ComponentFactory`] - custom element components with
//!   private data and coalesced re-rendering
//! - [`app`] / [`App`] - one model, an `update` function and a `view`
//!   function driven by emitted messages
//! - [`Scheduler`] - how deferred component renders are run
//!
//! # Role in wecco
//! `wecco-runtime` decides *when* to render. What to render is described
//! with `wecco-html` templates; the DOM itself lives in `wecco-dom`.
//!
//! Everything is single-threaded. No `RefCell` borrow is held while user
//! code (render functions, `update`, `view`, event handlers) runs, so user
//! code may emit messages or set component data at any time.

pub mod app;
pub mod component;
pub mod error;
mod render;
pub mod scheduler;

pub use app::{App, AppContext, AppState, app};
pub use component::{
    Component, ComponentConfig, ComponentContext, ComponentFactory, RENDERING_COMPLETE, RenderFn,
    define, define_with_config,
};
pub use error::AppError;
pub use scheduler::{ImmediateScheduler, Scheduler, Task, TickScheduler};
