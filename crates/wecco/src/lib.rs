#![forbid(unsafe_code)]

//! wecco public facade crate.
//!
//! Re-exports the types an application needs from the internal crates and
//! offers a prelude for day-to-day usage.
//!
//! ```
//! use wecco::prelude::*;
//!
//! let doc = Document::new();
//! doc.body().set_inner_html(r#"<div id="app"></div>"#)?;
//!
//! let counter = app(
//!     &doc,
//!     || 0_u32,
//!     |_ctx, count, (): ()| count + 1,
//!     |ctx, count| html!("<button @click=" {ctx.handler(())} ">" {*count} "</button>"),
//!     "#app",
//! )?;
//! let button = doc.query_selector("#app button")?.expect("rendered");
//! button.dispatch_event(&Event::new("click"));
//! assert_eq!(counter.with_model(|c| *c), 1);
//! # Ok::<(), wecco::Error>(())
//! ```

use std::fmt;

// --- DOM re-exports --------------------------------------------------------

pub use wecco_dom::{
    Document, DocumentConfig, DomError, ElementSelector, Event, EventHandler, LifecycleHooks,
    ListenerFlags, ListenerId, Node, NodeId, NodeType, ParseError, parse_fragment,
};

// --- Template re-exports ---------------------------------------------------

pub use wecco_html::{
    CachePolicy, CacheStats, ElementUpdate, ElementUpdater, Engine, EngineConfig, RenderError,
    Template, TemplateError, UpdateFn, Value, html, update_element,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use wecco_runtime::{
    App, AppContext, AppError, AppState, Component, ComponentConfig, ComponentContext,
    ComponentFactory, ImmediateScheduler, RENDERING_COMPLETE, Scheduler, TickScheduler, app,
    define, define_with_config,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for wecco apps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// DOM mutation, selector or markup failure.
    Dom(DomError),
    /// Template compile or render failure.
    Render(RenderError),
    /// Application or component runtime failure.
    #[cfg(feature = "runtime")]
    App(AppError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dom(err) => write!(f, "{err}"),
            Self::Render(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::App(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            Self::Render(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::App(err) => Some(err),
        }
    }
}

impl From<DomError> for Error {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

#[cfg(feature = "runtime")]
impl From<AppError> for Error {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

/// Standard result type for wecco APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Document, ElementSelector, ElementUpdate, Error, Event, EventHandler, ListenerFlags, Node,
        Result, Template, html, update_element,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{App, AppContext, ComponentContext, ComponentFactory, app, define};

    pub use crate::{dom, template};

    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use wecco_dom as dom;
pub use wecco_html as template;
#[cfg(feature = "runtime")]
pub use wecco_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_convert_into_facade_error() {
        let err: Error = RenderError::NotAHandler { slot: 2 }.into();
        assert!(matches!(err, Error::Render(RenderError::NotAHandler { slot: 2 })));
        assert_eq!(err.to_string(), RenderError::NotAHandler { slot: 2 }.to_string());
    }

    #[cfg(feature = "runtime")]
    #[test]
    fn app_errors_keep_their_message() {
        let err: Error = AppError::MountNotFound("#app".into()).into();
        assert!(err.to_string().contains("#app"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
