#![forbid(unsafe_code)]

//! Runtime errors.

use wecco_dom::{DomError, ElementSelector};
use wecco_html::RenderError;

/// Errors raised by the component and application runtimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The mount selector matched nothing.
    MountNotFound(String),
    /// Rendering the view failed.
    Render(RenderError),
    /// A DOM operation outside rendering failed, e.g. an invalid tag name
    /// passed to `define` or a selector that does not parse.
    Dom(DomError),
}

impl AppError {
    pub(crate) fn mount_not_found(selector: &ElementSelector) -> Self {
        match selector {
            ElementSelector::Query(query) => Self::MountNotFound(query.clone()),
            ElementSelector::Element(node) => Self::MountNotFound(node.id().to_string()),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MountNotFound(selector) => write!(f, "no element found for mount point {selector}"),
            Self::Render(err) => write!(f, "render failed: {err}"),
            Self::Dom(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            Self::Dom(err) => Some(err),
            Self::MountNotFound(_) => None,
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<DomError> for AppError {
    fn from(err: DomError) -> Self {
        Self::Dom(err)
    }
}
