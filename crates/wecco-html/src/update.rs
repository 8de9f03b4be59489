#![forbid(unsafe_code)]

//! Update dispatcher.
//!
//! [`update_element`] is the single entry point through which anything
//! renderable reaches the DOM: markup strings, existing nodes, templates,
//! plain functions and sequences of these.

use std::fmt;
use std::rc::Rc;

use wecco_dom::Node;
use wecco_dom::parser::parse_fragment;

use crate::error::RenderError;
use crate::template::Template;

/// Something that knows how to update an element.
pub trait ElementUpdater {
    fn update_element(&self, target: &Node) -> Result<(), RenderError>;
}

/// A function update.
pub type UpdateFn = Rc<dyn Fn(&Node) -> Result<(), RenderError>>;

/// A request to update an element.
#[derive(Clone)]
pub enum ElementUpdate {
    /// Applied in order against the same target.
    Sequence(Vec<ElementUpdate>),
    /// Parsed and appended.
    Markup(String),
    /// Moved into the target.
    Element(Node),
    Updater(Rc<dyn ElementUpdater>),
    Function(UpdateFn),
}

impl ElementUpdate {
    pub fn function(f: impl Fn(&Node) -> Result<(), RenderError> + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    #[must_use]
    pub fn is_updater(&self) -> bool {
        matches!(self, Self::Updater(_))
    }
}

impl fmt::Debug for ElementUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Self::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            Self::Element(node) => f.debug_tuple("Element").field(node).finish(),
            Self::Updater(_) => f.write_str("Updater(..)"),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<Template> for ElementUpdate {
    fn from(template: Template) -> Self {
        Self::Updater(Rc::new(template))
    }
}

impl From<&str> for ElementUpdate {
    fn from(markup: &str) -> Self {
        Self::Markup(markup.to_string())
    }
}

impl From<String> for ElementUpdate {
    fn from(markup: String) -> Self {
        Self::Markup(markup)
    }
}

impl From<Node> for ElementUpdate {
    fn from(node: Node) -> Self {
        Self::Element(node)
    }
}

impl<T: Into<ElementUpdate>> From<Vec<T>> for ElementUpdate {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Apply `request` to `target`.
///
/// ```
/// use wecco_dom::Document;
/// use wecco_html::update_element;
///
/// let doc = Document::new();
/// let body = doc.body();
/// update_element(&body, vec!["<b>one</b>", " two"]).unwrap();
/// assert_eq!(body.inner_html(), "<b>one</b> two");
/// ```
pub fn update_element(target: &Node, request: impl Into<ElementUpdate>) -> Result<(), RenderError> {
    dispatch(target, &request.into())
}

pub(crate) fn dispatch(target: &Node, request: &ElementUpdate) -> Result<(), RenderError> {
    match request {
        ElementUpdate::Sequence(items) => {
            for item in items {
                dispatch(target, item)?;
            }
            Ok(())
        }
        ElementUpdate::Markup(markup) => {
            let parsed = parse_fragment(markup)?;
            let fragment = target.document().build_fragment(&parsed)?;
            target.append_child(&fragment)?;
            Ok(())
        }
        ElementUpdate::Element(node) => Ok(target.append_child(node)?),
        ElementUpdate::Updater(updater) => updater.update_element(target),
        ElementUpdate::Function(f) => f(target),
    }
}
