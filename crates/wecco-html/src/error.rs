#![forbid(unsafe_code)]

//! Template and render errors.

use wecco_dom::{DomError, ParseError};

/// A template whose static markup cannot host its slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Fragment count must be one more than the number of values.
    FragmentCount { fragments: usize, values: usize },
    /// A slot inside a tag but outside an attribute value, e.g. `<p {x}>`.
    SlotInTag { slot: usize },
    /// A slot inside a comment.
    SlotInComment { slot: usize },
    /// A slot inside `<script>` or `<style>`.
    SlotInRawText { slot: usize },
    /// A `?name` or `@name` attribute whose value is not exactly one slot.
    DirectiveValue { name: String },
    /// The slot did not survive parsing, e.g. because of a duplicate
    /// attribute name.
    LostSlot { slot: usize },
    /// The prototype markup could not be parsed.
    Parse(ParseError),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FragmentCount { fragments, values } => write!(
                f,
                "template has {fragments} fragments for {values} values (expected {})",
                values + 1
            ),
            Self::SlotInTag { slot } => {
                write!(f, "slot {slot} is inside a tag but not in an attribute value")
            }
            Self::SlotInComment { slot } => write!(f, "slot {slot} is inside a comment"),
            Self::SlotInRawText { slot } => {
                write!(f, "slot {slot} is inside a script or style element")
            }
            Self::DirectiveValue { name } => write!(
                f,
                "attribute '{name}' must have exactly one slot as its value"
            ),
            Self::LostSlot { slot } => write!(f, "slot {slot} does not appear in the parsed template"),
            Self::Parse(err) => write!(f, "template markup: {err}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while applying an update to the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    Dom(DomError),
    /// Markup given as a value could not be parsed.
    Parse(ParseError),
    Template(TemplateError),
    /// An event slot received something other than a handler.
    NotAHandler { slot: usize },
    /// A handler was placed in a content position.
    HandlerInContent { slot: usize },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dom(err) => write!(f, "{err}"),
            Self::Parse(err) => write!(f, "{err}"),
            Self::Template(err) => write!(f, "invalid template: {err}"),
            Self::NotAHandler { slot } => write!(f, "event slot {slot} requires an event handler"),
            Self::HandlerInContent { slot } => {
                write!(f, "slot {slot} holds an event handler in a content position")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Template(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomError> for RenderError {
    fn from(err: DomError) -> Self {
        // Parse failures surface verbatim regardless of the layer reporting them.
        match err {
            DomError::Parse(err) => Self::Parse(err),
            other => Self::Dom(other),
        }
    }
}

impl From<ParseError> for RenderError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<TemplateError> for RenderError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Parse(err) => Self::Parse(err),
            other => Self::Template(other),
        }
    }
}
