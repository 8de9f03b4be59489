#![forbid(unsafe_code)]

//! DOM error type.

use crate::node::NodeId;
use crate::parser::ParseError;

/// Errors produced by DOM operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node was freed; the handle outlived it.
    StaleNode(NodeId),
    /// An element-only operation was applied to another node type.
    NotAnElement(NodeId),
    /// The node cannot have children (text, comment).
    NotAContainer(NodeId),
    /// Inserting `child` under `parent` would create a cycle or put a
    /// document node inside another node.
    HierarchyRequest { parent: NodeId, child: NodeId },
    /// `child` is not a child of `parent`.
    NotAChild { parent: NodeId, child: NodeId },
    /// The node belongs to a different document.
    ForeignNode(NodeId),
    /// The selector string could not be parsed.
    InvalidSelector(String),
    /// Custom element names must contain a hyphen.
    InvalidCustomElementName(String),
    /// Lifecycle hooks are already registered for this tag.
    AlreadyDefined(String),
    /// Markup could not be parsed.
    Parse(ParseError),
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleNode(id) => write!(f, "node {id} has been freed"),
            Self::NotAnElement(id) => write!(f, "node {id} is not an element"),
            Self::NotAContainer(id) => write!(f, "node {id} cannot have children"),
            Self::HierarchyRequest { parent, child } => {
                write!(f, "cannot insert node {child} into node {parent}")
            }
            Self::NotAChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
            Self::ForeignNode(id) => write!(f, "node {id} belongs to another document"),
            Self::InvalidSelector(sel) => write!(f, "invalid selector '{sel}'"),
            Self::InvalidCustomElementName(name) => {
                write!(f, "'{name}' is not a valid custom element name")
            }
            Self::AlreadyDefined(name) => write!(f, "'{name}' has already been defined"),
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for DomError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}
