#![forbid(unsafe_code)]

//! Parsed template shapes.
//!
//! A shape is everything about a template that depends only on its static
//! fragments: the slot classification, the prototype node tree with slot
//! positions resolved, and the identity marker. Shapes are built once per
//! distinct fragment sequence and shared through the engine's cache.

use std::borrow::Cow;
use std::rc::Rc;

use wecco_dom::parser::{ParsedNode, parse_fragment};

use crate::error::TemplateError;
use crate::marker::marker_for_hash;
use crate::template::{SENTINEL_CLOSE, SENTINEL_OPEN, SLOT_COMMENT_PREFIX, SlotKind, Template, scan};

/// A piece of an interpolated attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Part {
    Static(String),
    Slot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProtoAttr {
    Static { name: String, value: String },
    Interpolated { name: String, parts: Rc<[Part]> },
    Boolean { name: String, slot: usize },
    Event { name: String, slot: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProtoNode {
    Element {
        tag: String,
        attributes: Vec<ProtoAttr>,
        children: Vec<ProtoNode>,
        /// Owns a binding and therefore carries the marker.
        marked: bool,
    },
    Text(String),
    Comment(String),
    Slot(usize),
}

#[derive(Debug)]
pub(crate) struct Shape {
    pub(crate) hash: u64,
    pub(crate) fragments: Rc<[Cow<'static, str>]>,
    pub(crate) kinds: Vec<SlotKind>,
    pub(crate) nodes: Vec<ProtoNode>,
    pub(crate) marker: Option<String>,
}

impl Shape {
    pub(crate) fn build(template: &Template) -> Result<Self, TemplateError> {
        template.check_arity()?;
        let scan = scan(template.fragments())?;
        let parsed = parse_fragment(&scan.markup).map_err(|err| {
            let position = scan.source_position(err.position());
            TemplateError::Parse(err.with_position(position))
        })?;

        let mut builder = Builder {
            kinds: &scan.kinds,
            seen: vec![false; scan.kinds.len()],
            marked_any: false,
        };
        let nodes = builder.convert(&parsed)?;
        if let Some(slot) = builder.seen.iter().position(|seen| !seen) {
            return Err(TemplateError::LostSlot { slot });
        }

        let marker = builder
            .marked_any
            .then(|| marker_for_hash(template.shape_hash()));
        Ok(Self {
            hash: template.shape_hash(),
            fragments: template.shared_fragments(),
            kinds: scan.kinds,
            nodes,
            marker,
        })
    }

    /// `true` if `template` was made from the same fragments.
    pub(crate) fn matches(&self, template: &Template) -> bool {
        self.hash == template.shape_hash() && *self.fragments == *template.fragments()
    }

    pub(crate) fn same_as(&self, other: &Shape) -> bool {
        self.hash == other.hash && self.fragments == other.fragments
    }
}

struct Builder<'a> {
    kinds: &'a [SlotKind],
    seen: Vec<bool>,
    marked_any: bool,
}

impl Builder<'_> {
    fn claim(&mut self, slot: usize) -> Result<usize, TemplateError> {
        match self.seen.get_mut(slot) {
            Some(seen) if !*seen => {
                *seen = true;
                Ok(slot)
            }
            _ => Err(TemplateError::LostSlot { slot }),
        }
    }

    fn convert(&mut self, nodes: &[ParsedNode]) -> Result<Vec<ProtoNode>, TemplateError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            let proto = match node {
                ParsedNode::Text(text) => ProtoNode::Text(text.clone()),
                ParsedNode::Comment(text) => match self.content_slot(text) {
                    Some(slot) => ProtoNode::Slot(self.claim(slot)?),
                    None => ProtoNode::Comment(text.clone()),
                },
                ParsedNode::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    let children = self.convert(children)?;
                    let mut protos = Vec::with_capacity(attributes.len());
                    let mut dynamic = false;
                    for (name, value) in attributes {
                        let attr = self.attribute(name, value)?;
                        dynamic |= !matches!(attr, ProtoAttr::Static { .. });
                        protos.push(attr);
                    }
                    let marked = dynamic || children.iter().any(|c| matches!(c, ProtoNode::Slot(_)));
                    self.marked_any |= marked;
                    ProtoNode::Element {
                        tag: tag.clone(),
                        attributes: protos,
                        children,
                        marked,
                    }
                }
            };
            out.push(proto);
        }
        Ok(out)
    }

    fn content_slot(&self, comment: &str) -> Option<usize> {
        let slot: usize = comment.strip_prefix(SLOT_COMMENT_PREFIX)?.parse().ok()?;
        matches!(self.kinds.get(slot), Some(SlotKind::Content)).then_some(slot)
    }

    fn attribute(&mut self, name: &str, value: &str) -> Result<ProtoAttr, TemplateError> {
        if !value.contains(SENTINEL_OPEN) {
            return Ok(ProtoAttr::Static {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        let parts = split_parts(value);
        let first_slot = parts.iter().find_map(|part| match part {
            Part::Slot(slot) => Some(*slot),
            Part::Static(_) => None,
        });

        match (first_slot.and_then(|slot| self.kinds.get(slot)), first_slot) {
            (Some(SlotKind::Boolean { name }), Some(slot)) => Ok(ProtoAttr::Boolean {
                name: name.clone(),
                slot: self.claim(slot)?,
            }),
            (Some(SlotKind::Event { name }), Some(slot)) => Ok(ProtoAttr::Event {
                name: name.clone(),
                slot: self.claim(slot)?,
            }),
            _ => {
                for part in &parts {
                    if let Part::Slot(slot) = part {
                        self.claim(*slot)?;
                    }
                }
                Ok(ProtoAttr::Interpolated {
                    name: name.to_string(),
                    parts: parts.into(),
                })
            }
        }
    }
}

/// Split an attribute value into static text and slot references.
fn split_parts(value: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find(SENTINEL_OPEN) {
        let after = &rest[open + SENTINEL_OPEN.len_utf8()..];
        let Some(close) = after.find(SENTINEL_CLOSE) else {
            break;
        };
        let Ok(slot) = after[..close].parse::<usize>() else {
            break;
        };
        if open > 0 {
            parts.push(Part::Static(rest[..open].to_string()));
        }
        parts.push(Part::Slot(slot));
        rest = &after[close + SENTINEL_CLOSE.len_utf8()..];
    }
    if !rest.is_empty() {
        parts.push(Part::Static(rest.to_string()));
    }
    parts
}
