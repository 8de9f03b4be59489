#![forbid(unsafe_code)]

//! Templates and slot classification.
//!
//! A [`Template`] is the result of one `html!` invocation: the static
//! fragments plus one [`Value`] per slot between them. Classification scans
//! the fragments with a small HTML state machine and decides, for every
//! slot, whether it sits in content, in an attribute value, in a `?boolean`
//! attribute or in an `@event` attribute. The same scan emits the prototype
//! markup the engine parses into a reusable shape.

use std::borrow::Cow;
use std::rc::Rc;

use wecco_dom::Node;

use crate::engine::Engine;
use crate::error::{RenderError, TemplateError};
use crate::marker::shape_hash;
use crate::update::ElementUpdater;
use crate::value::Value;

/// Where a slot sits in the template markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Between elements.
    Content,
    /// Inside the value of a plain attribute.
    Attribute { name: String },
    /// The value of a `?name` attribute.
    Boolean { name: String },
    /// The value of an `@name` attribute.
    Event { name: String },
}

/// A compiled, not yet applied template.
///
/// Templates are immutable; applying one never changes it, so the same
/// template can be applied to any number of targets.
#[derive(Debug, Clone)]
pub struct Template {
    fragments: Rc<[Cow<'static, str>]>,
    values: Vec<Value>,
    hash: u64,
}

impl Template {
    /// Build a template without validating it. Problems with the static
    /// markup are reported when the template is applied.
    pub fn new<I, S>(fragments: I, values: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        let fragments: Rc<[Cow<'static, str>]> = fragments.into_iter().map(Into::into).collect();
        let hash = shape_hash(&fragments);
        Self {
            fragments,
            values,
            hash,
        }
    }

    /// Build and validate a template.
    ///
    /// ```
    /// use wecco_html::{Template, Value};
    ///
    /// let t = Template::compile(["<p>Hello, ", "</p>"], vec![Value::from("world")]).unwrap();
    /// assert_eq!(t.slot_count(), 1);
    /// assert!(Template::compile(["<p ", "></p>"], vec![Value::Empty]).is_err());
    /// ```
    pub fn compile<I, S>(fragments: I, values: Vec<Value>) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        let template = Self::new(fragments, values);
        template.check_arity()?;
        scan(&template.fragments)?;
        Ok(template)
    }

    pub(crate) fn check_arity(&self) -> Result<(), TemplateError> {
        if self.fragments.len() == self.values.len() + 1 {
            Ok(())
        } else {
            Err(TemplateError::FragmentCount {
                fragments: self.fragments.len(),
                values: self.values.len(),
            })
        }
    }

    #[must_use]
    pub fn fragments(&self) -> &[Cow<'static, str>] {
        &self.fragments
    }

    pub(crate) fn shared_fragments(&self) -> Rc<[Cow<'static, str>]> {
        Rc::clone(&self.fragments)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.values.len()
    }

    /// Hash of the static fragments.
    #[must_use]
    pub fn shape_hash(&self) -> u64 {
        self.hash
    }

    /// Slot classification of this template's fragments.
    pub fn slot_kinds(&self) -> Result<Vec<SlotKind>, TemplateError> {
        scan(&self.fragments).map(|scan| scan.kinds)
    }

    /// Render this template into `target`, patching a previous rendering
    /// of the same template when possible.
    pub fn apply_to(&self, target: &Node) -> Result<(), RenderError> {
        Engine::for_document(&target.document()).render(self, target)
    }
}

impl ElementUpdater for Template {
    fn update_element(&self, target: &Node) -> Result<(), RenderError> {
        self.apply_to(target)
    }
}

/// Content slots become comments, attribute slots a delimited index.
pub(crate) const SLOT_COMMENT_PREFIX: &str = "wecco-slot-";
pub(crate) const SENTINEL_OPEN: char = '\u{E000}';
pub(crate) const SENTINEL_CLOSE: char = '\u{E001}';

/// Result of scanning the fragments.
#[derive(Debug)]
pub(crate) struct Scan {
    pub(crate) kinds: Vec<SlotKind>,
    pub(crate) markup: String,
    /// Per fragment: offset in `markup`, offset in the joined fragments,
    /// and length.
    spans: Vec<(usize, usize, usize)>,
}

impl Scan {
    /// Map an offset in the rewritten markup back to the joined fragments.
    /// Offsets inside a slot placeholder map to the slot's position.
    pub(crate) fn source_position(&self, position: usize) -> usize {
        let index = self.spans.partition_point(|&(start, _, _)| start <= position);
        match index.checked_sub(1).and_then(|i| self.spans.get(i)) {
            Some(&(start, source, len)) => source + (position - start).min(len),
            None => 0,
        }
    }
}

#[derive(Debug)]
enum State {
    Text,
    /// Just after `<`.
    TagOpen,
    /// After `<!`, deciding between a comment and a bogus declaration.
    Declaration { dashes: usize },
    Comment { dashes: usize },
    /// `<!DOCTYPE ...>` and friends, skipped up to `>`.
    Bogus,
    TagName { closing: bool },
    /// Rest of a closing tag up to `>`.
    EndTag,
    InTag,
    AttrName { name: String },
    AfterAttrName { name: String },
    BeforeValue { name: String },
    Value {
        name: String,
        quote: Option<char>,
        slots: usize,
        text: bool,
    },
    RawText,
}

struct Scanner {
    state: State,
    tag: String,
    raw_tag: Option<String>,
    raw_buffer: String,
    kinds: Vec<SlotKind>,
    markup: String,
}

fn is_directive(name: &str) -> bool {
    name.starts_with('?') || name.starts_with('@')
}

impl Scanner {
    fn new(capacity: usize) -> Self {
        Self {
            state: State::Text,
            tag: String::new(),
            raw_tag: None,
            raw_buffer: String::new(),
            kinds: Vec::new(),
            markup: String::with_capacity(capacity),
        }
    }

    /// End of an attribute. `value` is `None` for bare attributes, else
    /// `(slots, has_static_text)`.
    fn finish_attribute(name: &str, value: Option<(usize, bool)>) -> Result<(), TemplateError> {
        if !is_directive(name) {
            return Ok(());
        }
        match value {
            Some((1, false)) if name.len() > 1 => Ok(()),
            _ => Err(TemplateError::DirectiveValue {
                name: name.to_string(),
            }),
        }
    }

    fn close_tag(&mut self, closing: bool) {
        let tag = self.tag.to_ascii_lowercase();
        if !closing && wecco_dom::parser::is_raw_text_element(&tag) {
            self.raw_tag = Some(tag);
            self.raw_buffer.clear();
            self.state = State::RawText;
        } else {
            self.state = State::Text;
        }
    }

    fn feed(&mut self, ch: char) -> Result<(), TemplateError> {
        self.markup.push(ch);
        let state = std::mem::replace(&mut self.state, State::Text);
        self.state = match state {
            State::Text => {
                if ch == '<' {
                    State::TagOpen
                } else {
                    State::Text
                }
            }
            State::TagOpen => match ch {
                '!' => State::Declaration { dashes: 0 },
                '/' => {
                    self.tag.clear();
                    State::TagName { closing: true }
                }
                c if c.is_ascii_alphabetic() => {
                    self.tag.clear();
                    self.tag.push(c);
                    State::TagName { closing: false }
                }
                '<' => State::TagOpen,
                _ => State::Text,
            },
            State::Declaration { dashes } => match (ch, dashes) {
                ('-', 0) => State::Declaration { dashes: 1 },
                ('-', _) => State::Comment { dashes: 0 },
                ('>', _) => State::Text,
                _ => State::Bogus,
            },
            State::Comment { dashes } => match ch {
                '-' => State::Comment { dashes: dashes + 1 },
                '>' if dashes >= 2 => State::Text,
                _ => State::Comment { dashes: 0 },
            },
            State::Bogus => {
                if ch == '>' {
                    State::Text
                } else {
                    State::Bogus
                }
            }
            State::TagName { closing } => match ch {
                c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.') => {
                    self.tag.push(c);
                    State::TagName { closing }
                }
                '>' => {
                    self.close_tag(closing);
                    return Ok(());
                }
                _ if closing => State::EndTag,
                _ => State::InTag,
            },
            State::EndTag => {
                if ch == '>' {
                    State::Text
                } else {
                    State::EndTag
                }
            }
            State::InTag => match ch {
                c if c.is_whitespace() || c == '/' => State::InTag,
                '>' => {
                    self.close_tag(false);
                    return Ok(());
                }
                c => State::AttrName {
                    name: c.to_string(),
                },
            },
            State::AttrName { mut name } => match ch {
                c if c.is_whitespace() => State::AfterAttrName { name },
                '=' => State::BeforeValue { name },
                '>' => {
                    Self::finish_attribute(&name, None)?;
                    self.close_tag(false);
                    return Ok(());
                }
                '/' => {
                    Self::finish_attribute(&name, None)?;
                    State::InTag
                }
                c => {
                    name.push(c);
                    State::AttrName { name }
                }
            },
            State::AfterAttrName { name } => match ch {
                c if c.is_whitespace() => State::AfterAttrName { name },
                '=' => State::BeforeValue { name },
                '>' => {
                    Self::finish_attribute(&name, None)?;
                    self.close_tag(false);
                    return Ok(());
                }
                c => {
                    Self::finish_attribute(&name, None)?;
                    State::AttrName {
                        name: c.to_string(),
                    }
                }
            },
            State::BeforeValue { name } => match ch {
                c if c.is_whitespace() => State::BeforeValue { name },
                '"' | '\'' => State::Value {
                    name,
                    quote: Some(ch),
                    slots: 0,
                    text: false,
                },
                '>' => {
                    Self::finish_attribute(&name, Some((0, false)))?;
                    self.close_tag(false);
                    return Ok(());
                }
                _ => State::Value {
                    name,
                    quote: None,
                    slots: 0,
                    text: true,
                },
            },
            State::Value {
                name,
                quote,
                slots,
                text,
            } => match quote {
                Some(q) if ch == q => {
                    Self::finish_attribute(&name, Some((slots, text)))?;
                    State::InTag
                }
                Some(_) => State::Value {
                    name,
                    quote,
                    slots,
                    text: true,
                },
                None if ch.is_whitespace() => {
                    Self::finish_attribute(&name, Some((slots, text)))?;
                    State::InTag
                }
                None if ch == '>' => {
                    Self::finish_attribute(&name, Some((slots, text)))?;
                    self.close_tag(false);
                    return Ok(());
                }
                None => State::Value {
                    name,
                    quote,
                    slots,
                    text: true,
                },
            },
            State::RawText => {
                self.raw_buffer.push(ch.to_ascii_lowercase());
                let done = self
                    .raw_tag
                    .as_ref()
                    .is_some_and(|tag| self.raw_buffer.ends_with(&format!("</{tag}")));
                if done {
                    self.raw_tag = None;
                    State::EndTag
                } else {
                    State::RawText
                }
            }
        };
        Ok(())
    }

    fn slot(&mut self, slot: usize) -> Result<(), TemplateError> {
        let state = std::mem::replace(&mut self.state, State::Text);
        let (kind, next) = match state {
            State::Text | State::TagOpen => (SlotKind::Content, State::Text),
            State::Declaration { .. } | State::Comment { .. } | State::Bogus => {
                return Err(TemplateError::SlotInComment { slot });
            }
            State::RawText => return Err(TemplateError::SlotInRawText { slot }),
            State::TagName { .. }
            | State::EndTag
            | State::InTag
            | State::AttrName { .. }
            | State::AfterAttrName { .. } => return Err(TemplateError::SlotInTag { slot }),
            State::BeforeValue { name } => (
                attribute_kind(&name),
                State::Value {
                    name,
                    quote: None,
                    slots: 1,
                    text: false,
                },
            ),
            State::Value {
                name,
                quote,
                slots,
                text,
            } => (
                attribute_kind(&name),
                State::Value {
                    name,
                    quote,
                    slots: slots + 1,
                    text,
                },
            ),
        };
        match kind {
            SlotKind::Content => {
                self.markup.push_str("<!--");
                self.markup.push_str(SLOT_COMMENT_PREFIX);
                self.markup.push_str(&slot.to_string());
                self.markup.push_str("-->");
            }
            _ => {
                self.markup.push(SENTINEL_OPEN);
                self.markup.push_str(&slot.to_string());
                self.markup.push(SENTINEL_CLOSE);
            }
        }
        self.kinds.push(kind);
        self.state = next;
        Ok(())
    }
}

fn attribute_kind(name: &str) -> SlotKind {
    if let Some(name) = name.strip_prefix('?') {
        SlotKind::Boolean {
            name: name.to_ascii_lowercase(),
        }
    } else if let Some(name) = name.strip_prefix('@') {
        SlotKind::Event {
            name: name.to_string(),
        }
    } else {
        SlotKind::Attribute {
            name: name.to_ascii_lowercase(),
        }
    }
}

/// Classify every slot and build the prototype markup.
pub(crate) fn scan<S: AsRef<str>>(fragments: &[S]) -> Result<Scan, TemplateError> {
    let capacity = fragments.iter().map(|f| f.as_ref().len() + 16).sum();
    let mut scanner = Scanner::new(capacity);
    let mut spans = Vec::with_capacity(fragments.len());
    let mut source = 0;
    for (index, fragment) in fragments.iter().enumerate() {
        if index > 0 {
            scanner.slot(index - 1)?;
        }
        let fragment = fragment.as_ref();
        spans.push((scanner.markup.len(), source, fragment.len()));
        source += fragment.len();
        for ch in fragment.chars() {
            scanner.feed(ch)?;
        }
    }
    Ok(Scan {
        kinds: scanner.kinds,
        markup: scanner.markup,
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(fragments: &[&str]) -> Result<Vec<SlotKind>, TemplateError> {
        scan(fragments).map(|s| s.kinds)
    }

    fn attr(name: &str) -> SlotKind {
        SlotKind::Attribute { name: name.into() }
    }

    #[test]
    fn classifies_content_slots() {
        assert_eq!(
            kinds(&["<p>", "", "</p>", ""]).unwrap(),
            vec![SlotKind::Content, SlotKind::Content, SlotKind::Content]
        );
    }

    #[test]
    fn classifies_attribute_slots() {
        assert_eq!(
            kinds(&["<p class=", " id=\"x-", "\" title='", " ", "'>", "</p>"]).unwrap(),
            vec![attr("class"), attr("id"), attr("title"), attr("title"), SlotKind::Content]
        );
    }

    #[test]
    fn classifies_directives() {
        assert_eq!(
            kinds(&["<a ?disabled=", " @click=\"", "\">go</a>"]).unwrap(),
            vec![
                SlotKind::Boolean {
                    name: "disabled".into()
                },
                SlotKind::Event {
                    name: "click".into()
                }
            ]
        );
    }

    #[test]
    fn event_names_keep_case() {
        assert_eq!(
            kinds(&["<x-a @renderingComplete=", "></x-a>"]).unwrap(),
            vec![SlotKind::Event {
                name: "renderingComplete".into()
            }]
        );
    }

    #[test]
    fn rejects_misplaced_slots() {
        assert_eq!(
            kinds(&["<p ", "></p>"]),
            Err(TemplateError::SlotInTag { slot: 0 })
        );
        assert_eq!(
            kinds(&["<p>", "<!-- ", " --></p>"]),
            Err(TemplateError::SlotInComment { slot: 1 })
        );
        assert_eq!(
            kinds(&["<script>let x = ", ";</script>"]),
            Err(TemplateError::SlotInRawText { slot: 0 })
        );
        assert_eq!(
            kinds(&["<a ?disabled=\"x", "\"></a>"]),
            Err(TemplateError::DirectiveValue {
                name: "?disabled".into()
            })
        );
        assert_eq!(
            kinds(&["<a @click=\"", " ", "\"></a>"]),
            Err(TemplateError::DirectiveValue {
                name: "@click".into()
            })
        );
        assert_eq!(
            kinds(&["<a ?hidden>", "</a>"]),
            Err(TemplateError::DirectiveValue {
                name: "?hidden".into()
            })
        );
    }

    #[test]
    fn slots_after_raw_text_are_content() {
        assert_eq!(
            kinds(&["<style>p { color: red }</style>", ""]).unwrap(),
            vec![SlotKind::Content]
        );
    }

    #[test]
    fn stray_angle_bracket_keeps_content() {
        assert_eq!(kinds(&["1 <", " 2"]).unwrap(), vec![SlotKind::Content]);
    }

    #[test]
    fn prototype_markup() {
        let scan = scan(&["<p class=", ">", "</p>"]).unwrap();
        assert_eq!(scan.markup, "<p class=\u{E000}0\u{E001}><!--wecco-slot-1--></p>");
    }

    #[test]
    fn compile_checks_arity() {
        assert_eq!(
            Template::compile(["<p>", "</p>"], vec![]).unwrap_err(),
            TemplateError::FragmentCount {
                fragments: 2,
                values: 0
            }
        );
    }
}
