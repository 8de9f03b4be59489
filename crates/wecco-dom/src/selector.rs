#![forbid(unsafe_code)]

//! CSS selectors.
//!
//! Supports comma separated lists of complex selectors built from compound
//! selectors (`tag`, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`) joined
//! by the descendant (whitespace) and child (`>`) combinators. Matching runs
//! right to left.

use crate::document::Arena;
use crate::error::DomError;
use crate::node::{Node, NodeId};

/// How an element is located: by query or directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementSelector {
    /// A selector matched against the descendants of a parent element.
    Query(String),
    /// A concrete element.
    Element(Node),
}

impl From<&str> for ElementSelector {
    fn from(query: &str) -> Self {
        Self::Query(query.to_string())
    }
}

impl From<String> for ElementSelector {
    fn from(query: String) -> Self {
        Self::Query(query)
    }
}

impl From<Node> for ElementSelector {
    fn from(node: Node) -> Self {
        Self::Element(node)
    }
}

impl From<&Node> for ElementSelector {
    fn from(node: &Node) -> Self {
        Self::Element(node.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, arena: &Arena, id: NodeId) -> bool {
        let Ok(el) = arena.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag
            && *tag != el.tag
        {
            return false;
        }
        if let Some(wanted) = &self.id
            && el.attribute("id") != Some(wanted.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = el.attribute("class").unwrap_or("");
            let present = classes.split_ascii_whitespace();
            if !self
                .classes
                .iter()
                .all(|class| present.clone().any(|c| c == class))
            {
                return false;
            }
        }
        self.attributes.iter().all(|attr| match (&attr.value, el.attribute(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(wanted), Some(actual)) => wanted == actual,
        })
    }
}

/// A compound selector chain; `combinators[i]` joins `compounds[i]` and
/// `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches_at(&self, arena: &Arena, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(arena, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let parent = |node: NodeId| arena.get(node).ok().and_then(|data| data.parent);
        match self.combinators[index - 1] {
            Combinator::Child => parent(id).is_some_and(|p| self.matches_at(arena, p, index - 1)),
            Combinator::Descendant => {
                let mut current = parent(id);
                while let Some(ancestor) = current {
                    if self.matches_at(arena, ancestor, index - 1) {
                        return true;
                    }
                    current = parent(ancestor);
                }
                false
            }
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_')
}

struct SelectorParser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser<'_> {
    fn error(&self) -> DomError {
        DomError::InvalidSelector(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> Result<String, DomError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn attribute(&mut self) -> Result<AttributeMatch, DomError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.peek() {
            Some(']') => None,
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != quote) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(self.error());
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    _ => self.ident()?,
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => return Err(self.error()),
        };
        if self.peek() != Some(']') {
            return Err(self.error());
        }
        self.pos += 1;
        Ok(AttributeMatch { name, value })
    }

    fn compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut universal = false;
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(c) if is_ident_char(c) => compound.tag = Some(self.ident()?.to_ascii_lowercase()),
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() && !universal {
            return Err(self.error());
        }
        Ok(compound)
    }

    fn complex(&mut self) -> Result<Complex, DomError> {
        self.skip_whitespace();
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.error()),
            };
            combinators.push(combinator);
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let mut parser = SelectorParser {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let mut alternatives = vec![parser.complex()?];
        while parser.peek() == Some(',') {
            parser.pos += 1;
            alternatives.push(parser.complex()?);
        }
        if parser.peek().is_some() {
            return Err(parser.error());
        }
        Ok(Self { alternatives })
    }

    pub(crate) fn matches(&self, arena: &Arena, id: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches_at(arena, id, complex.compounds.len() - 1))
    }

    /// First matching descendant of `scope` in document order.
    pub(crate) fn query_first(&self, arena: &Arena, scope: NodeId) -> Option<NodeId> {
        arena
            .preorder(scope)
            .into_iter()
            .skip(1)
            .find(|id| self.matches(arena, *id))
    }

    /// All matching descendants of `scope` in document order.
    pub(crate) fn query_all(&self, arena: &Arena, scope: NodeId) -> Vec<NodeId> {
        arena
            .preorder(scope)
            .into_iter()
            .skip(1)
            .filter(|id| self.matches(arena, *id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn fixture() -> Document {
        let doc = Document::new();
        doc.body()
            .set_inner_html(concat!(
                r#"<div id="app" class="shell dark">"#,
                r#"<ul><li class="item first" data-k="1">a</li><li class="item">b</li></ul>"#,
                r#"<p><span data-k="2">c</span></p>"#,
                "</div>"
            ))
            .unwrap();
        doc
    }

    fn tags(nodes: &[Node]) -> Vec<String> {
        nodes.iter().filter_map(Node::tag_name).collect()
    }

    #[test]
    fn simple_selectors() {
        let doc = fixture();
        let body = doc.body();
        assert_eq!(tags(&body.query_selector_all("li").unwrap()), vec!["li", "li"]);
        assert_eq!(tags(&body.query_selector_all("#app").unwrap()), vec!["div"]);
        assert_eq!(body.query_selector_all(".item").unwrap().len(), 2);
        assert_eq!(body.query_selector_all(".item.first").unwrap().len(), 1);
        assert_eq!(body.query_selector_all(".shell.dark").unwrap().len(), 1);
        assert_eq!(body.query_selector_all("[data-k]").unwrap().len(), 2);
        assert_eq!(
            tags(&body.query_selector_all(r#"[data-k="2"]"#).unwrap()),
            vec!["span"]
        );
        assert_eq!(body.query_selector_all("*").unwrap().len(), 6);
    }

    #[test]
    fn combinators() {
        let doc = fixture();
        let body = doc.body();
        assert_eq!(body.query_selector_all("div span").unwrap().len(), 1);
        assert_eq!(body.query_selector_all("div > span").unwrap().len(), 0);
        assert_eq!(body.query_selector_all("div > ul > li").unwrap().len(), 2);
        assert_eq!(body.query_selector_all("#app p>span").unwrap().len(), 1);
        assert_eq!(body.query_selector_all("ul span, p span").unwrap().len(), 1);
    }

    #[test]
    fn scope_itself_is_not_matched() {
        let doc = fixture();
        let app = doc.query_selector("#app").unwrap().unwrap();
        assert!(app.query_selector("div").unwrap().is_none());
        assert!(app.matches("div.shell").unwrap());
    }

    #[test]
    fn ancestors_outside_scope_still_count() {
        let doc = fixture();
        let ul = doc.query_selector("ul").unwrap().unwrap();
        assert_eq!(ul.query_selector_all("#app li").unwrap().len(), 2);
    }

    #[test]
    fn invalid_selectors() {
        for bad in ["", "#", "div >", "[x", "a..b", "[x=\"y]", "p!"] {
            assert_eq!(
                Selector::parse(bad),
                Err(DomError::InvalidSelector(bad.to_string())),
                "{bad}"
            );
        }
    }
}
