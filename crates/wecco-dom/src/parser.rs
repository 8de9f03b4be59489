#![forbid(unsafe_code)]

//! HTML fragment parsing.
//!
//! The parser turns a markup string into a tree of [`ParsedNode`]s which a
//! [`Document`](crate::Document) can materialize. It is lenient in the same
//! places browsers are (unclosed elements are closed at the end of input,
//! closing an outer element closes the inner ones, a `<` that does not start
//! a tag is text) and strict where the input cannot be interpreted at all.
//!
//! # Supported syntax
//!
//! - elements with double-quoted, single-quoted, unquoted and bare attributes
//! - void elements (`<br>`, `<input>`, ...) and the self-closing `/>` form
//! - comments `<!-- ... -->`
//! - raw text elements (`<script>`, `<style>`)
//! - character references: `&amp; &lt; &gt; &quot; &apos; &nbsp;`, decimal
//!   and hexadecimal numeric references
//!
//! Element and attribute names are lowercased. Attribute names may contain
//! any character other than whitespace, `=`, `>`, `/` and quotes, so
//! directive names such as `?disabled` or `@click` survive parsing.
//!
//! # Example
//! ```
//! use wecco_dom::parser::{ParsedNode, parse_fragment};
//!
//! let nodes = parse_fragment("<p class=hero>Hi &amp; bye</p>").unwrap();
//! assert_eq!(
//!     nodes,
//!     vec![ParsedNode::Element {
//!         tag: "p".into(),
//!         attributes: vec![("class".into(), "hero".into())],
//!         children: vec![ParsedNode::Text("Hi & bye".into())],
//!     }]
//! );
//! ```

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is not parsed as markup.
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Returns `true` for void element names.
#[must_use]
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Returns `true` for raw text element names.
#[must_use]
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// A node produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedNode {
    /// An element with its attributes in source order.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<ParsedNode>,
    },
    /// Decoded character data.
    Text(String),
    /// Comment body (without the delimiters).
    Comment(String),
}

/// Errors that can occur during markup parsing.
///
/// Positions are byte offsets into the parsed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A closing tag has no matching open element.
    UnexpectedClosingTag { tag: String, position: usize },
    /// A tag was not closed with `>` before the end of input.
    UnterminatedTag { position: usize },
    /// A comment was not closed with `-->`.
    UnterminatedComment { position: usize },
    /// A quoted attribute value was not closed.
    UnterminatedAttributeValue { position: usize },
    /// `</>` or a similar tag without a name.
    EmptyTagName { position: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedClosingTag { tag, position } => write!(
                f,
                "unexpected closing tag </{tag}> at position {position} with no matching open element"
            ),
            Self::UnterminatedTag { position } => {
                write!(f, "unterminated tag opened at position {position}")
            }
            Self::UnterminatedComment { position } => {
                write!(f, "unterminated comment opened at position {position}")
            }
            Self::UnterminatedAttributeValue { position } => {
                write!(f, "unterminated attribute value at position {position}")
            }
            Self::EmptyTagName { position } => write!(f, "empty tag name at position {position}"),
        }
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    /// Byte offset the error refers to.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedClosingTag { position, .. }
            | Self::UnterminatedTag { position }
            | Self::UnterminatedComment { position }
            | Self::UnterminatedAttributeValue { position }
            | Self::EmptyTagName { position } => *position,
        }
    }

    /// The same error at another offset, for inputs that were rewritten
    /// before parsing.
    #[must_use]
    pub fn with_position(mut self, at: usize) -> Self {
        match &mut self {
            Self::UnexpectedClosingTag { position, .. }
            | Self::UnterminatedTag { position }
            | Self::UnterminatedComment { position }
            | Self::UnterminatedAttributeValue { position }
            | Self::EmptyTagName { position } => *position = at,
        }
        self
    }
}

/// Parse a markup fragment.
///
/// Convenience wrapper around [`FragmentParser`].
pub fn parse_fragment(input: &str) -> Result<Vec<ParsedNode>, ParseError> {
    FragmentParser::new(input).parse()
}

/// An element that has been opened but not yet closed.
#[derive(Debug)]
struct OpenElement {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<ParsedNode>,
}

/// Result of scanning a start tag.
struct StartTag {
    tag: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

/// Single-use parser over one markup string.
#[derive(Debug)]
pub struct FragmentParser<'a> {
    input: &'a str,
    pos: usize,
    root: Vec<ParsedNode>,
    stack: Vec<OpenElement>,
    text: String,
}

impl<'a> FragmentParser<'a> {
    /// Create a parser for `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
            text: String::new(),
        }
    }

    /// Parse the whole input into a list of top-level nodes.
    pub fn parse(mut self) -> Result<Vec<ParsedNode>, ParseError> {
        while self.pos < self.input.len() {
            let rest = &self.input[self.pos..];
            if rest.starts_with("<!--") {
                self.flush_text();
                self.parse_comment()?;
            } else if rest.starts_with("</") {
                self.flush_text();
                self.parse_end_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.flush_text();
                self.parse_element()?;
            } else if rest.starts_with('&') {
                let (decoded, consumed) = decode_reference(rest);
                self.text.push_str(&decoded);
                self.pos += consumed;
            } else {
                let ch = rest.chars().next().unwrap_or('\0');
                self.text.push(ch);
                self.pos += ch.len_utf8();
            }
        }

        self.flush_text();
        while !self.stack.is_empty() {
            self.close_top();
        }
        Ok(self.root)
    }

    fn push_node(&mut self, node: ParsedNode) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.push_node(ParsedNode::Text(text));
        }
    }

    fn close_top(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.push_node(ParsedNode::Element {
                tag: open.tag,
                attributes: open.attributes,
                children: open.children,
            });
        }
    }

    fn parse_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let body = start + 4;
        let Some(end) = self.input[body..].find("-->") else {
            return Err(ParseError::UnterminatedComment { position: start });
        };
        let comment = self.input[body..body + end].to_string();
        self.pos = body + end + 3;
        self.push_node(ParsedNode::Comment(comment));
        Ok(())
    }

    fn parse_end_tag(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let rest = &self.input[start..];
        let Some(end) = rest.find('>') else {
            return Err(ParseError::UnterminatedTag { position: start });
        };
        let name = rest[2..end].trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(ParseError::EmptyTagName { position: start });
        }
        self.pos = start + end + 1;

        // Closing an outer element implicitly closes everything opened inside it.
        match self.stack.iter().rposition(|open| open.tag == name) {
            Some(index) => {
                while self.stack.len() > index {
                    self.close_top();
                }
                Ok(())
            }
            None => Err(ParseError::UnexpectedClosingTag {
                tag: name,
                position: start,
            }),
        }
    }

    fn parse_element(&mut self) -> Result<(), ParseError> {
        let start = self.scan_start_tag()?;

        if start.self_closing || is_void_element(&start.tag) {
            self.push_node(ParsedNode::Element {
                tag: start.tag,
                attributes: start.attributes,
                children: Vec::new(),
            });
            return Ok(());
        }

        if is_raw_text_element(&start.tag) {
            let raw = self.scan_raw_text(&start.tag);
            let children = if raw.is_empty() {
                Vec::new()
            } else {
                vec![ParsedNode::Text(raw)]
            };
            self.push_node(ParsedNode::Element {
                tag: start.tag,
                attributes: start.attributes,
                children,
            });
            return Ok(());
        }

        self.stack.push(OpenElement {
            tag: start.tag,
            attributes: start.attributes,
            children: Vec::new(),
        });
        Ok(())
    }

    /// Consume raw text up to and including `</tag>`. A missing end tag
    /// consumes the rest of the input.
    fn scan_raw_text(&mut self, tag: &str) -> String {
        let rest = &self.input[self.pos..];
        let closing = format!("</{tag}");
        let lower = rest.to_ascii_lowercase();
        match lower.find(&closing) {
            Some(end) => {
                let raw = rest[..end].to_string();
                let after = &rest[end..];
                let consumed = after.find('>').map_or(after.len(), |gt| gt + 1);
                self.pos += end + consumed;
                raw
            }
            None => {
                self.pos = self.input.len();
                rest.to_string()
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn take_while<F>(&mut self, mut keep: F) -> &'a str
    where
        F: FnMut(char) -> bool,
    {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if !keep(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn scan_start_tag(&mut self) -> Result<StartTag, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let tag = self
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .to_ascii_lowercase();

        let mut attributes: Vec<(String, String)> = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return Err(ParseError::UnterminatedTag { position: start });
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(StartTag {
                    tag,
                    attributes,
                    self_closing: true,
                });
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok(StartTag {
                    tag,
                    attributes,
                    self_closing: false,
                });
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let mut name = self
                .take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\''))
                .to_ascii_lowercase();
            if name.is_empty() {
                // A stray quote or `=`: swallow it as a one-character name.
                let ch = self.peek().unwrap_or('\0');
                self.pos += ch.len_utf8();
                name.push(ch);
            }

            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.scan_attribute_value()?
            } else {
                String::new()
            };

            // Like browsers, the first occurrence of an attribute wins.
            if !attributes.iter().any(|(existing, _)| *existing == name) {
                attributes.push((name, value));
            }
        }
    }

    fn scan_attribute_value(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos;
                let body = start + 1;
                let Some(end) = self.input[body..].find(quote) else {
                    return Err(ParseError::UnterminatedAttributeValue { position: start });
                };
                self.pos = body + end + 1;
                Ok(decode_text(&self.input[body..body + end]))
            }
            _ => {
                let raw = self.take_while(|c| !c.is_whitespace() && c != '>');
                Ok(decode_text(raw))
            }
        }
    }
}

/// Decode all character references in `raw`.
#[must_use]
pub fn decode_text(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;
    while pos < raw.len() {
        let rest = &raw[pos..];
        if rest.starts_with('&') {
            let (decoded, consumed) = decode_reference(rest);
            out.push_str(&decoded);
            pos += consumed;
        } else {
            let ch = rest.chars().next().unwrap_or('\0');
            out.push(ch);
            pos += ch.len_utf8();
        }
    }
    out
}

/// Decode one character reference at the start of `input` (which begins
/// with `&`). Returns the decoded text and the number of bytes consumed.
/// Unknown references decode to a literal `&`.
fn decode_reference(input: &str) -> (String, usize) {
    let Some(semi) = input[1..].find(';').map(|i| i + 1) else {
        return ("&".to_string(), 1);
    };
    // References are short; anything longer is literal text.
    if semi > 10 {
        return ("&".to_string(), 1);
    }
    let name = &input[1..semi];
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    match decoded {
        Some(ch) => (ch.to_string(), semi + 1),
        None => ("&".to_string(), 1),
    }
}
