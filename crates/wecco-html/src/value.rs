#![forbid(unsafe_code)]

//! Slot values.

use std::borrow::Cow;

use wecco_dom::{EventHandler, Node};

use crate::template::Template;
use crate::update::ElementUpdate;

/// A dynamic value placed in a template slot.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Renders nothing; falsy; the empty string in attributes.
    #[default]
    Empty,
    Bool(bool),
    /// Text, or markup when it contains `<` or `&`.
    Str(Cow<'static, str>),
    /// An element moved into the content position.
    Element(Node),
    /// A nested template, patched in place when its shape is unchanged.
    Template(Template),
    /// Any other update, dispatched into a detached container.
    Update(ElementUpdate),
    /// An event handler for `@event` slots.
    Handler(EventHandler),
    /// A sequence expanded in order.
    List(Vec<Value>),
}

impl Value {
    /// Truthiness used by `?attribute` slots.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty | Self::Bool(false) => false,
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The string form used in attribute values.
    #[must_use]
    pub fn to_attribute_string(&self) -> String {
        let mut out = String::new();
        self.write_attribute(&mut out);
        out
    }

    pub(crate) fn write_attribute(&self, out: &mut String) {
        match self {
            Self::Empty | Self::Handler(_) => {}
            Self::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Self::Str(s) => out.push_str(s),
            Self::Element(node) => out.push_str(&node.text_content()),
            Self::Template(_) | Self::Update(_) => {}
            Self::List(items) => {
                let mut first = true;
                for item in items {
                    if !first {
                        out.push(' ');
                    }
                    first = false;
                    item.write_attribute(out);
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Cow::Owned(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Cow::Owned(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Str(Cow::Owned(s.clone()))
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(s: Cow<'static, str>) -> Self {
        Self::Str(s)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Self::Str(Cow::Owned(c.to_string()))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! impl_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Str(Cow::Owned(v.to_string()))
                }
            }
        )*
    };
}

impl_from_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Self::Element(node)
    }
}

impl From<&Node> for Value {
    fn from(node: &Node) -> Self {
        Self::Element(node.clone())
    }
}

impl From<Template> for Value {
    fn from(template: Template) -> Self {
        Self::Template(template)
    }
}

impl From<ElementUpdate> for Value {
    fn from(update: ElementUpdate) -> Self {
        Self::Update(update)
    }
}

impl From<EventHandler> for Value {
    fn from(handler: EventHandler) -> Self {
        Self::Handler(handler)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Empty.is_truthy());
        assert!(!Value::from(false).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from(true).is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::from(Vec::<Value>::new()).is_truthy());
    }

    #[test]
    fn attribute_strings() {
        assert_eq!(Value::from(Some("a")).to_attribute_string(), "a");
        assert_eq!(Value::from(None::<&str>).to_attribute_string(), "");
        assert_eq!(Value::from(vec!["hero", "small"]).to_attribute_string(), "hero small");
        assert_eq!(Value::from(1.5).to_attribute_string(), "1.5");
        assert_eq!(Value::from(false).to_attribute_string(), "false");
    }
}
