#![forbid(unsafe_code)]

//! HTML templates for wecco.
//!
//! # Role in wecco
//! `wecco-html` turns tagged markup into DOM and keeps it current. It sits
//! between the in-memory DOM (`wecco-dom`) and the component and
//! application runtimes, which only ever describe *what* to show.
//!
//! # Primary responsibilities
//! - **Template**: static fragments plus slot values, built with [`html!`].
//! - **Engine**: full render with identity markers, then in-place patching
//!   of later renders of the same template.
//! - **Update dispatcher**: [`update_element`] over the closed
//!   [`ElementUpdate`] enum.
//!
//! # Example
//!
//! ```
//! use wecco_dom::Document;
//! use wecco_html::html;
//!
//! let doc = Document::new();
//! let body = doc.body();
//! let greeting = |name: &str| html!("<p>Hello, " {name.to_string()} "</p>");
//!
//! greeting("world").apply_to(&body).unwrap();
//! let p = body.first_child().unwrap();
//! greeting("wecco").apply_to(&body).unwrap();
//!
//! // Same element, patched text.
//! assert_eq!(body.first_child().unwrap(), p);
//! assert_eq!(p.text_content(), "Hello, wecco");
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod marker;
mod shape;
pub mod template;
pub mod update;
pub mod value;

pub use cache::{CachePolicy, CacheStats, TemplateCache};
pub use engine::{Engine, EngineConfig};
pub use error::{RenderError, TemplateError};
pub use marker::{MARKER_ATTRIBUTE, MARKER_LEN, marker_for, marker_for_hash, shape_hash};
pub use template::{SlotKind, Template};
pub use update::{ElementUpdate, ElementUpdater, UpdateFn, update_element};
pub use value::Value;

/// Build a [`Template`] from string literals and `{expr}` slots.
///
/// Adjacent literals are concatenated; every braced expression becomes a
/// slot and is converted with [`Value::from`].
///
/// ```
/// use wecco_html::{SlotKind, html};
///
/// let disabled = true;
/// let t = html!("<button ?disabled=" {disabled} ">" {"Go"} "</button>");
/// assert_eq!(t.fragments(), ["<button ?disabled=", ">", "</button>"]);
/// assert_eq!(
///     t.slot_kinds().unwrap(),
///     vec![SlotKind::Boolean { name: "disabled".into() }, SlotKind::Content]
/// );
/// ```
#[macro_export]
macro_rules! html {
    ($($tokens:tt)*) => {
        $crate::__html_munch!([] [] [] $($tokens)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __html_munch {
    ([$($frags:expr,)*] [$($vals:expr,)*] [$($cur:tt)*]) => {
        $crate::Template::new(
            [$($frags,)* concat!("" $(, $cur)*)],
            ::std::vec![$($vals,)*],
        )
    };
    ([$($frags:expr,)*] [$($vals:expr,)*] [$($cur:tt)*] { $value:expr } $($rest:tt)*) => {
        $crate::__html_munch!(
            [$($frags,)* concat!("" $(, $cur)*),]
            [$($vals,)* $crate::Value::from($value),]
            []
            $($rest)*
        )
    };
    ([$($frags:expr,)*] [$($vals:expr,)*] [$($cur:tt)*] $lit:literal $($rest:tt)*) => {
        $crate::__html_munch!([$($frags,)*] [$($vals,)*] [$($cur)* $lit] $($rest)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_splits_fragments_at_slots() {
        let t = html!("<p>" "Hello, " {"a"} {"b"} "</p>");
        assert_eq!(t.fragments(), ["<p>Hello, ", "", "</p>"]);
        assert_eq!(t.slot_count(), 2);
    }

    #[test]
    fn macro_without_slots() {
        let t = html!("<p>Hello, world</p>");
        assert_eq!(t.fragments(), ["<p>Hello, world</p>"]);
        assert!(t.values().is_empty());
    }

    #[test]
    fn macro_with_leading_slot() {
        let t = html!({1} "<br>");
        assert_eq!(t.fragments(), ["", "<br>"]);
    }
}
