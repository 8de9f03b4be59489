//! Property tests for render identity markers and patching.
//!
//! 1. Markers depend on the fragments only and are always six `[a-z0-9]`.
//! 2. Moving text across a fragment boundary changes the hash.
//! 3. Patching with arbitrary text values produces the same markup as a
//!    fresh render.

use proptest::prelude::*;
use wecco_dom::Document;
use wecco_html::{MARKER_LEN, Template, Value, html, marker_for, shape_hash};

fn fragments_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[ -~]{0,16}", 1..6)
}

proptest! {
    #[test]
    fn marker_is_six_base36_chars(fragments in fragments_strategy()) {
        let marker = marker_for(&fragments);
        prop_assert_eq!(marker.len(), MARKER_LEN);
        prop_assert!(marker.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    }

    #[test]
    fn marker_ignores_values(
        fragments in fragments_strategy(),
        a in "[a-z]{0,8}",
        b in "[a-z]{0,8}",
    ) {
        let values = |v: &str| vec![Value::from(v); fragments.len() - 1];
        let first = Template::new(fragments.clone(), values(&a));
        let second = Template::new(fragments.clone(), values(&b));
        prop_assert_eq!(first.shape_hash(), second.shape_hash());
        prop_assert_eq!(marker_for(first.fragments()), marker_for(second.fragments()));
    }

    #[test]
    fn fragment_boundaries_matter(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
        let joined = format!("{left}{right}");
        prop_assert_ne!(
            shape_hash(&[left.as_str(), right.as_str()]),
            shape_hash(&[joined.as_str(), ""])
        );
    }

    #[test]
    fn patch_matches_fresh_render(
        first in prop::collection::vec("[a-z <>&]{0,8}", 3),
        second in prop::collection::vec("[a-z <>&]{0,8}", 3),
    ) {
        let view = |v: &[String]| {
            html!(
                "<div class=" {v[0].clone()} "><p>" {v[1].clone()} "</p>" {v[2].clone()} "</div>"
            )
        };
        let doc = Document::new();
        let patched = doc.create_element("main");
        let fresh = doc.create_element("main");

        // Values with `<` or `&` may be unparseable markup; skip those.
        prop_assume!(view(&first).apply_to(&patched).is_ok());
        let patch = view(&second).apply_to(&patched);
        let render = view(&second).apply_to(&fresh);
        prop_assert_eq!(patch.is_ok(), render.is_ok());
        if render.is_ok() {
            prop_assert_eq!(patched.inner_html(), fresh.inner_html());
        }
    }
}
