//! Property tests for the parser and serializer.
//!
//! 1. Serializing a materialized tree and parsing the result yields the
//!    same tree.
//! 2. Parsing never panics on arbitrary input.
//! 3. Text survives escaping unchanged.

use proptest::prelude::*;
use wecco_dom::parser::{ParsedNode, decode_text, parse_fragment};
use wecco_dom::serialize::escape_text;
use wecco_dom::Document;

// ── Strategies ────────────────────────────────────────────────────────────

fn text_strategy() -> impl Strategy<Value = String> {
    "[a-z <>&\"'\u{a0}]{1,12}"
}

fn comment_strategy() -> impl Strategy<Value = String> {
    "[a-z ]{0,8}"
}

fn attributes_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z][a-z-]{0,5}", "[a-z &\"<>']{0,8}"), 0..4).prop_map(|attrs| {
        let mut unique: Vec<(String, String)> = Vec::new();
        for (name, value) in attrs {
            if !unique.iter().any(|(n, _)| *n == name) {
                unique.push((name, value));
            }
        }
        unique
    })
}

/// Parsing never yields two adjacent text nodes.
fn merge_text(children: Vec<ParsedNode>) -> Vec<ParsedNode> {
    let mut out: Vec<ParsedNode> = Vec::new();
    for child in children {
        if let (Some(ParsedNode::Text(prev)), ParsedNode::Text(next)) = (out.last_mut(), &child) {
            prev.push_str(next);
            continue;
        }
        out.push(child);
    }
    out
}

fn node_strategy() -> impl Strategy<Value = ParsedNode> {
    let leaf = prop_oneof![
        text_strategy().prop_map(ParsedNode::Text),
        comment_strategy().prop_map(ParsedNode::Comment),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        (
            prop::sample::select(vec!["div", "p", "span", "ul", "li", "x-card"]),
            attributes_strategy(),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, attributes, children)| ParsedNode::Element {
                tag: tag.to_string(),
                attributes,
                children: merge_text(children),
            })
    })
}

proptest! {
    #[test]
    fn serialize_then_parse_is_identity(nodes in prop::collection::vec(node_strategy(), 0..4)) {
        let nodes = merge_text(nodes);
        let doc = Document::new();
        let fragment = doc.build_fragment(&nodes).unwrap();
        let markup = fragment.inner_html();
        let reparsed = parse_fragment(&markup).unwrap();
        prop_assert_eq!(reparsed, nodes);
    }

    #[test]
    fn parse_never_panics(input in "\\PC{0,64}") {
        let _ = parse_fragment(&input);
    }

    #[test]
    fn escaped_text_decodes_back(text in "\\PC{0,32}") {
        let mut escaped = String::new();
        escape_text(&text, &mut escaped);
        prop_assert_eq!(decode_text(&escaped), text);
    }
}
