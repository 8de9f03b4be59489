use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use wecco_dom::{Document, Event, EventHandler};
use wecco_html::{MARKER_ATTRIBUTE, MARKER_LEN, Template, html, marker_for, update_element};

fn marker(template: &Template) -> String {
    let marker = marker_for(template.fragments());
    assert_eq!(marker.len(), MARKER_LEN);
    assert!(marker.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));
    marker
}

#[test]
fn html_without_placeholder() {
    let doc = Document::new();
    update_element(&doc.body(), html!("<p>Hello, world</p>")).unwrap();
    assert_eq!(doc.body().inner_html(), "<p>Hello, world</p>");
}

#[test]
fn html_with_placeholder() {
    let doc = Document::new();
    let gretee = "world";
    let t = html!("<p>Hello, " {gretee} "</p>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    assert_eq!(
        doc.body().inner_html(),
        format!(r#"<p {MARKER_ATTRIBUTE}="{m}">Hello, world</p>"#)
    );
}

#[test]
fn html_with_toplevel_placeholder() {
    let doc = Document::new();
    update_element(&doc.body(), html!("<p>Hello</p>" {"world"})).unwrap();
    assert_eq!(doc.body().inner_html(), "<p>Hello</p>world");
}

#[test]
fn html_with_adjacent_placeholders() {
    let doc = Document::new();
    let t = html!("<p>" {"Hello, "} {"world"} "</p>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    let body = doc.body();
    assert_eq!(
        body.inner_html(),
        format!(r#"<p {MARKER_ATTRIBUTE}="{m}">Hello, world</p>"#)
    );
    assert_eq!(body.query_selector_all(&format!("[{MARKER_ATTRIBUTE}]")).unwrap().len(), 1);
}

#[test]
fn html_with_attribute_placeholder() {
    let doc = Document::new();
    let classes = "hero small";
    let t = html!("<p class=" {classes} ">Hello, world</p>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    assert_eq!(
        doc.body().inner_html(),
        format!(r#"<p class="hero small" {MARKER_ATTRIBUTE}="{m}">Hello, world</p>"#)
    );
}

#[test]
fn boolean_attribute_false() {
    let doc = Document::new();
    let t = html!("<a ?disabled=" {false} ">Hello, world</a>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    assert_eq!(
        doc.body().inner_html(),
        format!(r#"<a {MARKER_ATTRIBUTE}="{m}">Hello, world</a>"#)
    );
}

#[test]
fn boolean_attribute_true() {
    let doc = Document::new();
    let t = html!("<a ?disabled=" {true} ">Hello, world</a>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    assert_eq!(
        doc.body().inner_html(),
        format!(r#"<a {MARKER_ATTRIBUTE}="{m}" disabled="disabled">Hello, world</a>"#)
    );
}

#[test]
fn event_placeholder() {
    let doc = Document::new();
    let clicked = Rc::new(Cell::new(0));
    let counter = Rc::clone(&clicked);
    let callback = EventHandler::new(move |_: &Event| counter.set(counter.get() + 1));
    let t = html!("<a @click=" {callback} ">Hello, world</a>");
    let m = marker(&t);

    update_element(&doc.body(), t).unwrap();
    assert_eq!(
        doc.body().inner_html(),
        format!(r#"<a {MARKER_ATTRIBUTE}="{m}">Hello, world</a>"#)
    );

    let a = doc.query_selector("a").unwrap().unwrap();
    a.dispatch_event(&Event::new("click"));
    assert_eq!(clicked.get(), 1);
}

#[test]
fn rendering_is_idempotent_across_targets() {
    let doc = Document::new();
    let view = || html!("<ul class=" {"list"} "><li>" {"a"} "</li><li>" {"<b>b</b>"} "</li></ul>");
    let first = doc.create_element("div");
    let second = doc.create_element("div");
    view().apply_to(&first).unwrap();
    view().apply_to(&second).unwrap();
    assert_eq!(first.inner_html(), second.inner_html());
}

#[test]
fn markup_values_are_parsed_and_text_is_escaped() {
    let doc = Document::new();
    let body = doc.body();
    html!("<div>" {"<em>hi</em> &amp; bye"} "</div><p>" {"1 > 0"} "</p>")
        .apply_to(&body)
        .unwrap();
    let div = body.query_selector("div").unwrap().unwrap();
    assert_eq!(div.query_selector_all("em").unwrap().len(), 1);
    assert_eq!(div.text_content(), "hi & bye");
    let p = body.query_selector("p").unwrap().unwrap();
    assert!(p.inner_html().ends_with("1 &gt; 0"));
}

#[test]
fn nested_templates_and_lists() {
    let doc = Document::new();
    let body = doc.body();
    let items: Vec<Template> = ["a", "b", "c"].iter().map(|i| html!("<li>" {*i} "</li>")).collect();
    html!("<ul>" {items} "</ul>").apply_to(&body).unwrap();
    let ul = body.first_child().unwrap();
    let texts: Vec<String> = ul
        .query_selector_all("li")
        .unwrap()
        .iter()
        .map(|li| li.text_content())
        .collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[test]
fn element_values_are_moved_into_place() {
    let doc = Document::new();
    let body = doc.body();
    let span = doc.create_element("span");
    span.append_child(&doc.create_text("moved")).unwrap();
    html!("<p>" {span.clone()} "</p>").apply_to(&body).unwrap();
    assert_eq!(span.parent().and_then(|p| p.tag_name()).as_deref(), Some("p"));
}

#[test]
fn misplaced_slot_is_reported_at_render() {
    let doc = Document::new();
    let err = html!("<p " {"x"} "></p>").apply_to(&doc.body()).unwrap_err();
    assert_eq!(
        err,
        wecco_html::RenderError::Template(wecco_html::TemplateError::SlotInTag { slot: 0 })
    );
    assert_eq!(doc.body().child_count(), 0);
}

#[test]
fn malformed_template_markup_is_a_parse_error() {
    let doc = Document::new();
    let err = html!("<p>" {1} "</div>").apply_to(&doc.body()).unwrap_err();
    // The position points into the written markup `<p></div>`.
    assert_eq!(
        err,
        wecco_html::RenderError::Parse(wecco_dom::ParseError::UnexpectedClosingTag {
            tag: "div".into(),
            position: 3
        })
    );
}
