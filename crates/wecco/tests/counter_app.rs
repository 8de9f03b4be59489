#![cfg(feature = "runtime")]

use pretty_assertions::assert_eq;
use wecco::prelude::*;

#[derive(Debug, Clone, Copy)]
struct Model {
    count: u32,
}

fn view(ctx: &AppContext<&'static str>, model: &Model) -> Template {
    html!(
        "<p><button class=\"btn btn-primary\" @click=" {ctx.handler("inc")} ">"
        "You clicked me " {model.count} " times"
        "</button></p>"
    )
}

#[test]
fn counter_app_counts_clicks() -> Result<()> {
    let doc = Document::new();
    doc.body().set_inner_html(r#"<div id="app"></div>"#)?;
    app(
        &doc,
        || Model { count: 0 },
        |_, model: &Model, _msg: &'static str| Model {
            count: model.count + 1,
        },
        view,
        "#app",
    )?;

    let button = doc.query_selector("button")?.expect("button rendered");
    button.dispatch_event(&Event::new("click"));

    let text = doc
        .query_selector("#app button")?
        .expect("button still rendered")
        .text_content();
    assert_eq!(text, "You clicked me 1 times");
    Ok(())
}

#[test]
fn components_render_inside_an_app() -> Result<()> {
    let doc = Document::new();
    doc.body().set_inner_html(r#"<div id="app"></div>"#)?;
    let badge = define(&doc, "count-badge", |n: &u32, _: &ComponentContext<u32>| {
        html!("<b>" {*n} "</b>")
    })?;

    let counter = app(
        &doc,
        || 0_u32,
        |_, n: &u32, step: u32| n + step,
        move |_, n: &u32| html!("<section>" {badge.create(*n)} "</section>"),
        "#app",
    )?;
    counter.emit(5)?;

    let section = doc.query_selector("#app section")?.expect("section rendered");
    let badges = section.query_selector_all("count-badge")?;
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].text_content(), "5");
    Ok(())
}
