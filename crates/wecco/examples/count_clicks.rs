//! Count clicks on a button.
//!
//! Mounts an application on `#count-clicks-app`, simulates a few clicks and
//! prints the markup after each one. Set `RUST_LOG=wecco_html=debug` to see
//! render and patch spans.
//!
//! Run with: cargo run -p wecco --example count_clicks

use tracing::info;
use tracing_subscriber::EnvFilter;
use wecco::prelude::*;

#[derive(Debug, Clone)]
struct Model {
    count: u32,
    explanation: String,
}

impl Model {
    fn inc(&self) -> Self {
        Self {
            count: self.count + 1,
            explanation: self.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Message {
    Inc,
}

fn update(_ctx: &AppContext<Message>, model: &Model, message: Message) -> Model {
    match message {
        Message::Inc => model.inc(),
    }
}

fn view(ctx: &AppContext<Message>, model: &Model) -> Template {
    html!(
        "<p>" {model.explanation.clone()} "</p>"
        "<p>"
        "<button class=\"btn btn-primary\" @click=" {ctx.handler(Message::Inc)} ">"
        "You clicked me " {model.count} " times"
        "</button>"
        "</p>"
    )
}

fn main() -> wecco::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let doc = Document::new();
    doc.body()
        .set_inner_html(r#"<div id="count-clicks-app"></div>"#)?;

    let counter = app(
        &doc,
        || Model {
            count: 0,
            explanation: "Click the button to increment the counter.".into(),
        },
        update,
        view,
        "#count-clicks-app",
    )?;
    println!("{}", doc.body().inner_html());

    let Some(button) = doc.query_selector("#count-clicks-app button")? else {
        return Err(wecco::AppError::MountNotFound("#count-clicks-app button".into()).into());
    };
    for _ in 0..3 {
        button.dispatch_event(&Event::new("click"));
        println!("{}", doc.body().inner_html());
    }

    info!(
        count = counter.with_model(|m| m.count),
        cycles = counter.cycles(),
        "done"
    );
    Ok(())
}
