use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use wecco_dom::{Document, Event, EventHandler, ListenerFlags, Node};
use wecco_html::{Engine, html};
use wecco_runtime::{
    ComponentConfig, ComponentContext, ComponentFactory, RENDERING_COMPLETE, TickScheduler, define,
    define_with_config,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Text {
    text: String,
}

fn text_component(doc: &Document, scheduler: &Rc<TickScheduler>) -> ComponentFactory<Text> {
    define_with_config(
        doc,
        "perftest-div",
        ComponentConfig::default().with_scheduler(scheduler.clone()),
        |d: &Text, _: &ComponentContext<Text>| html!("<div>" {d.text.clone()} "</div>"),
    )
    .unwrap()
}

/// Records the text of the element each time rendering completes.
fn completions(element: &Node) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    element
        .add_event_listener(
            RENDERING_COMPLETE,
            EventHandler::new(move |event: &Event| {
                let target = event.target().unwrap();
                sink.borrow_mut().push(target.text_content());
            }),
            ListenerFlags::empty(),
        )
        .unwrap();
    seen
}

#[test]
fn many_set_data_calls_render_once_with_last_value() {
    let doc = Document::new();
    let scheduler = Rc::new(TickScheduler::new());
    let factory = text_component(&doc, &scheduler);
    let element = factory.create(Text { text: "first".into() });
    doc.body().append_child(&element).unwrap();
    scheduler.run_until_idle();

    let seen = completions(&element);
    let component = factory.instance(&element).unwrap();
    for i in 0..10 {
        component.set_data(Text { text: format!("v{i}") });
    }
    assert!(seen.borrow().is_empty());
    scheduler.run_until_idle();

    assert_eq!(*seen.borrow(), vec!["v9".to_string()]);
    assert_eq!(component.render_count(), 2);
    assert_eq!(component.data().text, "v9");
}

#[test]
fn default_scheduler_renders_every_write() {
    let doc = Document::new();
    let factory = define(&doc, "inline-div", |d: &Text, _: &ComponentContext<Text>| {
        html!("<div>" {d.text.clone()} "</div>")
    })
    .unwrap();
    let element = factory.create(Text { text: "first".into() });
    doc.body().append_child(&element).unwrap();

    let seen = completions(&element);
    let component = factory.instance(&element).unwrap();
    for i in 0..3 {
        component.set_data(Text { text: format!("v{i}") });
        assert_eq!(element.text_content(), format!("v{i}"));
    }
    assert_eq!(*seen.borrow(), vec!["v0".to_string(), "v1".into(), "v2".into()]);
    assert_eq!(component.render_count(), 4);
}

#[test]
fn once_listener_sees_a_single_completion() {
    let doc = Document::new();
    let scheduler = Rc::new(TickScheduler::new());
    let factory = text_component(&doc, &scheduler);
    let element = factory.create(Text { text: "x".into() });

    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    element
        .add_event_listener(
            RENDERING_COMPLETE,
            EventHandler::new(move |_: &Event| counter.set(counter.get() + 1)),
            ListenerFlags::ONCE,
        )
        .unwrap();

    doc.body().append_child(&element).unwrap();
    scheduler.run_until_idle();
    factory
        .instance(&element)
        .unwrap()
        .set_data(Text { text: "y".into() });
    scheduler.run_until_idle();

    assert_eq!(hits.get(), 1);
    assert_eq!(element.text_content(), "y");
}

#[test]
fn set_data_while_disconnected_renders_on_connect() {
    let doc = Document::new();
    let scheduler = Rc::new(TickScheduler::new());
    let factory = text_component(&doc, &scheduler);
    let element = factory.create(Text::default());
    let component = factory.instance(&element).unwrap();

    component.set_data(Text { text: "later".into() });
    assert_eq!(scheduler.pending(), 0);

    doc.body().append_child(&element).unwrap();
    assert_eq!(scheduler.pending(), 1);
    scheduler.tick();
    assert_eq!(element.text_content(), "later");
}

#[test]
fn update_data_merges_into_pending_value() {
    #[derive(Debug, Default, Clone)]
    struct Pair {
        left: u32,
        right: u32,
    }

    let doc = Document::new();
    let scheduler = Rc::new(TickScheduler::new());
    let factory = define_with_config(
        &doc,
        "x-pair",
        ComponentConfig::default().with_scheduler(scheduler.clone()),
        |d: &Pair, _: &ComponentContext<Pair>| html!("<span>" {d.left} "/" {d.right} "</span>"),
    )
    .unwrap();
    let element = factory.create(Pair { left: 1, right: 1 });
    doc.body().append_child(&element).unwrap();
    scheduler.run_until_idle();

    let component = factory.instance(&element).unwrap();
    component.update_data(|d| Pair { left: 5, ..d.clone() });
    component.update_data(|d| Pair { right: d.right + 1, ..d.clone() });
    scheduler.run_until_idle();

    assert_eq!(element.text_content(), "5/2");
}

#[test]
fn components_compose_inside_templates() {
    let doc = Document::new();
    let child = define(&doc, "x-child", |d: &String, _: &ComponentContext<String>| {
        html!("<em>" {d.clone()} "</em>")
    })
    .unwrap();

    let element = child.create("nested".to_string());
    html!("<section>" {element.clone()} "</section>")
        .apply_to(&doc.body())
        .unwrap();

    assert_eq!(element.text_content(), "nested");
    assert_eq!(
        doc.query_selector("section x-child em").unwrap().unwrap().text_content(),
        "nested"
    );
}

#[test]
fn markup_created_components_render() {
    let doc = Document::new();
    let factory = define(&doc, "x-badge", |d: &u32, _: &ComponentContext<u32>| html!("<b>" {*d} "</b>")).unwrap();
    doc.body()
        .set_inner_html("<x-badge></x-badge><x-badge></x-badge>")
        .unwrap();

    let badges = doc.body().query_selector_all("x-badge").unwrap();
    assert_eq!(badges.len(), 2);
    for badge in &badges {
        assert_eq!(badge.text_content(), "0");
    }
    factory.instance(&badges[1]).unwrap().set_data(4);
    assert_eq!(badges[1].text_content(), "4");
    assert_eq!(badges[0].text_content(), "0");
}

#[test]
fn emitted_events_bubble_with_detail() {
    let doc = Document::new();
    let factory = define(&doc, "x-emitter", |_: &(), ctx: &ComponentContext<()>| {
        let ctx = ctx.clone();
        html!(
            "<button @click="
            {EventHandler::new(move |_: &Event| {
                ctx.emit("picked", 42_u32);
            })}
            ">pick</button>"
        )
    })
    .unwrap();

    let received = Rc::new(Cell::new(None));
    let sink = Rc::clone(&received);
    doc.body()
        .add_event_listener(
            "picked",
            EventHandler::new(move |event: &Event| sink.set(event.detail::<u32>().copied())),
            ListenerFlags::empty(),
        )
        .unwrap();

    let element = factory.create(());
    doc.body().append_child(&element).unwrap();
    element
        .query_selector("button")
        .unwrap()
        .unwrap()
        .dispatch_event(&Event::bubbling("click"));

    assert_eq!(received.get(), Some(42));
}

#[test]
fn disconnect_drops_the_rendering_record() {
    let doc = Document::new();
    let factory = define(&doc, "x-record", |d: &u32, _: &ComponentContext<u32>| html!("<b>" {*d} "</b>")).unwrap();
    let element = factory.create(1);
    doc.body().append_child(&element).unwrap();
    let engine = Engine::for_document(&doc);
    assert!(engine.has_record(&element));

    element.remove().unwrap();
    assert!(!engine.has_record(&element));

    doc.body().append_child(&element).unwrap();
    assert!(engine.has_record(&element));
    assert_eq!(element.text_content(), "1");
}

#[test]
fn mount_appends_to_selector_target() {
    let doc = Document::new();
    doc.body().set_inner_html(r#"<div id="app"></div>"#).unwrap();
    let factory = define(&doc, "x-mounted", |d: &u32, _: &ComponentContext<u32>| html!("<b>" {*d} "</b>")).unwrap();
    let element = factory.create(3);
    let component = factory.instance(&element).unwrap();

    component.mount("#app").unwrap();
    assert_eq!(
        doc.query_selector("#app x-mounted").unwrap().unwrap(),
        element
    );
    assert_eq!(element.text_content(), "3");
    assert!(matches!(
        component.mount("#missing"),
        Err(wecco_runtime::AppError::MountNotFound(_))
    ));
}
