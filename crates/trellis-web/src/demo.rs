//! Demo route table shipped with the `trellis` binary.

use crate::app::{App, Route, RouteNode};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use trellis_config::WebConfig;
use trellis_core::{
    class_names, component, el, link, redirect, ComponentError, Context, LinkAttrs, LocaleText,
    Node, Router, SessionRegistry, WireMessage,
};

/// Page path whose sessions receive counter updates.
pub const COUNTER_PATH: &str = "/counter";

pub fn demo_app(config: &WebConfig, registry: Arc<SessionRegistry>) -> App {
    let counter = Arc::new(AtomicI64::new(0));
    let notes = Arc::new(Mutex::new(Vec::new()));

    let routes = Router::new()
        .with(
            "/",
            Route::new(
                LocaleText::new().with("en", "Home").with("zh_hk", "主頁"),
                home(),
            )
            .description("Trellis demo pages"),
        )
        .with(
            "/greet/:name",
            Route::new("Greeting", RouteNode::dynamic(greeting)),
        )
        .with(COUNTER_PATH, Route::new("Counter", counter_page(counter, registry)))
        .with(
            "/notes",
            Route::new("Notes", notes_page(notes)).streaming(false),
        )
        .with(
            "/old-home",
            Route::new("Moved", Node::from(redirect("/"))).streaming(false),
        )
        .with(
            "/broken",
            Route::new(
                "Broken",
                component(|_, _| Err(ComponentError::msg("this page always fails"))),
            )
            .streaming(false),
        );

    App::new(routes).with_config(config)
}

fn nav() -> Node {
    el("nav")
        .children([
            link(LinkAttrs::new("/").child("Home")),
            link(LinkAttrs::new("/greet/world").child("Greeting")),
            link(LinkAttrs::new(COUNTER_PATH).no_animation().child("Counter")),
            link(LinkAttrs::new("/notes").child("Notes")),
        ])
        .into()
}

fn home() -> Node {
    Node::fragment([
        nav(),
        el("h1")
            .child(LocaleText::new().with("en", "Welcome").with("zh_hk", "歡迎"))
            .into(),
        el("p")
            .attr("class", class_names([("intro", true), ("muted", false)]))
            .child("Pages render over HTTP and patch themselves over a live session.")
            .into(),
    ])
}

fn greeting(ctx: &Context) -> Node {
    let name = ctx.param("name").unwrap_or("stranger").to_string();
    let hello = ctx.resolve_locale(&LocaleText::new().with("en", "Hello").with("zh_hk", "你好"));
    Node::fragment([
        nav(),
        el("h1").child(format!("{hello}, {name}!")).into(),
    ])
}

fn counter_page(count: Arc<AtomicI64>, registry: Arc<SessionRegistry>) -> Node {
    component(move |_, ctx| {
        if ctx.form_value("action") == Some("inc") {
            let value = count.fetch_add(1, Ordering::SeqCst) + 1;
            let message = WireMessage::update_text("#count", value.to_string());
            let delivered = registry.broadcast_to_path(COUNTER_PATH, &message);
            tracing::debug!(value, delivered, "Counter incremented");
        }

        let value = count.load(Ordering::SeqCst);
        Ok(Node::fragment([
            nav(),
            el("section.counter")
                .children([
                    el("p").children([Node::text("Count: "), el("span#count").child(value).into()]),
                    el("form[method=post]")
                        .attr("onsubmit", "emitForm(event)")
                        .child(el("button[name=action][value=inc]").child("+1")),
                ])
                .into(),
        ]))
    })
    .into()
}

fn notes_page(notes: Arc<Mutex<Vec<String>>>) -> Node {
    component(move |_, ctx| {
        if let Some(note) = ctx.form_value("note") {
            let note = note.trim();
            if note.is_empty() {
                return Err(ComponentError::validation("note must not be empty"));
            }
            notes.lock().push(note.to_string());
        }

        let items: Vec<Node> = notes
            .lock()
            .iter()
            .map(|note| el("li").child(note).into())
            .collect();
        Ok(Node::fragment([
            nav(),
            el("section.notes")
                .children([
                    el("ul").children(items),
                    el("form[method=post]")
                        .child(
                            el("input[name=note]").attr(
                                "placeholder",
                                LocaleText::new().with("en", "New note").with("zh_hk", "新筆記"),
                            ),
                        )
                        .child(el("button").child("Add")),
                ])
                .into(),
        ]))
    })
    .into()
}
