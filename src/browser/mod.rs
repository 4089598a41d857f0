//! Browser entry points.
//!
//! `start` runs once when the wasm module loads: it installs logging, reads
//! configuration from `<meta>` tags, binds the document once it is parsed and
//! rebinds every subtree announced by the subtree-replaced event. The binder
//! and its connection are page singletons.

pub mod dom;
pub mod socket;

use std::cell::OnceCell;

use gloo_events::EventListener;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Document, Element, Event, HtmlMetaElement};

use crate::binder::UiBinder;
use crate::config::ChatConfig;
use dom::DomScope;
use socket::SocketIoConnector;

thread_local! {
    static BINDER: OnceCell<UiBinder> = const { OnceCell::new() };
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        log::warn!("chat client loaded without a document");
        return;
    };

    let config = load_config(&document);
    let swap_event = config.swap_event.clone();
    BINDER.with(|cell| {
        if cell.set(UiBinder::new(config, Box::new(SocketIoConnector))).is_err() {
            log::debug!("chat client already started");
        }
    });

    EventListener::new(&document, swap_event, |event| match swap_scope(event) {
        Some(scope) => bind_scope(&scope),
        None => log::debug!("swap event without a document"),
    })
    .forget();

    if document.ready_state() == "loading" {
        let target = document.clone();
        EventListener::once(&target, "DOMContentLoaded", move |_| bind_scope(&DomScope::Document(document)))
            .forget();
    } else {
        bind_scope(&DomScope::Document(document));
    }
}

/// Bind the chat widget inside `root`, or anywhere in the document when no
/// root is given. Safe to call repeatedly.
#[wasm_bindgen]
pub fn rebind(root: Option<Element>) {
    match root {
        Some(root) => bind_scope(&DomScope::Subtree(root)),
        None => {
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                bind_scope(&DomScope::Document(document));
            }
        }
    }
}

fn bind_scope(scope: &DomScope) {
    BINDER.with(|cell| match cell.get() {
        Some(binder) => {
            binder.bind(scope);
        }
        None => log::warn!("chat client used before start"),
    });
}

/// The swapped element, from `detail.elt` or the event target.
///
/// Falls back to the whole document when the element has already left it.
fn swap_scope(event: &Event) -> Option<DomScope> {
    let from_detail = event
        .dyn_ref::<CustomEvent>()
        .map(CustomEvent::detail)
        .and_then(|detail| js_sys::Reflect::get(&detail, &JsValue::from_str("elt")).ok())
        .and_then(|elt| elt.dyn_into::<Element>().ok());
    let root = from_detail.or_else(|| event.target().and_then(|t| t.dyn_into::<Element>().ok()));

    match root {
        Some(root) if root.is_connected() => Some(DomScope::Subtree(root)),
        _ => web_sys::window().and_then(|w| w.document()).map(DomScope::Document),
    }
}

fn load_config(document: &Document) -> ChatConfig {
    let lookup = |name: &str| {
        document
            .query_selector(&format!("meta[name=\"{name}\"]"))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlMetaElement>().ok())
            .map(|meta| meta.content())
    };

    ChatConfig::from_lookup(lookup).unwrap_or_else(|e| {
        log::warn!("invalid chat configuration, using defaults: {e}");
        ChatConfig::default()
    })
}
