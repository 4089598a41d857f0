//! `web-sys` implementations of the DOM seam.

use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlTextAreaElement, KeyboardEvent, ScrollBehavior,
    ScrollToOptions,
};

use crate::dom::{Composer, Handler, KeyHandler, KeyPress, MessageList, Scope, SendControl};
use crate::render::Bubble;

/// Where to look for the chat widget.
pub enum DomScope {
    Document(Document),
    /// A replaced subtree; the root itself is a candidate.
    Subtree(Element),
}

impl DomScope {
    fn find(&self, id: &str) -> Option<Element> {
        match self {
            Self::Document(document) => document.get_element_by_id(id),
            Self::Subtree(root) => {
                if root.id() == id {
                    return Some(root.clone());
                }
                root.query_selector(&format!("[id=\"{id}\"]")).ok().flatten()
            }
        }
    }

    fn find_as<T: JsCast>(&self, id: &str) -> Option<T> {
        let element = self.find(id)?;
        match element.dyn_into::<T>() {
            Ok(el) => Some(el),
            Err(_) => {
                log::debug!("#{id} is not the expected element type");
                None
            }
        }
    }
}

impl Scope for DomScope {
    fn message_list(&self, id: &str) -> Option<Rc<dyn MessageList>> {
        let el = self.find_as::<HtmlElement>(id)?;
        Some(Rc::new(DomList { el }))
    }

    fn composer(&self, id: &str) -> Option<Rc<dyn Composer>> {
        let el = self.find_as::<HtmlTextAreaElement>(id)?;
        Some(Rc::new(DomComposer { el }))
    }

    fn send_control(&self, id: &str) -> Option<Rc<dyn SendControl>> {
        let el = self.find_as::<HtmlButtonElement>(id)?;
        Some(Rc::new(DomSendButton { el }))
    }
}

fn dataset_get(el: &HtmlElement, key: &str) -> Option<String> {
    el.dataset().get(key)
}

pub struct DomList {
    el: HtmlElement,
}

impl DomList {
    fn try_append(&self, bubble: &Bubble) -> Result<(), JsValue> {
        let document = self.el.owner_document().ok_or_else(|| JsValue::from_str("list has no document"))?;
        let styled = |tag: &str, class: &str| -> Result<Element, JsValue> {
            let el = document.create_element(tag)?;
            el.set_class_name(class);
            Ok(el)
        };

        let row = styled(Bubble::ROW_TAG, bubble.row_class())?;
        let card = styled("div", bubble.bubble_class())?;
        let header = styled("div", bubble.header_class())?;
        let name = styled("span", bubble.name_class())?;
        name.set_text_content(Some(&bubble.display_name));
        header.append_child(&name)?;
        if bubble.has_time_label() {
            let time = styled("span", bubble.time_class())?;
            time.set_text_content(Some(&bubble.time_label));
            header.append_child(&time)?;
        }
        let body = styled(Bubble::BODY_TAG, bubble.body_class())?;
        body.set_inner_html(&bubble.body_html);

        card.append_child(&header)?;
        card.append_child(&body)?;
        row.append_child(&card)?;
        self.el.append_child(&row)?;
        Ok(())
    }
}

impl MessageList for DomList {
    fn data(&self, key: &str) -> Option<String> {
        dataset_get(&self.el, key)
    }

    fn set_data(&self, key: &str, value: &str) {
        if self.el.dataset().set(key, value).is_err() {
            log::warn!("could not set data attribute {key}");
        }
    }

    fn remove_data(&self, key: &str) {
        self.el.dataset().delete(key);
    }

    fn append_bubble(&self, bubble: &Bubble) {
        if let Err(e) = self.try_append(bubble) {
            log::warn!("could not append chat bubble: {e:?}");
        }
    }

    fn scroll_to_latest(&self) {
        let options = ScrollToOptions::new();
        options.set_top(f64::from(self.el.scroll_height()));
        options.set_behavior(ScrollBehavior::Smooth);
        self.el.scroll_to_with_scroll_to_options(&options);
    }

    fn is_attached(&self) -> bool {
        self.el.is_connected()
    }
}

pub struct DomComposer {
    el: HtmlTextAreaElement,
}

impl DomComposer {
    fn set_style(&self, property: &str, value: &str) {
        if self.el.style().set_property(property, value).is_err() {
            log::warn!("could not set composer {property}");
        }
    }
}

impl Composer for DomComposer {
    fn data(&self, key: &str) -> Option<String> {
        dataset_get(&self.el, key)
    }

    fn value(&self) -> String {
        self.el.value()
    }

    fn set_value(&self, value: &str) {
        self.el.set_value(value);
    }

    fn reset_height(&self) {
        self.set_style("height", "auto");
    }

    fn scroll_height(&self) -> u32 {
        u32::try_from(self.el.scroll_height()).unwrap_or(0)
    }

    fn set_height(&self, px: u32) {
        self.set_style("height", &format!("{px}px"));
    }

    fn set_scrollable(&self, scrollable: bool) {
        self.set_style("overflow-y", if scrollable { "auto" } else { "hidden" });
    }

    fn focus(&self) {
        let _ = self.el.focus();
    }

    fn on_keydown(&self, handler: KeyHandler) {
        let options = EventListenerOptions::enable_prevent_default();
        EventListener::new_with_options(&self.el, "keydown", options, move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if handler(&KeyPress::new(&event.key(), event.shift_key())) {
                event.prevent_default();
            }
        })
        .forget();
    }

    fn on_input(&self, handler: Handler) {
        EventListener::new(&self.el, "input", move |_| handler()).forget();
    }
}

pub struct DomSendButton {
    el: HtmlButtonElement,
}

impl SendControl for DomSendButton {
    fn data(&self, key: &str) -> Option<String> {
        dataset_get(&self.el, key)
    }

    fn set_disabled(&self, disabled: bool) {
        self.el.set_disabled(disabled);
    }

    fn on_click(&self, handler: Handler) {
        EventListener::new(&self.el, "click", move |_| handler()).forget();
    }
}
