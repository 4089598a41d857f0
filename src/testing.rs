//! In-memory DOM and connector fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionManager, Connector, Dependents, LifecycleEvent, Reactions};
use crate::message::Message;
use crate::dom::{Composer, Handler, KeyHandler, KeyPress, MessageList, Scope, SendControl};
use crate::render::Bubble;

/// Intrinsic height of an empty composer.
pub const MIN_HEIGHT: u32 = 40;
/// Height added per line of content.
pub const LINE_HEIGHT: u32 = 20;

#[derive(Default)]
pub struct FakeList {
    data: RefCell<HashMap<String, String>>,
    pub bubbles: RefCell<Vec<Bubble>>,
    pub scrolls: Cell<usize>,
    detached: Cell<bool>,
}

impl FakeList {
    pub fn with_data(pairs: &[(&str, &str)]) -> Rc<Self> {
        let list = Self::default();
        for (k, v) in pairs {
            list.data.borrow_mut().insert((*k).to_owned(), (*v).to_owned());
        }
        Rc::new(list)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    pub fn detach(&self) {
        self.detached.set(true);
    }

    pub fn rendered(&self) -> usize {
        self.bubbles.borrow().len()
    }
}

impl MessageList for FakeList {
    fn data(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn set_data(&self, key: &str, value: &str) {
        self.data.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    fn remove_data(&self, key: &str) {
        self.data.borrow_mut().remove(key);
    }

    fn append_bubble(&self, bubble: &Bubble) {
        self.bubbles.borrow_mut().push(bubble.clone());
    }

    fn scroll_to_latest(&self) {
        self.scrolls.set(self.scrolls.get() + 1);
    }

    fn is_attached(&self) -> bool {
        !self.detached.get()
    }
}

#[derive(Default)]
pub struct FakeComposer {
    data: RefCell<HashMap<String, String>>,
    value: RefCell<String>,
    height: Cell<Option<u32>>,
    pub scrollable: Cell<bool>,
    pub focus_count: Cell<usize>,
    keydown: RefCell<Vec<KeyHandler>>,
    input: RefCell<Vec<Handler>>,
}

impl FakeComposer {
    pub fn with_data(pairs: &[(&str, &str)]) -> Rc<Self> {
        let composer = Self::default();
        for (k, v) in pairs {
            composer.data.borrow_mut().insert((*k).to_owned(), (*v).to_owned());
        }
        Rc::new(composer)
    }

    /// Set the value and fire input handlers, like typing.
    pub fn type_text(&self, text: &str) {
        *self.value.borrow_mut() = text.to_owned();
        for handler in self.input.borrow().iter() {
            handler();
        }
    }

    /// Fire keydown handlers; returns whether the default was suppressed.
    pub fn press(&self, key: &str, shift: bool) -> bool {
        let press = KeyPress::new(key, shift);
        let mut prevented = false;
        for handler in self.keydown.borrow().iter() {
            prevented |= handler(&press);
        }
        prevented
    }

    pub fn current_value(&self) -> String {
        self.value.borrow().clone()
    }

    pub fn height(&self) -> Option<u32> {
        self.height.get()
    }

    pub fn keydown_handlers(&self) -> usize {
        self.keydown.borrow().len()
    }

    pub fn input_handlers(&self) -> usize {
        self.input.borrow().len()
    }
}

impl Composer for FakeComposer {
    fn data(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    fn value(&self) -> String {
        self.current_value()
    }

    fn set_value(&self, value: &str) {
        *self.value.borrow_mut() = value.to_owned();
    }

    fn reset_height(&self) {
        self.height.set(None);
    }

    fn scroll_height(&self) -> u32 {
        let lines = u32::try_from(self.value.borrow().split('\n').count()).unwrap_or(u32::MAX);
        MIN_HEIGHT.max(lines.saturating_mul(LINE_HEIGHT))
    }

    fn set_height(&self, px: u32) {
        self.height.set(Some(px));
    }

    fn set_scrollable(&self, scrollable: bool) {
        self.scrollable.set(scrollable);
    }

    fn focus(&self) {
        self.focus_count.set(self.focus_count.get() + 1);
    }

    fn on_keydown(&self, handler: KeyHandler) {
        self.keydown.borrow_mut().push(handler);
    }

    fn on_input(&self, handler: Handler) {
        self.input.borrow_mut().push(handler);
    }
}

#[derive(Default)]
pub struct FakeSend {
    data: RefCell<HashMap<String, String>>,
    pub disabled: Cell<bool>,
    click: RefCell<Vec<Handler>>,
}

impl FakeSend {
    pub fn with_data(pairs: &[(&str, &str)]) -> Rc<Self> {
        let send = Self::default();
        for (k, v) in pairs {
            send.data.borrow_mut().insert((*k).to_owned(), (*v).to_owned());
        }
        Rc::new(send)
    }

    pub fn click(&self) {
        for handler in self.click.borrow().iter() {
            handler();
        }
    }

    pub fn click_handlers(&self) -> usize {
        self.click.borrow().len()
    }
}

impl SendControl for FakeSend {
    fn data(&self, key: &str) -> Option<String> {
        self.data.borrow().get(key).cloned()
    }

    fn set_disabled(&self, disabled: bool) {
        self.disabled.set(disabled);
    }

    fn on_click(&self, handler: Handler) {
        self.click.borrow_mut().push(handler);
    }
}

/// A scope holding any subset of the three widget elements.
#[derive(Clone, Default)]
pub struct FakeScope {
    pub list: Option<Rc<FakeList>>,
    pub composer: Option<Rc<FakeComposer>>,
    pub send: Option<Rc<FakeSend>>,
}

impl FakeScope {
    pub fn widget(list: Rc<FakeList>, composer: Rc<FakeComposer>, send: Rc<FakeSend>) -> Self {
        Self { list: Some(list), composer: Some(composer), send: Some(send) }
    }

    /// A complete widget with no data attributes.
    pub fn empty_widget() -> Self {
        Self::widget(FakeList::with_data(&[]), FakeComposer::with_data(&[]), FakeSend::with_data(&[]))
    }

    pub fn fake_list(&self) -> &FakeList {
        self.list.as_deref().expect("scope has a list")
    }

    pub fn fake_composer(&self) -> &FakeComposer {
        self.composer.as_deref().expect("scope has a composer")
    }

    pub fn fake_send(&self) -> &FakeSend {
        self.send.as_deref().expect("scope has a send control")
    }
}

impl Scope for FakeScope {
    fn message_list(&self, _id: &str) -> Option<Rc<dyn MessageList>> {
        self.list.clone().map(|l| l as Rc<dyn MessageList>)
    }

    fn composer(&self, _id: &str) -> Option<Rc<dyn Composer>> {
        self.composer.clone().map(|c| c as Rc<dyn Composer>)
    }

    fn send_control(&self, _id: &str) -> Option<Rc<dyn SendControl>> {
        self.send.clone().map(|s| s as Rc<dyn SendControl>)
    }
}

/// Shared record of what the fake connector saw.
#[derive(Default)]
pub struct FakeNetwork {
    pub opens: Cell<usize>,
    pub emitted: RefCell<Vec<(String, Value)>>,
    reactions: RefCell<Option<Rc<Reactions>>>,
}

impl FakeNetwork {
    /// Deliver a lifecycle event through the registered reactions.
    pub fn fire(&self, event: LifecycleEvent) {
        let reactions = self.reactions.borrow().clone();
        if let Some(reactions) = reactions {
            reactions.dispatch(event);
        }
    }

    pub fn connect(&self) {
        self.fire(LifecycleEvent::Connect);
    }

    pub fn receive(&self, payload: Value) {
        self.fire(LifecycleEvent::Inbound { event: "receive_message".to_owned(), payload: Some(payload) });
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.borrow().len()
    }

    /// Reactions handed over by the last `open`.
    pub fn reactions(&self) -> Option<Rc<Reactions>> {
        self.reactions.borrow().clone()
    }
}

pub struct FakeConnector {
    network: Rc<FakeNetwork>,
}

impl FakeConnector {
    pub fn pair() -> (Box<dyn Connector>, Rc<FakeNetwork>) {
        let network = Rc::new(FakeNetwork::default());
        (Box::new(Self { network: network.clone() }), network)
    }
}

impl Connector for FakeConnector {
    fn open(&self, _config: &ConnectionConfig, reactions: Rc<Reactions>) -> Box<dyn Connection> {
        self.network.opens.set(self.network.opens.get() + 1);
        *self.network.reactions.borrow_mut() = Some(reactions);
        Box::new(FakeConnection { network: self.network.clone() })
    }
}

struct FakeConnection {
    network: Rc<FakeNetwork>,
}

impl Connection for FakeConnection {
    fn emit(&self, event: &str, payload: Value) {
        self.network.emitted.borrow_mut().push((event.to_owned(), payload));
    }
}

/// Dependents that remember every notification.
#[derive(Default)]
pub struct Recorder {
    pub changes: RefCell<Vec<bool>>,
    pub messages: RefCell<Vec<Message>>,
}

impl Dependents for Recorder {
    fn connection_changed(&self, connected: bool) {
        self.changes.borrow_mut().push(connected);
    }

    fn message_received(&self, message: &Message) {
        self.messages.borrow_mut().push(message.clone());
    }
}

/// A manager over the fake connector with recording dependents.
pub fn recorded_manager() -> (ConnectionManager, Rc<FakeNetwork>, Rc<Recorder>) {
    let (connector, network) = FakeConnector::pair();
    let recorder = Rc::new(Recorder::default());
    let dependents: Rc<dyn Dependents> = recorder.clone();
    (ConnectionManager::new(ConnectionConfig::default(), connector, dependents), network, recorder)
}
