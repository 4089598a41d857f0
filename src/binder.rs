//! Idempotent binding of chat widgets to the page connection.
//!
//! DESIGN
//! ======
//! [`UiBinder::bind`] may run any number of times against the same DOM: on
//! page ready and again after every subtree swap. A list node carrying the
//! `data-chat-binding` marker is already bound and is skipped, so handlers
//! and backlog rendering happen once per widget instance.
//!
//! Live bindings are kept in [`Bindings`], which is also the connection's
//! [`Dependents`]: health changes and inbound messages fan out to every
//! binding whose list is still attached. Detached bindings are pruned and
//! never re-entered.

#[cfg(test)]
#[path = "binder_test.rs"]
mod binder_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::config::{ChatConfig, WidgetIds};
use crate::connection::{ConnectionManager, Connector, Dependents};
use crate::dom::{
    Composer, DATA_BINDING, DATA_CURRENT_USER, DATA_RECEIVER_ID, KeyPress, MessageList, Scope, SendControl,
};
use crate::message::Message;
use crate::{history, input, render};

/// Receiver id used when the page provides none or an unparsable one.
pub const UNKNOWN_RECEIVER: u64 = 0;

/// Live state for one chat widget subtree.
pub struct Binding {
    id: String,
    list: Rc<dyn MessageList>,
    composer: Rc<dyn Composer>,
    send: Rc<dyn SendControl>,
    current_user: String,
    receiver_id: u64,
    bound: Cell<bool>,
}

impl Binding {
    fn new(list: Rc<dyn MessageList>, composer: Rc<dyn Composer>, send: Rc<dyn SendControl>) -> Self {
        let current_user = list
            .data(DATA_CURRENT_USER)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let receiver_id = parse_receiver_id(
            composer
                .data(DATA_RECEIVER_ID)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| send.data(DATA_RECEIVER_ID)),
        );

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            list,
            composer,
            send,
            current_user,
            receiver_id,
            bound: Cell::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn list(&self) -> &dyn MessageList {
        self.list.as_ref()
    }

    pub fn composer(&self) -> &dyn Composer {
        self.composer.as_ref()
    }

    pub fn send_control(&self) -> &dyn SendControl {
        self.send.as_ref()
    }

    /// Lowercased display name of the viewing user; may be empty.
    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub fn receiver_id(&self) -> u64 {
        self.receiver_id
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get()
    }

    fn mark_bound(&self) {
        self.bound.set(true);
        self.list.set_data(DATA_BINDING, &self.id);
    }
}

/// Parse a non-negative receiver id, defaulting to [`UNKNOWN_RECEIVER`].
pub fn parse_receiver_id(raw: Option<String>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(UNKNOWN_RECEIVER)
}

/// Registry of bound widgets.
#[derive(Default)]
pub struct Bindings {
    entries: RefCell<Vec<Rc<Binding>>>,
}

impl Bindings {
    fn register(&self, binding: Rc<Binding>) {
        self.entries.borrow_mut().push(binding);
    }

    /// Bindings whose list is still attached, pruning the rest.
    pub fn live(&self) -> Vec<Rc<Binding>> {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|b| b.list.is_attached());
        entries.clone()
    }
}

impl Dependents for Bindings {
    fn connection_changed(&self, connected: bool) {
        for binding in self.live() {
            input::apply_connection_state(&binding, connected);
        }
    }

    fn message_received(&self, message: &Message) {
        for binding in self.live() {
            render::render(&binding, message);
        }
    }
}

/// Finds chat widgets in a scope and wires them to the page connection.
pub struct UiBinder {
    ids: WidgetIds,
    autosize_max_px: u32,
    bindings: Rc<Bindings>,
    connection: Rc<ConnectionManager>,
}

impl UiBinder {
    pub fn new(config: ChatConfig, connector: Box<dyn Connector>) -> Self {
        let bindings = Rc::new(Bindings::default());
        let dependents: Rc<dyn Dependents> = bindings.clone();
        let connection = Rc::new(ConnectionManager::new(config.connection, connector, dependents));
        Self { ids: config.widget, autosize_max_px: config.autosize_max_px, bindings, connection }
    }

    pub fn connection(&self) -> &Rc<ConnectionManager> {
        &self.connection
    }

    pub fn bindings(&self) -> &Rc<Bindings> {
        &self.bindings
    }

    /// Bind the chat widget inside `scope`, if present and not yet bound.
    ///
    /// Returns the new binding, or `None` when nothing was done.
    pub fn bind(&self, scope: &dyn Scope) -> Option<Rc<Binding>> {
        let (Some(list), Some(composer), Some(send)) = (
            scope.message_list(&self.ids.list),
            scope.composer(&self.ids.composer),
            scope.send_control(&self.ids.send),
        ) else {
            log::debug!("no complete chat widget in scope");
            return None;
        };

        if list.data(DATA_BINDING).is_some() {
            return None;
        }

        let binding = Rc::new(Binding::new(list, composer, send));
        binding.mark_bound();
        self.bindings.register(binding.clone());
        log::debug!("bound chat widget {} for receiver {}", binding.id(), binding.receiver_id());

        self.connection.ensure_connection();
        input::apply_connection_state(&binding, self.connection.is_connected());
        history::preload(&binding);
        input::autosize(binding.composer(), self.autosize_max_px);
        self.attach_handlers(&binding);

        Some(binding)
    }

    fn attach_handlers(&self, binding: &Rc<Binding>) {
        let max_px = self.autosize_max_px;

        let weak = Rc::downgrade(binding);
        let connection = self.connection.clone();
        binding.send_control().on_click(Box::new(move || {
            with_binding(&weak, |b| {
                input::send(b, &connection, max_px);
            });
        }));

        let weak = Rc::downgrade(binding);
        let connection = self.connection.clone();
        binding.composer().on_keydown(Box::new(move |key: &KeyPress| match input::key_action(key) {
            input::KeyAction::Send => {
                with_binding(&weak, |b| {
                    input::send(b, &connection, max_px);
                });
                true
            }
            input::KeyAction::Default => false,
        }));

        let weak = Rc::downgrade(binding);
        binding.composer().on_input(Box::new(move || {
            with_binding(&weak, |b| input::autosize(b.composer(), max_px));
        }));
    }
}

fn with_binding(weak: &Weak<Binding>, f: impl FnOnce(&Binding)) {
    if let Some(binding) = weak.upgrade() {
        f(&binding);
    }
}
