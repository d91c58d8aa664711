//! Named-event publish/subscribe hub.
//!
//! Every module talks to every other module through one [`EventBus`]. Payloads
//! are JSON values so producers and consumers only share the event name and
//! the field names, never Rust types. Typed payload structs live in
//! [`crate::types`] and are serialized on publish.
//!
//! ## Delivery guarantees
//!
//! - Callbacks run synchronously, on the publisher's stack, in subscription
//!   order.
//! - Dispatch works on a snapshot: callbacks added during a publish do not see
//!   that publish. A callback removed during a publish is skipped if it has not
//!   run yet.
//! - A callback that returns an error or panics is logged and skipped. The
//!   remaining callbacks still run and the publisher never sees the failure.
//!
//! ## Tokens
//!
//! [`EventBus::subscribe`] returns a [`Subscription`] token. Calling
//! [`Subscription::unsubscribe`] removes exactly that callback, even when the
//! same closure logic is registered twice. Tokens do not unsubscribe on drop;
//! modules collect them and release them in `destroy`.

use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::{error, trace};

/// Error a callback may return. Logged by the bus, never propagated.
pub type HandlerError = Box<dyn std::error::Error>;
pub type HandlerResult = Result<(), HandlerError>;

type Callback = Rc<dyn Fn(&Value) -> HandlerResult>;
type Tap = Rc<dyn Fn(&str, &Value)>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BusError {
    #[error("event name must not be empty")]
    EmptyEventName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<(SubscriptionId, Callback)>>,
    taps: Vec<Tap>,
}

impl Registry {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn remove(&mut self, event: &str, id: SubscriptionId) -> bool {
        let Some(list) = self.listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    fn contains(&self, event: &str, id: SubscriptionId) -> bool {
        self.listeners
            .get(event)
            .is_some_and(|list| list.iter().any(|(sid, _)| *sid == id))
    }
}

/// Cloneable handle to the shared listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

/// Token for one subscription. See [`EventBus::subscribe`].
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    event: String,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove this callback. Idempotent; a no-op once the bus is gone.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.event, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    pub fn subscribe<F>(&self, event: &str, callback: F) -> Result<Subscription, BusError>
    where
        F: Fn(&Value) -> HandlerResult + 'static,
    {
        if event.is_empty() {
            return Err(BusError::EmptyEventName);
        }
        let mut registry = self.registry.borrow_mut();
        let id = registry.allocate();
        registry
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(callback)));
        trace!(event, ?id, "subscribed");
        Ok(self.token(event, id))
    }

    /// Register `callback` for the next publish of `event` only.
    pub fn subscribe_once<F>(&self, event: &str, callback: F) -> Result<Subscription, BusError>
    where
        F: Fn(&Value) -> HandlerResult + 'static,
    {
        if event.is_empty() {
            return Err(BusError::EmptyEventName);
        }
        let mut registry = self.registry.borrow_mut();
        let id = registry.allocate();
        let weak = Rc::downgrade(&self.registry);
        let name = event.to_string();
        let wrapper = move |payload: &Value| {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().remove(&name, id);
            }
            callback(payload)
        };
        registry
            .listeners
            .entry(event.to_string())
            .or_default()
            .push((id, Rc::new(wrapper)));
        Ok(self.token(event, id))
    }

    /// Remove one callback by id. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        self.registry.borrow_mut().remove(event, id)
    }

    /// Remove every callback for `event`.
    pub fn unsubscribe_all(&self, event: &str) {
        self.registry.borrow_mut().listeners.remove(event);
    }

    /// Remove every callback for every event.
    pub fn clear(&self) {
        let mut registry = self.registry.borrow_mut();
        registry.listeners.clear();
        registry.taps.clear();
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.registry
            .borrow()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Observe every publish regardless of name. Used by the timeline
    /// recorder; taps cannot be removed individually, only by [`clear`](Self::clear).
    pub fn tap(&self, observer: impl Fn(&str, &Value) + 'static) {
        self.registry.borrow_mut().taps.push(Rc::new(observer));
    }

    /// Serialize `payload` and deliver it to every subscriber of `event`.
    pub fn publish<T: Serialize>(&self, event: &str, payload: T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.emit(event, &value),
            Err(err) => error!(event, error = %err, "payload serialization failed; event dropped"),
        }
    }

    /// Deliver an already-built JSON payload.
    pub fn emit(&self, event: &str, payload: &Value) {
        let (callbacks, taps) = {
            let registry = self.registry.borrow();
            let callbacks: Vec<(SubscriptionId, Callback)> =
                registry.listeners.get(event).cloned().unwrap_or_default();
            (callbacks, registry.taps.clone())
        };
        trace!(event, listeners = callbacks.len(), "publish");

        for tap in &taps {
            tap(event, payload);
        }

        for (id, callback) in callbacks {
            if !self.registry.borrow().contains(event, id) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(event, error = %err, "event handler failed"),
                Err(panic) => {
                    error!(event, panic = %panic_message(&*panic), "event handler panicked")
                }
            }
        }
    }

    fn token(&self, event: &str, id: SubscriptionId) -> Subscription {
        Subscription {
            registry: Rc::downgrade(&self.registry),
            event: event.to_string(),
            id,
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
