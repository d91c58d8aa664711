//! The lifecycle contract every feature module implements.
//!
//! A module is constructed by its factory (which checks the DOM elements it
//! needs), then initialized exactly once with a [`ModuleContext`], then
//! awaited through [`SiteModule::wait_for_ready`]. Teardown goes through
//! [`SiteModule::destroy`], which must be idempotent and safe on a module whose
//! `initialize` never completed.
//!
//! Modules talk to each other over the event bus. The one exception is
//! [`ModuleLookup`]: a read-only handle that resolves a sibling module by kind,
//! restricted to the kinds listed in [`ModuleKind::permitted_lookups`].

use crate::bus::{BusError, EventBus, HandlerResult, Subscription};
use crate::event_loop::{Millis, Scheduler, TimerId};
use crate::host::{Document, Host, HostError};
use crate::scroll::{HandlerId, ScrollCoordinator, ScrollError, ScrollSample};
use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::warn;

// ============================================================================
// Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Loader,
    Language,
    Navigation,
    Gallery,
    Callus,
    Partners,
    Contact,
    Pricing,
}

impl ModuleKind {
    /// Bootstrap order. No module may depend on one that comes after it.
    pub const LOAD_ORDER: [ModuleKind; 8] = [
        ModuleKind::Loader,
        ModuleKind::Language,
        ModuleKind::Navigation,
        ModuleKind::Gallery,
        ModuleKind::Callus,
        ModuleKind::Partners,
        ModuleKind::Contact,
        ModuleKind::Pricing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Loader => "loader",
            ModuleKind::Language => "language",
            ModuleKind::Navigation => "navigation",
            ModuleKind::Gallery => "gallery",
            ModuleKind::Callus => "callus",
            ModuleKind::Partners => "partners",
            ModuleKind::Contact => "contact",
            ModuleKind::Pricing => "pricing",
        }
    }

    /// A failed critical module aborts the whole bootstrap.
    pub fn is_critical(self) -> bool {
        matches!(self, ModuleKind::Loader | ModuleKind::Language)
    }

    pub fn load_position(self) -> usize {
        Self::LOAD_ORDER
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::LOAD_ORDER.len())
    }

    /// Siblings this module may resolve through its [`ModuleLookup`]. Every
    /// entry loads earlier, so the lookup never sees a half-built module.
    pub fn permitted_lookups(self) -> &'static [ModuleKind] {
        match self {
            ModuleKind::Callus => &[ModuleKind::Navigation],
            ModuleKind::Contact => &[ModuleKind::Language],
            ModuleKind::Pricing => &[ModuleKind::Language, ModuleKind::Navigation],
            _ => &[],
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown module `{0}`")]
pub struct UnknownModule(pub String);

impl FromStr for ModuleKind {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::LOAD_ORDER
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownModule(s.to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("required element `{selector}` not found")]
    MissingElement { selector: String },
    #[error("translations unavailable for `{language}` (default `{default}` also failed)")]
    TranslationsUnavailable { language: String, default: String },
    #[error("dependency `{0}` is not available")]
    DependencyUnavailable(ModuleKind),
    #[error("no factory registered for `{0}`")]
    Unregistered(ModuleKind),
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("event bus error: {0}")]
    Bus(#[from] BusError),
    #[error("scroll error: {0}")]
    Scroll(#[from] ScrollError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Failed(String),
}

/// Fail with [`ModuleError::MissingElement`] for the first selector absent
/// from the document.
pub fn require_elements(document: &dyn Document, selectors: &[&str]) -> Result<(), ModuleError> {
    match selectors.iter().find(|s| !document.contains(s)) {
        Some(selector) => Err(ModuleError::MissingElement {
            selector: selector.to_string(),
        }),
        None => Ok(()),
    }
}

// ============================================================================
// Readiness
// ============================================================================

struct ReadyInner {
    tx: RefCell<Option<oneshot::Sender<()>>>,
    rx: Shared<oneshot::Receiver<()>>,
    ready: Cell<bool>,
}

/// One-shot completion marker. Resolved once, never reset; any number of
/// waiters, before or after resolution.
#[derive(Clone)]
pub struct ReadySignal {
    inner: Rc<ReadyInner>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            inner: Rc::new(ReadyInner {
                tx: RefCell::new(Some(tx)),
                rx: rx.shared(),
                ready: Cell::new(false),
            }),
        }
    }

    /// Mark ready. Later calls do nothing.
    pub fn resolve(&self) {
        if let Some(tx) = self.inner.tx.borrow_mut().take() {
            self.inner.ready.set(true);
            let _ = tx.send(());
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.get()
    }

    pub fn wait(&self) -> ReadyWait {
        ReadyWait {
            rx: self.inner.rx.clone(),
        }
    }
}

/// Future returned by [`ReadySignal::wait`]. Yields `false` if the signal was
/// dropped without resolving.
pub struct ReadyWait {
    rx: Shared<oneshot::Receiver<()>>,
}

impl Future for ReadyWait {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.get_mut().rx).poll(cx).map(|r| r.is_ok())
    }
}

// ============================================================================
// Contract
// ============================================================================

#[async_trait(?Send)]
pub trait SiteModule: Any {
    fn kind(&self) -> ModuleKind;

    /// Wire listeners and perform setup. A second call is a no-op.
    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError>;

    /// Resolves once asynchronous setup is finished. Defaults to "ready as
    /// soon as `initialize` returned".
    async fn wait_for_ready(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    fn is_initialized(&self) -> bool;

    /// Release listeners and timers. Idempotent.
    fn destroy(&self) {}

    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// A loaded module as recorded by the orchestrator.
#[derive(Clone)]
pub struct ModuleEntry {
    pub kind: ModuleKind,
    pub instance: Rc<dyn SiteModule>,
    pub enabled: bool,
    pub load_order: usize,
}

pub(crate) type LoadedModules = Rc<RefCell<Vec<ModuleEntry>>>;

pub(crate) fn find_module<T: SiteModule>(entries: &[ModuleEntry], kind: ModuleKind) -> Option<Rc<T>> {
    let instance = entries.iter().find(|e| e.kind == kind)?.instance.clone();
    instance.into_any().downcast::<T>().ok()
}

/// Read-only access to already-loaded siblings, scoped per module.
#[derive(Clone)]
pub struct ModuleLookup {
    loaded: Weak<RefCell<Vec<ModuleEntry>>>,
    permitted: &'static [ModuleKind],
}

impl ModuleLookup {
    pub(crate) fn new(loaded: &LoadedModules, permitted: &'static [ModuleKind]) -> Self {
        Self {
            loaded: Rc::downgrade(loaded),
            permitted,
        }
    }

    /// A lookup that resolves nothing, for modules built outside an app.
    pub fn detached() -> Self {
        Self {
            loaded: Weak::new(),
            permitted: &[],
        }
    }

    pub fn permits(&self, kind: ModuleKind) -> bool {
        self.permitted.contains(&kind)
    }

    /// The sibling of `kind`, if permitted, loaded, and of type `T`.
    pub fn get<T: SiteModule>(&self, kind: ModuleKind) -> Option<Rc<T>> {
        if !self.permits(kind) {
            warn!(module = %kind, "lookup of a module outside the permitted set");
            return None;
        }
        let loaded = self.loaded.upgrade()?;
        let entries = loaded.borrow();
        find_module(&entries, kind)
    }
}

/// Everything a module receives at `initialize`.
#[derive(Clone)]
pub struct ModuleContext {
    pub bus: EventBus,
    pub scroll: ScrollCoordinator,
    pub scheduler: Scheduler,
    pub host: Host,
    pub modules: ModuleLookup,
}

// ============================================================================
// Bindings
// ============================================================================

/// Bus subscriptions, scroll handlers and timers owned by one module,
/// released together on destroy.
#[derive(Default)]
pub struct Bindings {
    subscriptions: Vec<Subscription>,
    scroll_handlers: Vec<HandlerId>,
    timers: Vec<TimerId>,
}

impl Bindings {
    pub fn subscription(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn scroll_handler(&mut self, id: HandlerId) {
        self.scroll_handlers.push(id);
    }

    pub fn timer(&mut self, id: TimerId) {
        self.timers.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty() && self.scroll_handlers.is_empty() && self.timers.is_empty()
    }

    pub fn release(&mut self, scroll: &ScrollCoordinator, scheduler: &Scheduler) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        for id in self.scroll_handlers.drain(..) {
            scroll.unregister_handler(id);
        }
        for id in self.timers.drain(..) {
            scheduler.clear_timeout(id);
        }
    }
}

/// Subscribe `f` to `event`, holding only a weak reference to `target`.
/// Once `target` is gone the callback does nothing.
pub fn subscribe_weak<T: 'static>(
    bus: &EventBus,
    event: &str,
    target: &Rc<T>,
    f: impl Fn(&Rc<T>, &Value) -> HandlerResult + 'static,
) -> Result<Subscription, BusError> {
    let weak = Rc::downgrade(target);
    bus.subscribe(event, move |payload| match weak.upgrade() {
        Some(target) => f(&target, payload),
        None => Ok(()),
    })
}

/// Register a scroll handler holding only a weak reference to `target`.
pub fn scroll_handler_weak<T: 'static>(
    scroll: &ScrollCoordinator,
    target: &Rc<T>,
    priority: i32,
    f: impl Fn(&Rc<T>, &ScrollSample) -> HandlerResult + 'static,
) -> HandlerId {
    let weak = Rc::downgrade(target);
    scroll.register_handler(
        move |sample| match weak.upgrade() {
            Some(target) => f(&target, sample),
            None => Ok(()),
        },
        priority,
    )
}

/// Run `f` after `delay`, if `target` is still alive.
pub fn timeout_weak<T: 'static>(
    scheduler: &Scheduler,
    delay: Millis,
    target: &Rc<T>,
    f: impl FnOnce(&Rc<T>) + 'static,
) -> TimerId {
    let weak = Rc::downgrade(target);
    scheduler.set_timeout(delay, move || {
        if let Some(target) = weak.upgrade() {
            f(&target);
        }
    })
}
