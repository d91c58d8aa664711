//! Application orchestrator.
//!
//! Owns the event bus, the scroll coordinator and the loaded-module list, and
//! drives the bootstrap:
//!
//! ```text
//! Uninitialized ─▶ Initializing ─▶ CoreReady ─▶ ModulesLoading ─▶ ModulesReady ─▶ Ready
//!                       │               │               │                          │
//!                       └───────────────┴───────────────┴─▶ Error ─────────────────┴─▶ Destroyed
//! ```
//!
//! Modules load strictly one after another in [`ModuleKind::LOAD_ORDER`]:
//! each module's `initialize` and `wait_for_ready` settle before the next one
//! is built. A critical module failing aborts the bootstrap with
//! [`AppError::CriticalModule`]; any other failure is logged and the module is
//! left out.
//!
//! A single watchdog timer is armed when bootstrap starts. If the loader has
//! not reported itself hidden by the time it fires, it publishes
//! `loader:forceHide` so the page can never stay stuck behind the loading
//! screen.

use crate::bus::{EventBus, Subscription};
use crate::config::SiteConfig;
use crate::event_loop::{EventLoopError, Millis, Scheduler, TimerId};
use crate::events;
use crate::host::{DomEvent, Host};
use crate::module::{
    LoadedModules, ModuleContext, ModuleEntry, ModuleError, ModuleKind, ModuleLookup, SiteModule,
    find_module,
};
use crate::registry::ModuleRegistry;
use crate::scroll::ScrollCoordinator;
use crate::types::{
    AppFailed, AppReady, ClickInput, HashChangeInput, HoverInput, KeyInput, ModuleFailed,
    ModuleLoaded, PopStateInput, ResizeInput, VisibilityInput,
};
use serde::Serialize;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppState {
    Uninitialized,
    Initializing,
    CoreReady,
    ModulesLoading,
    ModulesReady,
    Ready,
    Error,
    Destroyed,
}

impl AppState {
    pub fn as_str(self) -> &'static str {
        match self {
            AppState::Uninitialized => "uninitialized",
            AppState::Initializing => "initializing",
            AppState::CoreReady => "coreReady",
            AppState::ModulesLoading => "modulesLoading",
            AppState::ModulesReady => "modulesReady",
            AppState::Ready => "ready",
            AppState::Error => "error",
            AppState::Destroyed => "destroyed",
        }
    }

    pub fn can_transition_to(self, next: AppState) -> bool {
        use AppState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, CoreReady)
                | (CoreReady, ModulesLoading)
                | (ModulesLoading, ModulesReady)
                | (ModulesReady, Ready)
                | (Initializing | CoreReady | ModulesLoading, Error)
                | (Ready | Error, Destroyed)
        )
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("critical module `{module}` failed: {source}")]
    CriticalModule {
        module: ModuleKind,
        source: ModuleError,
    },
    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition { from: AppState, to: AppState },
    #[error(transparent)]
    Stalled(#[from] EventLoopError),
}

/// One row of [`App::module_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub module: ModuleKind,
    pub enabled: bool,
    pub critical: bool,
    pub loaded: bool,
    pub initialized: bool,
}

struct Watchdog {
    timer: Option<TimerId>,
    subscriptions: Vec<Subscription>,
}

struct AppInner {
    config: SiteConfig,
    host: Host,
    scheduler: Scheduler,
    bus: EventBus,
    scroll: ScrollCoordinator,
    registry: ModuleRegistry,
    state: Cell<AppState>,
    modules: LoadedModules,
    watchdog: RefCell<Watchdog>,
    started_at: Cell<Millis>,
}

/// Cloneable handle; clones share one application.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppInner>,
}

impl App {
    pub fn new(config: SiteConfig, host: Host, scheduler: Scheduler) -> Self {
        Self::with_registry(config, host, scheduler, ModuleRegistry::standard())
    }

    pub fn with_registry(
        config: SiteConfig,
        host: Host,
        scheduler: Scheduler,
        registry: ModuleRegistry,
    ) -> Self {
        let bus = EventBus::new();
        let scroll = ScrollCoordinator::new(host.viewport.clone(), scheduler.clone(), bus.clone(), &config);
        Self {
            inner: Rc::new(AppInner {
                config,
                host,
                scheduler,
                bus,
                scroll,
                registry,
                state: Cell::new(AppState::Uninitialized),
                modules: Rc::new(RefCell::new(Vec::new())),
                watchdog: RefCell::new(Watchdog {
                    timer: None,
                    subscriptions: Vec::new(),
                }),
                started_at: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn scroll(&self) -> &ScrollCoordinator {
        &self.inner.scroll
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn host(&self) -> &Host {
        &self.inner.host
    }

    pub fn state(&self) -> AppState {
        self.inner.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == AppState::Ready
    }

    fn transition(&self, next: AppState) -> Result<(), AppError> {
        let current = self.inner.state.get();
        if !current.can_transition_to(next) {
            return Err(AppError::InvalidTransition {
                from: current,
                to: next,
            });
        }
        debug!(from = %current, to = %next, "app state");
        self.inner.state.set(next);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Bootstrap
    // ------------------------------------------------------------------------

    /// Load every enabled module in order. A second call is a no-op.
    pub async fn initialize(&self) -> Result<(), AppError> {
        if self.state() != AppState::Uninitialized {
            debug!(state = %self.state(), "initialize called again; ignoring");
            return Ok(());
        }
        let inner = &self.inner;
        inner.started_at.set(inner.scheduler.now());
        self.transition(AppState::Initializing)?;
        info!(name = %inner.config.app.name, version = %inner.config.app.version, "initializing");
        inner.bus.publish(events::APP_INITIALIZING, json!({}));

        self.arm_watchdog();

        self.transition(AppState::CoreReady)?;
        inner.bus.publish(events::APP_CORE_READY, json!({}));

        self.transition(AppState::ModulesLoading)?;
        for kind in ModuleKind::LOAD_ORDER {
            if !inner.config.modules.is_enabled(kind) {
                debug!(module = %kind, "module disabled");
                continue;
            }
            if let Err(err) = self.load_module(kind).await {
                self.fail(&err);
                return Err(err);
            }
        }

        self.transition(AppState::ModulesReady)?;
        let names = self.loaded_names();
        inner
            .bus
            .publish(events::APP_MODULES_READY, json!({ "modules": names }));

        self.transition(AppState::Ready)?;
        let elapsed_ms = inner.scheduler.now() - inner.started_at.get();
        info!(modules = names.len(), elapsed_ms, "ready");
        inner.bus.publish(
            events::APP_READY,
            AppReady {
                modules: names,
                elapsed_ms,
            },
        );
        Ok(())
    }

    fn fail(&self, err: &AppError) {
        error!(error = %err, "bootstrap failed");
        if self.transition(AppState::Error).is_err() {
            self.inner.state.set(AppState::Error);
        }
        self.inner.bus.publish(
            events::APP_ERROR,
            AppFailed {
                error: err.to_string(),
            },
        );
    }

    /// Build, initialize and await one module.
    ///
    /// Returns `Ok(None)` when a non-critical module fails; the failure is
    /// published as `module:error` either way.
    pub async fn load_module(&self, kind: ModuleKind) -> Result<Option<Rc<dyn SiteModule>>, AppError> {
        if let Some(existing) = self.get(kind) {
            return Ok(Some(existing));
        }
        let inner = &self.inner;
        let started = inner.scheduler.now();
        debug!(module = %kind, "loading module");

        let instance = match inner.registry.build(kind, &inner.config, &inner.host) {
            Ok(instance) => instance,
            Err(err) => return self.module_failed(kind, None, err),
        };
        if let Err(err) = instance.initialize(self.context_for(kind)).await {
            return self.module_failed(kind, Some(&instance), err);
        }
        if let Err(err) = instance.wait_for_ready().await {
            return self.module_failed(kind, Some(&instance), err);
        }

        inner.modules.borrow_mut().push(ModuleEntry {
            kind,
            instance: instance.clone(),
            enabled: true,
            load_order: kind.load_position(),
        });
        info!(module = %kind, elapsed_ms = inner.scheduler.now() - started, "module loaded");
        inner.bus.publish(
            events::MODULE_LOADED,
            ModuleLoaded {
                module: kind.to_string(),
            },
        );
        Ok(Some(instance))
    }

    fn module_failed(
        &self,
        kind: ModuleKind,
        instance: Option<&Rc<dyn SiteModule>>,
        err: ModuleError,
    ) -> Result<Option<Rc<dyn SiteModule>>, AppError> {
        if let Some(instance) = instance {
            instance.destroy();
        }
        let critical = kind.is_critical();
        self.inner.bus.publish(
            events::MODULE_ERROR,
            ModuleFailed {
                module: kind.to_string(),
                error: err.to_string(),
                critical,
            },
        );
        if critical {
            error!(module = %kind, error = %err, "critical module failed");
            Err(AppError::CriticalModule {
                module: kind,
                source: err,
            })
        } else {
            warn!(module = %kind, error = %err, "module failed; continuing without it");
            Ok(None)
        }
    }

    fn context_for(&self, kind: ModuleKind) -> ModuleContext {
        let inner = &self.inner;
        ModuleContext {
            bus: inner.bus.clone(),
            scroll: inner.scroll.clone(),
            scheduler: inner.scheduler.clone(),
            host: inner.host.clone(),
            modules: ModuleLookup::new(&inner.modules, kind.permitted_lookups()),
        }
    }

    // ------------------------------------------------------------------------
    // Watchdog
    // ------------------------------------------------------------------------

    fn arm_watchdog(&self) {
        let inner = &self.inner;
        if !inner.config.modules.loader.enabled {
            return;
        }
        let weak = Rc::downgrade(inner);
        let timer = inner
            .scheduler
            .set_timeout(inner.config.watchdog.timeout_ms, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.watchdog.borrow_mut().timer = None;
                    warn!(
                        timeout_ms = inner.config.watchdog.timeout_ms,
                        "watchdog fired; forcing loader hide"
                    );
                    inner.bus.publish(events::LOADER_FORCE_HIDE, json!({}));
                }
            });

        let mut subscriptions = Vec::new();
        for event in [events::LOADER_HIDDEN, events::LOADER_FORCE_HIDDEN] {
            let weak = Rc::downgrade(inner);
            let subscription = inner.bus.subscribe(event, move |_| {
                if let Some(inner) = weak.upgrade() {
                    inner.disarm_watchdog();
                }
                Ok(())
            });
            match subscription {
                Ok(subscription) => subscriptions.push(subscription),
                Err(err) => warn!(error = %err, "watchdog subscription failed"),
            }
        }
        *inner.watchdog.borrow_mut() = Watchdog {
            timer: Some(timer),
            subscriptions,
        };
    }

    pub fn watchdog_armed(&self) -> bool {
        self.inner.watchdog.borrow().timer.is_some()
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    fn get(&self, kind: ModuleKind) -> Option<Rc<dyn SiteModule>> {
        self.inner
            .modules
            .borrow()
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.instance.clone())
    }

    /// Loaded module by name. Absent, failed, disabled and unknown modules
    /// are all `None`.
    pub fn get_module(&self, name: &str) -> Option<Rc<dyn SiteModule>> {
        self.get(name.parse().ok()?)
    }

    /// Typed access to a loaded module.
    pub fn module<T: SiteModule>(&self, kind: ModuleKind) -> Option<Rc<T>> {
        find_module(&self.inner.modules.borrow(), kind)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.get_module(name).is_some()
    }

    /// Names of loaded modules in load order.
    pub fn loaded_names(&self) -> Vec<String> {
        self.inner
            .modules
            .borrow()
            .iter()
            .map(|e| e.kind.to_string())
            .collect()
    }

    pub fn module_status(&self) -> Vec<ModuleStatus> {
        ModuleKind::LOAD_ORDER
            .into_iter()
            .map(|kind| {
                let instance = self.get(kind);
                ModuleStatus {
                    module: kind,
                    enabled: self.inner.config.modules.is_enabled(kind),
                    critical: kind.is_critical(),
                    loaded: instance.is_some(),
                    initialized: instance.is_some_and(|m| m.is_initialized()),
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------------

    /// Announce that the page is live.
    pub fn start(&self) {
        if self.state() != AppState::Ready {
            warn!(state = %self.state(), "start before ready");
        }
        self.inner
            .bus
            .publish(events::APP_START, json!({ "modules": self.loaded_names() }));
    }

    /// Feed one host input event into the site.
    pub fn dispatch(&self, event: DomEvent) {
        if self.state() == AppState::Destroyed {
            return;
        }
        let bus = &self.inner.bus;
        match event {
            DomEvent::Scroll => self.inner.scroll.handle_scroll_event(),
            DomEvent::Click { path } => bus.publish(events::DOM_CLICK, ClickInput { path }),
            DomEvent::KeyDown { key } => bus.publish(events::DOM_KEYDOWN, KeyInput { key }),
            DomEvent::Resize { width, height } => {
                bus.publish(events::DOM_RESIZE, ResizeInput { width, height })
            }
            DomEvent::VisibilityChange { hidden } => {
                bus.publish(events::DOM_VISIBILITY, VisibilityInput { hidden })
            }
            DomEvent::PopState { section } => {
                bus.publish(events::DOM_POPSTATE, PopStateInput { section })
            }
            DomEvent::HashChange { fragment } => {
                bus.publish(events::DOM_HASHCHANGE, HashChangeInput { fragment })
            }
            DomEvent::Hover { target, entered } => {
                bus.publish(events::DOM_HOVER, HoverInput { target, entered })
            }
        }
    }

    /// Tear down modules in reverse load order, then the watchdog and the
    /// scroll coordinator. Allowed from `Ready` or `Error`; repeated calls are
    /// no-ops.
    pub fn destroy(&self) -> Result<(), AppError> {
        if self.state() == AppState::Destroyed {
            return Ok(());
        }
        self.transition(AppState::Destroyed)?;

        let entries: Vec<ModuleEntry> = self.inner.modules.borrow().iter().rev().cloned().collect();
        for entry in entries {
            debug!(module = %entry.kind, "destroying module");
            entry.instance.destroy();
        }
        self.inner.disarm_watchdog();
        self.inner.scroll.destroy();
        self.inner.modules.borrow_mut().clear();

        info!("destroyed");
        self.inner.bus.publish(events::APP_DESTROYED, json!({}));
        Ok(())
    }
}

impl AppInner {
    fn disarm_watchdog(&self) {
        let (timer, subscriptions) = {
            let mut watchdog = self.watchdog.borrow_mut();
            (watchdog.timer.take(), std::mem::take(&mut watchdog.subscriptions))
        };
        if let Some(timer) = timer {
            debug!("watchdog disarmed");
            self.scheduler.clear_timeout(timer);
        }
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
    }
}
