//! Full-screen loading indicator.
//!
//! Shown at startup and kept up for at least `min_display_ms`, then hidden
//! once every module has loaded. Hiding is two-phase: the root element gets
//! `loaded` immediately (which starts the CSS fade) and the wrapper is hidden
//! one throttle interval later, at which point `loader:hidden` goes out.
//!
//! Fallbacks, in order of escalation: a backup hide a second after
//! `app:ready`, an immediate hide on `app:error`, a forced hide on the first
//! click anywhere, and the orchestrator's watchdog publishing
//! `loader:forceHide`.

use super::publish;
use crate::config::{LoaderOptions, SiteConfig};
use crate::event_loop::{Millis, TimerId};
use crate::events;
use crate::host::{Document, Host};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    subscribe_weak, timeout_weak,
};
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const ROOT: &str = "html";
pub const WRAPPER: &str = "#loaderWrapper";

const LOADED: &str = "loaded";
const HIDDEN: &str = "hidden";
const FORCE_HIDE: &str = "loader-force-hide";
const APP_READY: &str = "app-ready";

#[derive(Default)]
struct LoaderState {
    hidden: bool,
    shown_at: Millis,
    hide_timer: Option<TimerId>,
    final_timer: Option<TimerId>,
    backup_timer: Option<TimerId>,
}

struct Inner {
    options: LoaderOptions,
    final_delay: Millis,
    document: Rc<dyn Document>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<LoaderState>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct LoaderModule {
    inner: Rc<Inner>,
}

impl LoaderModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[WRAPPER])?;
        Ok(Self {
            inner: Rc::new(Inner {
                options: config.modules.loader.clone(),
                final_delay: config.performance.throttle_delay_ms,
                document: host.document.clone(),
                ctx: OnceCell::new(),
                state: RefCell::new(LoaderState::default()),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.state.borrow().hidden
    }

    pub fn show(&self) {
        self.inner.show();
    }

    pub fn hide(&self) {
        self.inner.hide();
    }

    pub fn force_hide(&self) {
        self.inner.force_hide();
    }

    /// Bring the loader back and restart the minimum display window.
    pub fn restart(&self) {
        info!("loader restarting");
        self.inner.state.borrow_mut().hidden = false;
        self.inner.show();
    }
}

impl Inner {
    fn now(&self) -> Millis {
        self.ctx.get().map_or(0, |ctx| ctx.scheduler.now())
    }

    fn clear_timers(&self) {
        let timers = {
            let mut state = self.state.borrow_mut();
            [
                state.hide_timer.take(),
                state.final_timer.take(),
                state.backup_timer.take(),
            ]
        };
        if let Some(ctx) = self.ctx.get() {
            for id in timers.into_iter().flatten() {
                ctx.scheduler.clear_timeout(id);
            }
        }
    }

    fn show(&self) {
        self.clear_timers();
        let now = self.now();
        {
            let mut state = self.state.borrow_mut();
            state.hidden = false;
            state.shown_at = now;
        }
        self.document.set_class(ROOT, LOADED, false);
        self.document.set_class(ROOT, APP_READY, false);
        self.document.set_class(WRAPPER, HIDDEN, false);
        self.document.set_class(WRAPPER, FORCE_HIDE, false);
        publish(&self.ctx, events::LOADER_SHOWN, json!({}));
    }

    /// Hide once the minimum display window has passed.
    fn hide_with_delay(self: &Rc<Self>) {
        if self.state.borrow().hidden {
            return;
        }
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let elapsed = self.now().saturating_sub(self.state.borrow().shown_at);
        let remaining = self.options.min_display_ms.saturating_sub(elapsed);
        debug!(elapsed_ms = elapsed, remaining_ms = remaining, "loader hide scheduled");

        let previous = self.state.borrow_mut().hide_timer.take();
        if let Some(id) = previous {
            ctx.scheduler.clear_timeout(id);
        }
        let id = timeout_weak(&ctx.scheduler, remaining, self, |inner| {
            inner.state.borrow_mut().hide_timer = None;
            inner.hide();
        });
        self.state.borrow_mut().hide_timer = Some(id);
    }

    fn hide(self: &Rc<Self>) {
        if self.state.borrow().hidden {
            return;
        }
        self.clear_timers();
        self.state.borrow_mut().hidden = true;
        self.document.set_class(ROOT, LOADED, true);

        let Some(ctx) = self.ctx.get() else {
            self.document.set_class(WRAPPER, HIDDEN, true);
            return;
        };
        let id = timeout_weak(&ctx.scheduler, self.final_delay, self, |inner| {
            inner.state.borrow_mut().final_timer = None;
            inner.document.set_class(WRAPPER, HIDDEN, true);
            info!("loader hidden");
            publish(&inner.ctx, events::LOADER_HIDDEN, json!({}));
        });
        self.state.borrow_mut().final_timer = Some(id);
    }

    fn force_hide(&self) {
        self.clear_timers();
        self.state.borrow_mut().hidden = true;
        self.document.set_class(WRAPPER, HIDDEN, true);
        self.document.set_class(WRAPPER, FORCE_HIDE, true);
        self.document.set_class(ROOT, LOADED, true);
        self.document.set_class(ROOT, APP_READY, true);
        warn!("loader force-hidden");
        publish(&self.ctx, events::LOADER_FORCE_HIDDEN, json!({}));
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let bus = &ctx.bus;
        let mut bindings = self.bindings.borrow_mut();

        bindings.subscription(subscribe_weak(bus, events::APP_MODULES_READY, self, |inner, _| {
            inner.hide_with_delay();
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::APP_READY, self, |inner, _| {
            let Some(ctx) = inner.ctx.get() else {
                return Ok(());
            };
            let id = timeout_weak(&ctx.scheduler, inner.options.backup_hide_ms, inner, |inner| {
                inner.state.borrow_mut().backup_timer = None;
                if !inner.state.borrow().hidden {
                    debug!("loader backup hide");
                    inner.hide_with_delay();
                }
            });
            inner.state.borrow_mut().backup_timer = Some(id);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::APP_ERROR, self, |inner, _| {
            inner.hide();
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::LOADER_SHOW, self, |inner, _| {
            inner.show();
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::LOADER_HIDE, self, |inner, _| {
            inner.hide();
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::LOADER_FORCE_HIDE, self, |inner, _| {
            inner.force_hide();
            Ok(())
        })?);

        let weak = Rc::downgrade(self);
        bindings.subscription(bus.subscribe_once(events::DOM_CLICK, move |_| {
            if let Some(inner) = weak.upgrade() {
                if !inner.state.borrow().hidden {
                    debug!("loader hidden on first interaction");
                    inner.force_hide();
                }
            }
            Ok(())
        })?);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for LoaderModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Loader
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        self.inner.wire(&ctx)?;
        self.inner.show();
        self.inner.initialized.set(true);
        ctx.bus.publish(events::LOADER_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        self.inner.clear_timers();
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TestSite, record_events};

    fn loader(site: &TestSite) -> Rc<LoaderModule> {
        site.app()
            .module::<LoaderModule>(ModuleKind::Loader)
            .expect("loader loaded")
    }

    // =========================================================================
    // Minimum display
    // =========================================================================

    #[test]
    fn hides_after_minimum_display() {
        let mut site = TestSite::new();
        let app = site.boot();
        let doc = site.memory.document.clone();

        site.el.advance_to(1999);
        assert!(!doc.has_class(ROOT, LOADED));
        let events = record_events(app.bus());

        site.el.advance_to(2000);
        assert!(doc.has_class(ROOT, LOADED));
        assert!(!doc.has_class(WRAPPER, HIDDEN));
        assert!(events.is_empty());

        site.el.advance_to(2016);
        assert!(doc.has_class(WRAPPER, HIDDEN));
        assert_eq!(events.names(), vec![events::LOADER_HIDDEN.to_string()]);
        assert!(loader(&site).is_hidden());
    }

    #[test]
    fn slow_bootstrap_hides_without_extra_wait() {
        let mut site = TestSite::new();
        site.memory
            .translations
            .set_latency(site.el.scheduler(), 2500);
        let app = site.boot();
        let start = site.el.now();
        assert!(start >= 2500);
        let events = record_events(app.bus());

        site.el.advance(16);
        assert_eq!(events.names(), vec![events::LOADER_HIDDEN.to_string()]);
    }

    // =========================================================================
    // Fallbacks
    // =========================================================================

    #[test]
    fn first_click_forces_hide() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());

        site.click(&["body"]);

        let doc = &site.memory.document;
        assert!(doc.has_class(WRAPPER, FORCE_HIDE));
        assert!(doc.has_class(ROOT, APP_READY));
        assert_eq!(events.count(events::LOADER_FORCE_HIDDEN), 1);

        site.el.advance(5000);
        assert_eq!(events.count(events::LOADER_HIDDEN), 0, "pending hide was cleared");
    }

    #[test]
    fn manual_hide_and_show() {
        let mut site = TestSite::new();
        let app = site.boot();
        app.bus().emit(events::LOADER_HIDE, &json!({}));
        assert!(loader(&site).is_hidden());

        app.bus().emit(events::LOADER_SHOW, &json!({}));
        assert!(!loader(&site).is_hidden());
        assert!(!site.memory.document.has_class(ROOT, LOADED));
    }

    #[test]
    fn restart_resets_minimum_display() {
        let mut site = TestSite::new();
        let app = site.boot();
        site.el.advance_to(3000);
        let loader = loader(&site);
        assert!(loader.is_hidden());

        loader.restart();
        assert!(!loader.is_hidden());
        app.bus().emit(events::APP_MODULES_READY, &json!({}));
        site.el.advance(1999);
        assert!(!loader.is_hidden());
        site.el.advance(1);
        assert!(loader.is_hidden());
    }

    #[test]
    fn destroy_stops_listening() {
        let mut site = TestSite::new();
        let app = site.boot();
        let loader = loader(&site);
        loader.destroy();
        app.bus().emit(events::LOADER_FORCE_HIDE, &json!({}));
        assert!(!site.memory.document.has_class(WRAPPER, FORCE_HIDE));
        assert!(!loader.is_initialized());
    }
}
