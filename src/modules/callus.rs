//! Floating "call us" widget.
//!
//! A round button that only appears once the header is sticky. It opens a
//! small dialog with the phone number, and the number itself expands into
//! call options. Everything closes on scroll, Escape, an outside click and
//! `navigation:closeAllMenus`.

use super::navigation::NavigationModule;
use super::publish;
use crate::config::{CallusOptions, SiteConfig};
use crate::events;
use crate::host::{Document, Host};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    scroll_handler_weak, subscribe_weak,
};
use crate::types::{ClickInput, KeyInput, from_payload};
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::debug;

pub const DIALOG: &str = ".callUs";
pub const OPEN_BUTTON: &str = ".open-callUs";
pub const CLOSE_BUTTON: &str = ".callUs-close";
pub const CALL_BUTTON: &str = ".phone-number";
pub const OPTIONS: &str = "#callOptions";

const DIALOG_OPEN: &str = "callUs-is-open";
const HIDDEN: &str = "hidden";
const SHOW: &str = "show";

#[derive(Default)]
struct CallusState {
    open: bool,
    options_open: bool,
    button_visible: bool,
}

struct Inner {
    options: CallusOptions,
    document: Rc<dyn Document>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<CallusState>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct CallusModule {
    inner: Rc<Inner>,
}

impl CallusModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[DIALOG, OPEN_BUTTON])?;
        Ok(Self {
            inner: Rc::new(Inner {
                options: config.modules.callus.clone(),
                document: host.document.clone(),
                ctx: OnceCell::new(),
                state: RefCell::new(CallusState::default()),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.borrow().open
    }

    pub fn are_options_open(&self) -> bool {
        self.inner.state.borrow().options_open
    }

    pub fn is_button_visible(&self) -> bool {
        self.inner.state.borrow().button_visible
    }

    pub fn phone_number(&self) -> &str {
        &self.inner.options.phone_number
    }

    pub fn open(&self) {
        self.inner.set_open(true);
    }

    pub fn close(&self) {
        self.inner.close_all();
    }

    pub fn toggle_options(&self) {
        let open = !self.inner.state.borrow().options_open;
        self.inner.set_options(open);
    }
}

impl Inner {
    fn set_open(&self, open: bool) {
        if self.state.borrow().open == open {
            return;
        }
        self.state.borrow_mut().open = open;
        self.document.set_class(DIALOG, DIALOG_OPEN, open);
        debug!(open, "call-us dialog");
        let event = if open {
            events::CALLUS_OPENED
        } else {
            events::CALLUS_CLOSED
        };
        publish(&self.ctx, event, json!({}));
    }

    fn set_options(&self, open: bool) {
        if self.state.borrow().options_open == open {
            return;
        }
        self.state.borrow_mut().options_open = open;
        self.document.set_class(OPTIONS, SHOW, open);
        let event = if open {
            events::CALLUS_OPTIONS_OPENED
        } else {
            events::CALLUS_OPTIONS_CLOSED
        };
        publish(&self.ctx, event, json!({}));
    }

    fn close_all(&self) {
        self.set_options(false);
        self.set_open(false);
    }

    fn set_button_visible(&self, visible: bool) {
        self.state.borrow_mut().button_visible = visible;
        self.document.set_class(OPEN_BUTTON, HIDDEN, !visible);
        if !visible {
            self.close_all();
        }
    }

    fn on_click(&self, click: &ClickInput) {
        if click.within(CLOSE_BUTTON) {
            self.close_all();
        } else if click.within(CALL_BUTTON) {
            let open = !self.state.borrow().options_open;
            self.set_options(open);
        } else if click.within(OPEN_BUTTON) {
            let open = !self.state.borrow().open;
            if open {
                self.set_open(true);
            } else {
                self.close_all();
            }
        } else if !click.within(DIALOG) && !click.within(OPTIONS) {
            self.close_all();
        }
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let bus = &ctx.bus;
        let mut bindings = self.bindings.borrow_mut();

        if self.options.close_on_scroll {
            bindings.scroll_handler(scroll_handler_weak(&ctx.scroll, self, 3, |inner, sample| {
                if sample.is_scrolling {
                    inner.close_all();
                }
                Ok(())
            }));
        }
        bindings.subscription(subscribe_weak(bus, events::DOM_CLICK, self, |inner, payload| {
            inner.on_click(&from_payload(payload)?);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_KEYDOWN, self, |inner, payload| {
            let key: KeyInput = from_payload(payload)?;
            if key.key == "Escape" {
                inner.close_all();
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(
            bus,
            events::NAVIGATION_CLOSE_ALL_MENUS,
            self,
            |inner, _| {
                inner.close_all();
                Ok(())
            },
        )?);
        if self.options.show_on_sticky {
            bindings.subscription(subscribe_weak(
                bus,
                events::NAVIGATION_STICKY_ENABLED,
                self,
                |inner, _| {
                    inner.set_button_visible(true);
                    Ok(())
                },
            )?);
            bindings.subscription(subscribe_weak(
                bus,
                events::NAVIGATION_STICKY_DISABLED,
                self,
                |inner, _| {
                    inner.set_button_visible(false);
                    Ok(())
                },
            )?);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for CallusModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Callus
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        self.inner.wire(&ctx)?;

        let visible = if self.inner.options.show_on_sticky {
            ctx.modules
                .get::<NavigationModule>(ModuleKind::Navigation)
                .is_some_and(|nav| nav.is_sticky())
        } else {
            true
        };
        self.inner.set_button_visible(visible);
        self.inner
            .document
            .set_attribute(CALL_BUTTON, "href", &format!("tel:{}", self.inner.options.phone_number));

        self.inner.initialized.set(true);
        ctx.bus.publish(events::CALLUS_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        self.inner.close_all();
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DomEvent, Viewport};
    use crate::test_helpers::{TestSite, record_events};

    fn callus(site: &TestSite) -> Rc<CallusModule> {
        site.app()
            .module::<CallusModule>(ModuleKind::Callus)
            .expect("callus loaded")
    }

    #[test]
    fn button_hidden_until_sticky() {
        let mut site = TestSite::new();
        site.boot();
        let callus = callus(&site);
        assert!(!callus.is_button_visible());
        assert!(site.memory.document.has_class(OPEN_BUTTON, HIDDEN));

        site.scroll_to(400.0);
        assert!(callus.is_button_visible());
        assert!(!site.memory.document.has_class(OPEN_BUTTON, HIDDEN));

        site.scroll_to(0.0);
        assert!(!callus.is_button_visible());
    }

    #[test]
    fn shown_when_initial_check_finds_page_scrolled() {
        let mut site = TestSite::new();
        site.memory.viewport.set_scroll_top(2000.0);
        site.boot();
        site.el.advance(100);
        assert!(callus(&site).is_button_visible());
    }

    #[test]
    fn always_visible_without_sticky_gating() {
        let mut site = TestSite::new();
        site.config.modules.callus.show_on_sticky = false;
        site.boot();
        assert!(callus(&site).is_button_visible());
    }

    #[test]
    fn dialog_and_options_toggle_by_click() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let callus = callus(&site);

        site.click(&[OPEN_BUTTON]);
        assert!(callus.is_open());
        assert!(site.memory.document.has_class(DIALOG, DIALOG_OPEN));

        site.click(&[CALL_BUTTON, DIALOG]);
        assert!(callus.are_options_open());
        assert!(site.memory.document.has_class(OPTIONS, SHOW));

        site.click(&[CLOSE_BUTTON, DIALOG]);
        assert!(!callus.is_open());
        assert!(!callus.are_options_open());
        let callus_events: Vec<String> = events
            .names()
            .into_iter()
            .filter(|name| name.starts_with("callus:"))
            .collect();
        assert_eq!(
            callus_events,
            vec![
                events::CALLUS_OPENED,
                events::CALLUS_OPTIONS_OPENED,
                events::CALLUS_OPTIONS_CLOSED,
                events::CALLUS_CLOSED,
            ]
        );
    }

    #[test]
    fn outside_click_and_escape_close() {
        let mut site = TestSite::new();
        let app = site.boot();
        let callus = callus(&site);

        callus.open();
        site.click(&[DIALOG]);
        assert!(callus.is_open(), "clicks inside stay open");
        site.click(&[".hero"]);
        assert!(!callus.is_open());

        callus.open();
        app.dispatch(DomEvent::KeyDown { key: "Escape".into() });
        assert!(!callus.is_open());

        callus.open();
        app.bus().emit(events::NAVIGATION_CLOSE_ALL_MENUS, &json!({}));
        assert!(!callus.is_open());
    }

    #[test]
    fn scrolling_closes_dialog() {
        let mut site = TestSite::new();
        site.boot();
        let callus = callus(&site);
        callus.open();
        callus.toggle_options();
        site.scroll_to(100.0);
        assert!(!callus.is_open());
        assert!(!callus.are_options_open());
    }

    #[test]
    fn call_button_links_phone_number() {
        let mut site = TestSite::new();
        site.boot();
        assert_eq!(
            site.memory.document.attribute(CALL_BUTTON, "href").as_deref(),
            Some("tel:+38268069211")
        );
    }
}
