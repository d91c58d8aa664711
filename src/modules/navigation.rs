//! Header navigation: sticky mode, active link, history and the mobile menu.
//!
//! Section changes come exclusively from the scroll coordinator; this module
//! reflects them in the nav links and the history entry. History writes are
//! throttled: [`NavigationModule::go_to_section`] pushes a new entry only if
//! `history_throttle_ms` has passed since the previous push, and replaces the
//! current entry otherwise. Passive section changes always replace.
//!
//! Back/forward (`popstate`) scrolls to the section recorded in the entry
//! without writing history. While that scroll is in flight a guard drops the
//! section-change echoes it causes; the guard lifts `popstate_settle_ms` after
//! the scroll ends, or after `popstate_timeout_ms` at the latest.

use super::publish;
use crate::config::{NavigationOptions, SiteConfig};
use crate::event_loop::{Millis, TimerId};
use crate::events;
use crate::host::{Document, History, Host, Viewport};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    scroll_handler_weak, subscribe_weak, timeout_weak,
};
use crate::scroll::{ScrollCompletion, ScrollError, SectionSubscription};
use crate::types::{
    ClickInput, HashChangeInput, KeyInput, NavigationSection, PopStateInput, ResizeInput,
    from_payload,
};
use crate::util::Debounce;
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

pub const HEADER: &str = ".header";
pub const MAIN_NAV: &str = ".main-nav";
pub const MOBILE_NAV_BUTTON: &str = ".btn-mobile-nav";
pub const BODY: &str = "body";
pub const LOGO: &str = ".logo";
pub const LOGO_SMALL: &str = ".logo-sm";

const STICKY: &str = "sticky";
const ACTIVE: &str = "active";
const HIDDEN: &str = "hidden";
const NAV_OPEN: &str = "nav-open";

/// Delay before the first sticky and section checks after startup.
const INITIAL_CHECK_MS: Millis = 100;

pub fn nav_link(section: &str) -> String {
    format!(r##"{MAIN_NAV} a[href="#{section}"]"##)
}

/// Section named by an in-page anchor selector such as `a[href="#about"]`.
fn anchor_target(selector: &str) -> Option<&str> {
    let (_, rest) = selector.split_once(r##"a[href="#"##)?;
    let (section, _) = rest.split_once(r#""]"#)?;
    Some(section)
}

struct NavState {
    current: String,
    sticky: bool,
    menu_open: bool,
    popstate_guard: bool,
    guard_timer: Option<TimerId>,
    last_push: Option<Millis>,
}

struct Inner {
    options: NavigationOptions,
    sections: Vec<String>,
    debounce_ms: Millis,
    document: Rc<dyn Document>,
    viewport: Rc<dyn Viewport>,
    history: Rc<dyn History>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<NavState>,
    bindings: RefCell<Bindings>,
    section_subscription: RefCell<Option<SectionSubscription>>,
    resize: OnceCell<Debounce>,
    initialized: Cell<bool>,
}

pub struct NavigationModule {
    inner: Rc<Inner>,
}

impl NavigationModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[HEADER, MAIN_NAV])?;
        let options = config.modules.navigation.clone();
        Ok(Self {
            inner: Rc::new(Inner {
                state: RefCell::new(NavState {
                    current: options.hero.clone(),
                    sticky: false,
                    menu_open: false,
                    popstate_guard: false,
                    guard_timer: None,
                    last_push: None,
                }),
                options,
                sections: config.sections.clone(),
                debounce_ms: config.performance.debounce_delay_ms,
                document: host.document.clone(),
                viewport: host.viewport.clone(),
                history: host.history.clone(),
                ctx: OnceCell::new(),
                bindings: RefCell::new(Bindings::default()),
                section_subscription: RefCell::new(None),
                resize: OnceCell::new(),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn current_section(&self) -> String {
        self.inner.state.borrow().current.clone()
    }

    pub fn is_sticky(&self) -> bool {
        self.inner.state.borrow().sticky
    }

    pub fn is_mobile_menu_open(&self) -> bool {
        self.inner.state.borrow().menu_open
    }

    /// Whether section changes are currently being ignored because a
    /// back/forward scroll is in flight.
    pub fn is_handling_popstate(&self) -> bool {
        self.inner.state.borrow().popstate_guard
    }

    /// Scroll to `section`, record it in history and mark its link.
    pub fn go_to_section(&self, section: &str) -> Result<ScrollCompletion, ModuleError> {
        self.inner.go_to_section(section)
    }

    pub fn toggle_mobile_nav(&self) {
        self.inner.toggle_menu();
    }

    pub fn close_mobile_nav(&self) {
        self.inner.close_menu();
    }

    /// Re-run section detection now.
    pub fn force_section_update(&self) {
        if let Some(ctx) = self.inner.ctx.get() {
            ctx.scroll.check_section_immediately();
        }
    }
}

impl Inner {
    fn is_section(&self, section: &str) -> bool {
        self.sections.iter().any(|s| s == section)
    }

    fn now(&self) -> Millis {
        self.ctx.get().map_or(0, |ctx| ctx.scheduler.now())
    }

    // ------------------------------------------------------------------------
    // Sticky header
    // ------------------------------------------------------------------------

    fn check_sticky(&self) {
        let Some(hero) = self.viewport.element_bounds(&self.options.hero) else {
            return;
        };
        let trigger = hero.height * self.options.sticky_threshold;
        let sticky = self.viewport.scroll_top() > trigger;
        if sticky == self.state.borrow().sticky {
            return;
        }
        self.state.borrow_mut().sticky = sticky;
        self.document.set_class(HEADER, STICKY, sticky);
        self.document.set_class(LOGO, HIDDEN, sticky);
        self.document.set_class(LOGO_SMALL, HIDDEN, !sticky);
        debug!(sticky, "sticky navigation");
        let event = if sticky {
            events::NAVIGATION_STICKY_ENABLED
        } else {
            events::NAVIGATION_STICKY_DISABLED
        };
        publish(&self.ctx, event, json!({}));
    }

    // ------------------------------------------------------------------------
    // Sections and history
    // ------------------------------------------------------------------------

    fn mark_link(&self, section: &str) {
        for id in &self.sections {
            let link = nav_link(id);
            let active = id == section;
            self.document.set_class(&link, ACTIVE, active);
            if active {
                self.document.set_attribute(&link, "aria-current", "page");
            } else {
                self.document.remove_attribute(&link, "aria-current");
            }
        }
    }

    fn on_section_changed(&self, section: &str) {
        if self.state.borrow().popstate_guard {
            debug!(section, "section change ignored during popstate");
            return;
        }
        if self.state.borrow().current == section {
            return;
        }
        self.state.borrow_mut().current = section.to_string();
        self.mark_link(section);
        self.history.replace_state(section);
        publish(
            &self.ctx,
            events::NAVIGATION_SECTION_CHANGED,
            NavigationSection {
                section: section.to_string(),
            },
        );
    }

    fn initial_check(&self) {
        self.check_sticky();
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let detected = ctx.scroll.detect_active_section(&self.sections, true);
        if let Some(section) = detected {
            if section != self.state.borrow().current {
                self.on_section_changed(&section);
            }
        }
    }

    fn go_to_section(&self, section: &str) -> Result<ScrollCompletion, ModuleError> {
        if !self.is_section(section) {
            return Err(ScrollError::ElementNotFound(section.to_string()).into());
        }
        let ctx = self
            .ctx
            .get()
            .ok_or(ModuleError::Failed("navigation is not initialized".into()))?;
        ctx.scroll.cancel_scroll();

        let now = self.now();
        let push = {
            let mut state = self.state.borrow_mut();
            let push = state
                .last_push
                .is_none_or(|last| now.saturating_sub(last) >= self.options.history_throttle_ms);
            if push {
                state.last_push = Some(now);
            }
            state.current = section.to_string();
            push
        };
        if push {
            self.history.push_state(section);
        } else {
            self.history.replace_state(section);
        }

        let completion = ctx.scroll.scroll_to_section(section)?;
        self.mark_link(section);
        info!(section, push, "navigating");
        publish(
            &self.ctx,
            events::NAVIGATION_SECTION_CHANGED,
            NavigationSection {
                section: section.to_string(),
            },
        );
        Ok(completion)
    }

    fn release_guard(&self) {
        let timer = {
            let mut state = self.state.borrow_mut();
            state.popstate_guard = false;
            state.guard_timer.take()
        };
        if let (Some(id), Some(ctx)) = (timer, self.ctx.get()) {
            ctx.scheduler.clear_timeout(id);
        }
    }

    fn on_popstate(self: &Rc<Self>, section: Option<String>) {
        let Some(target) = section else {
            return;
        };
        if target == self.state.borrow().current || !self.is_section(&target) {
            return;
        }
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        debug!(section = %target, "popstate");
        {
            let mut state = self.state.borrow_mut();
            state.popstate_guard = true;
            state.current = target.clone();
        }
        ctx.scroll.cancel_scroll();
        self.mark_link(&target);
        let completion = match ctx.scroll.scroll_to_section(&target) {
            Ok(completion) => completion,
            Err(err) => {
                debug!(error = %err, "popstate target missing");
                self.release_guard();
                return;
            }
        };
        let weak = Rc::downgrade(self);
        let scheduler = ctx.scheduler.clone();
        let settle = self.options.popstate_settle_ms;
        ctx.scheduler.spawn(async move {
            completion.await;
            scheduler.sleep(settle).await;
            if let Some(inner) = weak.upgrade() {
                inner.release_guard();
            }
        });

        let previous = self.state.borrow_mut().guard_timer.take();
        if let Some(id) = previous {
            ctx.scheduler.clear_timeout(id);
        }
        let id = timeout_weak(&ctx.scheduler, self.options.popstate_timeout_ms, self, |inner| {
            inner.state.borrow_mut().guard_timer = None;
            inner.release_guard();
        });
        self.state.borrow_mut().guard_timer = Some(id);
    }

    fn on_hashchange(&self, fragment: &str) {
        if self.state.borrow().popstate_guard {
            return;
        }
        if fragment.is_empty() || fragment == self.state.borrow().current || !self.is_section(fragment) {
            return;
        }
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        self.state.borrow_mut().current = fragment.to_string();
        if let Err(err) = ctx.scroll.scroll_to_section(fragment) {
            debug!(error = %err, "hashchange target missing");
        }
        self.mark_link(fragment);
    }

    // ------------------------------------------------------------------------
    // Mobile menu
    // ------------------------------------------------------------------------

    fn set_menu(&self, open: bool) {
        self.state.borrow_mut().menu_open = open;
        self.document.set_class(BODY, NAV_OPEN, open);
        let event = if open {
            events::NAVIGATION_MOBILE_OPENED
        } else {
            events::NAVIGATION_MOBILE_CLOSED
        };
        publish(&self.ctx, event, json!({}));
    }

    fn toggle_menu(&self) {
        let open = !self.state.borrow().menu_open;
        self.set_menu(open);
    }

    fn close_menu(&self) {
        if self.state.borrow().menu_open {
            self.set_menu(false);
        }
    }

    fn on_click(&self, click: &ClickInput) {
        let anchor = click.path.iter().find_map(|s| anchor_target(s));
        if let Some(section) = anchor {
            self.close_menu();
            if self.is_section(section) {
                if let Err(err) = self.go_to_section(section) {
                    debug!(section, error = %err, "anchor navigation failed");
                }
            }
            return;
        }
        if click.within(MOBILE_NAV_BUTTON) {
            self.toggle_menu();
            return;
        }
        if !click.within(MAIN_NAV) {
            self.close_menu();
        }
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let bus = &ctx.bus;
        let mut bindings = self.bindings.borrow_mut();

        bindings.scroll_handler(scroll_handler_weak(&ctx.scroll, self, 1, |inner, _| {
            inner.check_sticky();
            Ok(())
        }));
        let weak = Rc::downgrade(self);
        *self.section_subscription.borrow_mut() = Some(ctx.scroll.on_section_change(move |section| {
            if let Some(inner) = weak.upgrade() {
                inner.on_section_changed(section);
            }
            Ok(())
        }));

        bindings.subscription(subscribe_weak(bus, events::DOM_CLICK, self, |inner, payload| {
            inner.on_click(&from_payload(payload)?);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_KEYDOWN, self, |inner, payload| {
            let key: KeyInput = from_payload(payload)?;
            if key.key == "Escape" {
                inner.close_menu();
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_RESIZE, self, |inner, payload| {
            let resize: ResizeInput = from_payload(payload)?;
            if let Some(debounce) = inner.resize.get() {
                let weak = Rc::downgrade(inner);
                debounce.call(move || {
                    if let Some(inner) = weak.upgrade() {
                        if resize.width >= inner.options.mobile_breakpoint {
                            inner.close_menu();
                        }
                    }
                });
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_POPSTATE, self, |inner, payload| {
            let popstate: PopStateInput = from_payload(payload)?;
            inner.on_popstate(popstate.section);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_HASHCHANGE, self, |inner, payload| {
            let change: HashChangeInput = from_payload(payload)?;
            inner.on_hashchange(&change.fragment);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(
            bus,
            events::NAVIGATION_CLOSE_ALL_MENUS,
            self,
            |inner, _| {
                inner.close_menu();
                Ok(())
            },
        )?);
        bindings.timer(timeout_weak(&ctx.scheduler, INITIAL_CHECK_MS, self, |inner| {
            inner.initial_check();
        }));
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for NavigationModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Navigation
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        let _ = self
            .inner
            .resize
            .set(Debounce::new(ctx.scheduler.clone(), self.inner.debounce_ms));

        if self.inner.history.state().is_none() {
            let initial = self
                .inner
                .history
                .fragment()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| self.inner.options.hero.clone());
            self.inner.history.replace_state(&initial);
        }
        self.inner.wire(&ctx)?;
        self.inner.document.set_class(LOGO_SMALL, HIDDEN, true);

        self.inner.initialized.set(true);
        ctx.bus.publish(events::NAVIGATION_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        if let Some(subscription) = self.inner.section_subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        if let Some(debounce) = self.inner.resize.get() {
            debounce.cancel();
        }
        self.inner.release_guard();
        self.inner.close_menu();
        self.inner.state.borrow_mut().sticky = false;
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DomEvent;
    use crate::scroll::ScrollOutcome;
    use crate::test_helpers::{TestSite, record_events};

    fn navigation(site: &TestSite) -> Rc<NavigationModule> {
        site.app()
            .module::<NavigationModule>(ModuleKind::Navigation)
            .expect("navigation loaded")
    }

    #[test]
    fn anchor_selectors_name_their_section() {
        assert_eq!(anchor_target(&nav_link("about")), Some("about"));
        assert_eq!(anchor_target(r##"a[href="#contact"]"##), Some("contact"));
        assert_eq!(anchor_target(".btn-mobile-nav"), None);
    }

    // =========================================================================
    // Sticky header
    // =========================================================================

    #[test]
    fn sticky_past_threshold_and_back() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let nav = navigation(&site);
        let doc = site.memory.document.clone();

        site.scroll_to(260.0);
        assert!(!nav.is_sticky());

        site.scroll_to(280.0);
        assert!(nav.is_sticky());
        assert!(doc.has_class(HEADER, STICKY));
        assert!(doc.has_class(LOGO, HIDDEN));
        assert!(!doc.has_class(LOGO_SMALL, HIDDEN));

        site.scroll_to(0.0);
        assert!(!nav.is_sticky());
        assert!(!doc.has_class(HEADER, STICKY));
        assert_eq!(events.count(events::NAVIGATION_STICKY_ENABLED), 1);
        assert_eq!(events.count(events::NAVIGATION_STICKY_DISABLED), 1);
    }

    #[test]
    fn sticky_checked_shortly_after_load() {
        let mut site = TestSite::new();
        site.memory.viewport.set_scroll_top(2000.0);
        let app = site.boot();
        let events = record_events(app.bus());
        site.el.advance(INITIAL_CHECK_MS);
        assert!(navigation(&site).is_sticky());
        assert_eq!(events.count(events::NAVIGATION_STICKY_ENABLED), 1);
    }

    // =========================================================================
    // Sections and history
    // =========================================================================

    #[test]
    fn empty_history_gets_initial_entry() {
        let mut site = TestSite::new();
        site.boot();
        assert_eq!(site.memory.history.entries(), vec!["hero"]);
        assert_eq!(site.memory.history.push_count(), 0);
    }

    #[test]
    fn initial_check_picks_up_scrolled_page() {
        let mut site = TestSite::new();
        site.memory.viewport.set_scroll_top(2000.0);
        site.boot();
        site.el.advance(INITIAL_CHECK_MS);
        let nav = navigation(&site);
        assert_eq!(nav.current_section(), "gallerySection");
        assert!(site.memory.document.has_class(&nav_link("gallerySection"), ACTIVE));
        assert_eq!(site.memory.history.state().as_deref(), Some("gallerySection"));
    }

    #[test]
    fn go_to_section_scrolls_and_marks_link() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let nav = navigation(&site);

        let done = nav.go_to_section("gallerySection").unwrap();
        assert_eq!(site.el.block_on(done).unwrap(), ScrollOutcome::Completed);

        assert_eq!(site.memory.viewport.scroll_top(), 1520.0);
        let doc = &site.memory.document;
        assert!(doc.has_class(&nav_link("gallerySection"), ACTIVE));
        assert_eq!(
            doc.attribute(&nav_link("gallerySection"), "aria-current").as_deref(),
            Some("page")
        );
        assert!(!doc.has_class(&nav_link("hero"), ACTIVE));
        assert_eq!(
            events.payload(events::NAVIGATION_SECTION_CHANGED),
            Some(json!({"section": "gallerySection"}))
        );
    }

    #[test]
    fn history_pushes_at_most_once_per_second() {
        let mut site = TestSite::new();
        site.boot();
        let nav = navigation(&site);
        let history = site.memory.history.clone();

        nav.go_to_section("about").unwrap();
        site.el.advance(500);
        nav.go_to_section("services").unwrap();
        assert_eq!(history.push_count(), 1);
        assert_eq!(history.entries(), vec!["hero", "services"]);

        site.el.advance(500);
        nav.go_to_section("pricing").unwrap();
        assert_eq!(history.push_count(), 2);
    }

    #[test]
    fn go_to_section_announces_only_destination() {
        let mut site = TestSite::new();
        let app = site.boot();
        site.el.advance(1000);
        let events = record_events(app.bus());
        let nav = navigation(&site);
        let history = site.memory.history.clone();
        let (pushed, replaced) = (history.push_count(), history.replace_count());

        let done = nav.go_to_section("contact").unwrap();
        let mut seen = Vec::new();
        for _ in 0..60 {
            site.el.advance(16);
            seen.push(nav.current_section());
        }
        assert_eq!(site.el.block_on(done).unwrap(), ScrollOutcome::Completed);
        site.el.advance(500);

        assert!(seen.iter().all(|s| s == "contact"), "{seen:?}");
        assert_eq!(events.count(events::NAVIGATION_SECTION_CHANGED), 1);
        assert_eq!(history.push_count(), pushed + 1);
        assert_eq!(history.replace_count(), replaced);
        assert!(site.memory.document.has_class(&nav_link("contact"), ACTIVE));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let mut site = TestSite::new();
        site.boot();
        let err = navigation(&site).go_to_section("blog").err().unwrap();
        assert!(matches!(err, ModuleError::Scroll(ScrollError::ElementNotFound(_))));
        assert_eq!(site.memory.history.push_count(), 0);
    }

    #[test]
    fn nav_link_click_navigates_and_closes_menu() {
        let mut site = TestSite::new();
        site.boot();
        let nav = navigation(&site);
        nav.toggle_mobile_nav();

        site.click(&[&nav_link("contact"), MAIN_NAV, BODY]);

        assert!(!nav.is_mobile_menu_open());
        assert_eq!(nav.current_section(), "contact");
        assert_eq!(site.memory.history.state().as_deref(), Some("contact"));
    }

    #[test]
    fn popstate_suppresses_section_echoes() {
        let mut site = TestSite::new();
        let app = site.boot();
        site.el.advance(1000);
        let replaces = site.memory.history.replace_count();
        let events = record_events(app.bus());
        let nav = navigation(&site);

        app.dispatch(DomEvent::PopState {
            section: Some("contact".into()),
        });
        assert!(nav.is_handling_popstate());
        assert_eq!(nav.current_section(), "contact");

        site.el.advance(900);
        assert!(nav.is_handling_popstate(), "still settling");
        site.el.advance(100);
        assert!(!nav.is_handling_popstate());

        assert_eq!(events.count(events::NAVIGATION_SECTION_CHANGED), 0);
        assert_eq!(site.memory.history.replace_count(), replaces);
        assert_eq!(site.memory.history.push_count(), 0);
        assert!(site.memory.document.has_class(&nav_link("contact"), ACTIVE));
    }

    #[test]
    fn cancelled_popstate_scroll_still_releases_guard() {
        let mut site = TestSite::new();
        let app = site.boot();
        let nav = navigation(&site);
        app.dispatch(DomEvent::PopState {
            section: Some("about".into()),
        });
        app.scroll().cancel_scroll();

        site.el.advance(99);
        assert!(nav.is_handling_popstate());
        site.el.advance(1);
        assert!(!nav.is_handling_popstate());
    }

    #[test]
    fn popstate_to_current_section_is_ignored() {
        let mut site = TestSite::new();
        let app = site.boot();
        app.dispatch(DomEvent::PopState {
            section: Some("hero".into()),
        });
        app.dispatch(DomEvent::PopState { section: None });
        assert!(!navigation(&site).is_handling_popstate());
        assert!(!app.scroll().is_animating());
    }

    #[test]
    fn hashchange_scrolls_to_known_section() {
        let mut site = TestSite::new();
        let app = site.boot();
        let nav = navigation(&site);

        app.dispatch(DomEvent::HashChange {
            fragment: "services".into(),
        });
        assert_eq!(nav.current_section(), "services");
        assert!(app.scroll().is_animating());

        app.dispatch(DomEvent::HashChange {
            fragment: "nowhere".into(),
        });
        assert_eq!(nav.current_section(), "services");
    }

    // =========================================================================
    // Mobile menu
    // =========================================================================

    #[test]
    fn mobile_menu_toggle_and_dismissal() {
        let mut site = TestSite::new();
        let app = site.boot();
        let nav = navigation(&site);
        let doc = site.memory.document.clone();

        site.click(&[MOBILE_NAV_BUTTON, HEADER]);
        assert!(nav.is_mobile_menu_open());
        assert!(doc.has_class(BODY, NAV_OPEN));

        site.click(&[MAIN_NAV]);
        assert!(nav.is_mobile_menu_open(), "clicks inside the menu keep it open");

        app.dispatch(DomEvent::KeyDown { key: "Escape".into() });
        assert!(!nav.is_mobile_menu_open());

        site.click(&[MOBILE_NAV_BUTTON]);
        site.click(&[".hero", BODY]);
        assert!(!nav.is_mobile_menu_open());

        nav.toggle_mobile_nav();
        app.bus().emit(events::NAVIGATION_CLOSE_ALL_MENUS, &json!({}));
        assert!(!nav.is_mobile_menu_open());
    }

    #[test]
    fn wide_resize_closes_menu_after_debounce() {
        let mut site = TestSite::new();
        let app = site.boot();
        let nav = navigation(&site);

        nav.toggle_mobile_nav();
        app.dispatch(DomEvent::Resize {
            width: 500.0,
            height: 900.0,
        });
        site.el.advance(300);
        assert!(nav.is_mobile_menu_open());

        app.dispatch(DomEvent::Resize {
            width: 1024.0,
            height: 900.0,
        });
        site.el.advance(249);
        assert!(nav.is_mobile_menu_open());
        site.el.advance(1);
        assert!(!nav.is_mobile_menu_open());
    }
}
