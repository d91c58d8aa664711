//! Partner logo marquee.
//!
//! The logo track is duplicated in the markup, so moving it left by `speed`
//! pixels per frame and jumping back by half its width once that half has
//! scrolled out gives a seamless loop. The loop only runs while the section
//! is near the viewport, the page is visible and the pointer is not over the
//! track.

use super::publish;
use crate::config::{PartnersOptions, SiteConfig};
use crate::event_loop::{FrameId, Millis};
use crate::events;
use crate::host::{Document, Host};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    scroll_handler_weak, subscribe_weak,
};
use crate::types::{HoverInput, VisibilityInput, from_payload};
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

pub const CONTAINER: &str = ".partners-container";
pub const TRACK: &str = ".marquee-inner";

#[derive(Default)]
struct MarqueeState {
    offset: f64,
    speed: f64,
    running: bool,
    hovered: bool,
    page_hidden: bool,
    offscreen: bool,
    frame: Option<FrameId>,
}

impl MarqueeState {
    fn should_animate(&self) -> bool {
        self.running && !self.hovered && !self.page_hidden && !self.offscreen && self.speed > 0.0
    }
}

struct Inner {
    options: PartnersOptions,
    document: Rc<dyn Document>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<MarqueeState>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct PartnersModule {
    inner: Rc<Inner>,
}

impl PartnersModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[CONTAINER, TRACK])?;
        let options = config.modules.partners.clone();
        Ok(Self {
            inner: Rc::new(Inner {
                state: RefCell::new(MarqueeState {
                    speed: options.speed,
                    ..MarqueeState::default()
                }),
                options,
                document: host.document.clone(),
                ctx: OnceCell::new(),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    /// Current translation of the track in pixels, always in
    /// `(-track_width / 2, 0]`.
    pub fn offset(&self) -> f64 {
        self.inner.state.borrow().offset
    }

    pub fn speed(&self) -> f64 {
        self.inner.state.borrow().speed
    }

    pub fn is_animating(&self) -> bool {
        self.inner.state.borrow().frame.is_some()
    }

    pub fn set_speed(&self, speed: f64) {
        self.inner.state.borrow_mut().speed = speed.max(0.0);
        self.inner.update();
    }

    pub fn pause(&self) {
        self.inner.state.borrow_mut().running = false;
        self.inner.update();
    }

    pub fn resume(&self) {
        self.inner.state.borrow_mut().running = true;
        self.inner.update();
    }

    /// Back to the start position and running.
    pub fn restart(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.offset = 0.0;
            state.running = true;
        }
        self.inner.write_offset();
        self.inner.update();
    }
}

impl Inner {
    fn write_offset(&self) {
        let offset = self.state.borrow().offset;
        self.document
            .set_attribute(TRACK, "style", &format!("transform: translateX({offset}px)"));
    }

    /// Start or stop the frame loop to match the current conditions.
    fn update(self: &Rc<Self>) {
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let (animate, frame) = {
            let state = self.state.borrow();
            (state.should_animate(), state.frame)
        };
        match (animate, frame) {
            (true, None) => {
                debug!("marquee started");
                self.request_frame();
            }
            (false, Some(id)) => {
                debug!("marquee stopped");
                ctx.scheduler.cancel_frame(id);
                self.state.borrow_mut().frame = None;
            }
            _ => {}
        }
    }

    fn request_frame(self: &Rc<Self>) {
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let weak = Rc::downgrade(self);
        let id = ctx.scheduler.request_frame(move |timestamp| {
            if let Some(inner) = weak.upgrade() {
                inner.frame(timestamp);
            }
        });
        self.state.borrow_mut().frame = Some(id);
    }

    fn frame(self: &Rc<Self>, _timestamp: Millis) {
        let half = self.options.track_width / 2.0;
        {
            let mut state = self.state.borrow_mut();
            state.frame = None;
            if !state.should_animate() {
                return;
            }
            state.offset -= state.speed;
            if half > 0.0 && state.offset.abs() >= half {
                state.offset += half;
            }
        }
        self.write_offset();
        self.request_frame();
    }

    fn check_visibility(self: &Rc<Self>) {
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let offscreen = !ctx
            .scroll
            .is_element_in_viewport(&self.options.section, self.options.viewport_offset);
        let changed = {
            let mut state = self.state.borrow_mut();
            let changed = state.offscreen != offscreen;
            state.offscreen = offscreen;
            changed
        };
        if changed {
            self.update();
        }
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let bus = &ctx.bus;
        let mut bindings = self.bindings.borrow_mut();

        bindings.scroll_handler(scroll_handler_weak(&ctx.scroll, self, 10, |inner, _| {
            inner.check_visibility();
            Ok(())
        }));
        if self.options.pause_on_hover {
            bindings.subscription(subscribe_weak(bus, events::DOM_HOVER, self, |inner, payload| {
                let hover: HoverInput = from_payload(payload)?;
                if hover.target == TRACK || hover.target == CONTAINER {
                    inner.state.borrow_mut().hovered = hover.entered;
                    inner.update();
                }
                Ok(())
            })?);
        }
        bindings.subscription(subscribe_weak(bus, events::DOM_VISIBILITY, self, |inner, payload| {
            let visibility: VisibilityInput = from_payload(payload)?;
            inner.state.borrow_mut().page_hidden = visibility.hidden;
            inner.update();
            Ok(())
        })?);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for PartnersModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Partners
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        self.inner.wire(&ctx)?;
        self.inner.state.borrow_mut().running = self.inner.options.auto_start;
        self.inner.write_offset();
        self.inner.check_visibility();
        self.inner.update();

        self.inner.initialized.set(true);
        info!(speed = self.speed(), "partners marquee ready");
        ctx.bus.publish(events::PARTNERS_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        let was_initialized = self.inner.initialized.get();
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
            let frame = self.inner.state.borrow_mut().frame.take();
            if let Some(id) = frame {
                ctx.scheduler.cancel_frame(id);
            }
        }
        self.inner.state.borrow_mut().running = false;
        self.inner.initialized.set(false);
        if was_initialized {
            publish(&self.inner.ctx, events::PARTNERS_DESTROYED, json!({}));
        }
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DomEvent;
    use crate::test_helpers::{TestSite, record_events};

    /// Scroll position that puts the partners section on screen.
    const ON_SCREEN: f64 = 4500.0;

    fn partners(site: &TestSite) -> Rc<PartnersModule> {
        site.app()
            .module::<PartnersModule>(ModuleKind::Partners)
            .expect("partners loaded")
    }

    #[test]
    fn idle_while_off_screen() {
        let mut site = TestSite::new();
        site.boot();
        let partners = partners(&site);
        site.el.advance(500);
        assert!(!partners.is_animating());
        assert_eq!(partners.offset(), 0.0);
    }

    #[test]
    fn moves_by_speed_each_frame_once_visible() {
        let mut site = TestSite::new();
        site.boot();
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);
        assert!(partners.is_animating());

        let before = partners.offset();
        site.el.advance(160);
        assert_eq!(partners.offset(), before - 20.0);
        assert_eq!(
            site.memory.document.attribute(TRACK, "style"),
            Some(format!("transform: translateX({}px)", partners.offset()))
        );
    }

    #[test]
    fn offset_wraps_at_half_track() {
        let mut site = TestSite::new();
        site.boot();
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);
        partners.restart();
        partners.set_speed(500.0);
        site.el.advance(48);
        assert_eq!(partners.offset(), -300.0);
    }

    #[test]
    fn hover_and_hidden_page_pause() {
        let mut site = TestSite::new();
        let app = site.boot();
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);

        app.dispatch(DomEvent::Hover {
            target: TRACK.into(),
            entered: true,
        });
        assert!(!partners.is_animating());
        let paused_at = partners.offset();
        site.el.advance(160);
        assert_eq!(partners.offset(), paused_at);

        app.dispatch(DomEvent::Hover {
            target: TRACK.into(),
            entered: false,
        });
        assert!(partners.is_animating());

        app.dispatch(DomEvent::VisibilityChange { hidden: true });
        assert!(!partners.is_animating());
        app.dispatch(DomEvent::VisibilityChange { hidden: false });
        assert!(partners.is_animating());
    }

    #[test]
    fn scrolling_away_stops_loop() {
        let mut site = TestSite::new();
        site.boot();
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);
        assert!(partners.is_animating());
        site.scroll_to(0.0);
        assert!(!partners.is_animating());
    }

    #[test]
    fn pause_resume_and_zero_speed() {
        let mut site = TestSite::new();
        site.boot();
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);

        partners.pause();
        assert!(!partners.is_animating());
        partners.resume();
        assert!(partners.is_animating());
        partners.set_speed(-3.0);
        assert_eq!(partners.speed(), 0.0);
        assert!(!partners.is_animating());
    }

    #[test]
    fn destroy_announces_once() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);

        partners.destroy();
        partners.destroy();
        assert!(!partners.is_animating());
        assert_eq!(events.count(events::PARTNERS_DESTROYED), 1);
    }

    #[test]
    fn destroy_after_partial_setup_releases_listeners() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let partners = partners(&site);
        site.scroll_to(ON_SCREEN);
        assert!(app.bus().has_listeners(events::DOM_HOVER));

        // Wired, but setup never reached the end.
        partners.inner.initialized.set(false);
        partners.destroy();

        assert!(!app.bus().has_listeners(events::DOM_HOVER));
        assert!(!app.bus().has_listeners(events::DOM_VISIBILITY));
        assert!(!partners.is_animating());
        assert_eq!(events.count(events::PARTNERS_DESTROYED), 0);
    }
}
