//! Scroll coordinator: the only listener on the viewport scroll signal.
//!
//! Every consumer registers a handler here and receives normalized
//! [`ScrollSample`]s instead of attaching its own listener, so all of them see
//! the same position at the same time.
//!
//! ## Pipeline
//!
//! ```text
//! host scroll ──▶ throttle (1 frame) ──▶ tick ──┬─▶ handlers (isScrolling = true)
//!                                               ├─▶ section check in 50 ms
//!                                               └─▶ settle timer (100 ms idle)
//!                                                      └─▶ handlers (isScrolling = false)
//! ```
//!
//! Ticks with a movement of one pixel or less are dropped before dispatch.
//!
//! ## Active section
//!
//! [`ScrollCoordinator::detect_active_section`] walks the sections from last
//! to first twice:
//!
//! 1. The first (i.e. lowest on the page) section whose span contains the
//!    viewport midpoint wins. Bounds are inclusive, so on an exact boundary
//!    the later section wins.
//! 2. Otherwise the lowest section whose top is within `trigger_fraction` of
//!    the viewport height above the current scroll position.
//! 3. Otherwise the first section in the list.
//!
//! Midpoint containment always takes precedence over the trigger line.
//! Unforced calls inside `section_interval_ms` of the previous computation
//! return the cached value. A change is announced exactly once, on the bus as
//! `scroll:sectionChanged` and to direct [`on_section_change`] callbacks.
//!
//! ## Programmatic scrolling
//!
//! [`scroll_to_element`](ScrollCoordinator::scroll_to_element) animates with a
//! cubic ease-in-out on the frame clock. Samples dispatched during the
//! animation carry `is_programmatic = true`. Section detection is suspended
//! while the animation runs and forced once when it lands, so only the
//! destination is announced. A new request cancels the previous one; the
//! returned [`ScrollCompletion`] resolves with how the animation ended.
//! Cancelling also drops any pending section check and settle sample.
//!
//! [`on_section_change`]: ScrollCoordinator::on_section_change

use crate::bus::{EventBus, HandlerResult, panic_message};
use crate::config::{ScrollConfig, SiteConfig};
use crate::event_loop::{FrameId, Millis, Scheduler, TimerId};
use crate::events;
use crate::host::Viewport;
use crate::types::SectionChanged;
use crate::util::{Throttle, ease_in_out_cubic, lerp};
use futures::channel::oneshot;
use serde::Serialize;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, error, trace};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScrollError {
    #[error("scroll target `{0}` not found")]
    ElementNotFound(String),
    #[error("scroll coordinator has been destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    None,
}

/// One normalized scroll observation, valid for a single dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSample {
    pub scroll_top: f64,
    pub direction: ScrollDirection,
    pub delta: f64,
    pub viewport_height: f64,
    pub document_height: f64,
    pub is_scrolling: bool,
    pub is_programmatic: bool,
}

/// Snapshot of the coordinator's view of the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    pub scroll_top: f64,
    pub direction: ScrollDirection,
    pub is_scrolling: bool,
    pub is_programmatic: bool,
    pub viewport_height: f64,
    pub document_height: f64,
    /// Percent of the scrollable range covered, 0-100.
    pub progress: f64,
    pub active_section: Option<String>,
}

/// How a programmatic scroll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    Completed,
    /// Already within `min_distance` of the target; nothing animated.
    AlreadyInPlace,
    /// Superseded by another request, `cancel_scroll`, or `destroy`.
    Cancelled,
}

/// Resolves when a programmatic scroll finishes or is cancelled.
pub struct ScrollCompletion {
    rx: oneshot::Receiver<ScrollOutcome>,
}

impl Future for ScrollCompletion {
    type Output = ScrollOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ScrollOutcome> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(ScrollOutcome::Cancelled))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type ScrollHandler = Rc<dyn Fn(&ScrollSample) -> HandlerResult>;
type SectionCallback = Rc<dyn Fn(&str) -> HandlerResult>;

struct HandlerEntry {
    id: HandlerId,
    priority: i32,
    handler: ScrollHandler,
}

struct Animation {
    frame: Option<FrameId>,
    start_top: f64,
    target_top: f64,
    start_time: Millis,
    done: Option<oneshot::Sender<ScrollOutcome>>,
}

impl Animation {
    fn finish(&mut self, outcome: ScrollOutcome) {
        if let Some(tx) = self.done.take() {
            let _ = tx.send(outcome);
        }
    }
}

struct State {
    handlers: Vec<HandlerEntry>,
    section_callbacks: Vec<(u64, SectionCallback)>,
    next_id: u64,
    throttle: Throttle,
    last_scroll_top: f64,
    direction: ScrollDirection,
    is_scrolling: bool,
    is_programmatic: bool,
    settle_timer: Option<TimerId>,
    section_timer: Option<TimerId>,
    initial_timer: Option<TimerId>,
    animation: Option<Animation>,
    active_section: Option<String>,
    last_detection: Option<Millis>,
    recompute_count: u64,
    destroyed: bool,
}

struct Inner {
    viewport: Rc<dyn Viewport>,
    scheduler: Scheduler,
    bus: EventBus,
    config: ScrollConfig,
    sections: Vec<String>,
    state: RefCell<State>,
}

/// Cloneable handle; every clone drives the same coordinator.
#[derive(Clone)]
pub struct ScrollCoordinator {
    inner: Rc<Inner>,
}

/// Token returned by [`ScrollCoordinator::on_section_change`].
pub struct SectionSubscription {
    inner: Weak<Inner>,
    id: u64,
}

impl SectionSubscription {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .state
                .borrow_mut()
                .section_callbacks
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl ScrollCoordinator {
    pub fn new(
        viewport: Rc<dyn Viewport>,
        scheduler: Scheduler,
        bus: EventBus,
        config: &SiteConfig,
    ) -> Self {
        let last_scroll_top = viewport.scroll_top();
        let coordinator = Self {
            inner: Rc::new(Inner {
                viewport,
                scheduler,
                bus,
                config: config.scroll.clone(),
                sections: config.sections.clone(),
                state: RefCell::new(State {
                    handlers: Vec::new(),
                    section_callbacks: Vec::new(),
                    next_id: 0,
                    throttle: Throttle::new(config.performance.scroll_throttle_ms),
                    last_scroll_top,
                    direction: ScrollDirection::None,
                    is_scrolling: false,
                    is_programmatic: false,
                    settle_timer: None,
                    section_timer: None,
                    initial_timer: None,
                    animation: None,
                    active_section: None,
                    last_detection: None,
                    recompute_count: 0,
                    destroyed: false,
                }),
            }),
        };

        let weak = Rc::downgrade(&coordinator.inner);
        let timer = coordinator
            .inner
            .scheduler
            .set_timeout(coordinator.inner.config.initial_check_ms, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.borrow_mut().initial_timer = None;
                    if !inner.is_programmatic() {
                        inner.check_section_immediately();
                    }
                }
            });
        coordinator.inner.state.borrow_mut().initial_timer = Some(timer);
        coordinator
    }

    /// The configured section ids, in page order.
    pub fn sections(&self) -> &[String] {
        &self.inner.sections
    }

    // ------------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------------

    /// Add a handler called on every scroll tick and once on settle.
    pub fn register_handler(
        &self,
        handler: impl Fn(&ScrollSample) -> HandlerResult + 'static,
        priority: i32,
    ) -> HandlerId {
        let mut state = self.inner.state.borrow_mut();
        state.next_id += 1;
        let id = HandlerId(state.next_id);
        state.handlers.push(HandlerEntry {
            id,
            priority,
            handler: Rc::new(handler),
        });
        trace!(?id, priority, "scroll handler registered");
        id
    }

    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let before = state.handlers.len();
        state.handlers.retain(|h| h.id != id);
        state.handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.inner.state.borrow().handlers.len()
    }

    /// Direct section-change subscription, bypassing the bus.
    pub fn on_section_change(
        &self,
        callback: impl Fn(&str) -> HandlerResult + 'static,
    ) -> SectionSubscription {
        let mut state = self.inner.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.section_callbacks.push((id, Rc::new(callback)));
        SectionSubscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Host scroll signal. Throttled to one tick per `scroll_throttle_ms`.
    pub fn handle_scroll_event(&self) {
        let now = self.inner.scheduler.now();
        {
            let mut state = self.inner.state.borrow_mut();
            if state.destroyed || !state.throttle.ready(now) {
                return;
            }
        }
        self.inner.tick();
    }

    // ------------------------------------------------------------------------
    // Section detection
    // ------------------------------------------------------------------------

    /// Detect the active section among `ids`. See the module docs for the
    /// precedence rules.
    pub fn detect_active_section<S: AsRef<str>>(&self, ids: &[S], force: bool) -> Option<String> {
        self.inner.detect_active_section(ids, force)
    }

    /// Forced detection over the configured sections.
    pub fn check_section_immediately(&self) -> Option<String> {
        self.inner.check_section_immediately()
    }

    pub fn active_section(&self) -> Option<String> {
        self.inner.state.borrow().active_section.clone()
    }

    /// Number of uncached section computations so far.
    pub fn recompute_count(&self) -> u64 {
        self.inner.state.borrow().recompute_count
    }

    // ------------------------------------------------------------------------
    // Programmatic scrolling
    // ------------------------------------------------------------------------

    /// Smoothly scroll so `target`'s top sits `offset` pixels below the
    /// viewport top.
    pub fn scroll_to_element(
        &self,
        target: &str,
        offset: f64,
    ) -> Result<ScrollCompletion, ScrollError> {
        self.inner.scroll_to_element(target, offset)
    }

    /// [`scroll_to_element`](Self::scroll_to_element) with the configured
    /// header offset.
    pub fn scroll_to_section(&self, target: &str) -> Result<ScrollCompletion, ScrollError> {
        self.inner.scroll_to_element(target, self.inner.config.offset)
    }

    /// Abort any in-flight animation and its pending timers. The viewport
    /// stays where it is.
    pub fn cancel_scroll(&self) {
        self.inner.cancel_scroll();
    }

    pub fn is_animating(&self) -> bool {
        self.inner.state.borrow().animation.is_some()
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn position(&self) -> ScrollPosition {
        let viewport = &self.inner.viewport;
        let state = self.inner.state.borrow();
        ScrollPosition {
            scroll_top: viewport.scroll_top(),
            direction: state.direction,
            is_scrolling: state.is_scrolling,
            is_programmatic: state.is_programmatic,
            viewport_height: viewport.viewport_height(),
            document_height: viewport.document_height(),
            progress: self.scroll_progress(),
            active_section: state.active_section.clone(),
        }
    }

    /// Percent of the scrollable range covered, 0-100.
    pub fn scroll_progress(&self) -> f64 {
        let viewport = &self.inner.viewport;
        let range = viewport.document_height() - viewport.viewport_height();
        if range <= 0.0 {
            return 0.0;
        }
        (viewport.scroll_top() / range * 100.0).clamp(0.0, 100.0)
    }

    pub fn is_at_top(&self, threshold: f64) -> bool {
        self.inner.viewport.scroll_top() <= threshold
    }

    pub fn is_at_bottom(&self, threshold: f64) -> bool {
        let viewport = &self.inner.viewport;
        viewport.scroll_top() + viewport.viewport_height() >= viewport.document_height() - threshold
    }

    /// Percent of the element's height inside the viewport, 0-100.
    pub fn element_visibility(&self, id: &str) -> f64 {
        let viewport = &self.inner.viewport;
        let Some(bounds) = viewport.element_bounds(id) else {
            return 0.0;
        };
        if bounds.height <= 0.0 {
            return 0.0;
        }
        let top = viewport.scroll_top();
        let bottom = top + viewport.viewport_height();
        let visible = (bounds.bottom().min(bottom) - bounds.top.max(top)).max(0.0);
        (visible / bounds.height * 100.0).clamp(0.0, 100.0)
    }

    /// Whether any part of the element is within `margin` pixels of the
    /// viewport.
    pub fn is_element_in_viewport(&self, id: &str, margin: f64) -> bool {
        let viewport = &self.inner.viewport;
        let Some(bounds) = viewport.element_bounds(id) else {
            return false;
        };
        let top = viewport.scroll_top() - margin;
        let bottom = viewport.scroll_top() + viewport.viewport_height() + margin;
        bounds.bottom() > top && bounds.top < bottom
    }

    /// Detach from the scroll signal and drop every handler, callback and
    /// timer. Later scroll events are ignored.
    pub fn destroy(&self) {
        self.inner.cancel_scroll();
        let timers = {
            let mut state = self.inner.state.borrow_mut();
            state.destroyed = true;
            state.handlers.clear();
            state.section_callbacks.clear();
            [
                state.settle_timer.take(),
                state.section_timer.take(),
                state.initial_timer.take(),
            ]
        };
        for id in timers.into_iter().flatten() {
            self.inner.scheduler.clear_timeout(id);
        }
        debug!("scroll coordinator destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.borrow().destroyed
    }
}

impl Inner {
    fn sample(&self, scroll_top: f64, direction: ScrollDirection, delta: f64) -> ScrollSample {
        let state = self.state.borrow();
        ScrollSample {
            scroll_top,
            direction,
            delta,
            viewport_height: self.viewport.viewport_height(),
            document_height: self.viewport.document_height(),
            is_scrolling: state.is_scrolling,
            is_programmatic: state.is_programmatic,
        }
    }

    fn tick(self: &Rc<Self>) {
        let top = self.viewport.scroll_top();
        let (delta, direction) = {
            let mut state = self.state.borrow_mut();
            let delta = (top - state.last_scroll_top).abs();
            let direction = if top > state.last_scroll_top {
                ScrollDirection::Down
            } else if top < state.last_scroll_top {
                ScrollDirection::Up
            } else {
                ScrollDirection::None
            };
            state.last_scroll_top = top;
            state.direction = direction;
            state.is_scrolling = true;
            (delta, direction)
        };

        if delta > 1.0 {
            // The animation runs its own check when it lands.
            if !self.is_programmatic() {
                self.schedule_section_check();
            }
            let sample = self.sample(top, direction, delta);
            self.dispatch(&sample);
        }
        self.schedule_settle();
    }

    fn schedule_settle(self: &Rc<Self>) {
        let previous = self.state.borrow_mut().settle_timer.take();
        if let Some(id) = previous {
            self.scheduler.clear_timeout(id);
        }
        let weak = Rc::downgrade(self);
        let id = self.scheduler.set_timeout(self.config.settle_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.settle();
            }
        });
        self.state.borrow_mut().settle_timer = Some(id);
    }

    fn settle(self: &Rc<Self>) {
        let top = {
            let mut state = self.state.borrow_mut();
            state.settle_timer = None;
            if state.destroyed {
                return;
            }
            state.is_scrolling = false;
            state.direction = ScrollDirection::None;
            state.last_scroll_top
        };
        let sample = self.sample(top, ScrollDirection::None, 0.0);
        self.dispatch(&sample);
        if !self.is_programmatic() {
            self.check_section_immediately();
        }
    }

    fn is_programmatic(&self) -> bool {
        self.state.borrow().is_programmatic
    }

    fn schedule_section_check(self: &Rc<Self>) {
        if self.state.borrow().section_timer.is_some() {
            return;
        }
        let weak = Rc::downgrade(self);
        let id = self.scheduler.set_timeout(self.config.section_delay_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.state.borrow_mut().section_timer = None;
                inner.detect_active_section(&inner.sections, false);
            }
        });
        self.state.borrow_mut().section_timer = Some(id);
    }

    fn dispatch(&self, sample: &ScrollSample) {
        let handlers: Vec<(HandlerId, ScrollHandler)> = self
            .state
            .borrow()
            .handlers
            .iter()
            .map(|h| (h.id, h.handler.clone()))
            .collect();
        for (id, handler) in handlers {
            let registered = self.state.borrow().handlers.iter().any(|h| h.id == id);
            if !registered {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| handler(sample))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(?id, error = %err, "scroll handler failed"),
                Err(panic) => error!(?id, panic = %panic_message(&*panic), "scroll handler panicked"),
            }
        }
    }

    fn check_section_immediately(&self) -> Option<String> {
        self.detect_active_section(&self.sections, true)
    }

    fn detect_active_section<S: AsRef<str>>(&self, ids: &[S], force: bool) -> Option<String> {
        let now = self.scheduler.now();
        {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return state.active_section.clone();
            }
            if !force {
                if let Some(last) = state.last_detection {
                    if now < last + self.config.section_interval_ms {
                        return state.active_section.clone();
                    }
                }
            }
            state.last_detection = Some(now);
            state.recompute_count += 1;
        }

        let found = self.compute_section(ids)?;
        let changed = {
            let mut state = self.state.borrow_mut();
            if state.active_section.as_deref() == Some(found.as_str()) {
                false
            } else {
                state.active_section = Some(found.clone());
                true
            }
        };
        if changed {
            self.notify_section(&found);
        }
        Some(found)
    }

    fn compute_section<S: AsRef<str>>(&self, ids: &[S]) -> Option<String> {
        let top = self.viewport.scroll_top();
        let height = self.viewport.viewport_height();
        let midpoint = top + height * 0.5;
        let trigger = height * self.config.trigger_fraction;

        let placed: Vec<(&str, _)> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|id| self.viewport.element_bounds(id).map(|b| (id, b)))
            .collect();

        placed
            .iter()
            .rev()
            .find(|(_, b)| midpoint >= b.top && midpoint <= b.bottom())
            .or_else(|| placed.iter().rev().find(|(_, b)| top >= b.top - trigger))
            .map(|(id, _)| id.to_string())
            .or_else(|| ids.first().map(|id| id.as_ref().to_string()))
    }

    fn notify_section(&self, section: &str) {
        debug!(section, "active section changed");
        self.bus.publish(
            events::SECTION_CHANGED,
            SectionChanged {
                section: section.to_string(),
            },
        );
        let callbacks: Vec<(u64, SectionCallback)> = self.state.borrow().section_callbacks.clone();
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(section))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(id, error = %err, "section callback failed"),
                Err(panic) => error!(id, panic = %panic_message(&*panic), "section callback panicked"),
            }
        }
    }

    fn scroll_to_element(
        self: &Rc<Self>,
        target: &str,
        offset: f64,
    ) -> Result<ScrollCompletion, ScrollError> {
        if self.state.borrow().destroyed {
            return Err(ScrollError::Destroyed);
        }
        let bounds = self
            .viewport
            .element_bounds(target)
            .ok_or_else(|| ScrollError::ElementNotFound(target.to_string()))?;
        self.cancel_scroll();

        let target_top = (bounds.top - offset).max(0.0);
        let start_top = self.viewport.scroll_top();
        let distance = (target_top - start_top).abs();
        let (tx, rx) = oneshot::channel();

        if distance <= self.config.min_distance {
            let _ = tx.send(ScrollOutcome::AlreadyInPlace);
            return Ok(ScrollCompletion { rx });
        }

        debug!(target, start_top, target_top, "programmatic scroll");
        {
            let mut state = self.state.borrow_mut();
            state.is_programmatic = true;
            state.is_scrolling = true;
            state.animation = Some(Animation {
                frame: None,
                start_top,
                target_top,
                start_time: self.scheduler.now(),
                done: Some(tx),
            });
        }
        self.request_step();
        Ok(ScrollCompletion { rx })
    }

    fn request_step(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let frame = self.scheduler.request_frame(move |ts| {
            if let Some(inner) = weak.upgrade() {
                inner.step(ts);
            }
        });
        if let Some(animation) = self.state.borrow_mut().animation.as_mut() {
            animation.frame = Some(frame);
        }
    }

    fn step(self: &Rc<Self>, timestamp: Millis) {
        let (start_top, target_top, start_time) = {
            let mut state = self.state.borrow_mut();
            let Some(animation) = state.animation.as_mut() else {
                return;
            };
            animation.frame = None;
            (animation.start_top, animation.target_top, animation.start_time)
        };

        let progress = if self.config.duration_ms == 0 {
            1.0
        } else {
            (timestamp.saturating_sub(start_time) as f64 / self.config.duration_ms as f64).min(1.0)
        };
        self.viewport
            .set_scroll_top(lerp(start_top, target_top, ease_in_out_cubic(progress)));
        self.tick();

        if progress < 1.0 {
            self.request_step();
        } else {
            self.finish_animation();
        }
    }

    fn finish_animation(self: &Rc<Self>) {
        let animation = {
            let mut state = self.state.borrow_mut();
            let animation = state.animation.take();
            state.is_scrolling = false;
            animation
        };
        let top = self.viewport.scroll_top();
        let sample = self.sample(top, ScrollDirection::None, 0.0);
        self.dispatch(&sample);
        {
            // A handler may have started another animation.
            let mut state = self.state.borrow_mut();
            if state.animation.is_none() {
                state.is_programmatic = false;
            }
        }
        if !self.is_programmatic() {
            self.check_section_immediately();
        }
        if let Some(mut animation) = animation {
            animation.finish(ScrollOutcome::Completed);
        }
    }

    fn cancel_scroll(&self) {
        let (animation, timers) = {
            let mut state = self.state.borrow_mut();
            let animation = state.animation.take();
            let settle_timer = state.settle_timer.take();
            if animation.is_some() || settle_timer.is_some() {
                state.is_programmatic = false;
                state.is_scrolling = false;
                state.direction = ScrollDirection::None;
            }
            (animation, [state.section_timer.take(), settle_timer])
        };
        for id in timers.into_iter().flatten() {
            self.scheduler.clear_timeout(id);
        }
        if let Some(mut animation) = animation {
            if let Some(frame) = animation.frame.take() {
                self.scheduler.cancel_frame(frame);
            }
            debug!("programmatic scroll cancelled");
            animation.finish(ScrollOutcome::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;
    use crate::host::ElementBounds;
    use crate::host::memory::{MemoryViewport, PageLayout, SectionBox};
    use std::cell::Cell;

    fn layout() -> PageLayout {
        PageLayout {
            viewport_height: 1000.0,
            viewport_width: 1440.0,
            sections: vec![
                SectionBox { id: "hero".into(), height: 1000.0 },
                SectionBox { id: "about".into(), height: 800.0 },
                SectionBox { id: "pricing".into(), height: 1200.0 },
                SectionBox { id: "contact".into(), height: 1000.0 },
            ],
        }
    }

    fn config() -> SiteConfig {
        SiteConfig {
            sections: ["hero", "about", "pricing", "contact"].map(String::from).to_vec(),
            ..SiteConfig::default()
        }
    }

    fn setup() -> (EventLoop, Rc<MemoryViewport>, EventBus, ScrollCoordinator) {
        let el = EventLoop::new();
        let viewport = Rc::new(MemoryViewport::from_layout(&layout()));
        let bus = EventBus::new();
        let scroll = ScrollCoordinator::new(viewport.clone(), el.scheduler(), bus.clone(), &config());
        (el, viewport, bus, scroll)
    }

    fn record_samples(scroll: &ScrollCoordinator) -> Rc<RefCell<Vec<ScrollSample>>> {
        let samples = Rc::new(RefCell::new(Vec::new()));
        let s = samples.clone();
        scroll.register_handler(
            move |sample| {
                s.borrow_mut().push(sample.clone());
                Ok(())
            },
            0,
        );
        samples
    }

    // =========================================================================
    // Handler dispatch
    // =========================================================================

    #[test]
    fn tick_dispatches_then_settles() {
        let (mut el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);

        viewport.set_scroll_top(300.0);
        scroll.handle_scroll_event();
        {
            let samples = samples.borrow();
            assert_eq!(samples.len(), 1);
            assert!(samples[0].is_scrolling);
            assert!(!samples[0].is_programmatic);
            assert_eq!(samples[0].direction, ScrollDirection::Down);
            assert_eq!(samples[0].delta, 300.0);
        }

        el.advance(100);
        let samples = samples.borrow();
        assert_eq!(samples.len(), 2);
        assert!(!samples[1].is_scrolling);
        assert_eq!(samples[1].scroll_top, 300.0);
    }

    #[test]
    fn events_inside_throttle_window_are_dropped() {
        let (mut el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);

        viewport.set_scroll_top(100.0);
        scroll.handle_scroll_event();
        el.advance(5);
        viewport.set_scroll_top(200.0);
        scroll.handle_scroll_event();
        assert_eq!(samples.borrow().len(), 1);

        el.advance(11);
        scroll.handle_scroll_event();
        assert_eq!(samples.borrow().len(), 2);
        assert_eq!(samples.borrow()[1].direction, ScrollDirection::Down);
    }

    #[test]
    fn tiny_movement_is_not_dispatched() {
        let (_el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);
        viewport.set_scroll_top(1.0);
        scroll.handle_scroll_event();
        assert!(samples.borrow().is_empty());
    }

    #[test]
    fn failing_handler_does_not_stop_others() {
        let (_el, viewport, _bus, scroll) = setup();
        scroll.register_handler(|_| Err("nope".into()), 0);
        scroll.register_handler(|_| panic!("handler panic"), 0);
        let samples = record_samples(&scroll);

        viewport.set_scroll_top(500.0);
        scroll.handle_scroll_event();
        assert_eq!(samples.borrow().len(), 1);
    }

    #[test]
    fn unregistered_handler_stops_receiving() {
        let (mut el, viewport, _bus, scroll) = setup();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = scroll.register_handler(
            move |_| {
                h.set(h.get() + 1);
                Ok(())
            },
            5,
        );
        viewport.set_scroll_top(100.0);
        scroll.handle_scroll_event();
        assert!(scroll.unregister_handler(id));
        assert!(!scroll.unregister_handler(id));
        el.advance(200);
        assert_eq!(hits.get(), 1);
    }

    // =========================================================================
    // Section detection
    // =========================================================================

    #[test]
    fn midpoint_inside_section_wins_regardless_of_order() {
        let (_el, viewport, _bus, scroll) = setup();
        // Midpoint at 1300, strictly inside "about" (1000..1800).
        viewport.set_scroll_top(800.0);
        let forward = scroll.detect_active_section(&["hero", "about", "pricing", "contact"], true);
        let reversed = scroll.detect_active_section(&["contact", "pricing", "about", "hero"], true);
        assert_eq!(forward.as_deref(), Some("about"));
        assert_eq!(reversed.as_deref(), Some("about"));
    }

    #[test]
    fn boundary_goes_to_later_section() {
        let (_el, viewport, _bus, scroll) = setup();
        // Midpoint exactly at 1000: bottom of hero and top of about.
        viewport.set_scroll_top(500.0);
        let found = scroll.detect_active_section(&["hero", "about"], true);
        assert_eq!(found.as_deref(), Some("about"));
    }

    #[test]
    fn trigger_line_used_when_midpoint_misses() {
        let el = EventLoop::new();
        let viewport = Rc::new(MemoryViewport::new(1000.0, 1440.0));
        viewport.set_element_bounds("a", ElementBounds { top: 0.0, height: 200.0 });
        viewport.set_element_bounds("b", ElementBounds { top: 1000.0, height: 200.0 });
        viewport.set_element_bounds("c", ElementBounds { top: 3000.0, height: 200.0 });
        let scroll = ScrollCoordinator::new(viewport.clone(), el.scheduler(), EventBus::new(), &config());

        // Midpoint 1250 lies in the gap between b and c; b's top minus 400
        // has been passed, c's has not.
        viewport.set_scroll_top(750.0);
        assert_eq!(scroll.detect_active_section(&["a", "b", "c"], true).as_deref(), Some("b"));
    }

    #[test]
    fn falls_back_to_first_section() {
        let el = EventLoop::new();
        let viewport = Rc::new(MemoryViewport::new(1000.0, 1440.0));
        viewport.set_element_bounds("late", ElementBounds { top: 5000.0, height: 100.0 });
        let scroll = ScrollCoordinator::new(viewport, el.scheduler(), EventBus::new(), &config());
        assert_eq!(
            scroll.detect_active_section(&["missing", "late"], true).as_deref(),
            Some("missing")
        );
        let empty: [&str; 0] = [];
        assert_eq!(scroll.detect_active_section(&empty, true), None);
    }

    #[test]
    fn unforced_calls_are_throttled() {
        let (mut el, viewport, _bus, scroll) = setup();
        let ids = ["hero", "about", "pricing", "contact"];
        assert_eq!(scroll.detect_active_section(&ids, false).as_deref(), Some("hero"));
        assert_eq!(scroll.recompute_count(), 1);

        viewport.set_scroll_top(800.0);
        el.advance(50);
        assert_eq!(scroll.detect_active_section(&ids, false).as_deref(), Some("hero"));
        assert_eq!(scroll.recompute_count(), 1);

        assert_eq!(scroll.detect_active_section(&ids, true).as_deref(), Some("about"));
        assert_eq!(scroll.recompute_count(), 2);

        el.advance(100);
        scroll.detect_active_section(&ids, false);
        assert_eq!(scroll.recompute_count(), 3);
    }

    #[test]
    fn change_notified_once_per_transition() {
        let (_el, viewport, bus, scroll) = setup();
        let bus_hits = Rc::new(RefCell::new(Vec::new()));
        let b = bus_hits.clone();
        bus.subscribe(events::SECTION_CHANGED, move |p| {
            b.borrow_mut().push(p["section"].as_str().unwrap_or_default().to_string());
            Ok(())
        })
        .unwrap();
        let direct = Rc::new(Cell::new(0));
        let d = direct.clone();
        let sub = scroll.on_section_change(move |_| {
            d.set(d.get() + 1);
            Ok(())
        });

        scroll.check_section_immediately();
        scroll.check_section_immediately();
        viewport.set_scroll_top(800.0);
        scroll.check_section_immediately();
        scroll.check_section_immediately();

        assert_eq!(*bus_hits.borrow(), vec!["hero", "about"]);
        assert_eq!(direct.get(), 2);

        sub.unsubscribe();
        viewport.set_scroll_top(2000.0);
        scroll.check_section_immediately();
        assert_eq!(direct.get(), 2);
        assert_eq!(bus_hits.borrow().len(), 3);
    }

    #[test]
    fn initial_check_runs_after_startup_delay() {
        let (mut el, _viewport, _bus, scroll) = setup();
        assert_eq!(scroll.active_section(), None);
        el.advance(500);
        assert_eq!(scroll.active_section().as_deref(), Some("hero"));
    }

    #[test]
    fn scroll_tick_schedules_section_check() {
        let (mut el, viewport, _bus, scroll) = setup();
        viewport.set_scroll_top(2000.0);
        scroll.handle_scroll_event();
        el.advance(49);
        assert_eq!(scroll.active_section(), None);
        el.advance(1);
        assert_eq!(scroll.active_section().as_deref(), Some("pricing"));
    }

    // =========================================================================
    // Programmatic scrolling
    // =========================================================================

    #[test]
    fn short_distance_resolves_without_animation() {
        let (mut el, viewport, _bus, scroll) = setup();
        viewport.set_scroll_top(918.0);
        let done = scroll.scroll_to_element("about", 80.0).unwrap();
        assert!(!scroll.is_animating());
        assert_eq!(el.scheduler().pending_frames(), 0);
        assert_eq!(el.block_on(done).unwrap(), ScrollOutcome::AlreadyInPlace);
    }

    #[test]
    fn animation_reaches_target_and_marks_samples() {
        let (mut el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);

        let done = scroll.scroll_to_element("pricing", 80.0).unwrap();
        assert!(scroll.is_animating());
        let outcome = el.block_on(done).unwrap();

        assert_eq!(outcome, ScrollOutcome::Completed);
        assert_eq!(viewport.scroll_top(), 1720.0);
        assert!(el.now() >= 800);
        let samples = samples.borrow();
        assert!(samples.len() > 2);
        assert!(samples.iter().all(|s| s.is_programmatic));
        assert!(!samples.last().unwrap().is_scrolling);
        assert_eq!(scroll.active_section().as_deref(), Some("pricing"));
    }

    #[test]
    fn target_is_floored_at_zero() {
        let (mut el, viewport, _bus, scroll) = setup();
        viewport.set_scroll_top(600.0);
        let done = scroll.scroll_to_element("hero", 80.0).unwrap();
        assert_eq!(el.block_on(done).unwrap(), ScrollOutcome::Completed);
        assert_eq!(viewport.scroll_top(), 0.0);
    }

    #[test]
    fn new_request_cancels_previous() {
        let (mut el, viewport, _bus, scroll) = setup();
        let first = scroll.scroll_to_element("contact", 0.0).unwrap();
        el.advance(100);
        let second = scroll.scroll_to_element("about", 0.0).unwrap();

        assert_eq!(el.block_on(first).unwrap(), ScrollOutcome::Cancelled);
        assert_eq!(el.block_on(second).unwrap(), ScrollOutcome::Completed);
        assert_eq!(viewport.scroll_top(), 1000.0);
    }

    #[test]
    fn cancel_leaves_position_and_no_frames() {
        let (mut el, viewport, _bus, scroll) = setup();
        let done = scroll.scroll_to_element("contact", 0.0).unwrap();
        el.advance(200);
        let mid = viewport.scroll_top();
        assert!(mid > 0.0 && mid < 3000.0);

        scroll.cancel_scroll();
        assert_eq!(el.scheduler().pending_frames(), 0);
        el.advance(1000);
        assert_eq!(viewport.scroll_top(), mid);
        assert_eq!(el.block_on(done).unwrap(), ScrollOutcome::Cancelled);
    }

    #[test]
    fn animation_announces_only_destination() {
        let (mut el, _viewport, bus, scroll) = setup();
        let announced = Rc::new(RefCell::new(Vec::new()));
        let a = announced.clone();
        bus.subscribe(events::SECTION_CHANGED, move |p| {
            a.borrow_mut().push(p["section"].as_str().unwrap_or_default().to_string());
            Ok(())
        })
        .unwrap();

        let done = scroll.scroll_to_element("contact", 0.0).unwrap();
        assert_eq!(el.block_on(done).unwrap(), ScrollOutcome::Completed);
        el.advance(1000);

        assert_eq!(*announced.borrow(), vec!["contact".to_string()]);
    }

    #[test]
    fn user_scroll_during_animation_skips_detection() {
        let (mut el, viewport, _bus, scroll) = setup();
        let _done = scroll.scroll_to_element("contact", 0.0).unwrap();
        el.advance(100);
        let before = scroll.recompute_count();

        viewport.set_scroll_top(viewport.scroll_top() + 50.0);
        scroll.handle_scroll_event();
        el.advance(100);

        assert!(scroll.is_animating());
        assert_eq!(scroll.recompute_count(), before);
    }

    #[test]
    fn cancel_drops_pending_settle() {
        let (mut el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);

        viewport.set_scroll_top(300.0);
        scroll.handle_scroll_event();
        assert_eq!(samples.borrow().len(), 1);
        scroll.cancel_scroll();
        el.advance(500);

        assert_eq!(samples.borrow().len(), 1);
        assert!(!scroll.position().is_scrolling);
    }

    #[test]
    fn handler_can_chain_a_new_animation() {
        let (mut el, viewport, _bus, scroll) = setup();
        let chained = Rc::new(Cell::new(false));
        let c = chained.clone();
        let weak = Rc::downgrade(&scroll.inner);
        scroll.register_handler(
            move |sample| {
                if sample.is_programmatic && !sample.is_scrolling && !c.get() {
                    c.set(true);
                    if let Some(inner) = weak.upgrade() {
                        inner.scroll_to_element("about", 0.0)?;
                    }
                }
                Ok(())
            },
            0,
        );

        let first = scroll.scroll_to_element("contact", 0.0).unwrap();
        assert_eq!(el.block_on(first).unwrap(), ScrollOutcome::Completed);
        assert!(chained.get());
        assert!(scroll.is_animating());
        assert!(scroll.position().is_programmatic);

        el.advance(1000);
        assert_eq!(viewport.scroll_top(), 1000.0);
        assert!(!scroll.position().is_programmatic);
        assert_eq!(scroll.active_section().as_deref(), Some("about"));
    }

    #[test]
    fn unknown_target_is_error() {
        let (_el, _viewport, _bus, scroll) = setup();
        assert_eq!(
            scroll.scroll_to_element("nowhere", 0.0).err(),
            Some(ScrollError::ElementNotFound("nowhere".into()))
        );
    }

    // =========================================================================
    // Queries and teardown
    // =========================================================================

    #[test]
    fn progress_and_edges() {
        let (_el, viewport, _bus, scroll) = setup();
        assert_eq!(scroll.scroll_progress(), 0.0);
        assert!(scroll.is_at_top(100.0));
        viewport.set_scroll_top(1500.0);
        assert_eq!(scroll.scroll_progress(), 50.0);
        viewport.set_scroll_top(3000.0);
        assert!(scroll.is_at_bottom(100.0));
        assert_eq!(scroll.position().progress, 100.0);
    }

    #[test]
    fn element_visibility_percent() {
        let (_el, viewport, _bus, scroll) = setup();
        viewport.set_scroll_top(600.0);
        // about spans 1000..1800, viewport 600..1600 → 600 of 800 visible.
        assert_eq!(scroll.element_visibility("about"), 75.0);
        assert_eq!(scroll.element_visibility("contact"), 0.0);
        assert!(scroll.is_element_in_viewport("about", 0.0));
        assert!(!scroll.is_element_in_viewport("contact", 100.0));
    }

    #[test]
    fn destroy_clears_everything() {
        let (mut el, viewport, _bus, scroll) = setup();
        let samples = record_samples(&scroll);
        let done = scroll.scroll_to_element("contact", 0.0).unwrap();
        scroll.destroy();

        assert_eq!(scroll.handler_count(), 0);
        assert_eq!(el.scheduler().pending(), 0);
        assert_eq!(el.block_on(done).unwrap(), ScrollOutcome::Cancelled);

        viewport.set_scroll_top(900.0);
        scroll.handle_scroll_event();
        el.advance(500);
        assert!(samples.borrow().is_empty());
        assert!(scroll.scroll_to_element("about", 0.0).is_err());
    }
}
