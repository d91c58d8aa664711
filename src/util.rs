//! Small shared helpers: rate limiting, repeating timers, easing and price
//! formatting.

use crate::event_loop::{Millis, Scheduler, TimerId};
use std::cell::Cell;
use std::rc::Rc;

/// Leading-edge throttle over virtual time.
///
/// The first call passes; later calls are dropped until `interval` has elapsed
/// since the last call that passed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Millis,
    last: Option<Millis>,
}

impl Throttle {
    pub fn new(interval: Millis) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` (and records `now`) if a call at `now` may proceed.
    pub fn ready(&mut self, now: Millis) -> bool {
        match self.last {
            Some(last) if now < last + self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Trailing-edge debounce: only the last call within `delay` runs.
pub struct Debounce {
    scheduler: Scheduler,
    delay: Millis,
    pending: Rc<Cell<Option<TimerId>>>,
}

impl Debounce {
    pub fn new(scheduler: Scheduler, delay: Millis) -> Self {
        Self {
            scheduler,
            delay,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn call(&self, f: impl FnOnce() + 'static) {
        self.cancel();
        let slot = self.pending.clone();
        let id = self.scheduler.set_timeout(self.delay, move || {
            slot.set(None);
            f();
        });
        self.pending.set(Some(id));
    }

    pub fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

/// Repeating timer. Cancelled on [`Interval::cancel`] or when dropped.
pub struct Interval {
    scheduler: Scheduler,
    active: Rc<Cell<bool>>,
    timer: Rc<Cell<Option<TimerId>>>,
}

impl Interval {
    pub fn start(scheduler: &Scheduler, every: Millis, tick: impl Fn() + 'static) -> Self {
        let active = Rc::new(Cell::new(true));
        let timer = Rc::new(Cell::new(None));
        arm(
            scheduler.clone(),
            every.max(1),
            Rc::new(tick),
            active.clone(),
            timer.clone(),
        );
        Self {
            scheduler: scheduler.clone(),
            active,
            timer,
        }
    }

    pub fn cancel(&self) {
        self.active.set(false);
        if let Some(id) = self.timer.take() {
            self.scheduler.clear_timeout(id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn arm(
    scheduler: Scheduler,
    every: Millis,
    tick: Rc<dyn Fn()>,
    active: Rc<Cell<bool>>,
    timer: Rc<Cell<Option<TimerId>>>,
) {
    let again = scheduler.clone();
    let slot = timer.clone();
    let id = scheduler.set_timeout(every, move || {
        slot.set(None);
        if !active.get() {
            return;
        }
        tick();
        if active.get() {
            arm(again, every, tick, active, slot);
        }
    });
    timer.set(Some(id));
}

/// Cubic ease-in-out over `t` in `[0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn lerp(start: f64, end: f64, factor: f64) -> f64 {
    start + (end - start) * factor
}

/// `€ 45.00` style price text.
pub fn format_price(amount: f64, currency: &str, decimals: usize) -> String {
    format!("{currency} {amount:.decimals$}")
}

/// Decode the handful of HTML entities translation files use, so the text can
/// be re-escaped by the markup renderer without double encoding.
pub fn decode_html_entities(text: &str) -> String {
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&euro;", "€")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::EventLoop;

    #[test]
    fn throttle_drops_calls_inside_interval() {
        let mut t = Throttle::new(16);
        assert!(t.ready(0));
        assert!(!t.ready(10));
        assert!(!t.ready(15));
        assert!(t.ready(16));
        assert!(!t.ready(20));
        t.reset();
        assert!(t.ready(21));
    }

    #[test]
    fn debounce_runs_only_last_call() {
        let mut el = EventLoop::new();
        let d = Debounce::new(el.scheduler(), 250);
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            d.call(move || hits.set(hits.get() + 1));
            el.advance(100);
        }
        assert!(d.is_pending());
        el.advance(250);
        assert_eq!(hits.get(), 1);
        assert!(!d.is_pending());
    }

    #[test]
    fn interval_repeats_until_cancelled() {
        let mut el = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        let hits2 = hits.clone();
        let interval = Interval::start(&el.scheduler(), 100, move || hits2.set(hits2.get() + 1));
        el.advance(350);
        assert_eq!(hits.get(), 3);
        interval.cancel();
        el.advance(1000);
        assert_eq!(hits.get(), 3);
        assert!(!interval.is_active());
    }

    #[test]
    fn dropping_interval_stops_it() {
        let mut el = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        let hits2 = hits.clone();
        let interval = Interval::start(&el.scheduler(), 50, move || hits2.set(hits2.get() + 1));
        el.advance(50);
        drop(interval);
        el.advance(500);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn easing_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-9);
        assert!(ease_in_out_cubic(0.25) < 0.25);
        assert!(ease_in_out_cubic(0.75) > 0.75);
        assert_eq!(ease_in_out_cubic(2.0), 1.0);
    }

    #[test]
    fn lerp_interpolates() {
        assert_eq!(lerp(0.0, 100.0, 0.25), 25.0);
        assert_eq!(lerp(100.0, 0.0, 0.5), 50.0);
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(45.0, "€", 2), "€ 45.00");
        assert_eq!(format_price(3.456, "€", 1), "€ 3.5");
    }

    #[test]
    fn entities_decode_once() {
        assert_eq!(decode_html_entities("Tivat &amp; Kotor"), "Tivat & Kotor");
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
    }
}
