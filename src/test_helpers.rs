//! Shared test utilities for the shine-site test suite.
//!
//! [`TestSite`] bundles a virtual event loop, the in-memory host with the
//! standard page skeleton and the fixture translations, and a config the
//! test may tweak before the app is first built.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::{TestSite, record_events};
//!
//! let mut site = TestSite::new();
//! site.config.modules.partners.enabled = false;
//! let app = site.boot();
//! let events = record_events(app.bus());
//!
//! site.scroll_to(400.0);
//! site.click(&[".open-callUs"]);
//! assert_eq!(events.count("callus:opened"), 1);
//! ```

use serde_json::Value;
use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use crate::app::App;
use crate::bus::EventBus;
use crate::config::SiteConfig;
use crate::event_loop::EventLoop;
use crate::host::DomEvent;
use crate::host::memory::MemoryHost;
use crate::registry::ModuleRegistry;

// =========================================================================
// Fixture translations
// =========================================================================

pub const SR: &str = include_str!("../fixtures/lang/sr.json");
pub const EN: &str = include_str!("../fixtures/lang/en.json");
pub const RU: &str = include_str!("../fixtures/lang/ru.json");

/// Parsed fixture table for `language`. Panics for languages without one.
pub fn fixture_table(language: &str) -> Value {
    let raw = match language {
        "sr" => SR,
        "en" => EN,
        "ru" => RU,
        other => panic!("no fixture translations for '{other}'"),
    };
    serde_json::from_str(raw).unwrap_or_else(|e| panic!("fixtures/lang/{language}.json: {e}"))
}

// =========================================================================
// Site
// =========================================================================

pub struct TestSite {
    pub el: EventLoop,
    pub memory: MemoryHost,
    pub config: SiteConfig,
    app: OnceCell<App>,
}

impl TestSite {
    /// Default config, standard layout, every fixture language available.
    pub fn new() -> Self {
        let config = SiteConfig::default();
        let memory = MemoryHost::new(&config.sections);
        for language in ["sr", "en", "ru"] {
            memory.translations.insert(language, fixture_table(language));
        }
        Self {
            el: EventLoop::new(),
            memory,
            config,
            app: OnceCell::new(),
        }
    }

    /// The app, built from the current config and host on first use.
    pub fn app(&self) -> App {
        self.app
            .get_or_init(|| App::new(self.config.clone(), self.memory.host(), self.el.scheduler()))
            .clone()
    }

    /// Like [`app`](Self::app), with a custom module registry. Must come
    /// before any other call that builds the app.
    pub fn app_with_registry(&self, registry: ModuleRegistry) -> App {
        assert!(self.app.get().is_none(), "app already built");
        self.app
            .get_or_init(|| {
                App::with_registry(
                    self.config.clone(),
                    self.memory.host(),
                    self.el.scheduler(),
                    registry,
                )
            })
            .clone()
    }

    /// Build and fully initialize the standard site. Panics if the
    /// bootstrap stalls or fails.
    pub fn boot(&mut self) -> App {
        let app = self.app();
        self.el
            .block_on(app.initialize())
            .expect("bootstrap stalled")
            .expect("bootstrap failed");
        app
    }

    /// Click on the element whose ancestry is `path`, innermost first.
    pub fn click(&self, path: &[&str]) {
        self.app().dispatch(DomEvent::Click {
            path: path.iter().map(|s| s.to_string()).collect(),
        });
    }

    /// Jump to `top` and let the scroll tick and settle run.
    pub fn scroll_to(&mut self, top: f64) {
        use crate::host::Viewport;
        self.memory.viewport.set_scroll_top(top);
        self.app().dispatch(DomEvent::Scroll);
        self.el.advance(20);
    }
}

// =========================================================================
// Event recording
// =========================================================================

/// Every event published on a bus after [`record_events`] was called.
#[derive(Clone, Default)]
pub struct EventRecorder {
    seen: Rc<RefCell<Vec<(String, Value)>>>,
}

impl EventRecorder {
    pub fn names(&self) -> Vec<String> {
        self.seen.borrow().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.seen.borrow().iter().filter(|(n, _)| n == name).count()
    }

    /// Payload of the first `name` event.
    pub fn payload(&self, name: &str) -> Option<Value> {
        self.seen
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, payload)| payload.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.seen.borrow().is_empty()
    }
}

pub fn record_events(bus: &EventBus) -> EventRecorder {
    let recorder = EventRecorder::default();
    let seen = recorder.seen.clone();
    bus.tap(move |name, payload| {
        seen.borrow_mut().push((name.to_string(), payload.clone()));
    });
    recorder
}
