//! # Shine Site
//!
//! Headless client runtime for the Perfect Shine cleaning-services website.
//! The page's behaviour (loading screen, language switching, sticky
//! navigation, gallery lightbox, call-us widget, partners marquee, contact
//! form, pricing modal) is modeled as a set of modules coordinated by one
//! orchestrator, running against an abstract host instead of a browser.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────┐   DomEvent    ┌──────────────────┐
//!   host ────▶ │ App::dispatch │ ────────────▶ │ EventBus         │
//!              └──────────────┘               │  (named events)  │
//!                     │                       └────────┬─────────┘
//!                     ▼                                │
//!            ScrollCoordinator ──── samples ───▶  feature modules
//!                     │                                │
//!                     └──────── EventLoop (virtual timers/frames) ◀┘
//! ```
//!
//! Everything runs on one thread. Timers, animation frames and async
//! continuations go through the [`event_loop`], so a whole page session can
//! be replayed deterministically in tests or from the CLI.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`app`] | Orchestrator: bootstrap state machine, load order, watchdog, teardown |
//! | [`bus`] | Named-event publish/subscribe with error isolation |
//! | [`scroll`] | Single scroll listener, settle detection, active section, smooth scroll |
//! | [`event_loop`] | Virtual clock, timers, animation frames, local executor |
//! | [`module`] | `SiteModule` lifecycle contract, module kinds, readiness signals |
//! | [`registry`] | Module kind → factory |
//! | [`modules`] | The eight feature modules |
//! | [`host`] | Document, viewport, history, storage, translation and transport seams |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`content`] | Hero and services markup rendered from JSON content files |
//! | [`i18n`] | Translation tables with dot-path lookup |
//! | [`events`] | Event name constants |
//! | [`types`] | Typed bus payloads |
//! | [`util`] | Throttle, repeating timers, easing, price formatting |
//! | [`output`] | CLI output formatting: timeline, module status, sections |
//!
//! # Design Decisions
//!
//! ## Bus First
//!
//! Modules never hold references to each other. The few reads that cannot be
//! expressed as events (the contact form and pricing modal reading the active
//! translations, call-us asking navigation whether a menu is open) go through
//! [`module::ModuleLookup`], which only resolves the kinds a module is
//! permitted to see.
//!
//! ## Critical Modules
//!
//! The loader and language modules are critical: if either fails to
//! construct or initialize, the bootstrap aborts with an error. Every other
//! module failing is logged and the page carries on without it.

pub mod app;
pub mod bus;
pub mod config;
pub mod content;
pub mod event_loop;
pub mod events;
pub mod host;
pub mod i18n;
pub mod module;
pub mod modules;
pub mod output;
pub mod registry;
pub mod scroll;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_helpers;
