//! The boundary between the runtime and whatever renders the page.
//!
//! Modules never touch a browser API directly. Every capability they need is a
//! small trait here, and an implementation of each is bundled in [`Host`]. The
//! in-memory implementations in [`memory`] back the tests and the CLI
//! simulation; [`files`] loads translation tables from disk.
//!
//! | Trait | Browser counterpart |
//! |-------|---------------------|
//! | [`Document`] | element classes, text, attributes, `<html lang>`, title |
//! | [`Viewport`] | `scrollY`, `innerHeight`, element rects |
//! | [`History`] | `pushState` / `replaceState`, location hash |
//! | [`PreferenceStore`] | `localStorage` |
//! | [`TranslationSource`] | `fetch("lang/{code}.json")` |
//! | [`ContactTransport`] | `fetch(endpoint, { method: "POST" })` |
//! | [`Clock`] | `new Date()` |
//!
//! Host input flows the other way as [`DomEvent`] values passed to
//! [`App::dispatch`](crate::app::App::dispatch).

pub mod files;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("translations for `{language}` not found")]
    TranslationsNotFound { language: String },
    #[error("request failed with status {status}")]
    Status { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Vertical placement of an element in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBounds {
    pub top: f64,
    pub height: f64,
}

impl ElementBounds {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Where a translated string lands on its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum I18nTarget {
    Text,
    Html,
    Placeholder,
    Title,
    Alt,
}

/// One `data-i18n*` annotation found in the markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct I18nBinding {
    pub selector: String,
    pub key: String,
    pub target: I18nTarget,
}

/// Mutable view of the page markup. Operations on selectors that match
/// nothing are silently ignored, like a `querySelector` null check.
pub trait Document {
    fn contains(&self, selector: &str) -> bool;
    fn set_class(&self, selector: &str, class: &str, enabled: bool);
    fn has_class(&self, selector: &str, class: &str) -> bool;
    fn set_text(&self, selector: &str, text: &str);
    fn text(&self, selector: &str) -> Option<String>;
    fn set_html(&self, selector: &str, html: &str);
    fn html(&self, selector: &str) -> Option<String>;
    fn set_attribute(&self, selector: &str, name: &str, value: &str);
    fn remove_attribute(&self, selector: &str, name: &str);
    fn attribute(&self, selector: &str, name: &str) -> Option<String>;
    fn set_language(&self, code: &str);
    fn set_title(&self, title: &str);
    fn i18n_bindings(&self) -> Vec<I18nBinding>;
}

pub trait Viewport {
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&self, top: f64);
    fn viewport_height(&self) -> f64;
    fn viewport_width(&self) -> f64;
    fn document_height(&self) -> f64;
    fn element_bounds(&self, id: &str) -> Option<ElementBounds>;
}

/// Session history. Entries carry the section id as state and fragment.
pub trait History {
    fn push_state(&self, section: &str);
    fn replace_state(&self, section: &str);
    fn state(&self) -> Option<String>;
    fn fragment(&self) -> Option<String>;
}

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, HostError>;
    fn set(&self, key: &str, value: &str) -> Result<(), HostError>;
}

#[async_trait(?Send)]
pub trait TranslationSource {
    async fn fetch(&self, language: &str) -> Result<Value, HostError>;
}

#[async_trait(?Send)]
pub trait ContactTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, HostError>;
}

pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Every host capability, shared by all modules.
#[derive(Clone)]
pub struct Host {
    pub document: Rc<dyn Document>,
    pub viewport: Rc<dyn Viewport>,
    pub history: Rc<dyn History>,
    pub storage: Rc<dyn PreferenceStore>,
    pub translations: Rc<dyn TranslationSource>,
    pub transport: Rc<dyn ContactTransport>,
    pub clock: Rc<dyn Clock>,
}

/// Host input, fed to [`App::dispatch`](crate::app::App::dispatch).
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Scroll,
    Click { path: Vec<String> },
    KeyDown { key: String },
    Resize { width: f64, height: f64 },
    VisibilityChange { hidden: bool },
    PopState { section: Option<String> },
    HashChange { fragment: String },
    Hover { target: String, entered: bool },
}
