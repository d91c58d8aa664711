//! In-memory host: a page model with no browser behind it.
//!
//! Each type records what was done to it so tests can assert on effects
//! (classes toggled, history entries pushed, requests posted) rather than on
//! internal module state. [`MemoryHost`] wires one of each together with the
//! standard page skeleton.

use super::{
    Clock, ContactTransport, Document, ElementBounds, History, Host, HostError, I18nBinding,
    I18nTarget, PreferenceStore, SystemClock, TranslationSource, Viewport,
};
use crate::content;
use crate::event_loop::{Millis, Scheduler};
use crate::modules::{callus, contact, gallery, language, loader, navigation, partners, pricing};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub classes: BTreeSet<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Default)]
struct DocumentState {
    elements: BTreeMap<String, Element>,
    language: Option<String>,
    title: Option<String>,
    bindings: Vec<I18nBinding>,
}

#[derive(Default)]
pub struct MemoryDocument {
    state: RefCell<DocumentState>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// The page skeleton every module expects, with one nav link per section
    /// and the stock translation bindings.
    pub fn site(sections: &[String]) -> Self {
        let doc = Self::new();
        for selector in [
            loader::ROOT,
            loader::WRAPPER,
            language::BUTTON,
            language::DROPDOWN,
            language::META_DESCRIPTION,
            navigation::HEADER,
            navigation::MAIN_NAV,
            navigation::MOBILE_NAV_BUTTON,
            navigation::BODY,
            navigation::LOGO,
            navigation::LOGO_SMALL,
            gallery::GRID,
            gallery::MODAL,
            gallery::MODAL_IMAGE,
            gallery::ZOOM_LEVEL,
            gallery::COUNTER,
            gallery::ROTATING_IMAGE,
            callus::DIALOG,
            callus::OPEN_BUTTON,
            callus::CLOSE_BUTTON,
            callus::CALL_BUTTON,
            callus::OPTIONS,
            partners::CONTAINER,
            partners::TRACK,
            pricing::MODAL,
            pricing::MODAL_TITLE,
            pricing::MODAL_ITEMS,
            contact::FORM,
            contact::SUBJECT,
            contact::PHONE,
            contact::MESSAGE,
            contact::SUBMIT,
            contact::SUCCESS,
            contact::FAILURE,
            contact::RESET,
            content::HERO_TEXT_BOX,
            content::SERVICES_TITLE,
            content::SERVICES_CONTAINER,
            content::SERVICES_INFO,
            content::SERVICES_FEATURE,
        ] {
            doc.add_element(selector);
        }
        for section in sections {
            doc.add_element(&navigation::nav_link(section));
        }
        for (code, _) in language::DISPLAY_NAMES {
            doc.add_element(&language::lang_link(code));
        }
        for plan in 1..=3 {
            doc.add_element(&pricing::total_selector(plan));
            doc.add_element(&pricing::level_selector(plan));
        }
        for field in contact::Field::ALL {
            doc.add_element(&contact::error_selector(field));
        }
        for (selector, key, target) in [
            (".hero h1", "hero.title", I18nTarget::Text),
            (".hero p", "hero.subtitle", I18nTarget::Html),
            (contact::SUBJECT, "contact.subjectPlaceholder", I18nTarget::Placeholder),
            (contact::PHONE, "contact.phonePlaceholder", I18nTarget::Placeholder),
            (contact::MESSAGE, "contact.messagePlaceholder", I18nTarget::Placeholder),
        ] {
            doc.add_element(selector);
            doc.add_binding(I18nBinding {
                selector: selector.to_string(),
                key: key.to_string(),
                target,
            });
        }
        doc
    }

    pub fn add_element(&self, selector: &str) {
        self.state
            .borrow_mut()
            .elements
            .entry(selector.to_string())
            .or_default();
    }

    pub fn remove_element(&self, selector: &str) {
        self.state.borrow_mut().elements.remove(selector);
    }

    pub fn add_binding(&self, binding: I18nBinding) {
        self.state.borrow_mut().bindings.push(binding);
    }

    pub fn element(&self, selector: &str) -> Option<Element> {
        self.state.borrow().elements.get(selector).cloned()
    }

    pub fn language(&self) -> Option<String> {
        self.state.borrow().language.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.state.borrow().title.clone()
    }

    fn with_element(&self, selector: &str, f: impl FnOnce(&mut Element)) {
        if let Some(el) = self.state.borrow_mut().elements.get_mut(selector) {
            f(el);
        }
    }
}

impl Document for MemoryDocument {
    fn contains(&self, selector: &str) -> bool {
        self.state.borrow().elements.contains_key(selector)
    }

    fn set_class(&self, selector: &str, class: &str, enabled: bool) {
        self.with_element(selector, |el| {
            if enabled {
                el.classes.insert(class.to_string());
            } else {
                el.classes.remove(class);
            }
        });
    }

    fn has_class(&self, selector: &str, class: &str) -> bool {
        self.state
            .borrow()
            .elements
            .get(selector)
            .is_some_and(|el| el.classes.contains(class))
    }

    fn set_text(&self, selector: &str, text: &str) {
        self.with_element(selector, |el| el.text = Some(text.to_string()));
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(selector)
            .and_then(|el| el.text.clone())
    }

    fn set_html(&self, selector: &str, html: &str) {
        self.with_element(selector, |el| el.html = Some(html.to_string()));
    }

    fn html(&self, selector: &str) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(selector)
            .and_then(|el| el.html.clone())
    }

    fn set_attribute(&self, selector: &str, name: &str, value: &str) {
        self.with_element(selector, |el| {
            el.attributes.insert(name.to_string(), value.to_string());
        });
    }

    fn remove_attribute(&self, selector: &str, name: &str) {
        self.with_element(selector, |el| {
            el.attributes.remove(name);
        });
    }

    fn attribute(&self, selector: &str, name: &str) -> Option<String> {
        self.state
            .borrow()
            .elements
            .get(selector)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    fn set_language(&self, code: &str) {
        self.state.borrow_mut().language = Some(code.to_string());
    }

    fn set_title(&self, title: &str) {
        self.state.borrow_mut().title = Some(title.to_string());
    }

    fn i18n_bindings(&self) -> Vec<I18nBinding> {
        self.state.borrow().bindings.clone()
    }
}

// ============================================================================
// Viewport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionBox {
    pub id: String,
    pub height: f64,
}

/// Page geometry: viewport size plus sections stacked top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageLayout {
    pub viewport_height: f64,
    pub viewport_width: f64,
    pub sections: Vec<SectionBox>,
}

impl PageLayout {
    /// Desktop viewport with typical heights for the site's sections.
    pub fn standard(sections: &[String]) -> Self {
        Self {
            viewport_height: 900.0,
            viewport_width: 1440.0,
            sections: sections
                .iter()
                .map(|id| SectionBox {
                    id: id.clone(),
                    height: standard_height(id),
                })
                .collect(),
        }
    }
}

fn standard_height(section: &str) -> f64 {
    match section {
        "hero" => 900.0,
        "about" => 700.0,
        "gallerySection" => 1000.0,
        "services" => 800.0,
        "featuree" => 600.0,
        "pricing" => 900.0,
        "partners" => 300.0,
        "contact" => 800.0,
        _ => 700.0,
    }
}

struct ViewportState {
    scroll_top: f64,
    height: f64,
    width: f64,
    elements: Vec<(String, ElementBounds)>,
}

pub struct MemoryViewport {
    state: RefCell<ViewportState>,
}

impl MemoryViewport {
    pub fn new(height: f64, width: f64) -> Self {
        Self {
            state: RefCell::new(ViewportState {
                scroll_top: 0.0,
                height,
                width,
                elements: Vec::new(),
            }),
        }
    }

    pub fn from_layout(layout: &PageLayout) -> Self {
        let viewport = Self::new(layout.viewport_height, layout.viewport_width);
        let mut top = 0.0;
        for section in &layout.sections {
            viewport.set_element_bounds(
                &section.id,
                ElementBounds {
                    top,
                    height: section.height,
                },
            );
            top += section.height;
        }
        viewport
    }

    pub fn set_element_bounds(&self, id: &str, bounds: ElementBounds) {
        let mut state = self.state.borrow_mut();
        match state.elements.iter_mut().find(|(eid, _)| eid == id) {
            Some(entry) => entry.1 = bounds,
            None => state.elements.push((id.to_string(), bounds)),
        }
    }

    pub fn remove_element(&self, id: &str) {
        self.state.borrow_mut().elements.retain(|(eid, _)| eid != id);
    }

    pub fn resize(&self, width: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        state.width = width;
        state.height = height;
    }
}

impl Viewport for MemoryViewport {
    fn scroll_top(&self) -> f64 {
        self.state.borrow().scroll_top
    }

    /// Clamped to the scrollable range, like a real page.
    fn set_scroll_top(&self, top: f64) {
        let max = (self.document_height() - self.viewport_height()).max(0.0);
        self.state.borrow_mut().scroll_top = top.clamp(0.0, max);
    }

    fn viewport_height(&self) -> f64 {
        self.state.borrow().height
    }

    fn viewport_width(&self) -> f64 {
        self.state.borrow().width
    }

    fn document_height(&self) -> f64 {
        let state = self.state.borrow();
        state
            .elements
            .iter()
            .map(|(_, b)| b.bottom())
            .fold(state.height, f64::max)
    }

    fn element_bounds(&self, id: &str) -> Option<ElementBounds> {
        self.state
            .borrow()
            .elements
            .iter()
            .find(|(eid, _)| eid == id)
            .map(|(_, b)| *b)
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Default)]
struct HistoryState {
    entries: Vec<String>,
    index: usize,
    pushes: usize,
    replaces: usize,
}

#[derive(Default)]
pub struct MemoryHistory {
    state: RefCell<HistoryState>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the page loaded at `#fragment`.
    pub fn at(fragment: &str) -> Self {
        let history = Self::new();
        history.state.borrow_mut().entries.push(fragment.to_string());
        history
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<String> {
        self.state.borrow().entries.clone()
    }

    pub fn push_count(&self) -> usize {
        self.state.borrow().pushes
    }

    pub fn replace_count(&self) -> usize {
        self.state.borrow().replaces
    }

    /// Step back one entry and return the state now current.
    pub fn back(&self) -> Option<String> {
        let mut state = self.state.borrow_mut();
        if state.index == 0 {
            return None;
        }
        state.index -= 1;
        state.entries.get(state.index).cloned()
    }

    pub fn forward(&self) -> Option<String> {
        let mut state = self.state.borrow_mut();
        if state.index + 1 >= state.entries.len() {
            return None;
        }
        state.index += 1;
        state.entries.get(state.index).cloned()
    }
}

impl History for MemoryHistory {
    fn push_state(&self, section: &str) {
        let mut state = self.state.borrow_mut();
        if !state.entries.is_empty() {
            let keep = state.index + 1;
            state.entries.truncate(keep);
        }
        state.entries.push(section.to_string());
        state.index = state.entries.len() - 1;
        state.pushes += 1;
    }

    fn replace_state(&self, section: &str) {
        let mut state = self.state.borrow_mut();
        state.replaces += 1;
        let index = state.index;
        match state.entries.get_mut(index) {
            Some(entry) => *entry = section.to_string(),
            None => state.entries.push(section.to_string()),
        }
    }

    fn state(&self) -> Option<String> {
        let state = self.state.borrow();
        state.entries.get(state.index).cloned()
    }

    fn fragment(&self) -> Option<String> {
        self.state()
    }
}

// ============================================================================
// Preferences
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    unavailable: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every access fail, like storage disabled in private browsing.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, HostError> {
        if self.unavailable.get() {
            return Err(HostError::Storage("storage disabled".into()));
        }
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), HostError> {
        if self.unavailable.get() {
            return Err(HostError::Storage("storage disabled".into()));
        }
        self.insert(key, value);
        Ok(())
    }
}

// ============================================================================
// Translations
// ============================================================================

#[derive(Default)]
pub struct MemoryTranslations {
    tables: RefCell<HashMap<String, Value>>,
    failing: RefCell<HashSet<String>>,
    latency: RefCell<Option<(Scheduler, Millis)>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryTranslations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, language: &str, table: Value) {
        self.tables.borrow_mut().insert(language.to_string(), table);
    }

    /// Make every fetch of `language` fail.
    pub fn fail(&self, language: &str) {
        self.failing.borrow_mut().insert(language.to_string());
    }

    /// Delay every fetch by `delay` of virtual time.
    pub fn set_latency(&self, scheduler: Scheduler, delay: Millis) {
        *self.latency.borrow_mut() = Some((scheduler, delay));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl TranslationSource for MemoryTranslations {
    async fn fetch(&self, language: &str) -> Result<Value, HostError> {
        self.requests.borrow_mut().push(language.to_string());
        let latency = self.latency.borrow().clone();
        if let Some((scheduler, delay)) = latency {
            scheduler.sleep(delay).await;
        }
        if self.failing.borrow().contains(language) {
            return Err(HostError::Status { status: 404 });
        }
        self.tables
            .borrow()
            .get(language)
            .cloned()
            .ok_or_else(|| HostError::TranslationsNotFound {
                language: language.to_string(),
            })
    }
}

// ============================================================================
// Contact transport
// ============================================================================

#[derive(Default)]
pub struct MemoryTransport {
    responses: RefCell<VecDeque<Result<Value, HostError>>>,
    requests: RefCell<Vec<(String, Value)>>,
    latency: RefCell<Option<(Scheduler, Millis)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next post. Unqueued posts succeed.
    pub fn respond(&self, response: Result<Value, HostError>) {
        self.responses.borrow_mut().push_back(response);
    }

    pub fn set_latency(&self, scheduler: Scheduler, delay: Millis) {
        *self.latency.borrow_mut() = Some((scheduler, delay));
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl ContactTransport for MemoryTransport {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, HostError> {
        self.requests
            .borrow_mut()
            .push((endpoint.to_string(), body.clone()));
        let latency = self.latency.borrow().clone();
        if let Some((scheduler, delay)) = latency {
            scheduler.sleep(delay).await;
        }
        let next = self.responses.borrow_mut().pop_front();
        next.unwrap_or_else(|| Ok(json!({ "success": true })))
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock frozen at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// One of each in-memory capability, kept as concrete types so callers can
/// both hand out a [`Host`] and inspect what the modules did.
#[derive(Clone)]
pub struct MemoryHost {
    pub document: Rc<MemoryDocument>,
    pub viewport: Rc<MemoryViewport>,
    pub history: Rc<MemoryHistory>,
    pub storage: Rc<MemoryStore>,
    pub translations: Rc<MemoryTranslations>,
    pub transport: Rc<MemoryTransport>,
    pub clock: Rc<dyn Clock>,
}

impl MemoryHost {
    /// Standard skeleton and layout for `sections`, no translations loaded.
    pub fn new(sections: &[String]) -> Self {
        Self::with_layout(sections, &PageLayout::standard(sections))
    }

    pub fn with_layout(sections: &[String], layout: &PageLayout) -> Self {
        Self {
            document: Rc::new(MemoryDocument::site(sections)),
            viewport: Rc::new(MemoryViewport::from_layout(layout)),
            history: Rc::new(MemoryHistory::new()),
            storage: Rc::new(MemoryStore::new()),
            translations: Rc::new(MemoryTranslations::new()),
            transport: Rc::new(MemoryTransport::new()),
            clock: Rc::new(SystemClock),
        }
    }

    pub fn host(&self) -> Host {
        Host {
            document: self.document.clone(),
            viewport: self.viewport.clone(),
            history: self.history.clone(),
            storage: self.storage.clone(),
            translations: self.translations.clone(),
            transport: self.transport.clone(),
            clock: self.clock.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<String> {
        ["hero", "about", "contact"].map(String::from).to_vec()
    }

    #[test]
    fn document_ignores_unknown_selectors() {
        let doc = MemoryDocument::new();
        doc.set_class(".missing", "open", true);
        assert!(!doc.has_class(".missing", "open"));
        assert_eq!(doc.text(".missing"), None);
    }

    #[test]
    fn site_skeleton_has_nav_links() {
        let doc = MemoryDocument::site(&sections());
        assert!(doc.contains(&navigation::nav_link("about")));
        assert!(doc.contains(loader::WRAPPER));
        assert!(!doc.i18n_bindings().is_empty());
    }

    #[test]
    fn layout_stacks_sections() {
        let layout = PageLayout {
            viewport_height: 500.0,
            viewport_width: 1000.0,
            sections: vec![
                SectionBox { id: "a".into(), height: 400.0 },
                SectionBox { id: "b".into(), height: 600.0 },
            ],
        };
        let vp = MemoryViewport::from_layout(&layout);
        assert_eq!(vp.element_bounds("b"), Some(ElementBounds { top: 400.0, height: 600.0 }));
        assert_eq!(vp.document_height(), 1000.0);
    }

    #[test]
    fn scroll_is_clamped_to_document() {
        let vp = MemoryViewport::from_layout(&PageLayout::standard(&sections()));
        vp.set_scroll_top(100_000.0);
        assert_eq!(vp.scroll_top(), vp.document_height() - vp.viewport_height());
        vp.set_scroll_top(-50.0);
        assert_eq!(vp.scroll_top(), 0.0);
    }

    #[test]
    fn history_push_truncates_forward_entries() {
        let h = MemoryHistory::at("hero");
        h.push_state("about");
        h.push_state("contact");
        assert_eq!(h.back(), Some("about".into()));
        h.push_state("pricing");
        assert_eq!(h.entries(), vec!["hero", "about", "pricing"]);
        assert_eq!(h.forward(), None);
    }

    #[test]
    fn history_replace_keeps_length() {
        let h = MemoryHistory::at("hero");
        h.replace_state("about");
        assert_eq!(h.len(), 1);
        assert_eq!(h.state(), Some("about".into()));
        assert_eq!(h.replace_count(), 1);
    }

    #[test]
    fn unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.get("k").is_err());
        assert!(store.set("k", "v").is_err());
    }
}
