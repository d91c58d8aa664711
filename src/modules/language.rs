//! Language selection and page translation.
//!
//! Startup reads the stored preference, loads that language's table and
//! falls back to the default language when the fetch fails. Only when the
//! default fails too does initialization fail, which aborts the bootstrap
//! since this module is critical.
//!
//! Applying a table walks the document's `data-i18n*` bindings and also
//! updates the title, the meta description, `<html lang>` and the language
//! button. [`LanguageModule::change_language`] does the same at runtime, but
//! without the fallback: a failed switch leaves the current language in place
//! and publishes `language:error`.

use super::publish;
use crate::config::{LanguageOptions, SiteConfig};
use crate::events;
use crate::host::{Document, Host, I18nTarget, PreferenceStore, TranslationSource};
use crate::i18n::Translations;
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, ReadySignal, SiteModule, require_elements,
    scroll_handler_weak, subscribe_weak,
};
use crate::types::{ClickInput, KeyInput, LanguageChanged, LanguageChanging, LanguageFailed, from_payload};
use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const BUTTON: &str = "#languageImg";
pub const DROPDOWN: &str = ".language";
pub const META_DESCRIPTION: &str = r#"meta[name="description"]"#;

const HIDDEN: &str = "hidden";

/// Languages the site ships, with the name shown in the picker.
pub const DISPLAY_NAMES: [(&str, &str); 3] = [
    ("sr", "Crnogorski"),
    ("en", "English"),
    ("ru", "Русский"),
];

/// Selector of the picker entry for `code`.
pub fn lang_link(code: &str) -> String {
    format!(r#".flagLink[data-lang-code="{code}"]"#)
}

pub fn language_name(code: &str) -> &'static str {
    DISPLAY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("Unknown", |(_, name)| *name)
}

struct Inner {
    options: LanguageOptions,
    storage_key: String,
    document: Rc<dyn Document>,
    storage: Rc<dyn PreferenceStore>,
    source: Rc<dyn TranslationSource>,
    ctx: OnceCell<ModuleContext>,
    current: RefCell<String>,
    translations: RefCell<Translations>,
    dropdown_open: Cell<bool>,
    /// Bumped per change request; a fetch that returns after a newer
    /// request started is dropped.
    change_seq: Cell<u64>,
    bindings: RefCell<Bindings>,
    ready: ReadySignal,
    initialized: Cell<bool>,
}

pub struct LanguageModule {
    inner: Rc<Inner>,
}

impl LanguageModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[BUTTON, DROPDOWN])?;
        let options = config.modules.language.clone();
        if !options.supported.contains(&options.default) {
            return Err(ModuleError::Config(format!(
                "default language `{}` is not in the supported list",
                options.default
            )));
        }
        Ok(Self {
            inner: Rc::new(Inner {
                storage_key: config.storage_key(&options.storage_key),
                current: RefCell::new(options.default.clone()),
                options,
                document: host.document.clone(),
                storage: host.storage.clone(),
                source: host.translations.clone(),
                ctx: OnceCell::new(),
                translations: RefCell::new(Translations::default()),
                dropdown_open: Cell::new(false),
                change_seq: Cell::new(0),
                bindings: RefCell::new(Bindings::default()),
                ready: ReadySignal::new(),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn current_language(&self) -> String {
        self.inner.current.borrow().clone()
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.inner.options.supported
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.inner.is_supported(code)
    }

    /// The loaded table. Cheap to clone; does not follow later changes.
    pub fn translations(&self) -> Translations {
        self.inner.translations.borrow().clone()
    }

    /// The string at `key`, or `key` itself when missing.
    pub fn translate(&self, key: &str) -> String {
        self.inner.translations.borrow().translate(key)
    }

    /// Resolved once the first table is applied.
    pub fn ready(&self) -> ReadySignal {
        self.inner.ready.clone()
    }

    pub fn is_dropdown_open(&self) -> bool {
        self.inner.dropdown_open.get()
    }

    pub fn toggle_dropdown(&self) {
        self.inner.toggle_dropdown();
    }

    pub fn open_dropdown(&self) {
        self.inner.open_dropdown();
    }

    pub fn close_dropdown(&self) {
        self.inner.close_dropdown();
    }

    /// Switch to `language`. Unsupported or already-active languages just
    /// close the picker.
    pub async fn change_language(&self, language: &str) -> Result<(), ModuleError> {
        self.inner.change_language(language).await
    }
}

impl Inner {
    fn is_supported(&self, code: &str) -> bool {
        self.options.supported.iter().any(|s| s == code)
    }

    fn stored_preference(&self) -> String {
        match self.storage.get(&self.storage_key) {
            Ok(Some(code)) if self.is_supported(&code) => code,
            Ok(Some(code)) => {
                debug!(language = %code, "ignoring unsupported stored language");
                self.options.default.clone()
            }
            Ok(None) => self.options.default.clone(),
            Err(err) => {
                warn!(error = %err, "language preference unavailable");
                self.options.default.clone()
            }
        }
    }

    async fn load_with_fallback(&self, language: &str) -> Result<(String, Translations), ModuleError> {
        let default = &self.options.default;
        match self.source.fetch(language).await {
            Ok(table) => return Ok((language.to_string(), Translations::new(table))),
            Err(err) if language != default.as_str() => {
                warn!(language, error = %err, "translations failed; falling back to default");
            }
            Err(err) => warn!(language, error = %err, "translations failed"),
        }
        if language != default.as_str() {
            if let Ok(table) = self.source.fetch(default).await {
                return Ok((default.clone(), Translations::new(table)));
            }
        }
        Err(ModuleError::TranslationsUnavailable {
            language: language.to_string(),
            default: default.clone(),
        })
    }

    fn apply(&self) {
        let translations = self.translations.borrow().clone();
        let language = self.current.borrow().clone();
        let document = &self.document;

        for binding in document.i18n_bindings() {
            let Some(text) = translations.text(&binding.key) else {
                continue;
            };
            match binding.target {
                I18nTarget::Text => document.set_text(&binding.selector, text),
                I18nTarget::Html => document.set_html(&binding.selector, text),
                I18nTarget::Placeholder => document.set_attribute(&binding.selector, "placeholder", text),
                I18nTarget::Title => document.set_attribute(&binding.selector, "title", text),
                I18nTarget::Alt => document.set_attribute(&binding.selector, "alt", text),
            }
        }
        if let Some(title) = translations.text("pageTitle") {
            document.set_title(title);
        }
        if let Some(description) = translations.text("pageDescription") {
            document.set_attribute(META_DESCRIPTION, "content", description);
        }
        document.set_language(&language);

        let name = language_name(&language);
        document.set_attribute(BUTTON, "data-current-lang", &language);
        document.set_attribute(BUTTON, "aria-label", &format!("Change language. Current: {name}"));
        document.set_attribute(BUTTON, "title", &format!("Current language: {name}"));
        for code in &self.options.supported {
            let link = lang_link(code);
            if *code == language {
                document.set_attribute(&link, HIDDEN, "");
            } else {
                document.remove_attribute(&link, HIDDEN);
            }
        }
    }

    fn set_dropdown(&self, open: bool) {
        self.dropdown_open.set(open);
        self.document.set_class(DROPDOWN, HIDDEN, !open);
        self.document
            .set_attribute(BUTTON, "aria-expanded", if open { "true" } else { "false" });
    }

    fn toggle_dropdown(&self) {
        if self.dropdown_open.get() {
            self.close_dropdown();
        } else {
            self.open_dropdown();
        }
    }

    fn open_dropdown(&self) {
        self.set_dropdown(true);
        publish(&self.ctx, events::LANGUAGE_DROPDOWN_OPENED, json!({}));
    }

    fn close_dropdown(&self) {
        if !self.dropdown_open.get() {
            return;
        }
        self.set_dropdown(false);
        publish(&self.ctx, events::LANGUAGE_DROPDOWN_CLOSED, json!({}));
    }

    async fn change_language(&self, language: &str) -> Result<(), ModuleError> {
        if !self.is_supported(language) {
            self.close_dropdown();
            return Ok(());
        }
        let seq = self.change_seq.get() + 1;
        self.change_seq.set(seq);
        let previous = self.current.borrow().clone();
        if language == previous {
            self.close_dropdown();
            return Ok(());
        }
        publish(
            &self.ctx,
            events::LANGUAGE_CHANGING,
            LanguageChanging {
                from: previous.clone(),
                to: language.to_string(),
            },
        );

        let fetched = self.source.fetch(language).await;
        if self.change_seq.get() != seq {
            debug!(language, "language change superseded");
            return Ok(());
        }
        let table = match fetched {
            Ok(table) => table,
            Err(err) => {
                warn!(language, error = %err, "language change failed");
                publish(
                    &self.ctx,
                    events::LANGUAGE_ERROR,
                    LanguageFailed {
                        language: language.to_string(),
                        error: err.to_string(),
                    },
                );
                return Err(err.into());
            }
        };

        let previous = self.current.borrow().clone();
        *self.translations.borrow_mut() = Translations::new(table);
        *self.current.borrow_mut() = language.to_string();
        if let Err(err) = self.storage.set(&self.storage_key, language) {
            warn!(error = %err, "could not persist language preference");
        }
        self.apply();
        self.close_dropdown();
        info!(language, previous = %previous, "language changed");
        publish(
            &self.ctx,
            events::LANGUAGE_CHANGED,
            LanguageChanged {
                language: language.to_string(),
                previous_language: previous,
            },
        );
        Ok(())
    }

    fn on_click(self: &Rc<Self>, click: &ClickInput) {
        if click.within(BUTTON) {
            self.toggle_dropdown();
            return;
        }
        let picked = self
            .options
            .supported
            .iter()
            .find(|code| click.within(&lang_link(code)))
            .cloned();
        if let Some(code) = picked {
            if let Some(ctx) = self.ctx.get() {
                let inner = self.clone();
                ctx.scheduler.spawn(async move {
                    // Failures are already published as language:error.
                    let _ = inner.change_language(&code).await;
                });
            }
            return;
        }
        if !click.within(DROPDOWN) {
            self.close_dropdown();
        }
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let mut bindings = self.bindings.borrow_mut();
        bindings.subscription(subscribe_weak(&ctx.bus, events::DOM_CLICK, self, |inner, payload| {
            let click: ClickInput = from_payload(payload)?;
            inner.on_click(&click);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(&ctx.bus, events::DOM_KEYDOWN, self, |inner, payload| {
            let key: KeyInput = from_payload(payload)?;
            if key.key == "Escape" {
                inner.close_dropdown();
            }
            Ok(())
        })?);
        bindings.scroll_handler(scroll_handler_weak(&ctx.scroll, self, 5, |inner, _| {
            inner.close_dropdown();
            Ok(())
        }));
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for LanguageModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Language
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        let preferred = self.inner.stored_preference();
        let (language, translations) = self.inner.load_with_fallback(&preferred).await?;

        *self.inner.current.borrow_mut() = language.clone();
        *self.inner.translations.borrow_mut() = translations;
        self.inner.wire(&ctx)?;
        self.inner.set_dropdown(false);
        self.inner.apply();

        self.inner.initialized.set(true);
        self.inner.ready.resolve();
        info!(language = %language, "language ready");
        ctx.bus
            .publish(events::LANGUAGE_READY, json!({ "language": language }));
        Ok(())
    }

    async fn wait_for_ready(&self) -> Result<(), ModuleError> {
        if self.inner.ready.wait().await {
            Ok(())
        } else {
            Err(ModuleError::Failed("language setup was abandoned".into()))
        }
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        self.inner.close_dropdown();
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::host::DomEvent;
    use crate::host::Viewport;
    use crate::test_helpers::{TestSite, record_events};

    fn language(site: &TestSite) -> Rc<LanguageModule> {
        site.app()
            .module::<LanguageModule>(ModuleKind::Language)
            .expect("language loaded")
    }

    // =========================================================================
    // Startup
    // =========================================================================

    #[test]
    fn applies_default_language() {
        let mut site = TestSite::new();
        site.boot();
        let doc = &site.memory.document;

        assert_eq!(doc.language().as_deref(), Some("sr"));
        assert_eq!(doc.title().as_deref(), Some("Perfect Shine | Profesionalno čišćenje"));
        assert_eq!(doc.text(".hero h1").as_deref(), Some("Profesionalno čišćenje"));
        assert_eq!(
            doc.attribute(BUTTON, "data-current-lang").as_deref(),
            Some("sr")
        );
        assert!(doc.attribute(&lang_link("sr"), HIDDEN).is_some());
        assert!(doc.attribute(&lang_link("en"), HIDDEN).is_none());
        assert!(doc.has_class(DROPDOWN, HIDDEN));
    }

    #[test]
    fn stored_preference_wins() {
        let mut site = TestSite::new();
        site.memory.storage.insert("perfect_shine_lang", "en");
        site.boot();
        assert_eq!(language(&site).current_language(), "en");
        assert_eq!(site.memory.document.language().as_deref(), Some("en"));
        assert_eq!(
            site.memory.document.attribute(META_DESCRIPTION, "content").as_deref(),
            Some("Professional cleaning services in Montenegro.")
        );
    }

    #[test]
    fn unsupported_stored_preference_is_ignored() {
        let mut site = TestSite::new();
        site.memory.storage.insert("perfect_shine_lang", "de");
        site.boot();
        assert_eq!(language(&site).current_language(), "sr");
        assert_eq!(site.memory.translations.requests(), vec!["sr"]);
    }

    #[test]
    fn unavailable_storage_uses_default() {
        let mut site = TestSite::new();
        site.memory.storage.set_unavailable(true);
        site.boot();
        assert_eq!(language(&site).current_language(), "sr");
    }

    #[test]
    fn failed_preference_falls_back_to_default() {
        let mut site = TestSite::new();
        site.memory.storage.insert("perfect_shine_lang", "ru");
        site.memory.translations.fail("ru");
        site.boot();
        assert_eq!(language(&site).current_language(), "sr");
        assert_eq!(site.memory.translations.requests(), vec!["ru", "sr"]);
    }

    #[test]
    fn default_failure_aborts_bootstrap() {
        let mut site = TestSite::new();
        site.memory.translations.fail("sr");
        let app = site.app();
        let result = site.el.block_on(app.initialize()).unwrap();
        assert!(result.is_err());
        assert_eq!(app.state(), AppState::Error);
    }

    // =========================================================================
    // Switching
    // =========================================================================

    #[test]
    fn change_language_updates_everything() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let module = language(&site);

        site.el.block_on(module.change_language("en")).unwrap().unwrap();

        assert_eq!(module.current_language(), "en");
        assert_eq!(module.translate("contact.subjectRequired"), "Subject is required");
        assert_eq!(site.memory.storage.value("perfect_shine_lang").as_deref(), Some("en"));
        assert_eq!(site.memory.document.language().as_deref(), Some("en"));
        let language_events: Vec<String> = events
            .names()
            .into_iter()
            .filter(|name| name.starts_with("language:"))
            .collect();
        assert_eq!(
            language_events,
            vec![events::LANGUAGE_CHANGING.to_string(), events::LANGUAGE_CHANGED.to_string()]
        );
        assert_eq!(
            events.payload(events::LANGUAGE_CHANGED),
            Some(json!({"language": "en", "previousLanguage": "sr"}))
        );
    }

    #[test]
    fn failed_change_keeps_current_language() {
        let mut site = TestSite::new();
        let app = site.boot();
        site.memory.translations.fail("ru");
        let events = record_events(app.bus());
        let module = language(&site);

        let result = site.el.block_on(module.change_language("ru")).unwrap();

        assert!(result.is_err());
        assert_eq!(module.current_language(), "sr");
        assert_eq!(events.count(events::LANGUAGE_ERROR), 1);
        assert_eq!(events.count(events::LANGUAGE_CHANGED), 0);
    }

    #[test]
    fn same_or_unsupported_language_only_closes_picker() {
        let mut site = TestSite::new();
        let app = site.boot();
        let module = language(&site);
        module.open_dropdown();
        let events = record_events(app.bus());

        site.el.block_on(module.change_language("sr")).unwrap().unwrap();
        site.el.block_on(module.change_language("de")).unwrap().unwrap();

        assert!(!module.is_dropdown_open());
        assert_eq!(events.names(), vec![events::LANGUAGE_DROPDOWN_CLOSED.to_string()]);
    }

    #[test]
    fn picker_click_switches_language() {
        let mut site = TestSite::new();
        site.boot();
        site.click(&[&lang_link("en"), DROPDOWN]);
        site.el.run_until_stalled();
        assert_eq!(language(&site).current_language(), "en");
    }

    #[test]
    fn latest_pick_wins_over_slower_fetch() {
        let mut site = TestSite::new();
        let app = site.boot();
        let events = record_events(app.bus());
        let module = language(&site);

        site.memory.translations.set_latency(site.el.scheduler(), 300);
        site.click(&[&lang_link("en"), DROPDOWN]);
        site.el.run_until_stalled();
        site.memory.translations.set_latency(site.el.scheduler(), 10);
        site.click(&[&lang_link("ru"), DROPDOWN]);
        site.el.advance(500);

        assert_eq!(module.current_language(), "ru");
        assert_eq!(events.count(events::LANGUAGE_CHANGED), 1);
        assert_eq!(
            events.payload(events::LANGUAGE_CHANGED).unwrap()["language"],
            json!("ru")
        );
    }

    #[test]
    fn switching_back_cancels_pending_pick() {
        let mut site = TestSite::new();
        site.boot();
        let module = language(&site);

        site.memory.translations.set_latency(site.el.scheduler(), 300);
        site.click(&[&lang_link("en"), DROPDOWN]);
        site.el.run_until_stalled();
        site.click(&[&lang_link("sr"), DROPDOWN]);
        site.el.advance(500);

        assert_eq!(module.current_language(), "sr");
    }

    // =========================================================================
    // Dropdown
    // =========================================================================

    #[test]
    fn button_toggles_and_outside_click_closes() {
        let mut site = TestSite::new();
        site.boot();
        let module = language(&site);

        site.click(&[BUTTON]);
        assert!(module.is_dropdown_open());
        assert!(!site.memory.document.has_class(DROPDOWN, HIDDEN));

        site.click(&[DROPDOWN]);
        assert!(module.is_dropdown_open());

        site.click(&["main", "body"]);
        assert!(!module.is_dropdown_open());
    }

    #[test]
    fn escape_and_scroll_close_dropdown() {
        let mut site = TestSite::new();
        let app = site.boot();
        let module = language(&site);

        module.open_dropdown();
        app.dispatch(DomEvent::KeyDown { key: "Escape".into() });
        assert!(!module.is_dropdown_open());

        module.open_dropdown();
        site.el.advance(100);
        site.memory.viewport.set_scroll_top(400.0);
        app.dispatch(DomEvent::Scroll);
        assert!(!module.is_dropdown_open());
    }

    #[test]
    fn names_for_known_codes() {
        assert_eq!(language_name("ru"), "Русский");
        assert_eq!(language_name("xx"), "Unknown");
    }
}
