//! End-to-end sessions against the in-memory host, through the public API
//! only.

use serde_json::{Value, json};
use shine_site::app::{App, AppError, AppState};
use shine_site::config::SiteConfig;
use shine_site::content;
use shine_site::event_loop::EventLoop;
use shine_site::events;
use shine_site::host::memory::MemoryHost;
use shine_site::host::{Document, DomEvent, Viewport};
use shine_site::module::ModuleKind;
use shine_site::modules::contact::{ContactModule, Field, SubmitOutcome};
use shine_site::modules::language::LanguageModule;
use shine_site::modules::{callus, loader};
use shine_site::output::Timeline;
use std::path::PathBuf;

fn fixture(language: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures/lang")
        .join(format!("{language}.json"));
    let content = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&content).unwrap()
}

struct Session {
    el: EventLoop,
    memory: MemoryHost,
    app: App,
    timeline: Timeline,
}

fn session(config: SiteConfig, memory: MemoryHost) -> Session {
    let el = EventLoop::new();
    let app = App::new(config, memory.host(), el.scheduler());
    let timeline = Timeline::record(app.bus(), el.scheduler());
    Session {
        el,
        memory,
        app,
        timeline,
    }
}

fn standard_session() -> Session {
    let config = SiteConfig::default();
    let memory = MemoryHost::new(&config.sections);
    for language in ["sr", "en", "ru"] {
        memory.translations.insert(language, fixture(language));
    }
    session(config, memory)
}

fn boot(s: &mut Session) {
    s.el.block_on(s.app.initialize()).unwrap().unwrap();
}

fn event_names(s: &Session) -> Vec<String> {
    s.timeline.entries().into_iter().map(|e| e.event).collect()
}

// =========================================================================
// Bootstrap
// =========================================================================

#[test]
fn full_site_boots_to_ready() {
    let mut s = standard_session();
    boot(&mut s);

    assert_eq!(s.app.state(), AppState::Ready);
    assert!(s.app.module_status().iter().all(|m| m.loaded && m.initialized));

    let names = event_names(&s);
    let pos = |name: &str| names.iter().position(|n| n == name).unwrap();
    assert!(pos(events::APP_INITIALIZING) < pos(events::LANGUAGE_READY));
    assert!(pos(events::LANGUAGE_READY) < pos(events::APP_READY));
}

#[test]
fn default_language_is_applied_to_the_page() {
    let mut s = standard_session();
    boot(&mut s);

    let language = s.app.module::<LanguageModule>(ModuleKind::Language).unwrap();
    assert_eq!(language.current_language(), "sr");
    assert_eq!(s.memory.document.language().as_deref(), Some("sr"));
    assert_eq!(
        s.memory.document.title().as_deref(),
        Some("Perfect Shine | Profesionalno čišćenje")
    );
}

#[test]
fn start_lists_loaded_modules() {
    let mut s = standard_session();
    boot(&mut s);
    s.app.start();

    let start = s
        .timeline
        .entries()
        .into_iter()
        .find(|e| e.event == events::APP_START)
        .unwrap();
    assert_eq!(start.payload["modules"].as_array().map(Vec::len), Some(8));
}

#[test]
fn missing_default_language_aborts_bootstrap() {
    let config = SiteConfig::default();
    let memory = MemoryHost::new(&config.sections);
    for language in ["sr", "en", "ru"] {
        memory.translations.fail(language);
    }
    let mut s = session(config, memory);

    let err = s.el.block_on(s.app.initialize()).unwrap().unwrap_err();

    assert!(matches!(
        err,
        AppError::CriticalModule {
            module: ModuleKind::Language,
            ..
        }
    ));
    assert_eq!(s.app.state(), AppState::Error);
    assert!(event_names(&s).contains(&events::APP_ERROR.to_string()));
    assert!(!s.app.has_module("pricing"));

    // The loading screen still goes away.
    s.el.advance(50);
    assert!(event_names(&s).contains(&events::LOADER_HIDDEN.to_string()));
    assert!(s.memory.document.has_class(loader::ROOT, "loaded"));
    assert!(s.memory.document.has_class(loader::WRAPPER, "hidden"));
}

// =========================================================================
// Scrolling
// =========================================================================

#[test]
fn scrolling_into_gallery_changes_section() {
    let mut s = standard_session();
    boot(&mut s);

    s.memory.viewport.set_scroll_top(1200.0);
    s.app.dispatch(DomEvent::Scroll);
    s.el.advance(200);

    let changed: Vec<Value> = s
        .timeline
        .entries()
        .into_iter()
        .filter(|e| e.event == events::SECTION_CHANGED)
        .map(|e| e.payload)
        .collect();
    assert_eq!(changed.last(), Some(&json!({ "section": "gallerySection" })));
}

// =========================================================================
// Contact form
// =========================================================================

#[test]
fn contact_form_validates_and_posts() {
    let mut s = standard_session();
    boot(&mut s);
    let contact = s.app.module::<ContactModule>(ModuleKind::Contact).unwrap();

    contact.input(Field::Phone, "12");
    contact.blur(Field::Phone);
    assert_eq!(contact.error_key(Field::Phone), Some("contact.phoneInvalid"));

    contact.input(Field::Subject, "Dubinsko pranje");
    contact.input(Field::Phone, "067 123 456");
    contact.input(Field::Message, "Trosjed i dvije fotelje, ove sedmice.");
    assert!(contact.is_valid(Field::Phone));
    assert_eq!(contact.value(Field::Phone), "067123456");

    let outcome = s.el.block_on(contact.submit()).unwrap();

    assert_eq!(outcome, SubmitOutcome::Sent);
    let requests = s.memory.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1["phone"], json!("067123456"));
    assert!(event_names(&s).contains(&events::CONTACT_SUCCESS.to_string()));
}

// =========================================================================
// Teardown
// =========================================================================

#[test]
fn destroyed_site_ignores_input() {
    let mut s = standard_session();
    boot(&mut s);
    s.app.destroy().unwrap();
    let before = s.timeline.len();

    s.app.dispatch(DomEvent::KeyDown {
        key: "Escape".into(),
    });
    s.el.advance(1000);

    assert_eq!(s.app.state(), AppState::Destroyed);
    assert_eq!(s.timeline.len(), before);
}

// =========================================================================
// Page content
// =========================================================================

#[test]
fn injected_hero_works_with_call_widget() {
    let config = SiteConfig::default();
    let memory = MemoryHost::new(&config.sections);
    for language in ["sr", "en", "ru"] {
        memory.translations.insert(language, fixture(language));
    }
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/content");
    let page = content::load_content(&dir).unwrap();
    content::inject(memory.document.as_ref(), &page);

    let mut s = session(config, memory);
    boot(&mut s);
    s.app.start();

    let hero = s.memory.document.html(content::HERO_TEXT_BOX).unwrap();
    assert!(hero.contains("phone-number"));
    assert!(s.memory.document.html(content::SERVICES_CONTAINER).is_some());

    s.app.dispatch(DomEvent::Click {
        path: vec![callus::CALL_BUTTON.to_string()],
    });
    s.el.advance(50);
    assert!(event_names(&s).iter().any(|n| n == events::CALLUS_OPTIONS_OPENED));
}
