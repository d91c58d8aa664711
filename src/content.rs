//! Static page content: the hero banner and the services section.
//!
//! Both are described by JSON files (`hero.json`, `services.json`) kept next
//! to the site and rendered into fixed containers before the modules boot.
//! The hero markup carries the call-us button and its options list, which
//! the call-us widget wires up afterwards.

use crate::host::Document;
use crate::util::decode_html_entities;
use maud::{Markup, html};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const HERO_TEXT_BOX: &str = ".hero-text-box";
pub const SERVICES_TITLE: &str = "#services-title";
pub const SERVICES_CONTAINER: &str = "#services-container";
pub const SERVICES_INFO: &str = "#services-info";
pub const SERVICES_FEATURE: &str = "#services-feature";

const INFO_BORDER: &str = "img/border/border-1-row.png";

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct HeroFile {
    hero: HeroContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    pub title: String,
    #[serde(default)]
    pub services: Vec<HeroService>,
    pub call_to_action: CallToAction,
    pub scroll_down_link: String,
    #[serde(default)]
    pub scroll_down_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeroService {
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    pub text: String,
    pub phone_number: String,
    #[serde(default)]
    pub options: Vec<CallOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallOption {
    pub platform: String,
    pub link: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesContent {
    pub title: ServicesTitle,
    #[serde(default)]
    pub services: Vec<Service>,
    pub info: ServicesInfo,
    #[serde(default)]
    pub feature: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesTitle {
    pub subheading: String,
    pub h2: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub title: String,
    pub image: String,
    pub bottom_image: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<ServiceAttribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAttribute {
    pub name: String,
    pub icon: String,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesInfo {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<InfoSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoSection {
    pub icon: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Content found in a content directory. Missing files leave their part
/// of the page untouched.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub hero: Option<HeroContent>,
    pub services: Option<ServicesContent>,
}

pub fn load_content(dir: &Path) -> Result<PageContent, ContentError> {
    let hero = read_json::<HeroFile>(&dir.join("hero.json"))?.map(|f| f.hero);
    let services = read_json::<ServicesContent>(&dir.join("services.json"))?;
    Ok(PageContent { hero, services })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ContentError> {
    if !path.exists() {
        debug!(path = %path.display(), "content file not found, skipping");
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| ContentError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// CSS class for an activity badge; unknown activities get none.
pub fn activity_class(activity: &str) -> &'static str {
    match activity.to_lowercase().as_str() {
        "čišćenje" => "activity-cleaning",
        "pranje" => "activity-washing",
        "polimerizacija" => "activity-polishing",
        "održavanje" => "activity-upkeep",
        _ => "",
    }
}

pub fn render_hero(hero: &HeroContent) -> Markup {
    let cta = &hero.call_to_action;
    html! {
        h1.h1 { (decode_html_entities(&hero.title)) }
        p {
            @for (i, service) in hero.services.iter().enumerate() {
                (decode_html_entities(&service.name))
                @if i + 1 < hero.services.len() {
                    span.hero-text-box-icon {
                        "\u{a0}"
                        img.header-icon src=(service.icon) alt={ (service.name) " icon" };
                        "\u{a0}"
                    }
                }
            }
        }
        div.call-us.top-left-radius."width-100" {
            span.call-us-text { (decode_html_entities(&cta.text)) }
            span.call-us-icon { "☎\u{a0}" }
            button.phone-number { (cta.phone_number) }
            div.call-options.flex.noneDisplay #callOptions {
                @for option in &cta.options {
                    a.call-option.flex."g-10".y_center href=(option.link) {
                        img src=(option.icon) alt=(option.platform) width="128" height="128";
                        (option.platform)
                    }
                }
            }
        }
        a #scroll-down-arrow href=(hero.scroll_down_link) {
            span.scroll-down-arrow { (decode_html_entities(&hero.scroll_down_text)) }
        }
    }
}

pub fn render_services_title(title: &ServicesTitle) -> Markup {
    html! {
        div.container {
            span.subheading { (decode_html_entities(&title.subheading)) }
            h2.h2 { (decode_html_entities(&title.h2)) }
        }
    }
}

pub fn render_services(services: &[Service]) -> Markup {
    html! {
        @for service in services {
            div.service {
                div.relative.overflow-hidden {
                    div.darkening-effect {
                        img.img.service-photo src=(service.image) width="500" height="367" alt=(service.alt_text);
                        img.img.absolute.img-bottom src=(service.bottom_image) width="1680" height="95" alt="image bottom effect";
                    }
                    div.service-photo-link.absolute.flex-space-between {
                        a href="#gallery" { "Galerija" }
                        a href="#pricing" { "Cijene" }
                    }
                }
                div.service-content {
                    div.activities {
                        @for activity in &service.activities {
                            span class={ "activity p-sm " (activity_class(activity)) } { (activity) }
                        }
                    }
                    h3.service-title.h3 { (decode_html_entities(&service.title)) }
                    ul.activity-attributes {
                        @for attribute in &service.attributes {
                            li.activity-attribute.p {
                                ion-icon.service-icon name=(attribute.icon) {}
                                a href=(attribute.link) {
                                    span { strong { (decode_html_entities(&attribute.name)) } }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn render_services_info(info: &ServicesInfo) -> Markup {
    html! {
        h3.h3-lg { (decode_html_entities(&info.title)) }
        @for (i, section) in info.sections.iter().enumerate() {
            div.flex.info-service {
                img.service-icon width="30" height="30" alt="Info icon" src=(section.icon);
                p.p { (decode_html_entities(&section.text)) }
            }
            @if i + 1 < info.sections.len() {
                img.img."border-1-row-p-15-0" src=(INFO_BORDER) alt="Border for page";
            }
        }
    }
}

pub fn render_features(features: &[Feature]) -> Markup {
    html! {
        @for feature in features {
            div.feature {
                @if let Some(image) = &feature.image {
                    a href="#about" {
                        img.img.brand-photo src=(image) width="550" height="367" alt=(feature.title);
                    }
                    a href="#about" {
                        h3.feature-title.h3 { (decode_html_entities(&feature.title)) }
                    }
                    @for text in &feature.features {
                        p.feature-text.flex.p { (decode_html_entities(text)) }
                    }
                } @else {
                    div.service-list.flex-column {
                        a href="#services" {
                            h3.feature-title.h3 { (decode_html_entities(&feature.title)) }
                        }
                        @for text in &feature.features {
                            p.feature-text.flex.p {
                                ion-icon.list-icon name="checkmark-outline" {}
                                (decode_html_entities(text))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn write(document: &dyn Document, selector: &str, markup: Markup) {
    if !document.contains(selector) {
        warn!(selector, "content container missing, skipping");
        return;
    }
    document.set_html(selector, &markup.into_string());
}

/// Render whatever content is present into its containers.
pub fn inject(document: &dyn Document, content: &PageContent) {
    if let Some(hero) = &content.hero {
        write(document, HERO_TEXT_BOX, render_hero(hero));
        debug!(services = hero.services.len(), "hero rendered");
    }
    if let Some(services) = &content.services {
        write(document, SERVICES_TITLE, render_services_title(&services.title));
        write(document, SERVICES_CONTAINER, render_services(&services.services));
        write(document, SERVICES_INFO, render_services_info(&services.info));
        if !services.feature.is_empty() {
            write(document, SERVICES_FEATURE, render_features(&services.feature));
        }
        debug!(services = services.services.len(), "services rendered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryDocument;

    const HERO_JSON: &str = include_str!("../fixtures/content/hero.json");
    const SERVICES_JSON: &str = include_str!("../fixtures/content/services.json");

    fn hero() -> HeroContent {
        serde_json::from_str::<HeroFile>(HERO_JSON).unwrap().hero
    }

    fn services() -> ServicesContent {
        serde_json::from_str(SERVICES_JSON).unwrap()
    }

    // =========================================================================
    // Hero
    // =========================================================================

    #[test]
    fn hero_icons_sit_between_service_names() {
        let html = render_hero(&hero()).into_string();
        assert!(html.starts_with(r#"<h1 class="h1">"#));
        assert_eq!(html.matches("hero-text-box-icon").count(), hero().services.len() - 1);
        let hero = hero();
        let last = &hero.services.last().unwrap().name;
        assert!(!html.contains(&format!("{last} icon")));
    }

    #[test]
    fn hero_carries_call_options() {
        let content = hero();
        let html = render_hero(&content).into_string();
        assert!(html.contains(r#"id="callOptions""#));
        assert!(html.contains("noneDisplay"));
        assert!(html.contains(r#"<button class="phone-number">"#));
        assert_eq!(html.matches("call-option flex").count(), content.call_to_action.options.len());
        assert!(html.contains(&format!(r#"href="{}""#, content.scroll_down_link)));
    }

    #[test]
    fn hero_text_is_escaped() {
        let mut content = hero();
        content.title = "<b>Shine</b>".into();
        let html = render_hero(&content).into_string();
        assert!(html.contains("&lt;b&gt;Shine&lt;/b&gt;"));
    }

    // =========================================================================
    // Services
    // =========================================================================

    #[test]
    fn activity_classes() {
        assert_eq!(activity_class("Čišćenje"), "activity-cleaning");
        assert_eq!(activity_class("pranje"), "activity-washing");
        assert_eq!(activity_class("Polimerizacija"), "activity-polishing");
        assert_eq!(activity_class("ODRŽAVANJE"), "activity-upkeep");
        assert_eq!(activity_class("dezinfekcija"), "");
    }

    #[test]
    fn each_service_gets_a_card() {
        let content = services();
        let html = render_services(&content.services).into_string();
        assert_eq!(html.matches(r#"<div class="service">"#).count(), content.services.len());
        assert!(html.contains("activity p-sm activity-cleaning"));
        assert!(html.contains(r##"<a href="#pricing">Cijene</a>"##));
    }

    #[test]
    fn info_borders_only_between_sections() {
        let content = services();
        let html = render_services_info(&content.info).into_string();
        assert_eq!(html.matches(INFO_BORDER).count(), content.info.sections.len() - 1);
        assert!(!html.ends_with(r#"alt="Border for page">"#));
    }

    #[test]
    fn features_with_and_without_image() {
        let content = services();
        let html = render_features(&content.feature).into_string();
        assert!(html.contains("brand-photo"));
        assert!(html.contains("service-list flex-column"));
        assert!(html.contains(r#"name="checkmark-outline""#));
    }

    // =========================================================================
    // Injection and loading
    // =========================================================================

    #[test]
    fn inject_fills_containers() {
        let doc = MemoryDocument::site(&["hero".to_string(), "services".to_string()]);
        let content = PageContent {
            hero: Some(hero()),
            services: Some(services()),
        };
        inject(&doc, &content);
        for selector in [
            HERO_TEXT_BOX,
            SERVICES_TITLE,
            SERVICES_CONTAINER,
            SERVICES_INFO,
            SERVICES_FEATURE,
        ] {
            assert!(doc.html(selector).is_some_and(|h| !h.is_empty()), "{selector}");
        }
    }

    #[test]
    fn inject_skips_missing_containers() {
        let doc = MemoryDocument::new();
        let content = PageContent {
            hero: Some(hero()),
            services: None,
        };
        inject(&doc, &content);
        assert_eq!(doc.html(HERO_TEXT_BOX), None);
    }

    #[test]
    fn load_content_reads_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hero.json"), HERO_JSON).unwrap();
        let content = load_content(dir.path()).unwrap();
        assert!(content.hero.is_some());
        assert!(content.services.is_none());
    }

    #[test]
    fn load_content_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("services.json"), "{").unwrap();
        let err = load_content(dir.path()).unwrap_err();
        assert!(matches!(err, ContentError::Json { .. }));
    }
}
