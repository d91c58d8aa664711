//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the values the live site ships with; a user file only overrides the keys it
//! names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! sections = ["hero", "about", "gallerySection", "services",
//!             "featuree", "pricing", "partners", "contact"]
//!
//! [app]
//! name = "Perfect Shine"
//!
//! [scroll]
//! offset = 80.0             # Header height subtracted from scroll targets
//! duration_ms = 800         # Programmatic scroll animation length
//! trigger_fraction = 0.4    # Fallback section trigger, fraction of viewport
//!
//! [performance]
//! scroll_throttle_ms = 16   # One scroll sample per animation frame
//!
//! [watchdog]
//! timeout_ms = 8000         # Force-hide the loader if bootstrap stalls
//!
//! [modules.loader]
//! min_display_ms = 2000
//!
//! [modules.language]
//! default = "sr"
//! supported = ["sr", "en", "ru"]
//!
//! [modules.partners]
//! enabled = false           # Any module can be switched off
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! [modules.gallery.zoom]
//! max = 3.0
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::event_loop::Millis;
use crate::module::ModuleKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults matching the production site. Unknown keys are
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Section ids in page order. Drives active-section detection and the
    /// navigation links.
    pub sections: Vec<String>,
    pub app: AppConfig,
    pub scroll: ScrollConfig,
    pub performance: PerformanceConfig,
    pub storage: StorageConfig,
    pub watchdog: WatchdogConfig,
    pub modules: ModulesConfig,
}

pub fn default_sections() -> Vec<String> {
    [
        "hero",
        "about",
        "gallerySection",
        "services",
        "featuree",
        "pricing",
        "partners",
        "contact",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            app: AppConfig::default(),
            scroll: ScrollConfig::default(),
            performance: PerformanceConfig::default(),
            storage: StorageConfig::default(),
            watchdog: WatchdogConfig::default(),
            modules: ModulesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sections.is_empty() {
            return Err(ConfigError::Validation("sections must not be empty".into()));
        }
        if self.sections.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "sections must not contain empty ids".into(),
            ));
        }
        if !(self.scroll.trigger_fraction > 0.0 && self.scroll.trigger_fraction <= 1.0) {
            return Err(ConfigError::Validation(
                "scroll.trigger_fraction must be in (0, 1]".into(),
            ));
        }
        if self.scroll.offset < 0.0 || self.scroll.min_distance < 0.0 {
            return Err(ConfigError::Validation(
                "scroll.offset and scroll.min_distance must be non-negative".into(),
            ));
        }
        if self.performance.frame_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "performance.frame_interval_ms must be non-zero".into(),
            ));
        }

        let language = &self.modules.language;
        if language.supported.is_empty() {
            return Err(ConfigError::Validation(
                "modules.language.supported must not be empty".into(),
            ));
        }
        if !language.supported.contains(&language.default) {
            return Err(ConfigError::Validation(format!(
                "modules.language.default `{}` is not in supported",
                language.default
            )));
        }

        let nav = &self.modules.navigation;
        if !(0.0..=1.0).contains(&nav.sticky_threshold) {
            return Err(ConfigError::Validation(
                "modules.navigation.sticky_threshold must be 0-1".into(),
            ));
        }

        let zoom = &self.modules.gallery.zoom;
        if zoom.min <= 0.0 || zoom.min > 1.0 || zoom.max < 1.0 {
            return Err(ConfigError::Validation(
                "modules.gallery.zoom must satisfy 0 < min <= 1 <= max".into(),
            ));
        }
        if zoom.step <= 0.0 {
            return Err(ConfigError::Validation(
                "modules.gallery.zoom.step must be positive".into(),
            ));
        }
        for (name, grid) in [
            ("desktop", &self.modules.gallery.grid.desktop),
            ("tablet", &self.modules.gallery.grid.tablet),
            ("mobile", &self.modules.gallery.grid.mobile),
        ] {
            if grid.rows == 0 || grid.min_width <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "modules.gallery.grid.{name} needs rows > 0 and min_width > 0"
                )));
            }
        }

        if self.modules.partners.speed < 0.0 {
            return Err(ConfigError::Validation(
                "modules.partners.speed must be non-negative".into(),
            ));
        }

        let contact = &self.modules.contact;
        if contact.min_phone_digits > contact.max_phone_digits {
            return Err(ConfigError::Validation(
                "modules.contact.min_phone_digits exceeds max_phone_digits".into(),
            ));
        }
        for pattern in &contact.phone_patterns {
            Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "modules.contact.phone_patterns: `{pattern}` is not a valid regex: {e}"
                ))
            })?;
        }

        let mut indices: Vec<u32> = self.modules.pricing.plans.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() != self.modules.pricing.plans.len() {
            return Err(ConfigError::Validation(
                "modules.pricing.plans indices must be unique".into(),
            ));
        }
        Ok(())
    }

    /// Storage key with the configured namespace prefix.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.storage.prefix, key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Perfect Shine".to_string(),
            version: "1.0.0".to_string(),
            debug: false,
        }
    }
}

/// Scroll coordinator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
    /// Pixels subtracted from a target's top (fixed header height).
    pub offset: f64,
    /// Programmatic scroll animation length.
    pub duration_ms: Millis,
    /// Idle time after the last tick before the settle sample.
    pub settle_ms: Millis,
    /// Minimum spacing between unforced section recomputations.
    pub section_interval_ms: Millis,
    /// Delay between a scroll tick and the section check it schedules.
    pub section_delay_ms: Millis,
    /// Fallback trigger line as a fraction of viewport height.
    pub trigger_fraction: f64,
    /// Targets closer than this resolve without animating.
    pub min_distance: f64,
    /// Forced section check after construction.
    pub initial_check_ms: Millis,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            offset: 80.0,
            duration_ms: 800,
            settle_ms: 100,
            section_interval_ms: 100,
            section_delay_ms: 50,
            trigger_fraction: 0.4,
            min_distance: 5.0,
            initial_check_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerformanceConfig {
    /// Generic UI throttle tick (loader fade, resize).
    pub throttle_delay_ms: Millis,
    pub debounce_delay_ms: Millis,
    pub scroll_throttle_ms: Millis,
    pub frame_interval_ms: Millis,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            throttle_delay_ms: 16,
            debounce_delay_ms: 250,
            scroll_throttle_ms: 16,
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: "perfect_shine_".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
    pub timeout_ms: Millis,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { timeout_ms: 8000 }
    }
}

/// Per-module switches and options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModulesConfig {
    pub loader: LoaderOptions,
    pub language: LanguageOptions,
    pub navigation: NavigationOptions,
    pub gallery: GalleryOptions,
    pub callus: CallusOptions,
    pub partners: PartnersOptions,
    pub contact: ContactOptions,
    pub pricing: PricingOptions,
}

impl ModulesConfig {
    pub fn is_enabled(&self, kind: ModuleKind) -> bool {
        match kind {
            ModuleKind::Loader => self.loader.enabled,
            ModuleKind::Language => self.language.enabled,
            ModuleKind::Navigation => self.navigation.enabled,
            ModuleKind::Gallery => self.gallery.enabled,
            ModuleKind::Callus => self.callus.enabled,
            ModuleKind::Partners => self.partners.enabled,
            ModuleKind::Contact => self.contact.enabled,
            ModuleKind::Pricing => self.pricing.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderOptions {
    pub enabled: bool,
    /// The indicator stays up at least this long after it is shown.
    pub min_display_ms: Millis,
    /// Extra hide attempt after `app:ready`.
    pub backup_hide_ms: Millis,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_display_ms: 2000,
            backup_hide_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageOptions {
    pub enabled: bool,
    pub default: String,
    pub supported: Vec<String>,
    /// Preference key, prefixed with `storage.prefix`.
    pub storage_key: String,
}

impl Default for LanguageOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            default: "sr".to_string(),
            supported: ["sr", "en", "ru"].map(String::from).to_vec(),
            storage_key: "lang".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationOptions {
    pub enabled: bool,
    /// Element whose height sets the sticky trigger.
    pub hero: String,
    /// Sticky once scrolled past this fraction of the hero height.
    pub sticky_threshold: f64,
    /// Minimum spacing between new history entries.
    pub history_throttle_ms: Millis,
    /// Viewport widths at or above this close the mobile menu.
    pub mobile_breakpoint: f64,
    /// Back/forward guard: released this long after the scroll completes...
    pub popstate_settle_ms: Millis,
    /// ...or after this long regardless.
    pub popstate_timeout_ms: Millis,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            hero: "hero".to_string(),
            sticky_threshold: 0.3,
            history_throttle_ms: 1000,
            mobile_breakpoint: 768.0,
            popstate_settle_ms: 100,
            popstate_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryOptions {
    pub enabled: bool,
    pub images: Vec<GalleryImageConfig>,
    pub zoom: ZoomOptions,
    /// Horizontal drag distance that counts as a swipe.
    pub drag_threshold: f64,
    pub rotation: TimerOptions,
    pub autoplay: TimerOptions,
    pub grid: GridOptions,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            images: default_gallery_images(),
            zoom: ZoomOptions::default(),
            drag_threshold: 50.0,
            rotation: TimerOptions {
                enabled: true,
                interval_ms: 2500,
            },
            autoplay: TimerOptions {
                enabled: false,
                interval_ms: 3000,
            },
            grid: GridOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GalleryImageConfig {
    pub src: String,
    pub thumbnail: String,
    pub alt: String,
    #[serde(default)]
    pub category: String,
}

fn default_gallery_images() -> Vec<GalleryImageConfig> {
    let alts = [
        (1, "Prekrasan prikaz prirode 1", "priroda"),
        (2, "Moderna arhitektura 2", "arhitektura"),
        (3, "Gradski vidik noću 3", "grad"),
        (4, "Planinski pejzaž 4", "priroda"),
        (5, "Morska obala 5", "more"),
        (6, "Šumska staza 6", "priroda"),
        (7, "Gradska četvrt 7", "grad"),
        (8, "Zimski pejzaž 8", "priroda"),
        (9, "Pustinjski krajolik 9", "priroda"),
        (10, "Jezerski vidik 10", "priroda"),
        (11, "Planinski vrh 11", "priroda"),
        (12, "Šumski potok 12", "priroda"),
        (14, "Poljski cvijet 13", "priroda"),
        (13, "Gradska noć 14", "grad"),
    ];
    alts.into_iter()
        .map(|(file, alt, category)| GalleryImageConfig {
            src: format!("img/gallery/1200x800/{file}.webp"),
            thumbnail: format!("img/gallery/{file}.webp"),
            alt: alt.to_string(),
            category: category.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomOptions {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.5,
            step: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerOptions {
    pub enabled: bool,
    pub interval_ms: Millis,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 3000,
        }
    }
}

/// Grid shape per breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridOptions {
    /// Viewport width from which `desktop` applies.
    pub desktop_from: f64,
    /// Viewport width from which `tablet` applies.
    pub tablet_from: f64,
    pub desktop: GridShape,
    pub tablet: GridShape,
    pub mobile: GridShape,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            desktop_from: 1200.0,
            tablet_from: 768.0,
            desktop: GridShape {
                rows: 2,
                gap: 4.0,
                min_width: 300.0,
            },
            tablet: GridShape {
                rows: 2,
                gap: 15.0,
                min_width: 200.0,
            },
            mobile: GridShape {
                rows: 2,
                gap: 3.0,
                min_width: 120.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridShape {
    pub rows: usize,
    pub gap: f64,
    /// Minimum column width in pixels.
    pub min_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CallusOptions {
    pub enabled: bool,
    pub phone_number: String,
    /// Show the floating button only while the header is sticky.
    pub show_on_sticky: bool,
    pub close_on_scroll: bool,
}

impl Default for CallusOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            phone_number: "+38268069211".to_string(),
            show_on_sticky: true,
            close_on_scroll: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartnersOptions {
    pub enabled: bool,
    /// Pixels per frame.
    pub speed: f64,
    pub pause_on_hover: bool,
    /// Margin around the viewport for the on-screen check.
    pub viewport_offset: f64,
    pub auto_start: bool,
    /// Section element the marquee lives in.
    pub section: String,
    /// Width of the duplicated logo track. The offset wraps at half of it.
    pub track_width: f64,
}

impl Default for PartnersOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 2.0,
            pause_on_hover: true,
            viewport_offset: 100.0,
            auto_start: true,
            section: "partners".to_string(),
            track_width: 2400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactOptions {
    pub enabled: bool,
    pub endpoint: String,
    pub show_success_message: bool,
    pub success_duration_ms: Millis,
    /// Sent with every submission.
    pub location: String,
    pub min_message_len: usize,
    /// A phone number that matches no pattern is still accepted if its digit
    /// count falls in this range.
    pub min_phone_digits: usize,
    pub max_phone_digits: usize,
    pub phone_patterns: Vec<String>,
}

impl Default for ContactOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "/send_email.php".to_string(),
            show_success_message: true,
            success_duration_ms: 3000,
            location: "Tivat, Montenegro".to_string(),
            min_message_len: 10,
            min_phone_digits: 9,
            max_phone_digits: 15,
            phone_patterns: [
                r"^\d{3} \d{3} \d{3}$",
                r"^\d{3} \d{3} \d{4}$",
                r"^\+\d{3} \d{2} \d{3} \d{3}$",
                r"^\+\d{3} \d{2} \d{3} \d{4}$",
                r"^\+\d{3} \d{1} \d{3} \d{6}$",
                r"^\d{9}$",
                r"^\d{10}$",
                r"^\+\d{11,14}$",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingOptions {
    pub enabled: bool,
    pub currency: String,
    pub show_modals: bool,
    /// Modal title when neither translations nor the plan provide one.
    pub default_title: String,
    pub plans: Vec<PlanConfig>,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            currency: "€".to_string(),
            show_modals: true,
            default_title: "Cjenovnik".to_string(),
            plans: vec![
                PlanConfig {
                    index: 1,
                    kind: "deepCleaning".to_string(),
                    key: "deep_cleaning".to_string(),
                    fallback_title: "Cjenovnik za dubinsko pranje".to_string(),
                },
                PlanConfig {
                    index: 2,
                    kind: "vehicles".to_string(),
                    key: "vehicles_and_vessels".to_string(),
                    fallback_title: "Cjenovnik za vozila i plovila".to_string(),
                },
                PlanConfig {
                    index: 3,
                    kind: "hotels".to_string(),
                    key: "hotels_and_yachts".to_string(),
                    fallback_title: "Cjenovnik za hotele i jahte".to_string(),
                },
            ],
        }
    }
}

/// One pricing card and its full-price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    /// Card number in the markup (`#total-1`).
    pub index: u32,
    /// Translation namespace under `pricing.plans`.
    pub kind: String,
    /// Key under `pricing.modal.prices`.
    pub key: String,
    pub fallback_title: String,
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Perfect Shine site runtime configuration
# ========================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Section element ids in page order. Active-section detection walks this list
# and the navigation bar has one link per entry.
sections = ["hero", "about", "gallerySection", "services", "featuree", "pricing", "partners", "contact"]

[app]
name = "Perfect Shine"
version = "1.0.0"
debug = false

# ---------------------------------------------------------------------------
# Scrolling
# ---------------------------------------------------------------------------
[scroll]
# Fixed header height subtracted from every scroll target (px).
offset = 80.0
# Length of the eased programmatic scroll animation.
duration_ms = 800
# Idle time after the last scroll tick before handlers get the settle sample.
settle_ms = 100
# Unforced active-section checks run at most this often.
section_interval_ms = 100
# Delay between a scroll tick and the section check it triggers.
section_delay_ms = 50
# A section counts as reached once its top is within this fraction of the
# viewport height (used when no section contains the viewport midpoint).
trigger_fraction = 0.4
# Scroll targets closer than this (px) resolve without animating.
min_distance = 5.0
# Forced section check this long after startup.
initial_check_ms = 500

# ---------------------------------------------------------------------------
# Timing
# ---------------------------------------------------------------------------
[performance]
throttle_delay_ms = 16
debounce_delay_ms = 250
scroll_throttle_ms = 16
frame_interval_ms = 16

[storage]
# Prefix for every preference key.
prefix = "perfect_shine_"

[watchdog]
# If the loading indicator is still up this long after bootstrap starts, it
# is force-hidden.
timeout_ms = 8000

# ---------------------------------------------------------------------------
# Modules. Every module has `enabled`; loader and language are critical and
# bootstrap fails without them.
# ---------------------------------------------------------------------------
[modules.loader]
enabled = true
min_display_ms = 2000
backup_hide_ms = 1000

[modules.language]
enabled = true
default = "sr"
supported = ["sr", "en", "ru"]
storage_key = "lang"

[modules.navigation]
enabled = true
hero = "hero"
# Header turns sticky past this fraction of the hero height.
sticky_threshold = 0.3
# New history entries at most this often; faster changes replace in place.
history_throttle_ms = 1000
mobile_breakpoint = 768.0
popstate_settle_ms = 100
popstate_timeout_ms = 2000

[modules.gallery]
enabled = true
drag_threshold = 50.0
# The image list defaults to the site's fourteen gallery photos. Override
# with an array of tables:
# [[modules.gallery.images]]
# src = "img/gallery/1200x800/1.webp"
# thumbnail = "img/gallery/1.webp"
# alt = "Prekrasan prikaz prirode 1"

[modules.gallery.zoom]
min = 0.5
max = 2.5
step = 0.25

[modules.gallery.rotation]
enabled = true
interval_ms = 2500

[modules.gallery.autoplay]
enabled = false
interval_ms = 3000

[modules.gallery.grid]
desktop_from = 1200.0
tablet_from = 768.0
desktop = { rows = 2, gap = 4.0, min_width = 300.0 }
tablet = { rows = 2, gap = 15.0, min_width = 200.0 }
mobile = { rows = 2, gap = 3.0, min_width = 120.0 }

[modules.callus]
enabled = true
phone_number = "+38268069211"
show_on_sticky = true
close_on_scroll = true

[modules.partners]
enabled = true
# Pixels per animation frame.
speed = 2.0
pause_on_hover = true
viewport_offset = 100.0
auto_start = true
section = "partners"
track_width = 2400.0

[modules.contact]
enabled = true
endpoint = "/send_email.php"
show_success_message = true
success_duration_ms = 3000
location = "Tivat, Montenegro"
min_message_len = 10
min_phone_digits = 9
max_phone_digits = 15
phone_patterns = [
    '^\d{3} \d{3} \d{3}$',
    '^\d{3} \d{3} \d{4}$',
    '^\+\d{3} \d{2} \d{3} \d{3}$',
    '^\+\d{3} \d{2} \d{3} \d{4}$',
    '^\+\d{3} \d{1} \d{3} \d{6}$',
    '^\d{9}$',
    '^\d{10}$',
    '^\+\d{11,14}$',
]

[modules.pricing]
enabled = true
currency = "€"
show_modals = true
default_title = "Cjenovnik"

[[modules.pricing.plans]]
index = 1
kind = "deepCleaning"
key = "deep_cleaning"
fallback_title = "Cjenovnik za dubinsko pranje"

[[modules.pricing.plans]]
index = 2
kind = "vehicles"
key = "vehicles_and_vessels"
fallback_title = "Cjenovnik za vozila i plovila"

[[modules.pricing.plans]]
index = 3
kind = "hotels"
key = "hotels_and_yachts"
fallback_title = "Cjenovnik za hotele i jahte"
"##
}
