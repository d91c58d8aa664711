//! Pricing cards and the full price list modal.
//!
//! Each card has a set of options; picking one writes its amount into the
//! card's total. The "show full price" button opens a modal whose list is
//! rendered from the translation table (`pricing.modal.prices.<key>`), so the
//! list follows the page language. Titles fall back from the translated
//! `pricing.plans.<kind>.modalTitle` to the plan's configured title and then
//! to the generic one.

use super::language::LanguageModule;
use super::publish;
use crate::config::{PlanConfig, PricingOptions, SiteConfig};
use crate::events;
use crate::host::{Document, Host};
use crate::i18n::Translations;
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements, subscribe_weak,
};
use crate::types::{ClickInput, KeyInput, ModalOpened, PricingModal, from_payload};
use crate::util::{decode_html_entities, format_price};
use async_trait::async_trait;
use maud::{Markup, html};
use serde::Deserialize;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const MODAL: &str = "#priceModal";
pub const MODAL_TITLE: &str = "#modal-title";
pub const MODAL_ITEMS: &str = "#modal-price-list-items";
pub const MODAL_CONTENT: &str = "#priceModal .modal-content";
pub const CLOSE_BUTTON: &str = "#priceModal .close";

pub const MODAL_KIND: &str = "pricing";

const BODY: &str = "body";
const ACTIVE: &str = "active";
const MODAL_OPEN_CLASS: &str = "modal-open";
const HIDDEN: &str = "hidden";
const DETAILS_ICON: &str = "img/border/play.svg";

/// Total of plan card `plan`.
pub fn total_selector(plan: u32) -> String {
    format!("#total-{plan}")
}

/// The extra detail line of plan card `plan`, shown for everything but the
/// deep washing option.
pub fn level_selector(plan: u32) -> String {
    format!("#plan-{plan} .level")
}

pub fn full_price_button(plan: u32) -> String {
    format!("#showFullPrice-{plan}")
}

/// One group of the full price list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceCategory {
    pub name: String,
    #[serde(default)]
    pub subitems: Vec<PriceItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceItem {
    pub name: String,
    pub value: String,
}

/// The option picked on one card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub amount: f64,
    pub deep_washing: bool,
}

fn total_markup(currency: &str, amount: f64) -> Markup {
    html! {
        span.euro { (currency) }
        span { (format!("{amount:.2}")) }
    }
}

fn price_list_markup(categories: &[PriceCategory]) -> Markup {
    html! {
        @for category in categories {
            div.price-category {
                h5.priceDetalisTitle {
                    img.details-icon src=(DETAILS_ICON) alt="" width="16" height="16";
                    span { (decode_html_entities(&category.name)) }
                }
                @if !category.subitems.is_empty() {
                    ul.price-subitems {
                        @for item in &category.subitems {
                            li.price-item {
                                p.item-name { (decode_html_entities(&item.name)) }
                                div.dots {}
                                p.item-value { (decode_html_entities(&item.value)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn unavailable_markup(message: &str) -> Markup {
    html! {
        p.price-unavailable { (message) }
    }
}

#[derive(Default)]
struct PricingState {
    selections: BTreeMap<u32, Selection>,
    open_plan: Option<String>,
}

struct Inner {
    options: PricingOptions,
    document: Rc<dyn Document>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<PricingState>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct PricingModule {
    inner: Rc<Inner>,
}

impl PricingModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[MODAL, MODAL_TITLE, MODAL_ITEMS])?;
        Ok(Self {
            inner: Rc::new(Inner {
                options: config.modules.pricing.clone(),
                document: host.document.clone(),
                ctx: OnceCell::new(),
                state: RefCell::new(PricingState::default()),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn plans(&self) -> &[PlanConfig] {
        &self.inner.options.plans
    }

    pub fn selection(&self, plan: u32) -> Option<Selection> {
        self.inner.state.borrow().selections.get(&plan).copied()
    }

    /// Kind of the plan whose price list is showing.
    pub fn open_plan(&self) -> Option<String> {
        self.inner.state.borrow().open_plan.clone()
    }

    pub fn is_modal_open(&self) -> bool {
        self.inner.state.borrow().open_plan.is_some()
    }

    /// Record the option picked on card `plan` and show its amount.
    pub fn select_option(&self, plan: u32, amount: f64, deep_washing: bool) -> Result<(), ModuleError> {
        self.inner.select_option(plan, amount, deep_washing)
    }

    /// Open the price list of the plan named `kind` (`deepCleaning`, ...).
    pub fn show_full_price(&self, kind: &str) -> Result<(), ModuleError> {
        self.inner.show_full_price(kind)
    }

    pub fn close_modal(&self) {
        self.inner.close_modal();
    }

    /// Re-render every selected total and the open modal.
    pub fn refresh_prices(&self) {
        self.inner.refresh_prices();
    }
}

impl Inner {
    fn plan_by_index(&self, index: u32) -> Option<&PlanConfig> {
        self.options.plans.iter().find(|p| p.index == index)
    }

    fn plan_by_kind(&self, kind: &str) -> Option<&PlanConfig> {
        self.options.plans.iter().find(|p| p.kind == kind)
    }

    /// The language module's current table, or nothing when that module is
    /// disabled or failed.
    fn translations(&self) -> Translations {
        self.ctx
            .get()
            .and_then(|ctx| ctx.modules.get::<LanguageModule>(ModuleKind::Language))
            .map(|language| language.translations())
            .unwrap_or_default()
    }

    fn select_option(&self, plan: u32, amount: f64, deep_washing: bool) -> Result<(), ModuleError> {
        if self.plan_by_index(plan).is_none() {
            return Err(ModuleError::Failed(format!("no pricing plan {plan}")));
        }
        let selection = Selection { amount, deep_washing };
        self.state.borrow_mut().selections.insert(plan, selection);
        self.render_total(plan, selection);
        Ok(())
    }

    fn render_total(&self, plan: u32, selection: Selection) {
        let total = total_selector(plan);
        let currency = &self.options.currency;
        self.document
            .set_html(&total, &total_markup(currency, selection.amount).into_string());
        self.document
            .set_attribute(&total, "aria-label", &format_price(selection.amount, currency, 2));
        self.document
            .set_class(&level_selector(plan), HIDDEN, selection.deep_washing);
    }

    fn modal_title(&self, translations: &Translations, plan: &PlanConfig) -> String {
        if let Some(title) = translations.text(&format!("pricing.plans.{}.modalTitle", plan.kind)) {
            return title.to_string();
        }
        if plan.fallback_title.is_empty() {
            self.options.default_title.clone()
        } else {
            plan.fallback_title.clone()
        }
    }

    fn price_list(&self, translations: &Translations, plan: &PlanConfig) -> Markup {
        let path = format!("pricing.modal.prices.{}", plan.key);
        let categories = translations
            .get(&path)
            .cloned()
            .map(serde_json::from_value::<Vec<PriceCategory>>);
        match categories {
            Some(Ok(categories)) if !categories.is_empty() => price_list_markup(&categories),
            Some(Err(err)) => {
                warn!(plan = %plan.kind, error = %err, "malformed price list");
                unavailable_markup(&self.unavailable_text(translations))
            }
            _ => {
                debug!(plan = %plan.kind, "no price list for plan");
                unavailable_markup(&self.unavailable_text(translations))
            }
        }
    }

    fn unavailable_text(&self, translations: &Translations) -> String {
        translations.translate_or("pricing.modal.unavailable", &self.options.default_title)
    }

    fn render_modal(&self, plan: &PlanConfig) {
        let translations = self.translations();
        self.document
            .set_text(MODAL_TITLE, &self.modal_title(&translations, plan));
        self.document
            .set_html(MODAL_ITEMS, &self.price_list(&translations, plan).into_string());
    }

    fn show_full_price(&self, kind: &str) -> Result<(), ModuleError> {
        let Some(plan) = self.plan_by_kind(kind) else {
            return Err(ModuleError::Failed(format!("unknown pricing plan `{kind}`")));
        };
        if !self.options.show_modals {
            return Ok(());
        }
        self.render_modal(plan);
        self.document.set_class(MODAL, ACTIVE, true);
        self.document.set_class(BODY, MODAL_OPEN_CLASS, true);
        self.state.borrow_mut().open_plan = Some(plan.kind.clone());
        info!(plan = %plan.kind, "price list opened");

        publish(
            &self.ctx,
            events::PRICING_MODAL_OPENED,
            PricingModal {
                plan: plan.kind.clone(),
            },
        );
        publish(
            &self.ctx,
            events::MODAL_OPEN,
            ModalOpened {
                kind: MODAL_KIND.to_string(),
            },
        );
        publish(&self.ctx, events::NAVIGATION_CLOSE_ALL_MENUS, json!({}));
        Ok(())
    }

    fn close_modal(&self) {
        let Some(plan) = self.state.borrow_mut().open_plan.take() else {
            return;
        };
        self.document.set_class(MODAL, ACTIVE, false);
        self.document.set_class(BODY, MODAL_OPEN_CLASS, false);
        publish(&self.ctx, events::PRICING_MODAL_CLOSED, PricingModal { plan });
    }

    fn refresh_prices(&self) {
        let selections: Vec<(u32, Selection)> = self
            .state
            .borrow()
            .selections
            .iter()
            .map(|(plan, selection)| (*plan, *selection))
            .collect();
        for (plan, selection) in selections {
            self.render_total(plan, selection);
        }
        let open = self.state.borrow().open_plan.clone();
        if let Some(plan) = open.as_deref().and_then(|kind| self.plan_by_kind(kind)) {
            self.render_modal(plan);
        }
        publish(&self.ctx, events::PRICING_PRICES_REFRESHED, json!({}));
    }

    fn on_click(&self, click: &ClickInput) {
        if self.state.borrow().open_plan.is_some() {
            if click.within(CLOSE_BUTTON) || (click.within(MODAL) && !click.within(MODAL_CONTENT)) {
                self.close_modal();
            }
            return;
        }
        let picked = self
            .options
            .plans
            .iter()
            .find(|plan| click.within(&full_price_button(plan.index)))
            .map(|plan| plan.kind.clone());
        if let Some(kind) = picked {
            if let Err(err) = self.show_full_price(&kind) {
                warn!(error = %err, "could not open price list");
            }
        }
    }

    fn wire(self: &Rc<Self>, ctx: &ModuleContext) -> Result<(), ModuleError> {
        let bus = &ctx.bus;
        let mut bindings = self.bindings.borrow_mut();

        bindings.subscription(subscribe_weak(bus, events::DOM_CLICK, self, |inner, payload| {
            inner.on_click(&from_payload(payload)?);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_KEYDOWN, self, |inner, payload| {
            let key: KeyInput = from_payload(payload)?;
            if key.key == "Escape" {
                inner.close_modal();
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::MODAL_OPEN, self, |inner, payload| {
            let modal: ModalOpened = from_payload(payload)?;
            if modal.kind != MODAL_KIND {
                inner.close_modal();
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::LANGUAGE_CHANGED, self, |inner, _| {
            inner.refresh_prices();
            Ok(())
        })?);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for PricingModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Pricing
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        if let Some(language) = ctx.modules.get::<LanguageModule>(ModuleKind::Language) {
            if !language.ready().wait().await {
                warn!("language setup abandoned; price lists use fallback titles");
            }
        }
        self.inner.wire(&ctx)?;

        self.inner.initialized.set(true);
        info!(plans = self.inner.options.plans.len(), "pricing ready");
        ctx.bus.publish(events::PRICING_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        self.inner.close_modal();
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
