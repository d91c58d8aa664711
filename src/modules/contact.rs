//! Contact form: validation, phone formatting and submission.
//!
//! Every field carries a `valid` and a `touched` flag. Validity follows each
//! input; appearance and error messages only show once the field was left
//! (or a submit was attempted), so a half-typed form is not painted red.
//! Submission posts a JSON body through [`ContactTransport`] and reports the
//! outcome in one of two panels: success hides itself after a few seconds,
//! failure stays until dismissed.
//!
//! [`ContactTransport`]: crate::host::ContactTransport

use super::language::LanguageModule;
use super::publish;
use crate::config::{ContactOptions, SiteConfig};
use crate::event_loop::TimerId;
use crate::events;
use crate::host::{Clock, ContactTransport, Document, Host};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    subscribe_weak, timeout_weak,
};
use crate::types::{ClickInput, ContactFailed, from_payload};
use async_trait::async_trait;
use chrono::SecondsFormat;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const FORM: &str = ".section-contact form";
pub const SUBJECT: &str = r#"input[name="subject"]"#;
pub const PHONE: &str = r#"input[name="phone"]"#;
pub const MESSAGE: &str = r#"textarea[name="message"]"#;
pub const SUBMIT: &str = ".sendMsg";
pub const SUCCESS: &str = ".contact-success";
pub const FAILURE: &str = ".contact-error";
pub const RESET: &str = ".contact-reset-container";
pub const RESET_BUTTON: &str = ".reset-form-btn";
pub const CLOSE_FEEDBACK: &str = ".close-feedback";

const HIDDEN: &str = "hidden";
const VALID: &str = "valid";
const INVALID: &str = "invalid";
const LOADING: &str = "loading";

/// English text used when no translation is available.
const FALLBACK_TEXT: [(&str, &str); 16] = [
    ("contact.subjectPlaceholder", "Subject"),
    ("contact.phonePlaceholder", "Phone Number"),
    ("contact.messagePlaceholder", "Your Message"),
    ("contact.sendButton", "Send Message"),
    ("contact.enterData", "Please enter all data"),
    ("contact.resetForm", "Reset Form"),
    ("contact.successMessage", "Message sent successfully!"),
    ("contact.errorMessage", "Error sending message. Please try again."),
    ("contact.sending", "Sending..."),
    ("contact.subjectRequired", "Subject is required"),
    ("contact.phoneRequired", "Phone number is required"),
    ("contact.phoneInvalid", "Please enter a valid phone number"),
    ("contact.messageRequired", "Message is required"),
    ("contact.messageTooShort", "Message must be at least 10 characters"),
    ("contact.validationError", "Please fix validation errors"),
    ("contact.submissionError", "Error sending message"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Subject,
    Phone,
    Message,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Subject, Field::Phone, Field::Message];

    pub fn name(self) -> &'static str {
        match self {
            Field::Subject => "subject",
            Field::Phone => "phone",
            Field::Message => "message",
        }
    }

    pub fn selector(self) -> &'static str {
        match self {
            Field::Subject => SUBJECT,
            Field::Phone => PHONE,
            Field::Message => MESSAGE,
        }
    }

    fn placeholder_key(self) -> String {
        format!("contact.{}Placeholder", self.name())
    }
}

/// Error line shown under `field`.
pub fn error_selector(field: Field) -> String {
    format!(r#".field-error[data-field="{}"]"#, field.name())
}

/// Digits only, keeping a leading `+` when there is at least one digit.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if raw.starts_with('+') && !digits.is_empty() {
        format!("+{digits}")
    } else {
        digits
    }
}

/// Field rules, compiled once from [`ContactOptions`].
#[derive(Debug, Clone)]
pub struct Validator {
    phone_patterns: Vec<Regex>,
    min_phone_digits: usize,
    max_phone_digits: usize,
    min_message_len: usize,
}

impl Validator {
    pub fn new(options: &ContactOptions) -> Result<Self, regex::Error> {
        let phone_patterns = options
            .phone_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            phone_patterns,
            min_phone_digits: options.min_phone_digits,
            max_phone_digits: options.max_phone_digits,
            min_message_len: options.min_message_len,
        })
    }

    /// A phone number is valid if it matches any pattern, or if its digit
    /// count is within bounds whatever the separators.
    pub fn phone_is_valid(&self, value: &str) -> bool {
        let value = value.trim();
        if self.phone_patterns.iter().any(|p| p.is_match(value)) {
            return true;
        }
        let digits = value.chars().filter(char::is_ascii_digit).count();
        (self.min_phone_digits..=self.max_phone_digits).contains(&digits)
    }

    pub fn is_valid(&self, field: Field, value: &str) -> bool {
        let trimmed = value.trim();
        match field {
            Field::Subject => !trimmed.is_empty(),
            Field::Phone => self.phone_is_valid(trimmed),
            Field::Message => trimmed.chars().count() >= self.min_message_len,
        }
    }

    /// Translation key of the message for an invalid `value`, `None` when
    /// the value is fine.
    pub fn error_key(&self, field: Field, value: &str) -> Option<&'static str> {
        if self.is_valid(field, value) {
            return None;
        }
        let empty = value.trim().is_empty();
        Some(match (field, empty) {
            (Field::Subject, _) => "contact.subjectRequired",
            (Field::Phone, true) => "contact.phoneRequired",
            (Field::Phone, false) => "contact.phoneInvalid",
            (Field::Message, true) => "contact.messageRequired",
            (Field::Message, false) => "contact.messageTooShort",
        })
    }
}

/// Body posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub subject: String,
    pub phone: String,
    pub message: String,
    pub timestamp: String,
    pub location: String,
}

/// What a call to [`ContactModule::submit`] ended in.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Sent,
    /// At least one field failed validation; nothing was posted.
    Invalid,
    /// A submission is already in flight.
    Busy,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
struct FieldState {
    value: String,
    valid: bool,
    touched: bool,
}

#[derive(Default)]
struct FormState {
    fields: [FieldState; 3],
    submitting: bool,
    started_typing: bool,
    success_timer: Option<TimerId>,
}

impl FormState {
    fn field(&self, field: Field) -> &FieldState {
        &self.fields[field as usize]
    }

    fn field_mut(&mut self, field: Field) -> &mut FieldState {
        &mut self.fields[field as usize]
    }

    fn all_valid(&self) -> bool {
        self.fields.iter().all(|f| f.valid)
    }

    fn has_visible_errors(&self) -> bool {
        self.fields.iter().any(|f| f.touched && !f.valid)
    }
}

struct Inner {
    options: ContactOptions,
    validator: Validator,
    document: Rc<dyn Document>,
    transport: Rc<dyn ContactTransport>,
    clock: Rc<dyn Clock>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<FormState>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct ContactModule {
    inner: Rc<Inner>,
}

impl ContactModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[FORM, SUBJECT, PHONE, MESSAGE, SUBMIT])?;
        let options = config.modules.contact.clone();
        let validator =
            Validator::new(&options).map_err(|e| ModuleError::Config(format!("phone pattern: {e}")))?;
        Ok(Self {
            inner: Rc::new(Inner {
                options,
                validator,
                document: host.document.clone(),
                transport: host.transport.clone(),
                clock: host.clock.clone(),
                ctx: OnceCell::new(),
                state: RefCell::new(FormState::default()),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    /// The user typed into `field`. Phone input is reformatted first.
    pub fn input(&self, field: Field, value: &str) {
        self.inner.input(field, value);
    }

    /// The user left `field`.
    pub fn blur(&self, field: Field) {
        self.inner.touch(field);
        self.inner.refresh_reset_visibility();
    }

    pub fn value(&self, field: Field) -> String {
        self.inner.state.borrow().field(field).value.clone()
    }

    pub fn is_valid(&self, field: Field) -> bool {
        self.inner.state.borrow().field(field).valid
    }

    pub fn is_touched(&self, field: Field) -> bool {
        self.inner.state.borrow().field(field).touched
    }

    /// Key of the message currently shown under `field`.
    pub fn error_key(&self, field: Field) -> Option<&'static str> {
        self.inner.visible_error(field)
    }

    pub fn is_form_valid(&self) -> bool {
        self.inner.state.borrow().all_valid()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.state.borrow().submitting
    }

    pub async fn submit(&self) -> SubmitOutcome {
        self.inner.submit().await
    }

    /// Clear every field and hide all messages.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl Inner {
    fn translate(&self, key: &str) -> String {
        let from_language = self
            .ctx
            .get()
            .and_then(|ctx| ctx.modules.get::<LanguageModule>(ModuleKind::Language))
            .and_then(|language| language.translations().text(key).map(str::to_string));
        if let Some(text) = from_language {
            return text;
        }
        FALLBACK_TEXT
            .iter()
            .find(|(k, _)| *k == key)
            .map_or_else(|| key.to_string(), |(_, text)| text.to_string())
    }

    fn visible_error(&self, field: Field) -> Option<&'static str> {
        let state = self.state.borrow();
        let current = state.field(field);
        if !current.touched {
            return None;
        }
        self.validator.error_key(field, &current.value)
    }

    fn input(&self, field: Field, raw: &str) {
        let value = match field {
            Field::Phone => format_phone(raw),
            _ => raw.to_string(),
        };
        if field == Field::Phone && value != raw {
            self.document.set_attribute(PHONE, "value", &value);
        }
        let valid = self.validator.is_valid(field, &value);
        {
            let mut state = self.state.borrow_mut();
            state.started_typing = true;
            let current = state.field_mut(field);
            current.value = value;
            current.valid = valid;
        }
        self.render_field(field);
        self.render_submit();
        self.refresh_reset_visibility();
    }

    fn touch(&self, field: Field) {
        self.state.borrow_mut().field_mut(field).touched = true;
        self.render_field(field);
    }

    fn render_field(&self, field: Field) {
        let (valid, touched) = {
            let state = self.state.borrow();
            let current = state.field(field);
            (current.valid, current.touched)
        };
        let selector = field.selector();
        self.document.set_class(selector, VALID, touched && valid);
        self.document.set_class(selector, INVALID, touched && !valid);

        let error = error_selector(field);
        match self.visible_error(field) {
            Some(key) => {
                self.document.set_text(&error, &self.translate(key));
                self.document.set_class(&error, HIDDEN, false);
            }
            None => {
                self.document.set_text(&error, "");
                self.document.set_class(&error, HIDDEN, true);
            }
        }
    }

    fn render_submit(&self) {
        let (valid, submitting) = {
            let state = self.state.borrow();
            (state.all_valid(), state.submitting)
        };
        if submitting {
            self.document.set_attribute(SUBMIT, "disabled", "");
            self.document.set_text(SUBMIT, &self.translate("contact.sending"));
            self.document.set_class(SUBMIT, LOADING, true);
            return;
        }
        self.document.set_class(SUBMIT, LOADING, false);
        if valid {
            self.document.remove_attribute(SUBMIT, "disabled");
            self.document.set_text(SUBMIT, &self.translate("contact.sendButton"));
        } else {
            self.document.set_attribute(SUBMIT, "disabled", "");
            self.document.set_text(SUBMIT, &self.translate("contact.enterData"));
        }
    }

    fn set_reset_visible(&self, visible: bool) {
        self.document.set_class(RESET, HIDDEN, !visible);
    }

    fn refresh_reset_visibility(&self) {
        let visible = {
            let state = self.state.borrow();
            state.started_typing || state.has_visible_errors()
        };
        self.set_reset_visible(visible);
    }

    fn update_placeholders(&self) {
        for field in Field::ALL {
            let key = field.placeholder_key();
            let text = self.translate(&key);
            if text != key {
                self.document.set_attribute(field.selector(), "placeholder", &text);
            }
        }
    }

    fn refresh_texts(&self) {
        self.update_placeholders();
        for field in Field::ALL {
            self.render_field(field);
        }
        self.render_submit();
        self.document.set_attribute(RESET_BUTTON, "title", &self.translate("contact.resetForm"));
    }

    // ------------------------------------------------------------------------
    // Feedback panels
    // ------------------------------------------------------------------------

    fn cancel_success_timer(&self) {
        let timer = self.state.borrow_mut().success_timer.take();
        if let (Some(id), Some(ctx)) = (timer, self.ctx.get()) {
            ctx.scheduler.clear_timeout(id);
        }
    }

    fn hide_messages(&self) {
        self.cancel_success_timer();
        self.document.set_class(SUCCESS, HIDDEN, true);
        self.document.set_class(FAILURE, HIDDEN, true);
    }

    fn show_success(self: &Rc<Self>, key: &str) {
        self.hide_messages();
        self.document.set_text(SUCCESS, &self.translate(key));
        self.document.set_class(SUCCESS, HIDDEN, false);
        if !self.options.show_success_message {
            return;
        }
        if let Some(ctx) = self.ctx.get() {
            let id = timeout_weak(&ctx.scheduler, self.options.success_duration_ms, self, |inner| {
                inner.state.borrow_mut().success_timer = None;
                inner.hide_messages();
            });
            self.state.borrow_mut().success_timer = Some(id);
        }
    }

    /// Stays up until dismissed.
    fn show_error(&self, key: &str) {
        self.hide_messages();
        self.document.set_text(FAILURE, &self.translate(key));
        self.document.set_class(FAILURE, HIDDEN, false);
    }

    // ------------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------------

    fn submission(&self) -> Submission {
        let state = self.state.borrow();
        let value = |field: Field| state.field(field).value.trim().to_string();
        Submission {
            subject: value(Field::Subject),
            phone: value(Field::Phone),
            message: value(Field::Message),
            timestamp: self.clock.now_utc().to_rfc3339_opts(SecondsFormat::Millis, true),
            location: self.options.location.clone(),
        }
    }

    async fn submit(self: &Rc<Self>) -> SubmitOutcome {
        self.set_reset_visible(false);
        for field in Field::ALL {
            self.touch(field);
        }

        let (busy, valid) = {
            let state = self.state.borrow();
            (state.submitting, state.all_valid())
        };
        if busy {
            return SubmitOutcome::Busy;
        }
        if !valid {
            self.show_error("contact.validationError");
            return SubmitOutcome::Invalid;
        }

        self.state.borrow_mut().submitting = true;
        self.render_submit();
        publish(&self.ctx, events::CONTACT_SUBMITTING, json!({}));

        let submission = self.submission();
        let body = match serde_json::to_value(&submission) {
            Ok(body) => body,
            Err(err) => return self.finish_failed(err.to_string(), &submission),
        };
        debug!(endpoint = %self.options.endpoint, "posting contact form");
        match self.transport.post(&self.options.endpoint, &body).await {
            Ok(_) => {
                self.state.borrow_mut().submitting = false;
                info!("contact form sent");
                self.show_success("contact.successMessage");
                self.clear_fields();
                publish(&self.ctx, events::CONTACT_SUCCESS, json!({ "formData": body }));
                SubmitOutcome::Sent
            }
            Err(err) => self.finish_failed(err.to_string(), &submission),
        }
    }

    fn finish_failed(&self, error: String, submission: &Submission) -> SubmitOutcome {
        warn!(error = %error, subject = %submission.subject, "contact form failed");
        self.state.borrow_mut().submitting = false;
        self.render_submit();
        self.show_error("contact.submissionError");
        publish(
            &self.ctx,
            events::CONTACT_ERROR,
            ContactFailed {
                error: error.clone(),
            },
        );
        SubmitOutcome::Failed(error)
    }

    /// Empty the fields and their flags, leaving the feedback panels alone.
    fn clear_fields(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.fields = Default::default();
            state.started_typing = false;
        }
        for field in Field::ALL {
            self.document.set_attribute(field.selector(), "value", "");
            self.render_field(field);
        }
        self.set_reset_visible(false);
        self.render_submit();
    }

    fn reset(&self) {
        self.clear_fields();
        self.hide_messages();
    }

    fn on_click(self: &Rc<Self>, click: &ClickInput) {
        if click.within(CLOSE_FEEDBACK) || click.within(RESET_BUTTON) {
            self.reset();
        } else if click.within(SUBMIT) {
            if let Some(ctx) = self.ctx.get() {
                let inner = self.clone();
                ctx.scheduler.spawn(async move {
                    inner.submit().await;
                });
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
        bindings.subscription(subscribe_weak(bus, events::LANGUAGE_CHANGED, self, |inner, _| {
            inner.refresh_texts();
            Ok(())
        })?);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for ContactModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Contact
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        self.inner.wire(&ctx)?;
        match ctx.modules.get::<LanguageModule>(ModuleKind::Language) {
            Some(language) => {
                if !language.ready().wait().await {
                    warn!("language setup abandoned; contact form uses English text");
                }
            }
            None => debug!("contact form continuing without language module"),
        }

        self.inner.hide_messages();
        self.inner.set_reset_visible(false);
        self.inner.refresh_texts();

        self.inner.initialized.set(true);
        ctx.bus.publish(events::CONTACT_READY, json!({}));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        self.inner.cancel_success_timer();
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
        }
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
