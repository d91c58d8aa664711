//! CLI output formatting for the simulation and inspection commands.
//!
//! # Output Format
//!
//! ## Timeline
//!
//! One line per bus event in publish order, stamped with the virtual time it
//! fired at. Payloads are printed compactly; empty objects are left out.
//!
//! ```text
//!      0ms  app:initializing
//!      0ms  loader:shown
//!      0ms  language:ready {"language":"sr"}
//!   2000ms  loader:hidden
//! ```
//!
//! ## Event summary
//!
//! Event counts grouped by producer namespace, in order of first appearance.
//!
//! ```text
//! Events by producer
//!     app         4
//!     loader      2
//! ```
//!
//! ## Module status
//!
//! ```text
//! Modules
//! 001 loader (critical)
//!     loaded, initialized
//! 005 callus
//!     disabled
//! ```
//!
//! ## Sections
//!
//! ```text
//!      0px  hero
//!    950px  about
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::app::ModuleStatus;
use crate::bus::EventBus;
use crate::events::parse_event_name;
use crate::event_loop::{Millis, Scheduler};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Compact JSON, or nothing for `{}` and `null`.
fn payload_suffix(payload: &Value) -> String {
    match payload {
        Value::Null => String::new(),
        Value::Object(map) if map.is_empty() => String::new(),
        other => format!(" {other}"),
    }
}

// ============================================================================
// Timeline
// ============================================================================

/// One published event and when it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub at: Millis,
    pub event: String,
    pub payload: Value,
}

/// Records every event published on a bus, stamped with virtual time.
#[derive(Clone)]
pub struct Timeline {
    entries: Rc<RefCell<Vec<TimelineEntry>>>,
}

impl Timeline {
    /// Start recording `bus`. Recording lasts as long as the bus.
    pub fn record(bus: &EventBus, scheduler: Scheduler) -> Self {
        let entries = Rc::new(RefCell::new(Vec::new()));
        let sink = entries.clone();
        bus.tap(move |event, payload| {
            sink.borrow_mut().push(TimelineEntry {
                at: scheduler.now(),
                event: event.to_string(),
                payload: payload.clone(),
            });
        });
        Self { entries }
    }

    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

pub fn format_timeline(entries: &[TimelineEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| format!("{:>7}ms  {}{}", e.at, e.event, payload_suffix(&e.payload)))
        .collect()
}

pub fn print_timeline(entries: &[TimelineEntry]) {
    for line in format_timeline(entries) {
        println!("{}", line);
    }
}

/// Count events per producer namespace. Names without a namespace are
/// grouped under `(none)`.
pub fn format_event_summary(entries: &[TimelineEntry]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in entries {
        let namespace = match parse_event_name(&entry.event).namespace {
            "" => "(none)",
            ns => ns,
        };
        match counts.iter_mut().find(|(n, _)| *n == namespace) {
            Some((_, count)) => *count += 1,
            None => counts.push((namespace, 1)),
        }
    }
    let mut lines = vec!["Events by producer".to_string()];
    lines.extend(
        counts
            .into_iter()
            .map(|(namespace, count)| format!("{}{:<12}{}", indent(1), namespace, count)),
    );
    lines
}

pub fn print_event_summary(entries: &[TimelineEntry]) {
    for line in format_event_summary(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Module status
// ============================================================================

pub fn format_module_status(rows: &[ModuleStatus]) -> Vec<String> {
    let mut lines = vec!["Modules".to_string()];
    for (i, row) in rows.iter().enumerate() {
        let header = if row.critical {
            format!("{} {} (critical)", format_index(i + 1), row.module)
        } else {
            format!("{} {}", format_index(i + 1), row.module)
        };
        lines.push(header);

        let detail = if !row.enabled {
            "disabled".to_string()
        } else {
            let mut flags = Vec::new();
            flags.push(if row.loaded { "loaded" } else { "not loaded" });
            if row.loaded {
                flags.push(if row.initialized {
                    "initialized"
                } else {
                    "not initialized"
                });
            }
            flags.join(", ")
        };
        lines.push(format!("{}{}", indent(1), detail));
    }
    lines
}

pub fn print_module_status(rows: &[ModuleStatus]) {
    for line in format_module_status(rows) {
        println!("{}", line);
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Scroll position and the section detected there.
pub fn format_sections(rows: &[(f64, Option<String>)]) -> Vec<String> {
    rows.iter()
        .map(|(top, section)| {
            format!(
                "{:>7}px  {}",
                top.round() as i64,
                section.as_deref().unwrap_or("(none)")
            )
        })
        .collect()
}

pub fn print_sections(rows: &[(f64, Option<String>)]) {
    for line in format_sections(rows) {
        println!("{}", line);
    }
}
