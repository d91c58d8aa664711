//! Feature modules, one per page concern.
//!
//! Each exposes its DOM contract as selector constants, a constructor that
//! checks the elements it cannot work without, and a [`SiteModule`] impl.
//! They share no state; everything crosses the event bus, except the few
//! lookups listed in [`ModuleKind::permitted_lookups`].
//!
//! [`SiteModule`]: crate::module::SiteModule
//! [`ModuleKind::permitted_lookups`]: crate::module::ModuleKind::permitted_lookups

pub mod callus;
pub mod contact;
pub mod gallery;
pub mod language;
pub mod loader;
pub mod navigation;
pub mod partners;
pub mod pricing;

use crate::module::ModuleContext;
use serde::Serialize;
use std::cell::OnceCell;

/// Publish through the module's bus once it has been initialized. Before
/// that there is nobody to tell.
pub(crate) fn publish<T: Serialize>(ctx: &OnceCell<ModuleContext>, event: &str, payload: T) {
    if let Some(ctx) = ctx.get() {
        ctx.bus.publish(event, payload);
    }
}
