//! Event names published on the [`EventBus`](crate::bus::EventBus).
//!
//! Every notification follows the same `namespace:action` convention the site
//! scripts have always used (`app:ready`, `loader:hidden`,
//! `navigation:stickyEnabled`). The namespace names the producer; the action is
//! camelCase. Host input that enters through [`App::dispatch`](crate::app::App::dispatch)
//! is republished under the `dom` namespace.
//!
//! [`parse_event_name`] splits a name into its parts; the simulation summary
//! uses it to group notifications by producer.

// Orchestrator lifecycle.
pub const APP_INITIALIZING: &str = "app:initializing";
pub const APP_CORE_READY: &str = "app:coreReady";
pub const APP_MODULES_READY: &str = "app:modulesReady";
pub const APP_READY: &str = "app:ready";
pub const APP_ERROR: &str = "app:error";
pub const APP_START: &str = "app:start";
pub const APP_DESTROYED: &str = "app:destroyed";
pub const MODULE_LOADED: &str = "module:loaded";
pub const MODULE_ERROR: &str = "module:error";

// Scroll coordinator.
pub const SECTION_CHANGED: &str = "scroll:sectionChanged";

// Host input, republished by the orchestrator.
pub const DOM_CLICK: &str = "dom:click";
pub const DOM_KEYDOWN: &str = "dom:keydown";
pub const DOM_RESIZE: &str = "dom:resize";
pub const DOM_VISIBILITY: &str = "dom:visibilityChange";
pub const DOM_POPSTATE: &str = "dom:popstate";
pub const DOM_HASHCHANGE: &str = "dom:hashchange";
pub const DOM_HOVER: &str = "dom:hover";

// Loading indicator.
pub const LOADER_READY: &str = "loader:ready";
pub const LOADER_SHOW: &str = "loader:show";
pub const LOADER_HIDE: &str = "loader:hide";
pub const LOADER_FORCE_HIDE: &str = "loader:forceHide";
pub const LOADER_SHOWN: &str = "loader:shown";
pub const LOADER_HIDDEN: &str = "loader:hidden";
pub const LOADER_FORCE_HIDDEN: &str = "loader:forceHidden";

// Language.
pub const LANGUAGE_READY: &str = "language:ready";
pub const LANGUAGE_CHANGING: &str = "language:changing";
pub const LANGUAGE_CHANGED: &str = "language:changed";
pub const LANGUAGE_ERROR: &str = "language:error";
pub const LANGUAGE_DROPDOWN_OPENED: &str = "language:dropdownOpened";
pub const LANGUAGE_DROPDOWN_CLOSED: &str = "language:dropdownClosed";

// Navigation.
pub const NAVIGATION_READY: &str = "navigation:ready";
pub const NAVIGATION_SECTION_CHANGED: &str = "navigation:sectionChanged";
pub const NAVIGATION_STICKY_ENABLED: &str = "navigation:stickyEnabled";
pub const NAVIGATION_STICKY_DISABLED: &str = "navigation:stickyDisabled";
pub const NAVIGATION_MOBILE_OPENED: &str = "navigation:mobileOpened";
pub const NAVIGATION_MOBILE_CLOSED: &str = "navigation:mobileClosed";
pub const NAVIGATION_CLOSE_ALL_MENUS: &str = "navigation:closeAllMenus";

// Modal coordination between gallery and pricing.
pub const MODAL_OPEN: &str = "modal:open";

// Gallery.
pub const GALLERY_READY: &str = "gallery:initialized";
pub const GALLERY_OPENED: &str = "gallery:opened";
pub const GALLERY_CLOSED: &str = "gallery:closed";
pub const GALLERY_IMAGE_CHANGED: &str = "gallery:imageChanged";
pub const GALLERY_ZOOM_CHANGED: &str = "gallery:zoomChanged";
pub const GALLERY_ZOOM_RESET: &str = "gallery:zoomReset";
pub const GALLERY_AUTOPLAY_STARTED: &str = "gallery:autoplayStarted";
pub const GALLERY_AUTOPLAY_STOPPED: &str = "gallery:autoplayStopped";

// Call-to-action widget.
pub const CALLUS_READY: &str = "callus:ready";
pub const CALLUS_OPENED: &str = "callus:opened";
pub const CALLUS_CLOSED: &str = "callus:closed";
pub const CALLUS_OPTIONS_OPENED: &str = "callus:optionsOpened";
pub const CALLUS_OPTIONS_CLOSED: &str = "callus:optionsClosed";

// Partners marquee.
pub const PARTNERS_READY: &str = "partners:ready";
pub const PARTNERS_DESTROYED: &str = "partners:destroyed";

// Pricing.
pub const PRICING_READY: &str = "pricing:ready";
pub const PRICING_MODAL_OPENED: &str = "pricing:modalOpened";
pub const PRICING_MODAL_CLOSED: &str = "pricing:modalClosed";
pub const PRICING_PRICES_REFRESHED: &str = "pricing:pricesRefreshed";

// Contact form.
pub const CONTACT_READY: &str = "contact:ready";
pub const CONTACT_SUBMITTING: &str = "contact:submitting";
pub const CONTACT_SUCCESS: &str = "contact:success";
pub const CONTACT_ERROR: &str = "contact:error";

/// Result of parsing an event name like `navigation:stickyEnabled`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEventName<'a> {
    /// Producer namespace (`navigation`). Empty for names without a colon.
    pub namespace: &'a str,
    /// Action part after the first colon (`stickyEnabled`).
    pub action: &'a str,
}

/// Parse an event name following the `namespace:action` convention.
///
/// - `"app:ready"` → namespace=`app`, action=`ready`
/// - `"scroll:section:changed"` → namespace=`scroll`, action=`section:changed`
/// - `"ready"` → namespace=``, action=`ready`
pub fn parse_event_name(name: &str) -> ParsedEventName<'_> {
    match name.split_once(':') {
        Some((namespace, action)) => ParsedEventName { namespace, action },
        None => ParsedEventName {
            namespace: "",
            action: name,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_name() {
        let p = parse_event_name(NAVIGATION_STICKY_ENABLED);
        assert_eq!(p.namespace, "navigation");
        assert_eq!(p.action, "stickyEnabled");
    }

    #[test]
    fn only_first_colon_splits() {
        let p = parse_event_name("scroll:section:changed");
        assert_eq!(p.namespace, "scroll");
        assert_eq!(p.action, "section:changed");
    }

    #[test]
    fn bare_name_has_empty_namespace() {
        let p = parse_event_name("ready");
        assert_eq!(p.namespace, "");
        assert_eq!(p.action, "ready");
    }

    #[test]
    fn dom_events_share_namespace() {
        for name in [DOM_CLICK, DOM_KEYDOWN, DOM_RESIZE, DOM_POPSTATE, DOM_HASHCHANGE] {
            assert_eq!(parse_event_name(name).namespace, "dom");
        }
    }
}
