//! Image gallery: a responsive thumbnail grid and a modal viewer.
//!
//! The grid shows as many thumbnails as fit the current breakpoint. When the
//! images don't all fit, the last cell becomes a rotating tile that cycles
//! through the remainder every `rotation.interval_ms`.
//!
//! The viewer supports next/prev with wraparound, zoom within
//! `[zoom.min, zoom.max]`, panning clamped to the scaled image, swipe by
//! pointer drag, wheel zoom, keyboard shortcuts and optional autoplay. Opening
//! it announces `modal:open` so other modals close; a `modal:open` from
//! anyone else closes it.

use super::publish;
use crate::config::{GalleryOptions, GridOptions, SiteConfig};
use crate::event_loop::{Millis, TimerId};
use crate::events;
use crate::host::{Document, Host, Viewport};
use crate::module::{
    Bindings, ModuleContext, ModuleError, ModuleKind, SiteModule, require_elements,
    subscribe_weak, timeout_weak,
};
use crate::types::{
    ClickInput, GalleryImage, GalleryZoom, KeyInput, ModalOpened, ResizeInput, from_payload,
};
use crate::util::{Debounce, Interval};
use async_trait::async_trait;
use maud::{Markup, html};
use serde_json::json;
use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;
use tracing::{debug, info};

pub const GRID: &str = "#gallery";
pub const MODAL: &str = "#imageModal";
pub const MODAL_IMAGE: &str = "#modalImage";
pub const ZOOM_LEVEL: &str = "#zoomLevel";
pub const COUNTER: &str = "#imageIndicators";
pub const ROTATING_ITEM: &str = ".rotating-item";
pub const ROTATING_IMAGE: &str = ".rotating-item img";
pub const CLOSE_BUTTON: &str = "#closeBtn";
pub const PREV_BUTTON: &str = "#prevBtn";
pub const NEXT_BUTTON: &str = "#nextBtn";
pub const ZOOM_IN_BUTTON: &str = "#zoomInBtn";
pub const ZOOM_OUT_BUTTON: &str = "#zoomOutBtn";
pub const ZOOM_RESET_BUTTON: &str = "#zoomResetBtn";
pub const AUTOPLAY_BUTTON: &str = "#autoplayBtn";

const BODY: &str = "body";
const ACTIVE: &str = "active";
const MODAL_OPEN_CLASS: &str = "modal-open";
const ZOOMED: &str = "zoomed";
const PLAYING: &str = "playing";

/// `type` carried by this module's `modal:open`.
pub const MODAL_KIND: &str = "gallery";

/// Natural size of the full-resolution images.
const IMAGE_WIDTH: f64 = 1200.0;
const IMAGE_HEIGHT: f64 = 800.0;

/// Length of the modal fade-out.
const CLOSE_DELAY_MS: Millis = 300;

pub fn item_selector(index: usize) -> String {
    format!(r##"{GRID} .gallery-item[data-index="{index}"]"##)
}

fn item_index(selector: &str) -> Option<usize> {
    selector
        .strip_prefix(GRID)?
        .strip_prefix(r##" .gallery-item[data-index=""##)?
        .strip_suffix(r##""]"##)?
        .parse()
        .ok()
}

// ============================================================================
// Grid
// ============================================================================

/// Grid shape for one viewport width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub rows: usize,
    pub gap: f64,
    /// Cells filled, the rotating tile included.
    pub visible: usize,
}

impl GridLayout {
    /// Pick the breakpoint's shape for `width`, then use as many columns as
    /// fit, but no more than `images` need.
    pub fn compute(options: &GridOptions, width: f64, images: usize) -> Self {
        let shape = if width >= options.desktop_from {
            options.desktop
        } else if width >= options.tablet_from {
            options.tablet
        } else {
            options.mobile
        };
        let fit = ((width / shape.min_width).floor() as usize).max(1);
        let needed = images.div_ceil(shape.rows).max(1);
        let columns = fit.min(needed);
        Self {
            columns,
            rows: shape.rows,
            gap: shape.gap,
            visible: (columns * shape.rows).min(images),
        }
    }

    /// Images shown as fixed thumbnails. When not everything fits, the last
    /// visible cell is given to the rotating tile.
    pub fn fixed(&self, images: usize) -> usize {
        if self.visible < images {
            self.visible.saturating_sub(1)
        } else {
            self.visible
        }
    }
}

fn grid_markup(options: &GalleryOptions, fixed: usize, rotating: Option<usize>) -> Markup {
    html! {
        @for (index, image) in options.images.iter().take(fixed).enumerate() {
            div.gallery-item data-index=(index) {
                img src=(image.thumbnail) alt=(image.alt) loading="lazy";
            }
        }
        @if let Some(image) = rotating.and_then(|i| options.images.get(i)) {
            div.gallery-item.rotating-item {
                img src=(image.thumbnail) alt=(image.alt);
            }
        }
    }
}

// ============================================================================
// Module
// ============================================================================

/// Snapshot of the modal viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub open: bool,
    pub index: usize,
    pub scale: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub autoplay: bool,
}

struct Pointer {
    start_x: f64,
    last_x: f64,
    last_y: f64,
}

struct GalleryState {
    layout: GridLayout,
    /// Image currently in the rotating tile.
    rotating: usize,
    open: bool,
    current: usize,
    scale: f64,
    pan: (f64, f64),
    pointer: Option<Pointer>,
    close_timer: Option<TimerId>,
}

struct Inner {
    options: GalleryOptions,
    debounce_ms: Millis,
    document: Rc<dyn Document>,
    viewport: Rc<dyn Viewport>,
    ctx: OnceCell<ModuleContext>,
    state: RefCell<GalleryState>,
    rotation: RefCell<Option<Interval>>,
    autoplay: RefCell<Option<Interval>>,
    resize: OnceCell<Debounce>,
    bindings: RefCell<Bindings>,
    initialized: Cell<bool>,
}

pub struct GalleryModule {
    inner: Rc<Inner>,
}

impl GalleryModule {
    pub fn new(config: &SiteConfig, host: &Host) -> Result<Self, ModuleError> {
        require_elements(host.document.as_ref(), &[GRID, MODAL, MODAL_IMAGE])?;
        let options = config.modules.gallery.clone();
        let layout = GridLayout::compute(
            &options.grid,
            host.viewport.viewport_width(),
            options.images.len(),
        );
        Ok(Self {
            inner: Rc::new(Inner {
                state: RefCell::new(GalleryState {
                    layout,
                    rotating: layout.fixed(options.images.len()),
                    open: false,
                    current: 0,
                    scale: 1.0,
                    pan: (0.0, 0.0),
                    pointer: None,
                    close_timer: None,
                }),
                options,
                debounce_ms: config.performance.debounce_delay_ms,
                document: host.document.clone(),
                viewport: host.viewport.clone(),
                ctx: OnceCell::new(),
                rotation: RefCell::new(None),
                autoplay: RefCell::new(None),
                resize: OnceCell::new(),
                bindings: RefCell::new(Bindings::default()),
                initialized: Cell::new(false),
            }),
        })
    }

    pub fn image_count(&self) -> usize {
        self.inner.options.images.len()
    }

    pub fn layout(&self) -> GridLayout {
        self.inner.state.borrow().layout
    }

    /// Index of the image currently in the rotating tile.
    pub fn rotating_index(&self) -> Option<usize> {
        let state = self.inner.state.borrow();
        (state.layout.fixed(self.image_count()) < self.image_count()).then_some(state.rotating)
    }

    pub fn state(&self) -> ViewerState {
        let state = self.inner.state.borrow();
        ViewerState {
            open: state.open,
            index: state.current,
            scale: state.scale,
            pan_x: state.pan.0,
            pan_y: state.pan.1,
            autoplay: self.inner.autoplay.borrow().is_some(),
        }
    }

    pub fn open(&self, index: usize) -> Result<(), ModuleError> {
        self.inner.open(index)
    }

    pub fn close(&self) {
        self.inner.close();
    }

    pub fn next(&self) {
        self.inner.step(true);
    }

    pub fn prev(&self) {
        self.inner.step(false);
    }

    pub fn zoom_in(&self) {
        self.inner.zoom_by(self.inner.options.zoom.step);
    }

    pub fn zoom_out(&self) {
        self.inner.zoom_by(-self.inner.options.zoom.step);
    }

    pub fn reset_zoom(&self) {
        self.inner.reset_zoom(true);
    }

    /// Move a zoomed image. Ignored at scale 1 or below.
    pub fn pan_by(&self, dx: f64, dy: f64) {
        self.inner.pan_by(dx, dy);
    }

    pub fn pointer_down(&self, x: f64, y: f64) {
        self.inner.pointer_down(x, y);
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        self.inner.pointer_move(x, y);
    }

    /// End a drag. Unzoomed, a horizontal travel past `drag_threshold` turns
    /// the page: rightwards to the previous image, leftwards to the next.
    pub fn pointer_up(&self, x: f64) {
        self.inner.pointer_up(x);
    }

    /// Wheel over the viewer: scrolling up zooms in.
    pub fn wheel(&self, delta_y: f64) {
        if delta_y < 0.0 {
            self.zoom_in();
        } else if delta_y > 0.0 {
            self.zoom_out();
        }
    }

    pub fn toggle_autoplay(&self) {
        self.inner.toggle_autoplay();
    }
}

impl Inner {
    fn count(&self) -> usize {
        self.options.images.len()
    }

    fn image_payload(&self, index: usize) -> GalleryImage {
        let image = &self.options.images[index];
        GalleryImage {
            index,
            src: image.src.clone(),
            alt: image.alt.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Grid and rotation
    // ------------------------------------------------------------------------

    fn render(&self, width: f64) {
        let count = self.count();
        let layout = GridLayout::compute(&self.options.grid, width, count);
        let fixed = layout.fixed(count);
        let rotating = (fixed < count).then_some(fixed);
        {
            let mut state = self.state.borrow_mut();
            state.layout = layout;
            state.rotating = fixed;
        }
        let markup = grid_markup(&self.options, fixed, rotating);
        self.document.set_html(GRID, &markup.into_string());
        self.document.set_attribute(
            GRID,
            "style",
            &format!(
                "grid-template-columns: repeat({}, 1fr); gap: {}px",
                layout.columns, layout.gap
            ),
        );
        if let Some(index) = rotating {
            self.show_rotating(index);
        }
        debug!(columns = layout.columns, visible = layout.visible, "gallery grid rendered");
    }

    fn show_rotating(&self, index: usize) {
        let image = &self.options.images[index];
        self.document.set_attribute(ROTATING_IMAGE, "src", &image.thumbnail);
        self.document.set_attribute(ROTATING_IMAGE, "alt", &image.alt);
    }

    fn rotate(&self) {
        let count = self.count();
        let next = {
            let mut state = self.state.borrow_mut();
            let fixed = state.layout.fixed(count);
            if fixed >= count {
                return;
            }
            let pool = count - fixed;
            state.rotating = fixed + (state.rotating.saturating_sub(fixed) + 1) % pool;
            state.rotating
        };
        self.show_rotating(next);
    }

    fn start_rotation(self: &Rc<Self>) {
        if !self.options.rotation.enabled || self.state.borrow().open {
            return;
        }
        let count = self.count();
        if self.state.borrow().layout.fixed(count) + 1 >= count {
            return;
        }
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let weak = Rc::downgrade(self);
        let interval = Interval::start(&ctx.scheduler, self.options.rotation.interval_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.rotate();
            }
        });
        *self.rotation.borrow_mut() = Some(interval);
    }

    fn stop_rotation(&self) {
        let interval = self.rotation.borrow_mut().take();
        if let Some(interval) = interval {
            interval.cancel();
        }
    }

    // ------------------------------------------------------------------------
    // Viewer
    // ------------------------------------------------------------------------

    fn show_image(&self, index: usize) {
        let image = &self.options.images[index];
        self.document.set_attribute(MODAL_IMAGE, "src", &image.src);
        self.document.set_attribute(MODAL_IMAGE, "alt", &image.alt);
        self.document
            .set_text(COUNTER, &format!("{} / {}", index + 1, self.count()));
    }

    fn apply_transform(&self) {
        let (scale, (x, y)) = {
            let state = self.state.borrow();
            (state.scale, state.pan)
        };
        self.document.set_attribute(
            MODAL_IMAGE,
            "style",
            &format!("transform: translate({x}px, {y}px) scale({scale})"),
        );
        self.document.set_class(MODAL_IMAGE, ZOOMED, scale > 1.0);
        self.document
            .set_text(ZOOM_LEVEL, &format!("{}%", (scale * 100.0).round()));
    }

    fn open(self: &Rc<Self>, index: usize) -> Result<(), ModuleError> {
        if index >= self.count() {
            return Err(ModuleError::Failed(format!("gallery has no image {index}")));
        }
        publish(
            &self.ctx,
            events::MODAL_OPEN,
            ModalOpened {
                kind: MODAL_KIND.to_string(),
            },
        );
        self.stop_rotation();
        let pending = {
            let mut state = self.state.borrow_mut();
            state.open = true;
            state.current = index;
            state.scale = 1.0;
            state.pan = (0.0, 0.0);
            state.pointer = None;
            state.close_timer.take()
        };
        if let (Some(id), Some(ctx)) = (pending, self.ctx.get()) {
            ctx.scheduler.clear_timeout(id);
        }
        self.document.set_class(MODAL, ACTIVE, true);
        self.document.set_class(BODY, MODAL_OPEN_CLASS, true);
        self.show_image(index);
        self.apply_transform();

        info!(index, "gallery opened");
        publish(&self.ctx, events::GALLERY_OPENED, self.image_payload(index));
        if self.options.autoplay.enabled {
            self.start_autoplay();
        }
        Ok(())
    }

    fn close(self: &Rc<Self>) {
        if !self.state.borrow().open {
            return;
        }
        self.stop_autoplay();
        {
            let mut state = self.state.borrow_mut();
            state.open = false;
            state.scale = 1.0;
            state.pan = (0.0, 0.0);
            state.pointer = None;
        }
        self.document.set_class(MODAL, ACTIVE, false);
        self.document.set_class(BODY, MODAL_OPEN_CLASS, false);
        self.apply_transform();
        debug!("gallery closing");

        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let id = timeout_weak(&ctx.scheduler, CLOSE_DELAY_MS, self, |inner| {
            inner.state.borrow_mut().close_timer = None;
            publish(&inner.ctx, events::GALLERY_CLOSED, json!({}));
            inner.start_rotation();
        });
        self.state.borrow_mut().close_timer = Some(id);
    }

    fn step(&self, forward: bool) {
        let count = self.count();
        let index = {
            let mut state = self.state.borrow_mut();
            if !state.open || count == 0 {
                return;
            }
            state.current = if forward {
                (state.current + 1) % count
            } else {
                (state.current + count - 1) % count
            };
            state.current
        };
        self.reset_zoom(false);
        self.show_image(index);
        publish(&self.ctx, events::GALLERY_IMAGE_CHANGED, self.image_payload(index));
    }

    // ------------------------------------------------------------------------
    // Zoom and pan
    // ------------------------------------------------------------------------

    /// How far the image may move from centre at `scale` before its edge
    /// enters the viewport.
    fn pan_limits(&self, scale: f64) -> (f64, f64) {
        let width = self.viewport.viewport_width();
        let height = self.viewport.viewport_height();
        let fit = (width / IMAGE_WIDTH).min(height / IMAGE_HEIGHT).min(1.0);
        (
            ((IMAGE_WIDTH * fit * scale - width) / 2.0).max(0.0),
            ((IMAGE_HEIGHT * fit * scale - height) / 2.0).max(0.0),
        )
    }

    fn clamp_pan(&self, (x, y): (f64, f64), scale: f64) -> (f64, f64) {
        let (max_x, max_y) = self.pan_limits(scale);
        (x.clamp(-max_x, max_x), y.clamp(-max_y, max_y))
    }

    fn set_scale(&self, scale: f64) {
        let zoom = &self.options.zoom;
        let scale = scale.clamp(zoom.min, zoom.max);
        {
            let mut state = self.state.borrow_mut();
            if !state.open || (state.scale - scale).abs() < f64::EPSILON {
                return;
            }
            state.scale = scale;
            state.pan = if scale <= 1.0 {
                (0.0, 0.0)
            } else {
                self.clamp_pan(state.pan, scale)
            };
        }
        self.apply_transform();
        debug!(scale, "gallery zoom");
        publish(&self.ctx, events::GALLERY_ZOOM_CHANGED, GalleryZoom { scale });
    }

    fn zoom_by(&self, delta: f64) {
        let scale = self.state.borrow().scale;
        self.set_scale(scale + delta);
    }

    fn reset_zoom(&self, announce: bool) {
        {
            let mut state = self.state.borrow_mut();
            state.scale = 1.0;
            state.pan = (0.0, 0.0);
        }
        self.apply_transform();
        if announce {
            publish(&self.ctx, events::GALLERY_ZOOM_RESET, json!({}));
        }
    }

    fn pan_by(&self, dx: f64, dy: f64) {
        {
            let mut state = self.state.borrow_mut();
            if !state.open || state.scale <= 1.0 {
                return;
            }
            let (x, y) = state.pan;
            state.pan = self.clamp_pan((x + dx, y + dy), state.scale);
        }
        self.apply_transform();
    }

    fn pointer_down(&self, x: f64, y: f64) {
        let mut state = self.state.borrow_mut();
        if state.open {
            state.pointer = Some(Pointer {
                start_x: x,
                last_x: x,
                last_y: y,
            });
        }
    }

    fn pointer_move(&self, x: f64, y: f64) {
        let delta = {
            let mut state = self.state.borrow_mut();
            let Some(pointer) = state.pointer.as_mut() else {
                return;
            };
            let delta = (x - pointer.last_x, y - pointer.last_y);
            pointer.last_x = x;
            pointer.last_y = y;
            delta
        };
        self.pan_by(delta.0, delta.1);
    }

    fn pointer_up(&self, x: f64) {
        let (pointer, scale) = {
            let mut state = self.state.borrow_mut();
            (state.pointer.take(), state.scale)
        };
        let Some(pointer) = pointer else {
            return;
        };
        if scale > 1.0 {
            return;
        }
        let travel = x - pointer.start_x;
        if travel.abs() <= self.options.drag_threshold {
            return;
        }
        self.step(travel < 0.0);
    }

    // ------------------------------------------------------------------------
    // Autoplay
    // ------------------------------------------------------------------------

    fn start_autoplay(self: &Rc<Self>) {
        if !self.state.borrow().open || self.autoplay.borrow().is_some() {
            return;
        }
        let Some(ctx) = self.ctx.get() else {
            return;
        };
        let weak = Rc::downgrade(self);
        let interval = Interval::start(&ctx.scheduler, self.options.autoplay.interval_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.step(true);
            }
        });
        *self.autoplay.borrow_mut() = Some(interval);
        self.document.set_class(AUTOPLAY_BUTTON, PLAYING, true);
        publish(&self.ctx, events::GALLERY_AUTOPLAY_STARTED, json!({}));
    }

    fn stop_autoplay(&self) {
        let interval = self.autoplay.borrow_mut().take();
        let Some(interval) = interval else {
            return;
        };
        interval.cancel();
        self.document.set_class(AUTOPLAY_BUTTON, PLAYING, false);
        publish(&self.ctx, events::GALLERY_AUTOPLAY_STOPPED, json!({}));
    }

    fn toggle_autoplay(self: &Rc<Self>) {
        if self.autoplay.borrow().is_some() {
            self.stop_autoplay();
        } else {
            self.start_autoplay();
        }
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    fn on_click(self: &Rc<Self>, click: &ClickInput) {
        if self.state.borrow().open {
            let step = self.options.zoom.step;
            if click.within(CLOSE_BUTTON) {
                self.close();
            } else if click.within(PREV_BUTTON) {
                self.step(false);
            } else if click.within(NEXT_BUTTON) {
                self.step(true);
            } else if click.within(ZOOM_IN_BUTTON) {
                self.zoom_by(step);
            } else if click.within(ZOOM_OUT_BUTTON) {
                self.zoom_by(-step);
            } else if click.within(ZOOM_RESET_BUTTON) {
                self.reset_zoom(true);
            } else if click.within(AUTOPLAY_BUTTON) {
                self.toggle_autoplay();
            } else if click.within(MODAL) && !click.within(MODAL_IMAGE) {
                self.close();
            }
            return;
        }

        let target = if click.within(ROTATING_ITEM) {
            Some(self.state.borrow().rotating)
        } else {
            click.path.iter().find_map(|s| item_index(s))
        };
        if let Some(index) = target {
            if let Err(err) = self.open(index) {
                debug!(index, error = %err, "gallery click ignored");
            }
        }
    }

    fn on_key(self: &Rc<Self>, key: &str) {
        if !self.state.borrow().open {
            return;
        }
        let step = self.options.zoom.step;
        match key {
            "Escape" => self.close(),
            "ArrowLeft" => self.step(false),
            "ArrowRight" => self.step(true),
            " " => self.toggle_autoplay(),
            "+" | "=" => self.zoom_by(step),
            "-" => self.zoom_by(-step),
            "0" => self.reset_zoom(true),
            _ => {}
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
            inner.on_key(&key.key);
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::DOM_RESIZE, self, |inner, payload| {
            let resize: ResizeInput = from_payload(payload)?;
            if let Some(debounce) = inner.resize.get() {
                let weak = Rc::downgrade(inner);
                debounce.call(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.stop_rotation();
                        inner.render(resize.width);
                        inner.start_rotation();
                    }
                });
            }
            Ok(())
        })?);
        bindings.subscription(subscribe_weak(bus, events::MODAL_OPEN, self, |inner, payload| {
            let modal: ModalOpened = from_payload(payload)?;
            if modal.kind != MODAL_KIND {
                inner.close();
            }
            Ok(())
        })?);
        Ok(())
    }
}

#[async_trait(?Send)]
impl SiteModule for GalleryModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Gallery
    }

    async fn initialize(&self, ctx: ModuleContext) -> Result<(), ModuleError> {
        if self.inner.initialized.get() {
            return Ok(());
        }
        let ctx = self.inner.ctx.get_or_init(|| ctx).clone();
        let _ = self
            .inner
            .resize
            .set(Debounce::new(ctx.scheduler.clone(), self.inner.debounce_ms));
        self.inner.wire(&ctx)?;
        self.inner.render(self.inner.viewport.viewport_width());
        self.inner.start_rotation();

        self.inner.initialized.set(true);
        info!(images = self.image_count(), "gallery ready");
        ctx.bus
            .publish(events::GALLERY_READY, json!({ "images": self.image_count() }));
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    fn destroy(&self) {
        if let Some(ctx) = self.inner.ctx.get() {
            self.inner.bindings.borrow_mut().release(&ctx.scroll, &ctx.scheduler);
            let pending = self.inner.state.borrow_mut().close_timer.take();
            if let Some(id) = pending {
                ctx.scheduler.clear_timeout(id);
            }
        }
        if let Some(debounce) = self.inner.resize.get() {
            debounce.cancel();
        }
        self.inner.stop_autoplay();
        self.inner.stop_rotation();
        {
            let mut state = self.inner.state.borrow_mut();
            state.open = false;
            state.pointer = None;
        }
        self.inner.initialized.set(false);
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
