use egui::{Color32, Pos2};

use crate::input::GestureEvent;
use crate::path::{SmoothedPath, StrokeStyle};
use crate::raster::{PixelBuffer, RasterSurface};
use crate::smoother::StrokeSmoother;

/// Touch-driven drawing state. Lives on the UI thread only.
#[derive(Debug)]
pub struct DrawingEngine {
    surface: RasterSurface,
    smoother: StrokeSmoother,
    style: StrokeStyle,
    redraw_requested: bool,
    // While locked, new gestures and moves are ignored; ends still commit
    locked: bool,
}

impl Default for DrawingEngine {
    fn default() -> Self {
        Self::new(StrokeStyle::default(), Color32::WHITE)
    }
}

impl DrawingEngine {
    pub fn new(style: StrokeStyle, background: Color32) -> Self {
        Self {
            surface: RasterSurface::new(background),
            smoother: StrokeSmoother::new(),
            style,
            redraw_requested: false,
            locked: false,
        }
    }

    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    /// In-progress path, drawn live on top of the committed buffer
    pub fn live_path(&self) -> Option<&SmoothedPath> {
        self.smoother.current_path()
    }

    pub fn is_drawing(&self) -> bool {
        self.smoother.is_active()
    }

    /// Stops new ink, e.g. while a window covers the canvas.
    /// A gesture already in progress is still committed by its end event.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Consumes the pending redraw request, if any
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Size-allocation event. Reallocates only when the size actually changes.
    pub fn on_surface_resized(&mut self, width: usize, height: usize) {
        if width == 0 || height == 0 || self.surface.size() == [width, height] {
            return;
        }
        log::debug!("Surface resized to {}x{}", width, height);
        self.surface.resize(width, height);
        self.request_redraw();
    }

    /// Single entry point for gesture events
    pub fn handle(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::Start(_) | GestureEvent::Move(_) if self.locked => {}
            GestureEvent::Start(p) => self.on_gesture_start(p),
            GestureEvent::Move(p) => self.on_gesture_move(p),
            GestureEvent::End(p) => self.on_gesture_end(p),
        }
    }

    pub fn on_gesture_start(&mut self, p: Pos2) {
        if self.smoother.is_active() {
            log::debug!("Gesture restarted, discarding in-progress path");
        }
        self.smoother.begin(p);
        self.request_redraw();
    }

    pub fn on_gesture_move(&mut self, p: Pos2) {
        self.smoother.extend(p);
        self.request_redraw();
    }

    /// Commits the gesture. The path closes at the last committed sample, not `_p`.
    pub fn on_gesture_end(&mut self, _p: Pos2) {
        if let Some(path) = self.smoother.finish() {
            log::trace!("Committing stroke with {} segments", path.len());
            self.surface.composite_stroke(&path, &self.style);
        }
        self.request_redraw();
    }

    pub fn clear(&mut self) {
        self.surface.clear();
        self.request_redraw();
    }

    /// Copy of the committed buffer. Before any size allocation a 1×1
    /// transparent placeholder is returned.
    pub fn export_snapshot(&self) -> PixelBuffer {
        if self.surface.is_allocated() {
            self.surface.snapshot()
        } else {
            log::warn!("Snapshot requested before the surface was sized, using placeholder");
            PixelBuffer::new(1, 1, Color32::TRANSPARENT)
        }
    }
}
