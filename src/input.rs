use egui::{Context, Pos2, Rect};

/// Gesture events in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Pointer went down inside the canvas
    Start(Pos2),
    /// Pointer moved while down
    Move(Pos2),
    /// Pointer was released
    End(Pos2),
}

/// Pointer state for one frame, as read from egui
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerSample {
    /// Latest known position in screen coordinates
    pub pos: Option<Pos2>,
    pub pressed: bool,
    pub down: bool,
    pub released: bool,
}

/// Converts raw egui pointer/touch input into gesture events for the canvas
pub struct InputHandler {
    canvas_rect: Rect,
    gesture_active: bool,
    last_pos: Option<Pos2>,
}

impl InputHandler {
    pub fn new(canvas_rect: Rect) -> Self {
        Self {
            canvas_rect,
            gesture_active: false,
            last_pos: None,
        }
    }

    /// Update the canvas rectangle (e.g. if window is resized)
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    pub fn canvas_rect(&self) -> Rect {
        self.canvas_rect
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture_active
    }

    fn to_surface(&self, pos: Pos2) -> Pos2 {
        (pos - self.canvas_rect.min).to_pos2()
    }

    /// Read egui input for this frame and produce gesture events
    pub fn process_input(&mut self, ctx: &Context) -> Vec<GestureEvent> {
        let sample = ctx.input(|input| PointerSample {
            pos: input.pointer.latest_pos(),
            pressed: input.pointer.primary_pressed(),
            down: input.pointer.primary_down(),
            released: input.pointer.primary_released(),
        });
        self.translate(sample)
    }

    /// Turn one frame's pointer state into gesture events.
    ///
    /// Gestures only start inside the canvas; once started they follow the
    /// pointer anywhere until release.
    pub fn translate(&mut self, sample: PointerSample) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        if sample.pressed {
            if let Some(pos) = sample.pos.filter(|pos| self.canvas_rect.contains(*pos)) {
                events.push(GestureEvent::Start(self.to_surface(pos)));
                self.gesture_active = true;
                self.last_pos = Some(pos);
            }
        } else if self.gesture_active && sample.down {
            if let Some(pos) = sample.pos {
                if Some(pos) != self.last_pos {
                    events.push(GestureEvent::Move(self.to_surface(pos)));
                    self.last_pos = Some(pos);
                }
            }
        }

        if self.gesture_active && (sample.released || !sample.down) && !sample.pressed {
            let pos = sample.pos.or(self.last_pos).unwrap_or(self.canvas_rect.min);
            events.push(GestureEvent::End(self.to_surface(pos)));
            self.gesture_active = false;
            self.last_pos = None;
        }

        events
    }
}
