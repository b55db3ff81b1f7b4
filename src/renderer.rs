use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke, TextureHandle, TextureOptions, Vec2};

use crate::engine::DrawingEngine;
use crate::path::{SmoothedPath, StrokeStyle};
use crate::raster::RasterSurface;

/// Draws the canvas: committed ink as a texture, then the live path on top
#[derive(Default)]
pub struct Renderer {
    texture: Option<TextureHandle>,
    // Surface revision the texture was built from
    uploaded_revision: Option<u64>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("has_texture", &self.texture.is_some())
            .field("uploaded_revision", &self.uploaded_revision)
            .finish()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the current frame
    ///
    /// Args:
    ///     ctx (egui::Context): The egui context for the current frame
    ///     painter (egui::Painter): The painter to draw with
    ///     rect (egui::Rect): Canvas rectangle; surface (0, 0) maps to `rect.min`
    ///     engine (DrawingEngine): Source of the committed buffer and live path
    pub fn render(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: Rect, engine: &DrawingEngine) {
        let surface = engine.surface();
        painter.rect_filled(rect, 0.0, surface.background());

        self.sync_texture(ctx, surface);
        if let Some(texture) = &self.texture {
            let [width, height] = surface.size();
            let image_rect = Rect::from_min_size(rect.min, Vec2::new(width as f32, height as f32));
            painter.image(
                texture.id(),
                image_rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if let Some(path) = engine.live_path() {
            painter.extend(live_path_shapes(path, engine.style(), rect.min.to_vec2()));
        }
    }

    /// Re-uploads the committed buffer when the surface changed since the last upload
    fn sync_texture(&mut self, ctx: &egui::Context, surface: &RasterSurface) {
        if !surface.is_allocated() || self.uploaded_revision == Some(surface.revision()) {
            return;
        }

        let image = surface.buffer().to_color_image();
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("committed_ink", image, TextureOptions::NEAREST));
            }
        }
        self.uploaded_revision = Some(surface.revision());
    }
}

/// Shapes for an in-progress path, offset into screen space.
///
/// Each sub-path becomes a polyline with round dots at both ends.
pub fn live_path_shapes(path: &SmoothedPath, style: &StrokeStyle, offset: Vec2) -> Vec<Shape> {
    let radius = style.width / 2.0;
    let mut shapes = Vec::new();

    for polyline in path.flatten() {
        let points: Vec<Pos2> = polyline.into_iter().map(|p| p + offset).collect();
        let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) else {
            continue;
        };

        shapes.push(Shape::circle_filled(first, radius, style.color));
        if points.len() > 1 {
            shapes.push(Shape::line(points, Stroke::new(style.width, style.color)));
            shapes.push(Shape::circle_filled(last, radius, style.color));
        }
    }

    shapes
}
