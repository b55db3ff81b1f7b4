use egui::{Color32, ColorImage, Pos2};
use image::RgbaImage;

use crate::path::{distance_to_line_segment, SmoothedPath, StrokeStyle};

/// Packs a colour as `0xAARRGGBB`
pub fn to_argb(color: Color32) -> u32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    u32::from_be_bytes([a, r, g, b])
}

/// Unpacks a `0xAARRGGBB` value
pub fn from_argb(argb: u32) -> Color32 {
    let [a, r, g, b] = argb.to_be_bytes();
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Fixed-size grid of pixels, row-major
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color32>,
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl PixelBuffer {
    /// Creates a buffer filled with `fill`
    pub fn new(width: usize, height: usize, fill: Color32) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Color32] {
        &self.pixels
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Pixel as `0xAARRGGBB`
    pub fn argb(&self, x: usize, y: usize) -> Option<u32> {
        self.get(x, y).map(to_argb)
    }

    fn set(&mut self, x: usize, y: usize, color: Color32) {
        let index = y * self.width + x;
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn fill(&mut self, color: Color32) {
        self.pixels.fill(color);
    }

    /// True when every pixel equals `color`
    pub fn is_filled_with(&self, color: Color32) -> bool {
        self.pixels.iter().all(|pixel| *pixel == color)
    }

    fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|pixel| pixel.to_srgba_unmultiplied())
            .collect()
    }

    /// Converts to an egui image for texture upload
    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied([self.width, self.height], &self.to_rgba_bytes())
    }

    /// Converts to an `image` crate buffer. `None` when the buffer has no pixels.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if self.is_empty() {
            return None;
        }
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.to_rgba_bytes())
    }
}

/// Owns the committed ink of the drawing
#[derive(Debug)]
pub struct RasterSurface {
    buffer: PixelBuffer,
    background: Color32,
    revision: u64,
}

impl RasterSurface {
    /// Creates an unallocated (0×0) surface
    pub fn new(background: Color32) -> Self {
        Self {
            buffer: PixelBuffer::new(0, 0, background),
            background,
            revision: 0,
        }
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    /// True once a size has been allocated
    pub fn is_allocated(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn size(&self) -> [usize; 2] {
        [self.buffer.width, self.buffer.height]
    }

    /// Bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Reallocates the buffer and fills it with the background colour.
    /// Previous content is discarded. A zero dimension is ignored.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring surface resize to {}x{}", width, height);
            return;
        }
        self.buffer = PixelBuffer::new(width, height, self.background);
        self.revision += 1;
    }

    /// Fills the buffer with the background colour, keeping its dimensions
    pub fn clear(&mut self) {
        self.buffer.fill(self.background);
        self.revision += 1;
    }

    /// Paints `path` permanently into the buffer
    pub fn composite_stroke(&mut self, path: &SmoothedPath, style: &StrokeStyle) {
        if !self.is_allocated() || path.is_empty() {
            return;
        }

        let radius = (style.width / 2.0).max(0.5);
        for polyline in path.flatten() {
            match polyline.as_slice() {
                [] => {}
                [only] => self.stamp_segment(*only, *only, radius, style.color),
                points => {
                    for pair in points.windows(2) {
                        self.stamp_segment(pair[0], pair[1], radius, style.color);
                    }
                }
            }
        }
        self.revision += 1;
    }

    /// Sets every pixel whose centre lies within `radius` of the segment.
    /// Covering by distance gives round caps and joins.
    fn stamp_segment(&mut self, from: Pos2, to: Pos2, radius: f32, color: Color32) {
        let width = self.buffer.width as f32;
        let height = self.buffer.height as f32;

        let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
        let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
        let max_x = (from.x.max(to.x) + radius).ceil().min(width);
        let max_y = (from.y.max(to.y) + radius).ceil().min(height);
        if !(min_x < max_x && min_y < max_y) {
            return;
        }

        for y in min_y as usize..max_y as usize {
            for x in min_x as usize..max_x as usize {
                let centre = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_line_segment(centre, from, to) <= radius {
                    self.buffer.set(x, y, color);
                }
            }
        }
    }

    /// Owned copy of the current buffer
    pub fn snapshot(&self) -> PixelBuffer {
        self.buffer.clone()
    }
}
