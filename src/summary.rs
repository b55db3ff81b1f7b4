//! Coarse content summary of a drawing and the texts derived from it.

use std::collections::HashMap;

use crate::raster::PixelBuffer;

/// Distance between sampled pixels along each axis
pub const SAMPLE_STRIDE: usize = 10;

/// Dominant colour reported for buffers with nothing to sample
pub const NEUTRAL_COLOR: u32 = 0x0000_0000;

const RED: u32 = 0xFFFF_0000;
const GREEN: u32 = 0xFF00_FF00;
const BLUE: u32 = 0xFF00_00FF;

/// Named colours the prompt knows how to describe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorName {
    Red,
    Green,
    Blue,
    Colorful,
}

impl ColorName {
    /// Exact match on the ARGB value; anything else is "colorful"
    pub fn from_argb(argb: u32) -> Self {
        match argb {
            RED => Self::Red,
            GREEN => Self::Green,
            BLUE => Self::Blue,
            _ => Self::Colorful,
        }
    }

    /// Word used in the prompt and fallback texts
    pub fn word(self) -> &'static str {
        match self {
            Self::Red => "rojo",
            Self::Green => "verde",
            Self::Blue => "azul",
            Self::Colorful => "colorido",
        }
    }
}

/// What the summarizer extracted from a drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// Most frequent sampled colour as `0xAARRGGBB`
    pub dominant_color: u32,
}

impl Default for ContentDescriptor {
    fn default() -> Self {
        Self {
            dominant_color: NEUTRAL_COLOR,
        }
    }
}

impl ContentDescriptor {
    pub fn color_name(&self) -> ColorName {
        ColorName::from_argb(self.dominant_color)
    }
}

/// Samples the buffer on a [`SAMPLE_STRIDE`] grid and returns the most frequent colour.
///
/// Ties go to the colour sampled first (column by column, top to bottom).
pub fn summarize(buffer: &PixelBuffer) -> ContentDescriptor {
    // (colour, count) in first-seen order
    let mut counts: Vec<(u32, usize)> = Vec::new();
    let mut slots: HashMap<u32, usize> = HashMap::new();
    for x in (0..buffer.width()).step_by(SAMPLE_STRIDE) {
        for y in (0..buffer.height()).step_by(SAMPLE_STRIDE) {
            if let Some(argb) = buffer.argb(x, y) {
                let slot = *slots.entry(argb).or_insert_with(|| {
                    counts.push((argb, 0));
                    counts.len() - 1
                });
                counts[slot].1 += 1;
            }
        }
    }

    let mut dominant: Option<(u32, usize)> = None;
    for &(color, count) in &counts {
        if dominant.is_none_or(|(_, best)| count > best) {
            dominant = Some((color, count));
        }
    }

    ContentDescriptor {
        dominant_color: dominant.map_or(NEUTRAL_COLOR, |(color, _)| color),
    }
}

/// Prompt text sent along with the drawing
pub fn build_prompt(descriptor: &ContentDescriptor) -> String {
    format!(
        "El niño dibujó algo {}. \
         Genera una actividad creativa, divertida y segura para un niño de 5-8 años. \
         Instrucciones claras y breves, que pueda realizar sin ayuda constante.",
        descriptor.color_name().word()
    )
}

/// Activity suggested locally when the service cannot be used
pub fn fallback_activity(descriptor: &ContentDescriptor) -> String {
    let mut text = String::from(
        "¡Crea una historia o juego usando tu dibujo! \
         Puedes inventar nombres, colores y aventuras según lo que dibujaste.",
    );
    match descriptor.color_name() {
        ColorName::Colorful => {}
        named => {
            text.push_str(&format!(
                " Empieza buscando a tu alrededor cosas de color {}.",
                named.word()
            ));
        }
    }
    text
}
