#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod client;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod input;
pub mod panels;
pub mod path;
pub mod pipeline;
pub mod raster;
pub mod renderer;
pub mod session;
pub mod smoother;
pub mod stories;
pub mod summary;
pub mod util;

pub use app::StoryPaintApp;
pub use client::{GenerationRequest, GenerationService, HttpGenerationService, OfflineService, ServiceReply};
pub use config::AppConfig;
pub use engine::DrawingEngine;
pub use input::{GestureEvent, InputHandler};
pub use path::{SmoothedPath, StrokeStyle};
pub use pipeline::{GenerationOutcome, GenerationPipeline, GenerationTask};
pub use raster::{PixelBuffer, RasterSurface};
pub use renderer::Renderer;
pub use smoother::StrokeSmoother;
pub use summary::ContentDescriptor;
