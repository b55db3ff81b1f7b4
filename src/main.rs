#![warn(clippy::all, rust_2018_idioms)]

use std::sync::Arc;

use story_paint::{AppConfig, GenerationPipeline, GenerationService, HttpGenerationService, OfflineService, StoryPaintApp};

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load().unwrap_or_else(|err| {
        log::error!("Falling back to default configuration: {}", err);
        AppConfig::default()
    });

    let service: Arc<dyn GenerationService> = match HttpGenerationService::new(&config.generation) {
        Ok(service) => {
            log::info!("Generation endpoint: {}", service.endpoint());
            Arc::new(service)
        }
        Err(err) => {
            log::error!("HTTP client unavailable, activities will be generated locally: {}", err);
            Arc::new(OfflineService)
        }
    };
    let pipeline = GenerationPipeline::new(service, config.generation.clone());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("StoryPaint")
            .with_inner_size([480.0, 800.0])
            .with_min_inner_size([320.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "StoryPaint",
        native_options,
        Box::new(|cc| Ok(Box::new(StoryPaintApp::new(cc, config, pipeline)))),
    )
}
