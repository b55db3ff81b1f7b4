use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};

use crate::config::AppConfig;
use crate::engine::DrawingEngine;
use crate::input::InputHandler;
use crate::panels;
use crate::pipeline::{GenerationOutcome, GenerationPipeline, GenerationTask};
use crate::raster::PixelBuffer;
use crate::renderer::Renderer;
use crate::session::SessionStore;
use crate::stories::{Story, StoryArchive};

/// Which top-level screen is showing
#[derive(Debug)]
pub enum Screen {
    /// First run: ask for a display name
    Login { name_input: String, error: Option<String> },
    Drawing,
}

/// Result window contents
pub struct Preview {
    pub activity_text: String,
    pub image: Option<Vec<u8>>,
    pub texture: Option<TextureHandle>,
    pub from_fallback: bool,
}

impl Preview {
    fn new(ctx: &egui::Context, outcome: GenerationOutcome) -> Option<Self> {
        let (activity_text, image, from_fallback) = match outcome {
            GenerationOutcome::Success { activity_text, image } => (activity_text, image, false),
            GenerationOutcome::Fallback { activity_text } => (activity_text, None, true),
            GenerationOutcome::Failure { .. } => return None,
        };
        let texture = image.as_deref().and_then(|bytes| decode_texture(ctx, bytes));
        Some(Self {
            activity_text,
            image,
            texture,
            from_fallback,
        })
    }
}

/// Decodes the generated image; a bad image is simply not shown
fn decode_texture(ctx: &egui::Context, bytes: &[u8]) -> Option<TextureHandle> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => {
            let rgba = decoded.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
            Some(ctx.load_texture("generated_image", image, TextureOptions::LINEAR))
        }
        Err(err) => {
            log::warn!("Generated image could not be decoded: {}", err);
            None
        }
    }
}

pub struct StoryPaintApp {
    pub(crate) session: SessionStore,
    pub(crate) archive: StoryArchive,
    pub(crate) pipeline: GenerationPipeline,
    pub(crate) engine: DrawingEngine,
    pub(crate) renderer: Renderer,
    pub(crate) input: InputHandler,
    pub(crate) screen: Screen,
    pub(crate) task: Option<GenerationTask>,
    /// Snapshot behind the current preview, reused for "another activity"
    pub(crate) last_snapshot: Option<PixelBuffer>,
    pub(crate) preview: Option<Preview>,
    pub(crate) status: Option<String>,
}

impl StoryPaintApp {
    /// Called once before the first frame.
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig, pipeline: GenerationPipeline) -> Self {
        let session = SessionStore::open(config.session_path());
        let screen = if session.is_first_run() {
            Screen::Login {
                name_input: String::new(),
                error: None,
            }
        } else {
            Screen::Drawing
        };

        Self {
            session,
            archive: StoryArchive::new(config.stories_dir(), config.images_dir()),
            pipeline,
            engine: DrawingEngine::new(config.canvas.stroke, config.canvas.background),
            renderer: Renderer::new(),
            input: InputHandler::new(egui::Rect::NOTHING),
            screen,
            task: None,
            last_snapshot: None,
            preview: None,
            status: None,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.task.as_ref().is_some_and(GenerationTask::is_pending)
    }

    pub(crate) fn submit_name(&mut self) {
        let Screen::Login { name_input, error } = &mut self.screen else {
            return;
        };
        match self.session.set_display_name(name_input) {
            Ok(_) => self.screen = Screen::Drawing,
            Err(crate::error::StorageError::BlankName) => *error = Some("Escribe tu nombre".to_owned()),
            Err(err) => {
                log::error!("Could not store display name: {}", err);
                *error = Some(format!("No se pudo guardar: {err}"));
            }
        }
    }

    /// Starts a generation for `snapshot` unless one is already running
    pub(crate) fn request_generation(&mut self, ctx: &egui::Context, snapshot: PixelBuffer) {
        if self.is_generating() {
            return;
        }
        let repaint = ctx.clone();
        self.task = Some(self.pipeline.spawn(snapshot.clone(), move || repaint.request_repaint()));
        self.last_snapshot = Some(snapshot);
        self.status = None;
    }

    /// Picks up a finished outcome on the UI thread
    fn poll_generation(&mut self, ctx: &egui::Context) {
        let Some(task) = &mut self.task else {
            return;
        };
        if let Some(outcome) = task.poll_outcome() {
            self.task = None;
            self.apply_outcome(ctx, outcome);
        }
    }

    fn apply_outcome(&mut self, ctx: &egui::Context, outcome: GenerationOutcome) {
        if let GenerationOutcome::Failure { message } = &outcome {
            self.status = Some(format!("Error: {message}"));
            return;
        }
        self.preview = Preview::new(ctx, outcome);
    }

    pub(crate) fn regenerate(&mut self, ctx: &egui::Context) {
        if let Some(snapshot) = self.last_snapshot.clone() {
            self.preview = None;
            self.request_generation(ctx, snapshot);
        }
    }

    pub(crate) fn save_preview(&mut self) {
        let Some(preview) = &self.preview else {
            return;
        };

        let mut pages = vec![preview.activity_text.clone()];
        if let Some(bytes) = &preview.image {
            match self.archive.save_image(bytes) {
                Ok(path) => log::debug!("Image stored at {}", path.display()),
                Err(err) => log::error!("Could not save generated image: {}", err),
            }
            use base64::Engine as _;
            pages.push(base64::engine::general_purpose::STANDARD.encode(bytes));
        }

        let title = match self.session.display_name() {
            Some(name) => format!("La historia de {name}"),
            None => "Mi historia".to_owned(),
        };
        self.status = Some(match self.archive.save(&Story::new(title, pages)) {
            Ok(handle) => format!("Guardado como {handle}"),
            Err(err) => {
                log::error!("Could not save story: {}", err);
                format!("Error: {err}")
            }
        });
    }
}

impl eframe::App for StoryPaintApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_generation(ctx);

        if matches!(self.screen, Screen::Login { .. }) {
            panels::login_panel(self, ctx);
            return;
        }

        panels::toolbar_panel(self, ctx);
        panels::canvas_panel(self, ctx);
        panels::preview_window(self, ctx);
    }
}
