use crate::app::StoryPaintApp;

const MAX_IMAGE_WIDTH: f32 = 360.0;

pub fn preview_window(app: &mut StoryPaintApp, ctx: &egui::Context) {
    let Some(preview) = &app.preview else {
        return;
    };

    let mut again = false;
    let mut save = false;
    let mut close = false;

    egui::Window::new("Tu actividad")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            if let Some(texture) = &preview.texture {
                ui.add(egui::Image::new(texture).max_width(MAX_IMAGE_WIDTH));
            }
            egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                ui.label(preview.activity_text.as_str());
            });
            if preview.from_fallback {
                ui.small("Sin conexión: actividad sugerida sin el servidor");
            }

            ui.separator();
            ui.horizontal(|ui| {
                again = ui.button("Otra actividad").clicked();
                save = ui.button("Guardar").clicked();
                close = ui.button("Cerrar").clicked();
            });
        });

    if save {
        app.save_preview();
    }
    if again {
        app.regenerate(ctx);
    } else if close {
        app.preview = None;
    }
}
