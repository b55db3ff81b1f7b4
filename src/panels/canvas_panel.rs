use crate::app::StoryPaintApp;

pub fn toolbar_panel(app: &mut StoryPaintApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("toolbar_panel").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if let Some(name) = app.session.display_name() {
                ui.label(format!("Hola, {name}"));
                ui.separator();
            }

            let generating = app.is_generating();
            if ui
                .add_enabled(!generating, egui::Button::new("Generar actividad"))
                .clicked()
            {
                let snapshot = app.engine.export_snapshot();
                log::info!("Generation requested for {}x{} canvas", snapshot.width(), snapshot.height());
                app.request_generation(ctx, snapshot);
            }
            if generating {
                ui.spinner();
            }

            if ui.button("Borrar").clicked() {
                app.engine.clear();
            }

            if let Some(status) = &app.status {
                ui.separator();
                ui.label(status.as_str());
            }
        });
    });
}

pub fn canvas_panel(app: &mut StoryPaintApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let size = ui.available_size();
            let (response, painter) = ui.allocate_painter(size, egui::Sense::drag());
            let canvas_rect = response.rect;

            app.engine
                .on_surface_resized(canvas_rect.width() as usize, canvas_rect.height() as usize);
            app.input.set_canvas_rect(canvas_rect);

            // No new ink while the result window covers the canvas
            app.engine.set_locked(app.preview.is_some());
            for event in app.input.process_input(ctx) {
                app.engine.handle(event);
            }

            app.renderer.render(ctx, &painter, canvas_rect, &app.engine);

            if app.engine.take_redraw_request() {
                ctx.request_repaint();
            }
        });
}
