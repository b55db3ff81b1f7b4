use crate::app::{Screen, StoryPaintApp};

pub fn login_panel(app: &mut StoryPaintApp, ctx: &egui::Context) {
    let mut submitted = false;

    egui::CentralPanel::default().show(ctx, |ui| {
        let Screen::Login { name_input, error } = &mut app.screen else {
            return;
        };

        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 4.0);
            ui.heading("StoryPaint");
            ui.label("¿Cómo te llamas?");

            let response = ui.text_edit_singleline(name_input);
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submitted = true;
            }
            if ui.button("Entrar").clicked() {
                submitted = true;
            }

            if let Some(message) = error {
                ui.colored_label(egui::Color32::RED, message.as_str());
            }
        });
    });

    if submitted {
        app.submit_name();
    }
}
