mod canvas_panel;
mod login_panel;
mod preview_window;

pub use canvas_panel::{canvas_panel, toolbar_panel};
pub use login_panel::login_panel;
pub use preview_window::preview_window;
