mod app;
mod main_window;
mod panels;

use crate::capture;
use crate::config::AppConfig;

pub fn run_gui(config: AppConfig) -> anyhow::Result<()> {
    capture::warm_up(config.camera_index, config.capture);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_resizable(false)
            .with_maximize_button(false)
            .with_title("Login"),
        ..Default::default()
    };
    eframe::run_native(
        "face-login",
        options,
        Box::new(move |_cc| {
            let app = app::LoginApp::new(config)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}
