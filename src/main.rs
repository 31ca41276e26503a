mod app;
mod color;
mod config;
mod data;
mod error;
mod session;
mod state;
mod ui;
mod view;

use app::AttackLensApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::load();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "ATT&CK Lens",
        options,
        Box::new(|_cc| Ok(Box::new(AttackLensApp::new(config)))),
    )
}
