mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::StudyLensApp;
use eframe::egui;
use study_lens::EngineConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Ignoring engine config, using defaults: {e:#}");
            EngineConfig::default()
        }
    };

    // Optional file to open on start-up.
    let initial_file = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Study Lens – Student Performance",
        options,
        Box::new(move |_cc| {
            let mut app = StudyLensApp::new(config);
            if let Some(path) = initial_file {
                app.state.load_path(&path);
            }
            Ok(Box::new(app))
        }),
    )
}
