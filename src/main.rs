//! Main application for the YouTube Downloader GUI

mod app;
mod downloader;
mod engine;
mod error;
mod fetch;
mod library;
mod model;
mod progress;
mod selection;
mod sink;
mod thumbnail;

use std::sync::Arc;

use eframe::egui::Visuals;
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;

use app::DownloaderApp;

// Global Tokio runtime; all probes, downloads, and thumbnail fetches
// run on it while the GUI thread only drains channels.
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Handle to the global runtime. Panics if called before `main` set it.
pub fn runtime() -> &'static Runtime {
    RUNTIME.get().expect("runtime not initialized")
}

/// Program entry point: initializes runtime and launches GUI
fn main() -> Result<(), eframe::Error> {
    let rt = Arc::new(Runtime::new().expect("failed to create tokio runtime"));
    RUNTIME.set(rt).expect("runtime already initialized");

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "YouTube Downloader",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(DownloaderApp::default())
        }),
    )
}
