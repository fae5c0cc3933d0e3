//! The interactive-thread application: owns the current fetch, selection,
//! and per-row task state, drains background-task channels, and renders
//! the egui panels.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use eframe::{App, Frame, egui};
use egui::{Color32, ColorImage, RichText, TextureHandle, TextureOptions};
use rfd::FileDialog;
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel,
};

use crate::downloader;
use crate::error::{AppError, FetchError};
use crate::fetch;
use crate::library::{LibraryEntry, MediaLibrary};
use crate::model::{FetchResult, MediaItem, ProgressEvent, ProgressKind, TaskStatus};
use crate::runtime;
use crate::selection::SelectionSet;
use crate::sink::{Applied, ProgressSink};
use crate::thumbnail;

/// How many grid rows get a thumbnail fetch; long playlists stay text-only
/// past this point.
const MAX_THUMBNAILS: usize = 24;

/// Lines kept in the log pane.
const MAX_LOG_LINES: usize = 500;

pub struct DownloaderApp {
    /// Input field for the video or playlist URL
    url_input: String,
    /// Destination folder for downloads
    dest_input: String,
    /// Library list display mode: titles (false) or URLs (true)
    show_urls: bool,
    library: MediaLibrary,
    library_selected: Option<usize>,
    /// Current fetch; replaced wholesale, never merged
    fetch: Option<FetchResult>,
    /// Bumped every time a new fetch is installed; stale task events
    /// carry an older value and get dropped
    generation: u64,
    selection: SelectionSet,
    sink: ProgressSink,
    /// State of the "Select all" checkbox
    select_all: bool,
    /// Outcome channel of the in-flight fetch, if any
    fetch_rx: Option<UnboundedReceiver<Result<FetchResult, FetchError>>>,
    fetching: bool,
    /// Shared by all download tasks; drained each frame
    progress_tx: UnboundedSender<ProgressEvent>,
    progress_rx: UnboundedReceiver<ProgressEvent>,
    /// Cached textures for row thumbnails, keyed by video id
    thumbnails: HashMap<String, TextureHandle>,
    /// Incoming thumbnail fetch results (video id, image)
    thumbnail_results: Arc<Mutex<Vec<(String, ColorImage)>>>,
    status: String,
    log: Vec<String>,
}

impl Default for DownloaderApp {
    fn default() -> Self {
        let (progress_tx, progress_rx) = unbounded_channel();
        Self {
            url_input: String::new(),
            dest_input: default_destination(),
            show_urls: false,
            library: MediaLibrary::new(),
            library_selected: None,
            fetch: None,
            generation: 0,
            selection: SelectionSet::new(),
            sink: ProgressSink::new(),
            select_all: false,
            fetch_rx: None,
            fetching: false,
            progress_tx,
            progress_rx,
            thumbnails: HashMap::new(),
            thumbnail_results: Arc::new(Mutex::new(Vec::new())),
            status: String::new(),
            log: Vec::new(),
        }
    }
}

/// Drops cached textures whose video ids are not part of the new item list;
/// like every other piece of row state, the cache is rebuilt per fetch
/// instead of growing for the whole session.
fn evict_stale_thumbnails<T>(cache: &mut HashMap<String, T>, items: &[MediaItem]) {
    cache.retain(|id, _| items.iter().any(|item| &item.id == id));
}

fn default_destination() -> String {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl DownloaderApp {
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn log(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    fn reset_destination(&mut self) {
        self.dest_input = default_destination();
    }

    /// Validates and launches a fetch. `check_duplicate` is false when
    /// re-fetching an entry picked from the library list.
    fn start_fetch(&mut self, url: String, check_duplicate: bool) {
        let url = url.trim().to_string();
        if let Err(e) = fetch::validate_url(&url) {
            self.set_status(e.to_string());
            self.log(format!("Skipping invalid URL: {url}"));
            return;
        }
        if check_duplicate && self.library.contains_url(&url) {
            let e = AppError::DuplicateUrl(url.clone());
            self.set_status(e.to_string());
            self.log(format!("URL already fetched: {url}"));
            return;
        }

        let dest = PathBuf::from(self.dest_input.trim());
        let (tx, rx) = unbounded_channel();
        // Replacing the receiver orphans any still-running fetch; its send
        // fails and its result is discarded.
        self.fetch_rx = Some(rx);
        self.fetching = true;
        self.set_status("Fetching...");
        self.log(format!("Probing {url}"));

        runtime().spawn(async move {
            let _ = tx.send(fetch::fetch(url, dest).await);
        });
    }

    fn poll_fetch(&mut self, ctx: &egui::Context) {
        let Some(mut rx) = self.fetch_rx.take() else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(result)) => {
                self.fetching = false;
                self.install_fetch(result, ctx);
            }
            Ok(Err(err)) => {
                self.fetching = false;
                if let Some(title) = &err.title {
                    self.log(format!("Probe had already resolved title: {title}"));
                }
                self.set_status(format!("Error: {err}"));
                self.log(format!("Fetch failed: {err}"));
            }
            Err(TryRecvError::Empty) => {
                self.fetch_rx = Some(rx);
            }
            Err(TryRecvError::Disconnected) => {
                self.fetching = false;
                self.set_status("Fetch task was dropped.");
            }
        }
    }

    /// Installs a completed fetch: bumps the generation, clears selection
    /// and all task state, then publishes the new item list. Order matters;
    /// no state from the previous fetch may leak into the new one.
    fn install_fetch(&mut self, result: FetchResult, ctx: &egui::Context) {
        self.generation += 1;
        self.sink.reset(self.generation);
        self.selection.reset(result.items.len());
        self.select_all = false;
        self.dest_input = result.destination_dir.display().to_string();

        self.set_status(format!("{} video(s) found.", result.items.len()));
        self.log(format!(
            "Fetched {}: {} item(s){}",
            result.source_url,
            result.items.len(),
            if result.is_playlist { " (playlist)" } else { "" },
        ));

        if self.library.add(LibraryEntry {
            title: result.title.clone(),
            url: result.source_url.clone(),
            destination_dir: self.dest_input.clone(),
            is_playlist: result.is_playlist,
        }) {
            self.library_selected = Some(self.library.len() - 1);
        }

        evict_stale_thumbnails(&mut self.thumbnails, &result.items);
        self.spawn_thumbnails(&result.items, ctx);
        self.fetch = Some(result);
    }

    fn spawn_thumbnails(&mut self, items: &[MediaItem], ctx: &egui::Context) {
        for item in items.iter().take(MAX_THUMBNAILS) {
            if self.thumbnails.contains_key(&item.id) {
                continue;
            }
            let id = item.id.clone();
            let inbox = Arc::clone(&self.thumbnail_results);
            let ctx = ctx.clone();
            runtime().spawn_blocking(move || {
                if let Some(img) = thumbnail::fetch_thumbnail(&id) {
                    inbox.lock().unwrap().push((id, img));
                    ctx.request_repaint();
                }
            });
        }
    }

    fn poll_thumbnails(&mut self, ctx: &egui::Context) {
        let mut pending = self.thumbnail_results.lock().unwrap();
        for (id, img) in pending.drain(..) {
            let tex = ctx.load_texture(&id, img, TextureOptions::default());
            self.thumbnails.insert(id, tex);
        }
    }

    fn poll_progress(&mut self) {
        while let Ok(event) = self.progress_rx.try_recv() {
            let terminal_note = match &event.kind {
                ProgressKind::Finished => Some(format!("Row {} downloaded.", event.row + 1)),
                ProgressKind::Failed(m) => Some(format!("Row {} failed: {m}", event.row + 1)),
                ProgressKind::Downloading { .. } => None,
            };
            match self.sink.apply(event) {
                Applied::Updated => {
                    if let Some(note) = terminal_note {
                        self.set_status(note.clone());
                        self.log(note);
                    }
                }
                // Stale generation or a late/duplicate event; nothing to show.
                Applied::Stale | Applied::Ignored => {}
            }
        }
    }

    fn on_download_selected(&mut self) {
        let rows = self.selection.members();
        // The destination is whatever the field says right now; the user may
        // have browsed somewhere else since the fetch resolved it.
        let destination = PathBuf::from(self.dest_input.trim());
        let Some(fetch) = self.fetch.as_ref() else {
            self.set_status(AppError::PreconditionFailed.to_string());
            return;
        };
        let item_count = fetch.items.len();
        let result = downloader::start_batch(
            runtime(),
            fetch,
            &destination,
            &rows,
            self.generation,
            &self.progress_tx,
        );
        match result {
            Ok(spawned) => {
                for &row in rows.iter().filter(|&&r| r < item_count) {
                    self.sink.begin(row);
                }
                self.set_status(format!("Downloading {spawned} video(s)..."));
                self.log(format!("Started {spawned} download task(s)."));
            }
            Err(e) => {
                self.set_status(e.to_string());
            }
        }
    }

    fn open_library(&mut self) {
        let Some(path) = FileDialog::new().add_filter("ydl", &["ydl"]).pick_file() else {
            return;
        };
        match self.library.load(&path) {
            Ok(()) => {
                self.library_selected = None;
                self.set_status(format!("Loaded {} library entries.", self.library.len()));
            }
            Err(e) => {
                self.set_status(format!("Failed to open file: {e}"));
            }
        }
    }

    fn save_library(&mut self) {
        let Some(path) = FileDialog::new().add_filter("ydl", &["ydl"]).save_file() else {
            return;
        };
        match self.library.save(&path) {
            Ok(()) => self.set_status("Library saved."),
            Err(e) => self.set_status(format!("Failed to save file: {e}")),
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open library...").clicked() {
                        ui.close_menu();
                        self.open_library();
                    }
                    if ui.button("Save library...").clicked() {
                        ui.close_menu();
                        self.save_library();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });
    }

    fn library_panel(&mut self, ctx: &egui::Context) {
        let mut clicked = None;
        let mut delete = false;
        let mut clear = false;

        egui::SidePanel::left("library_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Library");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.show_urls, false, "Display Title");
                    ui.radio_value(&mut self.show_urls, true, "Display URL");
                });
                ui.separator();

                egui::ScrollArea::vertical()
                    .id_source("library_list")
                    .auto_shrink([false, true])
                    .max_height(ui.available_height() - 40.0)
                    .show(ui, |ui| {
                        for (i, entry) in self.library.entries().iter().enumerate() {
                            let text = if self.show_urls { &entry.url } else { &entry.title };
                            let selected = self.library_selected == Some(i);
                            if ui.selectable_label(selected, text).clicked() {
                                clicked = Some(i);
                            }
                        }
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    delete = ui.button("Delete item").clicked();
                    clear = ui.button("Clear all").clicked();
                });
            });

        if let Some(i) = clicked {
            self.library_selected = Some(i);
            if let Some(entry) = self.library.get(i) {
                // Clicking a library row re-probes it; the duplicate check
                // is skipped on purpose.
                let url = entry.url.clone();
                self.url_input = url.clone();
                self.reset_destination();
                self.start_fetch(url, false);
            }
        }
        if delete {
            if let Some(i) = self.library_selected {
                self.library.remove(i);
                self.library_selected = None;
                self.set_status("Deleted selected entry.");
            }
        }
        if clear {
            self.library.clear();
            self.library_selected = None;
            self.set_status("Cleared the library.");
        }
    }

    fn item_grid(&mut self, ui: &mut egui::Ui) {
        let mut toggled: Vec<usize> = Vec::new();

        if let Some(fetch) = &self.fetch {
            ui.label(
                RichText::new(format!("Title: {}", fetch.title))
                    .strong()
                    .color(Color32::from_rgb(100, 149, 237)),
            );

            egui::ScrollArea::vertical()
                .id_source("item_grid")
                .auto_shrink([false, true])
                .max_height(340.0)
                .show(ui, |ui| {
                    egui::Grid::new("items")
                        .striped(true)
                        .min_col_width(40.0)
                        .show(ui, |ui| {
                            for header in ["", "", "Title", "ID", "%", "Speed", "Left time"] {
                                ui.label(RichText::new(header).strong());
                            }
                            ui.end_row();

                            for (row, item) in fetch.items.iter().enumerate() {
                                let mut checked = self.selection.contains(row);
                                if ui.checkbox(&mut checked, "").changed() {
                                    toggled.push(row);
                                }
                                if let Some(tex) = self.thumbnails.get(&item.id) {
                                    ui.image(tex);
                                } else {
                                    ui.label("");
                                }
                                ui.label(&item.title);
                                ui.label(&item.id);
                                match self.sink.get(row) {
                                    Some(state) => {
                                        match state.status {
                                            TaskStatus::Pending => {
                                                ui.label("queued");
                                            }
                                            TaskStatus::Running => {
                                                ui.label(format!("{:.1}%", state.percent));
                                            }
                                            TaskStatus::Succeeded => {
                                                ui.label(
                                                    RichText::new("100%")
                                                        .color(Color32::from_rgb(144, 238, 144)),
                                                );
                                            }
                                            TaskStatus::Failed => {
                                                let label = ui.label(
                                                    RichText::new("failed").color(Color32::RED),
                                                );
                                                if let Some(err) = &state.error {
                                                    label.on_hover_text(err);
                                                }
                                            }
                                        }
                                        ui.label(&state.speed);
                                        ui.label(&state.eta);
                                    }
                                    None => {
                                        ui.label("");
                                        ui.label("");
                                        ui.label("");
                                    }
                                }
                                ui.end_row();
                            }
                        });
                });
        }

        for row in toggled {
            // Rows come straight from the rendered grid, but stay defensive.
            if let Err(e) = self.selection.toggle(row) {
                self.log(e.to_string());
            }
        }
    }

    fn central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube Downloader");

            ui.horizontal(|ui| {
                ui.label("YouTube URL:");
                ui.text_edit_singleline(&mut self.url_input);
                let fetch_clicked = ui
                    .add_enabled(!self.fetching, egui::Button::new("Fetch Videos"))
                    .clicked();
                if fetch_clicked {
                    self.reset_destination();
                    let url = self.url_input.clone();
                    self.start_fetch(url, true);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Download Path:");
                ui.text_edit_singleline(&mut self.dest_input);
                if ui.button("Browse...").clicked() {
                    if let Some(folder) =
                        FileDialog::new().set_directory(&self.dest_input).pick_folder()
                    {
                        self.dest_input = folder.display().to_string();
                    }
                }
            });

            ui.separator();
            self.item_grid(ui);

            ui.horizontal(|ui| {
                if ui.button("Download Selected").clicked() {
                    self.on_download_selected();
                }
                let mut all = self.select_all;
                if ui.checkbox(&mut all, "Select all").changed() {
                    self.select_all = all;
                    self.selection.set_all(all);
                }
                if self.fetching {
                    ui.spinner();
                }
            });

            ui.label(RichText::new(&self.status).strong().color(Color32::RED));

            ui.separator();
            ui.label("Command Output:");
            egui::ScrollArea::vertical()
                .id_source("log")
                .auto_shrink([false, true])
                .max_height(120.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in &self.log {
                        ui.label(line);
                    }
                });
        });
    }
}

impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_progress();
        self.poll_fetch(ctx);
        self.poll_thumbnails(ctx);

        self.menu_bar(ctx);
        self.library_panel(ctx);
        self.central_panel(ctx);

        // Keep the loop live while background work is in flight.
        if self.fetching || self.sink.has_active_tasks() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_cache_is_rebuilt_per_fetch() {
        let mut cache: HashMap<String, u8> = HashMap::new();
        cache.insert("old1".into(), 0);
        cache.insert("old2".into(), 0);
        cache.insert("kept".into(), 0);

        let items = vec![
            MediaItem { id: "kept".into(), title: "Kept".into() },
            MediaItem { id: "new".into(), title: "New".into() },
        ];
        evict_stale_thumbnails(&mut cache, &items);

        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("kept"));
    }

    #[test]
    fn empty_fetch_empties_the_cache() {
        let mut cache: HashMap<String, u8> = HashMap::new();
        cache.insert("old".into(), 0);
        evict_stale_thumbnails(&mut cache, &[]);
        assert!(cache.is_empty());
    }
}
