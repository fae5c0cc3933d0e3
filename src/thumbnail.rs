use eframe::egui::ColorImage;

/// Fetches and decodes the medium-quality thumbnail for one video id,
/// scaled down for grid rows. Blocking; runs on the runtime's blocking
/// pool. Thumbnails are cosmetic, so any failure just yields `None`.
pub fn fetch_thumbnail(video_id: &str) -> Option<ColorImage> {
    let url = format!("https://img.youtube.com/vi/{video_id}/mqdefault.jpg");
    let bytes = reqwest::blocking::get(&url).ok()?.bytes().ok()?;
    let img = image::load_from_memory(&bytes)
        .ok()?
        .thumbnail(96, 54)
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
