//! Fetch coordination: URL validation, playlist detection, and the
//! two-phase probe that turns a pasted URL into a [`FetchResult`].

use std::path::{Path, PathBuf};

use crate::engine;
use crate::error::{AppError, FetchError, FetchPhase};
use crate::model::FetchResult;

/// Synchronous input validation, run before anything is spawned.
pub fn validate_url(url: &str) -> Result<(), AppError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AppError::InvalidUrl("empty URL".into()));
    }
    if !url.contains("youtube.com") && !url.contains("youtu.be") {
        return Err(AppError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

/// A URL references a playlist when its query string carries a `list`
/// parameter.
pub fn is_playlist_url(url: &str) -> bool {
    let without_fragment = url.split('#').next().unwrap_or("");
    let Some(query) = without_fragment.splitn(2, '?').nth(1) else {
        return false;
    };
    query
        .split('&')
        .any(|pair| pair.splitn(2, '=').next() == Some("list"))
}

/// Destination for a playlist fetch: a subdirectory named after the playlist.
pub fn playlist_destination(requested: &Path, playlist_title: &str) -> PathBuf {
    requested.join(playlist_title)
}

/// A fetch is treated as a playlist when the URL carries a `list` parameter
/// or the probe itself came back as a playlist document.
fn is_playlist_fetch(url: &str, probe: &engine::ProbeInfo) -> bool {
    probe.is_playlist || is_playlist_url(url)
}

/// Probes `url` and assembles a [`FetchResult`].
///
/// For playlist URLs a second probe resolves the canonical playlist and its
/// title; that phase can fail independently, and its error keeps the title
/// the first probe already produced. Runs on the background runtime; the
/// caller delivers the outcome back to the interactive thread.
pub async fn fetch(url: String, requested_dir: PathBuf) -> Result<FetchResult, FetchError> {
    let first = engine::probe(&url).await.map_err(|e| FetchError {
        phase: FetchPhase::Probe,
        message: e.to_string(),
        title: None,
    })?;

    let is_playlist = is_playlist_fetch(&url, &first);
    let mut title = first.title;
    let mut items = first.items;
    let mut destination_dir = requested_dir.clone();

    if is_playlist {
        let playlist_url = first.playlist_url.unwrap_or_else(|| url.clone());
        let second = engine::probe(&playlist_url).await.map_err(|e| FetchError {
            phase: FetchPhase::PlaylistResolution,
            message: e.to_string(),
            title: Some(title.clone()),
        })?;
        title = second.title;
        items = second.items;
        destination_dir = playlist_destination(&requested_dir, &title);
    }

    Ok(FetchResult {
        source_url: url,
        title,
        is_playlist,
        items,
        destination_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_is_invalid() {
        assert!(matches!(validate_url(""), Err(AppError::InvalidUrl(_))));
        assert!(matches!(validate_url("   "), Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn non_youtube_urls_are_invalid() {
        assert!(matches!(
            validate_url("https://example.com/watch?v=abc"),
            Err(AppError::InvalidUrl(_))
        ));
    }

    #[test]
    fn youtube_urls_pass_validation() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("https://youtu.be/xyz").is_ok());
    }

    #[test]
    fn short_link_without_list_parameter_is_not_a_playlist() {
        assert!(!is_playlist_url("https://youtu.be/xyz"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn list_query_parameter_marks_a_playlist() {
        assert!(is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(is_playlist_url("https://www.youtube.com/watch?v=abc&list=PL123&index=3"));
    }

    #[test]
    fn list_must_be_a_query_parameter() {
        assert!(!is_playlist_url("https://www.youtube.com/list"));
        assert!(!is_playlist_url("https://www.youtube.com/watch?playlist=PL123"));
        assert!(!is_playlist_url("https://youtu.be/xyz#list=PL123"));
    }

    #[test]
    fn probe_playlist_flag_counts_even_without_list_parameter() {
        let probe = engine::ProbeInfo {
            title: "Uploads".into(),
            is_playlist: true,
            items: Vec::new(),
            playlist_url: None,
        };
        // Some playlist documents resolve from URLs with no `list` parameter.
        assert!(is_playlist_fetch("https://www.youtube.com/@someone/videos", &probe));

        let single = engine::ProbeInfo {
            title: "A Video".into(),
            is_playlist: false,
            items: Vec::new(),
            playlist_url: None,
        };
        assert!(!is_playlist_fetch("https://youtu.be/xyz", &single));
        assert!(is_playlist_fetch("https://www.youtube.com/playlist?list=PL123", &single));
    }

    #[test]
    fn playlist_destination_nests_under_requested_dir() {
        let dest = playlist_destination(Path::new("/downloads"), "My List");
        assert_eq!(dest, PathBuf::from("/downloads/My List"));
    }
}
