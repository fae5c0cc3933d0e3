//! yt-dlp collaborator boundary: binary resolution and metadata probes.

use std::path::PathBuf;
use std::process::Stdio;

use rust_embed::RustEmbed;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::EngineError;
use crate::model::MediaItem;

/// A `yt-dlp` (or `yt-dlp.exe`) binary placed under `assets/` gets embedded
/// and used in preference to whatever is on PATH.
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Resolves the yt-dlp binary: the embedded copy unpacked to the temp dir
/// when one was bundled, the PATH name otherwise.
pub fn resolve_binary() -> Result<PathBuf, EngineError> {
    let bin = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };
    let Some(data) = Asset::get(bin) else {
        return Ok(PathBuf::from(bin));
    };

    let tmp = std::env::temp_dir().join(bin);
    if !tmp.exists() {
        std::fs::write(&tmp, &data.data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(tmp)
}

/// What a probe resolves a URL to.
#[derive(Debug, Clone)]
pub struct ProbeInfo {
    pub title: String,
    pub is_playlist: bool,
    pub items: Vec<MediaItem>,
    /// Canonical playlist URL, when yt-dlp reports one
    pub playlist_url: Option<String>,
}

/// Schema for the parts of `yt-dlp -J` output we consume. Anything else in
/// the (large) JSON document is dropped at this boundary.
#[derive(Debug, Deserialize)]
struct RawProbe {
    title: Option<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
    entries: Option<Vec<RawEntry>>,
    id: Option<String>,
    webpage_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
}

impl RawProbe {
    fn into_probe_info(self, source_url: &str) -> ProbeInfo {
        let is_playlist =
            self.kind.as_deref() == Some("playlist") || self.entries.is_some();
        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| source_url.to_string());

        let items = match self.entries {
            Some(entries) => entries
                .into_iter()
                .filter_map(|e| {
                    let id = e.id?;
                    let title = e.title.filter(|t| !t.is_empty()).unwrap_or_else(|| id.clone());
                    Some(MediaItem { id, title })
                })
                .collect(),
            None => match self.id {
                Some(id) => vec![MediaItem { id, title: title.clone() }],
                None => Vec::new(),
            },
        };

        ProbeInfo {
            title,
            is_playlist,
            items,
            playlist_url: self.webpage_url,
        }
    }
}

/// Read-only metadata query: resolves a URL to a title and an ordered item
/// list without downloading any media. Playlist members are listed flat.
pub async fn probe(url: &str) -> Result<ProbeInfo, EngineError> {
    let bin = resolve_binary()?;
    let output = Command::new(bin)
        .arg("-J")
        .arg("--flat-playlist")
        .arg("--no-warnings")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(spawn_error)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::NonZeroExit(error_snippet(&stderr)));
    }

    let raw: RawProbe = serde_json::from_slice(&output.stdout)?;
    Ok(raw.into_probe_info(url))
}

pub(crate) fn spawn_error(err: std::io::Error) -> EngineError {
    if err.kind() == std::io::ErrorKind::NotFound {
        EngineError::MissingBinary
    } else {
        EngineError::Spawn(err)
    }
}

/// Last non-empty stderr line, the part of yt-dlp's output worth showing.
pub(crate) fn error_snippet(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
