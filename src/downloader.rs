//! Download coordination: one independent yt-dlp task per selected row.

use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
    runtime::Runtime,
    sync::mpsc::UnboundedSender,
};

use crate::engine;
use crate::error::{AppError, EngineError};
use crate::model::{FetchResult, MediaItem, ProgressEvent, ProgressKind};
use crate::progress::{MARKER, parse_progress_line};

/// Everything one download task needs, captured at launch time. The row and
/// generation are never recomputed afterwards; selection may change while
/// the task is in flight.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub item: MediaItem,
    pub destination_dir: PathBuf,
    pub is_playlist: bool,
    pub row: usize,
    pub generation: u64,
}

/// Output template under the destination: playlist downloads get an index
/// prefix, single videos just the title. Identical titles under a
/// non-playlist destination may silently overwrite each other.
pub fn output_template(destination_dir: &Path, is_playlist: bool) -> String {
    let name = if is_playlist {
        "%(playlist_index)s-%(title)s.%(ext)s"
    } else {
        "%(title)s.%(ext)s"
    };
    destination_dir.join(name).to_string_lossy().into_owned()
}

/// yt-dlp arguments for one item: forced mp4 container, no subtitles or
/// thumbnails, bounded retries, and a marker-tagged progress template.
pub fn build_args(req: &DownloadRequest) -> Vec<String> {
    vec![
        req.item.watch_url(),
        "--merge-output-format".into(),
        "mp4".into(),
        "--no-write-subs".into(),
        "--no-write-auto-subs".into(),
        "--no-write-thumbnail".into(),
        "--retries".into(),
        "3".into(),
        "--fragment-retries".into(),
        "3".into(),
        "--newline".into(),
        "--progress-template".into(),
        format!(
            "download:{MARKER}%(progress._percent_str)s|%(progress._speed_str)s|%(progress.eta)s"
        ),
        "-o".into(),
        output_template(&req.destination_dir, req.is_playlist),
    ]
}

/// Validates batch preconditions and builds one request per valid selected
/// row. `destination_dir` is whatever the destination field holds when the
/// batch starts; it is captured here and immutable for the whole batch, even
/// if the field changes while tasks are in flight. Out-of-range rows are
/// skipped, not fatal.
pub fn batch_requests(
    fetch: &FetchResult,
    destination_dir: &Path,
    rows: &[usize],
    generation: u64,
) -> Result<Vec<DownloadRequest>, AppError> {
    if rows.is_empty() || destination_dir.as_os_str().is_empty() {
        return Err(AppError::PreconditionFailed);
    }

    Ok(rows
        .iter()
        .filter_map(|&row| {
            fetch.items.get(row).map(|item| DownloadRequest {
                item: item.clone(),
                destination_dir: destination_dir.to_path_buf(),
                is_playlist: fetch.is_playlist,
                row,
                generation,
            })
        })
        .collect())
}

/// Launches one task per selected row on the background runtime. Returns how
/// many tasks were spawned, or `PreconditionFailed` without launching
/// anything when the destination or selection is empty.
pub fn start_batch(
    runtime: &Runtime,
    fetch: &FetchResult,
    destination_dir: &Path,
    rows: &[usize],
    generation: u64,
    tx: &UnboundedSender<ProgressEvent>,
) -> Result<usize, AppError> {
    let requests = batch_requests(fetch, destination_dir, rows, generation)?;
    let spawned = requests.len();
    for req in requests {
        runtime.spawn(spawn_download(req, tx.clone()));
    }
    Ok(spawned)
}

/// One download task. Streams progress events while running and always ends
/// with exactly one terminal event; failures never escape the task.
pub async fn spawn_download(req: DownloadRequest, tx: UnboundedSender<ProgressEvent>) {
    let row = req.row;
    let generation = req.generation;
    let kind = match run(req, &tx).await {
        Ok(()) => ProgressKind::Finished,
        Err(e) => ProgressKind::Failed(e.to_string()),
    };
    let _ = tx.send(ProgressEvent { generation, row, kind });
}

async fn run(req: DownloadRequest, tx: &UnboundedSender<ProgressEvent>) -> Result<(), EngineError> {
    let bin = engine::resolve_binary()?;
    let row = req.row;
    let generation = req.generation;

    let mut child = Command::new(bin)
        .args(build_args(&req))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(engine::spawn_error)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| EngineError::Spawn(std::io::Error::other("stdout unavailable")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| EngineError::Spawn(std::io::Error::other("stderr unavailable")))?;

    // Collect stderr on the side; it only matters if the process fails.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf).await;
        buf
    });

    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(progress) = parse_progress_line(&line) {
            let _ = tx.send(ProgressEvent {
                generation,
                row,
                kind: ProgressKind::Downloading {
                    percent: progress.percent,
                    speed: progress.speed,
                    eta: progress.eta,
                },
            });
        }
    }

    let status = child.wait().await.map_err(EngineError::Spawn)?;
    let stderr = stderr_task.await.unwrap_or_default();
    if !status.success() {
        return Err(EngineError::NonZeroExit(engine::error_snippet(&stderr)));
    }
    Ok(())
}
