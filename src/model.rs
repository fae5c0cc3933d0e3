use std::path::PathBuf;

/// One downloadable unit as reported by a probe. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Video id as reported by yt-dlp
    pub id: String,
    /// Human-readable title
    pub title: String,
}

impl MediaItem {
    /// Watch URL for this item.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// The outcome of one completed fetch. Replaced wholesale on every new fetch;
/// the order of `items` is the authoritative row order everywhere else.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL the user pasted
    pub source_url: String,
    /// Title of the video, or of the playlist when `is_playlist` is set
    pub title: String,
    /// Whether the source URL referenced a playlist
    pub is_playlist: bool,
    /// Row order: row index = position in this list
    pub items: Vec<MediaItem>,
    /// Resolved once per fetch; immutable input to all tasks of the batch
    pub destination_dir: PathBuf,
}

/// Current state of one download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Launched, no progress seen yet
    Pending,
    /// At least one progress line received
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

/// Per-row download state, owned by the progress sink. The presenter only
/// ever reads a snapshot of this.
#[derive(Debug, Clone)]
pub struct DownloadTaskState {
    pub row: usize,
    pub status: TaskStatus,
    /// 0.0 to 100.0
    pub percent: f32,
    /// Raw speed text from yt-dlp, e.g. "1.23MiB/s"
    pub speed: String,
    /// Normalized as HH:MM:SS, "00:00:00" when unknown
    pub eta: String,
    pub error: Option<String>,
}

impl DownloadTaskState {
    pub fn pending(row: usize) -> Self {
        Self {
            row,
            status: TaskStatus::Pending,
            percent: 0.0,
            speed: String::new(),
            eta: String::new(),
            error: None,
        }
    }
}

/// What a download task reports back to the interactive thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressKind {
    Downloading {
        percent: f32,
        speed: String,
        /// Seconds remaining, when yt-dlp knows them
        eta: Option<u64>,
    },
    Finished,
    Failed(String),
}

/// One progress message. The row and generation are fixed when the task is
/// launched; the sink drops events whose generation is no longer current.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub generation: u64,
    pub row: usize,
    pub kind: ProgressKind,
}
