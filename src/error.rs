//! Error types for tubegrid

use thiserror::Error;

/// Which phase of a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// The initial probe of the pasted URL.
    Probe,
    /// The second probe that resolves playlist membership and title.
    PlaylistResolution,
}

impl std::fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchPhase::Probe => write!(f, "probe"),
            FetchPhase::PlaylistResolution => write!(f, "playlist resolution"),
        }
    }
}

/// A failed fetch. Carries the phase that failed and whatever title the
/// first probe had already produced, so the UI can still show it.
#[derive(Error, Debug)]
#[error("{phase} failed: {message}")]
pub struct FetchError {
    pub phase: FetchPhase,
    pub message: String,
    pub title: Option<String>,
}

/// Failures at the yt-dlp collaborator boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("yt-dlp not found; bundle it under assets/ or install it on PATH")]
    MissingBinary,

    #[error("failed to spawn yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("yt-dlp exited with an error: {0}")]
    NonZeroExit(String),

    #[error("failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User-facing errors raised on the interactive thread.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("this URL is already in the library")]
    DuplicateUrl(String),

    #[error("row {0} is out of range")]
    InvalidRow(usize),

    #[error("select a destination folder and at least one video first")]
    PreconditionFailed,
}

pub type Result<T> = std::result::Result<T, AppError>;
