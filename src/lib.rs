//! Tubesplit - A Rust CLI tool for downloading, trimming and splitting YouTube content
//!
//! This library drives `yt-dlp` and `ffmpeg` to fetch single videos or whole playlists,
//! cut a time range out of a video or split it by chapters, while holding a device
//! wake-lock (Termux) for the duration of a batch.

pub mod classify;
pub mod cli;
pub mod config;
pub mod media;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod quality;
pub mod timespec;
pub mod tools;
pub mod utils;
pub mod wakelock;

pub use classify::{classify, Classification};
pub use cli::{Cli, Commands, ReportFormat};
pub use config::Config;
pub use media::{Chapter, Collection, MediaItem};
pub use orchestrator::{BatchResult, ItemPlan, Orchestrator, Outcome};
pub use pipeline::{DownloadPipeline, DownloadRequest};
pub use plan::{plan_segments, EditMode, Segment};
pub use quality::{QualityDirective, QualitySelection};
pub use timespec::TimeSpec;
pub use wakelock::SessionWakeLock;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to tubesplit
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TubesplitError {
    #[error("Invalid time format: {0:?} (expected HH:MM:SS or MM:SS)")]
    InvalidTimeFormat(String),

    #[error("Invalid range: start {start} must be before end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Unrecognized URL: {0}")]
    UnrecognizedUrl(String),

    #[error("No chapters found for: {0}")]
    NoChapters(String),

    #[error("{tool} failed: {reason}")]
    ExternalToolFailure { tool: String, reason: String },

    #[error("Wake lock unavailable: {0}")]
    WakeLockUnavailable(String),
}
