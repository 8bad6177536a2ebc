use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::Ffmpeg;
pub use ytdlp::YtDlp;

use crate::media::{Collection, MediaItem};
use crate::plan::Segment;
use crate::quality::PostProcess;
use crate::timespec::TimeSpec;
use crate::{Result, TubesplitError};

/// One retrieval-tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,

    /// Format selector
    pub format: String,

    pub merge_format: Option<String>,

    /// Range to fetch; `None` fetches the whole item
    pub section: Option<(TimeSpec, TimeSpec)>,

    /// Output directory
    pub output_dir: PathBuf,

    /// File name without extension
    pub output_name: String,
}

impl FetchRequest {
    pub fn for_segment(segment: &Segment, output_dir: &Path) -> Self {
        Self {
            url: segment.source_url.clone(),
            format: segment.quality.format.clone(),
            merge_format: segment.quality.merge_format.clone(),
            section: segment
                .is_bounded()
                .then_some((segment.start, segment.end)),
            output_dir: output_dir.to_path_buf(),
            output_name: segment.output_name.clone(),
        }
    }
}

/// One transcoder invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub bitrate_kbps: u32,
}

impl TranscodeRequest {
    /// Target the same file name with an `.mp3` extension
    pub fn for_post_process(input: &Path, post_process: PostProcess) -> Self {
        let PostProcess::Mp3 { bitrate_kbps } = post_process;
        let already_mp3 = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
        let output = if already_mp3 {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            input.with_file_name(format!("{}.{}k.mp3", stem, bitrate_kbps))
        } else {
            input.with_extension("mp3")
        };
        Self {
            input: input.to_path_buf(),
            output,
            bitrate_kbps,
        }
    }
}

/// The media retrieval tool: metadata probes and downloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Resolve one item's title, duration and chapters without downloading
    async fn probe_item(&self, url: &str) -> Result<MediaItem>;

    /// Enumerate a collection's members without downloading
    async fn probe_collection(&self, url: &str) -> Result<Collection>;

    /// Download a segment and return the path of the produced file
    async fn fetch(&self, request: &FetchRequest) -> Result<PathBuf>;
}

/// The media transcoder
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<()>;
}

/// Turn a finished child process into `ExternalToolFailure` when it did not exit cleanly
pub(crate) fn check_status(tool: &str, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let last_line = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("no error output");
    let reason = match output.status.code() {
        Some(code) => format!("exit code {}: {}", code, last_line.trim()),
        None => format!("terminated by signal: {}", last_line.trim()),
    };

    Err(TubesplitError::ExternalToolFailure {
        tool: tool.to_string(),
        reason,
    }
    .into())
}
