use anyhow::Context;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::{check_status, TranscodeRequest, Transcoder};
use crate::Result;

/// MP3 transcoding through ffmpeg
pub struct Ffmpeg {
    ffmpeg_path: String,
}

impl Ffmpeg {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn transcode_args(request: &TranscodeRequest) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            request.input.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-codec:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            format!("{}k", request.bitrate_kbps),
            request.output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn transcode(&self, request: &TranscodeRequest) -> Result<()> {
        tracing::debug!(
            "Converting {} to MP3 at {} kbps",
            request.input.display(),
            request.bitrate_kbps
        );

        let output = Command::new(&self.ffmpeg_path)
            .args(Self::transcode_args(request))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        check_status("ffmpeg", &output)
    }
}
