use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{check_status, FetchRequest, Retriever};
use crate::config::DownloadConfig;
use crate::media::{chapters_from_description, Chapter, Collection, MediaItem};
use crate::timespec::TimeSpec;
use crate::Result;

/// Retrieval through the yt-dlp command-line tool
pub struct YtDlp {
    yt_dlp_path: String,
    retries: u32,
    fragment_retries: u32,
    precise_cuts: bool,
}

/// The subset of `yt-dlp --dump-single-json` output we rely on
#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    chapters: Option<Vec<RawChapter>>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    start_time: f64,
    end_time: Option<f64>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    entries: Vec<Option<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl YtDlp {
    pub fn new(yt_dlp_path: impl Into<String>, download: &DownloadConfig) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            retries: download.retries,
            fragment_retries: download.fragment_retries,
            precise_cuts: download.precise_cuts,
        }
    }

    async fn dump_json(&self, args: &[&str], url: &str) -> Result<String> {
        tracing::debug!("Probing metadata for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .args(["--dump-single-json", "--no-warnings", "--", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        check_status("yt-dlp", &output)?;

        String::from_utf8(output.stdout).context("yt-dlp returned non UTF-8 metadata")
    }

    /// Arguments for a segment download
    pub fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let template = request
            .output_dir
            .join(format!("{}.%(ext)s", escape_template(&request.output_name)));

        let mut args = vec![
            "--format".to_string(),
            request.format.clone(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
            "--no-playlist".to_string(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.fragment_retries.to_string(),
            "--continue".to_string(),
            "--no-part".to_string(),
            "--no-warnings".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];

        if let Some(merge_format) = &request.merge_format {
            args.push("--merge-output-format".to_string());
            args.push(merge_format.clone());
        }

        if let Some((start, end)) = request.section {
            args.push("--download-sections".to_string());
            args.push(section_spec(start, end));
            if self.precise_cuts {
                args.push("--force-keyframes-at-cuts".to_string());
            }
        }

        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }
}

/// `*START-END` in seconds, open ends as `0` / `inf`
fn section_spec(start: TimeSpec, end: TimeSpec) -> String {
    let start = start.seconds().unwrap_or(0).to_string();
    let end = end
        .seconds()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "inf".to_string());
    format!("*{}-{}", start, end)
}

/// `%` starts a yt-dlp output template field
fn escape_template(name: &str) -> String {
    name.replace('%', "%%")
}

fn whole_seconds(value: Option<f64>) -> Option<u64> {
    value.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v.round() as u64)
}

/// Build a [`MediaItem`] from a single-video probe
fn parse_item_info(json: &str, url: &str) -> Result<MediaItem> {
    let info: RawInfo = serde_json::from_str(json).context("Failed to parse yt-dlp metadata")?;
    let duration = whole_seconds(info.duration);

    let mut chapters: Vec<Chapter> = info
        .chapters
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| {
            // Same rounding on both bounds keeps adjacent chapters from overlapping
            let start = raw.start_time.max(0.0).round() as u64;
            let end = raw.end_time.map(|e| e.max(0.0).round() as u64);
            if end.is_some_and(|e| e <= start) {
                return None;
            }
            let title = raw
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Part {}", i + 1));
            Some(Chapter { title, start, end })
        })
        .collect();

    if chapters.is_empty() {
        if let Some(description) = &info.description {
            chapters = chapters_from_description(description, duration);
            if !chapters.is_empty() {
                tracing::info!("Using {} chapters found in the description", chapters.len());
            }
        }
    }

    Ok(MediaItem {
        url: url.to_string(),
        title: info.title.unwrap_or_default(),
        duration,
        chapters,
    })
}

/// Build a [`Collection`] from a flat playlist probe
fn parse_collection_info(json: &str, url: &str) -> Result<Collection> {
    let playlist: RawPlaylist =
        serde_json::from_str(json).context("Failed to parse yt-dlp playlist metadata")?;

    let items = playlist
        .entries
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let url = entry.url.filter(|u| u.starts_with("http")).or_else(|| {
                entry
                    .id
                    .as_ref()
                    .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            })?;
            Some(MediaItem {
                url,
                title: entry.title.unwrap_or_default(),
                duration: whole_seconds(entry.duration),
                chapters: Vec::new(),
            })
        })
        .collect();

    Ok(Collection {
        url: url.to_string(),
        title: playlist.title.unwrap_or_default(),
        items,
    })
}

#[async_trait]
impl Retriever for YtDlp {
    async fn probe_item(&self, url: &str) -> Result<MediaItem> {
        let json = self.dump_json(&["--no-playlist"], url).await?;
        parse_item_info(&json, url)
    }

    async fn probe_collection(&self, url: &str) -> Result<Collection> {
        let json = self.dump_json(&["--flat-playlist", "--yes-playlist"], url).await?;
        parse_collection_info(&json, url)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        let args = self.fetch_args(request);
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.yt_dlp_path))?;

        check_status("yt-dlp", &output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from);

        Ok(reported.unwrap_or_else(|| {
            let extension = request.merge_format.as_deref().unwrap_or("media");
            let guessed = request
                .output_dir
                .join(format!("{}.{}", request.output_name, extension));
            tracing::warn!("yt-dlp did not report an output path, assuming {}", guessed.display());
            guessed
        }))
    }
}
