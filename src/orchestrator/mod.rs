use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::media::MediaItem;
use crate::plan::Segment;
use crate::tools::{FetchRequest, Retriever, TranscodeRequest, Transcoder};
use crate::wakelock::SessionWakeLock;
use crate::Result;

#[cfg(test)]
mod tests;

/// An item together with the segments planned for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPlan {
    pub item: MediaItem,

    /// Never empty unless the item was rejected while planning
    pub segments: Vec<Segment>,

    /// Why the item could not be planned; it is reported as failed without running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected: Option<String>,
}

impl ItemPlan {
    pub fn new(item: MediaItem, segments: Vec<Segment>) -> Self {
        Self {
            item,
            segments,
            rejected: None,
        }
    }

    /// A collection member whose plan failed; the rest of the batch still runs
    pub fn rejected(item: MediaItem, reason: impl Into<String>) -> Self {
        Self {
            item,
            segments: Vec::new(),
            rejected: Some(reason.into()),
        }
    }
}

/// Everything a single run downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub output_dir: PathBuf,
    pub items: Vec<ItemPlan>,
}

/// What happened to one item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded {
        files: Vec<PathBuf>,
    },
    Failed {
        reason: String,
        /// Files from segments that finished before the failure
        files: Vec<PathBuf>,
    },
}

/// Per-item result of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// 1-based position in the batch
    pub position: usize,
    pub title: String,
    pub url: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl BatchResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded { .. })
    }

    pub fn files(&self) -> &[PathBuf] {
        match &self.outcome {
            Outcome::Succeeded { files } | Outcome::Failed { files, .. } => files,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Succeeded { .. } => None,
            Outcome::Failed { reason, .. } => Some(reason),
        }
    }
}

/// Runs a batch strictly in order: items one after another, segments one after another.
///
/// A failing segment fails its item and skips the item's remaining segments; the
/// next item still runs. Failed invocations are not retried, yt-dlp already retries
/// transient network errors itself.
pub struct Orchestrator {
    retriever: Box<dyn Retriever>,
    transcoder: Box<dyn Transcoder>,
    wake_lock: SessionWakeLock,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(
        retriever: Box<dyn Retriever>,
        transcoder: Box<dyn Transcoder>,
        wake_lock: SessionWakeLock,
    ) -> Self {
        Self {
            retriever,
            transcoder,
            wake_lock,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn retriever(&self) -> &dyn Retriever {
        self.retriever.as_ref()
    }

    /// Run the whole batch under the wake-lock.
    ///
    /// # Panics
    ///
    /// If an item arrives with no segments; the planner never produces one.
    pub async fn run(&self, batch: &Batch) -> Vec<BatchResult> {
        for plan in batch.items.iter().filter(|plan| plan.rejected.is_none()) {
            assert!(
                !plan.segments.is_empty(),
                "item {} reached the orchestrator without segments",
                plan.item.url
            );
        }

        let _wake_lock = self.wake_lock.hold().await;
        let total = batch.items.len();
        let mut results = Vec::with_capacity(total);

        for (index, plan) in batch.items.iter().enumerate() {
            let position = index + 1;
            let title = plan.item.display_title().to_string();
            tracing::info!("[{}/{}] {}", position, total, title);

            if let Some(reason) = &plan.rejected {
                tracing::warn!("[{}/{}] {} skipped: {}", position, total, title, reason);
                results.push(BatchResult {
                    position,
                    title,
                    url: plan.item.url.clone(),
                    outcome: Outcome::Failed {
                        reason: reason.clone(),
                        files: Vec::new(),
                    },
                });
                continue;
            }

            let mut files = Vec::new();
            let outcome = match self.process_item(plan, &batch.output_dir, &mut files).await {
                Ok(()) => Outcome::Succeeded { files },
                Err(e) => {
                    let reason = format!("{:#}", e);
                    tracing::warn!("[{}/{}] {} failed: {}", position, total, title, reason);
                    Outcome::Failed { reason, files }
                }
            };

            results.push(BatchResult {
                position,
                title,
                url: plan.item.url.clone(),
                outcome,
            });
        }

        results
    }

    /// Stops at the first failing segment. `files` collects every produced file.
    async fn process_item(
        &self,
        plan: &ItemPlan,
        output_dir: &Path,
        files: &mut Vec<PathBuf>,
    ) -> Result<()> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let count = plan.segments.len();
        for (index, segment) in plan.segments.iter().enumerate() {
            let label = if count > 1 {
                format!("segment {}/{} \"{}\"", index + 1, count, segment.output_name)
            } else {
                format!("\"{}\"", segment.output_name)
            };

            let progress = self.spinner(format!("Downloading {}...", label));
            let request = FetchRequest::for_segment(segment, output_dir);
            let fetched = self.retriever.fetch(&request).await;
            progress.finish_and_clear();
            let path = fetched.with_context(|| format!("Downloading {}", label))?;

            let Some(post_process) = segment.quality.post_process else {
                tracing::info!("Saved {}", path.display());
                files.push(path);
                continue;
            };

            let transcode = TranscodeRequest::for_post_process(&path, post_process);
            let progress = self.spinner(format!("Converting {} to MP3...", label));
            let converted = self.transcoder.transcode(&transcode).await;
            progress.finish_and_clear();
            converted.with_context(|| format!("Converting {}", label))?;

            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
            tracing::info!("Saved {}", transcode.output.display());
            files.push(transcode.output);
        }

        Ok(())
    }

    fn spinner(&self, message: String) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.set_message(message);
        progress.enable_steady_tick(Duration::from_millis(120));
        progress
    }
}
