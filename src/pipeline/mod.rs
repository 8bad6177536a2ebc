//! Classifier → quality resolver → planner → orchestrator.
//!
//! Everything that can be rejected from user input alone (quality, mode, times,
//! URL shape, selections) is rejected in [`DownloadPipeline::prepare`], before any
//! external process is started.

use anyhow::Context;
use std::path::{Path, PathBuf};

pub mod signal;

use crate::classify::{classify, Classification};
use crate::cli::TreatAs;
use crate::config::Config;
use crate::media::Probed;
use crate::orchestrator::{Batch, BatchResult, ItemPlan, Orchestrator};
use crate::plan::{parse_index_selection, plan_segments, sanitize_title, EditMode, ModeKind, Naming};
use crate::quality::{resolve, QualityDirective, QualitySelection};
use crate::tools::{Ffmpeg, YtDlp};
use crate::utils::resolve_download_dir;
use crate::wakelock::{DisabledWakeLock, SessionWakeLock, TermuxWakeLock, WakeLockFacility};
use crate::{Result, TubesplitError};

/// Raw values from the user-facing layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: String,
    pub convert_to_mp3: bool,
    pub mp3_bitrate: Option<u32>,
    pub mode: String,
    pub start: String,
    pub end: String,
    pub chapters: Option<String>,
    pub items: Option<String>,
    pub treat_as: Option<TreatAs>,
    pub output_dir: Option<PathBuf>,
}

/// A request that passed every check that needs no network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub target: Classification,
    pub quality: QualityDirective,
    pub mode: EditMode,
    pub items: Option<String>,
}

/// Classify a URL, letting an explicit override win over the detected kind
pub fn classify_with_override(
    url: &str,
    treat_as: Option<TreatAs>,
) -> std::result::Result<Classification, TubesplitError> {
    let detected = classify(url);
    let Some(treat_as) = treat_as else {
        return detected;
    };

    let url = match &detected {
        Ok(classification) => classification.url().to_string(),
        Err(_) => url.trim().to_string(),
    };
    if url.is_empty() {
        return detected;
    }

    Ok(match treat_as {
        TreatAs::Item => Classification::Item { url },
        TreatAs::Collection => Classification::Collection { url },
    })
}

/// Download pipeline wiring the planner to the orchestrator
pub struct DownloadPipeline {
    config: Config,
    orchestrator: Orchestrator,
}

impl DownloadPipeline {
    /// Create a pipeline backed by yt-dlp, ffmpeg and the Termux wake lock
    pub fn new(config: Config, show_progress: bool) -> Self {
        let retriever = YtDlp::new(config.tools.yt_dlp.clone(), &config.download);
        let transcoder = Ffmpeg::new(config.tools.ffmpeg.clone());
        let facility: Box<dyn WakeLockFacility> = if config.tools.wake_lock {
            Box::new(TermuxWakeLock::new(
                config.tools.wake_lock_command.clone(),
                config.tools.wake_unlock_command.clone(),
            ))
        } else {
            Box::new(DisabledWakeLock)
        };

        let orchestrator = Orchestrator::new(
            Box::new(retriever),
            Box::new(transcoder),
            SessionWakeLock::new(facility),
        )
        .with_progress(show_progress);

        Self::with_orchestrator(config, orchestrator)
    }

    pub fn with_orchestrator(config: Config, orchestrator: Orchestrator) -> Self {
        Self { config, orchestrator }
    }

    /// Validate everything that can be checked offline
    pub fn prepare(
        &self,
        request: &DownloadRequest,
    ) -> std::result::Result<PreparedRequest, TubesplitError> {
        let selection: QualitySelection = request.quality.parse()?;
        let bitrate = request
            .mp3_bitrate
            .or_else(|| request.convert_to_mp3.then_some(self.config.download.mp3_bitrate));
        let quality = resolve(selection, request.convert_to_mp3, bitrate)?;

        let kind: ModeKind = request.mode.parse()?;
        let mode = EditMode::from_input(kind, &request.start, &request.end, request.chapters.as_deref())?;

        let target = classify_with_override(&request.url, request.treat_as)?;

        if target.is_collection() && kind == ModeKind::Chapters {
            return Err(TubesplitError::InvalidSelection(
                "chapter splitting is only available for single videos".to_string(),
            ));
        }
        if !target.is_collection() && request.items.is_some() {
            return Err(TubesplitError::InvalidSelection(
                "an item selection only applies to playlists".to_string(),
            ));
        }

        Ok(PreparedRequest {
            target,
            quality,
            mode,
            items: request.items.clone(),
        })
    }

    /// Probe the target and plan every segment of the batch
    pub async fn plan(&self, prepared: &PreparedRequest, base_dir: &Path) -> Result<Batch> {
        let naming = Naming {
            prefix: String::new(),
            max_length: self.config.download.max_name_length,
        };

        match self.probe(&prepared.target).await? {
            Probed::Item(item) => {
                tracing::info!("Video: {}", item.display_title());
                let segments = plan_segments(&item, &prepared.mode, &prepared.quality, &naming)?;
                Ok(Batch {
                    output_dir: base_dir.join(self.folder_name(&item.title, "YT_Video")),
                    items: vec![ItemPlan::new(item, segments)],
                })
            }
            Probed::Collection(collection) => {
                if collection.is_empty() {
                    anyhow::bail!("Playlist {} has no downloadable entries", collection.url);
                }
                tracing::info!("Playlist: {} ({} videos)", collection.title, collection.len());

                let total = collection.len();
                let width = total.to_string().len();
                let selected = parse_index_selection(prepared.items.as_deref().unwrap_or(""), total)?;

                let output_dir = base_dir.join(self.folder_name(&collection.title, "YT_Playlist"));
                let mut items = Vec::with_capacity(selected.len());
                for index in selected {
                    let item = collection.items[index - 1].clone();
                    let naming = Naming {
                        prefix: format!("{:0width$} - ", index, width = width),
                        ..naming.clone()
                    };
                    match plan_segments(&item, &prepared.mode, &prepared.quality, &naming) {
                        Ok(segments) => items.push(ItemPlan::new(item, segments)),
                        Err(e) => {
                            tracing::warn!("[{}/{}] {}: {}", index, total, item.display_title(), e);
                            items.push(ItemPlan::rejected(item, e.to_string()));
                        }
                    }
                }

                Ok(Batch { output_dir, items })
            }
        }
    }

    /// Resolve metadata for a classified URL without downloading
    pub async fn probe(&self, target: &Classification) -> Result<Probed> {
        let retriever = self.orchestrator.retriever();
        match target {
            Classification::Item { url } => {
                let item = retriever
                    .probe_item(url)
                    .await
                    .with_context(|| format!("Failed to analyze video {}", url))?;
                Ok(Probed::Item(item))
            }
            Classification::Collection { url } => {
                let collection = retriever
                    .probe_collection(url)
                    .await
                    .with_context(|| format!("Failed to analyze playlist {}", url))?;
                Ok(Probed::Collection(collection))
            }
        }
    }

    /// Validate, probe, plan and download
    pub async fn run(&self, request: &DownloadRequest) -> Result<Vec<BatchResult>> {
        let prepared = self.prepare(request)?;
        self.execute(&prepared, request.output_dir.as_deref()).await
    }

    /// Probe, plan and download an already validated request.
    ///
    /// A termination signal cancels the batch; the wake lock is released on the way out.
    pub async fn execute(
        &self,
        prepared: &PreparedRequest,
        output_dir: Option<&Path>,
    ) -> Result<Vec<BatchResult>> {
        tracing::info!(
            "{} detected, quality {}, mode {}",
            prepared.target.kind(),
            prepared.quality.selection,
            prepared.mode.kind()
        );

        let configured = output_dir.or(self.config.download.directory.as_deref());
        let base_dir = resolve_download_dir(configured);

        let batch = self.plan(prepared, &base_dir).await?;
        tracing::info!("Saving to: {}", batch.output_dir.display());

        tokio::select! {
            results = self.orchestrator.run(&batch) => Ok(results),
            _ = signal::wait_for_signal() => anyhow::bail!("Cancelled by user"),
        }
    }

    fn folder_name(&self, title: &str, fallback: &str) -> String {
        let name = sanitize_title(title, self.config.download.max_name_length);
        if name.is_empty() {
            fallback.to_string()
        } else {
            name
        }
    }
}
