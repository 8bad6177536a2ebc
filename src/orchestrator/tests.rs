use super::*;
use crate::quality::{resolve, QualityDirective, QualitySelection};
use crate::timespec::TimeSpec;
use crate::tools::{MockRetriever, MockTranscoder};
use crate::wakelock::MockWakeLockFacility;
use crate::TubesplitError;
use mockall::Sequence;
use tempfile::TempDir;

fn counted_wake_lock() -> SessionWakeLock {
    let mut facility = MockWakeLockFacility::new();
    facility.expect_acquire().times(1).returning(|| Ok(()));
    facility.expect_release().times(1).returning(|| Ok(()));
    SessionWakeLock::new(Box::new(facility))
}

fn plan(url: &str, segments: usize, quality: &QualityDirective) -> ItemPlan {
    ItemPlan::new(
        MediaItem {
            url: url.to_string(),
            title: format!("Title of {}", url),
            duration: Some(600),
            chapters: Vec::new(),
        },
        (0..segments)
            .map(|i| Segment {
                source_url: url.to_string(),
                start: if segments > 1 { TimeSpec::At(i as u64 * 60) } else { TimeSpec::Unspecified },
                end: if segments > 1 { TimeSpec::At(i as u64 * 60 + 60) } else { TimeSpec::Unspecified },
                output_name: format!("{} part {}", url, i + 1),
                quality: quality.clone(),
            })
            .collect(),
    )
}

fn video() -> QualityDirective {
    resolve(QualitySelection::Auto, false, None).unwrap()
}

fn tool_failure() -> anyhow::Error {
    TubesplitError::ExternalToolFailure {
        tool: "yt-dlp".to_string(),
        reason: "exit code 1: ERROR: Video unavailable".to_string(),
    }
    .into()
}

fn batch(dir: &TempDir, items: Vec<ItemPlan>) -> Batch {
    Batch {
        output_dir: dir.path().to_path_buf(),
        items,
    }
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_item() {
    let dir = TempDir::new().unwrap();
    let mut retriever = MockRetriever::new();
    retriever
        .expect_fetch()
        .times(3)
        .returning(|request| {
            if request.url == "u2" {
                Err(tool_failure())
            } else {
                Ok(request.output_dir.join(format!("{}.mp4", request.output_name)))
            }
        });

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(MockTranscoder::new()), counted_wake_lock())
        .with_progress(false);

    let results = orchestrator
        .run(&batch(&dir, vec![plan("u1", 1, &video()), plan("u2", 1, &video()), plan("u3", 1, &video())]))
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].succeeded());
    assert!(!results[1].succeeded());
    assert!(results[2].succeeded());
    assert_eq!(results[1].position, 2);
    assert!(results[1].failure_reason().unwrap().contains("Video unavailable"));
    assert_eq!(results[2].files(), [dir.path().join("u3 part 1.mp4")]);
}

#[tokio::test]
async fn test_failed_segment_skips_rest_of_item() {
    let dir = TempDir::new().unwrap();
    let mut seq = Sequence::new();
    let mut retriever = MockRetriever::new();
    retriever
        .expect_fetch()
        .withf(|r| r.url == "a" && r.section == Some((TimeSpec::At(0), TimeSpec::At(60))))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|r| Ok(r.output_dir.join("a1.mp4")));
    retriever
        .expect_fetch()
        .withf(|r| r.url == "a" && r.section == Some((TimeSpec::At(60), TimeSpec::At(120))))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(tool_failure()));
    retriever
        .expect_fetch()
        .withf(|r| r.url == "b")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|r| Ok(r.output_dir.join("b.mp4")));

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(MockTranscoder::new()), counted_wake_lock())
        .with_progress(false);

    let results = orchestrator
        .run(&batch(&dir, vec![plan("a", 3, &video()), plan("b", 1, &video())]))
        .await;

    assert!(!results[0].succeeded());
    assert_eq!(results[0].files(), [dir.path().join("a1.mp4")]);
    assert!(results[0].failure_reason().unwrap().contains("segment 2/3"));
    assert!(results[1].succeeded());
}

#[tokio::test]
async fn test_wake_lock_taken_once_even_when_everything_fails() {
    let dir = TempDir::new().unwrap();
    let mut retriever = MockRetriever::new();
    retriever.expect_fetch().times(4).returning(|_| Err(tool_failure()));

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(MockTranscoder::new()), counted_wake_lock())
        .with_progress(false);

    let items = (1..=4).map(|i| plan(&format!("u{}", i), 2, &video())).collect();
    let results = orchestrator.run(&batch(&dir, items)).await;

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| !r.succeeded()));
    // the mock facility verifies exactly one acquire and one release when dropped
}

#[tokio::test]
async fn test_mp3_conversion_runs_after_fetch() {
    let dir = TempDir::new().unwrap();
    let audio = resolve(QualitySelection::AudioOnly, true, Some(192)).unwrap();

    let mut retriever = MockRetriever::new();
    retriever
        .expect_fetch()
        .withf(|r| r.format == "bestaudio/best" && r.merge_format.is_none())
        .times(1)
        .returning(|r| Ok(r.output_dir.join("song.webm")));

    let expected_input = dir.path().join("song.webm");
    let expected_output = dir.path().join("song.mp3");
    let mut transcoder = MockTranscoder::new();
    transcoder
        .expect_transcode()
        .withf(move |t| t.input == expected_input && t.output == expected_output && t.bitrate_kbps == 192)
        .times(1)
        .returning(|_| Ok(()));

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(transcoder), counted_wake_lock())
        .with_progress(false);

    let results = orchestrator.run(&batch(&dir, vec![plan("song", 1, &audio)])).await;
    assert!(results[0].succeeded());
    assert_eq!(results[0].files(), [dir.path().join("song.mp3")]);
}

#[tokio::test]
async fn test_transcode_failure_fails_item() {
    let dir = TempDir::new().unwrap();
    let audio = resolve(QualitySelection::AudioOnly, true, None).unwrap();

    let mut retriever = MockRetriever::new();
    retriever
        .expect_fetch()
        .times(2)
        .returning(|r| Ok(r.output_dir.join(format!("{}.m4a", r.output_name))));

    let mut transcoder = MockTranscoder::new();
    let mut seq = Sequence::new();
    transcoder
        .expect_transcode()
        .withf(|t| t.input.ends_with("x part 1.m4a"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| {
            Err(TubesplitError::ExternalToolFailure {
                tool: "ffmpeg".to_string(),
                reason: "exit code 1: Invalid data".to_string(),
            }
            .into())
        });
    transcoder
        .expect_transcode()
        .withf(|t| t.input.ends_with("y part 1.m4a"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(transcoder), counted_wake_lock())
        .with_progress(false);

    let results = orchestrator
        .run(&batch(&dir, vec![plan("x", 1, &audio), plan("y", 1, &audio)]))
        .await;

    assert!(!results[0].succeeded());
    assert!(results[0].failure_reason().unwrap().contains("ffmpeg failed"));
    assert!(results[1].succeeded());
}

#[tokio::test]
#[should_panic(expected = "without segments")]
async fn test_empty_segment_list_is_an_invariant_violation() {
    let dir = TempDir::new().unwrap();
    let mut facility = MockWakeLockFacility::new();
    facility.expect_acquire().never();
    facility.expect_release().never();

    let orchestrator = Orchestrator::new(
        Box::new(MockRetriever::new()),
        Box::new(MockTranscoder::new()),
        SessionWakeLock::new(Box::new(facility)),
    )
    .with_progress(false);

    orchestrator.run(&batch(&dir, vec![plan("empty", 0, &video())])).await;
}

#[tokio::test]
async fn test_rejected_item_fails_without_fetching() {
    let dir = TempDir::new().unwrap();
    let mut retriever = MockRetriever::new();
    retriever
        .expect_fetch()
        .times(2)
        .withf(|request| request.url != "u2")
        .returning(|request| Ok(request.output_dir.join(format!("{}.mp4", request.output_name))));

    let orchestrator = Orchestrator::new(Box::new(retriever), Box::new(MockTranscoder::new()), counted_wake_lock())
        .with_progress(false);

    let rejected = ItemPlan::rejected(MediaItem::unresolved("u2"), "Invalid range: too short");
    let results = orchestrator
        .run(&batch(&dir, vec![plan("u1", 1, &video()), rejected, plan("u3", 1, &video())]))
        .await;

    assert!(results[0].succeeded());
    assert_eq!(results[1].failure_reason(), Some("Invalid range: too short"));
    assert!(results[1].files().is_empty());
    assert!(results[2].succeeded());
}

/// Fetch never completes, like a download stuck on a dead connection
struct StalledRetriever;

#[async_trait::async_trait]
impl Retriever for StalledRetriever {
    async fn probe_item(&self, url: &str) -> Result<MediaItem> {
        Ok(MediaItem::unresolved(url))
    }

    async fn probe_collection(&self, url: &str) -> Result<crate::media::Collection> {
        anyhow::bail!("not a playlist: {}", url)
    }

    async fn fetch(&self, _request: &FetchRequest) -> Result<PathBuf> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancelled_batch_releases_wake_lock() {
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        Box::new(StalledRetriever),
        Box::new(MockTranscoder::new()),
        counted_wake_lock(),
    )
    .with_progress(false);

    let batch = batch(&dir, vec![plan("u1", 2, &video())]);
    let outcome = tokio::time::timeout(Duration::from_millis(200), orchestrator.run(&batch)).await;

    assert!(outcome.is_err());
    // Dropping the orchestrator checks the single acquire and release
    drop(orchestrator);
}
