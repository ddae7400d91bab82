//! The highlight pipeline.
//!
//! One run takes a source video to a published highlight: the best
//! interval cut out, narrated, a thumbnail and a captioned meme. Stages run
//! strictly in order. Cancellation is checked between stages only, so a
//! stage that has started always finishes, and nothing reaches the output
//! directory until every stage has succeeded.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, Instrument};

use reelcut_media::{
    move_file, probe_audio, probe_video, AudioVideoComposer, CaptionRenderer, ClipExtractor, Frame, FrameSampler,
    IntervalReconciler, ScratchDir, ThumbnailExtractor,
};
use reelcut_models::{Caption, MemeFormat, RunId, TimeInterval, VideoAsset};
use reelcut_storage::ArtifactStore;

use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::run_store::{ArtifactUrls, RunArtifacts, RunStore};

/// Thumbnail position within the finished clip.
const THUMBNAIL_POSITION: f64 = 0.5;

const VIDEO_NAME: &str = "final.mp4";
const THUMBNAIL_NAME: &str = "thumbnail.png";
const MEME_NAME: &str = "meme.png";

/// Input for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub run_id: RunId,
    pub source: PathBuf,
    /// Overrides the configured meme preset
    pub meme_format: Option<MemeFormat>,
}

impl RunRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            run_id: RunId::new(),
            source: source.into(),
            meme_format: None,
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_format(mut self, format: MemeFormat) -> Self {
        self.meme_format = Some(format);
        self
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub source: PathBuf,
    /// Raw records returned by the moment detector
    pub candidates: usize,
    /// Records left after reconciliation
    pub reconciled: usize,
    pub interval: TimeInterval,
    pub video_duration: f64,
    pub narrated: bool,
    pub frames_sampled: usize,
    pub caption: Caption,
    pub meme_format: MemeFormat,
    pub video: PathBuf,
    pub thumbnail: PathBuf,
    pub meme: PathBuf,
    pub urls: ArtifactUrls,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A meme re-rendered from a stored run.
#[derive(Debug, Clone, Serialize)]
pub struct MemeRender {
    pub run_id: RunId,
    pub frame_index: usize,
    pub path: PathBuf,
    pub url: Option<String>,
}

/// Pick the top reconciled interval, or fail the run.
pub fn select_highlight(
    reconciler: &IntervalReconciler,
    records: &[Value],
    duration: f64,
) -> WorkerResult<(TimeInterval, usize)> {
    let reconciled = reconciler.reconcile(records, duration);
    let count = reconciled.len();
    reconciled
        .into_iter()
        .next()
        .map(|best| (best, count))
        .ok_or(WorkerError::NoHighlight)
}

/// Frame cap for a clip: one per whole second, plus the first.
pub fn sample_cap(clip_duration: f64) -> usize {
    if clip_duration.is_finite() && clip_duration > 0.0 {
        clip_duration.floor() as usize + 1
    } else {
        1
    }
}

/// Reject sources longer than `max_secs`.
pub fn check_source_length(asset: &VideoAsset, max_secs: f64) -> WorkerResult<()> {
    if asset.duration > max_secs {
        return Err(WorkerError::SourceTooLong {
            duration: asset.duration,
            max: max_secs,
        });
    }
    Ok(())
}

/// Output directory for `run_id` under `output_dir`.
///
/// The id must be a single safe path component and the directory must not
/// exist yet; runs never share or overwrite a published directory.
pub async fn fresh_run_dir(output_dir: &Path, run_id: &RunId) -> WorkerResult<PathBuf> {
    let run_id = RunId::parse(run_id.as_str()).map_err(|e| WorkerError::config_error(e.to_string()))?;
    let run_dir = output_dir.join(run_id.as_str());
    if tokio::fs::try_exists(&run_dir).await? {
        return Err(WorkerError::RunExists(run_dir));
    }
    Ok(run_dir)
}

/// Move `artifacts` into `run_dir` under their new names, all or nothing.
///
/// The files are gathered in a hidden staging directory next to `run_dir`
/// that is renamed into place once every move has succeeded. On failure
/// the staging directory is removed and `run_dir` does not appear.
pub async fn publish_artifacts(run_dir: &Path, artifacts: &[(&Path, &str)]) -> WorkerResult<()> {
    if tokio::fs::try_exists(run_dir).await? {
        return Err(WorkerError::RunExists(run_dir.to_path_buf()));
    }
    let parent = match run_dir.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(parent).await?;

    let mut builder = tempfile::Builder::new();
    builder.prefix(".publish-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o755));
    }
    let staging = builder.tempdir_in(parent)?;
    for (source, name) in artifacts {
        move_file(source, staging.path().join(name)).await?;
    }

    if let Err(e) = tokio::fs::rename(staging.path(), run_dir).await {
        if tokio::fs::try_exists(run_dir).await.unwrap_or(false) {
            return Err(WorkerError::RunExists(run_dir.to_path_buf()));
        }
        return Err(e.into());
    }
    // `staging` now points at a path that no longer exists; dropping it is a no-op.
    Ok(())
}

fn checkpoint(cancel: &watch::Receiver<bool>, stage: &'static str) -> WorkerResult<()> {
    if *cancel.borrow() {
        return Err(WorkerError::Cancelled(stage));
    }
    Ok(())
}

/// Runs the media stages against a set of collaborators.
#[derive(Clone)]
pub struct HighlightPipeline {
    config: PipelineConfig,
    reconciler: IntervalReconciler,
    sampler: FrameSampler,
    extractor: ClipExtractor,
    composer: AudioVideoComposer,
    thumbnails: ThumbnailExtractor,
    renderer: CaptionRenderer,
    collaborators: Collaborators,
    store: Option<Arc<dyn ArtifactStore>>,
    runs: Arc<RunStore>,
}

impl std::fmt::Debug for HighlightPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightPipeline")
            .field("config", &self.config)
            .field("collaborators", &self.collaborators)
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

impl HighlightPipeline {
    pub fn new(config: PipelineConfig, collaborators: Collaborators, runs: Arc<RunStore>) -> Self {
        let runner = config.ffmpeg_runner();
        Self {
            reconciler: IntervalReconciler::new(config.limits),
            sampler: FrameSampler::new(runner.clone()),
            extractor: ClipExtractor::new(runner.clone(), config.encoding.clone()),
            composer: AudioVideoComposer::new(runner.clone(), config.encoding.clone()),
            thumbnails: ThumbnailExtractor::new(runner),
            renderer: CaptionRenderer::with_font(config.font_path.as_deref()),
            config,
            collaborators,
            store: None,
            runs,
        }
    }

    /// Publish finished artifacts to `store` as well as the output directory.
    pub fn with_store(mut self, store: Option<Arc<dyn ArtifactStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_renderer(mut self, renderer: CaptionRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Same stages and store, different collaborators.
    pub fn with_collaborators(&self, collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            ..self.clone()
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn runs(&self) -> &Arc<RunStore> {
        &self.runs
    }

    /// Execute one run.
    ///
    /// Setting `cancel` to `true` stops the run at the next stage boundary
    /// with [`WorkerError::Cancelled`]. The scratch directory is removed on
    /// every exit path.
    pub async fn run(&self, request: RunRequest, cancel: watch::Receiver<bool>) -> WorkerResult<RunReport> {
        let logger = RunLogger::new(&request.run_id, "run");
        let span = logger.create_span();
        let started = Instant::now();
        metrics::record_run_started();

        let result = self.execute(&request, &cancel, &logger).instrument(span).await;

        match &result {
            Ok(report) => {
                metrics::record_run_completed(started.elapsed().as_secs_f64());
                logger.log_completion(&format!(
                    "{:.1}s highlight at [{:.2}, {:.2}) published to {}",
                    report.video_duration,
                    report.interval.start,
                    report.interval.end,
                    report.video.display()
                ));
            }
            Err(e) => {
                metrics::record_run_failed(e.kind());
                logger.log_error(&e.to_string());
            }
        }
        result
    }

    async fn stage<T, F>(&self, logger: &RunLogger, name: &'static str, cancel: &watch::Receiver<bool>, work: F) -> WorkerResult<T>
    where
        F: Future<Output = WorkerResult<T>>,
    {
        checkpoint(cancel, name)?;
        let stage_logger = logger.for_stage(name);
        let started = Instant::now();
        let out = work.await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_stage(name, elapsed);
        if out.is_ok() {
            debug!(stage = name, elapsed_secs = elapsed, "Stage finished");
        } else {
            stage_logger.log_warning("stage failed");
        }
        out
    }

    async fn execute(
        &self,
        request: &RunRequest,
        cancel: &watch::Receiver<bool>,
        logger: &RunLogger,
    ) -> WorkerResult<RunReport> {
        checkpoint(cancel, "probe")?;
        let started_at = Utc::now();
        let format = request.meme_format.unwrap_or(self.config.meme_format);
        logger.log_start(&format!("source {}", request.source.display()));

        let run_dir = fresh_run_dir(&self.config.output_dir, &request.run_id).await?;
        let scratch = ScratchDir::create(&self.config.work_dir, &request.run_id)?;

        let source = self
            .stage(logger, "probe", cancel, async {
                let asset = probe_video(&request.source).await?;
                check_source_length(&asset, self.config.max_source_secs)?;
                Ok::<_, WorkerError>(asset)
            })
            .await?;
        logger.log_progress(&format!(
            "probed {}x{} @ {:.2} fps, {:.2}s",
            source.width, source.height, source.fps, source.duration
        ));

        let (candidates, interval, reconciled) = self
            .stage(logger, "detect", cancel, async {
                let records = self
                    .collaborators
                    .detector
                    .detect(&source, self.config.limits)
                    .await?;
                let (best, reconciled) = select_highlight(&self.reconciler, &records, source.duration)?;
                Ok::<_, WorkerError>((records.len(), best, reconciled))
            })
            .await?;
        logger.log_progress(&format!(
            "{} of {} candidates usable, best [{:.2}, {:.2}) score {}",
            reconciled, candidates, interval.start, interval.end, interval.score
        ));

        let clip = self
            .stage(logger, "extract", cancel, async {
                let clip = self
                    .extractor
                    .extract(&source, interval.start, interval.end, scratch.join("clip.mp4"), &scratch)
                    .await?;
                Ok::<_, WorkerError>(clip)
            })
            .await?;

        let frames = self
            .stage(logger, "sample", cancel, async {
                let cap = sample_cap(clip.duration());
                let frames = self.sampler.sample(&clip.asset, self.config.sample_fps, cap).await?;
                Ok::<_, WorkerError>(frames)
            })
            .await?;
        logger.log_progress(&format!("sampled {} frames", frames.len()));

        let (video, narrated) = match &self.collaborators.narrator {
            Some(narrator) => {
                let composed = self
                    .stage(logger, "compose", cancel, async {
                        let narration = narrator
                            .synthesize(&clip.asset, &interval, &scratch.join("narration.mp3"))
                            .await?;
                        let track = probe_audio(&narration).await?;
                        let composed = self
                            .composer
                            .compose(
                                &clip.asset,
                                &track,
                                self.config.compose_options(),
                                scratch.join(VIDEO_NAME),
                                &scratch,
                            )
                            .await?;
                        Ok::<_, WorkerError>(composed)
                    })
                    .await?;
                (composed, true)
            }
            None => {
                logger
                    .for_stage("compose")
                    .log_progress("no narrator configured, publishing the plain clip");
                (clip.asset.clone(), false)
            }
        };

        let thumbnail = self
            .stage(logger, "thumbnail", cancel, async {
                let at = video.duration * THUMBNAIL_POSITION;
                let frame = self
                    .thumbnails
                    .extract(&video, Some(at), scratch.join(THUMBNAIL_NAME))
                    .await?;
                Ok::<_, WorkerError>(frame)
            })
            .await?;

        let (caption, meme_path) = self
            .stage(logger, "caption", cancel, async {
                let frame = frames.get(frames.len() / 2).unwrap_or(&thumbnail);
                let record = self
                    .collaborators
                    .caption_writer
                    .write_caption(frame, &interval)
                    .await?;
                let caption = record.into_caption();
                let path = self
                    .renderer
                    .render_to_file(&frame.image, &caption, format, scratch.join(MEME_NAME))?;
                Ok::<_, WorkerError>((caption, path))
            })
            .await?;

        let (published, urls) = self
            .stage(logger, "publish", cancel, async {
                let thumbnail_path = scratch.join(THUMBNAIL_NAME);
                publish_artifacts(
                    &run_dir,
                    &[
                        (video.path.as_path(), VIDEO_NAME),
                        (thumbnail_path.as_path(), THUMBNAIL_NAME),
                        (meme_path.as_path(), MEME_NAME),
                    ],
                )
                .await?;
                let published = Published {
                    video: run_dir.join(VIDEO_NAME),
                    thumbnail: run_dir.join(THUMBNAIL_NAME),
                    meme: run_dir.join(MEME_NAME),
                };

                let urls = ArtifactUrls {
                    video: self.upload(&published.video).await?,
                    thumbnail: self.upload(&published.thumbnail).await?,
                    meme: self.upload(&published.meme).await?,
                };
                Ok::<_, WorkerError>((published, urls))
            })
            .await?;

        drop(scratch);

        let report = RunReport {
            run_id: request.run_id.clone(),
            source: request.source.clone(),
            candidates,
            reconciled,
            interval: interval.clone(),
            video_duration: video.duration,
            narrated,
            frames_sampled: frames.len(),
            caption: caption.clone(),
            meme_format: format,
            video: published.video.clone(),
            thumbnail: published.thumbnail.clone(),
            meme: published.meme.clone(),
            urls: urls.clone(),
            started_at,
            finished_at: Utc::now(),
        };

        self.runs
            .insert(RunArtifacts {
                run_id: request.run_id.clone(),
                interval,
                frames,
                caption,
                video: published.video,
                thumbnail: published.thumbnail,
                meme: published.meme,
                urls,
                created_at: Instant::now(),
            })
            .await;

        Ok(report)
    }

    async fn upload(&self, path: &Path) -> WorkerResult<Option<String>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let url = store.upload_path(path).await?;
        metrics::record_upload(store.name());
        debug!(path = %path.display(), url = %url, "Artifact handed off");
        Ok(Some(url))
    }

    /// Render another meme from a stored run.
    ///
    /// `frame_index` selects one of the run's sampled frames, defaulting to
    /// the middle one. The image lands next to the run's other artifacts.
    pub async fn render_meme_for_run(
        &self,
        run_id: &RunId,
        frame_index: Option<usize>,
        caption: &Caption,
        format: MemeFormat,
    ) -> WorkerResult<MemeRender> {
        let run = self
            .runs
            .get(run_id)
            .await
            .ok_or_else(|| WorkerError::RunNotFound(run_id.to_string()))?;

        let available = run.frames.len();
        let index = match frame_index.or_else(|| run.middle_frame_index()) {
            Some(i) if i < available => i,
            Some(i) => return Err(WorkerError::InvalidFrameIndex { index: i, available }),
            None => return Err(WorkerError::InvalidFrameIndex { index: 0, available }),
        };
        let frame: &Frame = &run.frames[index];

        let out_dir = run
            .output_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output_dir.join(run_id.as_str()));
        let name = format!("meme-{}-{}-{}.png", caption.kind(), format, index);
        let path = self
            .renderer
            .render_to_file(&frame.image, caption, format, out_dir.join(name))?;
        let url = self.upload(&path).await?;

        RunLogger::new(run_id, "caption").log_progress(&format!("re-rendered meme from frame {}", index));
        Ok(MemeRender {
            run_id: run_id.clone(),
            frame_index: index,
            path,
            url,
        })
    }
}

struct Published {
    video: PathBuf,
    thumbnail: PathBuf,
    meme: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{MockCaptionWriter, MockMomentDetector, MockNarrationSynthesizer};
    use crate::run_store::tests::artifacts;
    use reelcut_models::DurationLimits;
    use reelcut_storage::PlaceholderStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn pipeline(dir: &Path, collaborators: Collaborators) -> HighlightPipeline {
        let config = PipelineConfig {
            work_dir: dir.join("work"),
            output_dir: dir.join("out"),
            ..PipelineConfig::default()
        };
        HighlightPipeline::new(config, collaborators, Arc::new(RunStore::new()))
            .with_renderer(CaptionRenderer::default())
    }

    fn idle_collaborators() -> Collaborators {
        let mut detector = MockMomentDetector::new();
        detector.expect_detect().times(0);
        let mut writer = MockCaptionWriter::new();
        writer.expect_write_caption().times(0);
        let mut narrator = MockNarrationSynthesizer::new();
        narrator.expect_synthesize().times(0);
        Collaborators::new(Arc::new(detector), Arc::new(writer)).with_narrator(Arc::new(narrator))
    }

    fn asset(duration: f64) -> VideoAsset {
        VideoAsset {
            path: PathBuf::from("/tmp/source.mp4"),
            duration,
            fps: 30.0,
            width: 640,
            height: 360,
            frame_count: (duration * 30.0).round() as u64,
            has_audio: true,
        }
    }

    #[test]
    fn test_select_highlight_takes_top_score() {
        let reconciler = IntervalReconciler::new(DurationLimits::default());
        let records = vec![
            json!({"start": 1, "end": 12, "score": 6}),
            json!({"start": "oops", "end": 12}),
            json!({"start": 35, "end": 50, "score": 8}),
        ];

        let (best, count) = select_highlight(&reconciler, &records, 40.0).unwrap();
        assert_eq!(count, 2);
        assert_eq!((best.start, best.end, best.score), (35.0, 40.0, 8));
    }

    #[test]
    fn test_select_highlight_without_usable_records() {
        let reconciler = IntervalReconciler::new(DurationLimits::default());
        let records = vec![json!({"end": 3}), json!("not an object")];
        assert!(matches!(
            select_highlight(&reconciler, &records, 40.0),
            Err(WorkerError::NoHighlight)
        ));
        assert!(matches!(
            select_highlight(&reconciler, &[], 40.0),
            Err(WorkerError::NoHighlight)
        ));
    }

    #[test]
    fn test_sample_cap() {
        assert_eq!(sample_cap(8.0), 9);
        assert_eq!(sample_cap(8.7), 9);
        assert_eq!(sample_cap(0.0), 1);
        assert_eq!(sample_cap(f64::NAN), 1);
    }

    #[test]
    fn test_source_length_guard() {
        assert!(check_source_length(&asset(120.0), 120.0).is_ok());
        match check_source_length(&asset(121.5), 120.0) {
            Err(WorkerError::SourceTooLong { duration, max }) => {
                assert_eq!(duration, 121.5);
                assert_eq!(max, 120.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        let (_tx, rx) = watch::channel(true);

        let err = pipeline
            .run(RunRequest::new(dir.path().join("missing.mp4")), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Cancelled("probe")));
        assert!(!dir.path().join("work").exists());
        assert!(!dir.path().join("out").exists());
        assert!(pipeline.runs().is_empty().await);
    }

    #[tokio::test]
    async fn test_unreadable_source_fails_before_detection() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        let (_tx, rx) = watch::channel(false);

        let err = pipeline
            .run(RunRequest::new(dir.path().join("missing.mp4")), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Media(ref e) if e.is_source_problem()));
        assert!(!err.is_retryable());

        // Scratch directory is gone, its parent stays.
        let leftover = std::fs::read_dir(dir.path().join("work")).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_unsafe_run_id_rejected_before_any_work() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        let (_tx, rx) = watch::channel(false);

        let request = RunRequest::new(dir.path().join("missing.mp4")).with_run_id(RunId::from("../../escaped"));
        let err = pipeline.run(request, rx).await.unwrap_err();

        assert!(matches!(err, WorkerError::ConfigError(_)));
        assert!(!dir.path().join("work").exists());
        assert!(!dir.path().join("escaped").exists());
    }

    #[tokio::test]
    async fn test_existing_run_directory_rejected_before_any_work() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        let existing = dir.path().join("out/cat01");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("final.mp4"), b"earlier run").unwrap();
        let (_tx, rx) = watch::channel(false);

        let request = RunRequest::new(dir.path().join("missing.mp4")).with_run_id(RunId::from("cat01"));
        let err = pipeline.run(request, rx).await.unwrap_err();

        assert!(matches!(err, WorkerError::RunExists(ref p) if p == &existing));
        assert_eq!(std::fs::read(existing.join("final.mp4")).unwrap(), b"earlier run");
        assert!(!dir.path().join("work").exists());
    }

    #[tokio::test]
    async fn test_publish_artifacts_moves_everything() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (dir.path().join("clip.mp4"), dir.path().join("thumb.png"));
        std::fs::write(&a, b"video").unwrap();
        std::fs::write(&b, b"image").unwrap();

        let run_dir = dir.path().join("out/r1");
        publish_artifacts(&run_dir, &[(a.as_path(), VIDEO_NAME), (b.as_path(), THUMBNAIL_NAME)])
            .await
            .unwrap();

        assert_eq!(std::fs::read(run_dir.join(VIDEO_NAME)).unwrap(), b"video");
        assert_eq!(std::fs::read(run_dir.join(THUMBNAIL_NAME)).unwrap(), b"image");
        assert!(!a.exists() && !b.exists());
        // Only the run directory is left, no staging leftovers.
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_no_run_directory() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();
        let missing = dir.path().join("meme.png");

        let run_dir = dir.path().join("out/r2");
        let err = publish_artifacts(&run_dir, &[(video.as_path(), VIDEO_NAME), (missing.as_path(), MEME_NAME)])
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::Media(_)));
        assert!(!run_dir.exists());
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_publish_never_overwrites_an_existing_run() {
        let dir = TempDir::new().unwrap();
        let run_dir = dir.path().join("out/r3");
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(run_dir.join(MEME_NAME), b"first").unwrap();

        let meme = dir.path().join("meme.png");
        std::fs::write(&meme, b"second").unwrap();
        let err = publish_artifacts(&run_dir, &[(meme.as_path(), MEME_NAME)]).await.unwrap_err();

        assert!(matches!(err, WorkerError::RunExists(_)));
        assert_eq!(std::fs::read(run_dir.join(MEME_NAME)).unwrap(), b"first");
        assert!(meme.exists());
    }

    #[tokio::test]
    async fn test_fresh_run_dir_checks_id_and_collisions() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let run_dir = fresh_run_dir(&out, &RunId::from("cat_01")).await.unwrap();
        assert_eq!(run_dir, out.join("cat_01"));

        for bad in ["../escaped", "a/b", ""] {
            let err = fresh_run_dir(&out, &RunId::from(bad)).await.unwrap_err();
            assert!(matches!(err, WorkerError::ConfigError(_)), "{:?}", bad);
        }

        std::fs::create_dir_all(out.join("cat_01")).unwrap();
        let err = fresh_run_dir(&out, &RunId::from("cat_01")).await.unwrap_err();
        assert!(matches!(err, WorkerError::RunExists(_)));
    }

    #[tokio::test]
    async fn test_render_meme_for_run_defaults_to_middle_frame() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators()).with_store(Some(Arc::new(PlaceholderStore)));

        let mut run = artifacts("r1", 5, Instant::now());
        run.video = dir.path().join("out/r1/final.mp4");
        pipeline.runs().insert(run).await;

        let render = pipeline
            .render_meme_for_run(&RunId::from_string("r1"), None, &Caption::quote("hi"), MemeFormat::Wide)
            .await
            .unwrap();

        assert_eq!(render.frame_index, 2);
        assert_eq!(render.path, dir.path().join("out/r1/meme-quote-wide-2.png"));
        assert_eq!(render.url.as_deref(), Some("https://mock-storage.local/meme-quote-wide-2.png"));

        let img = image::open(&render.path).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 675));
    }

    #[tokio::test]
    async fn test_render_meme_for_run_rejects_bad_index() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        pipeline.runs().insert(artifacts("r2", 3, Instant::now())).await;

        let err = pipeline
            .render_meme_for_run(&RunId::from_string("r2"), Some(3), &Caption::modern("x"), MemeFormat::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidFrameIndex { index: 3, available: 3 }));

        let err = pipeline
            .render_meme_for_run(&RunId::from_string("nope"), None, &Caption::modern("x"), MemeFormat::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::RunNotFound(_)));
    }

    #[tokio::test]
    async fn test_render_meme_for_run_without_frames() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(dir.path(), idle_collaborators());
        pipeline.runs().insert(artifacts("r3", 0, Instant::now())).await;

        let err = pipeline
            .render_meme_for_run(&RunId::from_string("r3"), None, &Caption::modern("x"), MemeFormat::Square)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::InvalidFrameIndex { available: 0, .. }));
    }
}
