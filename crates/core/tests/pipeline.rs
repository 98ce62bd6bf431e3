use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use hookscan_core::{
    AnalysisError, AnalysisPayload, AnalysisRequest, AnalyzerConfig, Downloader, MediaProber,
    Pipeline, ReportRow, ReportWriter, Result, Stage, Toolkit, Transcoder, Transcript,
    Transcriber, XlsxReportWriter,
};

#[derive(Default)]
struct Calls {
    downloads: AtomicUsize,
    probes: AtomicUsize,
    extractions: AtomicUsize,
    transcriptions: AtomicUsize,
    samples: AtomicUsize,
    audio_paths: Mutex<Vec<PathBuf>>,
}

struct FakeDownloader(Arc<Calls>);

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch(&self, _url: &str, destination: &Path) -> Result<PathBuf> {
        self.0.downloads.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(destination, b"fake mp4").await.unwrap();
        Ok(destination.to_path_buf())
    }
}

struct FakeProber {
    calls: Arc<Calls>,
    duration: u64,
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, _path: &Path) -> Result<u64> {
        self.calls.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.duration)
    }
}

struct FakeTranscoder {
    calls: Arc<Calls>,
    frames: usize,
    fail_extraction: bool,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn extract_audio(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        self.calls.extractions.fetch_add(1, Ordering::SeqCst);
        self.calls.audio_paths.lock().unwrap().push(dst.to_path_buf());
        tokio::fs::write(dst, b"RIFF....WAVE").await.unwrap();
        if self.fail_extraction {
            return Err(AnalysisError::Extraction {
                media_path: src.to_path_buf(),
                reason: "unsupported codec".into(),
            });
        }
        Ok(dst.to_path_buf())
    }

    async fn sample_frames(
        &self,
        _src: &Path,
        out_dir: &Path,
        _interval_secs: u32,
    ) -> Result<Vec<PathBuf>> {
        self.calls.samples.fetch_add(1, Ordering::SeqCst);
        let mut frames = Vec::new();
        for i in 1..=self.frames {
            let frame = out_dir.join(format!("frame-{:04}.jpg", i));
            tokio::fs::write(&frame, b"jpg").await.unwrap();
            frames.push(frame);
        }
        Ok(frames)
    }
}

enum Reply {
    Text(&'static str),
    Fail,
    Hang,
}

struct FakeTranscriber {
    calls: Arc<Calls>,
    reply: Reply,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcript> {
        self.calls.transcriptions.fetch_add(1, Ordering::SeqCst);
        assert_eq!(content_type, "audio/wav");
        assert!(!audio.is_empty());
        match self.reply {
            Reply::Text(text) => Ok(Transcript::from_text(text)),
            Reply::Fail => Err(AnalysisError::transcription("status 503: model loading")),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Transcript::default())
            }
        }
    }
}

struct Harness {
    calls: Arc<Calls>,
    pipeline: Pipeline,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new(reply: Reply) -> Self {
        Self::with(reply, AnalyzerConfig::default(), false, None)
    }

    fn with(
        reply: Reply,
        config: AnalyzerConfig,
        fail_extraction: bool,
        report_writer: Option<Arc<dyn ReportWriter>>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(Calls::default());
        let config = AnalyzerConfig {
            output_dir: dir.path().join("uploads"),
            ..config
        };
        let toolkit = Toolkit {
            downloader: Arc::new(FakeDownloader(calls.clone())),
            prober: Arc::new(FakeProber {
                calls: calls.clone(),
                duration: 30,
            }),
            transcoder: Arc::new(FakeTranscoder {
                calls: calls.clone(),
                frames: 10,
                fail_extraction,
            }),
            transcriber: Arc::new(FakeTranscriber {
                calls: calls.clone(),
                reply,
            }),
            report_writer: report_writer.unwrap_or_else(|| Arc::new(XlsxReportWriter)),
        };

        Self {
            calls,
            pipeline: Pipeline::new(config, toolkit),
            dir,
        }
    }

    fn upload(&self, name: &str) -> AnalysisRequest {
        let path = self.dir.path().join(name);
        std::fs::write(&path, b"fake video").unwrap();
        AnalysisRequest::upload(path).unwrap()
    }

    fn audio_paths(&self) -> Vec<PathBuf> {
        self.calls.audio_paths.lock().unwrap().clone()
    }
}

const SCRIPT: &str = "Hi there.  This changes everything forever and completely.\n\
                      Buy now!";

#[tokio::test]
async fn uploaded_video_is_fully_analyzed() {
    let harness = Harness::new(Reply::Text(SCRIPT));
    let request = harness.upload("clip.mp4");

    let result = harness.pipeline.run(request).await.unwrap();

    assert_eq!(result.source_id, "clip.mp4");
    assert_eq!(result.duration_secs, 30);
    assert_eq!(
        result.transcript,
        "Hi there. This changes everything forever and completely. Buy now!"
    );
    assert_eq!(result.hook.text(), Some("Hi there"));
    assert_eq!(result.hook.start_sec, Some(0));
    assert_eq!(result.cta.text(), Some("Buy now"));
    assert_eq!(result.cta.index(), 2);
    assert_eq!(result.timings.len(), result.sentences.len());
    assert_eq!(result.timings.last().unwrap().end_sec, 30);

    assert_eq!(result.keyframes.len(), 10);
    assert!(result.keyframes[0].starts_with("frames_"));
    assert!(result.keyframes[0].ends_with("/frame-0001.jpg"));
    assert!(result.report.starts_with("analysis_") && result.report.ends_with(".xlsx"));
    assert!(result.report_path(&harness.pipeline.config().output_dir).is_file());

    assert_eq!(harness.calls.downloads.load(Ordering::SeqCst), 0);
    for audio in harness.audio_paths() {
        assert!(!audio.exists(), "{} should be removed", audio.display());
    }
    assert!(harness.dir.path().join("clip.mp4").exists());
}

#[tokio::test]
async fn url_request_downloads_first() {
    let harness = Harness::new(Reply::Text("Visit our site."));
    let request = AnalysisRequest::url("https://example.com/watch?v=abc").unwrap();

    let result = harness.pipeline.run(request).await.unwrap();

    assert_eq!(harness.calls.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(result.source_id, "https://example.com/watch?v=abc");
    assert_eq!(result.cta.text(), Some("Visit our site"));
    let audio = harness.audio_paths();
    assert_eq!(audio.len(), 1);
    assert!(audio[0].starts_with(harness.pipeline.config().output_dir.as_path()));
    assert!(!audio[0].exists());
}

#[tokio::test]
async fn empty_transcript_is_a_successful_result_without_markers() {
    let harness = Harness::new(Reply::Text(""));
    let request = harness.upload("silent.mp4");

    let result = harness.pipeline.run(request).await.unwrap();
    assert!(!result.hook.is_present());
    assert!(!result.cta.is_present());
    assert!(result.timings.is_empty());

    let payload = serde_json::to_value(AnalysisPayload::from(&result)).unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["hook"]["text"], serde_json::Value::Null);
    assert_eq!(payload["cta"]["text"], "No CTA found");
}

#[tokio::test]
async fn transcription_failure_aborts_and_cleans_up() {
    let harness = Harness::new(Reply::Fail);
    let request = harness.upload("clip.mp4");

    let failure = harness.pipeline.run(request).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Transcribing);
    assert_eq!(failure.error.kind(), "transcription");
    assert!(failure.to_string().contains("503"));
    assert_eq!(harness.calls.samples.load(Ordering::SeqCst), 0);
    let audio = harness.audio_paths();
    assert_eq!(audio.len(), 1);
    assert!(!audio[0].exists());
}

#[tokio::test]
async fn extraction_failure_still_removes_partial_waveform() {
    let harness = Harness::with(Reply::Text(SCRIPT), AnalyzerConfig::default(), true, None);
    let request = harness.upload("clip.mov");

    let failure = harness.pipeline.run(request).await.unwrap_err();

    assert_eq!(failure.stage, Stage::ExtractingAudio);
    assert_eq!(harness.calls.transcriptions.load(Ordering::SeqCst), 0);
    assert!(!harness.audio_paths()[0].exists());
}

struct BrokenWriter;

impl ReportWriter for BrokenWriter {
    fn write_report(&self, _rows: &[ReportRow], dest: &Path) -> Result<PathBuf> {
        Err(AnalysisError::Report {
            report_path: dest.to_path_buf(),
            reason: "disk full".into(),
        })
    }
}

#[tokio::test]
async fn report_failure_fails_the_request() {
    let harness = Harness::with(
        Reply::Text(SCRIPT),
        AnalyzerConfig::default(),
        false,
        Some(Arc::new(BrokenWriter)),
    );
    let request = harness.upload("clip.mp4");

    let outcome = harness.pipeline.run(request).await;
    let payload = serde_json::to_value(AnalysisPayload::from(&outcome)).unwrap();

    assert_eq!(payload["success"], false);
    assert_eq!(payload["stage"], "synthesizing");
    assert!(payload["error"].as_str().unwrap().contains("disk full"));
    assert!(payload.get("transcript").is_none());
}

#[tokio::test]
async fn invalid_interval_is_rejected_before_any_io() {
    let harness = Harness::with(
        Reply::Text(SCRIPT),
        AnalyzerConfig::default().with_keyframe_interval(0),
        false,
        None,
    );
    let request = AnalysisRequest::url("https://example.com/v").unwrap();

    let failure = harness.pipeline.run(request).await.unwrap_err();

    assert_eq!(failure.stage, Stage::Validating);
    assert_eq!(failure.error.kind(), "validation");
    assert_eq!(harness.calls.downloads.load(Ordering::SeqCst), 0);
    assert_eq!(harness.calls.probes.load(Ordering::SeqCst), 0);
    assert!(!harness.pipeline.config().output_dir.exists());
}

#[tokio::test]
async fn request_without_inputs_never_reaches_the_pipeline() {
    let harness = Harness::new(Reply::Text(SCRIPT));

    let err = AnalysisRequest::from_parts(None, None).unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert_eq!(harness.calls.downloads.load(Ordering::SeqCst), 0);
    assert_eq!(harness.calls.extractions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deadline_cancels_the_running_stage_and_cleans_up() {
    let harness = Harness::with(
        Reply::Hang,
        AnalyzerConfig::default().with_deadline(Duration::from_secs(1)),
        false,
        None,
    );
    let request = harness.upload("clip.mp4");

    let handle = harness.pipeline.spawn(request);
    let progress = handle.progress.clone();
    let failure = handle.task.await.unwrap().unwrap_err();

    assert_eq!(failure.stage, Stage::Transcribing);
    assert!(matches!(
        failure.error,
        AnalysisError::DeadlineExceeded { seconds: 1 }
    ));
    assert_eq!(*progress.borrow(), Stage::Failed);
    assert!(!harness.audio_paths()[0].exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_independent() {
    let harness = Harness::new(Reply::Text(SCRIPT));

    let handles: Vec<_> = (0..4)
        .map(|i| harness.pipeline.spawn(harness.upload(&format!("clip{i}.mp4"))))
        .collect();

    let mut reports = Vec::new();
    for handle in handles {
        let result = handle.task.await.unwrap().unwrap();
        assert_eq!(*handle.progress.borrow(), Stage::Done);
        reports.push(result.report);
    }

    reports.sort();
    reports.dedup();
    assert_eq!(reports.len(), 4);
    assert_eq!(harness.calls.transcriptions.load(Ordering::SeqCst), 4);
    assert!(harness.audio_paths().iter().all(|p| !p.exists()));
}

/// Writes a waveform naming its source, then lingers so runs overlap.
struct NamingTranscoder;

#[async_trait]
impl Transcoder for NamingTranscoder {
    async fn extract_audio(&self, src: &Path, dst: &Path) -> Result<PathBuf> {
        let name = src.file_name().unwrap().to_string_lossy().into_owned();
        tokio::fs::write(dst, format!("Audio of {name}.")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(dst.to_path_buf())
    }

    async fn sample_frames(
        &self,
        _src: &Path,
        _out_dir: &Path,
        _interval_secs: u32,
    ) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, _content_type: &str) -> Result<Transcript> {
        Ok(Transcript::from_text(String::from_utf8(audio).unwrap()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_stem_uploads_keep_their_own_waveform() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Calls::default());
    let toolkit = Toolkit {
        downloader: Arc::new(FakeDownloader(calls.clone())),
        prober: Arc::new(FakeProber {
            calls: calls.clone(),
            duration: 10,
        }),
        transcoder: Arc::new(NamingTranscoder),
        transcriber: Arc::new(EchoTranscriber),
        report_writer: Arc::new(XlsxReportWriter),
    };
    let pipeline = Pipeline::new(AnalyzerConfig::new(dir.path().join("out")), toolkit);

    let mut handles = Vec::new();
    for name in ["clip.mp4", "clip.mov", "clip.mp4"] {
        let path = dir.path().join(name);
        std::fs::write(&path, b"video").unwrap();
        handles.push((name, pipeline.spawn(AnalysisRequest::upload(path).unwrap())));
    }

    for (name, handle) in handles {
        let result = handle.task.await.unwrap().unwrap();
        assert_eq!(result.transcript, format!("Audio of {name}."));
    }
    assert!(!dir.path().join("clip.wav").exists());
}

