use std::{path::PathBuf, sync::Arc};

use tokio::{fs, sync::watch, task::JoinHandle};
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::{
    acquire::{Downloader, YtDlp, acquire},
    analyzer::analyze,
    config::AnalyzerConfig,
    error::{AnalysisError, PipelineFailure, Result, Stage},
    media::{Ffmpeg, MediaProber, Transcoder, sample_keyframes},
    report::{ReportRow, ReportSummary, ReportWriter, XlsxReportWriter, report_rows},
    storage::{artifact_tag, audio_path, frames_dir, relative_path, report_path},
    temp::{PathLocks, TempArtifact},
    transcribe::{Transcriber, WAV_CONTENT_TYPE},
    types::{AnalysisRequest, AnalysisResult, MediaAsset},
};

pub type Outcome = std::result::Result<AnalysisResult, PipelineFailure>;

/// External collaborators used by every run.
#[derive(Clone)]
pub struct Toolkit {
    pub downloader: Arc<dyn Downloader>,
    pub prober: Arc<dyn MediaProber>,
    pub transcoder: Arc<dyn Transcoder>,
    pub transcriber: Arc<dyn Transcriber>,
    pub report_writer: Arc<dyn ReportWriter>,
}

impl Toolkit {
    /// yt-dlp, ffmpeg/ffprobe from `PATH` and an xlsx report writer.
    pub fn system(transcriber: Arc<dyn Transcriber>) -> Self {
        let ffmpeg = Arc::new(Ffmpeg::default());
        Self {
            downloader: Arc::new(YtDlp::default()),
            prober: ffmpeg.clone(),
            transcoder: ffmpeg,
            transcriber,
            report_writer: Arc::new(XlsxReportWriter),
        }
    }
}

/// A run started with [`Pipeline::spawn`].
pub struct AnalysisHandle {
    pub progress: watch::Receiver<Stage>,
    pub task: JoinHandle<Outcome>,
}

/// Runs analysis requests. Cheap to clone; runs share only the waveform locks.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: AnalyzerConfig,
    toolkit: Toolkit,
    waveforms: PathLocks,
}

impl Pipeline {
    pub fn new(config: AnalyzerConfig, toolkit: Toolkit) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                config,
                toolkit,
                waveforms: PathLocks::default(),
            }),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.inner.config
    }

    /// Run `request` on its own task so slow stages do not hold up other runs.
    pub fn spawn(&self, request: AnalysisRequest) -> AnalysisHandle {
        let (tx, rx) = watch::channel(Stage::Validating);
        let pipeline = self.clone();
        let task = tokio::spawn(async move { pipeline.run_with_progress(request, tx).await });
        AnalysisHandle { progress: rx, task }
    }

    pub async fn run(&self, request: AnalysisRequest) -> Outcome {
        let (tx, _rx) = watch::channel(Stage::Validating);
        self.run_with_progress(request, tx).await
    }

    /// Run `request` to completion, publishing every stage transition.
    ///
    /// The temporary waveform is gone by the time this returns, whatever the
    /// outcome. With a deadline configured, expiry drops the in-flight stage
    /// and reports it as the failing stage.
    pub async fn run_with_progress(
        &self,
        request: AnalysisRequest,
        progress: watch::Sender<Stage>,
    ) -> Outcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id, source = %request.source_id());

        async move {
            let config = &self.inner.config;
            if let Err(e) = config.validate() {
                progress.send_replace(Stage::Failed);
                return Err(PipelineFailure::new(Stage::Validating, e));
            }

            let run = self.execute(&request, &progress);
            let outcome = match config.deadline {
                Some(deadline) => match tokio::time::timeout(deadline, run).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        let stage = *progress.borrow();
                        Err(PipelineFailure::new(
                            stage,
                            AnalysisError::DeadlineExceeded {
                                seconds: deadline.as_secs(),
                            },
                        ))
                    }
                },
                None => run.await,
            };

            match &outcome {
                Ok(result) => {
                    progress.send_replace(Stage::Done);
                    info!(
                        duration_secs = result.duration_secs,
                        hook_index = result.hook.index(),
                        cta_index = result.cta.index(),
                        keyframes = result.keyframes.len(),
                        "analysis finished"
                    );
                }
                Err(failure) => {
                    progress.send_replace(Stage::Failed);
                    error!(
                        stage = %failure.stage,
                        kind = failure.error.kind(),
                        error = %failure.error,
                        "analysis failed"
                    );
                }
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, request: &AnalysisRequest, progress: &watch::Sender<Stage>) -> Outcome {
        let config = &self.inner.config;
        let tools = &self.inner.toolkit;
        let tag = artifact_tag();

        let enter = |stage: Stage| {
            progress.send_replace(stage);
            info!(%stage, "entering stage");
            stage
        };
        let at = |stage: Stage| move |error: AnalysisError| PipelineFailure::new(stage, error);

        let stage = enter(Stage::Acquiring);
        let media_path = acquire(request, tools.downloader.as_ref(), &config.output_dir, &tag)
            .await
            .map_err(at(stage))?;

        let stage = enter(Stage::Probing);
        let duration_secs = tools.prober.probe(&media_path).await.map_err(at(stage))?;
        let media = MediaAsset {
            path: media_path,
            duration_secs,
        };
        info!(duration_secs, "probed media");

        let stage = enter(Stage::ExtractingAudio);
        let waveform_path = audio_path(&media.path);
        // Declared before the artifact so the file is gone before the path is released.
        let waveform_owner = self.inner.waveforms.lock(&waveform_path).await;
        let audio = TempArtifact::new(waveform_path);
        tools
            .transcoder
            .extract_audio(&media.path, audio.path())
            .await
            .map_err(at(stage))?;

        let stage = enter(Stage::Transcribing);
        let waveform = fs::read(audio.path()).await.map_err(|e| {
            PipelineFailure::new(
                stage,
                AnalysisError::transcription(format!(
                    "cannot read {}: {}",
                    audio.path().display(),
                    e
                )),
            )
        })?;
        let transcript = tools
            .transcriber
            .transcribe(waveform, WAV_CONTENT_TYPE)
            .await
            .map_err(at(stage))?;
        drop(audio);
        drop(waveform_owner);

        enter(Stage::Analyzing);
        let analysis = analyze(&transcript, media.duration_secs);
        info!(
            sentences = analysis.sentences.len(),
            hook_index = analysis.hook.index(),
            cta_index = analysis.cta.index(),
            "analyzed transcript"
        );

        let stage = enter(Stage::SamplingFrames);
        let keyframes = sample_keyframes(
            tools.transcoder.as_ref(),
            &media.path,
            &frames_dir(&config.output_dir, &tag),
            config.keyframe_interval_secs,
        )
        .await
        .map_err(at(stage))?;

        let stage = enter(Stage::Synthesizing);
        let source_id = request.source_id();
        let rows = report_rows(&ReportSummary {
            source_id: &source_id,
            duration_secs: media.duration_secs,
            hook: &analysis.hook,
            cta: &analysis.cta,
            transcript: &analysis.transcript,
            keyframe_count: keyframes.len(),
        });
        let report = write_report(
            Arc::clone(&tools.report_writer),
            rows,
            report_path(&config.output_dir, &tag),
        )
        .await
        .map_err(at(stage))?;

        Ok(AnalysisResult {
            source_id,
            duration_secs: media.duration_secs,
            transcript: analysis.transcript,
            sentences: analysis.sentences,
            timings: analysis.timings,
            hook: analysis.hook,
            cta: analysis.cta,
            keyframes: keyframes
                .frames
                .iter()
                .map(|f| relative_path(&config.output_dir, f))
                .collect(),
            report: relative_path(&config.output_dir, &report),
        })
    }
}

async fn write_report(
    writer: Arc<dyn ReportWriter>,
    rows: Vec<ReportRow>,
    dest: PathBuf,
) -> Result<PathBuf> {
    let report_path = dest.clone();
    tokio::task::spawn_blocking(move || writer.write_report(&rows, &dest))
        .await
        .map_err(|e| AnalysisError::Report {
            report_path,
            reason: format!("report task failed: {e}"),
        })?
}
