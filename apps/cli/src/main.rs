use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[cfg(feature = "local-whisper")]
use hookscan_core::LocalWhisperTranscriber;
use hookscan_core::{
    AnalysisPayload, AnalysisRequest, AnalyzerConfig, HttpTranscriber, Outcome, Pipeline,
    Provider, Stage, Toolkit, Transcriber, TranscriberConfig, format_analysis_readable,
    provider::DEFAULT_TRANSCRIPTION_TIMEOUT,
};

mod logging;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Huggingface,
    Openai,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Huggingface => Provider::HuggingFace,
            CliProvider::Openai => Provider::OpenAi,
        }
    }
}

#[derive(Parser)]
#[command(name = "hookscan")]
#[command(
    about = "Transcribe videos, locate the opening hook and call to action, sample keyframes and write a report"
)]
struct Cli {
    /// Video URLs or local video files, analyzed concurrently
    sources: Vec<String>,

    /// Local video file to analyze
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Video URL to download and analyze
    #[arg(short, long)]
    url: Option<String>,

    /// Directory for downloads, keyframes and reports
    #[arg(short, long, env = "HOOKSCAN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Seconds between sampled keyframes
    #[arg(short, long, default_value_t = 3)]
    interval: u32,

    /// Abort a single analysis after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Speech-to-text service
    #[arg(short, long, value_enum, default_value = "huggingface")]
    provider: CliProvider,

    /// Override the provider's default speech model
    #[arg(short, long)]
    model: Option<String>,

    /// Per-call timeout for the speech-to-text service
    #[arg(long, default_value_t = DEFAULT_TRANSCRIPTION_TIMEOUT.as_secs())]
    transcription_timeout_secs: u64,

    /// API token; defaults to HF_TOKEN or OPENAI_API_KEY depending on provider
    #[arg(long, env = "HOOKSCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Transcribe in-process with this GGML whisper model instead of a service
    #[cfg(feature = "local-whisper")]
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Print one JSON payload per request instead of readable output
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON (also LOG_FORMAT=json)
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Every requested source, validated before anything runs.
    fn requests(&self) -> hookscan_core::Result<Vec<AnalysisRequest>> {
        let mut requests = Vec::new();
        if self.file.is_some() || self.url.is_some() {
            requests.push(AnalysisRequest::from_parts(
                self.file.clone(),
                self.url.clone(),
            )?);
        }
        for source in &self.sources {
            let request = if source.starts_with("http://") || source.starts_with("https://") {
                AnalysisRequest::url(source.as_str())?
            } else {
                AnalysisRequest::upload(source.as_str())?
            };
            requests.push(request);
        }
        if requests.is_empty() {
            requests.push(AnalysisRequest::from_parts(None, None)?);
        }
        Ok(requests)
    }

    fn analyzer_config(&self) -> AnalyzerConfig {
        let mut config = match &self.output_dir {
            Some(dir) => AnalyzerConfig::new(dir),
            None => AnalyzerConfig::default(),
        }
        .with_keyframe_interval(self.interval);
        if let Some(secs) = self.deadline_secs {
            config = config.with_deadline(Duration::from_secs(secs));
        }
        config
    }

    fn transcriber(&self) -> Result<Arc<dyn Transcriber>> {
        #[cfg(feature = "local-whisper")]
        if let Some(model_path) = &self.model_path {
            return Ok(Arc::new(LocalWhisperTranscriber::new(model_path)?));
        }

        let provider: Provider = self.provider.into();
        let api_key = match &self.api_key {
            Some(key) => key.clone(),
            None => {
                let env_var = provider.config().env_var;
                std::env::var(env_var).with_context(|| {
                    format!("{env_var} not set (or pass --api-key for {provider})")
                })?
            }
        };

        let mut config = TranscriberConfig::new(provider, api_key)
            .with_timeout(Duration::from_secs(self.transcription_timeout_secs));
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        Ok(Arc::new(HttpTranscriber::new(config)?))
    }
}

fn create_spinner(multi: &MultiProgress, msg: &str) -> ProgressBar {
    let pb = multi.add(ProgressBar::new_spinner());
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Validating => "Queued",
        Stage::Acquiring => "Acquiring video...",
        Stage::Probing => "Probing duration...",
        Stage::ExtractingAudio => "Extracting audio...",
        Stage::Transcribing => "Transcribing...",
        Stage::Analyzing => "Finding hook and call to action...",
        Stage::SamplingFrames => "Sampling keyframes...",
        Stage::Synthesizing => "Writing report...",
        Stage::Done => "Done",
        Stage::Failed => "Failed",
    }
}

fn print_outcome(outcome: &Outcome, config: &AnalyzerConfig, json: bool) -> Result<()> {
    if json {
        let payload = AnalysisPayload::from(outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    match outcome {
        Ok(result) => {
            println!(
                "\n{} {}\n",
                style("Saved:").dim(),
                style(result.report_path(&config.output_dir).display()).cyan()
            );
            println!("{}", style("─".repeat(60)).dim());
            println!("{}", format_analysis_readable(result));
        }
        Err(failure) => {
            eprintln!("{} {}", style("Error:").red().bold(), failure);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_tracing(logging::json_requested(cli.log_json));

    let requests = match cli.requests() {
        Ok(requests) => requests,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(2);
        }
    };

    let config = cli.analyzer_config();
    if let Err(e) = config.validate() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(2);
    }

    let transcriber = match cli.transcriber() {
        Ok(transcriber) => transcriber,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    if !cli.json {
        println!(
            "\n{}  {}\n",
            style("hookscan").cyan().bold(),
            style("Hook & CTA Analyzer").dim()
        );
    }

    let pipeline = Pipeline::new(config.clone(), Toolkit::system(transcriber));
    let multi = MultiProgress::new();
    let total_start = Instant::now();

    let mut runs = Vec::with_capacity(requests.len());
    for request in requests {
        let label = request.source_id();
        let spinner = create_spinner(&multi, &format!("{} {}", style(&label).dim(), "Queued"));
        let handle = pipeline.spawn(request);

        let mut progress = handle.progress.clone();
        let watcher = spinner.clone();
        let watched_label = label.clone();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let stage = *progress.borrow_and_update();
                watcher.set_message(format!(
                    "{} {}",
                    style(&watched_label).dim(),
                    stage_message(stage)
                ));
                if stage.is_terminal() {
                    break;
                }
            }
        });

        runs.push((label, spinner, handle));
    }

    let mut outcomes = Vec::with_capacity(runs.len());
    for (label, spinner, handle) in runs {
        let outcome = handle.task.await.context("analysis task panicked")?;
        let elapsed = style(format!("[{}]", format_duration(total_start.elapsed()))).dim();
        match &outcome {
            Ok(result) => spinner.finish_with_message(format!(
                "{} {}: {}s, {} keyframes {}",
                style("✓").green().bold(),
                label,
                result.duration_secs,
                result.keyframes.len(),
                elapsed
            )),
            Err(failure) => spinner.finish_with_message(format!(
                "{} {}: failed while {} {}",
                style("✗").red().bold(),
                label,
                style(failure.stage).yellow(),
                elapsed
            )),
        }
        outcomes.push(outcome);
    }

    if !cli.json {
        println!(
            "\n{} {}",
            style("Total time:").dim(),
            style(format_duration(total_start.elapsed())).cyan().bold()
        );
    }

    let mut failed = 0;
    for outcome in &outcomes {
        print_outcome(outcome, &config, cli.json)?;
        if outcome.is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
