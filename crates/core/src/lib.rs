//! Hookscan Core Library
//!
//! Turns a video into a transcript, finds its opening hook and its call to
//! action, samples keyframes and writes a tabular report.

pub mod acquire;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod format;
pub mod media;
pub mod payload;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod storage;
pub mod temp;
pub mod transcribe;
pub mod types;

// Re-export commonly used items at crate root
pub use acquire::{Downloader, YtDlp};
pub use analyzer::{TranscriptAnalysis, analyze};
pub use config::AnalyzerConfig;
pub use error::{AnalysisError, PipelineFailure, Result, Stage};
pub use format::{format_analysis_readable, format_timestamp};
pub use media::{Ffmpeg, MediaProber, Transcoder};
pub use payload::AnalysisPayload;
pub use pipeline::{AnalysisHandle, Outcome, Pipeline, Toolkit};
pub use provider::{Provider, TranscriberConfig};
pub use report::{ReportRow, ReportValue, ReportWriter, XlsxReportWriter};
pub use transcribe::{HttpTranscriber, Transcriber};
#[cfg(feature = "local-whisper")]
pub use transcribe::LocalWhisperTranscriber;
pub use types::{
    AnalysisRequest, AnalysisResult, Finding, KeyframeSet, MediaAsset, Segment, Sentence,
    SentenceTiming, Transcript,
};
