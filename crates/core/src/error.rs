use std::{fmt, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    #[error("Acquisition failed for {source_id}: {reason}")]
    Acquisition { source_id: String, reason: String },

    #[error("Probe failed for {}: {reason}", .media_path.display())]
    Probe { media_path: PathBuf, reason: String },

    #[error("Audio extraction failed for {}: {reason}", .media_path.display())]
    Extraction { media_path: PathBuf, reason: String },

    #[error("Transcription failed: {reason}")]
    Transcription { reason: String },

    #[error("Keyframe sampling failed for {}: {reason}", .media_path.display())]
    Sampling { media_path: PathBuf, reason: String },

    #[error("Report generation failed for {}: {reason}", .report_path.display())]
    Report { report_path: PathBuf, reason: String },

    #[error("Deadline of {seconds}s exceeded")]
    DeadlineExceeded { seconds: u64 },
}

impl AnalysisError {
    pub fn validation(reason: impl Into<String>) -> Self {
        AnalysisError::Validation {
            reason: reason.into(),
        }
    }

    pub fn transcription(reason: impl Into<String>) -> Self {
        AnalysisError::Transcription {
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Validation { .. } => "validation",
            AnalysisError::Acquisition { .. } => "acquisition",
            AnalysisError::Probe { .. } => "probe",
            AnalysisError::Extraction { .. } => "extraction",
            AnalysisError::Transcription { .. } => "transcription",
            AnalysisError::Sampling { .. } => "sampling",
            AnalysisError::Report { .. } => "report",
            AnalysisError::DeadlineExceeded { .. } => "deadline",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Position of a single analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Checking configuration; no I/O has happened yet.
    Validating,
    Acquiring,
    Probing,
    ExtractingAudio,
    Transcribing,
    Analyzing,
    SamplingFrames,
    Synthesizing,
    Done,
    Failed,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Acquiring => "acquiring",
            Stage::Probing => "probing",
            Stage::ExtractingAudio => "extracting_audio",
            Stage::Transcribing => "transcribing",
            Stage::Analyzing => "analyzing",
            Stage::SamplingFrames => "sampling_frames",
            Stage::Synthesizing => "synthesizing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The single structured failure returned for an aborted run.
#[derive(Error, Debug)]
#[error("{stage}: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: AnalysisError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: AnalysisError) -> Self {
        Self { stage, error }
    }
}
