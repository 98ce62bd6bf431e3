use serde::Serialize;

use crate::{
    analyzer::NO_CTA_PLACEHOLDER,
    error::{PipelineFailure, Stage},
    types::AnalysisResult,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPayload {
    pub text: Option<String>,
    pub approx_time_sec: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessPayload {
    pub success: bool,
    pub video: String,
    pub duration_seconds: u64,
    pub hook: MarkerPayload,
    pub cta: MarkerPayload,
    pub transcript: String,
    pub frames: Vec<String>,
    pub excel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailurePayload {
    pub success: bool,
    pub stage: Stage,
    pub error: String,
}

/// What the boundary layer hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Success(SuccessPayload),
    Failure(FailurePayload),
}

impl AnalysisPayload {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisPayload::Success(_))
    }
}

impl From<&AnalysisResult> for AnalysisPayload {
    fn from(result: &AnalysisResult) -> Self {
        AnalysisPayload::Success(SuccessPayload {
            success: true,
            video: result.source_id.clone(),
            duration_seconds: result.duration_secs,
            hook: MarkerPayload {
                text: result.hook.text().map(str::to_string),
                approx_time_sec: result.hook.start_sec,
            },
            cta: MarkerPayload {
                text: Some(
                    result
                        .cta
                        .text()
                        .unwrap_or(NO_CTA_PLACEHOLDER)
                        .to_string(),
                ),
                approx_time_sec: result.cta.start_sec,
            },
            transcript: result.transcript.clone(),
            frames: result.keyframes.clone(),
            excel: result.report.clone(),
        })
    }
}

impl From<&PipelineFailure> for AnalysisPayload {
    fn from(failure: &PipelineFailure) -> Self {
        AnalysisPayload::Failure(FailurePayload {
            success: false,
            stage: failure.stage,
            error: failure.to_string(),
        })
    }
}

impl From<&Result<AnalysisResult, PipelineFailure>> for AnalysisPayload {
    fn from(outcome: &Result<AnalysisResult, PipelineFailure>) -> Self {
        match outcome {
            Ok(result) => result.into(),
            Err(failure) => failure.into(),
        }
    }
}
