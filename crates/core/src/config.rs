use std::{path::PathBuf, time::Duration};

use crate::{
    error::{AnalysisError, Result},
    storage::default_output_dir,
};

pub const DEFAULT_KEYFRAME_INTERVAL_SECS: u32 = 3;

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Downloads, keyframe directories and reports are written here.
    pub output_dir: PathBuf,
    pub keyframe_interval_secs: u32,
    /// Overall bound on a single run, if any.
    pub deadline: Option<Duration>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            keyframe_interval_secs: DEFAULT_KEYFRAME_INTERVAL_SECS,
            deadline: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_keyframe_interval(mut self, secs: u32) -> Self {
        self.keyframe_interval_secs = secs;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.keyframe_interval_secs == 0 {
            return Err(AnalysisError::validation(
                "keyframe interval must be a positive number of seconds",
            ));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(AnalysisError::validation("deadline must be positive"));
        }
        Ok(())
    }
}
