use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AnalysisError, Result};

/// What the caller wants analyzed: a file already on disk or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Upload(PathBuf),
    Url(String),
}

impl AnalysisRequest {
    /// Build a request from the two optional inputs of the boundary layer.
    ///
    /// Exactly one must be present. The URL form is checked without touching
    /// the network; the upload form only checks that the file is readable.
    pub fn from_parts(file: Option<PathBuf>, url: Option<String>) -> Result<Self> {
        match (file, url) {
            (Some(_), Some(_)) => Err(AnalysisError::validation(
                "provide either an uploaded file or a URL, not both",
            )),
            (None, None) => Err(AnalysisError::validation(
                "provide an uploaded file or a URL",
            )),
            (None, Some(url)) => Self::url(url),
            (Some(file), None) => Self::upload(file),
        }
    }

    pub fn url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let parsed = Url::parse(url.trim())
            .map_err(|e| AnalysisError::validation(format!("invalid URL {url:?}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AnalysisError::validation(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }
        Ok(AnalysisRequest::Url(parsed.into()))
    }

    pub fn upload(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(AnalysisRequest::Upload(path)),
            Ok(_) => Err(AnalysisError::validation(format!(
                "{} is not a regular file",
                path.display()
            ))),
            Err(e) => Err(AnalysisError::validation(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Human-facing identifier: the URL, or the uploaded file's name.
    pub fn source_id(&self) -> String {
        match self {
            AnalysisRequest::Url(url) => url.clone(),
            AnalysisRequest::Upload(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Canonical transcript shape, independent of the speech service used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Option<Vec<Segment>>,
}

impl Transcript {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            segments: None,
        }
    }

    /// Whitespace runs collapsed to single spaces, trimmed.
    pub fn normalized(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sentence {
    pub index: usize,
    pub text: String,
    /// Length in characters, the proxy for spoken duration.
    pub char_len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentenceTiming {
    pub index: usize,
    pub start_sec: u64,
    pub end_sec: u64,
}

/// A detected marker sentence. `sentence` is `None` when nothing qualified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Finding {
    pub sentence: Option<Sentence>,
    pub start_sec: Option<u64>,
}

impl Finding {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.sentence.as_ref().map(|s| s.text.as_str())
    }

    /// Sentence index, or -1 when absent.
    pub fn index(&self) -> i64 {
        self.sentence.as_ref().map(|s| s.index as i64).unwrap_or(-1)
    }

    pub fn is_present(&self) -> bool {
        self.sentence.is_some()
    }
}

pub type HookFinding = Finding;
pub type CtaFinding = Finding;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyframeSet {
    pub frames: Vec<PathBuf>,
}

impl KeyframeSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Terminal output of a successful run. Paths are relative to the output dir.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub source_id: String,
    pub duration_secs: u64,
    pub transcript: String,
    pub sentences: Vec<Sentence>,
    pub timings: Vec<SentenceTiming>,
    pub hook: HookFinding,
    pub cta: CtaFinding,
    pub keyframes: Vec<String>,
    pub report: String,
}

impl AnalysisResult {
    pub fn report_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_needs_exactly_one_input() {
        let both = AnalysisRequest::from_parts(
            Some(PathBuf::from("clip.mp4")),
            Some("https://example.com/v".into()),
        );
        assert_eq!(both.unwrap_err().kind(), "validation");

        let neither = AnalysisRequest::from_parts(None, None);
        assert_eq!(neither.unwrap_err().kind(), "validation");
    }

    #[test]
    fn url_requests_must_be_http() {
        assert!(AnalysisRequest::url("https://youtu.be/abc").is_ok());
        assert!(AnalysisRequest::url("ftp://example.com/v.mp4").is_err());
        assert!(AnalysisRequest::url("not a url").is_err());
    }

    #[test]
    fn upload_must_be_a_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AnalysisRequest::upload(dir.path()).is_err());
        assert!(AnalysisRequest::upload(dir.path().join("missing.mp4")).is_err());

        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"x").unwrap();
        let request = AnalysisRequest::from_parts(Some(file.clone()), None).unwrap();
        assert_eq!(request, AnalysisRequest::Upload(file));
        assert_eq!(request.source_id(), "clip.mp4");
    }

    #[test]
    fn normalization_collapses_whitespace() {
        let t = Transcript::from_text("\n  Hello \t\t there\n\nfriend  ");
        assert_eq!(t.normalized(), "Hello there friend");
    }
}
