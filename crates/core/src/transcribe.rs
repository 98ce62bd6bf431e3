use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{AnalysisError, Result},
    provider::{Provider, TranscriberConfig},
    types::{Segment, Transcript},
};

pub const WAV_CONTENT_TYPE: &str = "audio/wav";

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// One attempt, no retry: audio does not change between attempts.
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcript>;
}

/// Timed entry in the `segments` shape (`start`, `end`, `text`).
#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

impl From<RawSegment> for Segment {
    fn from(raw: RawSegment) -> Self {
        Segment {
            start: raw.start,
            end: raw.end,
            text: raw.text,
        }
    }
}

/// Timed entry in the `chunks` shape (`timestamp: [start, end]`, `text`).
#[derive(Debug, Deserialize)]
struct RawChunk {
    timestamp: (Option<f64>, Option<f64>),
    #[serde(default)]
    text: String,
}

impl From<RawChunk> for Segment {
    fn from(raw: RawChunk) -> Self {
        let start = raw.timestamp.0.unwrap_or_default();
        Segment {
            start,
            end: raw.timestamp.1.unwrap_or(start),
            text: raw.text,
        }
    }
}

/// Entries of `value` that parse as `T`; malformed entries are skipped.
fn timed_entries<T>(value: Option<&Value>) -> Option<Vec<Segment>>
where
    T: DeserializeOwned + Into<Segment>,
{
    let segments: Vec<Segment> = value?
        .as_array()?
        .iter()
        .filter_map(|entry| T::deserialize(entry).ok())
        .map(Into::into)
        .collect();
    (!segments.is_empty()).then_some(segments)
}

/// Normalize any JSON body into a [`Transcript`].
///
/// Speech services disagree on field names, so everything funnels through
/// here and only [`Transcript`] reaches the analyzer. Text comes from `text`,
/// else `transcription`. Timing data is best effort and never costs the text.
/// Unknown shapes are an empty transcript, not an error.
pub fn normalize_response(body: Value) -> Transcript {
    match body {
        Value::Object(fields) => {
            let text = ["text", "transcription"]
                .iter()
                .filter_map(|key| fields.get(*key).and_then(Value::as_str))
                .find(|text| !text.is_empty())
                .unwrap_or_default()
                .to_string();
            let segments = timed_entries::<RawSegment>(fields.get("segments"))
                .or_else(|| timed_entries::<RawChunk>(fields.get("chunks")));

            Transcript { text, segments }
        }
        Value::String(text) => Transcript::from_text(text),
        _ => Transcript::default(),
    }
}

/// HTTP client for hosted speech-to-text, bearer-token authenticated.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriberConfig,
}

impl HttpTranscriber {
    pub fn new(config: TranscriberConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::transcription(format!("cannot build client: {e}")))?;
        Ok(Self { client, config })
    }

    fn request(&self, audio: Vec<u8>, content_type: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.config.request_url();
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        match self.config.provider {
            Provider::HuggingFace => Ok(builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(audio)),
            Provider::OpenAi => {
                let file_part = reqwest::multipart::Part::bytes(audio)
                    .file_name("audio.wav")
                    .mime_str(content_type)
                    .map_err(|e| AnalysisError::transcription(format!("mime: {e}")))?;
                let form = reqwest::multipart::Form::new()
                    .text("model", self.config.model.clone())
                    .text("response_format", "verbose_json")
                    .part("file", file_part);
                Ok(builder.multipart(form))
            }
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::transcription(format!("timeout after {:?}", self.config.timeout))
        } else {
            AnalysisError::transcription(format!("request: {e}"))
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, content_type: &str) -> Result<Transcript> {
        debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            bytes = audio.len(),
            "sending audio for transcription"
        );

        let response = self
            .request(audio, content_type)?
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AnalysisError::transcription(format!(
                "status {}: {}",
                status,
                body.trim()
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let transcript = normalize_response(body);

        info!(
            chars = transcript.text.len(),
            segments = transcript.segments.as_ref().map_or(0, Vec::len),
            "transcription completed"
        );
        Ok(transcript)
    }
}

#[cfg(feature = "local-whisper")]
pub use local::LocalWhisperTranscriber;

#[cfg(feature = "local-whisper")]
mod local {
    use std::{io::Cursor, path::PathBuf, sync::Arc};

    use async_trait::async_trait;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::Transcriber;
    use crate::{
        error::{AnalysisError, Result},
        types::{Segment, Transcript},
    };

    /// Runs a GGML whisper model in-process.
    pub struct LocalWhisperTranscriber {
        ctx: Arc<WhisperContext>,
    }

    impl LocalWhisperTranscriber {
        pub fn new(model_path: impl Into<PathBuf>) -> Result<Self> {
            let model_path = model_path.into();
            let model_path_str = model_path.to_str().ok_or_else(|| {
                AnalysisError::transcription(format!(
                    "model path is not UTF-8: {}",
                    model_path.display()
                ))
            })?;

            let ctx_params = WhisperContextParameters {
                use_gpu: true,
                flash_attn: true,
                ..Default::default()
            };
            let ctx = WhisperContext::new_with_params(model_path_str, ctx_params)
                .map_err(|e| AnalysisError::transcription(format!("failed to load model: {e}")))?;

            Ok(Self { ctx: Arc::new(ctx) })
        }
    }

    fn run_model(ctx: &WhisperContext, audio: &[u8]) -> Result<Transcript> {
        let mut reader = hound::WavReader::new(Cursor::new(audio))
            .map_err(|e| AnalysisError::transcription(format!("invalid WAV: {e}")))?;
        let samples: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| AnalysisError::transcription(format!("invalid WAV samples: {e}")))?;

        let params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        let mut state = ctx
            .create_state()
            .map_err(|e| AnalysisError::transcription(format!("failed to create state: {e}")))?;
        state
            .full(params, &samples)
            .map_err(|e| AnalysisError::transcription(format!("failed to run model: {e}")))?;

        let mut text = String::new();
        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let Ok(seg_text) = segment.to_str() else {
                continue;
            };
            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: seg_text.to_string(),
            });
            text.push_str(seg_text);
        }

        Ok(Transcript {
            text,
            segments: Some(segments),
        })
    }

    #[async_trait]
    impl Transcriber for LocalWhisperTranscriber {
        async fn transcribe(&self, audio: Vec<u8>, _content_type: &str) -> Result<Transcript> {
            let ctx = Arc::clone(&self.ctx);
            tokio::task::spawn_blocking(move || run_model(&ctx, &audio))
                .await
                .map_err(|e| AnalysisError::transcription(format!("whisper task failed: {e}")))?
        }
    }
}
