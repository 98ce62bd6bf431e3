use std::{fmt, str::FromStr, time::Duration};

/// Upper bound for a single transcription call. Speech models are slow.
pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    HuggingFace,
    OpenAi,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::HuggingFace => ProviderConfig {
                api_url: "https://api-inference.huggingface.co/models",
                model: "openai/whisper-large-v3",
                env_var: "HF_TOKEN",
            },
            Provider::OpenAi => ProviderConfig {
                api_url: "https://api.openai.com/v1/audio/transcriptions",
                model: "whisper-1",
                env_var: "OPENAI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::HuggingFace => "Hugging Face",
            Provider::OpenAi => "OpenAI",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Provider::HuggingFace),
            "openai" => Ok(Provider::OpenAi),
            other => Err(format!("unknown transcription provider: {other}")),
        }
    }
}

/// Credentials and limits for the speech-to-text service, built once by the
/// caller and handed to the client at construction.
#[derive(Clone)]
pub struct TranscriberConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl TranscriberConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        let defaults = provider.config();
        Self {
            provider,
            api_key: api_key.into(),
            model: defaults.model.to_string(),
            endpoint: defaults.api_url.to_string(),
            timeout: DEFAULT_TRANSCRIPTION_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full request URL for this provider.
    pub fn request_url(&self) -> String {
        match self.provider {
            Provider::HuggingFace => {
                format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model)
            }
            Provider::OpenAi => self.endpoint.clone(),
        }
    }
}

impl fmt::Debug for TranscriberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriberConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}
