//! Remote speech and language-model services.
//!
//! Blocking HTTP clients for the three remote stages: Google Cloud
//! Speech-to-Text (`speech:recognize`), Google Cloud Text-to-Speech
//! (`text:synthesize`), and OpenAI chat completions. Request and response
//! bodies are typed with serde; parse helpers are separated from transport
//! so they can be tested against canned JSON without a network.
//!
//! API keys come from the environment (`GOOGLE_API_KEY`, `OPENAI_API_KEY`).
//! A missing key is a stage failure, not a crash.

use std::thread;
use std::time::Duration;

use anyhow::Result;
use base64::Engine as _;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    AudioClip, AudioFormat, ChatMessage, LanguageModel, SpeechSynthesizer, StageError, Transcriber,
};
use crate::config::AssistantConfig;

const GOOGLE_STT_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const DEFAULT_MAX_RETRIES: u32 = 3;

fn b64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn b64_decode(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(data)
}

/// Send an HTTP request with retry and exponential backoff.
///
/// Returns `Some(Response)` on success, `None` if all retries are exhausted
/// or a non-retriable error occurs.
///
/// Retry behavior:
/// - 429 (rate limited): backoff 2s, 4s, 8s
/// - 5xx (server error): backoff 1s, 2s, 4s
/// - Timeout/connect error: backoff 1s, 2s, 4s
/// - Other 4xx: non-retriable, returns None immediately
pub fn send_with_retry<F>(
    client: &Client,
    build_request: F,
    max_retries: u32,
    context: &str,
) -> Option<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let mut response = None;
    for attempt in 0..max_retries {
        let result = build_request(client).send();

        match result {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    response = Some(resp);
                    break;
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    let delay = Duration::from_secs(2u64.pow(attempt + 1));
                    warn!("{}: rate limited (429), retrying in {:?}", context, delay);
                    thread::sleep(delay);
                } else if status.is_server_error() {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    warn!("{}: server error ({}), retrying in {:?}", context, status, delay);
                    thread::sleep(delay);
                } else {
                    warn!("{}: non-retriable error ({})", context, status);
                    return None;
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                let delay = Duration::from_secs(2u64.pow(attempt));
                warn!("{}: network error ({}), retrying in {:?}", context, e, delay);
                thread::sleep(delay);
            }
            Err(e) => {
                warn!("{}: request failed: {}", context, e);
                return None;
            }
        }
    }

    if response.is_none() {
        warn!("{}: failed after {} retries", context, max_retries);
    }
    response
}

// --- Google Speech-to-Text ---

#[derive(Debug, Serialize)]
struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: String,
    sample_rate_hertz: u32,
    language_code: String,
    enable_automatic_punctuation: bool,
    model: String,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognizeResult>,
}

#[derive(Debug, Deserialize)]
struct RecognizeResult {
    #[serde(default)]
    alternatives: Vec<RecognizeAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognizeAlternative {
    transcript: Option<String>,
}

fn collect_transcripts(response: RecognizeResponse) -> Vec<String> {
    response
        .results
        .into_iter()
        .flat_map(|result| result.alternatives)
        .filter_map(|alternative| alternative.transcript)
        .collect()
}

/// Google Cloud Speech-to-Text over LINEAR16 PCM.
pub struct GoogleTranscriber {
    api_key: Option<String>,
    client: Client,
    language_code: String,
    max_retries: u32,
}

impl GoogleTranscriber {
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY").ok(),
            client: Client::new(),
            language_code: "en-US".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new()
        }
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    /// Client configured from the `[assistant]` section.
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new().with_language_code(config.language_code.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(clip: &AudioClip, language_code: &str) -> Result<RecognizeRequest, StageError> {
        let AudioFormat::Wav { sample_rate, .. } = clip.format else {
            return Err(StageError::unsupported_audio("LINEAR16 WAV", "MP3"));
        };
        Ok(RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16".to_string(),
                sample_rate_hertz: sample_rate,
                language_code: language_code.to_string(),
                enable_automatic_punctuation: true,
                model: "default".to_string(),
            },
            audio: RecognitionAudio {
                content: b64_encode(&clip.bytes),
            },
        })
    }
}

impl Default for GoogleTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber for GoogleTranscriber {
    fn transcribe(&mut self, clip: &AudioClip) -> Result<Vec<String>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StageError::missing_credential("GOOGLE_API_KEY"))?;
        let body = Self::request_body(clip, &self.language_code)?;
        let url = format!("{GOOGLE_STT_URL}?key={key}");
        let response = send_with_retry(
            &self.client,
            |c| c.post(&url).json(&body),
            self.max_retries,
            "speech-to-text",
        )
        .ok_or_else(|| StageError::transport("transcribe", "request failed after retries"))?;
        let parsed: RecognizeResponse = response.json()?;
        Ok(collect_transcripts(parsed))
    }
}

// --- Google Text-to-Speech ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest {
    input: SynthesisInput,
    voice: VoiceSelection,
    audio_config: SynthesisAudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection {
    language_code: String,
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisAudioConfig {
    audio_encoding: String,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

/// Google Cloud Text-to-Speech, producing MP3 clips.
pub struct GoogleSpeechSynthesizer {
    api_key: Option<String>,
    client: Client,
    voice: String,
    language_code: String,
    max_retries: u32,
}

impl GoogleSpeechSynthesizer {
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY").ok(),
            client: Client::new(),
            voice: "en-US-Wavenet-D".to_string(),
            language_code: "en-US".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new()
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Client configured from the `[assistant]` section.
    pub fn from_config(config: &AssistantConfig) -> Self {
        let mut synthesizer = Self::new().with_voice(config.voice.clone());
        synthesizer.language_code = config.language_code.clone();
        synthesizer
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(text: &str, voice: &str, language_code: &str) -> SynthesizeRequest {
        SynthesizeRequest {
            input: SynthesisInput {
                text: text.to_string(),
            },
            voice: VoiceSelection {
                language_code: language_code.to_string(),
                name: voice.to_string(),
            },
            audio_config: SynthesisAudioConfig {
                audio_encoding: "MP3".to_string(),
            },
        }
    }
}

impl Default for GoogleSpeechSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for GoogleSpeechSynthesizer {
    fn synthesize(&mut self, text: &str) -> Result<AudioClip> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StageError::missing_credential("GOOGLE_API_KEY"))?;
        let body = Self::request_body(text, &self.voice, &self.language_code);
        let url = format!("{GOOGLE_TTS_URL}?key={key}");
        let response = send_with_retry(
            &self.client,
            |c| c.post(&url).json(&body),
            self.max_retries,
            "text-to-speech",
        )
        .ok_or_else(|| StageError::transport("synthesize", "request failed after retries"))?;
        let parsed: SynthesizeResponse = response.json()?;
        let content = parsed.audio_content.ok_or_else(|| {
            StageError::remote_rejected("text-to-speech", 200, "response missing audioContent")
        })?;
        let bytes = b64_decode(&content)
            .map_err(|err| StageError::transport("synthesize", format!("invalid base64 audio: {err}")))?;
        Ok(AudioClip::mp3(bytes))
    }
}

// --- OpenAI chat completions ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

fn first_choice(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

/// OpenAI chat-completion client with Bearer authentication.
pub struct OpenAiChat {
    api_key: Option<String>,
    client: Client,
    model: String,
    max_retries: u32,
}

impl OpenAiChat {
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            client: Client::new(),
            model: "gpt-4".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Client configured from the `[assistant]` section.
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new().with_model(config.chat_model.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for OpenAiChat {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageModel for OpenAiChat {
    fn complete(&mut self, messages: &[ChatMessage]) -> Result<Option<String>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| StageError::missing_credential("OPENAI_API_KEY"))?;
        let body = ChatRequest {
            model: &self.model,
            messages,
        };
        let response = send_with_retry(
            &self.client,
            |c| c.post(OPENAI_CHAT_URL).bearer_auth(key).json(&body),
            self.max_retries,
            "chat-completion",
        )
        .ok_or_else(|| StageError::transport("query", "request failed after retries"))?;
        let parsed: ChatResponse = response.json()?;
        Ok(first_choice(parsed))
    }
}
