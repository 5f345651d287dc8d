//! Staged spoken-language help pipeline.
//!
//! A help request runs a fixed stage sequence: synthesize the prompt, play
//! it, record the user, transcribe the recording, query a language model,
//! synthesize the reply, play the reply. Each stage sits behind its own
//! trait so failures are testable stage-by-stage, and the invoker contains
//! every failure: [`AssistantInvoker::run`] always returns a [`HelpReport`],
//! never an error. The trial engine treats the whole digression as one
//! blocking call and resumes the same trial afterwards.

mod error;
pub mod remote;

pub use error::StageError;

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Audio payload passed between pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
}

/// Payload encoding. WAV clips carry raw 16-bit PCM frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Wav { sample_rate: u32, channels: u16 },
    Mp3,
}

impl AudioClip {
    pub fn wav(sample_rate: u32, channels: u16, bytes: Vec<u8>) -> Self {
        Self {
            format: AudioFormat::Wav {
                sample_rate,
                channels,
            },
            bytes,
        }
    }

    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            format: AudioFormat::Mp3,
            bytes,
        }
    }

    /// Duration of a PCM WAV payload; `None` for compressed formats.
    pub fn duration(&self) -> Option<Duration> {
        match self.format {
            AudioFormat::Wav {
                sample_rate,
                channels,
            } => {
                let frame_bytes = u64::from(channels.max(1)) * 2; // 16-bit samples
                let frames = self.bytes.len() as u64 / frame_bytes;
                Some(Duration::from_secs_f64(
                    frames as f64 / f64::from(sample_rate.max(1)),
                ))
            }
            AudioFormat::Mp3 => None,
        }
    }
}

/// One chat-completion message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Turns text into an audio clip.
pub trait SpeechSynthesizer {
    fn synthesize(&mut self, text: &str) -> Result<AudioClip>;
}

/// Plays a clip to completion.
pub trait AudioPlayer {
    fn play(&mut self, clip: &AudioClip) -> Result<()>;
}

/// Captures audio from the user for a fixed duration.
pub trait Recorder {
    fn record(&mut self, duration: Duration) -> Result<AudioClip>;
}

/// Turns a recorded clip into transcript alternatives.
pub trait Transcriber {
    fn transcribe(&mut self, clip: &AudioClip) -> Result<Vec<String>>;
}

/// Completes a chat exchange. `Ok(None)` means the service answered but
/// produced no usable content.
pub trait LanguageModel {
    fn complete(&mut self, messages: &[ChatMessage]) -> Result<Option<String>>;
}

/// The stages of one help digression, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpStage {
    SynthesizePrompt,
    PlayPrompt,
    Record,
    Transcribe,
    Query,
    SynthesizeReply,
    PlayReply,
}

/// A stage that failed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: HelpStage,
    pub reason: String,
}

/// Outcome of one help digression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HelpReport {
    /// Stages that completed, in order.
    pub completed: Vec<HelpStage>,
    /// First failing stage, if any; stages after it never ran.
    pub failure: Option<StageFailure>,
    /// Joined transcript of the user's request, when transcription succeeded.
    pub transcription: Option<String>,
    /// The language model's reply, when the query succeeded.
    pub reply: Option<String>,
}

impl HelpReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Report for a help request with no pipeline wired up.
    pub fn unavailable() -> Self {
        Self {
            failure: Some(StageFailure {
                stage: HelpStage::SynthesizePrompt,
                reason: "no assistant pipeline configured".to_string(),
            }),
            ..Self::default()
        }
    }
}

/// Default spoken prompt, matching the session's opening question.
pub const DEFAULT_PROMPT: &str = "How can I help you?";

/// Default system message framing the language-model exchange.
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are my AI assistant.";

/// Default recording window.
pub const DEFAULT_RECORD_SECONDS: u64 = 5;

/// Drift beyond which a recorded clip's duration draws a warning.
const RECORD_DRIFT_WARN: Duration = Duration::from_millis(500);

/// Runs the fixed help-stage sequence over injected stage implementations.
pub struct AssistantInvoker {
    synthesizer: Box<dyn SpeechSynthesizer>,
    player: Box<dyn AudioPlayer>,
    recorder: Box<dyn Recorder>,
    transcriber: Box<dyn Transcriber>,
    model: Box<dyn LanguageModel>,
    prompt: String,
    system_message: String,
    record_duration: Duration,
}

impl AssistantInvoker {
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        player: Box<dyn AudioPlayer>,
        recorder: Box<dyn Recorder>,
        transcriber: Box<dyn Transcriber>,
        model: Box<dyn LanguageModel>,
    ) -> Self {
        Self {
            synthesizer,
            player,
            recorder,
            transcriber,
            model,
            prompt: DEFAULT_PROMPT.to_string(),
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            record_duration: Duration::from_secs(DEFAULT_RECORD_SECONDS),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = message.into();
        self
    }

    pub fn with_record_duration(mut self, duration: Duration) -> Self {
        self.record_duration = duration;
        self
    }

    /// Execute the stage sequence, stopping at the first failure. Failures
    /// are logged and recorded in the report; this never returns an error.
    pub fn run(&mut self) -> HelpReport {
        let mut report = HelpReport::default();

        let prompt_clip = match self.synthesizer.synthesize(&self.prompt) {
            Ok(clip) => clip,
            Err(err) => return Self::abort(report, HelpStage::SynthesizePrompt, err),
        };
        report.completed.push(HelpStage::SynthesizePrompt);

        if let Err(err) = self.player.play(&prompt_clip) {
            return Self::abort(report, HelpStage::PlayPrompt, err);
        }
        report.completed.push(HelpStage::PlayPrompt);

        let recorded = match self.recorder.record(self.record_duration) {
            Ok(clip) => clip,
            Err(err) => return Self::abort(report, HelpStage::Record, err),
        };
        report.completed.push(HelpStage::Record);
        self.check_recorded_duration(&recorded);

        let transcripts = match self.transcriber.transcribe(&recorded) {
            Ok(lines) => lines,
            Err(err) => return Self::abort(report, HelpStage::Transcribe, err),
        };
        let transcription = transcripts.join(" ").trim().to_string();
        if transcription.is_empty() {
            return Self::abort(report, HelpStage::Transcribe, StageError::EmptyTranscription.into());
        }
        report.completed.push(HelpStage::Transcribe);
        report.transcription = Some(transcription.clone());

        let messages = [
            ChatMessage::system(self.system_message.clone()),
            ChatMessage::user(transcription),
        ];
        let reply = match self.model.complete(&messages) {
            Ok(Some(reply)) if !reply.trim().is_empty() => reply,
            Ok(_) => return Self::abort(report, HelpStage::Query, StageError::EmptyReply.into()),
            Err(err) => return Self::abort(report, HelpStage::Query, err),
        };
        report.completed.push(HelpStage::Query);
        report.reply = Some(reply.clone());

        let reply_clip = match self.synthesizer.synthesize(&reply) {
            Ok(clip) => clip,
            Err(err) => return Self::abort(report, HelpStage::SynthesizeReply, err),
        };
        report.completed.push(HelpStage::SynthesizeReply);

        if let Err(err) = self.player.play(&reply_clip) {
            return Self::abort(report, HelpStage::PlayReply, err);
        }
        report.completed.push(HelpStage::PlayReply);

        report
    }

    fn abort(mut report: HelpReport, stage: HelpStage, err: anyhow::Error) -> HelpReport {
        warn!("help pipeline stage {:?} failed: {:#}", stage, err);
        report.failure = Some(StageFailure {
            stage,
            reason: format!("{err:#}"),
        });
        report
    }

    fn check_recorded_duration(&self, clip: &AudioClip) {
        if let Some(actual) = clip.duration() {
            let expected = self.record_duration;
            let drift = if actual > expected {
                actual - expected
            } else {
                expected - actual
            };
            if drift > RECORD_DRIFT_WARN {
                warn!(
                    "recorded clip is {:.1}s, expected {:.1}s",
                    actual.as_secs_f64(),
                    expected.as_secs_f64()
                );
            }
        }
    }
}
