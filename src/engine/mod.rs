//! Trial engine state machine.
//!
//! One trial is: draw a swatch, wait for a yes/no verdict (or a help
//! digression), score the verdict against the classifier's ground truth,
//! decay the tolerance, advance the epoch. The engine is strictly
//! turn-based and owns all mutable session state; the presentation layer
//! drives it through [`TrialEngine::start_trial`],
//! [`TrialEngine::submit_verdict`] and [`TrialEngine::request_help`].
//!
//! Calling an entry point outside its valid phase is a contract violation
//! and panics; see the `# Panics` sections.

mod score;

pub use score::{ScoreTracker, DEFAULT_TOLERANCE_DECAY, TOLERANCE_MAX};

use serde::Serialize;

use crate::assistant::{AssistantInvoker, HelpReport};
use crate::classifier::{is_green, ClassifierParams};
use crate::color::{ColorGenerator, Rgb};
use crate::config::TrialConfig;

/// Where the engine sits in its trial cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrialPhase {
    /// No trial started yet.
    Idle,
    /// A swatch is on display, waiting for a verdict or a help request.
    AwaitingInput,
    /// The last verdict has been scored; the next trial may start.
    Advanced,
}

/// Sink for the incorrect-answer feedback cue (an external audio "buzz").
/// Fired synchronously from [`TrialEngine::submit_verdict`] on a mismatch.
pub trait FeedbackCue {
    fn incorrect(&mut self);
}

/// Cue sink that does nothing; the default when no audio layer is wired up.
#[derive(Debug, Default)]
pub struct NoopCue;

impl FeedbackCue for NoopCue {
    fn incorrect(&mut self) {}
}

/// Result of scoring one yes/no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerdictOutcome {
    /// Whether the user's verdict matched the classifier's ground truth.
    pub correct: bool,
    /// The classifier's verdict for the shown swatch.
    pub truth: bool,
    pub pass_count: u32,
    pub total_count: u32,
    pub epoch: u32,
    pub tolerance: i32,
}

/// Read-only snapshot for the presentation layer.
///
/// `epoch_cap` is a display label only ("Epoch: 12/1000"); the engine never
/// terminates a session on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub color: Rgb,
    pub epoch: u32,
    pub pass_count: u32,
    pub total_count: u32,
    pub epoch_cap: u32,
}

/// The adaptive trial engine.
pub struct TrialEngine {
    generator: ColorGenerator,
    score: ScoreTracker,
    phase: TrialPhase,
    current: Option<Rgb>,
    ratio_threshold: f32,
    epoch_cap: u32,
    cue: Box<dyn FeedbackCue>,
    assistant: Option<AssistantInvoker>,
}

impl TrialEngine {
    /// Engine with a no-op cue and no assistant pipeline.
    pub fn new(config: &TrialConfig, generator: ColorGenerator) -> Self {
        Self {
            generator,
            score: ScoreTracker::new(config.initial_tolerance, config.tolerance_decay),
            phase: TrialPhase::Idle,
            current: None,
            ratio_threshold: config.ratio_threshold,
            epoch_cap: config.epoch_cap,
            cue: Box::new(NoopCue),
            assistant: None,
        }
    }

    /// Replace the incorrect-answer cue sink.
    pub fn with_cue(mut self, cue: Box<dyn FeedbackCue>) -> Self {
        self.cue = cue;
        self
    }

    /// Attach a help pipeline.
    pub fn with_assistant(mut self, assistant: AssistantInvoker) -> Self {
        self.assistant = Some(assistant);
        self
    }

    /// Draw the next swatch and wait for input.
    ///
    /// # Panics
    /// Panics if a trial is already awaiting input.
    pub fn start_trial(&mut self) {
        assert!(
            self.phase != TrialPhase::AwaitingInput,
            "start_trial called while a trial is still awaiting input"
        );
        self.current = Some(self.generator.generate());
        self.phase = TrialPhase::AwaitingInput;
    }

    /// Score a yes/no verdict against the classifier's ground truth at the
    /// current tolerance, update the counters, and decay the tolerance.
    /// Fires the incorrect cue exactly once on a mismatch.
    ///
    /// # Panics
    /// Panics if no trial is awaiting input.
    pub fn submit_verdict(&mut self, user_says_green: bool) -> VerdictOutcome {
        assert_eq!(
            self.phase,
            TrialPhase::AwaitingInput,
            "submit_verdict called with no trial awaiting input"
        );
        let color = self.current_color();
        let params = ClassifierParams::with_tolerance(self.score.tolerance())
            .with_ratio_threshold(self.ratio_threshold);
        let truth = is_green(color, &params);
        let correct = user_says_green == truth;
        if !correct {
            self.cue.incorrect();
        }
        self.score.record_verdict(correct);
        self.phase = TrialPhase::Advanced;

        VerdictOutcome {
            correct,
            truth,
            pass_count: self.score.pass_count(),
            total_count: self.score.total_count(),
            epoch: self.score.epoch(),
            tolerance: self.score.tolerance(),
        }
    }

    /// Run the help pipeline, then resume the same unanswered trial. The
    /// shown swatch is not regenerated and no counter moves. Pipeline
    /// failures are contained inside the invoker and reported, never raised.
    ///
    /// # Panics
    /// Panics if no trial is awaiting input.
    pub fn request_help(&mut self) -> HelpReport {
        assert_eq!(
            self.phase,
            TrialPhase::AwaitingInput,
            "request_help called with no trial awaiting input"
        );
        match self.assistant.as_mut() {
            Some(assistant) => assistant.run(),
            None => {
                tracing::warn!("help requested but no assistant pipeline is configured");
                HelpReport::unavailable()
            }
        }
    }

    /// Snapshot for the presentation layer.
    ///
    /// # Panics
    /// Panics if no trial has been started yet.
    pub fn display_state(&self) -> DisplayState {
        DisplayState {
            color: self.current_color(),
            epoch: self.score.epoch(),
            pass_count: self.score.pass_count(),
            total_count: self.score.total_count(),
            epoch_cap: self.epoch_cap,
        }
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    fn current_color(&self) -> Rgb {
        assert!(
            self.phase != TrialPhase::Idle,
            "no trial has been started yet"
        );
        self.current.expect("a started trial always holds a color")
    }
}
