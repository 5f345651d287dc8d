//! # Chromatic Trial Core
//!
//! An adaptive color-perception trial engine. Each trial shows a uniformly
//! random RGB swatch and scores the user's "is this green?" verdict against
//! a heuristic ground-truth classifier. A tolerance parameter decays across
//! the session, making the classifier's margin rules progressively easier to
//! satisfy, so later trials have a more permissive oracle.
//!
//! ## Quick Start
//!
//! ```rust
//! use chromatic_trial_core::{ColorGenerator, TrialConfig, TrialEngine};
//!
//! let config = TrialConfig::default();
//! let mut engine = TrialEngine::new(&config, ColorGenerator::from_seed(7));
//!
//! engine.start_trial();
//! let state = engine.display_state();
//! println!("Epoch {}/{}: {:?}", state.epoch, state.epoch_cap, state.color);
//!
//! let outcome = engine.submit_verdict(true);
//! println!("correct: {}, tolerance now {}", outcome.correct, outcome.tolerance);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Session configuration via TOML
//! - [`classifier`] - Green-classification heuristic and rule reports
//! - [`engine`] - Trial state machine and score tracking
//! - [`assistant`] - Staged spoken-language help pipeline
//! - [`logging`] - JSON line-delimited trial journals

pub mod assistant;
pub mod classifier;
pub mod color;
pub mod config;
pub mod engine;
pub mod logging;

pub use assistant::{
    AssistantInvoker, AudioClip, AudioFormat, AudioPlayer, ChatMessage, HelpReport, HelpStage,
    LanguageModel, Recorder, SpeechSynthesizer, StageError, StageFailure, Transcriber,
};
pub use classifier::{classify, is_green, ClassifierParams, RuleReport};
pub use color::{ColorGenerator, Rgb};
pub use config::{AssistantConfig, ConfigError, TrialConfig};
pub use engine::{
    DisplayState, FeedbackCue, NoopCue, ScoreTracker, TrialEngine, VerdictOutcome,
    DEFAULT_TOLERANCE_DECAY, TOLERANCE_MAX,
};
pub use logging::{log_help, log_trial, HelpLogEntry, TrialLogEntry};
