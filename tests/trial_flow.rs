//! End-to-end trial-flow properties: score bookkeeping, tolerance decay,
//! help-digression neutrality, and help-pipeline stage sequencing.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chromatic_trial_core::{
    classify, is_green, AssistantInvoker, AudioClip, AudioPlayer, ChatMessage, ClassifierParams,
    ColorGenerator, FeedbackCue, HelpStage, LanguageModel, Recorder, Rgb, SpeechSynthesizer,
    Transcriber, TrialConfig, TrialEngine,
};

#[derive(Clone, Default)]
struct CallLog(Rc<RefCell<Vec<String>>>);

impl CallLog {
    fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

struct StubSynth {
    log: CallLog,
    fail: bool,
}

impl SpeechSynthesizer for StubSynth {
    fn synthesize(&mut self, text: &str) -> anyhow::Result<AudioClip> {
        self.log.push(format!("synthesize:{text}"));
        if self.fail {
            anyhow::bail!("synthesis service down");
        }
        Ok(AudioClip::mp3(vec![1]))
    }
}

struct StubPlayer {
    log: CallLog,
}

impl AudioPlayer for StubPlayer {
    fn play(&mut self, _clip: &AudioClip) -> anyhow::Result<()> {
        self.log.push("play");
        Ok(())
    }
}

struct StubRecorder {
    log: CallLog,
}

impl Recorder for StubRecorder {
    fn record(&mut self, duration: Duration) -> anyhow::Result<AudioClip> {
        self.log.push("record");
        // 16-bit mono at 8 Hz: 16 bytes per second of audio.
        let bytes = vec![0u8; (duration.as_secs() as usize) * 16];
        Ok(AudioClip::wav(8, 1, bytes))
    }
}

struct StubTranscriber {
    log: CallLog,
    lines: Vec<String>,
    fail: bool,
}

impl Transcriber for StubTranscriber {
    fn transcribe(&mut self, _clip: &AudioClip) -> anyhow::Result<Vec<String>> {
        self.log.push("transcribe");
        if self.fail {
            anyhow::bail!("transcription backend unreachable");
        }
        Ok(self.lines.clone())
    }
}

struct StubModel {
    log: CallLog,
    reply: Option<String>,
}

impl LanguageModel for StubModel {
    fn complete(&mut self, messages: &[ChatMessage]) -> anyhow::Result<Option<String>> {
        self.log.push(format!("complete:{}", messages.len()));
        Ok(self.reply.clone())
    }
}

struct ScriptedPipeline {
    log: CallLog,
    synth_fails: bool,
    transcriber_fails: bool,
    transcript: Vec<String>,
    reply: Option<String>,
}

impl Default for ScriptedPipeline {
    fn default() -> Self {
        Self {
            log: CallLog::default(),
            synth_fails: false,
            transcriber_fails: false,
            transcript: vec!["what does".to_string(), "green mean".to_string()],
            reply: Some("Green light reflects mid-wavelength light.".to_string()),
        }
    }
}

impl ScriptedPipeline {
    fn build(self) -> (AssistantInvoker, CallLog) {
        let log = self.log.clone();
        let invoker = AssistantInvoker::new(
            Box::new(StubSynth {
                log: log.clone(),
                fail: self.synth_fails,
            }),
            Box::new(StubPlayer { log: log.clone() }),
            Box::new(StubRecorder { log: log.clone() }),
            Box::new(StubTranscriber {
                log: log.clone(),
                lines: self.transcript,
                fail: self.transcriber_fails,
            }),
            Box::new(StubModel {
                log: log.clone(),
                reply: self.reply,
            }),
        );
        (invoker, log)
    }
}

struct CountingCue(Rc<RefCell<u32>>);

impl FeedbackCue for CountingCue {
    fn incorrect(&mut self) {
        *self.0.borrow_mut() += 1;
    }
}

fn seeded_engine() -> TrialEngine {
    TrialEngine::new(&TrialConfig::default(), ColorGenerator::from_seed(42))
}

fn current_truth(engine: &TrialEngine) -> bool {
    let color = engine.display_state().color;
    is_green(
        color,
        &ClassifierParams::with_tolerance(engine.score().tolerance()),
    )
}

#[test]
fn five_matching_verdicts_score_five_of_five() {
    let mut engine = seeded_engine();
    for _ in 0..5 {
        engine.start_trial();
        let truth = current_truth(&engine);
        let outcome = engine.submit_verdict(truth);
        assert!(outcome.correct);
    }
    let score = engine.score();
    assert_eq!(score.pass_count(), 5);
    assert_eq!(score.total_count(), 5);
    assert_eq!(score.epoch(), 6);
    assert_eq!(score.tolerance(), 75);
}

#[test]
fn mismatched_verdict_fires_cue_exactly_once() {
    let fired = Rc::new(RefCell::new(0u32));
    let mut engine = seeded_engine().with_cue(Box::new(CountingCue(fired.clone())));

    engine.start_trial();
    let truth = current_truth(&engine);
    let outcome = engine.submit_verdict(!truth);

    assert!(!outcome.correct);
    assert_eq!(outcome.pass_count, 0);
    assert_eq!(outcome.total_count, 1);
    assert_eq!(*fired.borrow(), 1);

    // A correct answer on the next trial leaves the count alone.
    engine.start_trial();
    let truth = current_truth(&engine);
    engine.submit_verdict(truth);
    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn tolerance_decay_follows_the_max_of_zero_law() {
    let mut engine = seeded_engine();
    for n in 1..=30u32 {
        engine.start_trial();
        engine.submit_verdict(true);
        assert_eq!(engine.score().tolerance(), (100 - 5 * n as i32).max(0));
    }
}

#[test]
fn counter_invariants_hold_across_mixed_sequences() {
    let (invoker, _log) = ScriptedPipeline::default().build();
    let mut engine = seeded_engine().with_assistant(invoker);

    for round in 0..20 {
        engine.start_trial();
        if round % 3 == 0 {
            engine.request_help();
        }
        let truth = current_truth(&engine);
        engine.submit_verdict(if round % 4 == 0 { !truth } else { truth });

        let score = engine.score();
        assert!(score.pass_count() <= score.total_count());
        assert_eq!(score.epoch(), score.total_count() + 1);
    }
}

#[test]
fn help_leaves_state_and_color_untouched() {
    let (invoker, _log) = ScriptedPipeline::default().build();
    let mut engine = seeded_engine().with_assistant(invoker);

    engine.start_trial();
    let before = engine.display_state();
    let report = engine.request_help();

    assert!(report.succeeded());
    let after = engine.display_state();
    assert_eq!(after, before);
    assert_eq!(after.color, before.color);
    assert_eq!(engine.score().tolerance(), 100);
}

#[test]
fn help_failure_is_contained_and_trial_resumes() {
    let (invoker, log) = ScriptedPipeline {
        transcriber_fails: true,
        ..ScriptedPipeline::default()
    }
    .build();
    let mut engine = seeded_engine().with_assistant(invoker);

    engine.start_trial();
    let color = engine.display_state().color;
    let report = engine.request_help();

    assert!(!report.succeeded());
    assert_eq!(report.failure.as_ref().map(|f| f.stage), Some(HelpStage::Transcribe));
    // The model stage never ran.
    assert!(!log.entries().iter().any(|e| e.starts_with("complete")));

    // Same swatch, and the verdict path still works.
    assert_eq!(engine.display_state().color, color);
    let truth = current_truth(&engine);
    let outcome = engine.submit_verdict(truth);
    assert!(outcome.correct);
}

#[test]
fn help_pipeline_runs_stages_in_order() {
    let (mut invoker, log) = ScriptedPipeline::default().build();
    let report = invoker.run();

    assert!(report.succeeded());
    assert_eq!(report.transcription.as_deref(), Some("what does green mean"));
    assert_eq!(
        report.reply.as_deref(),
        Some("Green light reflects mid-wavelength light.")
    );
    assert_eq!(
        log.entries(),
        vec![
            "synthesize:How can I help you?".to_string(),
            "play".to_string(),
            "record".to_string(),
            "transcribe".to_string(),
            "complete:2".to_string(),
            "synthesize:Green light reflects mid-wavelength light.".to_string(),
            "play".to_string(),
        ]
    );
    assert_eq!(
        report.completed,
        vec![
            HelpStage::SynthesizePrompt,
            HelpStage::PlayPrompt,
            HelpStage::Record,
            HelpStage::Transcribe,
            HelpStage::Query,
            HelpStage::SynthesizeReply,
            HelpStage::PlayReply,
        ]
    );
}

#[test]
fn empty_transcription_stops_before_the_model() {
    let (mut invoker, log) = ScriptedPipeline {
        transcript: vec!["  ".to_string()],
        ..ScriptedPipeline::default()
    }
    .build();
    let report = invoker.run();

    assert_eq!(report.failure.as_ref().map(|f| f.stage), Some(HelpStage::Transcribe));
    assert!(report.transcription.is_none());
    assert!(!log.entries().iter().any(|e| e.starts_with("complete")));
}

#[test]
fn empty_model_reply_fails_the_query_stage() {
    let (mut invoker, log) = ScriptedPipeline {
        reply: None,
        ..ScriptedPipeline::default()
    }
    .build();
    let report = invoker.run();

    assert_eq!(report.failure.as_ref().map(|f| f.stage), Some(HelpStage::Query));
    assert!(report.reply.is_none());
    // The reply was never synthesized or played.
    let entries = log.entries();
    assert_eq!(entries.iter().filter(|e| *e == "play").count(), 1);
    assert_eq!(
        entries.iter().filter(|e| e.starts_with("synthesize")).count(),
        1
    );
}

#[test]
fn failing_first_stage_reports_synthesize_prompt() {
    let (mut invoker, log) = ScriptedPipeline {
        synth_fails: true,
        ..ScriptedPipeline::default()
    }
    .build();
    let report = invoker.run();

    assert_eq!(
        report.failure.as_ref().map(|f| f.stage),
        Some(HelpStage::SynthesizePrompt)
    );
    assert!(report.completed.is_empty());
    assert_eq!(log.entries().len(), 1);
}

#[test]
fn boundary_colors_match_the_heuristic_contract() {
    let full = ClassifierParams::with_tolerance(100);
    assert!(is_green(Rgb::new(0, 255, 0), &full));
    assert!(!is_green(Rgb::new(255, 255, 255), &full));
    assert!(is_green(Rgb::new(0, 130, 0), &full));

    // The dim-green rescue fires only through the edge-case clause.
    let report = classify(Rgb::new(0, 95, 0), &full);
    assert!(!report.primary && !report.borderline && report.edge_case);
    assert!(report.verdict);
}

#[test]
fn configured_decay_and_tolerance_are_respected() {
    let config = TrialConfig {
        initial_tolerance: 40,
        tolerance_decay: 15,
        ..TrialConfig::default()
    };
    let mut engine = TrialEngine::new(&config, ColorGenerator::from_seed(9));
    for expected in [25, 10, 0, 0] {
        engine.start_trial();
        engine.submit_verdict(true);
        assert_eq!(engine.score().tolerance(), expected);
    }
}
