//! Green-classification heuristic used as the trial ground truth.
//!
//! The classifier layers several partially redundant boolean rules:
//! channel dominance, absolute margins against red and blue, dominance
//! ratios, and two override clauses that rescue colors a human would still
//! call green even when the strict rules fail. Every rule is computed
//! unconditionally and the results are AND/OR-combined afterwards, so each
//! rule stays individually observable and testable via [`RuleReport`].
//!
//! The session feeds its decaying tolerance in as both the red and the blue
//! margin tolerance. Lower tolerance makes the margin rules easier to
//! satisfy, so the oracle grows more permissive as a session progresses.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Margin and ratio thresholds for one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Required excess of green over red, exclusive.
    pub red_tolerance: i32,
    /// Required excess of green over blue, exclusive.
    pub blue_tolerance: i32,
    /// Required green/(other+1) dominance ratio, exclusive.
    pub ratio_threshold: f32,
}

impl ClassifierParams {
    /// Params with a single session tolerance applied to both margins.
    pub fn with_tolerance(tolerance: i32) -> Self {
        Self {
            red_tolerance: tolerance,
            blue_tolerance: tolerance,
            ..Self::default()
        }
    }

    pub fn with_ratio_threshold(mut self, ratio_threshold: f32) -> Self {
        self.ratio_threshold = ratio_threshold;
        self
    }
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            red_tolerance: 25,
            blue_tolerance: 25,
            ratio_threshold: 1.2,
        }
    }
}

/// Per-rule breakdown of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RuleReport {
    /// Green is strictly the highest channel.
    pub dominant: bool,
    /// `green - red` exceeds the red tolerance.
    pub red_margin: bool,
    /// `green - blue` exceeds the blue tolerance.
    pub blue_margin: bool,
    /// `green / (red + 1)`.
    pub red_ratio: f32,
    /// `green / (blue + 1)`.
    pub blue_ratio: f32,
    /// Both dominance ratios exceed the threshold.
    pub ratio: bool,
    /// Conjunction of dominance, margins, and ratios.
    pub primary: bool,
    /// Override: bright green-ish region with neither red nor blue strong.
    pub borderline: bool,
    /// Override: clearly green-led channel spread above the dark band.
    pub edge_case: bool,
    /// Final verdict: `primary || borderline || edge_case`.
    pub verdict: bool,
}

/// Evaluate every rule for one color. Pure and total.
pub fn classify(color: Rgb, params: &ClassifierParams) -> RuleReport {
    let r = i32::from(color.r);
    let g = i32::from(color.g);
    let b = i32::from(color.b);

    let dominant = g > r && g > b;
    let red_margin = (g - r) > params.red_tolerance;
    let blue_margin = (g - b) > params.blue_tolerance;

    // +1 denominators keep the ratios defined for zero channels.
    let red_ratio = g as f32 / (r + 1) as f32;
    let blue_ratio = g as f32 / (b + 1) as f32;
    let ratio = red_ratio > params.ratio_threshold && blue_ratio > params.ratio_threshold;

    let primary = dominant && red_margin && blue_margin && ratio;
    let borderline = g > 100 && r < 150 && b < 150;
    let edge_case = g > 90 && (g - r) > 10 && (g - b) > 10;

    RuleReport {
        dominant,
        red_margin,
        blue_margin,
        red_ratio,
        blue_ratio,
        ratio,
        primary,
        borderline,
        edge_case,
        verdict: primary || borderline || edge_case,
    }
}

/// Final verdict only.
pub fn is_green(color: Rgb, params: &ClassifierParams) -> bool {
    classify(color, params).verdict
}
