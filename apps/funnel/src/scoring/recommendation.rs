use serde::{Deserialize, Serialize};

use crate::models::RecommendationThresholds;
use crate::scoring::breakdown::{ScoringBreakdown, StageContribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    StrongHire,
    Hire,
    Maybe,
    NoHire,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "strong-hire",
            Recommendation::Hire => "hire",
            Recommendation::Maybe => "maybe",
            Recommendation::NoHire => "no-hire",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strong-hire" => Some(Recommendation::StrongHire),
            "hire" => Some(Recommendation::Hire),
            "maybe" => Some(Recommendation::Maybe),
            "no-hire" => Some(Recommendation::NoHire),
            _ => None,
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a composite score to its band. Bands are lower bounds, checked top-down.
pub fn recommend(composite_score: u32, thresholds: &RecommendationThresholds) -> Recommendation {
    let score = composite_score as f64;
    if score >= thresholds.strong_hire {
        Recommendation::StrongHire
    } else if score >= thresholds.hire {
        Recommendation::Hire
    } else if score >= thresholds.maybe {
        Recommendation::Maybe
    } else {
        Recommendation::NoHire
    }
}

/// Builds the reasoning text. The output is a pure function of the breakdown
/// and the recommendation so a stored score can always be re-explained.
pub fn build_reasoning(breakdown: &ScoringBreakdown, recommendation: Recommendation) -> String {
    let mut parts = vec![format!(
        "Composite score {}/100 ({}).",
        breakdown.composite_score, recommendation
    )];

    let reporting = breakdown.present().count();
    match (strongest(breakdown), weakest(breakdown)) {
        (Some(best), Some(_)) if reporting == 1 => {
            parts.push(format!(
                "Only reporting stage: {} ({}).",
                best.stage, best.raw_score
            ));
        }
        (Some(best), Some(worst)) => {
            parts.push(format!("Strongest stage: {} ({}).", best.stage, best.raw_score));
            parts.push(format!("Weakest stage: {} ({}).", worst.stage, worst.raw_score));
        }
        _ => parts.push("No stage results available.".to_string()),
    }

    if breakdown.missing_stages.is_empty() {
        parts.push("All weighted stages reported.".to_string());
    } else {
        let missing: Vec<&str> = breakdown.missing_stages.iter().map(|s| s.as_str()).collect();
        parts.push(format!(
            "Missing stages: {}; score renormalized over {}% of the configured weight.",
            missing.join(", "),
            (breakdown.available_weight * 100.0).round()
        ));
    }

    parts.join(" ")
}

// Ties resolve to the earlier stage in canonical order.
fn strongest(breakdown: &ScoringBreakdown) -> Option<&StageContribution> {
    let mut best: Option<&StageContribution> = None;
    for stage in breakdown.present() {
        if best.map_or(true, |b| stage.raw_score > b.raw_score) {
            best = Some(stage);
        }
    }
    best
}

fn weakest(breakdown: &ScoringBreakdown) -> Option<&StageContribution> {
    let mut worst: Option<&StageContribution> = None;
    for stage in breakdown.present() {
        if worst.map_or(true, |w| stage.raw_score < w.raw_score) {
            worst = Some(stage);
        }
    }
    worst
}
