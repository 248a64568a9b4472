//! Behavioral nudge selection
//!
//! Nudges come from a fixed table of rules. Each rule looks at the score,
//! the anomaly records and the risk prediction independently and emits at
//! most one candidate. Candidates are ranked by priority; rules with equal
//! priority keep their table order.

use std::cmp::Reverse;

use regex::{Captures, Regex};
use tracing::debug;

use super::types::{
    AnomalyRecord, HealthScoreResult, Nudge, NudgeKind, RiskLevel, RiskPrediction, ScoreDelta,
    Severity, Tone,
};

/// Delivery share above which the delivery rule fires
const DELIVERY_THRESHOLD: f64 = 0.25;
const DELIVERY_CRITICAL: f64 = 0.50;

/// Daily-spend coefficient of variation above which the volatility rule fires
const VOLATILITY_THRESHOLD: f64 = 0.5;
const VOLATILITY_WARNING: f64 = 1.0;

/// Score gain needed for the improvement rule
const IMPROVEMENT_POINTS: f64 = 5.0;

/// Score needed for positive reinforcement
const POSITIVE_SCORE: f64 = 80.0;

const NO_SIGNAL_MESSAGE: &str =
    "No significant spending signal right now. Your habits look steady, keep it up.";

const INSUFFICIENT_DATA_MESSAGE: &str =
    "Not enough spending data yet. Add a few transactions to get personalized insights.";

/// Everything a rule may look at
pub struct NudgeContext<'a> {
    pub score: &'a HealthScoreResult,
    pub anomalies: &'a [AnomalyRecord],
    pub prediction: &'a RiskPrediction,
    pub delta: Option<&'a ScoreDelta>,
}

/// One row of the rule table
struct NudgeRule {
    kind: NudgeKind,
    priority: u8,
    applies: fn(&NudgeContext<'_>) -> bool,
    tone: fn(&NudgeContext<'_>) -> Tone,
    template: &'static str,
}

/// Rules in declaration order (the tie-break order)
const RULES: &[NudgeRule] = &[
    NudgeRule {
        kind: NudgeKind::Risk,
        priority: 4,
        applies: risk_applies,
        tone: risk_tone,
        template: "Overspending risk is {level} ({probability}%). Review your budget this week.",
    },
    NudgeRule {
        kind: NudgeKind::Delivery,
        priority: 3,
        applies: delivery_applies,
        tone: delivery_tone,
        template: "Delivery orders make up {percent}% of your spending. \
                   Cooking at home twice this week could save big!",
    },
    NudgeRule {
        kind: NudgeKind::Anomaly,
        priority: 3,
        applies: anomaly_applies,
        tone: anomaly_tone,
        template: "{count} unusual transactions or spending periods stood out. \
                   Take a minute to review them.",
    },
    NudgeRule {
        kind: NudgeKind::Volatility,
        priority: 2,
        applies: volatility_applies,
        tone: volatility_tone,
        template: "Your daily spending swings by {volatility}% around its average. \
                   Try to keep it more consistent.",
    },
    NudgeRule {
        kind: NudgeKind::Improvement,
        priority: 1,
        applies: improvement_applies,
        tone: encouraging,
        template: "Great job! Your financial health score improved by {points} points!",
    },
    NudgeRule {
        kind: NudgeKind::Positive,
        priority: 1,
        applies: positive_applies,
        tone: encouraging,
        template: "Your financial health score is {score}. Keep up the good spending habits!",
    },
];

fn risk_applies(ctx: &NudgeContext<'_>) -> bool {
    ctx.prediction.level >= RiskLevel::Moderate
}

fn risk_tone(ctx: &NudgeContext<'_>) -> Tone {
    if ctx.prediction.level == RiskLevel::High {
        Tone::Critical
    } else {
        Tone::Warning
    }
}

fn delivery_applies(ctx: &NudgeContext<'_>) -> bool {
    ctx.score.metrics.delivery_ratio > DELIVERY_THRESHOLD
}

fn delivery_tone(ctx: &NudgeContext<'_>) -> Tone {
    if ctx.score.metrics.delivery_ratio > DELIVERY_CRITICAL {
        Tone::Critical
    } else {
        Tone::Warning
    }
}

fn anomaly_applies(ctx: &NudgeContext<'_>) -> bool {
    !ctx.anomalies.is_empty()
}

fn anomaly_tone(ctx: &NudgeContext<'_>) -> Tone {
    if ctx.anomalies.iter().any(|a| a.severity == Severity::High) {
        Tone::Critical
    } else {
        Tone::Warning
    }
}

fn volatility_applies(ctx: &NudgeContext<'_>) -> bool {
    ctx.score.metrics.volatility > VOLATILITY_THRESHOLD
}

fn volatility_tone(ctx: &NudgeContext<'_>) -> Tone {
    if ctx.score.metrics.volatility > VOLATILITY_WARNING {
        Tone::Warning
    } else {
        Tone::Neutral
    }
}

fn improvement_applies(ctx: &NudgeContext<'_>) -> bool {
    ctx.delta.is_some_and(|d| d.change > IMPROVEMENT_POINTS)
}

fn positive_applies(ctx: &NudgeContext<'_>) -> bool {
    ctx.score.overall >= POSITIVE_SCORE
        && ctx.prediction.level == RiskLevel::Low
        && ctx.anomalies.is_empty()
}

fn encouraging(_: &NudgeContext<'_>) -> Tone {
    Tone::Encouraging
}

/// Value for a `{name}` template placeholder
fn placeholder(ctx: &NudgeContext<'_>, name: &str) -> Option<String> {
    let value = match name {
        "percent" => format!("{:.1}", ctx.score.metrics.delivery_ratio * 100.0),
        "volatility" => format!("{:.0}", ctx.score.metrics.volatility * 100.0),
        "count" => ctx.anomalies.len().to_string(),
        "probability" => format!("{:.1}", ctx.prediction.percentage()),
        "level" => ctx.prediction.level.as_str().to_string(),
        "points" => format!("{:.1}", ctx.delta?.change),
        "score" => format!("{:.1}", ctx.score.display_score()),
        _ => return None,
    };
    Some(value)
}

/// Rule-table nudge generator
#[derive(Debug, Clone)]
pub struct NudgeEngine {
    placeholder: Regex,
}

impl Default for NudgeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NudgeEngine {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\{(\w+)\}").expect("valid regex"),
        }
    }

    /// Ranked nudges; never empty, the first is the one to surface
    pub fn generate(
        &self,
        score: &HealthScoreResult,
        anomalies: &[AnomalyRecord],
        prediction: &RiskPrediction,
    ) -> Vec<Nudge> {
        self.generate_with_delta(score, anomalies, prediction, None)
    }

    /// Like `generate`, with a score change feeding the improvement rule
    pub fn generate_with_delta(
        &self,
        score: &HealthScoreResult,
        anomalies: &[AnomalyRecord],
        prediction: &RiskPrediction,
        delta: Option<&ScoreDelta>,
    ) -> Vec<Nudge> {
        if score.insufficient_data {
            return vec![Nudge {
                kind: NudgeKind::InsufficientData,
                message: INSUFFICIENT_DATA_MESSAGE.to_string(),
                tone: Tone::Neutral,
                priority: 0,
            }];
        }

        let ctx = NudgeContext {
            score,
            anomalies,
            prediction,
            delta,
        };

        let mut nudges: Vec<Nudge> = RULES
            .iter()
            .filter(|rule| (rule.applies)(&ctx))
            .map(|rule| Nudge {
                kind: rule.kind,
                message: self.render(rule.template, &ctx),
                tone: (rule.tone)(&ctx),
                priority: rule.priority,
            })
            .collect();
        nudges.sort_by_key(|n| Reverse(n.priority));

        if nudges.is_empty() {
            nudges.push(Nudge {
                kind: NudgeKind::NoSignal,
                message: NO_SIGNAL_MESSAGE.to_string(),
                tone: Tone::Neutral,
                priority: 0,
            });
        }

        debug!(
            count = nudges.len(),
            primary = nudges[0].kind.as_str(),
            "Nudges generated"
        );
        nudges
    }

    /// Fill `{name}` placeholders; unknown names are left as written
    fn render(&self, template: &str, ctx: &NudgeContext<'_>) -> String {
        self.placeholder
            .replace_all(template, |caps: &Captures| {
                placeholder(ctx, &caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
