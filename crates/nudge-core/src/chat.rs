//! Keyword intent routing for the chat assistant
//!
//! A message is matched against an ordered table of intents; the first
//! intent with a keyword hit wins. Keywords match on word boundaries, so
//! "hi" does not fire inside "this". Replies are rendered from an existing
//! snapshot; the responder never runs analysis itself.

use std::fmt::Write as _;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::types::{AnalyticsSnapshot, AnomalySubject, GradeChange};
use crate::analysis::{recommendations, Trend};
use crate::config::EngineConfig;

/// What the user is asking about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Score,
    Risk,
    AddTransaction,
    Summary,
    Help,
    Delivery,
    Anomaly,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Score => "score",
            Intent::Risk => "risk",
            Intent::AddTransaction => "add_transaction",
            Intent::Summary => "summary",
            Intent::Help => "help",
            Intent::Delivery => "delivery",
            Intent::Anomaly => "anomaly",
            Intent::Unknown => "unknown",
        }
    }
}

/// Intents in match order with their keywords
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Greeting, &["hello", "hi", "hey", "good morning", "good evening"]),
    (Intent::Score, &["score", "health", "financial health", "how am i doing"]),
    (Intent::Risk, &["risk", "overspend", "prediction", "forecast"]),
    (Intent::AddTransaction, &["add", "record", "expense", "spent", "bought"]),
    (Intent::Summary, &["summary", "overview", "stats", "statistics", "show me"]),
    (Intent::Help, &["help", "what can you do", "commands", "options"]),
    (Intent::Delivery, &["delivery", "swiggy", "zomato", "food orders"]),
    (Intent::Anomaly, &["anomaly", "anomalies", "unusual", "suspicious", "outlier"]),
];

/// Anomalies listed in a reply before truncating
const MAX_LISTED_ANOMALIES: usize = 5;

/// A rendered chat answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub intent: Intent,
    pub text: String,
}

/// Rule-table chat responder
#[derive(Debug, Clone)]
pub struct ChatResponder {
    intents: Vec<(Intent, Regex)>,
    categories: Vec<String>,
}

impl ChatResponder {
    pub fn new(config: &EngineConfig) -> Self {
        let intents = INTENT_KEYWORDS
            .iter()
            .map(|(intent, keywords)| {
                let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
                let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
                (*intent, Regex::new(&pattern).expect("valid regex"))
            })
            .collect();

        Self {
            intents,
            categories: config.categories.clone(),
        }
    }

    /// First intent in table order whose keywords appear in `message`
    pub fn detect_intent(&self, message: &str) -> Intent {
        let message = message.trim();
        self.intents
            .iter()
            .find(|(_, pattern)| pattern.is_match(message))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Unknown)
    }

    pub fn respond(&self, message: &str, snapshot: &AnalyticsSnapshot) -> ChatReply {
        let intent = self.detect_intent(message);
        tracing::debug!(intent = intent.as_str(), "Chat intent detected");

        let text = match intent {
            Intent::Greeting => greeting(snapshot),
            Intent::Score => score_reply(snapshot),
            Intent::Risk => risk_reply(snapshot),
            Intent::AddTransaction => self.add_transaction_reply(),
            Intent::Summary => summary_reply(snapshot),
            Intent::Help => help_reply(),
            Intent::Delivery => delivery_reply(snapshot),
            Intent::Anomaly => anomaly_reply(snapshot),
            Intent::Unknown => unknown_reply(),
        };
        ChatReply { intent, text }
    }

    fn add_transaction_reply(&self) -> String {
        format!(
            "To record an expense, add it through your transaction import with a date, \
             amount and one of these categories: {}. It will be part of your next analysis.",
            self.categories.join(", ")
        )
    }
}

fn greeting(snapshot: &AnalyticsSnapshot) -> String {
    format!(
        "Hello! Your financial health score is {:.1}/100. Ask me about your score, \
         risk, spending summary, delivery orders or unusual transactions.",
        snapshot.health.display_score()
    )
}

fn score_reply(snapshot: &AnalyticsSnapshot) -> String {
    let health = &snapshot.health;
    let c = &health.components;
    let mut text = format!(
        "Financial health score: {:.1}/100 - {}\nStatus: {}\n\nComponent breakdown:\n",
        health.display_score(),
        health.grade.label(),
        health.status.as_str()
    );
    let _ = writeln!(text, "- Delivery ratio: {:.1}/100", c.delivery_ratio);
    let _ = writeln!(text, "- Volatility: {:.1}/100", c.volatility);
    let _ = writeln!(text, "- Anomaly frequency: {:.1}/100", c.anomaly_frequency);
    let _ = writeln!(text, "- Overspending control: {:.1}/100", c.overspending);

    if let Some(delta) = &snapshot.delta {
        let change = delta.score.change;
        if change > 0.0 {
            let _ = write!(text, "\nYour score improved by {:.1} points.", change);
        } else if change < 0.0 {
            let _ = write!(text, "\nYour score dropped by {:.1} points.", change.abs());
        } else {
            text.push_str("\nYour score is unchanged.");
        }
        if delta.score.grade_change != GradeChange::Unchanged {
            let _ = write!(
                text,
                " Grade moved from {} to {}.",
                delta.score.previous_grade.as_str(),
                delta.score.current_grade.as_str()
            );
        }
    }
    text
}

fn risk_reply(snapshot: &AnalyticsSnapshot) -> String {
    let risk = &snapshot.risk;
    let mut text = format!(
        "Overspending risk: {} ({:.1}%, {} estimate)\n",
        risk.level,
        risk.percentage(),
        risk.provenance.as_str()
    );

    if risk.factors.is_empty() {
        text.push_str("\nNo major risk factors detected.\n");
    } else {
        text.push_str("\nRisk factors:\n");
        for factor in &risk.factors {
            let _ = writeln!(
                text,
                "- {}: {} ({} severity)",
                factor.feature.label(),
                factor.rationale,
                factor.severity
            );
        }
    }

    text.push_str("\nRecommendations:\n");
    for rec in recommendations(risk).iter().take(3) {
        let _ = writeln!(text, "- {}", rec);
    }
    text
}

fn summary_reply(snapshot: &AnalyticsSnapshot) -> String {
    let s = &snapshot.summary;
    if s.expense_count == 0 {
        return "No spending recorded yet.".to_string();
    }

    let mut text = format!(
        "Spending summary ({} days)\n\n- Total spent: {:.2}\n- Transactions: {}\n\
         - Average: {:.2}\n- Median: {:.2}\n- Largest: {:.2}\n",
        s.date_range_days,
        s.total_spent,
        s.expense_count,
        s.average_expense,
        s.median_expense,
        s.max_expense
    );
    if let Some(top) = s.top_category() {
        let _ = writeln!(text, "- Top category: {} ({:.2})", top.category, top.total);
    }

    let w = &s.weekly;
    let trend = match w.trend {
        Trend::Increasing => format!("up {:.1}%", w.change_percentage),
        Trend::Decreasing => format!("down {:.1}%", w.change_percentage.abs()),
        Trend::Stable => "stable".to_string(),
    };
    let _ = writeln!(
        text,
        "\nThis week: {:.2} vs {:.2} the week before ({})",
        w.current_week, w.previous_week, trend
    );
    let _ = writeln!(
        text,
        "Projected next {} days: {:.2}",
        s.projection.days, s.projection.projected_amount
    );
    text
}

fn help_reply() -> String {
    [
        "I can help with:",
        "- \"What's my score?\" for your financial health breakdown",
        "- \"What's my risk?\" for your overspending forecast",
        "- \"Show me a summary\" for spending statistics",
        "- \"How much on delivery?\" for food delivery spending",
        "- \"Any unusual transactions?\" for flagged anomalies",
        "- \"Add an expense\" to learn how to record spending",
    ]
    .join("\n")
}

fn delivery_reply(snapshot: &AnalyticsSnapshot) -> String {
    let d = &snapshot.summary.delivery;
    if d.count == 0 {
        return "No food delivery orders found. Nice work cooking at home!".to_string();
    }

    let mut text = format!(
        "Food delivery\n\n- Total: {:.2}\n- Orders: {}\n- Average order: {:.2}\n\
         - Share of spending: {:.1}%\n",
        d.total, d.count, d.average_order, d.percentage
    );
    if d.percentage > 25.0 {
        text.push_str("\nDelivery spending is above the recommended 25% of your budget.");
    }
    text
}

fn anomaly_reply(snapshot: &AnalyticsSnapshot) -> String {
    if snapshot.anomalies.is_empty() {
        return "No unusual transactions detected. Your spending looks consistent.".to_string();
    }

    let mut text = format!("Found {} unusual items:\n\n", snapshot.anomalies.len());
    for record in snapshot.anomalies.iter().take(MAX_LISTED_ANOMALIES) {
        let subject = match &record.subject {
            AnomalySubject::Transaction { transaction_id, date } => {
                format!("transaction #{} on {}", transaction_id, date)
            }
            AnomalySubject::Day { date } => format!("{}", date),
            AnomalySubject::Period { start, end } => format!("{} to {}", start, end),
        };
        let _ = writeln!(
            text,
            "- [{}] {} {}: {}",
            record.severity, record.kind, subject, record.detail
        );
    }
    if snapshot.anomalies.len() > MAX_LISTED_ANOMALIES {
        let _ = writeln!(
            text,
            "...and {} more",
            snapshot.anomalies.len() - MAX_LISTED_ANOMALIES
        );
    }
    text
}

fn unknown_reply() -> String {
    "I'm not sure I understood that. Type \"help\" to see what I can do.".to_string()
}
