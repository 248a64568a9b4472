//! Analysis command: score, anomalies, risk and nudges for one export

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use nudge_core::{AnalyticsSnapshot, RiskLevel, Severity, Tone};

use super::{build_aggregator, load_transactions, signed, EngineArgs};

pub fn cmd_analyze(
    engine: &EngineArgs<'_>,
    file: &Path,
    previous: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let aggregator = build_aggregator(engine)?;
    let transactions = load_transactions(file)?;

    let snapshot = match previous {
        Some(path) => {
            let previous = load_snapshot(path)?;
            aggregator.analyze_with_previous(&transactions, &previous)
        }
        None => aggregator.analyze(&transactions),
    };

    if let Some(path) = output {
        let content = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_report(&snapshot);
        if let Some(path) = output {
            println!("💾 Snapshot saved to {}", path.display());
        }
    }

    Ok(())
}

/// Read a snapshot written by `analyze --output`
pub fn load_snapshot(path: &Path) -> Result<AnalyticsSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot file {}", path.display()))
}

fn tone_icon(tone: Tone) -> &'static str {
    match tone {
        Tone::Encouraging => "🎉",
        Tone::Warning => "⚠️ ",
        Tone::Critical => "🚨",
        Tone::Neutral => "💡",
    }
}

fn risk_icon(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "🟢",
        RiskLevel::Moderate => "🟡",
        RiskLevel::High => "🔴",
    }
}

pub fn print_report(snapshot: &AnalyticsSnapshot) {
    let health = &snapshot.health;
    let c = &health.components;

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│        💰 Budget Nudge Analysis         │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    if let Some(as_of) = snapshot.as_of {
        println!("  As of:           {}", as_of.format("%Y-%m-%d"));
    }
    println!("  Transactions:    {}", snapshot.transaction_count);
    if snapshot.skipped_transactions > 0 {
        println!("  Skipped:         {} (invalid)", snapshot.skipped_transactions);
    }
    println!();

    println!("📊 Financial Health");
    println!("   ─────────────────────────────");
    println!(
        "   Score: {:.1}/100  {}  ({})",
        health.display_score(),
        health.grade.label(),
        health.status.as_str()
    );
    if health.insufficient_data {
        println!("   (not enough data, components are neutral)");
    }
    println!("   Delivery ratio:       {:>5.1}", c.delivery_ratio);
    println!("   Volatility:           {:>5.1}", c.volatility);
    println!("   Anomaly frequency:    {:>5.1}", c.anomaly_frequency);
    println!("   Overspending control: {:>5.1}", c.overspending);

    if let Some(delta) = &snapshot.delta {
        println!(
            "   Change: {} points ({} → {})",
            signed(delta.score.change),
            delta.score.previous_grade.as_str(),
            delta.score.current_grade.as_str()
        );
    }
    println!();

    let risk = &snapshot.risk;
    println!("{} Overspend Risk", risk_icon(risk.level));
    println!("   ─────────────────────────────");
    println!(
        "   {} ({:.1}%, {} estimate)",
        risk.level,
        risk.percentage(),
        risk.provenance.as_str()
    );
    for factor in &risk.factors {
        println!("   • {}: {}", factor.feature.label(), factor.rationale);
        println!("     → {}", factor.recommendation);
    }
    println!();

    println!("🔍 Anomalies ({})", snapshot.anomalies.len());
    println!("   ─────────────────────────────");
    if snapshot.anomalies.is_empty() {
        println!("   None detected");
    }
    for record in &snapshot.anomalies {
        let marker = match record.severity {
            Severity::High => "‼",
            Severity::Moderate => "!",
        };
        let category = record
            .category
            .as_deref()
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default();
        println!(
            "   {} {}{} from {}: {}",
            marker,
            record.kind,
            category,
            record.subject.start_date(),
            record.detail
        );
    }
    println!();

    println!("💬 Nudges");
    println!("   ─────────────────────────────");
    for (i, nudge) in snapshot.nudges.iter().enumerate() {
        let lead = if i == 0 { "▶" } else { " " };
        println!("   {} {} {}", lead, tone_icon(nudge.tone), nudge.message);
    }
    println!();
}
