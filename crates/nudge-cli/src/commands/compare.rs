//! Compare command: how spending health moved between two exports

use std::path::Path;

use anyhow::Result;
use nudge_core::{compare_snapshots, GradeChange};

use super::{build_aggregator, load_transactions, signed, EngineArgs};

pub fn cmd_compare(
    engine: &EngineArgs<'_>,
    previous: &Path,
    current: &Path,
    json: bool,
) -> Result<()> {
    let aggregator = build_aggregator(engine)?;

    let before = aggregator.analyze(&load_transactions(previous)?);
    let after = aggregator.analyze(&load_transactions(current)?);
    let delta = compare_snapshots(&before, &after);

    if json {
        println!("{}", serde_json::to_string_pretty(&delta)?);
        return Ok(());
    }

    let arrow = match delta.score.grade_change {
        GradeChange::Improved => "📈",
        GradeChange::Declined => "📉",
        GradeChange::Unchanged => "➡️ ",
    };

    println!();
    println!("{} Health Score Comparison", arrow);
    println!("   ─────────────────────────────");
    println!(
        "   Score: {:.1} → {:.1} ({})",
        delta.score.previous_score,
        delta.score.current_score,
        signed(delta.score.change)
    );
    println!(
        "   Grade: {} → {}",
        delta.score.previous_grade.label(),
        delta.score.current_grade.label()
    );
    println!(
        "   Risk:  {} → {} ({} pts)",
        delta.previous_risk_level,
        delta.current_risk_level,
        signed(delta.risk_probability_change * 100.0)
    );
    println!("   Anomalies: {:+}", delta.anomaly_count_change);
    println!();

    Ok(())
}
