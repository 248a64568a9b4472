//! Chat command: keyword assistant over one export

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use nudge_core::ChatResponder;

use super::{build_aggregator, load_transactions, EngineArgs};

pub fn cmd_chat(engine: &EngineArgs<'_>, file: &Path, message: Option<&str>) -> Result<()> {
    let aggregator = build_aggregator(engine)?;
    let snapshot = aggregator.analyze(&load_transactions(file)?);
    let responder = ChatResponder::new(aggregator.config());

    if let Some(message) = message {
        println!("{}", responder.respond(message, &snapshot).text);
        return Ok(());
    }

    println!("💬 Ask about your score, risk, summary, delivery or anomalies. Type 'quit' to exit.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        println!("{}", responder.respond(line, &snapshot).text);
        println!();
    }

    Ok(())
}
