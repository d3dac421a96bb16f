use anyhow::Result;
use colored::Colorize;
use match_market::TargetSelection;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

/// One evaluated scenario under one seed.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    pub scenario: String,
    pub seed: u64,
    pub opponent_strategy: &'static str,
    pub opponents: usize,
    pub duration_ms: u128,
    pub selection: TargetSelection,
}

impl EvaluationRecord {
    #[must_use]
    pub fn new(
        scenario: &str,
        seed: u64,
        opponent_strategy: &'static str,
        opponents: usize,
        duration: Duration,
        selection: TargetSelection,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            opponent_strategy,
            opponents,
            duration_ms: duration.as_millis(),
            selection,
        }
    }

    fn best_label(&self) -> String {
        self.selection
            .best_target
            .map_or_else(|| "never matched".to_string(), |u| u.to_string())
    }

    fn targets_label(&self) -> String {
        self.selection
            .targets
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    records: &[EvaluationRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Target Selection Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "===========================".cyan())?;
    writeln!(writer, "Evaluations: {}", records.len())?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for record in records {
        let tally = &record.selection.tally;
        writeln!(
            writer,
            "{} seed {}",
            record.scenario.bold(),
            record.seed.to_string().yellow()
        )?;
        writeln!(
            writer,
            "   Opponents: {} ({})",
            record.opponents, record.opponent_strategy
        )?;
        writeln!(
            writer,
            "   Trials: {} | matched {:.1}%",
            tally.trials(),
            tally.match_rate() * 100.0
        )?;
        let best = record.best_label();
        if record.selection.best_target.is_some() {
            writeln!(writer, "   Best target: {}", best.green())?;
        } else {
            writeln!(writer, "   Best target: {}", best.red())?;
        }
        writeln!(
            writer,
            "   Window: starts at rank {} -> [{}]",
            record.selection.window_start,
            record.targets_label()
        )?;
        writeln!(writer, "   Duration: {}ms", record.duration_ms)?;
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_json_report(writer: &mut dyn Write, records: &[EvaluationRecord]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(records)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(
    writer: &mut dyn Write,
    records: &[EvaluationRecord],
) -> Result<()> {
    writeln!(writer, "# Match Market Target Selection\n")?;
    writeln!(
        writer,
        "| Scenario | Seed | Opponents | Trials | Match rate | Best | Window start | Targets |"
    )?;
    writeln!(writer, "|---|---|---|---|---|---|---|---|")?;
    for record in records {
        let tally = &record.selection.tally;
        writeln!(
            writer,
            "| {} | {} | {} ({}) | {} | {:.1}% | {} | {} | {} |",
            record.scenario,
            record.seed,
            record.opponents,
            record.opponent_strategy,
            tally.trials(),
            tally.match_rate() * 100.0,
            record.best_label(),
            record.selection.window_start,
            record.targets_label()
        )?;
    }
    Ok(())
}
