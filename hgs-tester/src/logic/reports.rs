use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::runner::{GameRecord, RunSummary, summarize};
use crate::common::report_timestamp;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    summary: RunSummary,
    games: &'a [GameRecord],
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    records: &[GameRecord],
    total_duration: Duration,
) -> Result<()> {
    let summary = summarize(records);
    writeln!(out)?;
    writeln!(out, "{}", "📊 Simulation Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=============================".cyan())?;
    writeln!(out, "Generated: {}", report_timestamp())?;
    writeln!(out, "Games played: {}", summary.games)?;
    writeln!(
        out,
        "Completed: {}",
        (summary.games - summary.failures).to_string().green()
    )?;
    writeln!(out, "Failed: {}", summary.failures.to_string().red())?;
    writeln!(
        out,
        "Rounds: {:.1} mean, {:.2} std dev",
        summary.mean_rounds, summary.std_rounds
    )?;
    writeln!(out, "Feasts per game: {:.2}", summary.mean_feasts)?;
    writeln!(out, "No survivors: {:.1}%", summary.no_winner_pct)?;
    if summary.capped_pct > 0.0 {
        writeln!(out, "Stopped at round cap: {:.1}%", summary.capped_pct)?;
    }
    if summary.exhausted_rounds > 0 {
        writeln!(
            out,
            "Rounds cut short by retry exhaustion: {}",
            summary.exhausted_rounds.to_string().yellow()
        )?;
    }
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for record in records {
        let status = if record.passed() {
            "✅ DONE".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{} seed {} #{} {}",
            status,
            record.seed,
            record.iteration + 1,
            record.digest.dimmed()
        )?;
        if let Some(failure) = &record.failure {
            writeln!(out, "   • {}", failure.red())?;
            continue;
        }
        let winners = if record.winners.is_empty() {
            "none".to_string()
        } else {
            record.winners.join(", ")
        };
        writeln!(out, "   Rounds: {} ({} feasts)", record.rounds, record.feasts)?;
        writeln!(out, "   Winners: {winners}")?;
        if let Some(leader) = &record.top_killer {
            writeln!(out, "   Most kills: {} ({})", leader.name, leader.kills)?;
        }
        for line in &record.transcript {
            writeln!(out, "     {line}")?;
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, records: &[GameRecord]) -> Result<()> {
    let report = JsonReport {
        generated_at: report_timestamp(),
        summary: summarize(records),
        games: records,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    records: &[GameRecord],
) -> Result<()> {
    let summary = summarize(records);
    writeln!(out, "# Hunger Games Simulation Results\n")?;
    writeln!(out, "_Generated {}_\n", report_timestamp())?;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Games played**: {}", summary.games)?;
    writeln!(out, "- **Failed**: {}", summary.failures)?;
    writeln!(out, "- **Mean rounds**: {:.1}", summary.mean_rounds)?;
    writeln!(out, "- **Mean feasts**: {:.2}", summary.mean_feasts)?;
    writeln!(out, "- **No survivors**: {:.1}%\n", summary.no_winner_pct)?;

    writeln!(out, "## Games\n")?;
    writeln!(out, "| Seed | Game | Rounds | Feasts | Winners | Digest |")?;
    writeln!(out, "|------|------|--------|--------|---------|--------|")?;
    for record in records {
        let winners = match &record.failure {
            Some(failure) => format!("❌ {failure}"),
            None if record.winners.is_empty() => "none".to_string(),
            None => record.winners.join(", "),
        };
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | `{}` |",
            record.seed, record.game_seed, record.rounds, record.feasts, winners, record.digest
        )?;
    }
    Ok(())
}
