//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use std::path::Path;

use floatchat::{fmt_value, Column, MetricsSnapshot, Response, SummaryStats, EXAMPLE_QUESTIONS};
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an answer.
pub fn print_response(response: &Response, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(response);
    }
    println!("{}", response.narrative);
    if response.stats.total_time_ms > 0 {
        println!("\n({} records, {}ms)", response.records.len(), response.stats.total_time_ms);
    }
    Ok(())
}

/// Print dashboard totals.
pub fn print_summary_stats(stats: &SummaryStats, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(stats);
    }
    println!("Total Profiles: {}", stats.total_count);
    println!("Unique Locations: {}", stats.unique_location_count);
    println!(
        "Average Temperature: {}",
        fmt_value(Column::Temp, stats.avg_temperature)
    );
    println!(
        "Average Salinity: {}",
        fmt_value(Column::Psal, stats.avg_salinity)
    );
    Ok(())
}

/// Print the outcome of `seed`.
pub fn print_seed_result(path: &Path, inserted: u64, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "inserted": inserted,
        }));
    }
    if inserted == 0 {
        println!("{} already holds the sample profiles", path.display());
    } else {
        println!("Inserted {} sample profiles into {}", inserted, path.display());
    }
    Ok(())
}

/// Print request counters.
pub fn print_metrics(snapshot: &MetricsSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(snapshot);
    }
    println!("Requests: {}", snapshot.requests_total);
    println!("Unrecognized questions: {}", snapshot.unknown_intent_total);
    println!("Empty results: {}", snapshot.empty_results_total);
    println!("Storage unavailable: {}", snapshot.storage_unavailable_total);
    println!("Schema mismatches: {}", snapshot.schema_mismatch_total);
    if let Some(mean) = snapshot.mean_request_seconds {
        println!("Mean request time: {:.1}ms", mean * 1000.0);
    }
    Ok(())
}

pub fn print_metrics_text(text: &str) {
    print!("{}", text);
}

pub fn print_notice(message: &str) {
    eprintln!("{}", message);
}

/// Print the interactive help text.
pub fn print_chat_help() {
    println!("FloatChat: ask about ARGO float profiles in plain English.");
    println!();
    println!("Example questions:");
    for example in EXAMPLE_QUESTIONS {
        println!("  - {}", example);
    }
    println!();
    println!("Commands: help, stats, metrics, metrics text, quit");
}
