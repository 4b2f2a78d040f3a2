//! CLI command implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use floatchat::{
    create_store, get_metrics, sample_records, seed_database, Config, MemoryStore, QueryEngine,
    StorageBackendType,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::output;

fn build_engine(config: &Config) -> anyhow::Result<QueryEngine> {
    let store = create_store(config).context("failed to open profile store")?;
    Ok(QueryEngine::from_config(store, config))
}

/// Run `ask`.
pub async fn run_ask(config: &Config, question: &str, json: bool) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let response = engine.handle(question).await;
    output::print_response(&response, json)
}

/// Run `stats`.
pub async fn run_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let stats = engine
        .summary_stats()
        .await
        .context("failed to compute summary statistics")?;
    output::print_summary_stats(&stats, json)
}

/// Run `seed`.
pub async fn run_seed(config: &Config, path: Option<String>, json: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => std::path::PathBuf::from(shellexpand::tilde(&p).as_ref()),
        None => config.database_path(),
    };
    let inserted = seed_database(&path, &config.storage.table, &sample_records())
        .await
        .with_context(|| format!("failed to seed {}", path.display()))?;
    output::print_seed_result(&path, inserted, json)
}

/// One line of chat input.
#[derive(Debug, PartialEq)]
enum ChatCommand<'a> {
    Help,
    Stats,
    Metrics,
    /// Metrics in the Prometheus text format
    MetricsText,
    Quit,
    Question(&'a str),
}

impl<'a> ChatCommand<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let input = line.trim();
        let command = match input.to_lowercase().as_str() {
            "" => return None,
            "quit" | "exit" => Self::Quit,
            "help" => Self::Help,
            "stats" => Self::Stats,
            "metrics" => Self::Metrics,
            "metrics text" | "metrics prometheus" => Self::MetricsText,
            _ => Self::Question(input),
        };
        Some(command)
    }
}

/// Run the interactive loop.
pub async fn run_chat(config: &Config, json: bool) -> anyhow::Result<()> {
    let engine = match config.storage.backend {
        StorageBackendType::Sqlite if !config.database_path().exists() => {
            output::print_notice(&format!(
                "Database {} not found; answering from the built-in sample profiles. \
                 Run `floatchat seed` to create it.",
                config.database_path().display()
            ));
            QueryEngine::from_config(Arc::new(MemoryStore::new(sample_records())), config)
        }
        _ => build_engine(config)?,
    };

    output::print_chat_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatCommand::parse(&line) {
            None => continue,
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Help) => output::print_chat_help(),
            Some(ChatCommand::Stats) => match engine.summary_stats().await {
                Ok(stats) => output::print_summary_stats(&stats, json)?,
                Err(e) => output::print_notice(&format!("Could not compute statistics: {e}")),
            },
            Some(ChatCommand::Metrics) => output::print_metrics(&get_metrics().snapshot(), json)?,
            Some(ChatCommand::MetricsText) => {
                output::print_metrics_text(&get_metrics().gather_text())
            }
            Some(ChatCommand::Question(question)) => {
                let response = engine.handle(question).await;
                output::print_response(&response, json)?;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_commands() {
        assert_eq!(ChatCommand::parse("   "), None);
        assert_eq!(ChatCommand::parse("EXIT"), Some(ChatCommand::Quit));
        assert_eq!(ChatCommand::parse(" stats "), Some(ChatCommand::Stats));
        assert_eq!(ChatCommand::parse("metrics"), Some(ChatCommand::Metrics));
        assert_eq!(
            ChatCommand::parse("metrics prometheus"),
            Some(ChatCommand::MetricsText)
        );
    }

    #[test]
    fn test_summary_is_a_question() {
        assert_eq!(
            ChatCommand::parse("  Summary "),
            Some(ChatCommand::Question("Summary"))
        );
    }
}
