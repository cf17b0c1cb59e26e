//! Search command
//!
//! Runs a repository search straight against the configured store.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::Parser;
use colored::Colorize;
use logkeep::config;
use logkeep::context::OpContext;
use logkeep::models::LogEntry;
use logkeep::repository::SearchParams;
use logkeep::server::connect_repository;
use std::path::Path;

/// Search stored log entries
#[derive(Debug, Clone, Parser)]
pub struct SearchArgs {
    /// Filter by exact log level (e.g. error, warn)
    #[arg(short, long)]
    pub level: Option<String>,

    /// Case-insensitive substring of the message
    #[arg(short, long)]
    pub grep: Option<String>,

    /// Only entries newer than N seconds ago (e.g., 3600 for last hour)
    #[arg(long)]
    pub since: Option<u64>,

    /// Only entries older than N seconds ago
    #[arg(long)]
    pub until: Option<u64>,

    /// Maximum number of results (0 uses the default of 100, capped at 1000)
    #[arg(long, default_value = "100")]
    pub limit: i64,

    /// Number of matching entries to skip
    #[arg(long, default_value = "0")]
    pub offset: i64,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

impl SearchArgs {
    fn to_params(&self, now: DateTime<Utc>) -> SearchParams {
        let ago = |secs: u64| {
            i64::try_from(secs)
                .ok()
                .and_then(ChronoDuration::try_seconds)
                .and_then(|d| now.checked_sub_signed(d))
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        };
        SearchParams {
            level: self.level.clone(),
            message_contains: self.grep.clone(),
            since: self.since.map(ago),
            until: self.until.map(ago),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Execute the search command
pub async fn execute(config_path: &Path, args: SearchArgs) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    // searches never read the cache
    let repo = connect_repository(&cfg, false).await?;

    let params = args.to_params(Utc::now());
    let ctx = OpContext::with_timeout(cfg.server.request_timeout());
    let result = repo.search(&ctx, &params).await;
    repo.close().await;
    let entries = result?;

    if entries.is_empty() {
        println!("{}", "No log entries found matching the criteria".yellow());
        return Ok(());
    }

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => display_entries_text(&entries),
    }

    Ok(())
}

fn display_entries_text(entries: &[LogEntry]) {
    println!("{}", format!("Found {} log entries", entries.len()).bold());
    println!();

    for entry in entries {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");

        let level_colored = match entry.level.to_ascii_lowercase().as_str() {
            "error" => entry.level.red().bold(),
            "warn" | "warning" => entry.level.yellow().bold(),
            "info" => entry.level.green(),
            "debug" => entry.level.blue(),
            _ => entry.level.normal(),
        };

        println!(
            "{} {} {} {}",
            timestamp.to_string().dimmed(),
            format!("#{}", entry.id).cyan(),
            level_colored,
            entry.message
        );
    }
}
