//! Podflow CLI - drive the editorial workbench from the terminal
//!
//! Each invocation mounts one stage for the active episode, applies a
//! change and saves it to the local slot database and, when configured,
//! to the remote document store.

mod commands;
mod config;
mod output;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use db::{
    models::{
        draft::Tone,
        platform::{PublishTarget, SocialPlatform},
        schedule::Recurrence,
    },
    DBService,
};
use services::services::{
    slots::{MemorySlotStore, SlotStore, SqliteSlots},
    stage::Stage,
    workbench::Workbench,
};

use crate::{
    commands::{CliContext, FieldUpdate},
    output::OutputHandler,
};

/// Podflow CLI - editorial workbench for podcast episodes
#[derive(Parser)]
#[command(name = "podflow")]
#[command(author = "Podflow Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Edit, score and schedule podcast episode content")]
#[command(long_about = r#"
Podflow walks one episode through the blog, metadata, snippets and publish
stages. Drafts are kept in a local slot database and pushed to the remote
document store on every save.

Examples:
  podflow -e ep-42 load               # Load an episode and show its score
  podflow set title "AI and Podcasting"
  podflow keyword add ai
  podflow drag 0.10 0.20              # Carve a clip out of the timeline
  podflow schedule add "Launch" --date 2026-11-02 --time 09:30 -t spotify
"#)]
struct Cli {
    /// Episode to work on (defaults to the cached draft's episode)
    #[arg(short, long, env = "PODFLOW_EPISODE")]
    episode: Option<String>,

    /// Stage whose rubric scores the draft and whose section is pushed on save
    #[arg(short, long)]
    stage: Option<Stage>,

    /// Ignore configured remote endpoints
    #[arg(long)]
    offline: bool,

    /// Keep the draft in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the episode and show the draft with its score
    Load,

    /// Show the score report for the stage
    Score,

    /// Add or remove keywords
    Keyword {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Set a draft field
    Set {
        #[command(subcommand)]
        field: SetField,
    },

    /// Save the draft locally and remotely
    Save,

    /// Manage clips
    Clip {
        #[command(subcommand)]
        action: ClipAction,
    },

    /// Drag across the timeline, from and to as fractions of its width
    Drag { from: f64, to: f64 },

    /// Suggest social snippets from the draft
    Snippets {
        /// Write the suggestions into the draft
        #[arg(long)]
        apply: bool,
    },

    /// Schedule publishing
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Request content enhancement and wait for it
    Enhance,

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeywordAction {
    Add { keyword: String },
    Remove { keyword: String },
    /// List suggested tags the draft does not have yet
    Suggest {
        /// Add every suggestion that still fits under the keyword cap
        #[arg(long)]
        apply: bool,
    },
}

#[derive(Subcommand)]
enum SetField {
    Title { text: String },
    Description { text: String },
    /// Body as plain text; blank lines separate paragraphs
    Body { text: String },
    Tone { tone: Tone },
    Social { platform: SocialPlatform, text: String },
}

#[derive(Subcommand)]
enum ClipAction {
    List,
    Add {
        start: f64,
        end: f64,
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Remove a clip by id or id prefix
    Remove { id: String },
    /// Pull clip suggestions from the episode API
    Suggest,
}

#[derive(Subcommand)]
enum ScheduleAction {
    Add {
        title: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        /// HH:MM or HH:MM:SS
        #[arg(long, value_parser = parse_time)]
        time: Option<NaiveTime>,
        #[arg(short, long = "target")]
        targets: Vec<PublishTarget>,
        #[arg(short, long, default_value = "none")]
        recurrence: Recurrence,
    },
    List {
        #[arg(short, long, default_value = "7")]
        days: i64,
    },
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| format!("Invalid time '{}', expected HH:MM", raw))
}

async fn open_slots(ephemeral: bool) -> Result<Arc<dyn SlotStore>> {
    if ephemeral {
        return Ok(Arc::new(MemorySlotStore::new()));
    }
    let db = DBService::new()
        .await
        .context("Failed to open the slot database")?;
    Ok(Arc::new(SqliteSlots::new(db.pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init_tracing(&["podflow_cli", "services", "db"], cli.verbose);

    let config = config::Config::load()?;

    // Configuration commands never touch the workbench
    if let Commands::Config { show, set } = &cli.command {
        return match set {
            Some(kv) if !show => commands::set_config(kv),
            _ => commands::show_config(&config),
        };
    }

    let stage = cli.stage.unwrap_or_else(|| config.default_stage());
    let slots = open_slots(cli.ephemeral).await?;
    let workbench = Workbench::from_config(config.workbench_config(cli.offline), slots);
    let ctx = CliContext {
        workbench,
        output: OutputHandler::new(config.display.show_checks, config.display.color),
        episode: cli.episode.or(config.session.default_episode.clone()),
    };

    let result = match cli.command {
        Commands::Load => commands::load(&ctx, stage).await,
        Commands::Score => commands::score(&ctx, stage).await,
        Commands::Keyword { action } => match action {
            KeywordAction::Add { keyword } => commands::keyword_add(&ctx, stage, &keyword).await,
            KeywordAction::Remove { keyword } => {
                commands::keyword_remove(&ctx, stage, &keyword).await
            }
            KeywordAction::Suggest { apply } => commands::keyword_suggest(&ctx, apply).await,
        },
        Commands::Set { field } => {
            let update = match field {
                SetField::Title { text } => FieldUpdate::Title(text),
                SetField::Description { text } => FieldUpdate::Description(text),
                SetField::Body { text } => FieldUpdate::Body(text),
                SetField::Tone { tone } => FieldUpdate::Tone(tone),
                SetField::Social { platform, text } => FieldUpdate::Social(platform, text),
            };
            commands::set_field(&ctx, stage, update).await
        }
        Commands::Save => commands::save(&ctx, stage).await,
        Commands::Clip { action } => match action {
            ClipAction::List => commands::clip_list(&ctx).await,
            ClipAction::Add { start, end, label } => {
                commands::clip_add(&ctx, start, end, label).await
            }
            ClipAction::Remove { id } => commands::clip_remove(&ctx, &id).await,
            ClipAction::Suggest => commands::clip_suggest(&ctx).await,
        },
        Commands::Drag { from, to } => commands::drag(&ctx, from, to).await,
        Commands::Snippets { apply } => commands::snippets_suggest(&ctx, apply).await,
        Commands::Schedule { action } => match action {
            ScheduleAction::Add {
                title,
                date,
                time,
                targets,
                recurrence,
            } => commands::schedule_add(&ctx, title, date, time, targets, recurrence).await,
            ScheduleAction::List { days } => commands::schedule_list(&ctx, days).await,
        },
        Commands::Enhance => commands::enhance(&ctx).await,
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = &result {
        ctx.output.print_error(&format!("{:#}", e));
    }
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_schedule_arguments() {
        let cli = Cli::try_parse_from([
            "podflow", "schedule", "add", "Launch", "--date", "2026-11-02", "--time", "09:30",
            "-t", "spotify", "-t", "youtube", "-r", "weekly",
        ])
        .unwrap();
        let Commands::Schedule {
            action:
                ScheduleAction::Add {
                    time,
                    targets,
                    recurrence,
                    ..
                },
        } = cli.command
        else {
            panic!("expected schedule add");
        };
        assert_eq!(time, NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(targets, vec![PublishTarget::Spotify, PublishTarget::YouTube]);
        assert_eq!(recurrence, Recurrence::Weekly);
    }

    #[test]
    fn test_parses_keyword_suggest() {
        let cli = Cli::try_parse_from(["podflow", "keyword", "suggest", "--apply"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Keyword {
                action: KeywordAction::Suggest { apply: true }
            }
        ));
    }

    #[test]
    fn test_rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["podflow", "--stage", "transcript", "score"]).is_err());
        let cli = Cli::try_parse_from(["podflow", "-s", "metadata", "score"]).unwrap();
        assert_eq!(cli.stage, Some(Stage::Metadata));
    }
}
