//! CLI subcommand handlers
//!
//! Every handler mounts the stage it works on, applies its change through
//! the stage session and saves before returning.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use colored::Colorize;
use db::models::{
    document::RichDocument,
    draft::{DraftPatch, Tone, ValidationError},
    platform::{PublishTarget, SocialPlatform},
    schedule::Recurrence,
};
use services::services::{
    clip_editor::SimulatedMedia,
    gesture::GestureOutcome,
    schedule::{self, ScheduleRequest},
    stage::Stage,
    timeline::Timeline,
    workbench::{EnhanceOutcome, StageSession, Workbench, WorkbenchError},
};

use crate::{config::Config, output::OutputHandler};

/// Shared state for one CLI invocation
pub struct CliContext {
    pub workbench: Workbench,
    pub output: OutputHandler,
    pub episode: Option<String>,
}

impl CliContext {
    async fn mount(&self, stage: Stage) -> StageSession {
        self.workbench.mount(stage, self.episode.as_deref()).await
    }

    /// Save, wait for the remote leg and report whatever happened.
    async fn finish(&self, session: &StageSession) -> Result<()> {
        let receipt = session.save().await.context("Failed to save the draft")?;
        let revision = receipt.revision;
        if let Some(outcome) = receipt.remote_outcome().await {
            tracing::debug!("Remote document {}", outcome.document().id);
        }
        self.output.print_success(&format!(
            "Saved {} (revision {})",
            session.episode_id(),
            revision
        ));
        self.flush_notices();
        Ok(())
    }

    fn flush_notices(&self) {
        let notices = self.workbench.notices().active();
        self.output.print_notices(&notices);
        self.workbench.notices().clear();
    }
}

/// Which draft field `set` writes
#[derive(Debug, Clone)]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    Body(String),
    Tone(Tone),
    Social(SocialPlatform, String),
}

pub async fn load(ctx: &CliContext, stage: Stage) -> Result<()> {
    let session = ctx.mount(stage).await;
    let draft = session.draft().await?;
    ctx.output.print_draft(&draft);
    if let Some(report) = session.score().await? {
        ctx.output.print_score(&report);
    }
    ctx.flush_notices();
    Ok(())
}

pub async fn score(ctx: &CliContext, stage: Stage) -> Result<()> {
    let session = ctx.mount(stage).await;
    match session.score().await? {
        Some(report) => {
            ctx.output.print_header(&format!("{} score", stage));
            ctx.output.print_score(&report);
        }
        None => ctx
            .output
            .print_info(&format!("The {} stage has no score.", stage)),
    }
    ctx.flush_notices();
    Ok(())
}

pub async fn keyword_add(ctx: &CliContext, stage: Stage, keyword: &str) -> Result<()> {
    let session = ctx.mount(stage).await;
    let report = session.add_keyword(keyword).await?;
    ctx.output.print_success(&format!("Added keyword '{}'", keyword.trim().to_lowercase()));
    if let Some(report) = report {
        ctx.output.print_score(&report);
    }
    ctx.finish(&session).await
}

pub async fn keyword_remove(ctx: &CliContext, stage: Stage, keyword: &str) -> Result<()> {
    let session = ctx.mount(stage).await;
    let before = session.draft().await?.keywords.len();
    let report = session.remove_keyword(keyword).await?;
    if session.draft().await?.keywords.len() == before {
        ctx.output
            .print_warning(&format!("'{}' is not a keyword", keyword));
    } else {
        ctx.output.print_success(&format!("Removed keyword '{}'", keyword));
    }
    if let Some(report) = report {
        ctx.output.print_score(&report);
    }
    ctx.finish(&session).await
}

pub async fn keyword_suggest(ctx: &CliContext, apply: bool) -> Result<()> {
    let session = ctx.mount(Stage::Metadata).await;
    let suggestions = session.suggest_tags().await?;
    if suggestions.is_empty() {
        ctx.output.print_info("No suggested tags left.");
        return Ok(());
    }
    ctx.output.print_header("Suggested tags");
    for tag in &suggestions {
        println!("  {}", tag.bright_cyan());
    }
    if !apply {
        return Ok(());
    }

    let mut report = None;
    for tag in suggestions {
        match session.add_suggested_tag(tag).await {
            Ok(r) => {
                ctx.output.print_success(&format!("Added keyword '{}'", tag));
                report = r;
            }
            Err(WorkbenchError::Validation(ValidationError::KeywordLimit)) => {
                ctx.output.print_warning("Maximum 10 keywords allowed.");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    if let Some(report) = report {
        ctx.output.print_score(&report);
    }
    ctx.finish(&session).await
}

pub async fn set_field(ctx: &CliContext, stage: Stage, update: FieldUpdate) -> Result<()> {
    let session = ctx.mount(stage).await;
    let patch = match update {
        FieldUpdate::Title(title) => DraftPatch {
            title: Some(title),
            ..Default::default()
        },
        FieldUpdate::Description(description) => DraftPatch {
            description: Some(description),
            ..Default::default()
        },
        FieldUpdate::Body(text) => DraftPatch {
            body: Some(RichDocument::from_plain_text(&text)),
            ..Default::default()
        },
        FieldUpdate::Tone(tone) => DraftPatch {
            tone: Some(tone),
            ..Default::default()
        },
        FieldUpdate::Social(platform, text) => DraftPatch {
            social_text: Some([(platform, text)].into()),
            ..Default::default()
        },
    };
    if let Some(report) = session.patch(patch).await? {
        ctx.output.print_score(&report);
    }
    ctx.finish(&session).await
}

pub async fn save(ctx: &CliContext, stage: Stage) -> Result<()> {
    let session = ctx.mount(stage).await;
    ctx.finish(&session).await
}

pub async fn clip_list(ctx: &CliContext) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    ctx.output.print_header("Clips");
    ctx.output.print_clips(&session.draft().await?.clips);
    ctx.flush_notices();
    Ok(())
}

pub async fn clip_add(
    ctx: &CliContext,
    start: f64,
    end: f64,
    label: Option<String>,
) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    let draft = session.draft().await?;
    let mut timeline = Timeline::with_clips(ctx.workbench.config().timeline_seconds, draft.clips);
    let label = label.unwrap_or_else(|| {
        format!("Clip from {}s to {}s", start.round(), end.round())
    });
    let clip = timeline.add_clip(start, end, label)?;
    session
        .patch(DraftPatch {
            clips: Some(timeline.into_clips()),
            ..Default::default()
        })
        .await?;
    ctx.output.print_success(&format!("Created clip {}", clip.label));
    ctx.finish(&session).await
}

pub async fn clip_remove(ctx: &CliContext, id_prefix: &str) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    let mut editor = session
        .clip_editor(SimulatedMedia::new(ctx.workbench.config().timeline_seconds))
        .await?;
    let matches: Vec<_> = editor
        .clips()
        .iter()
        .filter(|c| c.id.to_string().starts_with(id_prefix))
        .map(|c| c.id)
        .collect();
    let id = match matches.as_slice() {
        [id] => *id,
        [] => anyhow::bail!("No clip with id {}", id_prefix),
        _ => anyhow::bail!("Clip id {} is ambiguous", id_prefix),
    };
    if let Some(clip) = editor.remove_clip(id) {
        ctx.output.print_success(&format!("Removed clip {}", clip.label));
    }
    session.commit_clips(&editor).await?;
    ctx.finish(&session).await
}

pub async fn clip_suggest(ctx: &CliContext) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    let mut editor = session
        .clip_editor(SimulatedMedia::new(ctx.workbench.config().timeline_seconds))
        .await?;
    let added = session.suggest_clips(&mut editor).await?;
    if added == 0 {
        ctx.output.print_info("No suggested clips available.");
    }
    session.commit_clips(&editor).await?;
    ctx.output.print_clips(editor.clips());
    ctx.finish(&session).await
}

/// Drag across the track from one fraction of its width to another.
pub async fn drag(ctx: &CliContext, from: f64, to: f64) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    let mut editor = session
        .clip_editor(SimulatedMedia::new(ctx.workbench.config().timeline_seconds))
        .await?;
    editor.pointer_down(from);
    editor.pointer_move(to);
    match editor.pointer_up() {
        GestureOutcome::Created(_) => {
            session.commit_clips(&editor).await?;
            ctx.finish(&session).await
        }
        GestureOutcome::Rejected(reason) => {
            ctx.output.print_warning(&reason.to_string());
            Ok(())
        }
        GestureOutcome::Tap { at } => {
            ctx.output.print_info(&format!(
                "Too short for a clip; seek to {:.1}s",
                at
            ));
            Ok(())
        }
        GestureOutcome::Ignored => Ok(()),
    }
}

pub async fn snippets_suggest(ctx: &CliContext, apply: bool) -> Result<()> {
    let session = ctx.mount(Stage::Snippets).await;
    let suggestions = session.suggest_snippets().await?;
    ctx.output.print_header("Suggested snippets");
    ctx.output.print_snippets(&suggestions);
    if !apply {
        return Ok(());
    }
    session
        .patch(DraftPatch {
            social_text: Some(suggestions),
            ..Default::default()
        })
        .await?;
    ctx.finish(&session).await
}

pub async fn schedule_add(
    ctx: &CliContext,
    title: String,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    targets: Vec<PublishTarget>,
    recurrence: Recurrence,
) -> Result<()> {
    let session = ctx.mount(Stage::Publish).await;
    let item = session
        .schedule(ScheduleRequest {
            title,
            date,
            time,
            targets: targets.into_iter().collect::<BTreeSet<_>>(),
            recurrence,
        })
        .await?;
    ctx.output.print_info(&format!("Scheduled item {}", item.id));
    ctx.finish(&session).await
}

pub async fn schedule_list(ctx: &CliContext, days: i64) -> Result<()> {
    let session = ctx.mount(Stage::Publish).await;
    let draft = session.draft().await?;
    let due = schedule::upcoming(&draft.schedule, Utc::now().naive_utc(), days);
    ctx.output.print_header(&format!("Due in the next {} days", days));
    ctx.output.print_schedule(&due);
    ctx.flush_notices();
    Ok(())
}

pub async fn enhance(ctx: &CliContext) -> Result<()> {
    let session = ctx.mount(Stage::Blog).await;
    let mut progress = session.progress();
    let output = &ctx.output;

    let watcher = async {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            output.print_progress(&state);
            if state.is_finished() {
                break;
            }
        }
    };
    let (result, _) = tokio::join!(session.enhance(), watcher);

    match result {
        Ok(EnhanceOutcome::Applied(report)) => {
            if let Some(report) = report {
                ctx.output.print_score(&report);
            }
            ctx.finish(&session).await
        }
        Ok(EnhanceOutcome::Discarded) => {
            ctx.output.print_warning("Enhancement finished after the session changed");
            Ok(())
        }
        Err(e) => {
            ctx.flush_notices();
            Err(e).context("Enhancement failed")
        }
    }
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    let output = OutputHandler::new(false, config.display.color);
    output.print_header("Configuration");

    println!(
        "  {} {}",
        "Config file:".dimmed(),
        Config::config_path().display()
    );
    println!();

    let content = toml::to_string_pretty(config)?;
    for line in content.lines() {
        if line.starts_with('[') {
            println!("  {}", line.bright_cyan());
        } else if line.starts_with("api_key") {
            println!("  {}", "api_key = \"********\"".dimmed());
        } else {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// Set a configuration value
pub fn set_config(kv: &str) -> Result<()> {
    let (key, value) = kv
        .split_once('=')
        .context("Invalid format. Use: key=value")?;

    let mut config = Config::load()?;
    config.set(key.trim(), value.trim())?;
    config.save()?;

    let output = OutputHandler::new(false, config.display.color);
    output.print_success(&format!("Set {} = {}", key.trim(), value.trim()));
    Ok(())
}
