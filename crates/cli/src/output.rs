//! Output formatting and terminal rendering

use chrono::NaiveDateTime;
use colored::Colorize;
use db::models::{
    clip::{Clip, ClipSource},
    draft::EpisodeDraft,
    platform::SocialPlatform,
    schedule::ScheduledItem,
};
use services::services::{
    notices::{Notice, NoticeLevel},
    progress::OperationProgress,
    scoring::{ScoreBand, ScoreReport},
    snippets,
    timeline::format_time,
};

/// Shorten to `max` characters, marking the cut
fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Output handler for terminal display
pub struct OutputHandler {
    pub show_checks: bool,
}

impl OutputHandler {
    pub fn new(show_checks: bool, color: bool) -> Self {
        if !color {
            colored::control::set_override(false);
        }
        Self { show_checks }
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        eprintln!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    pub fn print_notices(&self, notices: &[Notice]) {
        for notice in notices {
            match notice.level {
                NoticeLevel::Info => self.print_info(&notice.message),
                NoticeLevel::Success => self.print_success(&notice.message),
                NoticeLevel::Warning => self.print_warning(&notice.message),
                NoticeLevel::Error => self.print_error(&notice.message),
            }
        }
    }

    pub fn print_draft(&self, draft: &EpisodeDraft) {
        self.print_header(&format!("Episode {}", draft.episode_id));
        let field = |name: &str, value: String| {
            println!("  {:<13} {}", format!("{}:", name).dimmed(), value);
        };
        field("Title", draft.title_text().bright_white().to_string());
        field("Description", preview(draft.description_text(), 70));
        field("Body", preview(&draft.body_text(), 70));
        field(
            "Words",
            draft
                .body
                .as_ref()
                .map_or(0, |b| b.word_count())
                .to_string(),
        );
        field(
            "Keywords",
            draft.keywords.iter().collect::<Vec<_>>().join(", ").bright_cyan().to_string(),
        );
        field(
            "Tone",
            draft.tone.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
        );
        field("Clips", draft.clips.len().to_string());
        field("Scheduled", draft.schedule.len().to_string());
        field(
            "Last saved",
            draft
                .last_saved
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".dimmed().to_string()),
        );
    }

    pub fn print_score(&self, report: &ScoreReport) {
        let value = format!("{}/100", report.value);
        let value = match report.band() {
            ScoreBand::Good => value.bright_green(),
            ScoreBand::Fair => value.bright_yellow(),
            ScoreBand::Poor => value.bright_red(),
        };
        println!(
            "  {} {} {}",
            "SEO score:".dimmed(),
            value.bold(),
            format!("({})", report.band()).dimmed()
        );
        if self.show_checks {
            for check in &report.checks {
                let mark = if check.passed {
                    "✓".bright_green()
                } else {
                    "✗".bright_red()
                };
                println!("    {} {}", mark, check.description);
            }
        }
    }

    pub fn print_clips(&self, clips: &[Clip]) {
        if clips.is_empty() {
            self.print_info("No clips yet.");
            return;
        }
        println!(
            "  {:<10} {:<14} {:<10} {}",
            "ID".bright_white(),
            "Range".bright_white(),
            "Source".bright_white(),
            "Label".bright_white()
        );
        for clip in clips {
            let source = match clip.source {
                ClipSource::Manual => "manual".normal(),
                ClipSource::Suggested => "suggested".bright_cyan(),
            };
            let id = clip.id.to_string();
            println!(
                "  {:<10} {:<14} {:<10} {}",
                id[..8].dimmed(),
                format!(
                    "{} - {}",
                    format_time(clip.start_seconds),
                    format_time(clip.end_seconds)
                ),
                source,
                clip.label
            );
        }
    }

    pub fn print_snippets<'a>(
        &self,
        snippets: impl IntoIterator<Item = (&'a SocialPlatform, &'a String)>,
    ) {
        for (platform, text) in snippets {
            let remaining = snippets::remaining(*platform, text);
            let counter = format!("{} left", remaining);
            let counter = if remaining < 0 {
                counter.bright_red()
            } else {
                counter.dimmed()
            };
            println!("  {} {}", platform.to_string().bright_white().bold(), counter);
            for line in text.lines() {
                println!("    {}", line);
            }
        }
    }

    pub fn print_schedule(&self, due: &[(NaiveDateTime, &ScheduledItem)]) {
        if due.is_empty() {
            self.print_info("Nothing scheduled in this window.");
            return;
        }
        for (at, item) in due {
            let targets = item
                .targets
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {} {} {} {}",
                at.format("%Y-%m-%d %H:%M").to_string().bright_cyan(),
                item.title.bright_white(),
                format!("[{}]", targets).dimmed(),
                format!("({}, {})", item.recurrence, item.id).dimmed()
            );
        }
    }

    pub fn print_progress(&self, progress: &OperationProgress) {
        let width = 30;
        let filled = (progress.fraction() * width as f64).round() as usize;
        let bar = format!(
            "{}{}",
            "█".repeat(filled.min(width)),
            "░".repeat(width - filled.min(width))
        );
        println!("  {} {}", bar.bright_cyan(), progress.to_string().dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_cuts() {
        assert_eq!(preview("one\n\ntwo", 20), "one two");
        assert_eq!(preview("abcdefghij", 5), "abcd…");
    }
}
