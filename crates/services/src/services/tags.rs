//! Suggested tags for the metadata stage.

use db::models::draft::EpisodeDraft;

/// Tags offered on every episode until the draft carries them.
pub const SUGGESTED_TAGS: [&str; 4] = ["content creation", "seo", "blogging", "audio content"];

/// The fixed suggestions minus tags the draft already has. Removing a
/// suggested tag from the draft puts it back on the list.
pub fn suggest_tags(draft: &EpisodeDraft) -> Vec<&'static str> {
    SUGGESTED_TAGS
        .iter()
        .copied()
        .filter(|tag| !draft.keywords.contains(tag))
        .collect()
}
