use std::collections::BTreeMap;

use db::models::{draft::EpisodeDraft, platform::SocialPlatform};
use utils::text::{char_count, truncate_chars};

/// Characters left before hitting the platform limit; negative when over.
pub fn remaining(platform: SocialPlatform, text: &str) -> i64 {
    platform.max_length() as i64 - char_count(text) as i64
}

pub fn within_limit(platform: SocialPlatform, text: &str) -> bool {
    remaining(platform, text) >= 0
}

fn hashtag(keyword: &str) -> String {
    let tag: String = keyword.chars().filter(|c| c.is_alphanumeric()).collect();
    format!("#{tag}")
}

fn hashtags(draft: &EpisodeDraft, limit: usize) -> String {
    let mut tags: Vec<String> = draft
        .keywords
        .iter()
        .map(hashtag)
        .filter(|t| t.len() > 1)
        .take(limit)
        .collect();
    if tags.is_empty() {
        tags.push("#podcast".to_string());
    }
    tags.join(" ")
}

/// Template snippets for every platform, built from the title, keywords and
/// first clip. The same draft always produces the same text.
pub fn suggest_snippets(draft: &EpisodeDraft) -> BTreeMap<SocialPlatform, String> {
    let title = draft.title_text().trim();
    if title.is_empty() {
        return SocialPlatform::ALL
            .iter()
            .map(|p| (*p, p.default_text().to_string()))
            .collect();
    }

    let clip = draft.clips.first().map(|c| c.label.trim()).filter(|l| !l.is_empty());
    let description = draft.description_text().trim();

    let twitter = format!("🎙️ New episode: {title}. Listen now! {}", hashtags(draft, 3));

    let mut instagram = format!("New episode alert! 🎙️ {title}");
    if !description.is_empty() {
        instagram.push_str("\n\n");
        instagram.push_str(description);
    }
    if let Some(clip) = clip {
        instagram.push_str(&format!("\n\nDon't miss: {clip}"));
    }
    instagram.push_str("\n\n");
    instagram.push_str(&hashtags(draft, 10));

    let tiktok = format!("{} 🎧 {}", clip.unwrap_or(title), hashtags(draft, 2));

    [
        (SocialPlatform::Twitter, twitter),
        (SocialPlatform::Instagram, instagram),
        (SocialPlatform::TikTok, tiktok),
    ]
    .into_iter()
    .map(|(platform, text)| (platform, truncate_chars(&text, platform.max_length())))
    .collect()
}

#[cfg(test)]
mod tests {
    use db::models::{
        clip::{Clip, ClipSource},
        draft::KeywordSet,
    };
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_remaining_counts_chars_not_bytes() {
        assert_eq!(remaining(SocialPlatform::TikTok, "🎧"), 149);
        assert_eq!(remaining(SocialPlatform::Twitter, &"a".repeat(281)), -1);
        assert!(!within_limit(SocialPlatform::Twitter, &"a".repeat(281)));
        assert!(within_limit(SocialPlatform::Instagram, &"a".repeat(2200)));
    }

    #[test]
    fn test_suggestions_use_draft_content() {
        let mut draft = EpisodeDraft::new("ep-1");
        draft.title = Some("AI and Podcasting".into());
        draft.keywords = KeywordSet::from_lenient(["ai", "content creation"]);
        draft.clips.push(Clip {
            id: Uuid::new_v4(),
            start_seconds: 30.0,
            end_seconds: 45.0,
            label: "The big reveal".into(),
            source: ClipSource::Manual,
        });

        let snippets = suggest_snippets(&draft);
        assert_eq!(
            snippets[&SocialPlatform::Twitter],
            "🎙️ New episode: AI and Podcasting. Listen now! #ai #contentcreation"
        );
        assert_eq!(
            snippets[&SocialPlatform::TikTok],
            "The big reveal 🎧 #ai #contentcreation"
        );
        assert!(snippets[&SocialPlatform::Instagram].contains("Don't miss: The big reveal"));
        assert_eq!(snippets, suggest_snippets(&draft));
    }

    #[test]
    fn test_suggestions_respect_limits() {
        let mut draft = EpisodeDraft::new("ep-1");
        draft.title = Some("x".repeat(500));
        for (platform, text) in suggest_snippets(&draft) {
            assert!(within_limit(platform, &text), "{platform} too long");
        }
    }

    #[test]
    fn test_untitled_draft_gets_defaults() {
        let snippets = suggest_snippets(&EpisodeDraft::new("ep-1"));
        assert_eq!(
            snippets[&SocialPlatform::Twitter],
            SocialPlatform::Twitter.default_text()
        );
    }
}
