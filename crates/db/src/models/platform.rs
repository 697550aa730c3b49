use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Platforms that get a short social snippet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Twitter,
    Instagram,
    TikTok,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 3] = [
        SocialPlatform::Twitter,
        SocialPlatform::Instagram,
        SocialPlatform::TikTok,
    ];

    /// Character limit, counted in Unicode scalar values.
    pub fn max_length(&self) -> usize {
        match self {
            SocialPlatform::Twitter => 280,
            SocialPlatform::Instagram => 2200,
            SocialPlatform::TikTok => 150,
        }
    }

    /// Snippet text used when nothing has been written or generated yet.
    pub fn default_text(&self) -> &'static str {
        match self {
            SocialPlatform::Twitter => "Check out our latest podcast episode! #podcast #content",
            SocialPlatform::Instagram => "New episode alert! 🎙️ Tune in now! #podcastlife",
            SocialPlatform::TikTok => "New episode dropping soon! 🎧 #podcast #fyp",
        }
    }
}

impl std::fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SocialPlatform::Twitter => "twitter",
            SocialPlatform::Instagram => "instagram",
            SocialPlatform::TikTok => "tiktok",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SocialPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(SocialPlatform::Twitter),
            "instagram" => Ok(SocialPlatform::Instagram),
            "tiktok" => Ok(SocialPlatform::TikTok),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Where a finished episode can be scheduled for publishing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PublishTarget {
    Twitter,
    Instagram,
    Spotify,
    YouTube,
    Apple,
}

impl PublishTarget {
    pub const ALL: [PublishTarget; 5] = [
        PublishTarget::Twitter,
        PublishTarget::Instagram,
        PublishTarget::Spotify,
        PublishTarget::YouTube,
        PublishTarget::Apple,
    ];
}

impl std::fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PublishTarget::Twitter => "twitter",
            PublishTarget::Instagram => "instagram",
            PublishTarget::Spotify => "spotify",
            PublishTarget::YouTube => "youtube",
            PublishTarget::Apple => "apple",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for PublishTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(PublishTarget::Twitter),
            "instagram" => Ok(PublishTarget::Instagram),
            "spotify" => Ok(PublishTarget::Spotify),
            "youtube" => Ok(PublishTarget::YouTube),
            "apple" | "apple_podcasts" => Ok(PublishTarget::Apple),
            _ => Err(format!("Unknown publish target: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_serde_names() {
        let json = serde_json::to_string(&SocialPlatform::TikTok).unwrap();
        assert_eq!(json, "\"tiktok\"");
        let target: PublishTarget = serde_json::from_str("\"youtube\"").unwrap();
        assert_eq!(target, PublishTarget::YouTube);
    }

    #[test]
    fn test_default_texts_fit_limits() {
        for platform in SocialPlatform::ALL {
            assert!(platform.default_text().chars().count() <= platform.max_length());
            assert_eq!(platform.to_string().parse::<SocialPlatform>(), Ok(platform));
        }
    }
}
