use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Workbench stages in pipeline order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Blog,
    Metadata,
    Snippets,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Blog, Stage::Metadata, Stage::Snippets, Stage::Publish];

    /// Remote document collection this stage persists into.
    pub fn collection(&self) -> &'static str {
        match self {
            Stage::Blog => "blog_posts",
            Stage::Metadata => "metadata",
            Stage::Snippets => "snippets",
            Stage::Publish => "publish_queue",
        }
    }

    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Blog => Some(Stage::Metadata),
            Stage::Metadata => Some(Stage::Snippets),
            Stage::Snippets => Some(Stage::Publish),
            Stage::Publish => None,
        }
    }

    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Blog => None,
            Stage::Metadata => Some(Stage::Blog),
            Stage::Snippets => Some(Stage::Metadata),
            Stage::Publish => Some(Stage::Snippets),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Blog => "blog",
            Stage::Metadata => "metadata",
            Stage::Snippets => "snippets",
            Stage::Publish => "publish",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blog" | "blog_posts" => Ok(Stage::Blog),
            "metadata" => Ok(Stage::Metadata),
            "snippets" | "social" => Ok(Stage::Snippets),
            "publish" | "publishing" | "publish_queue" => Ok(Stage::Publish),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_is_linear() {
        let mut stage = Stage::Blog;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert_eq!(next.previous(), Some(stage));
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, Stage::ALL);
        assert_eq!("publish_queue".parse::<Stage>(), Ok(Stage::Publish));
    }
}
