//! Post history records supplied by the posting/sync collaborators

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Raw platform metrics for one post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMetrics {
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default, alias = "retweets")]
    pub reshares: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub bookmarks: u64,
    #[serde(default)]
    pub profile_clicks: u64,
    #[serde(default, alias = "url_clicks")]
    pub link_clicks: u64,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// How fresh a theme is relative to what the local market already posts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeFreshness {
    High,
    Medium,
    Low,
}

impl ThemeFreshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One published post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub posted_at: DateTime<Utc>,
    pub theme: String,
    #[serde(alias = "type")]
    pub approach: String,
    #[serde(default)]
    pub slot: Option<String>,
    #[serde(default = "default_variant")]
    pub variant: String,
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub theme_freshness: Option<ThemeFreshness>,
    #[serde(default)]
    pub metrics: Option<PostMetrics>,
}

fn default_variant() -> String {
    "a".to_string()
}

fn default_source_type() -> String {
    "original".to_string()
}

impl PostRecord {
    /// Declared slot, or the slot implied by the posting hour (UTC)
    pub fn effective_slot(&self) -> String {
        match self.slot.as_deref().map(str::trim) {
            Some(slot) if !slot.is_empty() => slot.to_string(),
            _ => slot_for_hour(self.posted_at.hour()).to_string(),
        }
    }

    /// Short weekday name ("mon" .. "sun")
    pub fn weekday(&self) -> String {
        self.posted_at.format("%a").to_string().to_lowercase()
    }
}

/// Map an hour of day onto a named posting slot
pub fn slot_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=10 => "morning",
        11..=13 => "midday",
        14..=17 => "afternoon",
        18..=22 => "evening",
        _ => "night",
    }
}

/// On-disk history: either a bare array or `{ "posts": [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryFile {
    Wrapped { posts: Vec<PostRecord> },
    Bare(Vec<PostRecord>),
}

impl HistoryFile {
    pub fn into_posts(self) -> Vec<PostRecord> {
        match self {
            Self::Wrapped { posts } | Self::Bare(posts) => posts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = r#"{
        "id": "p1",
        "posted_at": "2026-03-02T07:30:00Z",
        "theme": "side-hustle",
        "type": "story",
        "content": "I quit my job.",
        "metrics": {"impressions": 1000, "likes": 50, "retweets": 10}
    }"#;

    #[test]
    fn test_post_defaults_and_aliases() {
        let post: PostRecord = serde_json::from_str(POST).unwrap();
        assert_eq!(post.approach, "story");
        assert_eq!(post.text, "I quit my job.");
        assert_eq!(post.variant, "a");
        assert_eq!(post.source_type, "original");
        let metrics = post.metrics.unwrap();
        assert_eq!(metrics.reshares, 10);
        assert_eq!(metrics.replies, 0);
    }

    #[test]
    fn test_effective_slot_derived_from_hour() {
        let post: PostRecord = serde_json::from_str(POST).unwrap();
        assert_eq!(post.effective_slot(), "morning");
        assert_eq!(post.weekday(), "mon");
    }

    #[test]
    fn test_declared_slot_wins() {
        let mut post: PostRecord = serde_json::from_str(POST).unwrap();
        post.slot = Some("lunch".into());
        assert_eq!(post.effective_slot(), "lunch");
        post.slot = Some("  ".into());
        assert_eq!(post.effective_slot(), "morning");
    }

    #[test]
    fn test_slot_boundaries() {
        assert_eq!(slot_for_hour(4), "night");
        assert_eq!(slot_for_hour(5), "morning");
        assert_eq!(slot_for_hour(13), "midday");
        assert_eq!(slot_for_hour(17), "afternoon");
        assert_eq!(slot_for_hour(22), "evening");
        assert_eq!(slot_for_hour(23), "night");
    }

    #[test]
    fn test_history_file_shapes() {
        let bare = format!("[{POST}]");
        let wrapped = format!("{{\"posts\": [{POST}]}}");
        let a: HistoryFile = serde_json::from_str(&bare).unwrap();
        let b: HistoryFile = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(a.into_posts().len(), 1);
        assert_eq!(b.into_posts().len(), 1);
    }
}
