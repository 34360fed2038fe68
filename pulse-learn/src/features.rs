//! Text feature extraction
//!
//! Derives a fixed-shape feature record from post text. Pure: no randomness,
//! no IO, same text in means the same record out.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Opening-line rhetorical pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPattern {
    Empathy,
    Question,
    Data,
    Contrast,
    Discovery,
    Confession,
    Neutral,
}

impl HookPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empathy => "empathy",
            Self::Question => "question",
            Self::Data => "data",
            Self::Contrast => "contrast",
            Self::Discovery => "discovery",
            Self::Confession => "confession",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Mixed => "mixed",
            Self::Neutral => "neutral",
        }
    }
}

/// Features of one post's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub char_count: usize,
    pub line_count: usize,
    pub emoji_count: usize,
    pub has_numbers: bool,
    pub has_question: bool,
    pub has_exclamation: bool,
    pub has_ellipsis: bool,
    pub hashtag_count: usize,
    pub mention_count: usize,
    pub url_count: usize,
    pub hook_pattern: HookPattern,
    pub sentiment: Sentiment,
}

impl TextFeatures {
    pub fn length_bucket(&self) -> &'static str {
        match self.char_count {
            0..80 => "short",
            80..200 => "medium",
            _ => "long",
        }
    }

    pub fn emoji_bucket(&self) -> &'static str {
        match self.emoji_count {
            0 => "none",
            1..=2 => "few",
            _ => "many",
        }
    }

    /// `facet:value` keys of the text-feature arms this post feeds
    pub fn arm_keys(&self) -> Vec<String> {
        vec![
            format!("length:{}", self.length_bucket()),
            format!("emoji:{}", self.emoji_bucket()),
            format!("hook:{}", self.hook_pattern.as_str()),
            format!("sentiment:{}", self.sentiment.as_str()),
            format!("numbers:{}", yes_no(self.has_numbers)),
            format!("question:{}", yes_no(self.has_question)),
        ]
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Facet part of a text-feature arm key (`"hook"` for `"hook:data"`)
pub fn facet_of(key: &str) -> &str {
    key.split_once(':').map(|(facet, _)| facet).unwrap_or(key)
}

struct Patterns {
    emoji: Regex,
    numbers: Regex,
    hashtag: Regex,
    mention: Regex,
    url: Regex,
    hooks: Vec<(HookPattern, Regex)>,
    positive: Regex,
    negative: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("static pattern compiles");
        Patterns {
            emoji: re(r"[\x{1F300}-\x{1FAFF}\x{1F1E6}-\x{1F1FF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}]"),
            numbers: re(
                r"(?i)\d+(?:[.,]\d+)?\s*(?:%|％|x\b|×|倍|times\b|minutes?\b|hours?\b|days?\b|weeks?\b|months?\b|years?\b|分|時間|日|週間|ヶ月|か月|年)",
            ),
            hashtag: re(r"(?:^|\s)[#＃][\p{L}\p{N}_]+"),
            mention: re(r"(?:^|\s)@[A-Za-z0-9_]+"),
            url: re(r"https?://\S+"),
            // Priority order: first match wins.
            hooks: vec![
                (
                    HookPattern::Empathy,
                    re(
                        r"(?i)\b(?:you'?re not alone|you are not alone|have you ever felt|we'?ve all|i know how it feels|sound familiar)|わかります|ありませんか|ですよね",
                    ),
                ),
                (
                    HookPattern::Question,
                    re(r"(?i)[?？]|^(?:why|how|what|who|when|do you|did you|have you|is it|can you)\b|なぜ|どうして"),
                ),
                (
                    HookPattern::Data,
                    re(r"(?i)\d+(?:[.,]\d+)?\s*(?:%|％|x\b|×|倍|k\b|万|件|人)"),
                ),
                (
                    HookPattern::Contrast,
                    re(
                        r"(?i)\b(?:but|however|instead|most people|everyone thinks|unpopular opinion)\b|ではなく|しかし|でも|一方",
                    ),
                ),
                (
                    HookPattern::Discovery,
                    re(
                        r"(?i)\b(?:i found|i discovered|turns out|i just learned|the secret|the trick)\b|発見|気づいた|知らなかった|実は",
                    ),
                ),
                (
                    HookPattern::Confession,
                    re(
                        r"(?i)\b(?:honestly|to be honest|i confess|i admit|i failed|truth is)\b|正直|告白|白状",
                    ),
                ),
            ],
            positive: re(
                r"(?i)\b(?:love|great|happy|amazing|success|win|grateful|excited|best|glad)\b|嬉しい|最高|成功|楽しい|ありがとう|感謝",
            ),
            negative: re(
                r"(?i)\b(?:fail|failed|hate|worst|sad|tired|problem|mistake|struggle|afraid)\b|失敗|辛い|つらい|最悪|不安|疲れ",
            ),
        }
    })
}

/// Feature extraction over raw post text
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn extract(text: &str) -> TextFeatures {
        let p = patterns();
        let first_line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");

        TextFeatures {
            char_count: text.chars().count(),
            line_count: text.lines().filter(|l| !l.trim().is_empty()).count(),
            emoji_count: p.emoji.find_iter(text).count(),
            has_numbers: p.numbers.is_match(text),
            has_question: text.contains(['?', '？']),
            has_exclamation: text.contains(['!', '！']),
            has_ellipsis: text.contains("...") || text.contains('…'),
            hashtag_count: p.hashtag.find_iter(text).count(),
            mention_count: p.mention.find_iter(text).count(),
            url_count: p.url.find_iter(text).count(),
            hook_pattern: Self::hook_pattern(first_line),
            sentiment: Self::sentiment(text),
        }
    }

    fn hook_pattern(first_line: &str) -> HookPattern {
        patterns()
            .hooks
            .iter()
            .find(|(_, re)| re.is_match(first_line))
            .map(|(hook, _)| *hook)
            .unwrap_or(HookPattern::Neutral)
    }

    fn sentiment(text: &str) -> Sentiment {
        let p = patterns();
        match (p.positive.is_match(text), p.negative.is_match(text)) {
            (true, true) => Sentiment::Mixed,
            (true, false) => Sentiment::Positive,
            (false, true) => Sentiment::Negative,
            (false, false) => Sentiment::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let text = "Shipping day 🚀🔥\n\nCheck it out @alice #buildinpublic #rust\nhttps://example.com/x";
        let f = FeatureExtractor::extract(text);
        assert_eq!(f.line_count, 3);
        assert_eq!(f.emoji_count, 2);
        assert_eq!(f.hashtag_count, 2);
        assert_eq!(f.mention_count, 1);
        assert_eq!(f.url_count, 1);
        assert_eq!(f.char_count, text.chars().count());
    }

    #[test]
    fn test_numbers_need_units() {
        assert!(FeatureExtractor::extract("Revenue grew 40% this quarter").has_numbers);
        assert!(FeatureExtractor::extract("It took 3 hours").has_numbers);
        assert!(FeatureExtractor::extract("売上が3倍になった").has_numbers);
        assert!(!FeatureExtractor::extract("Route 66 forever").has_numbers);
    }

    #[test]
    fn test_punctuation_flags() {
        let f = FeatureExtractor::extract("Wait... really? Yes!");
        assert!(f.has_ellipsis);
        assert!(f.has_question);
        assert!(f.has_exclamation);
        let g = FeatureExtractor::extract("そうか…");
        assert!(g.has_ellipsis);
        assert!(!g.has_question);
    }

    #[test]
    fn test_hook_priority_empathy_before_question() {
        let f = FeatureExtractor::extract("Have you ever felt stuck at work?\nHere is what helped.");
        assert_eq!(f.hook_pattern, HookPattern::Empathy);
    }

    #[test]
    fn test_hook_priority_question_before_data() {
        let f = FeatureExtractor::extract("Why did 80% of my posts flop?");
        assert_eq!(f.hook_pattern, HookPattern::Question);
    }

    #[test]
    fn test_hook_patterns() {
        let cases = [
            ("3x more replies with one change", HookPattern::Data),
            ("Most people post at noon. I post at 6am.", HookPattern::Contrast),
            ("Turns out the algorithm loves bookmarks", HookPattern::Discovery),
            ("Honestly, I almost gave up last year", HookPattern::Confession),
            ("Shipping a new feature today", HookPattern::Neutral),
            ("", HookPattern::Neutral),
        ];
        for (text, expected) in cases {
            assert_eq!(FeatureExtractor::extract(text).hook_pattern, expected, "{text}");
        }
    }

    #[test]
    fn test_hook_uses_first_non_empty_line_only() {
        let f = FeatureExtractor::extract("\n\nShipping today\nWhy? Because.");
        assert_eq!(f.hook_pattern, HookPattern::Neutral);
    }

    #[test]
    fn test_sentiment() {
        assert_eq!(FeatureExtractor::extract("I love this").sentiment, Sentiment::Positive);
        assert_eq!(FeatureExtractor::extract("I failed again").sentiment, Sentiment::Negative);
        assert_eq!(
            FeatureExtractor::extract("I failed, but I love the lesson").sentiment,
            Sentiment::Mixed
        );
        assert_eq!(FeatureExtractor::extract("Tuesday notes").sentiment, Sentiment::Neutral);
        assert_eq!(FeatureExtractor::extract("転職して最高").sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "Honestly? 40% of my drafts never ship... 😅 #writing";
        assert_eq!(FeatureExtractor::extract(text), FeatureExtractor::extract(text));
    }

    #[test]
    fn test_buckets_and_arm_keys() {
        let f = FeatureExtractor::extract("Short one 🎉");
        assert_eq!(f.length_bucket(), "short");
        assert_eq!(f.emoji_bucket(), "few");
        let keys = f.arm_keys();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&"length:short".to_string()));
        assert!(keys.contains(&"numbers:no".to_string()));
        assert_eq!(facet_of("hook:data"), "hook");
        assert_eq!(facet_of("plain"), "plain");
    }

    #[test]
    fn test_length_bucket_boundaries() {
        assert_eq!(FeatureExtractor::extract(&"a".repeat(79)).length_bucket(), "short");
        assert_eq!(FeatureExtractor::extract(&"a".repeat(80)).length_bucket(), "medium");
        assert_eq!(FeatureExtractor::extract(&"a".repeat(200)).length_bucket(), "long");
    }
}
