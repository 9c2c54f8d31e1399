use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Placeholder sent to the model when a post has no body text.
pub const NO_CONTENT: &str = "No content";

/// A problem statement under investigation.
///
/// Cheap to clone; every clone shares the same immutable text, so one need can
/// be handed to any number of concurrent scoring tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Need(Arc<str>);

impl Need {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Need {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Need {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl Serialize for Need {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Need {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Need::new)
    }
}

/// A post as supplied by the content source, plus the fields the
/// classifiers derive from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_utc: i64,
    /// Written by the summarizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Applicability explanation, written when the applicability check succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_answer: Option<String>,
}

impl RedditPost {
    pub fn new(title: impl Into<String>, selftext: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            selftext: Some(selftext.into()),
            ..Default::default()
        }
    }

    /// Body text for prompting. Empty or missing bodies become [`NO_CONTENT`].
    pub fn content(&self) -> &str {
        match self.selftext.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => NO_CONTENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subreddit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<RelevanceScore>,
}

impl Subreddit {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            score: None,
        }
    }
}

/// Likelihood estimate on the closed range 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RelevanceScore(u8);

impl RelevanceScore {
    /// The "not sure" answer.
    pub const MIN: RelevanceScore = RelevanceScore(1);
    pub const MAX: RelevanceScore = RelevanceScore(10);

    pub fn new(value: i64) -> Option<Self> {
        if (1..=10).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for RelevanceScore {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<i64> for RelevanceScore {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("relevance score {value} is outside 1..=10"))
    }
}

impl From<RelevanceScore> for u8 {
    fn from(score: RelevanceScore) -> Self {
        score.0
    }
}

impl fmt::Display for RelevanceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
