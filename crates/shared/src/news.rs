//! News articles as produced by the provider and as kept by the desk.

use serde::{Deserialize, Serialize};

/// One article exactly as the news request returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub tags: Vec<String>,
    #[serde(rename = "isStarred", default)]
    pub is_starred: bool,
}

impl From<ArticleDraft> for NewsArticle {
    fn from(draft: ArticleDraft) -> Self {
        Self {
            headline: draft.headline,
            summary: draft.summary,
            source: draft.source,
            tags: draft.tags,
            is_starred: false,
        }
    }
}

impl NewsArticle {
    /// Text handed to speech synthesis for this card.
    pub fn spoken_text(&self) -> String {
        format!("{}. {}", self.headline, self.summary)
    }
}
