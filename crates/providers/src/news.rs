//! Structured news request: curator prompt, response schema and parsing.

use serde_json::{json, Value};
use shared::news::ArticleDraft;
use shared::DripError;

/// Number of articles the curator prompt asks for.
pub const EXPECTED_ARTICLES: usize = 5;

pub const NEWS_PROMPT: &str = "You are 'Daily Drip', an AI news curator. Your task is to find the 5 most significant and recent news articles in the technology sector. For each article, provide a concise 3-5 sentence summary, a compelling headline, the original source URL, and generate 1-3 relevant emojis as tags. Please return the result as a JSON array.";

/// Response schema constraining the model to an array of article objects.
pub fn news_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "headline": {
                    "type": "STRING",
                    "description": "The compelling headline of the news article."
                },
                "summary": {
                    "type": "STRING",
                    "description": "A concise 3-5 sentence summary of the article."
                },
                "source": {
                    "type": "STRING",
                    "description": "The original source URL of the article."
                },
                "tags": {
                    "type": "ARRAY",
                    "items": {
                        "type": "STRING",
                        "description": "A relevant emoji tag."
                    },
                    "description": "1-3 relevant emoji tags for the article."
                }
            },
            "required": ["headline", "summary", "source", "tags"]
        }
    })
}

/// Parse the model's JSON text into articles.
///
/// The schema is enforced by serde: every field is required. A count other
/// than [`EXPECTED_ARTICLES`] is accepted but logged.
pub fn parse_news(text: &str) -> Result<Vec<ArticleDraft>, DripError> {
    let articles: Vec<ArticleDraft> = serde_json::from_str(text.trim()).map_err(|e| {
        tracing::error!("Failed to parse news summaries JSON: {}", e);
        DripError::parse(format!("Could not retrieve and parse news summaries: {}", e))
    })?;
    if articles.len() != EXPECTED_ARTICLES {
        tracing::warn!(
            "expected {} articles, provider returned {}",
            EXPECTED_ARTICLES,
            articles.len()
        );
    }
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_array() {
        let text = r#"
            [{"headline":"A","summary":"S","source":"https://a.example","tags":["🤖"]},
             {"headline":"B","summary":"T","source":"https://b.example","tags":[]}]
        "#;
        let articles = parse_news(text).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].tags, vec!["🤖".to_string()]);
    }

    #[test]
    fn test_missing_field_is_parse_error() {
        let text = r#"[{"headline":"A","summary":"S","tags":[]}]"#;
        assert!(matches!(parse_news(text), Err(DripError::Parse(_))));
    }

    #[test]
    fn test_non_json_is_parse_error() {
        assert!(matches!(
            parse_news("Here are today's stories!"),
            Err(DripError::Parse(_))
        ));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = news_schema();
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
    }
}
