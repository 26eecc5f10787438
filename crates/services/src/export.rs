//! Plain-text export of a day's brew.

use chrono::NaiveDate;
use shared::news::NewsArticle;
use shared::DripError;
use std::path::{Path, PathBuf};

pub fn export_text(articles: &[NewsArticle]) -> String {
    let mut out = String::new();
    for article in articles {
        out.push_str(&format!(
            "Headline: {}\nTags: {}\nSummary: {}\nSource: {}\n\n",
            article.headline,
            article.tags.join(" "),
            article.summary,
            article.source
        ));
    }
    out
}

/// `DailyDrip-October 16, 2026.txt`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("DailyDrip-{}.txt", date.format("%B %-d, %Y"))
}

pub fn write_export(
    dir: &Path,
    articles: &[NewsArticle],
    date: NaiveDate,
) -> Result<PathBuf, DripError> {
    std::fs::create_dir_all(dir).map_err(DripError::storage)?;
    let path = dir.join(export_file_name(date));
    std::fs::write(&path, export_text(articles)).map_err(DripError::storage)?;
    tracing::info!(path = %path.display(), count = articles.len(), "exported brew");
    Ok(path)
}

/// Recover article records from exported text. Tags are split on whitespace,
/// so multi-word tags do not survive.
pub fn parse_export(text: &str) -> Vec<NewsArticle> {
    let mut articles = Vec::new();
    let mut current: Option<NewsArticle> = None;

    for line in text.lines() {
        if let Some(headline) = line.strip_prefix("Headline: ") {
            if let Some(done) = current.take() {
                articles.push(done);
            }
            current = Some(NewsArticle {
                headline: headline.to_string(),
                summary: String::new(),
                source: String::new(),
                tags: Vec::new(),
                is_starred: false,
            });
            continue;
        }
        let Some(article) = current.as_mut() else {
            continue;
        };
        if let Some(tags) = line.strip_prefix("Tags:") {
            article.tags = tags.split_whitespace().map(str::to_string).collect();
        } else if let Some(summary) = line.strip_prefix("Summary: ") {
            article.summary = summary.to_string();
        } else if let Some(source) = line.strip_prefix("Source: ") {
            article.source = source.to_string();
        }
    }
    if let Some(done) = current {
        articles.push(done);
    }
    articles
}
