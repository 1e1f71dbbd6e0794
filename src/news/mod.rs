//! Live headline retrieval

pub mod client;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single external article record, held only for the current render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
}

impl Article {
    /// The text handed to the classifier: title and description concatenated.
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// Source of top headlines. Implemented by the NewsAPI client; test code
/// substitutes stubs.
#[async_trait::async_trait]
pub trait HeadlineSource {
    async fn top_headlines(&self, language: &str, page_size: usize) -> Result<Vec<Article>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_text_concatenates_title_and_description() {
        let article = Article {
            title: "Moon base opens".to_string(),
            description: "First tenants move in".to_string(),
            url: "https://example.com/moon".to_string(),
        };
        assert_eq!(article.classification_text(), "Moon base opens First tenants move in");
    }
}
