//! NewsAPI HTTP client for top-headline retrieval
//!
//! Talks to the NewsAPI /v2/top-headlines endpoint. Failures surface as a
//! single recoverable fetch error; no retries, timeouts, or partial results.

use crate::error::{DetectorError, Result};
use crate::news::{Article, HeadlineSource};
use serde::Deserialize;

/// NewsAPI top-headlines client.
#[derive(Clone)]
pub struct NewsApiClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl NewsApiClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn parse_response(body: HeadlinesResponse) -> Result<Vec<Article>> {
        if body.status != "ok" {
            return Err(DetectorError::ExternalFetch(
                body.message
                    .unwrap_or_else(|| format!("NewsAPI returned status '{}'", body.status)),
            ));
        }

        Ok(body
            .articles
            .into_iter()
            .map(|raw| Article {
                title: raw.title.unwrap_or_default(),
                description: raw.description.unwrap_or_default(),
                url: raw.url.unwrap_or_else(|| "#".to_string()),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl HeadlineSource for NewsApiClient {
    async fn top_headlines(&self, language: &str, page_size: usize) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("language", language.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| DetectorError::ExternalFetch(format!("Failed to reach NewsAPI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::ExternalFetch(format!(
                "NewsAPI error ({}): {}",
                status, body
            )));
        }

        let body: HeadlinesResponse = response.json().await.map_err(|e| {
            DetectorError::ExternalFetch(format!("Failed to parse NewsAPI response: {}", e))
        })?;

        Self::parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/top_headlines.json");

    #[test]
    fn test_parse_ok_response() {
        let body: HeadlinesResponse = serde_json::from_str(FIXTURE).unwrap();
        let articles = NewsApiClient::parse_response(body).unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title, "Markets rally on rate cut hopes");
        assert_eq!(articles[0].url, "https://example.com/markets");
        // Null descriptions map to empty strings, matching upstream defaults
        assert_eq!(articles[2].description, "");
    }

    #[test]
    fn test_parse_error_response() {
        let body: HeadlinesResponse = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid"}"#,
        )
        .unwrap();
        let err = NewsApiClient::parse_response(body).unwrap_err();
        assert!(err.to_string().contains("Your API key is invalid"));
    }

    #[test]
    fn test_missing_url_defaults_to_hash() {
        let body: HeadlinesResponse = serde_json::from_str(
            r#"{"status":"ok","articles":[{"title":"No link here"}]}"#,
        )
        .unwrap();
        let articles = NewsApiClient::parse_response(body).unwrap();
        assert_eq!(articles[0].url, "#");
    }
}
