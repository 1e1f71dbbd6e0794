//! Detection modes
//!
//! The three user-facing modes: manual check, live headline scan, and
//! generate-and-check. Each invocation is stateless; blank input is rejected
//! before any model is touched.

use crate::error::{DetectorError, Result};
use crate::inference::{Classify, Generate, Verdict};
use crate::news::{Article, HeadlineSource};
use log::info;
use serde::Serialize;

/// One classified live headline, carrying its source link.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedHeadline {
    pub article: Article,
    pub verdict: Verdict,
}

/// A generated article together with its classification.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCheck {
    pub prompt: String,
    pub text: String,
    pub verdict: Verdict,
}

/// Manual check mode: classify free text. Blank or whitespace-only input is
/// rejected without a model call.
pub fn manual_check<C: Classify>(classifier: &C, text: &str) -> Result<Verdict> {
    if text.trim().is_empty() {
        return Err(DetectorError::EmptyInput);
    }
    info!("Classifying manual input ({} chars)", text.len());
    classifier.classify(text)
}

/// Live headlines mode: classify each fetched article. A fetch failure
/// surfaces as one error and yields no results; a successful fetch of N
/// articles yields exactly N classified entries.
pub async fn scan_headlines<C, S>(
    classifier: &C,
    source: &S,
    language: &str,
    page_size: usize,
) -> Result<Vec<ClassifiedHeadline>>
where
    C: Classify,
    S: HeadlineSource,
{
    let articles = source.top_headlines(language, page_size).await?;
    info!("Fetched {} headlines", articles.len());

    let mut results = Vec::with_capacity(articles.len());
    for article in articles {
        let verdict = classifier.classify(&article.classification_text())?;
        results.push(ClassifiedHeadline { article, verdict });
    }
    Ok(results)
}

/// Synthetic generation mode: generate an article from a topic prompt, then
/// classify the generated text. Blank prompts are rejected without touching
/// either model.
pub fn generate_and_check<C, G>(
    classifier: &C,
    generator: &mut G,
    prompt: &str,
    max_length: usize,
) -> Result<GeneratedCheck>
where
    C: Classify,
    G: Generate,
{
    if prompt.trim().is_empty() {
        return Err(DetectorError::EmptyInput);
    }
    info!("Generating article for prompt ({} chars)", prompt.len());
    let text = generator.generate(prompt, max_length)?;
    let verdict = classifier.classify(&text)?;
    Ok(GeneratedCheck {
        prompt: prompt.to_string(),
        text,
        verdict,
    })
}
