//! Integration tests for the detection modes
//!
//! The mode handlers are generic over the classifier/generator/headline-source
//! traits, so these tests drive them with stubs and verify the controller
//! contract without network access or model weights.

use fake_news_detector::detector;
use fake_news_detector::error::DetectorError;
use fake_news_detector::inference::{Classify, Generate, Label, Verdict};
use fake_news_detector::news::{Article, HeadlineSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Classifier stub that counts calls and records the last input.
#[derive(Default)]
struct StubClassifier {
    calls: AtomicUsize,
    last_input: Mutex<Option<String>>,
    label: Option<Label>,
}

impl StubClassifier {
    fn with_label(label: Label) -> Self {
        Self {
            label: Some(label),
            ..Default::default()
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classify for StubClassifier {
    fn classify(&self, text: &str) -> fake_news_detector::Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(text.to_string());
        let label = self
            .label
            .unwrap_or_else(|| Label::from_class_index(text.len() % 2));
        Ok(Verdict {
            label,
            confidence: 0.5,
        })
    }
}

struct StubGenerator {
    calls: AtomicUsize,
    continuation: String,
}

impl StubGenerator {
    fn new(continuation: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            continuation: continuation.to_string(),
        }
    }
}

impl Generate for StubGenerator {
    fn generate(&mut self, prompt: &str, _max_length: usize) -> fake_news_detector::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} {}", prompt, self.continuation))
    }
}

struct StubSource {
    articles: Vec<Article>,
}

#[async_trait::async_trait]
impl HeadlineSource for StubSource {
    async fn top_headlines(
        &self,
        _language: &str,
        page_size: usize,
    ) -> fake_news_detector::Result<Vec<Article>> {
        Ok(self.articles.iter().take(page_size).cloned().collect())
    }
}

struct FailingSource;

#[async_trait::async_trait]
impl HeadlineSource for FailingSource {
    async fn top_headlines(
        &self,
        _language: &str,
        _page_size: usize,
    ) -> fake_news_detector::Result<Vec<Article>> {
        Err(DetectorError::ExternalFetch("connection refused".to_string()))
    }
}

fn sample_articles(n: usize) -> Vec<Article> {
    (0..n)
        .map(|i| Article {
            title: format!("Headline {}", i),
            description: format!("Description {}", i),
            url: format!("https://example.com/{}", i),
        })
        .collect()
}

#[test]
fn test_manual_check_classifies_non_blank_text() {
    let classifier = StubClassifier::with_label(Label::Real);
    let verdict = detector::manual_check(&classifier, "The sky is blue.").unwrap();

    assert_eq!(verdict.label, Label::Real);
    assert!(verdict.confidence >= 0.0 && verdict.confidence <= 1.0);
    assert_eq!(classifier.call_count(), 1);
}

#[test]
fn test_manual_check_rejects_blank_input_without_model_call() {
    let classifier = StubClassifier::default();

    for blank in ["", "   ", "\t\n  "] {
        let result = detector::manual_check(&classifier, blank);
        assert!(matches!(result, Err(DetectorError::EmptyInput)));
    }
    assert_eq!(classifier.call_count(), 0);
}

#[tokio::test]
async fn test_headline_scan_classifies_every_article() {
    let classifier = StubClassifier::default();
    let source = StubSource {
        articles: sample_articles(6),
    };

    let results = detector::scan_headlines(&classifier, &source, "en", 6)
        .await
        .unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(classifier.call_count(), 6);
    for (i, entry) in results.iter().enumerate() {
        assert_eq!(entry.article.url, format!("https://example.com/{}", i));
    }
}

#[tokio::test]
async fn test_headline_scan_respects_page_size() {
    let classifier = StubClassifier::default();
    let source = StubSource {
        articles: sample_articles(10),
    };

    let results = detector::scan_headlines(&classifier, &source, "en", 6)
        .await
        .unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(classifier.call_count(), 6);
}

#[tokio::test]
async fn test_headline_fetch_failure_yields_no_results() {
    let classifier = StubClassifier::default();

    let result = detector::scan_headlines(&classifier, &FailingSource, "en", 6).await;

    assert!(matches!(result, Err(DetectorError::ExternalFetch(_))));
    assert_eq!(classifier.call_count(), 0);
}

#[tokio::test]
async fn test_headlines_classify_title_and_description() {
    let classifier = StubClassifier::default();
    let source = StubSource {
        articles: vec![Article {
            title: "Moon base opens".to_string(),
            description: "First tenants move in".to_string(),
            url: "https://example.com/moon".to_string(),
        }],
    };

    detector::scan_headlines(&classifier, &source, "en", 6)
        .await
        .unwrap();

    let last = classifier.last_input.lock().unwrap().clone().unwrap();
    assert_eq!(last, "Moon base opens First tenants move in");
}

#[test]
fn test_generate_and_check_classifies_generated_text() {
    let classifier = StubClassifier::with_label(Label::Fake);
    let mut generator = StubGenerator::new("and then the aliens left.");

    let result =
        detector::generate_and_check(&classifier, &mut generator, "Aliens land in Ohio", 300)
            .unwrap();

    assert_eq!(result.prompt, "Aliens land in Ohio");
    assert!(result.text.starts_with("Aliens land in Ohio"));
    assert_eq!(result.verdict.label, Label::Fake);

    // The classifier must see the generated text, not the prompt
    let last = classifier.last_input.lock().unwrap().clone().unwrap();
    assert_eq!(last, result.text);
}

#[test]
fn test_generate_and_check_rejects_blank_prompt() {
    let classifier = StubClassifier::default();
    let mut generator = StubGenerator::new("unused");

    let result = detector::generate_and_check(&classifier, &mut generator, "  \n", 300);

    assert!(matches!(result, Err(DetectorError::EmptyInput)));
    assert_eq!(classifier.call_count(), 0);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_label_mapping_convention() {
    // Fixed convention: class index 1 -> Real, class index 0 -> Fake
    assert_eq!(Label::from_class_index(1), Label::Real);
    assert_eq!(Label::from_class_index(0), Label::Fake);
}
