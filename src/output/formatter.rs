//! Output formatters: console result blocks and JSON reports

use crate::config::OutputFormat;
use crate::error::Result;
use crate::inference::{Label, Verdict};
use crate::output::report::{DetectionReport, ReportBody};
use colored::Colorize;

/// Trait for formatting detection reports
pub trait OutputFormatter {
    fn format_report(&self, report: &DetectionReport) -> Result<String>;
}

/// Console formatter with colored verdict blocks
pub struct ConsoleFormatter {
    use_colors: bool,
}

/// JSON formatter for structured output
pub struct JsonFormatter {
    pretty: bool,
}

pub fn formatter_for(format: &OutputFormat, use_colors: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Console => Box::new(ConsoleFormatter::new(use_colors)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn paint_label(&self, label: Label) -> String {
        if !self.use_colors {
            return label.to_string();
        }
        match label {
            Label::Real => label.to_string().green().bold().to_string(),
            Label::Fake => label.to_string().red().bold().to_string(),
        }
    }

    fn verdict_icon(label: Label) -> &'static str {
        match label {
            Label::Real => "✅",
            Label::Fake => "❌",
        }
    }

    fn verdict_line(&self, verdict: &Verdict) -> String {
        format!(
            "{} Result: {} (confidence {:.2})",
            Self::verdict_icon(verdict.label),
            self.paint_label(verdict.label),
            verdict.confidence
        )
    }

    fn caveat(&self) -> String {
        let note = "Note: the classification head is not fine-tuned; labels are demonstrative, not verified.";
        if self.use_colors {
            format!("⚠️  {}", note.dimmed())
        } else {
            format!("⚠️  {}", note)
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &DetectionReport) -> Result<String> {
        let mut out = String::new();

        match &report.body {
            ReportBody::ManualCheck { verdict, .. } => {
                out.push_str(&self.verdict_line(verdict));
                out.push('\n');
            }
            ReportBody::Headlines { results } => {
                for entry in results {
                    out.push_str(&format!("📰 {}\n", entry.article.title));
                    if !entry.article.description.is_empty() {
                        out.push_str(&format!("   {}\n", entry.article.description));
                    }
                    out.push_str(&format!(
                        "   Prediction: {} ({:.2})\n",
                        self.paint_label(entry.verdict.label),
                        entry.verdict.confidence
                    ));
                    out.push_str(&format!("   🔗 {}\n\n", entry.article.url));
                }
            }
            ReportBody::Generated { result } => {
                out.push_str("🧬 Generated Article\n\n");
                out.push_str(&result.text);
                out.push_str("\n\n");
                out.push_str(&self.verdict_line(&result.verdict));
                out.push('\n');
            }
        }

        out.push('\n');
        out.push_str(&self.caveat());
        out.push('\n');
        Ok(out)
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &DetectionReport) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ClassifiedHeadline;
    use crate::news::Article;

    fn sample_verdict(label: Label) -> Verdict {
        Verdict {
            label,
            confidence: 0.73,
        }
    }

    #[test]
    fn test_console_manual_check() {
        let report = DetectionReport::manual_check(
            "bert-base-uncased",
            "The sky is blue.",
            sample_verdict(Label::Real),
        );
        let out = ConsoleFormatter::new(false).format_report(&report).unwrap();
        assert!(out.contains("✅ Result: Real"));
        assert!(out.contains("0.73"));
        assert!(out.contains("not fine-tuned"));
    }

    #[test]
    fn test_console_headlines_renders_each_block_with_url() {
        let results = vec![
            ClassifiedHeadline {
                article: Article {
                    title: "A".to_string(),
                    description: "desc a".to_string(),
                    url: "https://example.com/a".to_string(),
                },
                verdict: sample_verdict(Label::Fake),
            },
            ClassifiedHeadline {
                article: Article {
                    title: "B".to_string(),
                    description: String::new(),
                    url: "https://example.com/b".to_string(),
                },
                verdict: sample_verdict(Label::Real),
            },
        ];
        let report = DetectionReport::headlines("bert-base-uncased", results);
        let out = ConsoleFormatter::new(false).format_report(&report).unwrap();
        assert_eq!(out.matches("📰").count(), 2);
        assert!(out.contains("https://example.com/a"));
        assert!(out.contains("https://example.com/b"));
    }

    #[test]
    fn test_json_report_is_valid() {
        let report = DetectionReport::manual_check(
            "bert-base-uncased",
            "hello",
            sample_verdict(Label::Fake),
        );
        let out = JsonFormatter::new(false).format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["mode"], "manual_check");
        assert_eq!(value["verdict"]["label"], "Fake");
    }
}
