//! Report structures for the three detection modes

use crate::detector::{ClassifiedHeadline, GeneratedCheck};
use crate::inference::Verdict;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReportBody {
    ManualCheck { text: String, verdict: Verdict },
    Headlines { results: Vec<ClassifiedHeadline> },
    Generated { result: GeneratedCheck },
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub generated_at: DateTime<Utc>,
    pub classifier_model: String,
    #[serde(flatten)]
    pub body: ReportBody,
}

impl DetectionReport {
    pub fn manual_check(classifier_model: &str, text: &str, verdict: Verdict) -> Self {
        Self {
            generated_at: Utc::now(),
            classifier_model: classifier_model.to_string(),
            body: ReportBody::ManualCheck {
                text: text.to_string(),
                verdict,
            },
        }
    }

    pub fn headlines(classifier_model: &str, results: Vec<ClassifiedHeadline>) -> Self {
        Self {
            generated_at: Utc::now(),
            classifier_model: classifier_model.to_string(),
            body: ReportBody::Headlines { results },
        }
    }

    pub fn generated(classifier_model: &str, result: GeneratedCheck) -> Self {
        Self {
            generated_at: Utc::now(),
            classifier_model: classifier_model.to_string(),
            body: ReportBody::Generated { result },
        }
    }
}
