use schedc_core::{Category, Money, Transaction, TransactionUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Classification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Classification service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unparseable classification response: {0}")]
    Parse(String),
    #[error("Classification service error: {0}")]
    Service(String),
}

/// What the service sees about a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRequest {
    pub vendor: String,
    pub amount: Money,
    pub date: String,
}

impl From<&Transaction> for ClassificationRequest {
    fn from(tx: &Transaction) -> Self {
        ClassificationRequest {
            vendor: tx.vendor.clone(),
            amount: tx.amount,
            date: tx.date.clone(),
        }
    }
}

/// Fields returned by the service. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Option<Category>,
    pub purpose: Option<String>,
    pub is_business: Option<bool>,
}

impl From<&Classification> for TransactionUpdate {
    fn from(c: &Classification) -> Self {
        TransactionUpdate {
            is_business: c.is_business,
            category: c.category.map(|c| c.as_str().to_string()),
            purpose: c.purpose.clone(),
        }
    }
}

/// Abstraction over a remote classification service.
pub trait ClassifierBackend: Send + Sync {
    fn classify(
        &self,
        request: &ClassificationRequest,
        credential: &str,
    ) -> impl Future<Output = Result<Classification, ClassifyError>> + Send;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Answers from a per-vendor table; vendors not in the table fail.
#[derive(Default)]
pub struct MockClassifier {
    responses: HashMap<String, Classification>,
    calls: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, vendor: impl Into<String>, classification: Classification) -> Self {
        self.responses.insert(vendor.into(), classification);
        self
    }

    /// Vendors in the order they were asked about.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ClassifierBackend for MockClassifier {
    async fn classify(
        &self,
        request: &ClassificationRequest,
        _credential: &str,
    ) -> Result<Classification, ClassifyError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.vendor.clone());
        }
        self.responses
            .get(&request.vendor)
            .cloned()
            .ok_or_else(|| ClassifyError::Service(format!("no answer for {}", request.vendor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(vendor: &str) -> ClassificationRequest {
        ClassificationRequest {
            vendor: vendor.to_string(),
            amount: Money::from_cents(100),
            date: "01/01/2024".to_string(),
        }
    }

    #[tokio::test]
    async fn mock_answers_known_vendors_and_records_calls() {
        let mock = MockClassifier::new().with(
            "ZOOM",
            Classification {
                category: Some(Category::Software),
                ..Default::default()
            },
        );
        let hit = mock.classify(&request("ZOOM"), "key").await.unwrap();
        assert_eq!(hit.category, Some(Category::Software));
        assert!(mock.classify(&request("UBER"), "key").await.is_err());
        assert_eq!(mock.calls(), vec!["ZOOM", "UBER"]);
    }

    #[test]
    fn classification_becomes_partial_update() {
        let c = Classification {
            category: Some(Category::ProfessionalServices),
            purpose: None,
            is_business: Some(true),
        };
        let update = TransactionUpdate::from(&c);
        assert_eq!(update.category.as_deref(), Some("professional_services"));
        assert_eq!(update.is_business, Some(true));
        assert!(update.purpose.is_none());
    }
}
