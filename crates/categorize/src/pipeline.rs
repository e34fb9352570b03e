use schedc_core::{Transaction, TransactionUpdate};
use thiserror::Error;

use crate::classifier::{Classification, ClassificationRequest, ClassifierBackend};

#[derive(Debug, Error, PartialEq)]
pub enum CategorizeError {
    #[error("An API key is required for categorization")]
    MissingCredential,
}

/// Result of classifying one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Classified(Classification),
    Failed(String),
}

impl ItemOutcome {
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            ItemOutcome::Classified(c) => Some(c),
            ItemOutcome::Failed(_) => None,
        }
    }
}

/// Sends transactions to a classification backend one at a time and folds
/// the answers back into the records.
pub struct Categorizer<B: ClassifierBackend> {
    backend: B,
}

impl<B: ClassifierBackend> Categorizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// One outcome per input, in input order. A failing item never stops
    /// the batch; only a missing credential does, before any request.
    pub async fn classify_all(
        &self,
        transactions: &[Transaction],
        credential: &str,
    ) -> Result<Vec<ItemOutcome>, CategorizeError> {
        if credential.trim().is_empty() {
            return Err(CategorizeError::MissingCredential);
        }

        tracing::info!(count = transactions.len(), "Starting categorization");

        let mut outcomes = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let request = ClassificationRequest::from(tx);
            let outcome = match self.backend.classify(&request, credential).await {
                Ok(classification) => {
                    tracing::debug!(
                        vendor = %tx.vendor,
                        category = ?classification.category,
                        is_business = ?classification.is_business,
                        "Categorized"
                    );
                    ItemOutcome::Classified(classification)
                }
                Err(e) => {
                    tracing::warn!(vendor = %tx.vendor, error = %e, "Categorization failed, leaving unchanged");
                    ItemOutcome::Failed(e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        let classified = outcomes
            .iter()
            .filter(|o| o.classification().is_some())
            .count();
        tracing::info!(
            classified,
            failed = outcomes.len() - classified,
            "Categorization finished"
        );

        Ok(outcomes)
    }

    /// Same length and order as the input; failed items come back as they
    /// went in.
    pub async fn categorize(
        &self,
        transactions: Vec<Transaction>,
        credential: &str,
    ) -> Result<Vec<Transaction>, CategorizeError> {
        let outcomes = self.classify_all(&transactions, credential).await?;
        Ok(merge(transactions, &outcomes))
    }
}

pub fn merge(transactions: Vec<Transaction>, outcomes: &[ItemOutcome]) -> Vec<Transaction> {
    transactions
        .into_iter()
        .zip(outcomes)
        .map(|(mut tx, outcome)| {
            if let Some(c) = outcome.classification() {
                tx.apply(&TransactionUpdate::from(c));
            }
            tx
        })
        .collect()
}
