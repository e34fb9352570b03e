use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::money::Money;

/// Column name → cell text, exactly as read from the source file.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Ids combine the import label, the row position and the ingestion
    /// time, so re-uploading the same file yields fresh ids.
    pub fn generate(source: &str, row_index: usize, ingested_at: DateTime<Utc>) -> Self {
        TransactionId(format!(
            "{}-{}-{}",
            source,
            row_index,
            ingested_at.timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub vendor: String,
    pub date: String,
    pub amount: Money,
    #[serde(default)]
    pub is_business: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub source: String,
    #[serde(default)]
    pub raw_data: RawRow,
}

impl Transaction {
    /// True when no usable category has been assigned yet.
    pub fn is_uncategorized(&self) -> bool {
        match self.category.as_deref() {
            None => true,
            Some(c) => {
                let c = c.trim();
                c.is_empty() || c.eq_ignore_ascii_case(UNCATEGORIZED)
            }
        }
    }

    pub fn apply(&mut self, update: &TransactionUpdate) {
        if let Some(flag) = update.is_business {
            self.is_business = flag;
        }
        if let Some(category) = &update.category {
            self.category = Some(category.clone());
        }
        if let Some(purpose) = &update.purpose {
            self.purpose = Some(purpose.clone());
        }
    }
}

pub const UNCATEGORIZED: &str = "uncategorized";

/// Partial field set merged into a stored transaction. `None` leaves the
/// existing value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub is_business: Option<bool>,
    pub category: Option<String>,
    pub purpose: Option<String>,
}

impl TransactionUpdate {
    pub fn business(flag: bool) -> Self {
        TransactionUpdate {
            is_business: Some(flag),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_business.is_none() && self.category.is_none() && self.purpose.is_none()
    }
}

/// The fixed set of categories the classification service may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    OfficeSupplies,
    Travel,
    Meals,
    Advertising,
    Utilities,
    Software,
    ProfessionalServices,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::OfficeSupplies,
        Category::Travel,
        Category::Meals,
        Category::Advertising,
        Category::Utilities,
        Category::Software,
        Category::ProfessionalServices,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::OfficeSupplies => "office_supplies",
            Category::Travel => "travel",
            Category::Meals => "meals",
            Category::Advertising => "advertising",
            Category::Utilities => "utilities",
            Category::Software => "software",
            Category::ProfessionalServices => "professional_services",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown category: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Transaction {
        Transaction {
            id: TransactionId::from("chase-0-1"),
            vendor: "STAPLES".to_string(),
            date: "01/15/2024".to_string(),
            amount: Money::from_cents(4999),
            is_business: false,
            category: None,
            purpose: None,
            source: "chase".to_string(),
            raw_data: RawRow::new(),
        }
    }

    #[test]
    fn generated_id_combines_source_index_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let id = TransactionId::generate("amex", 7, at);
        assert_eq!(id.as_str(), format!("amex-7-{}", at.timestamp_millis()));
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut tx = sample();
        tx.purpose = Some("printer paper".to_string());
        tx.apply(&TransactionUpdate {
            is_business: Some(true),
            category: Some("office_supplies".to_string()),
            purpose: None,
        });
        assert!(tx.is_business);
        assert_eq!(tx.category.as_deref(), Some("office_supplies"));
        assert_eq!(tx.purpose.as_deref(), Some("printer paper"));
        assert_eq!(tx.vendor, "STAPLES");
    }

    #[test]
    fn uncategorized_detection() {
        let mut tx = sample();
        assert!(tx.is_uncategorized());
        tx.category = Some("  ".to_string());
        assert!(tx.is_uncategorized());
        tx.category = Some("Uncategorized".to_string());
        assert!(tx.is_uncategorized());
        tx.category = Some("travel".to_string());
        assert!(!tx.is_uncategorized());
    }

    #[test]
    fn category_parses_loosely() {
        assert_eq!("office_supplies".parse::<Category>(), Ok(Category::OfficeSupplies));
        assert_eq!("Professional Services".parse::<Category>(), Ok(Category::ProfessionalServices));
        assert!("groceries".parse::<Category>().is_err());
    }

    #[test]
    fn serde_skips_absent_optionals() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("category").is_none());
        assert_eq!(json["id"], "chase-0-1");
        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
