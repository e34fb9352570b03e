use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::transaction::{Transaction, TransactionId};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Business,
    Personal,
}

impl TypeFilter {
    pub fn matches(self, tx: &Transaction) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Business => tx.is_business,
            TypeFilter::Personal => !tx.is_business,
        }
    }
}

impl std::str::FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(TypeFilter::All),
            "business" => Ok(TypeFilter::Business),
            "personal" => Ok(TypeFilter::Personal),
            other => Err(format!("Unknown type filter: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Amount,
    Vendor,
    Category,
    Business,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "amount" => Ok(SortKey::Amount),
            "vendor" => Ok(SortKey::Vendor),
            "category" => Ok(SortKey::Category),
            "business" => Ok(SortKey::Business),
            other => Err(format!("Unknown sort key: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionQuery {
    pub search: Option<String>,
    pub source: Option<String>,
    pub kind: TypeFilter,
    pub category: Option<String>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            search: None,
            source: None,
            kind: TypeFilter::All,
            category: None,
            sort_by: SortKey::Date,
            sort_order: SortOrder::Desc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Number of rows matching the filters, before pagination.
    pub total: usize,
}

impl TransactionQuery {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            let in_vendor = tx.vendor.to_lowercase().contains(&needle);
            let in_category = tx
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle));
            if !in_vendor && !in_category {
                return false;
            }
        }
        if let Some(source) = filter_value(&self.source) {
            if tx.source != source {
                return false;
            }
        }
        if let Some(category) = filter_value(&self.category) {
            if tx.category.as_deref() != Some(category) {
                return false;
            }
        }
        self.kind.matches(tx)
    }

    pub fn run(&self, transactions: &[Transaction]) -> TransactionPage {
        let mut filtered: Vec<&Transaction> =
            transactions.iter().filter(|t| self.matches(t)).collect();

        // sort_by is stable, so equal keys keep insertion order
        filtered.sort_by(|a, b| {
            let ord = compare(self.sort_by, a, b);
            match self.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = filtered.len();
        let page_size = self.page_size.max(1);
        let start = self.page.max(1).saturating_sub(1).saturating_mul(page_size);

        TransactionPage {
            transactions: filtered
                .into_iter()
                .skip(start)
                .take(page_size)
                .cloned()
                .collect(),
            total,
        }
    }
}

/// Selection for the bulk business toggle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleFilter {
    pub source: Option<String>,
    pub kind: TypeFilter,
    pub ids: Option<Vec<TransactionId>>,
}

impl ToggleFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(source) = filter_value(&self.source) {
            if tx.source != source {
                return false;
            }
        }
        if !self.kind.matches(tx) {
            return false;
        }
        match &self.ids {
            Some(ids) => ids.contains(&tx.id),
            None => true,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// "all" is the UI's spelling of "no filter".
fn filter_value(value: &Option<String>) -> Option<&str> {
    non_blank(value).filter(|v| !v.eq_ignore_ascii_case("all"))
}

fn compare(key: SortKey, a: &Transaction, b: &Transaction) -> Ordering {
    match key {
        SortKey::Date => parse_date_loose(&a.date).cmp(&parse_date_loose(&b.date)),
        SortKey::Amount => a.amount.cmp(&b.amount),
        SortKey::Vendor => a.vendor.to_lowercase().cmp(&b.vendor.to_lowercase()),
        SortKey::Category => category_key(a).cmp(&category_key(b)),
        SortKey::Business => a.is_business.cmp(&b.is_business),
    }
}

fn category_key(tx: &Transaction) -> String {
    tx.category.as_deref().unwrap_or_default().to_lowercase()
}

/// Best-effort date parse for sorting. Dates are stored as free text, so
/// anything unrecognised yields `None` and sorts first.
pub fn parse_date_loose(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);

    for fmt in &[
        "%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::transaction::RawRow;

    fn tx(id: &str, vendor: &str, date: &str, cents: i64, source: &str) -> Transaction {
        Transaction {
            id: TransactionId::from(id),
            vendor: vendor.to_string(),
            date: date.to_string(),
            amount: Money::from_cents(cents),
            is_business: false,
            category: None,
            purpose: None,
            source: source.to_string(),
            raw_data: RawRow::new(),
        }
    }

    fn fixture() -> Vec<Transaction> {
        let mut txs = vec![
            tx("1", "STAPLES", "01/15/2024", 4999, "chase"),
            tx("2", "Delta Air Lines", "2024-02-03", 35000, "amex"),
            tx("3", "Starbucks", "12/01/2023", 550, "chase"),
            tx("4", "GitHub", "not a date", 1000, "amex"),
        ];
        txs[1].is_business = true;
        txs[1].category = Some("travel".to_string());
        txs[3].is_business = true;
        txs[3].category = Some("software".to_string());
        txs
    }

    fn ids(page: &TransactionPage) -> Vec<&str> {
        page.transactions.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn default_query_sorts_by_date_desc() {
        let page = TransactionQuery::default().run(&fixture());
        assert_eq!(page.total, 4);
        assert_eq!(ids(&page), vec!["2", "1", "3", "4"]);
    }

    #[test]
    fn search_matches_vendor_or_category() {
        let q = TransactionQuery {
            search: Some("star".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&q.run(&fixture())), vec!["3"]);

        let q = TransactionQuery {
            search: Some("SOFT".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&q.run(&fixture())), vec!["4"]);
    }

    #[test]
    fn source_type_and_category_filters() {
        let q = TransactionQuery {
            source: Some("amex".to_string()),
            kind: TypeFilter::Business,
            sort_by: SortKey::Amount,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(ids(&q.run(&fixture())), vec!["4", "2"]);

        let q = TransactionQuery {
            category: Some("travel".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&q.run(&fixture())), vec!["2"]);

        let q = TransactionQuery {
            source: Some("all".to_string()),
            kind: TypeFilter::Personal,
            ..Default::default()
        };
        assert_eq!(q.run(&fixture()).total, 2);
    }

    #[test]
    fn vendor_sort_is_case_insensitive() {
        let q = TransactionQuery {
            sort_by: SortKey::Vendor,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(ids(&q.run(&fixture())), vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn pagination_reports_filtered_total() {
        let q = TransactionQuery {
            sort_by: SortKey::Amount,
            sort_order: SortOrder::Asc,
            page: 2,
            page_size: 3,
            ..Default::default()
        };
        let page = q.run(&fixture());
        assert_eq!(page.total, 4);
        assert_eq!(ids(&page), vec!["2"]);

        let beyond = TransactionQuery { page: 9, ..q }.run(&fixture());
        assert!(beyond.transactions.is_empty());
        assert_eq!(beyond.total, 4);
    }

    #[test]
    fn toggle_filter_combines_criteria() {
        let txs = fixture();
        let filter = ToggleFilter {
            source: Some("chase".to_string()),
            kind: TypeFilter::Personal,
            ids: None,
        };
        let hits: Vec<_> = txs.iter().filter(|t| filter.matches(t)).map(|t| t.id.as_str()).collect();
        assert_eq!(hits, vec!["1", "3"]);

        let filter = ToggleFilter {
            ids: Some(vec![TransactionId::from("3"), TransactionId::from("4")]),
            ..Default::default()
        };
        let hits: Vec<_> = txs.iter().filter(|t| filter.matches(t)).map(|t| t.id.as_str()).collect();
        assert_eq!(hits, vec!["3", "4"]);
    }

    #[test]
    fn loose_date_parsing() {
        assert_eq!(parse_date_loose("01/15/2024"), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(parse_date_loose("2024-12-31T00:00:00Z"), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(parse_date_loose("garbage"), None);
    }
}
