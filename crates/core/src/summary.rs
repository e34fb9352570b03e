use serde::Serialize;

use super::deduction::DeductionData;
use super::money::Money;
use super::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    pub total_business_expenses: Money,
    pub business_count: usize,
    pub personal_count: usize,
    pub total_count: usize,
}

impl Summary {
    /// Business total = business rows plus both standing deductions.
    /// The total saturates rather than overflowing.
    pub fn compute(transactions: &[Transaction], deductions: &DeductionData) -> Self {
        let (business, personal): (Vec<&Transaction>, Vec<&Transaction>) =
            transactions.iter().partition(|t| t.is_business);

        let business_total: Money = business.iter().map(|t| t.amount).sum();

        Summary {
            total_business_expenses: business_total
                + deductions.mileage_amount()
                + deductions.home_office_amount(),
            business_count: business.len(),
            personal_count: personal.len(),
            total_count: transactions.len(),
        }
    }
}

/// Fields of the dashboard summary that are not derived from the data yet.
/// They are reported as zero and named in `not_computed`.
pub const NOT_COMPUTED_FIELDS: [&str; 4] = [
    "income_transactions",
    "uncategorized_transactions",
    "net_profit_loss",
    "gross_receipts",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryFields {
    pub total_expenses: Money,
    pub expense_transactions: usize,
    pub income_transactions: usize,
    pub uncategorized_transactions: usize,
    pub net_profit_loss: Money,
    pub gross_receipts: Money,
    pub not_computed: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub success: bool,
    pub summary: SummaryFields,
}

impl From<Summary> for SummaryReport {
    fn from(s: Summary) -> Self {
        SummaryReport {
            success: true,
            summary: SummaryFields {
                total_expenses: s.total_business_expenses,
                expense_transactions: s.total_count,
                income_transactions: 0,
                uncategorized_transactions: 0,
                net_profit_loss: Money::zero(),
                gross_receipts: Money::zero(),
                not_computed: NOT_COMPUTED_FIELDS.to_vec(),
            },
        }
    }
}
