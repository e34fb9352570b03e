use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use schedc_core::{Money, RawRow, Transaction, TransactionId};
use std::io::Read;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing failed: {0}")]
    CsvError(#[from] csv::Error),
}

/// The layout a single row was recognised as.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFormat {
    /// Description, Date and separate Debit / Credit columns.
    BankLedger {
        vendor: String,
        date: String,
        debit: Decimal,
        credit: Decimal,
    },
    /// Date and a single signed Amount column.
    SingleColumn {
        vendor: String,
        date: String,
        amount: Decimal,
    },
    Unrecognized,
}

impl RowFormat {
    /// Debits are outflows. Credits come out negative so refunds never
    /// count as spending.
    pub fn amount(&self) -> Decimal {
        match self {
            RowFormat::BankLedger { debit, credit, .. } => {
                if *debit > Decimal::ZERO {
                    *debit
                } else if *credit > Decimal::ZERO {
                    -*credit
                } else {
                    Decimal::ZERO
                }
            }
            RowFormat::SingleColumn { amount, .. } => amount.abs(),
            RowFormat::Unrecognized => Decimal::ZERO,
        }
    }

    pub fn vendor(&self) -> &str {
        match self {
            RowFormat::BankLedger { vendor, .. } | RowFormat::SingleColumn { vendor, .. } => vendor,
            RowFormat::Unrecognized => "",
        }
    }

    pub fn date(&self) -> &str {
        match self {
            RowFormat::BankLedger { date, .. } | RowFormat::SingleColumn { date, .. } => date,
            RowFormat::Unrecognized => "",
        }
    }
}

/// A column counts as present only when it holds non-blank text.
fn field<'a>(row: &'a RawRow, name: &str) -> Option<&'a str> {
    row.get(name).map(String::as_str).filter(|v| !v.trim().is_empty())
}

pub fn detect_format(row: &RawRow) -> RowFormat {
    let description = field(row, "Description");
    let date = field(row, "Date");
    let debit = field(row, "Debit");
    let credit = field(row, "Credit");

    if let (Some(vendor), Some(date)) = (description, date) {
        if debit.is_some() || credit.is_some() {
            return RowFormat::BankLedger {
                vendor: vendor.to_string(),
                date: date.to_string(),
                debit: debit.map(parse_amount).unwrap_or_default(),
                credit: credit.map(parse_amount).unwrap_or_default(),
            };
        }
    }

    if let (Some(amount), Some(date)) = (field(row, "Amount"), date) {
        return RowFormat::SingleColumn {
            vendor: description.unwrap_or_default().to_string(),
            date: date.to_string(),
            amount: parse_amount(amount),
        };
    }

    RowFormat::Unrecognized
}

/// Transfers and card payments are not expenses.
pub fn is_payment(vendor: &str) -> bool {
    vendor.to_lowercase().contains("payment")
}

pub fn parse_row(
    row: &RawRow,
    source: &str,
    row_index: usize,
    ingested_at: DateTime<Utc>,
) -> Option<Transaction> {
    let format = detect_format(row);
    if format == RowFormat::Unrecognized {
        tracing::debug!(row_index, "Unrecognised row layout, skipping");
        return None;
    }

    // filter on the stored cent value so sub-cent amounts never land as $0.00
    let amount = Money::from_decimal(format.amount());
    if !amount.is_positive() || is_payment(format.vendor()) {
        tracing::debug!(row_index, %amount, vendor = format.vendor(), "Skipping row");
        return None;
    }

    Some(Transaction {
        id: TransactionId::generate(source, row_index, ingested_at),
        vendor: format.vendor().trim().to_string(),
        date: format.date().trim().to_string(),
        amount,
        is_business: false,
        category: None,
        purpose: None,
        source: source.to_string(),
        raw_data: row.clone(),
    })
}

/// Lenient amount parsing: currency symbols and thousands separators are
/// stripped, `(x)` means `-x`, and anything unparseable is zero.
pub fn parse_amount(s: &str) -> Decimal {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let s = s.replace([',', '$', ' ', '"'], "");
    let dec = Decimal::from_str(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .unwrap_or(Decimal::ZERO);
    if negative {
        -dec
    } else {
        dec
    }
}

#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub transactions: Vec<Transaction>,
    /// Data rows read, header excluded.
    pub total: usize,
    pub parsed: usize,
}

pub fn parse_file<R: Read>(
    data: R,
    source: &str,
    ingested_at: DateTime<Utc>,
) -> Result<ParsedFile, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut transactions = Vec::new();
    let mut total = 0;

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        total += 1;

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();

        if let Some(tx) = parse_row(&row, source, index, ingested_at) {
            transactions.push(tx);
        }
    }

    let parsed = transactions.len();
    tracing::info!(source, total, parsed, "Parsed CSV");

    Ok(ParsedFile {
        transactions,
        total,
        parsed,
    })
}
