use schedc_core::{DeductionData, Transaction};
use std::io::Write;

use crate::csv::CsvError;

const HEADER: [&str; 8] = [
    "Date",
    "Vendor",
    "Amount",
    "Card",
    "Category",
    "Purpose",
    "Is Business",
    "Type",
];

/// Writes the transaction detail sheet followed by a DEDUCTIONS section.
pub fn export_csv<W: Write>(
    out: W,
    transactions: &[Transaction],
    deductions: &DeductionData,
) -> Result<(), CsvError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);

    writer.write_record(HEADER)?;
    for tx in transactions {
        let amount = tx.amount.as_decimal().to_string();
        writer.write_record([
            tx.date.as_str(),
            tx.vendor.as_str(),
            amount.as_str(),
            tx.source.as_str(),
            tx.category.as_deref().unwrap_or_default(),
            tx.purpose.as_deref().unwrap_or_default(),
            if tx.is_business { "Yes" } else { "No" },
            if tx.amount.is_positive() { "Expense" } else { "Credit" },
        ])?;
    }

    let mut out = writer
        .into_inner()
        .map_err(|e| CsvError::IoError(e.into_error()))?;
    writeln!(out)?;
    writeln!(out, "DEDUCTIONS")?;

    let mut writer = csv::WriterBuilder::new().from_writer(out);
    writer.write_record(["Type", "Description", "Amount"])?;
    if let Some(mileage) = &deductions.mileage {
        writer.write_record([
            "Mileage".to_string(),
            format!("{} business miles", mileage.business_miles),
            mileage.deduction_amount.as_decimal().to_string(),
        ])?;
    }
    if let Some(office) = &deductions.home_office {
        writer.write_record([
            "Home Office".to_string(),
            format!("{} sq ft ({})", office.square_feet, office.method),
            office.deduction_amount.as_decimal().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
