use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use super::deduction::DeductionData;
use super::money::Money;
use super::transaction::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleCLine {
    Line1GrossReceipts,
    Line8Advertising,
    Line9CarTruck,
    Line10CommissionsFees,
    Line11ContractLabor,
    Line12Depletion,
    Line13Depreciation,
    Line14EmployeeBenefits,
    Line15Insurance,
    Line16Interest,
    Line17LegalProfessional,
    Line18OfficeExpense,
    Line19PensionProfit,
    Line20RentLease,
    Line21RepairsMaintenance,
    Line22Supplies,
    Line23TaxesLicenses,
    Line24TravelMeals,
    Line25Utilities,
    Line26Wages,
    Line27OtherExpenses,
    Line28TotalExpenses,
    Line30HomeOffice,
    Line31NetProfitLoss,
}

use ScheduleCLine::*;

pub const SCHEDULE_C_LINES: &[(ScheduleCLine, &str, &str)] = &[
    (Line1GrossReceipts, "1", "Gross receipts or sales"),
    (Line8Advertising, "8", "Advertising"),
    (Line9CarTruck, "9", "Car and truck expenses"),
    (Line10CommissionsFees, "10", "Commissions and fees"),
    (Line11ContractLabor, "11", "Contract labor"),
    (Line12Depletion, "12", "Depletion"),
    (Line13Depreciation, "13", "Depreciation"),
    (Line14EmployeeBenefits, "14", "Employee benefit programs"),
    (Line15Insurance, "15", "Insurance"),
    (Line16Interest, "16", "Interest"),
    (Line17LegalProfessional, "17", "Legal and professional services"),
    (Line18OfficeExpense, "18", "Office expense"),
    (Line19PensionProfit, "19", "Pension and profit-sharing plans"),
    (Line20RentLease, "20", "Rent or lease"),
    (Line21RepairsMaintenance, "21", "Repairs and maintenance"),
    (Line22Supplies, "22", "Supplies"),
    (Line23TaxesLicenses, "23", "Taxes and licenses"),
    (Line24TravelMeals, "24", "Travel and meals"),
    (Line25Utilities, "25", "Utilities"),
    (Line26Wages, "26", "Wages"),
    (Line27OtherExpenses, "27", "Other expenses"),
    (Line28TotalExpenses, "28", "Total expenses"),
    (Line30HomeOffice, "30", "Home office deduction"),
    (Line31NetProfitLoss, "31", "Net profit or (loss)"),
];

impl ScheduleCLine {
    pub fn number(self) -> &'static str {
        Self::entry(self).1
    }

    pub fn label(self) -> &'static str {
        Self::entry(self).2
    }

    fn entry(line: ScheduleCLine) -> &'static (ScheduleCLine, &'static str, &'static str) {
        SCHEDULE_C_LINES
            .iter()
            .find(|(l, _, _)| *l == line)
            .unwrap_or(&SCHEDULE_C_LINES[0])
    }

    /// Lines 8 through 27, the ones line 28 totals.
    pub fn is_itemized_expense(self) -> bool {
        self >= Line8Advertising && self <= Line27OtherExpenses
    }

    /// Illustrative category → line mapping. Unknown and missing
    /// categories fall through to "other expenses".
    pub fn for_category(category: Option<&str>) -> ScheduleCLine {
        match category.map(str::trim) {
            Some("advertising") => Line8Advertising,
            Some("insurance") => Line15Insurance,
            Some("interest") => Line16Interest,
            Some("professional_services") => Line17LegalProfessional,
            Some("office_supplies") | Some("software") => Line18OfficeExpense,
            Some("rent") => Line20RentLease,
            Some("taxes_licenses") => Line23TaxesLicenses,
            Some("travel") | Some("meals") => Line24TravelMeals,
            Some("utilities") => Line25Utilities,
            _ => Line27OtherExpenses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleCSummary {
    pub total_transactions: usize,
    pub business_transactions: usize,
    pub total_deductions: Money,
    pub income_transactions: usize,
    pub expense_transactions: usize,
    pub vehicle_miles: Decimal,
    pub home_office_sqft: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleC {
    pub tax_year: i32,
    pub schedule_c: BTreeMap<ScheduleCLine, Money>,
    pub summary: ScheduleCSummary,
}

impl ScheduleC {
    pub fn generate(tax_year: i32, transactions: &[Transaction], deductions: &DeductionData) -> Self {
        let mut lines: BTreeMap<ScheduleCLine, Money> = SCHEDULE_C_LINES
            .iter()
            .map(|(line, _, _)| (*line, Money::zero()))
            .collect();

        lines.insert(Line9CarTruck, deductions.mileage_amount());
        lines.insert(Line30HomeOffice, deductions.home_office_amount());

        let business: Vec<&Transaction> = transactions.iter().filter(|t| t.is_business).collect();
        let expenses: Vec<&Transaction> = business
            .iter()
            .copied()
            .filter(|t| t.amount.is_positive())
            .collect();

        for tx in &expenses {
            let line = ScheduleCLine::for_category(tx.category.as_deref());
            if let Some(total) = lines.get_mut(&line) {
                *total = *total + tx.amount;
            }
        }

        let total_expenses: Money = lines
            .iter()
            .filter(|(line, _)| line.is_itemized_expense())
            .map(|(_, amount)| *amount)
            .sum();
        let home_office = deductions.home_office_amount();

        lines.insert(Line28TotalExpenses, total_expenses);
        lines.insert(Line31NetProfitLoss, -(total_expenses + home_office));

        ScheduleC {
            tax_year,
            schedule_c: lines,
            summary: ScheduleCSummary {
                total_transactions: transactions.len(),
                business_transactions: business.len(),
                total_deductions: total_expenses + home_office,
                income_transactions: 0,
                expense_transactions: expenses.len(),
                vehicle_miles: deductions
                    .mileage
                    .as_ref()
                    .map(|m| m.business_miles)
                    .unwrap_or_default(),
                home_office_sqft: deductions
                    .home_office
                    .as_ref()
                    .map(|h| h.square_feet)
                    .unwrap_or_default(),
            },
        }
    }

    pub fn line(&self, line: ScheduleCLine) -> Money {
        self.schedule_c.get(&line).copied().unwrap_or_default()
    }

    /// Plain-text rendering laid out like the printed form.
    pub fn render_text(&self, generated_on: NaiveDate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SCHEDULE C (Form 1040) - {}", self.tax_year);
        let _ = writeln!(out, "Profit or Loss From Business");
        let _ = writeln!(out);
        let _ = writeln!(out, "PART I - INCOME");
        self.write_line(&mut out, Line1GrossReceipts);
        let _ = writeln!(out);
        let _ = writeln!(out, "PART II - EXPENSES");
        for (line, _, _) in SCHEDULE_C_LINES.iter().filter(|(l, _, _)| l.is_itemized_expense()) {
            self.write_line(&mut out, *line);
        }
        let _ = writeln!(out);
        for line in [Line28TotalExpenses, Line30HomeOffice, Line31NetProfitLoss] {
            self.write_line(&mut out, line);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Generated by schedc - {generated_on}");
        out
    }

    fn write_line(&self, out: &mut String, line: ScheduleCLine) {
        let _ = writeln!(
            out,
            "Line {} - {}: {}",
            line.number(),
            line.label(),
            self.line(line)
        );
    }
}
