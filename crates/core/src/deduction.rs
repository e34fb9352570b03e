use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeductionError {
    #[error("{field} cannot be negative: {value}")]
    Negative { field: &'static str, value: Decimal },
    #[error("{field} is too large to compute a deduction: {value}")]
    Overflow { field: &'static str, value: Decimal },
}

/// Per-tax-year rate table. Loaded from configuration so the rates can be
/// bumped without a code change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeductionRates {
    pub mileage_per_mile: Decimal,
    pub home_office_per_sq_ft: Decimal,
    pub home_office_cap: Decimal,
}

impl Default for DeductionRates {
    fn default() -> Self {
        Self {
            mileage_per_mile: Decimal::new(67, 2),
            home_office_per_sq_ft: Decimal::from(5),
            home_office_cap: Decimal::from(1500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeOfficeMethod {
    #[default]
    Simplified,
    Actual,
}

impl fmt::Display for HomeOfficeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeOfficeMethod::Simplified => write!(f, "simplified"),
            HomeOfficeMethod::Actual => write!(f, "actual"),
        }
    }
}

impl std::str::FromStr for HomeOfficeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simplified" => Ok(HomeOfficeMethod::Simplified),
            "actual" => Ok(HomeOfficeMethod::Actual),
            other => Err(format!("Unknown home office method: '{other}'")),
        }
    }
}

impl DeductionRates {
    pub fn mileage(&self, business_miles: Decimal) -> Result<Money, DeductionError> {
        non_negative("business_miles", business_miles)?;
        let amount = checked_product("business_miles", business_miles, self.mileage_per_mile)?;
        Ok(Money::from_decimal(amount))
    }

    /// Simplified: rate per square foot, capped. Actual: the caller's own
    /// figure is taken as-is (missing means zero).
    pub fn home_office(
        &self,
        square_feet: Decimal,
        method: HomeOfficeMethod,
        actual_amount: Option<Decimal>,
    ) -> Result<Money, DeductionError> {
        non_negative("square_feet", square_feet)?;
        match method {
            HomeOfficeMethod::Simplified => {
                let computed =
                    checked_product("square_feet", square_feet, self.home_office_per_sq_ft)?;
                Ok(Money::from_decimal(computed.min(self.home_office_cap)))
            }
            HomeOfficeMethod::Actual => {
                let amount = actual_amount.unwrap_or(Decimal::ZERO);
                non_negative("actual_amount", amount)?;
                Ok(Money::from_decimal(amount))
            }
        }
    }
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), DeductionError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DeductionError::Negative { field, value });
    }
    Ok(())
}

fn checked_product(
    field: &'static str,
    value: Decimal,
    rate: Decimal,
) -> Result<Decimal, DeductionError> {
    value
        .checked_mul(rate)
        .ok_or(DeductionError::Overflow { field, value })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MileageDeduction {
    pub business_miles: Decimal,
    pub deduction_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeOfficeDeduction {
    pub square_feet: Decimal,
    pub method: HomeOfficeMethod,
    pub deduction_amount: Money,
}

/// Standing deductions kept alongside the transactions. Each entry is
/// replaced wholesale when saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<MileageDeduction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_office: Option<HomeOfficeDeduction>,
}

impl DeductionData {
    pub fn mileage_amount(&self) -> Money {
        self.mileage
            .as_ref()
            .map(|m| m.deduction_amount)
            .unwrap_or_default()
    }

    pub fn home_office_amount(&self) -> Money {
        self.home_office
            .as_ref()
            .map(|h| h.deduction_amount)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> DeductionRates {
        DeductionRates::default()
    }

    #[test]
    fn mileage_uses_per_mile_rate() {
        let amount = rates().mileage(Decimal::from(1000)).unwrap();
        assert_eq!(amount, Money::from_cents(67_000));
    }

    #[test]
    fn mileage_rate_is_injected() {
        let r = DeductionRates {
            mileage_per_mile: Decimal::new(70, 2),
            ..rates()
        };
        assert_eq!(r.mileage(Decimal::from(100)).unwrap(), Money::from_cents(7_000));
    }

    #[test]
    fn simplified_home_office_under_cap() {
        let amount = rates()
            .home_office(Decimal::from(200), HomeOfficeMethod::Simplified, None)
            .unwrap();
        assert_eq!(amount, Money::from_cents(100_000));
    }

    #[test]
    fn simplified_home_office_hits_cap() {
        let amount = rates()
            .home_office(Decimal::from(400), HomeOfficeMethod::Simplified, None)
            .unwrap();
        assert_eq!(amount, Money::from_cents(150_000));
    }

    #[test]
    fn actual_method_passes_amount_through() {
        let r = rates();
        let amount = r
            .home_office(Decimal::from(400), HomeOfficeMethod::Actual, Some(Decimal::new(231455, 2)))
            .unwrap();
        assert_eq!(amount, Money::from_cents(231_455));
        let missing = r.home_office(Decimal::from(400), HomeOfficeMethod::Actual, None).unwrap();
        assert!(missing.is_zero());
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let r = rates();
        assert!(matches!(
            r.mileage(Decimal::from(-1)),
            Err(DeductionError::Negative { field: "business_miles", .. })
        ));
        assert!(r
            .home_office(Decimal::from(-10), HomeOfficeMethod::Simplified, None)
            .is_err());
        assert!(r
            .home_office(Decimal::from(10), HomeOfficeMethod::Actual, Some(Decimal::from(-5)))
            .is_err());
    }

    #[test]
    fn oversized_inputs_are_an_error() {
        let r = rates();
        assert_eq!(
            r.home_office(Decimal::MAX, HomeOfficeMethod::Simplified, None),
            Err(DeductionError::Overflow {
                field: "square_feet",
                value: Decimal::MAX
            })
        );
        let steep = DeductionRates {
            mileage_per_mile: Decimal::from(2),
            ..r
        };
        assert!(matches!(
            steep.mileage(Decimal::MAX),
            Err(DeductionError::Overflow { field: "business_miles", .. })
        ));
        // the actual method performs no arithmetic
        assert!(r
            .home_office(Decimal::ZERO, HomeOfficeMethod::Actual, Some(Decimal::MAX))
            .is_ok());
    }

    #[test]
    fn zero_is_allowed() {
        assert!(rates().mileage(Decimal::ZERO).unwrap().is_zero());
    }

    #[test]
    fn method_round_trips_through_str() {
        assert_eq!("Actual".parse::<HomeOfficeMethod>(), Ok(HomeOfficeMethod::Actual));
        assert_eq!(HomeOfficeMethod::Simplified.to_string(), "simplified");
        assert!("itemized".parse::<HomeOfficeMethod>().is_err());
    }

    #[test]
    fn empty_deductions_contribute_zero() {
        let d = DeductionData::default();
        assert!(d.mileage_amount().is_zero());
        assert!(d.home_office_amount().is_zero());
        assert_eq!(serde_json::to_string(&d).unwrap(), "{}");
    }
}
