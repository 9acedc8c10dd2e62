use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::{fmt, str::FromStr};
use thiserror::Error;

// A weekly charge counts as four per month, not 52/12.
const WEEKS_PER_MONTH: Decimal = dec!(4);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Records how often a subscription bills
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Frequency {
    #[default]
    Monthly,
    Yearly,
    Weekly,
}

#[derive(Error, Debug, Eq, PartialEq)]
#[error("'{0}' is not a known billing frequency")]
pub struct ParseFrequencyError(pub String);

impl Frequency {
    /// Convert a single charge at this frequency into its monthly cost.
    pub fn monthly_equivalent(&self, amount: Decimal) -> Decimal {
        match *self {
            Frequency::Monthly => amount,
            Frequency::Yearly => amount / MONTHS_PER_YEAR,
            Frequency::Weekly => amount * WEEKS_PER_MONTH,
        }
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Frequency::Monthly),
            "yearly" | "annual" | "annually" => Ok(Frequency::Yearly),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(ParseFrequencyError(s.to_owned())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
            Frequency::Weekly => "weekly",
        };
        f.write_str(s)
    }
}
