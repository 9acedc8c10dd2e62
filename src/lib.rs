pub mod aggregate;
mod dashboard;
pub mod detect;
mod frequency;
mod occurrence;
pub mod split;

pub use dashboard::DashboardView;
pub use frequency::{Frequency, ParseFrequencyError};
pub use occurrence::{normalize, parse_date, DataError, RawOccurrence, SubscriptionOccurrence};

// This represents the number of decimal places that a currency can validly express.
// @todo Support the full range of currency precisions specified in ISO 4217.
const CURRENCY_PRECISION: u32 = 2;
