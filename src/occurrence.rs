use crate::frequency::Frequency;
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use thiserror::Error;

// Dates arrive either from the API (ISO) or straight off a bank statement export.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// One billed instance of a subscription.
///
/// Occurrences that share a `description` and `amount` are the same logical
/// subscription seen at different points in time. Build one with `new` so the amount
/// is checked and the history stays sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionOccurrence {
    pub(crate) description: String,
    pub(crate) amount: Decimal,
    pub(crate) date: NaiveDate,
    pub(crate) frequency: Option<Frequency>,
    pub(crate) estimated_next: Option<NaiveDate>,
    // Ascending, no duplicates
    pub(crate) historical_dates: Vec<NaiveDate>,
}

/// An occurrence as handed over by the import layer, before any parsing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawOccurrence {
    pub description: String,
    pub amount: Decimal,
    pub date: String,
    pub frequency: Option<String>,
    pub estimated_next: Option<String>,
    pub historical_dates: Vec<String>,
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum DataError {
    #[error("could not parse date '{date}' for '{description}'")]
    InvalidDate { description: String, date: String },
    #[error("amount {amount} for '{description}' is negative")]
    NegativeAmount { description: String, amount: Decimal },
    #[error("unknown frequency '{frequency}' for '{description}'")]
    UnknownFrequency {
        description: String,
        frequency: String,
    },
}

impl SubscriptionOccurrence {
    pub fn new<S: Into<String>>(
        description: S,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Self, DataError> {
        let description = description.into();

        if amount < Decimal::ZERO {
            return Err(DataError::NegativeAmount {
                description,
                amount,
            });
        }

        Ok(SubscriptionOccurrence {
            description,
            amount,
            date,
            frequency: None,
            estimated_next: None,
            historical_dates: Vec::new(),
        })
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_estimated_next(mut self, date: NaiveDate) -> Self {
        self.estimated_next = Some(date);
        self
    }

    pub fn with_historical_dates<I: IntoIterator<Item = NaiveDate>>(mut self, dates: I) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        self.historical_dates = dates;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn estimated_next(&self) -> Option<NaiveDate> {
        self.estimated_next
    }

    pub fn historical_dates(&self) -> &[NaiveDate] {
        &self.historical_dates
    }

    /// The billing frequency, treating an unspecified one as monthly.
    pub fn effective_frequency(&self) -> Frequency {
        self.frequency.unwrap_or_default()
    }

    /// Whether this occurrence is exactly the given (description, amount, date).
    pub fn is_exactly(&self, description: &str, amount: Decimal, date: NaiveDate) -> bool {
        self.description == description && self.amount == amount && self.date == date
    }
}

impl TryFrom<RawOccurrence> for SubscriptionOccurrence {
    type Error = DataError;

    fn try_from(raw: RawOccurrence) -> Result<Self, Self::Error> {
        let date = parse_date(&raw.description, &raw.date)?;

        let frequency = match raw.frequency.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(f) => Some(f.parse::<Frequency>().map_err(|_| {
                DataError::UnknownFrequency {
                    description: raw.description.clone(),
                    frequency: f.to_owned(),
                }
            })?),
        };

        let estimated_next = match raw.estimated_next.as_deref() {
            Some(d) if !d.trim().is_empty() => Some(parse_date(&raw.description, d)?),
            _ => None,
        };

        let historical_dates = raw
            .historical_dates
            .iter()
            .map(|d| parse_date(&raw.description, d))
            .collect::<Result<Vec<_>, _>>()?;

        let mut occurrence = SubscriptionOccurrence::new(raw.description, raw.amount, date)?
            .with_historical_dates(historical_dates);
        occurrence.frequency = frequency;
        occurrence.estimated_next = estimated_next;

        Ok(occurrence)
    }
}

/// Parse every raw record, stopping at the first one that is malformed.
///
/// The error names the offending record so the caller can decide whether to drop
/// it and retry or abort the load altogether.
pub fn normalize<I>(raw: I) -> Result<Vec<SubscriptionOccurrence>, DataError>
where
    I: IntoIterator<Item = RawOccurrence>,
{
    let occurrences = raw
        .into_iter()
        .map(SubscriptionOccurrence::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            warn!("rejecting occurrence list: {}", e);
            e
        })?;

    debug!("normalized {} occurrences", occurrences.len());

    Ok(occurrences)
}

/// Parse a calendar date in any of the formats the import layer produces.
///
/// A full ISO timestamp is accepted too; only its date part is kept.
pub fn parse_date(description: &str, date: &str) -> Result<NaiveDate, DataError> {
    let trimmed = date.trim();
    let date_part = match trimmed.find('T') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| DataError::InvalidDate {
            description: description.to_owned(),
            date: date.to_owned(),
        })
}
