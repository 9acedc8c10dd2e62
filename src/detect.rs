use crate::{
    frequency::Frequency,
    occurrence::{parse_date, DataError, SubscriptionOccurrence},
};
use chrono::{Duration, NaiveDate};
use log::{debug, trace, warn};
use regex::Regex;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, str::FromStr, sync::OnceLock};

// Card transactions carry the processing date after the merchant name, e.g.
// "NETFLIX.COM 12/02 AUD". That tail must go or each charge becomes its own group.
const DESCRIPTION_SUFFIX: &str = r"\s\d{2}/\d{2}.*$";

/// A single line from a bank statement export, as text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementRow {
    pub date: String,
    pub description: String,
    pub money_out: String,
}

/// The range of days allowed between two charges of the same subscription
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CadenceWindow {
    pub min_days: i64,
    pub max_days: i64,
}

/// A recurring charge found on a statement
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedSubscription {
    pub description: String,
    pub amount: Decimal,
    pub dates: Vec<NaiveDate>,
    pub estimated_next: NaiveDate,
}

impl Default for CadenceWindow {
    fn default() -> Self {
        CadenceWindow {
            min_days: 25,
            max_days: 35,
        }
    }
}

impl CadenceWindow {
    pub fn contains(&self, gap: Duration) -> bool {
        let days = gap.num_days();
        days >= self.min_days && days <= self.max_days
    }
}

/// Strip the trailing "DD/MM ..." tail a card processor appends to a merchant name.
pub fn clean_description(description: &str) -> String {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let suffix =
        SUFFIX.get_or_init(|| Regex::new(DESCRIPTION_SUFFIX).expect("suffix pattern is valid"));

    suffix.replace(description, "").into_owned()
}

/// Find every subscription on a statement.
///
/// Rows with no money out, or an amount that isn't a number, are not charges and are
/// skipped. A charge whose date cannot be read fails the whole statement. Results are
/// ordered by description, then amount.
pub fn detect(
    rows: &[StatementRow],
    window: &CadenceWindow,
) -> Result<Vec<DetectedSubscription>, DataError> {
    let mut groups: BTreeMap<(String, Decimal), Vec<NaiveDate>> = BTreeMap::new();

    for row in rows {
        let amount = parse_money(&row.money_out);
        if amount <= Decimal::ZERO {
            trace!("skipping '{}': no money out", row.description);
            continue;
        }

        let description = clean_description(&row.description);
        let date = parse_date(&description, &row.date)?;

        groups.entry((description, amount)).or_default().push(date);
    }

    debug!("grouped statement into {} candidate charges", groups.len());

    let mut detected = Vec::new();

    for ((description, amount), mut dates) in groups {
        if dates.len() < 2 {
            continue;
        }

        dates.sort_unstable();

        let gaps: Vec<Duration> = dates.windows(2).map(|w| w[1] - w[0]).collect();
        if !gaps.iter().all(|gap| window.contains(*gap)) {
            debug!(
                "'{}' at {} does not recur monthly: {:?}",
                description, amount, dates
            );
            continue;
        }

        let estimated_next = match estimate_next(&dates) {
            Some(next) => next,
            None => {
                warn!(
                    "'{}' at {}: next charge falls outside the supported date range",
                    description, amount
                );
                continue;
            }
        };

        debug!(
            "'{}' at {} recurs, next expected {}",
            description, amount, estimated_next
        );

        detected.push(DetectedSubscription {
            description,
            amount,
            dates,
            estimated_next,
        });
    }

    debug!("found {} subscriptions", detected.len());

    Ok(detected)
}

/// Expand detected subscriptions into one occurrence per charge, oldest first.
///
/// Each occurrence carries its subscription's full billing history and estimated
/// next charge. Charges on the same date keep the subscriptions' order.
pub fn flatten(
    detected: &[DetectedSubscription],
) -> Result<Vec<SubscriptionOccurrence>, DataError> {
    let mut occurrences = Vec::new();

    for s in detected {
        for date in &s.dates {
            let occurrence =
                SubscriptionOccurrence::new(s.description.as_str(), s.amount, *date)?
                    .with_frequency(Frequency::Monthly)
                    .with_estimated_next(s.estimated_next)
                    .with_historical_dates(s.dates.iter().copied());
            occurrences.push(occurrence);
        }
    }

    occurrences.sort_by_key(|o| o.date());
    Ok(occurrences)
}

// Last charge plus the mean gap between charges, truncated to whole days. `dates`
// must be sorted and hold at least two charges.
fn estimate_next(dates: &[NaiveDate]) -> Option<NaiveDate> {
    let (first, last) = (dates.first()?, dates.last()?);
    let gaps = dates.len() as i64 - 1;
    if gaps < 1 {
        return None;
    }

    let mean_days = (*last - *first).num_days() / gaps;
    last.checked_add_signed(Duration::days(mean_days))
}

// Anything that isn't a readable number counts as nothing spent
fn parse_money(value: &str) -> Decimal {
    Decimal::from_str(value.trim()).unwrap_or(Decimal::ZERO)
}
