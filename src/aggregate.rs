use crate::occurrence::SubscriptionOccurrence;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use log::trace;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Trailing window used for "projected expenditure" when the caller has no preference.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Parallel series for a chart, one entry per occurrence
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<NaiveDate>,
    pub values: Vec<Decimal>,
    pub descriptions: Vec<String>,
}

/// A subscription charge that is still to come
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpcomingPayment {
    pub description: String,
    pub estimated_next: NaiveDate,
    pub days_away: i64,
}

/// The total spent within one calendar month or year
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PeriodTotal {
    pub label: String,
    pub total: Decimal,
}

/// The "Month Year" label a date is bucketed under, e.g. "February 2024".
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn total_spent<'a, I>(occurrences: I) -> Decimal
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    occurrences.into_iter().map(|o| o.amount).sum()
}

/// Order occurrences newest first. Occurrences on the same date keep their input
/// order, so sorting an already sorted list is a no-op.
pub fn sorted_by_date_descending<'a, I>(occurrences: I) -> Vec<&'a SubscriptionOccurrence>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut sorted: Vec<_> = occurrences.into_iter().collect();
    // `sort_by` is stable, which the tie rule above relies on
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// Distinct month labels present in the occurrences. No order is implied.
pub fn monthly_bucket_labels<'a, I>(occurrences: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    occurrences.into_iter().map(|o| month_label(o.date)).collect()
}

/// Distinct month labels in calendar order, oldest first.
pub fn sorted_month_labels<'a, I>(occurrences: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    occurrences
        .into_iter()
        .map(|o| (o.date.year(), o.date.month()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .map(month_label)
        .collect()
}

/// Keep only the occurrences billed in the month named by `label`. An empty label
/// means no filter is applied.
pub fn filter_by_month<'a, I>(occurrences: I, label: &str) -> Vec<&'a SubscriptionOccurrence>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    if label.is_empty() {
        return occurrences.into_iter().collect();
    }

    occurrences
        .into_iter()
        .filter(|o| month_label(o.date) == label)
        .collect()
}

pub fn chart_series<'a, I>(occurrences: I) -> ChartSeries
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut series = ChartSeries::default();

    for o in occurrences {
        series.labels.push(o.date);
        series.values.push(o.amount);
        series.descriptions.push(o.description.clone());
    }

    series
}

/// Project the next charge of each subscription, soonest first.
///
/// Only occurrences whose `estimated_next` is at or after `now` are considered. Each
/// description appears once: the first qualifying occurrence in input order wins,
/// even if a later one for the same description is due sooner. Entries with equal
/// `days_away` keep their input order.
pub fn upcoming_projection<'a, I>(occurrences: I, now: NaiveDateTime) -> Vec<UpcomingPayment>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut seen = HashSet::new();
    let mut upcoming = Vec::new();

    for o in occurrences {
        let next = match o.estimated_next {
            Some(next) => next,
            None => continue,
        };

        let due = next.and_time(NaiveTime::MIN);
        if due < now {
            trace!("skipping '{}': next charge {} has passed", o.description, next);
            continue;
        }

        if !seen.insert(o.description.as_str()) {
            trace!(
                "skipping '{}' due {}: an earlier entry already claimed it",
                o.description,
                next
            );
            continue;
        }

        // Whole days, rounding any part day up
        let seconds = (due - now).num_seconds();
        let days_away = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;

        upcoming.push(UpcomingPayment {
            description: o.description.clone(),
            estimated_next: next,
            days_away,
        });
    }

    upcoming.sort_by_key(|u| u.days_away);
    upcoming
}

/// Sum each description's monthly-equivalent cost.
///
/// Every occurrence in the input contributes, so a subscription with several months
/// of history is counted once per billed month.
pub fn monthly_cost_by_description<'a, I>(occurrences: I) -> BTreeMap<String, Decimal>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut costs = BTreeMap::new();

    for o in occurrences {
        let monthly = o.effective_frequency().monthly_equivalent(o.amount);
        *costs.entry(o.description.clone()).or_insert(Decimal::ZERO) += monthly;
    }

    costs
}

/// Total spent on dates from `window_days` before `now` up to and including `now`.
///
/// A window reaching back past the earliest representable date covers everything
/// up to `now`.
pub fn projected_expenditure<'a, I>(
    occurrences: I,
    now: NaiveDateTime,
    window_days: u32,
) -> Decimal
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let end = now.date();
    let start = end
        .checked_sub_days(Days::new(window_days.into()))
        .unwrap_or(NaiveDate::MIN);

    occurrences
        .into_iter()
        .filter(|o| o.date >= start && o.date <= end)
        .map(|o| o.amount)
        .sum()
}

/// Return a new list without any occurrence matching all three fields exactly.
pub fn remove_occurrence<'a, I>(
    occurrences: I,
    description: &str,
    amount: Decimal,
    date: NaiveDate,
) -> Vec<SubscriptionOccurrence>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    occurrences
        .into_iter()
        .filter(|o| !o.is_exactly(description, amount, date))
        .cloned()
        .collect()
}

/// Every known billing date of one subscription, newest first.
pub fn subscription_history<'a, I>(
    occurrences: I,
    description: &str,
    amount: Decimal,
) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let dates: BTreeSet<NaiveDate> = occurrences
        .into_iter()
        .filter(|o| o.description == description && o.amount == amount)
        .flat_map(|o| std::iter::once(o.date).chain(o.historical_dates.iter().copied()))
        .collect();

    dates.into_iter().rev().collect()
}

/// Totals per calendar month, oldest first.
pub fn monthly_totals<'a, I>(occurrences: I) -> Vec<PeriodTotal>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut totals: BTreeMap<(i32, u32), Decimal> = BTreeMap::new();

    for o in occurrences {
        *totals
            .entry((o.date.year(), o.date.month()))
            .or_insert(Decimal::ZERO) += o.amount;
    }

    totals
        .into_iter()
        .filter_map(|((y, m), total)| {
            NaiveDate::from_ymd_opt(y, m, 1).map(|d| PeriodTotal {
                label: month_label(d),
                total,
            })
        })
        .collect()
}

/// Totals per calendar year, oldest first.
pub fn yearly_totals<'a, I>(occurrences: I) -> Vec<PeriodTotal>
where
    I: IntoIterator<Item = &'a SubscriptionOccurrence>,
{
    let mut totals: BTreeMap<i32, Decimal> = BTreeMap::new();

    for o in occurrences {
        *totals.entry(o.date.year()).or_insert(Decimal::ZERO) += o.amount;
    }

    totals
        .into_iter()
        .map(|(year, total)| PeriodTotal {
            label: year.to_string(),
            total,
        })
        .collect()
}
