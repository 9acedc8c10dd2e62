use crate::{
    aggregate::{
        chart_series, filter_by_month, monthly_cost_by_description, projected_expenditure,
        sorted_by_date_descending, sorted_month_labels, total_spent, upcoming_projection,
        ChartSeries, UpcomingPayment,
    },
    occurrence::SubscriptionOccurrence,
};
use chrono::NaiveDateTime;
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Every view the dashboard renders, derived from one list of occurrences.
///
/// A `DashboardView` is rebuilt from scratch whenever the occurrence list, the
/// selected month, or the clock changes. It borrows the occurrences it was built
/// from and holds no state of its own.
#[derive(Debug, PartialEq)]
pub struct DashboardView<'a> {
    /// Every month present in the unfiltered list, for the month picker
    pub months: Vec<String>,
    /// Occurrences in the selected month, newest first
    pub table: Vec<&'a SubscriptionOccurrence>,
    pub total_spent: Decimal,
    pub chart: ChartSeries,
    pub upcoming: Vec<UpcomingPayment>,
    pub monthly_costs: BTreeMap<String, Decimal>,
    pub projected_expenditure: Decimal,
}

impl<'a> DashboardView<'a> {
    /// Derive the dashboard for `occurrences` as seen at `now`.
    ///
    /// An empty `month` shows every occurrence. The upcoming list, the cost breakdown
    /// and the projected expenditure always cover the whole list.
    pub fn derive(
        occurrences: &'a [SubscriptionOccurrence],
        now: NaiveDateTime,
        month: &str,
        window_days: u32,
    ) -> Self {
        let table = sorted_by_date_descending(filter_by_month(occurrences, month));

        debug!(
            "deriving dashboard for {} of {} occurrences",
            table.len(),
            occurrences.len()
        );

        DashboardView {
            months: sorted_month_labels(occurrences),
            total_spent: total_spent(table.iter().copied()),
            chart: chart_series(table.iter().copied()),
            table,
            upcoming: upcoming_projection(occurrences, now),
            monthly_costs: monthly_cost_by_description(occurrences),
            projected_expenditure: projected_expenditure(occurrences, now, window_days),
        }
    }
}
