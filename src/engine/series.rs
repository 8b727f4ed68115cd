//! Daily PnL series for dashboard charts.

use crate::domain::{Decimal, DecimalOverflow, PnlEntry};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPnl {
    pub date: NaiveDate,
    pub pnl: Decimal,
}

/// Sum `total_pnl` per day over the inclusive window `[from, to]`.
///
/// Every day in the window is present, zero when no entry falls on it;
/// entries outside the window are ignored.
pub fn daily_series<'a>(
    entries: impl IntoIterator<Item = &'a PnlEntry>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyPnl>, DecimalOverflow> {
    let mut days: BTreeMap<NaiveDate, Decimal> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|d| (d, Decimal::zero()))
        .collect();

    for entry in entries {
        if let Some(total) = days.get_mut(&entry.date) {
            *total = total.checked_add(entry.total_pnl)?;
        }
    }

    Ok(days
        .into_iter()
        .map(|(date, pnl)| DailyPnl { date, pnl })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    fn entry(date: NaiveDate, pnl: i64) -> PnlEntry {
        PnlEntry {
            id: 0,
            user_id: UserId::from("T1234"),
            date,
            symbol: "EURUSDc".to_string(),
            total_pnl: Decimal::from_i64(pnl),
            wallet_applied: Decimal::zero(),
        }
    }

    #[test]
    fn zero_fills_and_sums() {
        let entries = vec![
            entry(day(2), 10),
            entry(day(2), -4),
            entry(day(4), 7),
            entry(day(9), 100),
        ];
        let series = daily_series(&entries, day(1), day(5)).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].pnl, Decimal::zero());
        assert_eq!(series[1].pnl, Decimal::from_i64(6));
        assert_eq!(series[3].pnl, Decimal::from_i64(7));
        assert_eq!(series[4].date, day(5));
    }

    #[test]
    fn empty_when_window_inverted() {
        assert!(daily_series(&[], day(5), day(1)).unwrap().is_empty());
    }

    #[test]
    fn day_total_out_of_range_is_an_error() {
        let mut big = entry(day(3), 0);
        big.total_pnl = Decimal::from_str_canonical("70000000000000000000000000000").unwrap();
        let entries = vec![big.clone(), big];
        assert_eq!(daily_series(&entries, day(1), day(5)), Err(DecimalOverflow));
    }
}
