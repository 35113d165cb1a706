use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::{
    output::{format_signed, paint},
    table::{Table, TableColumn},
};
use crate::ledger::TransactionState;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Parses `YYYY-MM` into a year and month.
pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Monday-first month grid: one row of day numbers per week, followed by that week's totals.
pub fn render_month(year: i32, month: u32, totals: &BTreeMap<NaiveDate, f64>) -> String {
    let mut table = Table::new(WEEKDAYS.iter().map(|day| TableColumn::right(*day)).collect());
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return table.render();
    };

    let offset = first.weekday().num_days_from_monday() as usize;
    let mut days: Vec<Option<NaiveDate>> = vec![None; offset];
    days.extend((1..=days_in_month(year, month)).map(|day| first.with_day(day)));

    for week in days.chunks(7) {
        let mut numbers = vec![String::new(); 7];
        let mut amounts = vec![String::new(); 7];
        for (slot, date) in week.iter().enumerate() {
            let Some(date) = date else { continue };
            numbers[slot] = date.day().to_string();
            if let Some(total) = totals.get(date) {
                amounts[slot] = paint(&format_signed(*total), TransactionState::from_amount(*total));
            }
        }
        table.push_row(numbers);
        table.push_row(amounts);
    }
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2025-02"), Some((2025, 2)));
        assert_eq!(parse_month("2025-13"), None);
        assert_eq!(parse_month("february"), None);
    }

    #[test]
    fn counts_days_including_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2025, 12), 31);
    }

    #[test]
    fn grid_places_first_day_under_its_weekday() {
        colored::control::set_override(false);
        let mut totals = BTreeMap::new();
        totals.insert(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(), -12.5);

        let rendered = render_month(2025, 10, &totals);
        let lines: Vec<&str> = rendered.lines().collect();

        // October 2025 starts on a Wednesday.
        assert!(lines[0].starts_with(" Mon"));
        let first_week: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(first_week, vec!["1", "2", "3", "4", "5"]);
        assert!(lines[3].contains("-12.50"));
        assert!(rendered.contains("31"));
    }
}
