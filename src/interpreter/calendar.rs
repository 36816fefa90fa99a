use crate::ast::Value;
use chrono::{Datelike, Local, NaiveDate};
use std::fmt;

/// Source of the evaluation date used by `CurrentDate`.
///
/// The date is read once at the start of an evaluation pass, so every rule in
/// that pass agrees on "today" even across a midnight boundary.
pub trait Clock: Send + Sync + fmt::Debug {
    fn today(&self) -> NaiveDate;
}

/// The local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a date from a form value: `YYYY-MM-DD`, or the date part of an
/// RFC 3339 timestamp.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let date_part = match text.split_once(['T', 't']) {
        Some((date, time)) if !time.is_empty() => date,
        _ => text,
    };
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Whole calendar years from `from` to `to`; one less if the anniversary in
/// `to`'s year has not been reached yet.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn anniversary_not_reached_counts_one_less() {
        assert_eq!(whole_years_between(date("2006-03-15"), date("2024-03-14")), 17);
        assert_eq!(whole_years_between(date("2006-03-15"), date("2024-03-15")), 18);
    }

    #[test]
    fn leap_day_birthdays() {
        assert_eq!(whole_years_between(date("2004-02-29"), date("2022-02-28")), 17);
        assert_eq!(whole_years_between(date("2004-02-29"), date("2022-03-01")), 18);
    }

    #[test]
    fn timestamps_use_their_date_part() {
        assert_eq!(
            parse_date(&Value::from("2020-05-01T10:00:00Z")),
            Some(date("2020-05-01"))
        );
        assert_eq!(parse_date(&Value::from("not a date")), None);
        assert_eq!(parse_date(&Value::Undefined), None);
    }

    #[test]
    fn only_a_time_suffix_is_ignored() {
        assert_eq!(parse_date(&Value::from("2020-05-01T10:30:00Z")), Some(date("2020-05-01")));
        assert_eq!(parse_date(&Value::from("2020-05-01")), Some(date("2020-05-01")));
        assert_eq!(parse_date(&Value::from("2020-05-01xyz")), None);
        assert_eq!(parse_date(&Value::from("2020-05-01T")), None);
    }
}
