use chrono::{Datelike, Month, NaiveDate};

use crate::model::DateKey;

/// Leap year used as the date universe so Feb 29 is representable.
pub const UNIVERSE_YEAR: i32 = 2024;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> Option<&'static str> {
    let month = Month::try_from(u8::try_from(month).ok()?).ok()?;
    Some(month.name())
}

/// Three-letter abbreviation, e.g. "Feb".
pub fn month_abbrev(month: u32) -> Option<&'static str> {
    month_name(month).map(|name| &name[..3])
}

/// Full or abbreviated month name, any case.
pub fn parse_month(name: &str) -> Option<u32> {
    let month: Month = name.trim().trim_end_matches('.').parse().ok()?;
    Some(month.number_from_month())
}

pub fn is_valid(month: u32, day: u32) -> bool {
    NaiveDate::from_ymd_opt(UNIVERSE_YEAR, month, day).is_some()
}

/// Every (month, day) of the leap-year universe, in calendar order.
pub fn year_keys() -> impl Iterator<Item = DateKey> {
    let start = NaiveDate::from_ymd_opt(UNIVERSE_YEAR, 1, 1).unwrap_or_default();
    start
        .iter_days()
        .take_while(|d| d.year() == UNIVERSE_YEAR)
        .map(|d| DateKey {
            month: d.month(),
            day: d.day(),
        })
}
