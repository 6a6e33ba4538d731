use chrono::{Datelike, Days, NaiveDate};

use crate::error::DecodeError;

/// Last calendar day of the `YYYYMM` period.
///
/// Day 28 plus four days always lands in the following month; stepping back by
/// that date's day-of-month returns to the last day of the original one, so no
/// month-length table is needed.
pub fn last_day_of_period(yyyymm: &str) -> Result<NaiveDate, DecodeError> {
    let invalid = || DecodeError::InvalidDate(yyyymm.to_string());
    let s = yyyymm.trim();
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = s[0..4].parse().map_err(|_| invalid())?;
    let month: u32 = s[4..6].parse().map_err(|_| invalid())?;

    let next_month = NaiveDate::from_ymd_opt(year, month, 28)
        .and_then(|d| d.checked_add_days(Days::new(4)))
        .ok_or_else(invalid)?;
    next_month
        .checked_sub_days(Days::new(u64::from(next_month.day())))
        .ok_or_else(invalid)
}

/// `YYYYMM` → `YYYY-MM-DD` of the period's last day.
pub fn adapt_date(yyyymm: &str) -> Result<String, DecodeError> {
    last_day_of_period(yyyymm).map(|d| d.format("%Y-%m-%d").to_string())
}
