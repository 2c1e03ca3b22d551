//! Pregnancy date projections.
//!
//! Pure functions over mating and calendar dates. Nothing here touches the
//! data file; "today" is always passed in by the caller.

use crate::{Pregnancy, PregnancyStatus};
use chrono::{Duration, NaiveDate};

/// Average canine gestation length in days
pub const GESTATION_DAYS: i64 = 63;

/// Half-width of the due-date uncertainty band in days
pub const DUE_DATE_UNCERTAINTY_DAYS: i64 = 2;

/// Closed date interval covered by a pregnancy on the calendar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PregnancySpan {
    pub pregnancy_id: uuid::Uuid,
    pub dog_name: String,
    pub mating_date: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One week of gestation, numbered from 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GestationWeek {
    pub number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn calculate_due_date(mating_date: NaiveDate) -> NaiveDate {
    mating_date + Duration::days(GESTATION_DAYS)
}

pub fn calculate_days_pregnant(mating_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - mating_date).num_days()
}

/// Percentage of gestation elapsed, clamped to `[0, 100]`
pub fn calculate_progress(mating_date: NaiveDate, today: NaiveDate) -> f64 {
    let days = calculate_days_pregnant(mating_date, today) as f64;
    (days / GESTATION_DAYS as f64).clamp(0.0, 1.0) * 100.0
}

pub fn is_within_due_date_uncertainty(date: NaiveDate, due_date: NaiveDate) -> bool {
    (date - due_date).num_days().abs() <= DUE_DATE_UNCERTAINTY_DAYS
}

/// True for gestation days 61 through 65, counted from the mating date
pub fn is_in_due_week(date: NaiveDate, mating_date: NaiveDate) -> bool {
    let day = calculate_days_pregnant(mating_date, date);
    (GESTATION_DAYS - DUE_DATE_UNCERTAINTY_DAYS..=GESTATION_DAYS + DUE_DATE_UNCERTAINTY_DAYS)
        .contains(&day)
}

pub fn is_pregnancy_active_in_week(
    span: &PregnancySpan,
    week_start: NaiveDate,
    week_end: NaiveDate,
) -> bool {
    span.start <= week_end && span.end >= week_start
}

/// Calendar span of a pregnancy: mating until birth, or until the expected due date
pub fn pregnancy_span(pregnancy: &Pregnancy, dog_name: &str) -> PregnancySpan {
    let end = match pregnancy.status {
        PregnancyStatus::Completed => pregnancy
            .actual_birth_date
            .unwrap_or(pregnancy.expected_due_date),
        PregnancyStatus::Active => pregnancy.expected_due_date,
    };

    PregnancySpan {
        pregnancy_id: pregnancy.id,
        dog_name: dog_name.to_string(),
        mating_date: pregnancy.mating_date,
        start: pregnancy.mating_date,
        end: end.max(pregnancy.mating_date),
    }
}

/// 1-based gestation week containing `date`; 0 before mating
pub fn gestation_week(mating_date: NaiveDate, date: NaiveDate) -> u32 {
    let days = calculate_days_pregnant(mating_date, date);
    if days < 0 {
        0
    } else {
        (days / 7 + 1) as u32
    }
}

/// Split a pregnancy span into consecutive gestation weeks
pub fn week_bands(span: &PregnancySpan) -> Vec<GestationWeek> {
    let mut bands = Vec::new();
    let mut start = span.start;
    let mut number = 1;

    while start <= span.end {
        let end = (start + Duration::days(6)).min(span.end);
        bands.push(GestationWeek { number, start, end });
        start = end + Duration::days(1);
        number += 1;
    }

    bands
}
