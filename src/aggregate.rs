//! Monthly totals from clipped precipitation rates.
//!
//! IMERG rates are mm/hr. A month's total is the mean rate over the basin's
//! valid cells and the month's time steps, times 24 hours, times the number
//! of days in that month.

use chrono::{Datelike, NaiveDate};

use crate::series::ClippedSeries;

const HOURS_PER_DAY: f64 = 24.0;

/// Basin-mean precipitation for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    /// First day of the month.
    pub month: NaiveDate,
    pub total_mm: f64,
    /// Valid cells that contributed, summed over steps.
    pub cells: usize,
    pub steps: usize,
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Gregorian month length.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Converts a mean rate in mm/hr to a month total in mm.
pub fn rate_to_monthly_total(rate_mm_hr: f64, year: i32, month: u32) -> f64 {
    rate_mm_hr * HOURS_PER_DAY * days_in_month(year, month) as f64
}

/// One value per calendar month present in the series, in date order.
///
/// Months whose steps have no valid cell produce `NaN`.
pub fn monthly_totals(series: &ClippedSeries) -> Vec<MonthlyTotal> {
    let mut totals: Vec<MonthlyTotal> = Vec::new();
    let mut sum = 0.0f64;

    for step in &series.steps {
        let month = first_of_month(step.date);

        let starts_new = totals.last().map(|t| t.month != month).unwrap_or(true);
        if starts_new {
            finish(totals.last_mut(), sum);
            sum = 0.0;
            totals.push(MonthlyTotal {
                month,
                total_mm: f64::NAN,
                cells: 0,
                steps: 0,
            });
        }

        if let Some(current) = totals.last_mut() {
            for value in step.valid_values() {
                sum += value as f64;
                current.cells += 1;
            }
            current.steps += 1;
        }
    }
    finish(totals.last_mut(), sum);

    totals
}

fn finish(total: Option<&mut MonthlyTotal>, sum: f64) {
    if let Some(total) = total {
        if total.cells > 0 {
            let mean_rate = sum / total.cells as f64;
            total.total_mm = rate_to_monthly_total(mean_rate, total.month.year(), total.month.month());
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// -- Tests -------------------------------------------------------------------
