//! README summary rendering
//!
//! A small markdown snapshot of the national numbers: running totals,
//! the latest reported day, and 7-day averages.

use crate::sources::NationalSummary;
use chrono::{DateTime, Local};

/// Group digits with commas (1234567 -> "1,234,567")
pub fn format_count(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Render the README body from the national summary
pub fn render(summary: &NationalSummary, generated_at: DateTime<Local>) -> String {
    let report_day = summary.date.format("%B %d");
    let stamp = generated_at.format("%B %d, %Y, %-I:%M %p");

    format!(
        "# U.S COVID-19 Data\n\
        \n\
        Automatically updated from the NYT and OWID datasets.\n\
        \n\
        Last updated: {stamp}\n\
        \n\
        | U.S | Total Reported | On {report_day} | 7-Day Average |\n\
        | --- | --- | --- | --- |\n\
        | Cases | {total_cases} | {new_cases} | {cases_avg} |\n\
        | Deaths | {total_deaths} | {new_deaths} | {deaths_avg} |\n",
        stamp = stamp,
        report_day = report_day,
        total_cases = format_count(summary.total_cases),
        new_cases = format_count(summary.new_cases),
        cases_avg = format_count(summary.cases_7day_avg),
        total_deaths = format_count(summary.total_deaths),
        new_deaths = format_count(summary.new_deaths),
        deaths_avg = format_count(summary.deaths_7day_avg),
    )
}
