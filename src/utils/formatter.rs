// src/utils/formatter.rs

use crate::types::{MetricUnit, TrendDirection};

/// Format a percentage value that is already expressed in percent (20.0 -> "20.0%")
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format a growth value with an explicit sign
pub fn format_growth(value: f64) -> String {
    if value > 0.0 {
        format!("+{:.1}%", value)
    } else {
        format!("{:.1}%", value)
    }
}

/// Format monetary value with thousands separators
pub fn format_money(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = (value.abs() * 100.0).round() as u64;
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Format a count with thousands separators
pub fn format_count(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(value.abs().round() as u64))
}

/// Format a value according to its unit
pub fn format_metric_value(value: f64, unit: MetricUnit) -> String {
    match unit {
        MetricUnit::Currency => format_money(value),
        MetricUnit::Count => format_count(value),
        MetricUnit::Percentage => format_percentage(value),
        MetricUnit::Ratio => format!("{:.2}", value),
    }
}

/// Arrow glyph used by dashboard cards
pub fn trend_indicator(trend: TrendDirection) -> &'static str {
    match trend {
        TrendDirection::Increasing => "↑",
        TrendDirection::Decreasing => "↓",
        TrendDirection::Stable => "→",
    }
}

/// Quote a CSV field when it contains separators or quotes
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
