use std::fmt::Write;

use crate::core::SummaryStatistics;

/// `$12,345.67` style formatting. Non-finite values are printed as-is.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b != b'0' && b != b'.') {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{frac_part}")
}

pub fn render_summary(summary: &SummaryStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Median final value: {}", format_currency(summary.median));
    let _ = writeln!(out, "10th percentile: {}", format_currency(summary.p10));
    let _ = writeln!(out, "90th percentile: {}", format_currency(summary.p90));
    out
}
