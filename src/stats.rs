use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::types::{LogEntry, UsageSummary};

/// Tokens per displayed currency unit.
pub const QUOTA_PER_UNIT: u64 = 500_000;

pub const UNLIMITED_LABEL: &str = "unlimited";
pub const UNKNOWN_EXPIRY_LABEL: &str = "unknown";

/// One labeled display row of the summary card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRow {
    pub label: &'static str,
    pub value: String,
}

/// Converts a raw token amount to a currency display: divide by the unit
/// rate, render at three decimals, then trim trailing zeros after the
/// decimal point (and the point itself once nothing follows it). The
/// integer part is never trimmed.
pub fn format_currency_from_tokens(tokens: i64, quota_per_unit: u64) -> String {
    let rate = if quota_per_unit > 0 {
        quota_per_unit
    } else {
        QUOTA_PER_UNIT
    };
    let fixed = format!("{:.3}", tokens as f64 / rate as f64);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("${trimmed}")
}

/// Renders a unix timestamp as a UTC wall-clock string, falling back to the
/// raw number when it is outside the representable range.
pub fn format_timestamp(unix_seconds: i64) -> String {
    const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    OffsetDateTime::from_unix_timestamp(unix_seconds)
        .ok()
        .and_then(|datetime| datetime.format(TIMESTAMP_FORMAT).ok())
        .unwrap_or_else(|| unix_seconds.to_string())
}

pub fn expiry_label(expires_at: i64) -> String {
    if expires_at <= 0 {
        UNKNOWN_EXPIRY_LABEL.to_string()
    } else {
        format_timestamp(expires_at)
    }
}

/// Derives the four labeled display rows for a summary card. Under an
/// unlimited grant, granted and available render as a label while used stays
/// numeric, since usage is bounded even when the grant is not.
pub fn summary_rows(summary: &UsageSummary, quota_per_unit: u64) -> [StatRow; 4] {
    let quota_cell = |tokens: i64| {
        if summary.unlimited_quota {
            UNLIMITED_LABEL.to_string()
        } else {
            format_currency_from_tokens(tokens, quota_per_unit)
        }
    };

    [
        StatRow {
            label: "granted",
            value: quota_cell(summary.total_granted),
        },
        StatRow {
            label: "available",
            value: quota_cell(summary.total_available),
        },
        StatRow {
            label: "used",
            value: format_currency_from_tokens(summary.total_used, quota_per_unit),
        },
        StatRow {
            label: "expires",
            value: expiry_label(summary.expires_at),
        },
    ]
}

pub fn log_time_cell(entry: &LogEntry) -> String {
    match entry.created_at {
        Some(created_at) if created_at != 0 => format_timestamp(created_at),
        _ => "-".to_string(),
    }
}

pub fn log_kind_cell(entry: &LogEntry) -> &'static str {
    match entry.kind() {
        Some(kind) => kind.label(),
        None => "unknown",
    }
}

pub fn log_model_cell(entry: &LogEntry) -> String {
    match entry.model_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "-".to_string(),
    }
}

pub fn log_quota_cell(entry: &LogEntry, quota_per_unit: u64) -> String {
    format_currency_from_tokens(entry.quota, quota_per_unit)
}

pub fn log_ip_cell(entry: &LogEntry) -> String {
    match entry.ip.as_deref() {
        Some(ip) if !ip.is_empty() => ip.to_string(),
        _ => "-".to_string(),
    }
}
