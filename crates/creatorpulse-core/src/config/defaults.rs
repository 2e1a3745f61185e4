//! Default values for all configuration sections.

pub(super) fn server_host() -> String {
    "127.0.0.1".to_string()
}

pub(super) fn server_port() -> u16 {
    3001
}

pub(super) fn db_path() -> String {
    "~/.creatorpulse/creatorpulse.db".to_string()
}

/// Safe, non-zero default so unconfigured users never see a divide-by-zero
/// quota in UI code (§4.4 "Defaults").
pub(super) fn llm_limit_minute() -> i64 {
    1000
}

pub(super) fn llm_limit_day() -> i64 {
    1000
}

pub(super) fn smtp_port() -> u16 {
    587
}

/// Standard-tier daily send cap (§4.11, §8 S6).
pub(super) fn daily_cap_standard() -> i64 {
    450
}

/// Workspace-tier daily send cap (§4.11).
pub(super) fn daily_cap_workspace() -> i64 {
    1950
}

pub(super) fn tracking_base_url() -> String {
    "http://127.0.0.1:3001/track".to_string()
}

/// 30 minutes, the recommended reconciliation period (§4.3).
pub(super) fn reconciliation_period_seconds() -> u64 {
    1800
}

/// 24 hours, the default crawl frequency for a new user schedule (§3).
pub(super) fn crawl_frequency_hours() -> i64 {
    24
}
