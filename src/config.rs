//! Runtime configuration: document-store endpoint, booking window, slot grid.

use std::env;

use chrono::{Duration, NaiveDate};

/// Application-level constants
pub const APP_NAME: &str = "MediBook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the document-store base URL.
pub const API_URL_ENV: &str = "MEDIBOOK_API_URL";

/// Default json-server style document store endpoint.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Seconds before a document-store request is abandoned.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Document-store base URL, `MEDIBOOK_API_URL` overriding the default.
pub fn api_base_url() -> String {
    env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

pub fn default_log_filter() -> &'static str {
    "info,medibook=debug"
}

/// Bookable times of day, as offered to patients. Half-hour grid with a
/// lunch gap, identical for every doctor.
pub const SLOT_TIMES: &[&str] = &[
    "09:00 AM",
    "09:30 AM",
    "10:00 AM",
    "10:30 AM",
    "11:00 AM",
    "11:30 AM",
    "12:00 PM",
    "02:00 PM",
    "02:30 PM",
    "03:00 PM",
    "03:30 PM",
    "04:00 PM",
    "04:30 PM",
    "05:00 PM",
];

// ─── Booking window ───────────────────────────────────────────────────────────

/// How far ahead an appointment may be booked, in whole days from today.
/// Same-day booking is excluded: the earliest valid date is tomorrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingWindow {
    pub min_days_ahead: i64,
    pub max_days_ahead: i64,
}

impl BookingWindow {
    pub fn days_ahead(min: i64, max: i64) -> Self {
        Self {
            min_days_ahead: min,
            max_days_ahead: max,
        }
    }

    /// Narrow window used by the doctor-side booking flow.
    pub fn doctor_flow() -> Self {
        Self::days_ahead(1, 6)
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        let earliest = today + Duration::days(self.min_days_ahead);
        let latest = today + Duration::days(self.max_days_ahead);
        date >= earliest && date <= latest
    }
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self::days_ahead(1, 14)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotTime;

    #[test]
    fn slot_grid_is_ordered_and_parseable() {
        let parsed: Vec<SlotTime> = SLOT_TIMES
            .iter()
            .map(|s| s.parse().expect("slot table entry must parse"))
            .collect();
        assert_eq!(parsed.len(), 14);
        for pair in parsed.windows(2) {
            assert!(pair[0] < pair[1], "slot grid must be strictly increasing");
        }
    }

    #[test]
    fn default_window_is_tomorrow_through_two_weeks() {
        let window = BookingWindow::default();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(!window.contains(today, today));
        assert!(window.contains(today + Duration::days(1), today));
        assert!(window.contains(today + Duration::days(14), today));
        assert!(!window.contains(today + Duration::days(15), today));
        assert!(!window.contains(today - Duration::days(1), today));
    }

    #[test]
    fn doctor_flow_window_is_narrower() {
        let window = BookingWindow::doctor_flow();
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(window.contains(today + Duration::days(6), today));
        assert!(!window.contains(today + Duration::days(7), today));
    }

    #[test]
    fn api_url_defaults_to_localhost() {
        env::remove_var(API_URL_ENV);
        assert_eq!(api_base_url(), DEFAULT_API_URL);
    }
}
