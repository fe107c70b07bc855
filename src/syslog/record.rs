use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

/// One syslog entry, with any continuation lines folded into it.
///
/// The classic syslog stamp has no year, so `timestamp` carries year 0.
/// Use [`LogRecord::timestamp_in_year`] to place it in a concrete year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub host: String,
    pub process_name: String,
    pub pid: u32,
    pub message: String,
    /// The physical lines of the entry, joined by single spaces
    pub raw: String,
}

impl LogRecord {
    /// The timestamp moved to `year`, or `None` for Feb 29 in a non-leap year.
    pub fn timestamp_in_year(&self, year: i32) -> Option<NaiveDateTime> {
        self.timestamp.with_year(year)
    }

    pub(super) fn append_continuation(&mut self, text: &str) {
        self.message.push(' ');
        self.message.push_str(text);
        self.raw.push(' ');
        self.raw.push_str(text);
    }
}
