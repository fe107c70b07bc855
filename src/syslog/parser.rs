use std::io::{self, BufRead};
use std::num::ParseIntError;

use chrono::NaiveDateTime;
use regex::Regex;
use thiserror::Error;

use super::record::LogRecord;

/// `Mmm dd HH:MM:SS host process[pid]: message`
const HEADER_PATTERN: &str = r"^(?P<timestamp>[A-Z][a-z]{2}\s[\s0-9][0-9]\s[0-9]{2}:[0-9]{2}:[0-9]{2})\s(?P<host>\S+)\s(?P<process>[^\[]+)\[(?P<pid>[^\]]+)\]:\s+(?P<message>.+)$";

/// Stamp format after the year is prefixed and padding collapsed
const STAMP_FORMAT: &str = "%Y %b %d %H:%M:%S";

#[derive(Debug, Error)]
pub enum SyslogError {
    #[error("line {line}: incorrect header format: {raw:?}")]
    MalformedHeader { line: usize, raw: String },

    #[error("line {line}: invalid PID {pid:?} in {raw:?}")]
    InvalidPid {
        line: usize,
        raw: String,
        pid: String,
        #[source]
        source: Option<ParseIntError>,
    },

    #[error("line {line}: invalid timestamp {stamp:?} in {raw:?}")]
    InvalidTimestamp {
        line: usize,
        raw: String,
        stamp: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("line {line}: continuation line without a preceding header: {raw:?}")]
    OrphanContinuation { line: usize, raw: String },

    #[error("failed to read line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

impl SyslogError {
    /// The physical line that failed to parse, if the failure was not I/O
    pub fn raw_line(&self) -> Option<&str> {
        match self {
            Self::MalformedHeader { raw, .. }
            | Self::InvalidPid { raw, .. }
            | Self::InvalidTimestamp { raw, .. }
            | Self::OrphanContinuation { raw, .. } => Some(raw),
            Self::Read { .. } => None,
        }
    }
}

/// Parses classic BSD syslog text into [`LogRecord`]s.
///
/// Every line that does not start with a tab must be a header:
///
/// ```text
/// Feb  1 10:11:12 the-host-name processname[23444]: message
/// <TAB>continuation of the message
/// ```
///
/// Tab-prefixed lines are appended to the previous record's message and raw
/// text with a single space in place of the tab. Parsing is all-or-nothing: the
/// first bad line fails the whole input. The whole input is held in memory.
pub struct SyslogParser {
    header: Regex,
}

impl SyslogParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            header: Regex::new(HEADER_PATTERN)?,
        })
    }

    pub fn parse<R: BufRead>(&self, reader: R) -> Result<Vec<LogRecord>, SyslogError> {
        let mut records: Vec<LogRecord> = Vec::new();

        for (idx, bytes) in reader.split(b'\n').enumerate() {
            let line = idx + 1;
            let mut bytes = bytes.map_err(|source| SyslogError::Read { line, source })?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            let raw = String::from_utf8_lossy(&bytes);

            if let Some(continuation) = raw.strip_prefix('\t') {
                match records.last_mut() {
                    Some(record) => record.append_continuation(continuation),
                    None => {
                        return Err(SyslogError::OrphanContinuation {
                            line,
                            raw: raw.to_string(),
                        })
                    }
                }
            } else {
                records.push(self.parse_header(line, &raw)?);
            }
        }

        tracing::debug!(records = records.len(), "Parsed syslog input");
        Ok(records)
    }

    fn parse_header(&self, line: usize, raw: &str) -> Result<LogRecord, SyslogError> {
        let caps = self
            .header
            .captures(raw)
            .ok_or_else(|| SyslogError::MalformedHeader {
                line,
                raw: raw.to_string(),
            })?;

        let pid_text = &caps["pid"];
        let invalid_pid = |source| SyslogError::InvalidPid {
            line,
            raw: raw.to_string(),
            pid: pid_text.to_string(),
            source,
        };
        // u32::from_str takes a leading '+', a PID is digits only.
        if !pid_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid_pid(None));
        }
        let pid = pid_text
            .parse::<u32>()
            .map_err(|e| invalid_pid(Some(e)))?;

        let stamp = &caps["timestamp"];
        let timestamp = parse_stamp(stamp).map_err(|source| SyslogError::InvalidTimestamp {
            line,
            raw: raw.to_string(),
            stamp: stamp.to_string(),
            source,
        })?;

        Ok(LogRecord {
            timestamp,
            host: caps["host"].to_string(),
            process_name: caps["process"].to_string(),
            pid,
            message: caps["message"].to_string(),
            raw: raw.to_string(),
        })
    }
}

/// Parse `Mmm dd HH:MM:SS` (day possibly space padded) into year 0.
fn parse_stamp(stamp: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let collapsed = stamp.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&format!("0000 {collapsed}"), STAMP_FORMAT)
}
