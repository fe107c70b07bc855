//! Structured parsing of classic BSD syslog files.

pub mod parser;
pub mod record;

pub use parser::SyslogParser;
