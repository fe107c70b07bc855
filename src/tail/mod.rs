//! Reading the newest lines of a log file.

pub mod filter;
pub mod reader;

pub use filter::{Filter, FilterError};
pub use reader::{tail, TailError};
