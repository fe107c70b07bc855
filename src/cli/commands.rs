use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::syslog::SyslogParser;
use crate::tail::{self, Filter};
use crate::web::EntriesResponse;

pub fn tail_file(path: &Path, n: usize, filter: Option<&str>, json: bool) -> Result<()> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let filter = Filter::from_text(filter)?;

    let entries = tail::tail(&mut file, n, &filter)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &EntriesResponse { entries })?;
        writeln!(out)?;
    } else {
        for line in &entries {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub fn parse_file(path: &Path, year: Option<i32>, json: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let parser = SyslogParser::new().context("Failed to compile syslog header pattern")?;

    let mut records = match parser.parse(BufReader::new(file)) {
        Ok(records) => records,
        Err(e) => {
            if let Some(raw) = e.raw_line() {
                tracing::error!(file = %path.display(), line = raw, "Unparseable syslog line");
            }
            return Err(e).with_context(|| format!("Failed to parse {}", path.display()));
        }
    };

    if let Some(year) = year {
        for record in &mut records {
            record.timestamp = record.timestamp_in_year(year).with_context(|| {
                format!("{} does not exist in {}", record.timestamp.format("%b %e"), year)
            })?;
        }
    }

    let mut out = std::io::stdout().lock();
    for record in &records {
        if json {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{:?}", record)?;
        }
    }
    Ok(())
}
