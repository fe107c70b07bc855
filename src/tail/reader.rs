use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

use super::filter::LineFilter;

/// Assumed average length of a log line, used to size backward reads
pub const AVERAGE_LINE_LEN: u64 = 120;

#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to seek to {target:?}")]
    Seek {
        target: SeekFrom,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {len} bytes at offset {offset}")]
    Read {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Reads the last lines of a seekable source by scanning backward in chunks
/// sized from an assumed average line length.
#[derive(Debug, Clone, Copy)]
pub struct TailReader {
    average_line_len: u64,
}

impl Default for TailReader {
    fn default() -> Self {
        Self {
            average_line_len: AVERAGE_LINE_LEN,
        }
    }
}

#[cfg(test)]
impl TailReader {
    pub fn with_line_len(average_line_len: u64) -> Self {
        Self {
            average_line_len: average_line_len.max(1),
        }
    }
}

impl TailReader {
    /// Return up to `max_lines` lines accepted by `filter`, newest first.
    ///
    /// Only the bytes needed to satisfy the request are read from the end of
    /// `source`. Lines never carry their terminator and CR bytes are dropped.
    /// The source is left open and its cursor position is unspecified.
    pub fn tail<S, F>(
        &self,
        source: &mut S,
        max_lines: usize,
        filter: &F,
    ) -> Result<Vec<String>, TailError>
    where
        S: Read + Seek + ?Sized,
        F: LineFilter + ?Sized,
    {
        if max_lines == 0 {
            return Ok(Vec::new());
        }

        let length = seek(source, SeekFrom::End(0))?;
        let mut chunk_size = (max_lines as u64).saturating_mul(self.average_line_len);
        let mut position = length;
        let mut lines = Vec::with_capacity(max_lines.min(1024));
        let mut buf = Vec::new();

        while lines.len() < max_lines && position > 0 {
            let read_size = chunk_size.min(position);
            let start = position - read_size;

            seek(source, SeekFrom::Start(start))?;
            buf.clear();
            buf.resize(read_size as usize, 0);
            source.read_exact(&mut buf).map_err(|e| TailError::Read {
                offset: start,
                len: read_size as usize,
                source: e,
            })?;

            let mut fragments: Vec<&[u8]> = buf.split(|&b| b == b'\n').collect();
            // The terminator of the final line does not open another line.
            if position == length && buf.last() == Some(&b'\n') {
                fragments.pop();
            }

            let complete = if start == 0 {
                &fragments[..]
            } else {
                // The chunk boundary fell inside a line. Leave that partial line
                // for the next chunk, which will end exactly where it ends.
                let partial_len = fragments.first().map_or(0, |f| f.len()) as u64;
                let next_position = start + partial_len;
                if next_position >= position {
                    // No line break in a full chunk: the line is longer than
                    // the chunk. Widen and retry from the same position.
                    chunk_size = chunk_size.saturating_mul(2);
                    continue;
                }
                position = next_position;
                &fragments[1..]
            };

            for fragment in complete.iter().rev() {
                let line = decode_line(fragment);
                if filter.accepts(&line) {
                    lines.push(line);
                    if lines.len() == max_lines {
                        break;
                    }
                }
            }

            if start == 0 {
                position = 0;
            }
        }

        Ok(lines)
    }
}

/// Tail `source` with the default chunk sizing.
pub fn tail<S, F>(source: &mut S, max_lines: usize, filter: &F) -> Result<Vec<String>, TailError>
where
    S: Read + Seek + ?Sized,
    F: LineFilter + ?Sized,
{
    TailReader::default().tail(source, max_lines, filter)
}

fn seek<S: Seek + ?Sized>(source: &mut S, target: SeekFrom) -> Result<u64, TailError> {
    source
        .seek(target)
        .map_err(|source| TailError::Seek { target, source })
}

fn decode_line(fragment: &[u8]) -> String {
    let text = String::from_utf8_lossy(fragment);
    if text.contains('\r') {
        text.replace('\r', "")
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use super::*;
    use crate::tail::filter::Filter;

    const SIX_LINES: &str = "Line 0\nLine 1\nLine 2\nLine 3\nLine 4\nLine 5";

    fn cursor(content: &str) -> Cursor<Vec<u8>> {
        Cursor::new(content.as_bytes().to_vec())
    }

    /// Forward-reading reference: every matching line, newest first
    fn naive_tail(content: &str, max_lines: usize, filter: &Filter) -> Vec<String> {
        let mut matching: Vec<String> = content
            .lines()
            .filter(|l| filter.accepts(l))
            .map(str::to_string)
            .collect();
        matching.reverse();
        matching.truncate(max_lines);
        matching
    }

    /// Source whose every operation fails
    struct BrokenSource {
        fail_seek: bool,
    }

    impl Read for BrokenSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    impl Seek for BrokenSource {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            if self.fail_seek {
                Err(io::Error::new(io::ErrorKind::Other, "bad seek"))
            } else {
                Ok(64)
            }
        }
    }

    #[test]
    fn test_last_two_lines() {
        let out = tail(&mut cursor(SIX_LINES), 2, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["Line 5", "Line 4"]);
    }

    #[test]
    fn test_more_lines_than_exist() {
        let out = tail(&mut cursor(SIX_LINES), 100, &Filter::AcceptAll).unwrap();
        assert_eq!(
            out,
            vec!["Line 5", "Line 4", "Line 3", "Line 2", "Line 1", "Line 0"]
        );
    }

    #[test]
    fn test_exact_line_count() {
        let out = tail(&mut cursor("Line 0\nLine 1\nLine 2"), 3, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["Line 2", "Line 1", "Line 0"]);
    }

    #[test]
    fn test_zero_lines_does_no_io() {
        let mut source = BrokenSource { fail_seek: true };
        let out = tail(&mut source, 0, &Filter::AcceptAll).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_source() {
        let out = tail(&mut cursor(""), 10, &Filter::AcceptAll).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_trailing_newline_is_not_a_line() {
        let out = tail(&mut cursor("a\nb\n"), 10, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["b", "a"]);

        let out = tail(&mut cursor("\n"), 10, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec![""]);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let out = tail(&mut cursor("a\n\nb\n"), 10, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["b", "", "a"]);
    }

    #[test]
    fn test_carriage_returns_removed() {
        let out = tail(&mut cursor("one\r\ntwo\r\nthree\r\n"), 2, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["three", "two"]);
        assert!(out.iter().all(|l| !l.contains('\r') && !l.contains('\n')));
    }

    #[test]
    fn test_filtered_tail() {
        let content = "01 thisprocess a\n02 other b\n03 thisprocess c\n04 other d\n05 other e";
        let filter = Filter::contains("thisprocess").unwrap();

        let out = tail(&mut cursor(content), 1, &filter).unwrap();
        assert_eq!(out, vec!["03 thisprocess c"]);

        let out = tail(&mut cursor(content), 5, &filter).unwrap();
        assert_eq!(out, vec!["03 thisprocess c", "01 thisprocess a"]);

        let out = tail(&mut cursor(content), 5, &Filter::contains("nothing").unwrap()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_closure_filter() {
        let even = |line: &str| line.ends_with(['0', '2', '4']);
        let out = tail(&mut cursor(SIX_LINES), 10, &even).unwrap();
        assert_eq!(out, vec!["Line 4", "Line 2", "Line 0"]);
    }

    #[test]
    fn test_idempotent() {
        let mut source = cursor(SIX_LINES);
        let first = tail(&mut source, 4, &Filter::AcceptAll).unwrap();
        let second = tail(&mut source, 4, &Filter::AcceptAll).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_chunk_boundaries_match_forward_read() {
        let content: String = (0..200)
            .map(|i| format!("{:03} {}\n", i, "x".repeat(i % 17)))
            .collect();
        let filters = [
            Filter::AcceptAll,
            Filter::contains("xxxxx").unwrap(),
            Filter::contains("7 ").unwrap(),
        ];

        for line_len in [1, 2, 3, 7, 16, 120] {
            let reader = TailReader::with_line_len(line_len);
            for max_lines in [1, 2, 5, 13, 199, 200, 500] {
                for filter in &filters {
                    let out = reader
                        .tail(&mut cursor(&content), max_lines, filter)
                        .unwrap();
                    assert_eq!(
                        out,
                        naive_tail(&content, max_lines, filter),
                        "line_len={line_len} max_lines={max_lines} filter={:?}",
                        filter.needle()
                    );
                }
            }
        }
    }

    #[test]
    fn test_chunk_boundary_on_line_start() {
        // 3 byte chunks: the first read starts on a line break and the second
        // is a full chunk that reaches offset zero with a blank first line.
        let content = "\nab\ncd";
        let reader = TailReader::with_line_len(1);
        let out = reader.tail(&mut cursor(content), 3, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["cd", "ab", ""]);

        let out = reader.tail(&mut cursor(content), 2, &Filter::AcceptAll).unwrap();
        assert_eq!(out, vec!["cd", "ab"]);
    }

    #[test]
    fn test_line_longer_than_chunk() {
        let long = "y".repeat(1000);
        let content = format!("first\n{long}\nlast\n");
        let out = TailReader::with_line_len(4)
            .tail(&mut cursor(&content), 2, &Filter::AcceptAll)
            .unwrap();
        assert_eq!(out, vec!["last".to_string(), long]);
    }

    #[test]
    fn test_single_line_without_newline() {
        let out = TailReader::with_line_len(2)
            .tail(&mut cursor("just one long line"), 1, &Filter::AcceptAll)
            .unwrap();
        assert_eq!(out, vec!["just one long line"]);
    }

    #[test]
    fn test_seek_error_is_wrapped() {
        let mut source = BrokenSource { fail_seek: true };
        let err = tail(&mut source, 3, &Filter::AcceptAll).unwrap_err();
        assert!(matches!(err, TailError::Seek { .. }));
        assert!(err.to_string().contains("seek"));
    }

    #[test]
    fn test_read_error_is_wrapped() {
        let mut source = BrokenSource { fail_seek: false };
        let err = tail(&mut source, 3, &Filter::AcceptAll).unwrap_err();
        match err {
            TailError::Read { offset, len, .. } => {
                assert_eq!(offset, 0);
                assert_eq!(len, 64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Counts the bytes handed out by `read`
    struct CountingSource<S> {
        inner: S,
        bytes_read: u64,
    }

    impl<S: Read> Read for CountingSource<S> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl<S: Seek> Seek for CountingSource<S> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_reads_only_the_end_of_a_large_source() {
        let content: String = (0..100_000).map(|i| format!("line {i}\n")).collect();
        let total = content.len() as u64;
        assert!(total > 1_000_000);

        let mut source = CountingSource {
            inner: cursor(&content),
            bytes_read: 0,
        };
        let out = tail(&mut source, 10, &Filter::AcceptAll).unwrap();

        assert_eq!(out.len(), 10);
        assert_eq!(out[0], "line 99999");
        assert_eq!(out[9], "line 99990");
        assert!(
            source.bytes_read <= 10 * AVERAGE_LINE_LEN,
            "read {} of {} bytes",
            source.bytes_read,
            total
        );
    }

    #[test]
    fn test_reads_from_file() {
        let mut file = tempfile::tempfile().unwrap();
        for i in 1..=11 {
            writeln!(file, "{:02} the-host-name thisprocess[4321] message {}", i, i).unwrap();
        }

        let out = tail(&mut file, 4, &Filter::AcceptAll).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out[0].starts_with("11"));
        assert!(out[3].starts_with("08"));

        let out = tail(&mut file, 300, &Filter::AcceptAll).unwrap();
        assert_eq!(out.len(), 11);
        assert!(out[10].starts_with("01"));
    }
}
