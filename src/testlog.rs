//! Test-result file parsing.
//!
//! Separation test runs dump their metrics as an ANSI-colored rendering of a
//! flat map, e.g. `{'nsdr_drums': 1.5, 'sdr_med_bass': 4.2}`. The parser
//! here accepts exactly that shape -- quoted string keys mapped to plain
//! numbers -- rather than evaluating arbitrary literals from log files.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

static ANSI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").expect("valid regex"));

/// Remove ANSI escape sequences from text.
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

/// Parse a brace-delimited metrics map.
///
/// The accepted grammar is `{}` or `{<key>: <number>, ...}` where keys are
/// single- or double-quoted strings and values parse as `f64`. A trailing
/// comma before the closing brace is tolerated; anything else is an error.
///
/// # Errors
/// Returns `Error::MetricsSyntax` with the byte offset of the first
/// offending character.
pub fn parse_metrics_map(text: &str) -> crate::Result<BTreeMap<String, f64>> {
    let mut parser = MapParser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.parse()
}

struct MapParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> MapParser<'a> {
    fn error<T>(&self, reason: &'static str) -> crate::Result<T> {
        Err(crate::Error::MetricsSyntax {
            offset: self.pos,
            reason,
        })
    }

    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, reason: &'static str) -> crate::Result<()> {
        if self.bytes.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Ok(())
        } else {
            self.error(reason)
        }
    }

    fn parse(&mut self) -> crate::Result<BTreeMap<String, f64>> {
        let mut map = BTreeMap::new();

        self.skip_whitespace();
        self.expect(b'{', "expected `{`")?;
        self.skip_whitespace();

        loop {
            if self.bytes.get(self.pos) == Some(&b'}') {
                self.pos += 1;
                break;
            }

            let key = self.parse_key()?;
            self.skip_whitespace();
            self.expect(b':', "expected `:` after key")?;
            self.skip_whitespace();
            let value = self.parse_number()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                Some(&b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                }
                Some(&b'}') => {}
                _ => return self.error("expected `,` or `}` after value"),
            }
        }

        self.skip_whitespace();
        if self.pos != self.bytes.len() {
            return self.error("trailing characters after map");
        }
        Ok(map)
    }

    fn parse_key(&mut self) -> crate::Result<String> {
        let quote = match self.bytes.get(self.pos).copied() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return self.error("expected quoted key"),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == quote {
                let key = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| crate::Error::MetricsSyntax {
                        offset: start,
                        reason: "key is not valid UTF-8",
                    })?
                    .to_owned();
                self.pos += 1;
                return Ok(key);
            }
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.error("unterminated key")
    }

    fn parse_number(&mut self) -> crate::Result<f64> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return self.error("expected number");
        }
        // Slicing is safe: only ASCII bytes were consumed.
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("ascii number text");
        match text.parse::<f64>() {
            Ok(v) => Ok(v),
            Err(_) => {
                self.pos = start;
                self.error("invalid number")
            }
        }
    }
}

/// Parse a test-result file into a metrics map.
///
/// Reads the file, strips ANSI color codes, and parses the remaining text.
/// Any failure -- unreadable file, malformed content -- is logged and
/// degraded to an empty map so one bad checkpoint doesn't abort a whole
/// plotting run.
pub fn parse_test_file<P: AsRef<Path>>(path: P) -> BTreeMap<String, f64> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::error!("error reading {}: {e}", path.display());
            return BTreeMap::new();
        }
    };
    match parse_metrics_map(strip_ansi(content.trim()).as_str()) {
        Ok(map) => map,
        Err(e) => {
            log::error!("error parsing {}: {e}", path.display());
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        let colored = "\x1B[32m{'nsdr_drums': 1.5}\x1B[0m";
        assert_eq!(strip_ansi(colored), "{'nsdr_drums': 1.5}");
    }

    #[test]
    fn test_parse_single_entry() {
        let map = parse_metrics_map("{'nsdr_drums': 1.5}").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["nsdr_drums"], 1.5);
    }

    #[test]
    fn test_parse_double_quotes_and_negatives() {
        let map = parse_metrics_map(r#"{"sdr_bass": -3.25, "sir_vocals": 1e2}"#).unwrap();
        assert_eq!(map["sdr_bass"], -3.25);
        assert_eq!(map["sir_vocals"], 100.0);
    }

    #[test]
    fn test_parse_empty_map() {
        assert!(parse_metrics_map("{}").unwrap().is_empty());
        assert!(parse_metrics_map("  { }  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_trailing_comma() {
        let map = parse_metrics_map("{'a': 1.0, 'b': 2.0,}").unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_parse_rejects_unquoted_keys() {
        assert!(parse_metrics_map("{nsdr_drums: 1.5}").is_err());
    }

    #[test]
    fn test_parse_rejects_nested_structures() {
        assert!(parse_metrics_map("{'a': {'b': 1.0}}").is_err());
        assert!(parse_metrics_map("{'a': [1.0]}").is_err());
    }

    #[test]
    fn test_parse_rejects_trailing_text() {
        assert!(parse_metrics_map("{'a': 1.0} extra").is_err());
    }

    #[test]
    fn test_parse_reports_offset() {
        let err = parse_metrics_map("{'a': nope}").unwrap_err();
        match err {
            crate::Error::MetricsSyntax { offset, .. } => assert_eq!(offset, 6),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_test_file_roundtrip() {
        let path = std::env::temp_dir().join("stemscope_testlog_ok.out");
        std::fs::write(&path, "\x1B[1m{'nsdr_drums': 1.5, 'nsdr_med_drums': 1.2}\x1B[0m").unwrap();

        let map = parse_test_file(&path);
        assert_eq!(map["nsdr_drums"], 1.5);
        assert_eq!(map["nsdr_med_drums"], 1.2);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_parse_test_file_degrades_to_empty() {
        let path = std::env::temp_dir().join("stemscope_testlog_bad.out");
        std::fs::write(&path, "Traceback (most recent call last): ...").unwrap();
        assert!(parse_test_file(&path).is_empty());
        let _ = std::fs::remove_file(path);

        assert!(parse_test_file("/no/such/test.out").is_empty());
    }
}
