pub mod lines;
pub mod record;

use tracing::debug;

pub use record::{parse_line, Record};

/// Parse every classified line; lines that do not carry a full record are dropped.
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Vec<Record> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.as_ref();
            let parsed = parse_line(line);
            if parsed.is_none() {
                debug!("Unmatched line: {}", line);
            }
            parsed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_body() {
        let body = std::fs::read_to_string("tests/fixtures/body.txt").unwrap();
        let lines = lines::classify_lines(&body);
        assert_eq!(lines.len(), 4);
        let records = parse_lines(&lines);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.tax_id.is_empty()));
        assert_eq!(records[2].identifier, "310");
    }
}
