/// Token every candidate record line starts with.
pub const MARKER: &str = "CF";

/// True iff the trimmed line starts with the literal marker (case-sensitive).
pub fn is_record_line(line: &str) -> bool {
    line.trim().starts_with(MARKER)
}

/// Split free text (message body, PDF page) into trimmed candidate lines.
pub fn classify_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| is_record_line(l))
        .map(str::to_string)
        .collect()
}

/// Join the present, non-empty cells of a table row with single spaces.
/// Absent cells leave no placeholder, so column positions are not kept.
pub fn flatten_row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for cell in cells.into_iter().flatten() {
        let cell = cell.as_ref();
        if cell.is_empty() {
            continue;
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(cell);
    }
    line
}

/// Flatten every row and keep the ones that classify as record lines.
pub fn classify_rows<R, I, S>(rows: R) -> Vec<String>
where
    R: IntoIterator<Item = I>,
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    rows.into_iter()
        .map(flatten_row)
        .filter(|l| is_record_line(l))
        .map(|l| l.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_after_trim() {
        assert!(is_record_line("CF 123"));
        assert!(is_record_line("   CF123 \t"));
        assert!(is_record_line("CF"));
    }

    #[test]
    fn marker_is_exact() {
        for line in ["cf 123", "Cf 1", "C F 1", "xCF 1", "", "   ", "Cota CF 1", "F 1"] {
            assert!(!is_record_line(line), "{:?} should not classify", line);
        }
    }

    #[test]
    fn body_lines() {
        let body = "Bom dia,\r\n\r\n  CF 1 10/05/2024 1.5 12.345.678/0001-99\r\nsegue cotas\nCF 2\n";
        let lines = classify_lines(body);
        assert_eq!(
            lines,
            vec!["CF 1 10/05/2024 1.5 12.345.678/0001-99".to_string(), "CF 2".to_string()]
        );
    }

    #[test]
    fn empty_text() {
        assert!(classify_lines("").is_empty());
    }

    #[test]
    fn flatten_skips_absent_and_empty() {
        let row = vec![Some("CF 9"), None, Some(""), Some("31/01/2024"), None, Some("200.00")];
        assert_eq!(flatten_row(row), "CF 9 31/01/2024 200.00");
    }

    #[test]
    fn flatten_keeps_order() {
        let row = vec![Some("b".to_string()), Some("a".to_string())];
        assert_eq!(flatten_row(row), "b a");
    }

    #[test]
    fn flatten_all_absent() {
        let row: Vec<Option<&str>> = vec![None, None];
        assert_eq!(flatten_row(row), "");
    }

    #[test]
    fn rows_filtered_by_marker() {
        let rows = vec![
            vec![Some("Fundo"), Some("Data"), Some("Cota")],
            vec![None, Some("CF 7"), Some("01/02/2024")],
            vec![Some("Total"), None, None],
        ];
        assert_eq!(classify_rows(rows), vec!["CF 7 01/02/2024".to_string()]);
    }
}
