// src/telemetry/csv.rs

//! Minimal CSV line encoding for the tabular log.

use std::borrow::Cow;

/// Quote a cell if it contains a separator, quote or line break.
pub fn encode_cell(raw: &str) -> Cow<'_, str> {
    if raw.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Join cells into one line (without the trailing newline).
pub fn encode_line<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    cells
        .into_iter()
        .map(|cell| encode_cell(cell.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a single CSV line (as written by [`encode_line`]) into cells.
pub fn parse_line(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_cells_are_untouched() {
        assert_eq!(encode_line(["event", "42", ""]), "event,42,");
    }

    #[test]
    fn special_characters_are_quoted() {
        assert_eq!(encode_cell("a,b"), "\"a,b\"");
        assert_eq!(encode_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(encode_cell("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn header_line_with_quoted_names_parses() {
        assert_eq!(
            parse_line("event,\"odd,name\",timestamp\n"),
            vec!["event", "odd,name", "timestamp"]
        );
        assert_eq!(parse_line("a,,b"), vec!["a", "", "b"]);
    }
}
