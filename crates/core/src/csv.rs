//! Minimal RFC 4180 style CSV reader and writer.
//!
//! Fields are quoted only when they contain a comma, a double quote, or a
//! line break; embedded quotes are doubled. The reader accepts quoted
//! fields spanning several physical lines and both `\n` and `\r\n`
//! terminators, so anything [`write_record`] produces reads back unchanged.

/// Escape a value for CSV output.
pub fn escape_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join already-stringified values into one CSV line (no terminator).
pub fn write_record<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| escape_field(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Split CSV text into records of raw field values.
///
/// Blank lines are skipped. Records are returned as found; no column-count
/// check is made against the header.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut started = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                started = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                if started {
                    record.push(std::mem::take(&mut field));
                    push_unless_blank(&mut records, std::mem::take(&mut record));
                }
                started = false;
            }
            _ => {
                field.push(ch);
                started = true;
            }
        }
    }

    if started {
        record.push(field);
        push_unless_blank(&mut records, record);
    }

    records
}

fn push_unless_blank(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_values_are_not_quoted() {
        assert_eq!(escape_field("Chart1"), "Chart1");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn special_values_are_quoted() {
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"E\""), "\"say \"\"E\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn parses_simple_records_and_skips_blank_lines() {
        let records = parse_records("a,b,c\n\n1,2,3\r\n   \n4,,6\n");
        assert_eq!(
            records,
            vec![
                vec!["a", "b", "c"],
                vec!["1", "2", "3"],
                vec!["4", "", "6"],
            ]
        );
    }

    #[test]
    fn quoted_fields_may_span_lines() {
        let records = parse_records("h1,h2\n\"line one\nline two\",\"x, \"\"y\"\"\"\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "line one\nline two");
        assert_eq!(records[1][1], "x, \"y\"");
    }

    #[test]
    fn missing_trailing_newline_is_fine() {
        let records = parse_records("a,b\n1,2");
        assert_eq!(records[1], vec!["1", "2"]);
    }

    #[test]
    fn strips_byte_order_mark() {
        let records = parse_records("\u{feff}r_sph,pd\n0.0,64.0\n");
        assert_eq!(records[0][0], "r_sph");
    }

    #[test]
    fn written_records_read_back_unchanged() {
        let values = vec![
            "plain".to_string(),
            "comma, inside".to_string(),
            "quote \" inside".to_string(),
            "multi\nline".to_string(),
            String::new(),
            "  padded  ".to_string(),
        ];
        let text = format!(
            "{}\n{}",
            write_record(&["a", "b", "c", "d", "e", "f"]),
            write_record(&values)
        );
        let records = parse_records(&text);
        assert_eq!(records[1], values);
    }
}
