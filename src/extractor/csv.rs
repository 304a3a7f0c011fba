//! CSV 로더
//!
//! 첫 행을 헤더로 보고, 데이터 행마다 문서 하나를 만듭니다.
//! 문서 텍스트는 열마다 `header: value` 한 줄입니다.

use crate::knowledge::Document;

/// 따옴표를 고려한 CSV 레코드 분리
///
/// - `"a, b"`: 구분자 포함 필드
/// - `""`: 따옴표 이스케이프
/// - 따옴표 안의 줄바꿈 허용
/// - 필드 중간의 따옴표는 문자 그대로 (`5" tall`)
pub fn parse_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    // 빈 줄 제거
    records.retain(|r| r.iter().any(|f| !f.trim().is_empty()));
    records
}

/// CSV 텍스트를 행 단위 문서로 변환 (row: 0부터)
pub fn csv_to_documents(source: &str, input: &str) -> Vec<Document> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut records = parse_records(input).into_iter();

    let header = match records.next() {
        Some(header) => header,
        None => return Vec::new(),
    };

    records
        .enumerate()
        .map(|(row, values)| {
            let width = header.len().max(values.len());
            let lines: Vec<String> = (0..width)
                .map(|col| {
                    let key = header
                        .get(col)
                        .map(|h| h.trim().to_string())
                        .unwrap_or_else(|| format!("column{}", col + 1));
                    let value = values.get(col).map(|v| v.trim()).unwrap_or_default();
                    format!("{}: {}", key, value)
                })
                .collect();

            Document::new(source, lines.join("\n")).with_row(row)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let records = parse_records("name,summary\r\nAlice,\"Rust, Python\"\nBob,\"said \"\"hi\"\"\"\n");
        assert_eq!(
            records,
            vec![
                vec!["name".to_string(), "summary".to_string()],
                vec!["Alice".to_string(), "Rust, Python".to_string()],
                vec!["Bob".to_string(), "said \"hi\"".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_newline_inside_quotes() {
        let records = parse_records("a,b\n1,\"line one\nline two\"");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][1], "line one\nline two");
    }

    #[test]
    fn test_csv_to_documents() {
        let input = "\u{feff}company, role ,years\nAcme,Engineer,3\n\nGlobex,Lead,\n";
        let docs = csv_to_documents("jobs.csv", input);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "company: Acme\nrole: Engineer\nyears: 3");
        assert_eq!(docs[0].metadata.row, Some(0));
        assert_eq!(docs[1].text, "company: Globex\nrole: Lead\nyears: ");
        assert_eq!(docs[1].metadata.row, Some(1));
        assert_eq!(docs[1].metadata.source, "jobs.csv");
    }

    #[test]
    fn test_mid_field_quote_is_literal() {
        let input = "name,note\nAlice,5\" tall\nBob,fine\nCarol,ok\n";
        let records = parse_records(input);
        assert_eq!(records.len(), 4);
        assert_eq!(records[1], vec!["Alice", "5\" tall"]);
        assert_eq!(records[2], vec!["Bob", "fine"]);

        let docs = csv_to_documents("people.csv", input);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].text, "name: Alice\nnote: 5\" tall");
        assert_eq!(docs[2].metadata.row, Some(2));
    }

    #[test]
    fn test_header_only() {
        assert!(csv_to_documents("x.csv", "a,b,c\n").is_empty());
        assert!(csv_to_documents("x.csv", "").is_empty());
    }
}
