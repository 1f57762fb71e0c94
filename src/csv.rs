use std::ops::Range;
use std::path::{Path, PathBuf};

use logos::Logos;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::debug;

use crate::table::{Cell, Table, TableError};

/// Field values the loader reads as missing, on top of the empty field.
const MISSING_MARKERS: [&str; 8] = ["NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>"];

#[derive(Logos, Debug, PartialEq, Clone, Copy)]
enum Token {
    #[token(",")]
    Comma,
    #[regex(r"\r\n|\n|\r")]
    Newline,
    #[regex(r#""([^"]|"")*""#)]
    Quoted,
    /// A quote only opens a quoted field at the start of the field.
    #[regex(r#"[^",\r\n][^,\r\n]*"#)]
    Bare,
}

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("could not read `{}`", path.display())]
    #[diagnostic(code(jogja_report::csv::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{name}` has no header line")]
    #[diagnostic(
        code(jogja_report::csv::no_header),
        help("the first line of the file must list the column names")
    )]
    NoHeader { name: String },

    #[error("malformed field")]
    #[diagnostic(
        code(jogja_report::csv::malformed),
        help("quote fields containing commas or quotes, and double any inner quote")
    )]
    Malformed {
        #[source_code]
        src: NamedSource<String>,
        #[label("cannot read this field")]
        span: SourceSpan,
    },

    #[error("row {line} has {found} fields but the header declares {expected}")]
    #[diagnostic(code(jogja_report::csv::too_many_fields))]
    TooManyFields {
        #[source_code]
        src: NamedSource<String>,
        #[label("this row")]
        span: SourceSpan,
        line: usize,
        expected: usize,
        found: usize,
    },
}

enum Field {
    Bare(Range<usize>),
    Quoted(Range<usize>),
}

struct Record {
    fields: Vec<Option<Field>>,
    span: Range<usize>,
    line: usize,
}

/// Reads a comma-separated file into a [`Table`].
pub fn load(path: impl AsRef<Path>) -> Result<Table, LoadError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&path.display().to_string(), &input)
}

/// Parses comma-separated text. The first record names the columns.
pub fn parse(name: &str, input: &str) -> Result<Table, LoadError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let malformed = |span: Range<usize>| LoadError::Malformed {
        src: NamedSource::new(name, input.to_string()),
        span: span.into(),
    };

    let mut records = Vec::new();
    let mut fields: Vec<Option<Field>> = Vec::new();
    let mut current: Option<Field> = None;
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;

    let mut lexer = Token::lexer(input);
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        match token {
            Err(()) => return Err(malformed(span)),
            Ok(Token::Bare) | Ok(Token::Quoted) if current.is_some() => {
                return Err(malformed(span))
            }
            Ok(Token::Bare) => current = Some(Field::Bare(span)),
            Ok(Token::Quoted) => {
                line += lexer.slice().matches('\n').count();
                current = Some(Field::Quoted(span));
            }
            Ok(Token::Comma) => fields.push(current.take()),
            Ok(Token::Newline) => {
                if !fields.is_empty() || current.is_some() {
                    fields.push(current.take());
                    records.push(Record {
                        fields: std::mem::take(&mut fields),
                        span: start..span.start,
                        line: record_line,
                    });
                }
                line += 1;
                record_line = line;
                start = span.end;
            }
        }
    }
    if !fields.is_empty() || current.is_some() {
        fields.push(current.take());
        records.push(Record {
            fields,
            span: start..input.len(),
            line: record_line,
        });
    }

    let mut records = records.into_iter();
    let header = records.next().ok_or_else(|| LoadError::NoHeader {
        name: name.to_string(),
    })?;
    let mut table = Table::new(
        header
            .fields
            .iter()
            .map(|field| field_text(input, field.as_ref()).unwrap_or_default()),
    );

    for record in records {
        let cells = record
            .fields
            .iter()
            .map(|field| classify(field_text(input, field.as_ref())))
            .collect();
        table.push_row(cells).map_err(|err| match err {
            TableError::TooManyCells { expected, found } => LoadError::TooManyFields {
                src: NamedSource::new(name, input.to_string()),
                span: record.span.clone().into(),
                line: record.line,
                expected,
                found,
            },
        })?;
    }

    debug!(
        source = name,
        columns = table.columns().len(),
        rows = table.row_count(),
        "loaded table"
    );
    Ok(table)
}

fn field_text(input: &str, field: Option<&Field>) -> Option<String> {
    match field? {
        Field::Bare(span) => Some(input[span.clone()].to_string()),
        Field::Quoted(span) => {
            let inner = &input[span.start + 1..span.end - 1];
            Some(inner.replace("\"\"", "\""))
        }
    }
}

fn classify(text: Option<String>) -> Cell {
    let Some(text) = text else {
        return Cell::Absent;
    };
    if text.is_empty() || MISSING_MARKERS.contains(&text.as_str()) {
        return Cell::Absent;
    }
    Cell::numeric(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_simple_table() {
        let table = parse(
            "hotspot_data.csv",
            "_id,title,kecamatan,kelurahan\n1,Warung Kopi,Gondokusuman,\n",
        )
        .unwrap();
        assert_eq!(table.columns(), ["_id", "title", "kecamatan", "kelurahan"]);
        assert_eq!(
            table.rows(),
            [vec![
                Cell::Number(1.0),
                Cell::from("Warung Kopi"),
                Cell::from("Gondokusuman"),
                Cell::Absent,
            ]]
        );
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let table = parse(
            "x",
            "title,note\r\n\"Kopi, Teh\",\"she said \"\"hi\"\"\"\n\"two\nlines\",\"\"\n",
        )
        .unwrap();
        assert_eq!(table.get(0, "title"), Some(&Cell::from("Kopi, Teh")));
        assert_eq!(table.get(0, "note"), Some(&Cell::from("she said \"hi\"")));
        assert_eq!(table.get(1, "title"), Some(&Cell::from("two\nlines")));
        assert_eq!(table.get(1, "note"), Some(&Cell::Absent));
    }

    #[test]
    fn unicode_and_bom_are_handled() {
        let table = parse("x", "\u{feff}nama,kota\nKraton Ngayogyakarta Hadiningrat,Yogyakartä\n")
            .unwrap();
        assert_eq!(table.columns(), ["nama", "kota"]);
        assert_eq!(table.get(0, "kota"), Some(&Cell::from("Yogyakartä")));
    }

    #[test]
    fn blank_lines_and_missing_trailing_newline() {
        let table = parse("x", "a,b\n\n1,2\n\n3,4").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, "b"), Some(&Cell::Number(4.0)));
    }

    #[test]
    fn missing_markers_become_absent() {
        let table = parse("x", "a,b,c\nNaN,NA,null\n").unwrap();
        assert!(table.rows()[0].iter().all(|cell| *cell == Cell::Absent));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let table = parse("x", "a,b,c\n").unwrap();
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(parse("x", ""), Err(LoadError::NoHeader { .. })));
        assert!(matches!(parse("x", "\n\n"), Err(LoadError::NoHeader { .. })));
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        let err = parse("x", "a,b\n1,\"open\n").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn text_after_quoted_field_is_malformed() {
        let err = parse("x", "a\n\"x\"y\n").unwrap_err();
        let LoadError::Malformed { span, .. } = err else {
            panic!("expected a malformed field, got {err:?}");
        };
        assert_eq!(span.offset(), 5);
    }

    #[test]
    fn extra_fields_point_at_the_row() {
        let err = parse("x", "a,b\n1,2\n3,4,5\n").unwrap_err();
        let LoadError::TooManyFields {
            span,
            line,
            expected,
            found,
            ..
        } = err
        else {
            panic!("expected too many fields, got {err:?}");
        };
        assert_eq!((line, expected, found), (3, 2, 3));
        assert_eq!(span.offset(), 8);
        assert_eq!(span.len(), 5);
    }

    #[test]
    fn quote_inside_a_bare_field_is_literal() {
        let table = parse("x", "title,size\nTV 5\" screen,1\n").unwrap();
        assert_eq!(table.get(0, "title"), Some(&Cell::from("TV 5\" screen")));
        assert_eq!(table.get(0, "size"), Some(&Cell::Number(1.0)));
    }

    #[test]
    fn line_numbers_count_breaks_inside_quotes() {
        let err = parse("x", "a,b\n\"one\ntwo\",2\n3,4,5\n").unwrap_err();
        let LoadError::TooManyFields { line, .. } = err else {
            panic!("expected too many fields, got {err:?}");
        };
        assert_eq!(line, 4);
    }

    #[test]
    fn long_integers_keep_every_digit() {
        let table = parse("x", "title,nomor\nA,12345678901234567890\n").unwrap();
        assert_eq!(
            table.get(0, "nomor"),
            Some(&Cell::from("12345678901234567890"))
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
