use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

/// Token written in place of every absent or empty cell.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Absent,
}

impl Cell {
    /// A cell counts as missing when it is absent or holds an empty string.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Absent => true,
            Cell::Text(text) => text.is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Reads `text` as a number only when the `f64` prints back exactly as
    /// written. Anything else, including integers past 2^53, stays text.
    pub fn numeric(text: String) -> Cell {
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() && value.to_string() == text => Cell::Number(value),
            _ => Cell::Text(text),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Absent => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("row has {found} cells but the table declares {expected} columns")]
    TooManyCells { expected: usize, found: usize },
}

/// Ordered columns plus ordered rows. Every row holds exactly one cell per
/// column, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Duplicate names get a `.N` suffix and blank names become
    /// `Unnamed: <index>` so column names stay unique.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for (index, name) in columns.into_iter().enumerate() {
            let mut name: String = name.into();
            if name.is_empty() {
                name = format!("Unnamed: {index}");
            }
            if unique.contains(&name) {
                let base = name;
                let mut suffix = 1;
                name = format!("{base}.{suffix}");
                while unique.contains(&name) {
                    suffix += 1;
                    name = format!("{base}.{suffix}");
                }
            }
            unique.push(name);
        }

        Self {
            columns: unique,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|cells| &cells[index])
    }

    /// Appends a row, padding it with absent cells when it is short.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) -> Result<(), TableError> {
        if cells.len() > self.columns.len() {
            return Err(TableError::TooManyCells {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        cells.resize(self.columns.len(), Cell::Absent);
        self.rows.push(cells);
        Ok(())
    }

    /// Drops every column named in `exclude`. Names the table does not have
    /// are ignored.
    pub fn prune<S: AsRef<str>>(&mut self, exclude: &[S]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|column| !exclude.iter().any(|name| name.as_ref() == column))
            .collect();
        if keep.iter().all(|&kept| kept) {
            return;
        }

        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Replaces every missing cell with `placeholder`.
    pub fn fill_missing(&mut self, placeholder: &str) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_missing() {
                *cell = Cell::Text(placeholder.to_string());
            }
        }
    }

    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write_record(&mut writer, self.columns.iter().map(String::as_str))?;
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(Cell::to_string).collect();
            write_record(&mut writer, fields.iter().map(String::as_str))?;
        }
        writer.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(io::BufWriter::new(file))
    }
}

fn write_record<'a, W: Write>(
    writer: &mut W,
    fields: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    for (index, field) in fields.enumerate() {
        if index > 0 {
            writer.write_all(b",")?;
        }
        if field.contains([',', '"', '\n', '\r']) {
            write!(writer, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            writer.write_all(field.as_bytes())?;
        }
    }
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        let mut table = Table::new(["_id", "title", "kecamatan", "kelurahan"]);
        table
            .push_row(vec![
                Cell::Number(1.0),
                "Warung Kopi".into(),
                "Gondokusuman".into(),
                "".into(),
            ])
            .unwrap();
        table
    }

    #[test]
    fn duplicate_and_blank_names_are_made_unique() {
        let table = Table::new(["a", "", "a", "a", "a.1"]);
        assert_eq!(
            table.columns(),
            ["a", "Unnamed: 1", "a.1", "a.2", "a.1.1"]
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let mut table = Table::new(["a", "b", "c"]);
        table.push_row(vec!["x".into()]).unwrap();
        assert_eq!(table.rows()[0], vec!["x".into(), Cell::Absent, Cell::Absent]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let mut table = Table::new(["a"]);
        let err = table.push_row(vec!["x".into(), "y".into()]).unwrap_err();
        assert_eq!(err, TableError::TooManyCells { expected: 1, found: 2 });
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn prune_keeps_order_and_ignores_unknown_names() {
        let mut table = sample();
        table.prune(&["_id", "description", "iconsrc"]);
        assert_eq!(table.columns(), ["title", "kecamatan", "kelurahan"]);
        assert_eq!(table.get(0, "title"), Some(&Cell::from("Warung Kopi")));
        assert_eq!(table.get(0, "_id"), None);
    }

    #[test]
    fn fill_missing_replaces_absent_and_empty() {
        let mut table = sample();
        table.push_row(vec![Cell::Number(2.0)]).unwrap();
        table.fill_missing(PLACEHOLDER);
        assert_eq!(table.get(0, "kelurahan"), Some(&Cell::from("-")));
        assert_eq!(table.get(1, "title"), Some(&Cell::from("-")));
        assert_eq!(table.get(1, "_id"), Some(&Cell::Number(2.0)));
    }

    #[test]
    fn numbers_display_like_the_source() {
        assert_eq!(Cell::Number(3.0).to_string(), "3");
        assert_eq!(Cell::Number(110.36).to_string(), "110.36");
        assert_eq!(Cell::Number(-7.801).to_string(), "-7.801");
    }

    #[test]
    fn numeric_keeps_text_that_f64_would_change() {
        assert_eq!(Cell::numeric("3471010".into()), Cell::Number(3471010.0));
        assert_eq!(Cell::numeric("-7.7829".into()), Cell::Number(-7.7829));
        for text in ["12345678901234567890", "3.0", "007", "1e3", "inf"] {
            assert_eq!(Cell::numeric(text.into()), Cell::from(text));
        }
    }

    #[test]
    fn csv_output_quotes_when_needed() {
        let mut table = Table::new(["title", "note"]);
        table
            .push_row(vec!["Kopi, Teh".into(), "say \"hi\"".into()])
            .unwrap();
        table.push_row(vec![Cell::Number(4.5), Cell::Absent]).unwrap();

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "title,note\n\"Kopi, Teh\",\"say \"\"hi\"\"\"\n4.5,\n"
        );
    }
}
