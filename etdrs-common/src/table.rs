//! Aggregate tables keyed by subject identifier
//!
//! An [`AggregateTable`] maps canonical identifiers to records of named
//! cells plus the ordered set of columns it covers. Tables are written as
//! UTF-8 delimited text: identifier column first, missing cells empty.

use crate::identifier::SubjectId;
use crate::text::{split_rows, TextLoader};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// One table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    /// Parseable number; `text` is the spelling written back out
    Number { value: f64, text: String },
    /// Non-blank text that is not a number
    Text(String),
}

static MISSING: Cell = Cell::Missing;

impl Cell {
    /// Numeric cell rendered as decimal text
    pub fn number(value: f64) -> Self {
        Cell::Number {
            value,
            text: format_number(value),
        }
    }

    /// Classify raw table text. Blank is missing; no comma stripping here.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Cell::Number {
                value,
                text: trimmed.to_string(),
            },
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Text as written to disk; empty for missing
    pub fn text(&self) -> &str {
        match self {
            Cell::Missing => "",
            Cell::Number { text, .. } => text,
            Cell::Text(text) => text,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::number).unwrap_or(Cell::Missing)
    }
}

/// Decimal rendering; integral values keep one fractional digit (`0.0`)
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Insertion-ordered set of column names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name` unless already present; returns true when added
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.members.contains(&name) {
            return false;
        }
        self.members.insert(name.clone());
        self.order.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Own columns in order, then `other`'s unseen columns in their order
    pub fn union(&self, other: &ColumnSet) -> ColumnSet {
        let mut merged = self.clone();
        for name in other.iter() {
            merged.insert(name);
        }
        merged
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ColumnSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// Cells of one subject, by column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectRecord {
    cells: HashMap<String, Cell>,
}

impl SubjectRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell for `column`; absent columns read as missing
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, column: impl Into<String>, cell: Cell) {
        self.cells.insert(column.into(), cell);
    }

    /// Replace the cell with missing; returns the previous cell
    pub fn clear(&mut self, column: &str) -> Cell {
        self.cells.remove(column).unwrap_or(Cell::Missing)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of non-missing cells
    pub fn populated(&self) -> usize {
        self.cells.values().filter(|c| !c.is_missing()).count()
    }
}

/// Subject-keyed table with an ordered column set
///
/// Rows keep insertion order; [`AggregateTable::sort_by_id`] orders them by
/// identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    id_column: String,
    columns: ColumnSet,
    rows: Vec<(SubjectId, SubjectRecord)>,
    index: HashMap<SubjectId, usize>,
}

impl AggregateTable {
    /// Empty table; `columns` must not include the identifier column
    pub fn new(id_column: impl Into<String>, columns: ColumnSet) -> Self {
        Self {
            id_column: id_column.into(),
            columns,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Data columns, identifier column excluded
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &SubjectId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &SubjectId) -> Option<&SubjectRecord> {
        self.index.get(id).map(|&i| &self.rows[i].1)
    }

    pub fn get_mut(&mut self, id: &SubjectId) -> Option<&mut SubjectRecord> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.rows[i].1),
            None => None,
        }
    }

    /// Cell lookup; unknown subjects and columns read as missing
    pub fn cell(&self, id: &SubjectId, column: &str) -> &Cell {
        self.get(id).map(|r| r.get(column)).unwrap_or(&MISSING)
    }

    /// Insert or replace a subject's record, keeping its row position
    pub fn insert(&mut self, id: SubjectId, record: SubjectRecord) -> Option<SubjectRecord> {
        if let Some(&i) = self.index.get(&id) {
            return Some(std::mem::replace(&mut self.rows[i].1, record));
        }
        self.index.insert(id.clone(), self.rows.len());
        self.rows.push((id, record));
        None
    }

    /// Record for `id`, created empty on first use
    pub fn record_mut(&mut self, id: &SubjectId) -> &mut SubjectRecord {
        let i = match self.index.get(id) {
            Some(&i) => i,
            None => {
                self.index.insert(id.clone(), self.rows.len());
                self.rows.push((id.clone(), SubjectRecord::new()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[i].1
    }

    /// Add a data column (no-op when present)
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != self.id_column {
            self.columns.insert(name);
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.rows.iter().map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &SubjectRecord)> {
        self.rows.iter().map(|(id, rec)| (id, rec))
    }

    /// Order rows by ascending identifier
    pub fn sort_by_id(&mut self) {
        self.rows.sort_by(|a, b| a.0.cmp(&b.0));
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (id.clone(), i))
            .collect();
    }

    /// Build from a header row and data rows
    ///
    /// Header names are trimmed; blank and repeated names are ignored. Rows
    /// with a blank identifier are skipped. A repeated identifier replaces
    /// the earlier row.
    pub fn from_rows(
        header: &[String],
        data: &[Vec<String>],
        id_column: &str,
    ) -> Result<Self> {
        Self::from_rows_with(header, data, id_column, replace_duplicate)
    }

    /// Like [`AggregateTable::from_rows`], but a repeated identifier's row is
    /// folded into the earlier record by `on_duplicate`
    pub fn from_rows_with<F>(
        header: &[String],
        data: &[Vec<String>],
        id_column: &str,
        mut on_duplicate: F,
    ) -> Result<Self>
    where
        F: FnMut(&SubjectId, &mut SubjectRecord, SubjectRecord),
    {
        let names: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
        let id_idx = names.iter().position(|h| h == id_column).ok_or_else(|| {
            Error::InvalidInput(format!("Table has no {:?} column", id_column))
        })?;

        let mut columns = ColumnSet::new();
        let mut positions = Vec::new();
        for (i, name) in names.iter().enumerate() {
            if i == id_idx || name.is_empty() {
                continue;
            }
            if columns.insert(name.clone()) {
                positions.push((i, name.clone()));
            }
        }

        let mut table = AggregateTable::new(id_column, columns);
        for row in data {
            let key = row.get(id_idx).map(|c| c.trim()).unwrap_or("");
            if key.is_empty() {
                continue;
            }
            let mut record = SubjectRecord::new();
            for (i, name) in &positions {
                let cell = Cell::parse(row.get(*i).map(String::as_str).unwrap_or(""));
                if !cell.is_missing() {
                    record.set(name.clone(), cell);
                }
            }
            let id = SubjectId::from_key(key);
            match table.get_mut(&id) {
                Some(existing) => on_duplicate(&id, existing, record),
                None => {
                    table.insert(id, record);
                }
            }
        }
        Ok(table)
    }

    /// Read a delimited table, trying the loader's encodings
    pub fn read_csv(path: &Path, loader: &TextLoader, id_column: &str) -> Result<Self> {
        Self::read_csv_with(path, loader, id_column, replace_duplicate)
    }

    /// Read a delimited table, folding repeated identifiers with `on_duplicate`
    pub fn read_csv_with<F>(
        path: &Path,
        loader: &TextLoader,
        id_column: &str,
        on_duplicate: F,
    ) -> Result<Self>
    where
        F: FnMut(&SubjectId, &mut SubjectRecord, SubjectRecord),
    {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let decoded = loader.read(path)?;
        let rows = split_rows(&decoded.text);
        let Some((header, data)) = rows.split_first() else {
            return Ok(AggregateTable::new(id_column, ColumnSet::new()));
        };
        let table = Self::from_rows_with(header, data, id_column, on_duplicate)?;
        debug!(
            "Read {} subject(s) x {} column(s) from {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        Ok(table)
    }

    /// Write as UTF-8 delimited text
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    /// Write header and rows to any writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let mut header = vec![self.id_column.as_str()];
        header.extend(self.columns.iter());
        out.write_record(&header)?;

        for (id, record) in &self.rows {
            let mut line = vec![id.as_str()];
            line.extend(self.columns.iter().map(|c| record.get(c).text()));
            out.write_record(&line)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Default duplicate rule: the later row replaces the earlier one
pub fn replace_duplicate(id: &SubjectId, existing: &mut SubjectRecord, incoming: SubjectRecord) {
    warn!("Duplicate identifier {}: later row replaces earlier", id);
    *existing = incoming;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse("  "), Cell::Missing);
        assert_eq!(Cell::parse(" 0.00 ").as_number(), Some(0.0));
        assert_eq!(Cell::parse(" 0.00 ").text(), "0.00");
        assert_eq!(Cell::parse("１"), Cell::Text("１".to_string()));
        assert_eq!(Cell::parse("n/a"), Cell::Text("n/a".to_string()));
    }

    #[test]
    fn test_zero_is_present() {
        let zero = Cell::number(0.0);
        assert!(!zero.is_missing());
        assert_eq!(zero.text(), "0.0");
        assert_eq!(Cell::from(Some(0.0)).as_number(), Some(0.0));
        assert!(Cell::from(None).is_missing());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.52), "10.52");
        assert_eq!(format_number(3.0), "3.0");
        assert_eq!(format_number(-0.5), "-0.5");
    }

    #[test]
    fn test_column_set_union_keeps_order() {
        let a: ColumnSet = ["R_Center", "L_Center"].into_iter().collect();
        let b: ColumnSet = ["Extra", "R_Center", "Note"].into_iter().collect();
        let u = a.union(&b);
        assert_eq!(u.as_slice(), &strings(&["R_Center", "L_Center", "Extra", "Note"])[..]);
    }

    #[test]
    fn test_from_rows_skips_blank_ids_and_columns() {
        let header = strings(&[" ID ", "R_Center", "", "L_Center", "R_Center"]);
        let data = vec![
            strings(&["EG0001", "1.5", "junk", "", "9"]),
            strings(&["", "2.0"]),
            strings(&["EG0002", "x"]),
        ];
        let table = AggregateTable::from_rows(&header, &data, "ID").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().as_slice(), &strings(&["R_Center", "L_Center"])[..]);
        let one = SubjectId::from_key("EG0001");
        assert_eq!(table.cell(&one, "R_Center").as_number(), Some(1.5));
        assert!(table.cell(&one, "L_Center").is_missing());
        let two = SubjectId::from_key("EG0002");
        assert_eq!(table.cell(&two, "R_Center"), &Cell::Text("x".to_string()));
    }

    #[test]
    fn test_from_rows_requires_id_column() {
        let header = strings(&["SAMPLE", "R_Center"]);
        assert!(AggregateTable::from_rows(&header, &[], "ID").is_err());
    }

    #[test]
    fn test_duplicate_id_replaces_in_place() {
        let header = strings(&["ID", "R_Center"]);
        let data = vec![
            strings(&["EG0002", "1"]),
            strings(&["EG0001", "2"]),
            strings(&["EG0002", "3"]),
        ];
        let table = AggregateTable::from_rows(&header, &data, "ID").unwrap();
        let ids: Vec<&str> = table.ids().map(SubjectId::as_str).collect();
        assert_eq!(ids, vec!["EG0002", "EG0001"]);
        assert_eq!(
            table.cell(&SubjectId::from_key("EG0002"), "R_Center").as_number(),
            Some(3.0)
        );
    }

    #[test]
    fn test_duplicate_rows_folded_by_callback() {
        let header = strings(&["ID", "L_Center", "R_Center"]);
        let data = vec![
            strings(&["EG0002", "1", ""]),
            strings(&["EG0002", "", "1"]),
        ];
        let mut folded = Vec::new();
        let table = AggregateTable::from_rows_with(&header, &data, "ID", |id, existing, incoming| {
            folded.push(id.clone());
            for (column, cell) in incoming.iter() {
                existing.set(column, cell.clone());
            }
        })
        .unwrap();

        let subject = SubjectId::from_key("EG0002");
        assert_eq!(folded, vec![subject.clone()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(&subject, "L_Center").text(), "1");
        assert_eq!(table.cell(&subject, "R_Center").text(), "1");
    }

    #[test]
    fn test_write_renders_missing_as_empty() {
        let mut table = AggregateTable::new(
            "ID",
            ["R_Center", "L_Center"].into_iter().collect(),
        );
        table
            .record_mut(&SubjectId::from_key("EG0001"))
            .set("L_Center", Cell::number(0.0));

        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["ID,R_Center,L_Center", "EG0001,,0.0"]);
    }

    #[test]
    fn test_sort_by_id() {
        let mut table = AggregateTable::new("ID", ColumnSet::new());
        for key in ["EG0003", "EG0001", "EG0002"] {
            table.record_mut(&SubjectId::from_key(key));
        }
        table.sort_by_id();
        let ids: Vec<&str> = table.ids().map(SubjectId::as_str).collect();
        assert_eq!(ids, vec!["EG0001", "EG0002", "EG0003"]);
        assert!(table.contains(&SubjectId::from_key("EG0003")));
        assert!(table.get(&SubjectId::from_key("EG0002")).is_some());
    }
}
