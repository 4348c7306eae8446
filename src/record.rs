/// Canonical marker for a missing value. Every value in a normalized record
/// set that was empty, `0`, `NA` or `NaN` in the source data is replaced by
/// this sentinel so that set comparisons are well-defined.
pub const UNKNOWN: &str = "unknown";

/// Name of the identifier column used for matching across sources.
pub const DOI_COLUMN: &str = "DOI";

/// A tabular record set: an ordered list of rows over a named column list.
///
/// All values are plain strings; sources with typed fields stringify them
/// before building a `RecordSet`. Rows always have exactly one value per
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordSet {
    /// Create an empty record set with the given columns.
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a single-column record set from a list of values.
    pub fn single_column<S: Into<String>>(column: &str, values: Vec<S>) -> Self {
        Self {
            columns: vec![column.to_string()],
            rows: values.into_iter().map(|v| vec![v.into()]).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order. `None` if the column is absent.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// Append a row. The row must have one value per column.
    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Build a new record set with `other`'s rows appended after `self`'s,
    /// aligning columns by name: columns unique to `other` are added and
    /// back-filled with the sentinel, and `other`'s rows are reordered to
    /// `self`'s column order with sentinel fill for columns they lack.
    ///
    /// `self` is never modified; the consolidated set is always a fresh value.
    pub fn concat(&self, other: &RecordSet) -> RecordSet {
        let mut columns = self.columns.clone();
        for col in &other.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }

        let mut rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut new_row = row.clone();
                new_row.resize(columns.len(), UNKNOWN.to_string());
                new_row
            })
            .collect();

        for row in &other.rows {
            let new_row = columns
                .iter()
                .map(|col| match other.column_index(col) {
                    Some(idx) => row[idx].clone(),
                    None => UNKNOWN.to_string(),
                })
                .collect();
            rows.push(new_row);
        }

        RecordSet { columns, rows }
    }

    /// Replace every missing-equivalent value with the sentinel.
    ///
    /// Total over any well-formed record set, preserves row count and column
    /// set, and is idempotent: normalizing twice equals normalizing once.
    pub fn normalized(&self) -> RecordSet {
        RecordSet {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(|v| normalize_value(v)).collect())
                .collect(),
        }
    }
}

/// Map a raw value to its normalized form.
///
/// The legacy data carried two independent missing-value encodings, the
/// numeric fill value `0` and the literal string `NA` (plus `NaN` from float
/// columns); all of them collapse to the single sentinel here.
pub fn normalize_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "0"
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}
