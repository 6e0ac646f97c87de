use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::domain::CsviError;

/// One record of the table, positionally aligned with the header list.
pub type Row = Vec<String>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

/// A rendered export, ready to be written by the shell.
pub struct Export {
    pub content: String,
    pub filename: String,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub column: String,
    pub value: String,
}

/// Split one physical line into its fields.
///
/// Scans left to right with a quote flag: `""` inside quotes emits a literal
/// quote, a bare `"` toggles the flag, an unquoted comma closes the current
/// field. Each finished field is trimmed as a whole, so leading and trailing
/// whitespace goes away even when it was quoted; only whitespace between
/// other characters survives. An unterminated quote at line end is accepted
/// as-is, so this never fails.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse a whole file into (headers, dataset).
///
/// Lines are split on `\n` before tokenization, so quoted fields can not
/// carry embedded line breaks. Blank lines are skipped. Rows whose field
/// count differs from the header count are dropped without notice.
pub fn parse(text: &str) -> Result<(Vec<String>, Vec<Row>), CsviError> {
    let mut lines = text.split('\n').filter(|l| !l.trim().is_empty());

    let headers = tokenize(lines.next().ok_or(CsviError::EmptyInput)?);

    let mut dropped = 0usize;
    let dataset: Vec<Row> = lines
        .map(tokenize)
        .filter(|row| {
            let keep = row.len() == headers.len();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .collect();

    if dropped > 0 {
        debug!("Dropped {dropped} rows with mismatching field count");
    }
    Ok((headers, dataset))
}

/// Parse the leading numeric prefix of a value as a float.
///
/// Accepts an optional sign, digits around a single decimal point and an
/// optional exponent, ignoring any trailing garbage, so `"42abc"` is 42.
/// Sorting and statistics share this to decide what counts as a number.
pub fn parse_numeric_prefix(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let b = t.as_bytes();
    let mut end = 0;

    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > int_start;
    if end < b.len() && b[end] == b'.' {
        end += 1;
        let frac_start = end;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
        }
        has_digits |= end > frac_start;
    }
    if !has_digits {
        return None;
    }
    // Only take an exponent when it carries digits of its own
    let mantissa_end = end;
    if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut e = end + 1;
        if e < b.len() && (b[e] == b'+' || b[e] == b'-') {
            e += 1;
        }
        let digit_start = e;
        while e < b.len() && b[e].is_ascii_digit() {
            e += 1;
        }
        end = if e > digit_start { e } else { mantissa_end };
    }

    t[..end].parse().ok()
}

// Numeric when both sides have a numeric prefix, lexicographic otherwise.
// On truly mixed columns this is not a total order; that quirk is kept.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_numeric_prefix(a), parse_numeric_prefix(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Quote a field iff it contains a comma, a quote or a line feed.
pub fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn to_csv(headers: &[String], rows: &[Row]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_csv(h))
            .collect::<Vec<String>>()
            .join(","),
    );
    for row in rows {
        lines.push(
            row.iter()
                .map(|v| escape_csv(v))
                .collect::<Vec<String>>()
                .join(","),
        );
    }
    lines.join("\n")
}

pub fn to_json(headers: &[String], rows: &[Row]) -> Result<String, CsviError> {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            for (header, value) in headers.iter().zip(row.iter()) {
                record.insert(header.clone(), Value::String(value.clone()));
            }
            Value::Object(record)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// The single source of truth for the loaded table.
///
/// Owns the full dataset, the currently displayed view and the sort/filter
/// state. All mutation goes through `load`, `filter`, `clear_filter` and
/// `sort`; `export_as` and the stats module only read the view.
#[derive(Debug, Default)]
pub struct TableStore {
    headers: Vec<String>,
    dataset: Vec<Row>,
    view: Vec<Row>,
    sort_column: Option<usize>,
    sort_direction: SortDirection,
    filter: Option<FilterSelection>,
}

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table with the parse result of `text`.
    ///
    /// On failure the previous state is left untouched. Sort state
    /// deliberately survives a reload; the next sort click overwrites it.
    pub fn load(&mut self, text: &str) -> Result<(), CsviError> {
        let (headers, dataset) = parse(text)?;
        debug!(
            "Loaded table with {} columns and {} rows",
            headers.len(),
            dataset.len()
        );
        self.headers = headers;
        self.view = dataset.clone();
        self.dataset = dataset;
        Ok(())
    }

    /// Derive the view from the full dataset by a case-insensitive substring
    /// match on one column. Never stacks onto a previous filter.
    pub fn filter(&mut self, column: &str, needle: &str) -> Result<(), CsviError> {
        if column.is_empty() || needle.is_empty() {
            return Err(CsviError::InvalidFilter);
        }
        let idx = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or(CsviError::InvalidFilter)?;

        let needle_lower = needle.to_lowercase();
        self.view = self
            .dataset
            .iter()
            .filter(|row| row[idx].to_lowercase().contains(&needle_lower))
            .cloned()
            .collect();
        self.filter = Some(FilterSelection {
            column: column.to_string(),
            value: needle.to_string(),
        });
        trace!(
            "Filter {column}~\"{needle}\" kept {}/{} rows",
            self.view.len(),
            self.dataset.len()
        );
        Ok(())
    }

    /// Reset the view to the full dataset and forget the filter selection.
    pub fn clear_filter(&mut self) {
        self.view = self.dataset.clone();
        self.filter = None;
    }

    /// Reorder the current view by `column`. Selecting the sorted column
    /// again flips the direction, any other column starts ascending.
    pub fn sort(&mut self, column: usize) {
        if column >= self.headers.len() {
            debug!("Ignoring sort on unknown column index {column}");
            return;
        }
        if self.sort_column == Some(column) {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_column = Some(column);
            self.sort_direction = SortDirection::Ascending;
        }

        let direction = self.sort_direction;
        // sort_by is stable, keeping ties deterministic
        self.view.sort_by(|a, b| {
            let ordering = compare_values(&a[column], &b[column]);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        trace!("Sorted view by column {column} {direction:?}");
    }

    /// Render the current view for download; empty views are refused.
    pub fn export_as(&self, format: ExportFormat) -> Result<Export, CsviError> {
        if self.view.is_empty() {
            return Err(CsviError::NothingToExport);
        }
        let content = match format {
            ExportFormat::Csv => to_csv(&self.headers, &self.view),
            ExportFormat::Json => to_json(&self.headers, &self.view)?,
        };
        Ok(Export {
            content,
            filename: format!("export.{}", format.extension()),
            mime_type: format.mime_type(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn view(&self) -> &[Row] {
        &self.view
    }

    pub fn dataset_len(&self) -> usize {
        self.dataset.len()
    }

    pub fn sort_state(&self) -> (Option<usize>, SortDirection) {
        (self.sort_column, self.sort_direction)
    }

    pub fn filter_selection(&self) -> Option<&FilterSelection> {
        self.filter.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
