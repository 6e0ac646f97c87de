use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::trace;

use crate::table::{TableStore, parse_numeric_prefix};

/// Descriptive statistics for one column, as (label, display value) pairs in
/// presentation order.
pub struct ColumnStats {
    pub name: String,
    pub entries: Vec<(&'static str, String)>,
}

/// Compute the statistics record for one column of the current view.
///
/// Count, Unique and Empty are always present. The numeric block (Numeric
/// Count, Min, Max, Average, Sum) appears once at least one value has a
/// numeric prefix; Most Common appears whenever there are values at all.
pub fn column_stats(name: &str, values: &[&str]) -> ColumnStats {
    let mut entries: Vec<(&'static str, String)> = Vec::new();

    entries.push(("Count", values.len().to_string()));

    let unique: HashSet<&str> = values.iter().copied().collect();
    entries.push(("Unique", unique.len().to_string()));

    let empty = values.iter().filter(|v| v.trim().is_empty()).count();
    entries.push(("Empty", empty.to_string()));

    let numeric: Vec<f64> = values.iter().filter_map(|v| parse_numeric_prefix(v)).collect();
    if !numeric.is_empty() {
        let sum: f64 = numeric.iter().sum();
        let min = numeric.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numeric.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        entries.push(("Numeric Count", numeric.len().to_string()));
        entries.push(("Min", format!("{min:.2}")));
        entries.push(("Max", format!("{max:.2}")));
        entries.push(("Average", format!("{:.2}", sum / numeric.len() as f64)));
        entries.push(("Sum", format!("{sum:.2}")));
    }

    if let Some((value, count)) = most_common(values) {
        entries.push(("Most Common", format!("{value} ({count}x)")));
    }

    ColumnStats {
        name: name.to_string(),
        entries,
    }
}

// Highest frequency by exact string match; a strictly-greater scan in view
// order breaks ties towards the first-encountered value.
fn most_common<'a>(values: &[&'a str]) -> Option<(&'a str, usize)> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for &value in values {
        *frequency.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for &value in values {
        let count = frequency[value];
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best
}

/// Statistics for every column over the current view, computed fresh on each
/// request. Columns are independent, so they are scanned in parallel.
pub fn view_stats(store: &TableStore) -> Vec<ColumnStats> {
    let start_time = Instant::now();
    let view = store.view();

    let stats: Vec<ColumnStats> = store
        .headers()
        .par_iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<&str> = view.iter().map(|row| row[idx].as_str()).collect();
            column_stats(name, &values)
        })
        .collect();

    trace!(
        "Computed stats for {} columns over {} rows in {}ms",
        stats.len(),
        view.len(),
        start_time.elapsed().as_millis()
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(stats: &'a ColumnStats, label: &str) -> Option<&'a str> {
        stats
            .entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn mixed_numeric_column() {
        let stats = column_stats("age", &["10", "20", "abc", "20"]);
        assert_eq!(lookup(&stats, "Count"), Some("4"));
        assert_eq!(lookup(&stats, "Unique"), Some("3"));
        assert_eq!(lookup(&stats, "Empty"), Some("0"));
        assert_eq!(lookup(&stats, "Numeric Count"), Some("3"));
        assert_eq!(lookup(&stats, "Min"), Some("10.00"));
        assert_eq!(lookup(&stats, "Max"), Some("20.00"));
        assert_eq!(lookup(&stats, "Average"), Some("16.67"));
        assert_eq!(lookup(&stats, "Sum"), Some("50.00"));
        assert_eq!(lookup(&stats, "Most Common"), Some("20 (2x)"));
    }

    #[test]
    fn no_numeric_block_for_text_columns() {
        let stats = column_stats("name", &["alice", "bob"]);
        assert_eq!(lookup(&stats, "Numeric Count"), None);
        assert_eq!(lookup(&stats, "Min"), None);
        assert_eq!(lookup(&stats, "Sum"), None);
    }

    #[test]
    fn numeric_prefix_values_count_as_numbers() {
        let stats = column_stats("v", &["42abc", "1"]);
        assert_eq!(lookup(&stats, "Numeric Count"), Some("2"));
        assert_eq!(lookup(&stats, "Max"), Some("42.00"));
    }

    #[test]
    fn empty_counts_whitespace_only_values() {
        let stats = column_stats("v", &["", "  ", "x"]);
        assert_eq!(lookup(&stats, "Empty"), Some("2"));
        // unique counts raw strings, so "" and "  " are distinct
        assert_eq!(lookup(&stats, "Unique"), Some("3"));
    }

    #[test]
    fn most_common_ties_break_towards_first_seen() {
        let stats = column_stats("v", &["b", "a", "b", "a"]);
        assert_eq!(lookup(&stats, "Most Common"), Some("b (2x)"));
    }

    #[test]
    fn empty_view_has_no_most_common() {
        let stats = column_stats("v", &[]);
        assert_eq!(lookup(&stats, "Count"), Some("0"));
        assert_eq!(lookup(&stats, "Most Common"), None);
    }

    #[test]
    fn stats_follow_the_filtered_view() {
        let mut store = TableStore::new();
        store
            .load("name,age\nAlice,10\nBob,20\nCarol,30")
            .unwrap();
        store.filter("name", "o").unwrap();

        let stats = view_stats(&store);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].name, "age");
        assert_eq!(lookup(&stats[1], "Count"), Some("2"));
        assert_eq!(lookup(&stats[1], "Sum"), Some("50.00"));
    }
}
