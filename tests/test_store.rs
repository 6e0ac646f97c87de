use std::fs;

use csvi::domain::CsviError;
use csvi::stats::view_stats;
use csvi::table::{ExportFormat, TableStore, tokenize};

fn load_fixture(name: &str) -> TableStore {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let text = fs::read_to_string(format!("{manifest_dir}/tests/fixtures/{name}"))
        .expect("Failed to read fixture");
    let mut store = TableStore::new();
    store.load(&text).expect("Failed to load fixture");
    store
}

#[test]
fn load_filter_sort_stats_export_end_to_end() {
    let mut store = load_fixture("testdata_01.csv");

    assert_eq!(store.headers(), ["name", "age", "city", "notes"]);
    // the two-field line is dropped, the blank line is skipped
    assert_eq!(store.dataset_len(), 6);
    // fields are trimmed at their boundaries
    assert_eq!(store.view()[5][0], "Frank");
    // quoted commas and doubled quotes survive parsing
    assert_eq!(store.view()[0][3], "likes \"quotes\", and commas");

    store.filter("city", "berlin").unwrap();
    let names: Vec<&str> = store.view().iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, ["Alice", "Eve"]);

    store.sort(1);
    let ages: Vec<&str> = store.view().iter().map(|r| r[1].as_str()).collect();
    assert_eq!(ages, ["28", "34"]);

    // statistics follow the filtered view
    let stats = view_stats(&store);
    assert_eq!(stats.len(), 4);
    let age = &stats[1];
    assert_eq!(age.name, "age");
    let lookup = |label: &str| {
        age.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(lookup("Count"), Some("2"));
    assert_eq!(lookup("Numeric Count"), Some("2"));
    assert_eq!(lookup("Sum"), Some("62.00"));

    // exported CSV contains only the sorted, filtered view
    let export = store.export_as(ExportFormat::Csv).unwrap();
    assert_eq!(
        export.content,
        "name,age,city,notes\nEve,28,Berlin,\nAlice,34,Berlin,\"likes \"\"quotes\"\", and commas\""
    );
}

#[test]
fn csv_export_written_to_disk_parses_back() {
    let store = load_fixture("quotes.csv");
    let export = store.export_as(ExportFormat::Csv).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&export.filename);
    fs::write(&path, &export.content).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(tokenize(lines[1]), vec!["1", "He said \"hi\", ok"]);

    let mut reloaded = TableStore::new();
    reloaded.load(&written).unwrap();
    assert_eq!(reloaded.view(), store.view());
}

#[test]
fn json_export_of_fixture_is_pretty_printed() {
    let store = load_fixture("quotes.csv");
    let export = store.export_as(ExportFormat::Json).unwrap();
    assert_eq!(export.mime_type, "application/json");
    let expected = concat!(
        "[\n",
        "  {\n    \"id\": \"1\",\n    \"quote\": \"He said \\\"hi\\\", ok\"\n  },\n",
        "  {\n    \"id\": \"2\",\n    \"quote\": \"plain\"\n  }\n",
        "]"
    );
    assert_eq!(export.content, expected);
}

#[test]
fn filtering_everything_away_blocks_export() {
    let mut store = load_fixture("quotes.csv");
    store.filter("quote", "no such text").unwrap();
    assert!(store.view().is_empty());
    assert!(matches!(
        store.export_as(ExportFormat::Json),
        Err(CsviError::NothingToExport)
    ));
}
