use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsviError {
    // Recoverable, user-facing conditions; the model turns these into
    // status messages and leaves the table state as it was.
    #[error("The CSV file is empty")]
    EmptyInput,
    #[error("Please select a column and enter a filter value")]
    InvalidFilter,
    #[error("No data to export")]
    NothingToExport,

    #[error("File not found")]
    FileNotFound,
    #[error("Permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CsviError {
    /// Whether the condition only aborts a single user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CsviError::EmptyInput | CsviError::InvalidFilter | CsviError::NothingToExport
        )
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct Config {
    /// Milliseconds to wait for a terminal event per loop iteration.
    pub event_poll_time: u64,
    pub max_column_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            event_poll_time: 100,
            max_column_width: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    SortColumn,
    FilterPrompt,
    ClearFilter,
    OpenPrompt,
    ExportCsv,
    ExportJson,
    ToggleStats,
    CopyCell,
    CopyRow,
    Help,
    Exit,
    Resize(u16, u16),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
 csvi - CSV table inspector

 Navigation
   ↑/↓/←/→      move selection
   PgUp/PgDn    move one page
   Home/End     first/last row

 Table
   s            sort by current column (again: reverse)
   f            filter current column by substring
   F            clear filter
   t            column statistics
   o            open another file
   e            export view as CSV (export.csv)
   j            export view as JSON (export.json)
   y / Y        copy cell / row to clipboard

 Other
   ?            this help
   Esc          close popup / cancel prompt
   q            quit
";
