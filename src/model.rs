use std::cmp::{max, min};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::domain::{Config, CsviError, Message};
use crate::prompt::{Prompt, PromptEvent};
use crate::stats::{ColumnStats, view_stats};
use crate::table::{ExportFormat, TableStore, escape_csv};
use crate::ui::TABLE_CHROME_ROWS;

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

// Which surface currently consumes key presses.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Stats,
    Help,
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PromptKind {
    FilterValue,
    OpenPath,
}

/// One column of the visible table slice, ready for rendering.
#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
    pub sorted: bool,
}

/// Everything the renderer needs for the table area and the status line.
#[derive(Default)]
pub struct UiData {
    pub file_name: String,
    pub columns: Vec<ColumnView>,
    pub view_rows: usize,
    pub dataset_rows: usize,
    pub column_count: usize,
    pub selected_row: usize,    // relative to the rendered slice
    pub selected_column: usize, // relative to the rendered columns
    pub abs_selected_row: usize,
    pub filter_label: Option<String>,
    pub status_message: String,
}

pub struct Model {
    config: Config,
    store: TableStore,
    pub status: Status,
    modus: Modus,
    file_name: String,
    cursor_row: usize,
    cursor_column: usize,
    offset_row: usize,
    offset_column: usize,
    table_width: usize,
    table_height: usize,
    prompt: Option<(PromptKind, Prompt)>,
    stats: Option<Vec<ColumnStats>>,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
    uidata: UiData,
}

impl Model {
    pub fn init(config: &Config, ui_width: usize, ui_height: usize) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                error!("Clipboard unavailable: {e:?}");
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            store: TableStore::new(),
            status: Status::Ready,
            modus: Modus::Table,
            file_name: String::new(),
            cursor_row: 0,
            cursor_column: 0,
            offset_row: 0,
            offset_column: 0,
            table_width: ui_width,
            table_height: ui_height.saturating_sub(TABLE_CHROME_ROWS),
            prompt: None,
            stats: None,
            clipboard,
            status_message: "Open a CSV file with 'o', help with '?'".to_string(),
            last_status_message_update: Instant::now(),
            uidata: UiData::default(),
        };
        model.refresh();
        model
    }

    /// Read `path` to completion and hand the text to the store.
    ///
    /// Every failure is reported through the status line and leaves the
    /// previous table untouched. When two opens follow each other the later
    /// one simply wins; there is no cancellation.
    pub fn open(&mut self, path: &Path) {
        let result = self.open_file(path);
        self.report(result);
        self.refresh();
    }

    fn open_file(&mut self, path: &Path) -> Result<(), CsviError> {
        let start_time = Instant::now();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CsviError::FileNotFound,
            ErrorKind::PermissionDenied => CsviError::PermissionDenied,
            _ => CsviError::Io(e),
        })?;
        self.store.load(&text)?;

        self.file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        self.cursor_row = 0;
        self.cursor_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
        info!(
            "Loaded {} in {}ms",
            path.display(),
            start_time.elapsed().as_millis()
        );
        self.set_status_message(format!(
            "Loaded {} ({} rows, {} columns)",
            self.file_name,
            self.store.dataset_len(),
            self.store.headers().len()
        ));
        self.refresh();
        Ok(())
    }

    pub fn get_uidata(&self) -> &UiData {
        &self.uidata
    }

    pub fn stats(&self) -> Option<&[ColumnStats]> {
        self.stats.as_deref()
    }

    pub fn show_help(&self) -> bool {
        self.modus == Modus::Help
    }

    pub fn prompt_view(&self) -> Option<&Prompt> {
        self.prompt.as_ref().map(|(_, p)| p)
    }

    /// The controller forwards raw key events while a prompt is open.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::Prompt
    }

    pub fn update(&mut self, message: Message) {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.status = Status::Quitting,
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(max(self.table_height, 1)),
                Message::MovePageDown => self.move_selection_down(max(self.table_height, 1)),
                Message::MoveBeginning => {
                    self.cursor_row = 0;
                    self.refresh();
                }
                Message::MoveEnd => {
                    self.cursor_row = self.store.view().len().saturating_sub(1);
                    self.refresh();
                }
                Message::SortColumn => self.sort_current_column(),
                Message::FilterPrompt => self.enter_filter_prompt(),
                Message::ClearFilter => self.clear_filter(),
                Message::OpenPrompt => self.enter_prompt(PromptKind::OpenPath, "Open file"),
                Message::ExportCsv => self.export(ExportFormat::Csv),
                Message::ExportJson => self.export(ExportFormat::Json),
                Message::ToggleStats => self.show_statistics(),
                Message::CopyCell => self.copy_cell(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.modus = Modus::Help,
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::RawKey(_) => {}
            },
            Modus::Stats => match message {
                Message::Quit => self.status = Status::Quitting,
                Message::Exit | Message::ToggleStats => {
                    self.stats = None;
                    self.modus = Modus::Table;
                }
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => {}
            },
            Modus::Help => match message {
                Message::Quit => self.status = Status::Quitting,
                Message::Exit | Message::Help => self.modus = Modus::Table,
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => {}
            },
            Modus::Prompt => match message {
                Message::RawKey(key) => self.prompt_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => {}
            },
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
    }

    // Run one store operation; recoverable refusals only touch the status line.
    fn report(&mut self, result: Result<(), CsviError>) {
        if let Err(e) = result {
            if !e.is_recoverable() {
                error!("Operation failed: {e:?}");
            }
            self.set_status_message(e.to_string());
        }
    }

    fn sort_current_column(&mut self) {
        if self.store.is_empty() {
            self.set_status_message("No data loaded");
            return;
        }
        self.store.sort(self.cursor_column);
        let (column, direction) = self.store.sort_state();
        if let Some(idx) = column {
            self.set_status_message(format!(
                "Sorted by {} {}",
                self.store.headers()[idx],
                direction.indicator()
            ));
        }
        self.refresh();
    }

    fn enter_filter_prompt(&mut self) {
        if self.store.is_empty() {
            self.set_status_message("No data loaded");
            return;
        }
        let column = self.store.headers()[self.cursor_column].clone();
        self.enter_prompt(PromptKind::FilterValue, format!("Filter {column}"));
    }

    fn enter_prompt(&mut self, kind: PromptKind, label: impl Into<String>) {
        self.prompt = Some((kind, Prompt::new(label)));
        self.modus = Modus::Prompt;
    }

    fn prompt_input(&mut self, key: KeyEvent) {
        let Some((kind, prompt)) = self.prompt.as_mut() else {
            return;
        };
        let kind = *kind;
        match prompt.read(key) {
            PromptEvent::Editing => {}
            PromptEvent::Canceled => {
                self.prompt = None;
                self.modus = Modus::Table;
            }
            PromptEvent::Submitted(input) => {
                self.prompt = None;
                self.modus = Modus::Table;
                match kind {
                    PromptKind::FilterValue => self.apply_filter(&input),
                    PromptKind::OpenPath => self.open_path_input(&input),
                }
            }
        }
    }

    fn apply_filter(&mut self, needle: &str) {
        let column = self.store.headers()[self.cursor_column].clone();
        match self.store.filter(&column, needle) {
            Ok(()) => {
                self.cursor_row = 0;
                self.offset_row = 0;
                self.set_status_message(format!(
                    "{} of {} rows match {column}~\"{needle}\"",
                    self.store.view().len(),
                    self.store.dataset_len()
                ));
            }
            Err(e) => self.report(Err(e)),
        }
        self.refresh();
    }

    fn clear_filter(&mut self) {
        self.store.clear_filter();
        self.set_status_message("Filter cleared");
        self.refresh();
    }

    fn open_path_input(&mut self, input: &str) {
        let path = match shellexpand::full(input) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                self.set_status_message(format!("Bad path: {e}"));
                return;
            }
        };
        self.open(&path);
    }

    fn export(&mut self, format: ExportFormat) {
        match self.store.export_as(format) {
            Ok(export) => {
                if let Err(e) = fs::write(&export.filename, &export.content) {
                    error!("Writing {} failed: {e:?}", export.filename);
                    self.set_status_message(format!("Export failed: {e}"));
                    return;
                }
                info!(
                    "Exported {} rows to {} ({})",
                    self.store.view().len(),
                    export.filename,
                    export.mime_type
                );
                self.set_status_message(format!(
                    "Exported {} rows to {}",
                    self.store.view().len(),
                    export.filename
                ));
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn show_statistics(&mut self) {
        if self.store.is_empty() {
            self.set_status_message("No data loaded");
            return;
        }
        self.stats = Some(view_stats(&self.store));
        self.modus = Modus::Stats;
    }

    fn copy_cell(&mut self) {
        let Some(row) = self.store.view().get(self.cursor_row) else {
            return;
        };
        let cell = row[self.cursor_column].clone();
        self.copy_to_clipboard(cell, "Copied cell");
    }

    fn copy_row(&mut self) {
        let Some(row) = self.store.view().get(self.cursor_row) else {
            return;
        };
        let content = row
            .iter()
            .map(|v| escape_csv(v))
            .collect::<Vec<String>>()
            .join(",");
        self.copy_to_clipboard(content, "Copied row");
    }

    fn copy_to_clipboard(&mut self, content: String, what: &str) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("Clipboard unavailable");
            return;
        };
        match clipboard.set_text(content) {
            Ok(()) => self.set_status_message(what),
            Err(e) => {
                debug!("Error copying to clipboard: {e:?}");
                self.set_status_message("Copy failed");
            }
        }
    }

    fn ui_resize(&mut self, width: u16, height: u16) {
        trace!("UI was resized to {width}x{height}");
        self.table_width = width as usize;
        self.table_height = (height as usize).saturating_sub(TABLE_CHROME_ROWS);
        self.refresh();
    }

    fn move_selection_up(&mut self, size: usize) {
        self.cursor_row = self.cursor_row.saturating_sub(size);
        self.refresh();
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.store.view().len();
        self.cursor_row = min(self.cursor_row + size, nrows.saturating_sub(1));
        self.refresh();
    }

    fn move_selection_left(&mut self) {
        self.cursor_column = self.cursor_column.saturating_sub(1);
        self.refresh();
    }

    fn move_selection_right(&mut self) {
        let ncols = self.store.headers().len();
        self.cursor_column = min(self.cursor_column + 1, ncols.saturating_sub(1));
        self.refresh();
    }

    /// Rebuild the render snapshot from the store and the viewport state.
    /// Called after every mutation so the next draw always sees fresh data.
    fn refresh(&mut self) {
        let headers = self.store.headers();
        let view = self.store.view();
        let nrows = view.len();
        let ncols = headers.len();
        let (sort_column, sort_direction) = self.store.sort_state();

        self.cursor_row = min(self.cursor_row, nrows.saturating_sub(1));
        self.cursor_column = min(self.cursor_column, ncols.saturating_sub(1));

        // keep the selected row inside the rendered slice
        let height = max(self.table_height, 1);
        if self.cursor_row < self.offset_row {
            self.offset_row = self.cursor_row;
        } else if self.cursor_row >= self.offset_row + height {
            self.offset_row = self.cursor_row + 1 - height;
        }
        let rbegin = min(self.offset_row, nrows);
        let rend = min(rbegin + height, nrows);

        // column widths over the rendered slice only
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut width = name.chars().count() + 2; // room for sort marker
                for row in &view[rbegin..rend] {
                    width = max(width, row[idx].chars().count());
                }
                min(width, self.config.max_column_width)
            })
            .collect();

        // slide the column window until the selected column is rendered
        if self.cursor_column < self.offset_column {
            self.offset_column = self.cursor_column;
        }
        let mut visible: Vec<usize>;
        loop {
            visible = Vec::new();
            let mut used = 0;
            for idx in self.offset_column..ncols {
                if used + widths[idx] + 1 > self.table_width && !visible.is_empty() {
                    break;
                }
                visible.push(idx);
                used += widths[idx] + 1;
            }
            if visible.contains(&self.cursor_column) || self.offset_column >= self.cursor_column {
                break;
            }
            self.offset_column += 1;
        }

        let columns: Vec<ColumnView> = visible
            .iter()
            .map(|&idx| {
                let sorted = sort_column == Some(idx);
                let name = if sorted {
                    format!("{} {}", headers[idx], sort_direction.indicator())
                } else {
                    headers[idx].clone()
                };
                let data = view[rbegin..rend]
                    .iter()
                    .map(|row| row[idx].clone())
                    .collect();
                ColumnView {
                    name,
                    width: widths[idx],
                    data,
                    sorted,
                }
            })
            .collect();

        self.uidata = UiData {
            file_name: self.file_name.clone(),
            columns,
            view_rows: nrows,
            dataset_rows: self.store.dataset_len(),
            column_count: ncols,
            selected_row: self.cursor_row - rbegin,
            selected_column: visible
                .iter()
                .position(|&c| c == self.cursor_column)
                .unwrap_or(0),
            abs_selected_row: self.cursor_row,
            filter_label: self
                .store
                .filter_selection()
                .map(|f| format!("{}~\"{}\"", f.column, f.value)),
            status_message: self.status_message.clone(),
        };
    }
}
