use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph},
};

use crate::domain::{Config, HELP_TEXT};
use crate::model::{Model, UiData};

/// Rows taken by chrome around the data rows: header line and status line.
pub const TABLE_CHROME_ROWS: usize = 2;

pub struct TableUi {
    _config: Config,
}

impl TableUi {
    pub fn new(config: &Config) -> Self {
        Self {
            _config: config.clone(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let [header_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let uidata = model.get_uidata();
        frame.render_widget(header_line(uidata), header_area);
        frame.render_widget(body_text(uidata), body_area);
        self.draw_status(model, frame, status_area);

        if let Some(stats) = model.stats() {
            let lines: Vec<Line> = stats
                .iter()
                .flat_map(|column| {
                    let mut block = vec![Line::from(column.name.clone().bold().yellow())];
                    block.extend(
                        column
                            .entries
                            .iter()
                            .map(|(label, value)| Line::from(format!("  {label}: {value}"))),
                    );
                    block.push(Line::default());
                    block
                })
                .collect();
            draw_popup(frame, " Column statistics ", Text::from(lines));
        }

        if model.show_help() {
            draw_popup(frame, " Help ", Text::from(HELP_TEXT));
        }
    }

    fn draw_status(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if let Some(prompt) = model.prompt_view() {
            let label = format!("{}: ", prompt.label());
            let line = Line::from(vec![
                Span::from(label.clone()).bold(),
                Span::from(prompt.buffer().to_string()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (label.chars().count() + prompt.cursor()) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let uidata = model.get_uidata();
        let mut left = if uidata.file_name.is_empty() {
            "no file".to_string()
        } else {
            uidata.file_name.clone()
        };
        left.push_str(&format!(
            " | {} rows, {} columns",
            uidata.view_rows, uidata.column_count
        ));
        if let Some(filter) = &uidata.filter_label {
            left.push_str(&format!(" | filter {filter} ({} total)", uidata.dataset_rows));
        }

        let line = Line::from(vec![
            Span::from(left).dark_gray(),
            Span::from(" "),
            Span::from(uidata.status_message.clone()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn header_line(uidata: &UiData) -> Paragraph<'static> {
    let mut spans = Vec::with_capacity(uidata.columns.len() * 2);
    for (cidx, column) in uidata.columns.iter().enumerate() {
        let cell = pad(&column.name, column.width);
        let span = if cidx == uidata.selected_column {
            Span::from(cell).bold().underlined()
        } else if column.sorted {
            Span::from(cell).bold().yellow()
        } else {
            Span::from(cell).bold()
        };
        spans.push(span);
        spans.push(Span::from(" "));
    }
    Paragraph::new(Line::from(spans))
}

fn body_text(uidata: &UiData) -> Paragraph<'static> {
    let visible_rows = uidata
        .columns
        .first()
        .map(|c| c.data.len())
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(visible_rows);
    for ridx in 0..visible_rows {
        let selected_row = ridx == uidata.selected_row;
        let mut spans = Vec::with_capacity(uidata.columns.len() * 2);
        for (cidx, column) in uidata.columns.iter().enumerate() {
            let cell = pad(&column.data[ridx], column.width);
            let span = if selected_row && cidx == uidata.selected_column {
                Span::from(cell).reversed()
            } else if selected_row {
                Span::from(cell).on_dark_gray()
            } else {
                Span::from(cell)
            };
            spans.push(span);
            spans.push(Span::from(" "));
        }
        lines.push(Line::from(spans));
    }
    Paragraph::new(Text::from(lines))
}

fn draw_popup(frame: &mut Frame, title: &str, content: Text) {
    let area = centered_rect(frame.area(), 70, 80);
    let block = Block::bordered()
        .title(Line::from(title.to_string().bold()).centered())
        .title_bottom(Line::from(" <Esc> close ".blue()).centered())
        .border_set(border::THICK);
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [_, vertical, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(area);
    let [_, horizontal, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(vertical);
    horizontal
}

/// Truncate or pad a cell to its render width.
fn pad(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    let missing = width.saturating_sub(out.chars().count());
    out.extend(std::iter::repeat_n(' ', missing));
    out
}
