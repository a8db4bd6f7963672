use crate::state::{Focus, State};
use crate::stylesheet::Theme;
use pasajes_client::RecordId;
use pasajes_editor::renderer::COLUMNS;
use pasajes_editor::{EditorMode, FormField, TableBody, DELETE_PROMPT};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

const LABEL_WIDTH: usize = 22;

/// Draws the whole screen from `State`; holds no state of its own besides
/// the theme
#[derive(Debug, Clone, Default)]
pub struct AppMain {
    theme: Theme,
}

impl AppMain {
    pub fn render(&self, frame: &mut Frame, state: &State) {
        let area = frame.area();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(FormField::ALL.len() as u16 + 2),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_header(frame, layout[0], state);
        self.render_filter(frame, layout[1], state);
        self.render_form(frame, layout[2], state);
        self.render_table(frame, layout[3], state);
        self.render_status_bar(frame, layout[4], state);

        if let Some(id) = state.pending_delete() {
            self.render_confirm(frame, area, id);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, state: &State) {
        let session = state.controller().session();
        let line = Line::from(vec![
            Span::styled(session.title(), self.theme.title()),
            Span::styled(
                format!(
                    "   [Enter] {}  [n] nuevo  [e] editar  [d] eliminar  [x] exportar  [q] salir",
                    session.submit_label()
                ),
                self.theme.hint(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_filter(&self, frame: &mut Frame, area: Rect, state: &State) {
        let line = Line::from(vec![
            Span::styled("Filtrar por ruta: ", self.theme.text()),
            Span::styled(state.filter_label(), self.theme.focused()),
            Span::styled("  [f] cambiar  [r] recargar", self.theme.hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect, state: &State) {
        let focus = state.focus();
        let lines: Vec<Line> = FormField::ALL
            .iter()
            .map(|field| {
                let focused = focus == Focus::Field(*field);
                let marker = if focused { "› " } else { "  " };
                let mut value = state.display_value(*field);
                if focused && !field.is_select() {
                    value.push('_');
                }
                let value_style = if focused {
                    self.theme.focused()
                } else {
                    self.theme.text()
                };
                let mut spans = vec![
                    Span::styled(marker, self.theme.focused()),
                    Span::styled(
                        format!("{:<width$}", field.label(), width = LABEL_WIDTH),
                        self.theme.text(),
                    ),
                    Span::styled(value, value_style),
                ];
                if focused && field.is_select() {
                    spans.push(Span::styled("  ◂ ▸", self.theme.hint()));
                }
                Line::from(spans)
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(state.controller().session().title());
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_table(&self, frame: &mut Frame, area: Rect, state: &State) {
        let block = Block::default().borders(Borders::ALL).title("Pasajes");
        let body = state.controller().table();

        let rows = match &body {
            TableBody::Rows(rows) => rows,
            placeholder => {
                let text = placeholder.placeholder().unwrap_or_default();
                let paragraph = Paragraph::new(text)
                    .block(block)
                    .alignment(Alignment::Center)
                    .style(self.theme.hint())
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, area);
                return;
            }
        };

        let editing = match state.controller().mode() {
            EditorMode::Edit(id) => Some(id),
            EditorMode::Create => None,
        };
        let table_rows: Vec<Row> = rows
            .iter()
            .map(|row| {
                let actions = if editing == Some(row.edit.id()) {
                    "editando"
                } else {
                    "[e] [d]"
                };
                let mut cells: Vec<Cell> = row.cells().iter().map(|c| Cell::from(*c)).collect();
                cells.push(Cell::from(actions));
                Row::new(cells)
            })
            .collect();

        let header = Row::new(COLUMNS.iter().map(|c| Cell::from(*c))).style(self.theme.table_header());
        let widths = [
            Constraint::Length(16),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Min(16),
            Constraint::Length(10),
            Constraint::Length(9),
        ];
        let highlight = if state.focus() == Focus::Table {
            self.theme.selected_row()
        } else {
            self.theme.hint()
        };
        let table = Table::new(table_rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(highlight)
            .highlight_symbol("» ");

        let mut table_state = TableState::default().with_selected(Some(state.selected_index()));
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect, state: &State) {
        let status = state.status();
        let paragraph =
            Paragraph::new(Span::styled(status.text.as_str(), self.theme.status(status.kind)));
        frame.render_widget(paragraph, area);
    }

    fn render_confirm(&self, frame: &mut Frame, area: Rect, id: RecordId) {
        let popup = centered_rect(48, 6, area);
        frame.render_widget(Clear, popup);

        let lines = vec![
            Line::from(Span::styled(DELETE_PROMPT, self.theme.text())),
            Line::from(""),
            Line::from(Span::styled("[y] Sí    [n] No", self.theme.hint())),
        ];
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Eliminar pasaje {}", id))
            .border_style(self.theme.modal());
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect(80, 20, area), area);
    }
}
