use crate::state::StatusKind;
use ratatui::style::{Color, Modifier, Style};

/// Centralized palette so every widget draws from the same colors
#[derive(Debug, Clone)]
pub struct Theme {
    pub primary_fg: Color,
    pub accent: Color,
    pub muted: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub success: Color,
    pub warning: Color,
    pub danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.primary_fg)
    }

    pub fn hint(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn focused(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected_row(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn table_header(&self) -> Style {
        Style::default()
            .fg(self.warning)
            .add_modifier(Modifier::BOLD)
    }

    pub fn modal(&self) -> Style {
        Style::default().fg(self.danger)
    }

    pub fn status(&self, kind: StatusKind) -> Style {
        match kind {
            StatusKind::Info => Style::default().fg(self.success),
            StatusKind::Busy => Style::default().fg(self.warning),
            StatusKind::Error => Style::default()
                .fg(self.danger)
                .add_modifier(Modifier::BOLD),
        }
    }
}
