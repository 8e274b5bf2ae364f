// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use ratatui::style::{Color, Modifier, Style};
use rpcdeck_app::{MessageKind, StatusSeverity};

/// Colors used by every screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub text: Color,
    pub muted: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub ok: Color,
    pub warn: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Cyan,
            text: Color::White,
            muted: Color::DarkGray,
            selected_fg: Color::Black,
            selected_bg: Color::Cyan,
            ok: Color::Green,
            warn: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl Theme {
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn body(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn help(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.selected_fg)
            .bg(self.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn severity(&self, severity: StatusSeverity) -> Style {
        let color = match severity {
            StatusSeverity::Ok => self.ok,
            StatusSeverity::Warn => self.warn,
            StatusSeverity::Error => self.error,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn message(&self, kind: MessageKind) -> Style {
        match kind {
            MessageKind::Success => Style::default().fg(self.ok),
            MessageKind::Error => Style::default().fg(self.error),
        }
    }
}
