// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use rpcdeck_app::{
    HELP_HEIGHT, ListState, RequestScreen, ResponseScreen, STATUS_BAR_HEIGHT, Session, StatusLine,
    TITLE_HEIGHT, View, short_method_name,
};
use std::ops::Range;

use crate::{KeyMap, Theme};

/// Draws the active screen above a one-row status bar.
pub fn render(frame: &mut Frame<'_>, session: &Session, keys: &KeyMap, theme: &Theme) {
    let area = frame.area();
    let status_rows = STATUS_BAR_HEIGHT.min(area.height);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(status_rows)])
        .split(area);

    let view = session.view();
    let help = keys.help(view);
    match view {
        View::ServicesList => render_list(frame, layout[0], &session.services.list, &help, theme),
        View::MethodsList => render_list(frame, layout[0], &session.methods.list, &help, theme),
        View::RequestEditor => render_request(frame, layout[0], &session.request, &help, theme),
        View::ResponseViewer => {
            render_response(frame, layout[0], &session.response, &help, theme);
        }
    }
    render_status(frame, layout[1], &session.status, theme);
}

/// Rows of `len` items shown for `cursor`, paging by whole screens.
pub fn visible_window(cursor: usize, len: usize, rows: usize) -> Range<usize> {
    let rows = rows.max(1);
    let start = (cursor.min(len.saturating_sub(1)) / rows) * rows;
    start..len.min(start + rows)
}

fn title_block<'a>(title: String, theme: &Theme) -> Paragraph<'a> {
    Paragraph::new(Span::styled(title, theme.title()))
        .block(Block::default().borders(Borders::BOTTOM).border_style(theme.help()))
}

fn sections(area: Rect, body: Constraint) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TITLE_HEIGHT),
            body,
            Constraint::Length(HELP_HEIGHT),
        ])
        .split(area)
}

fn render_list(frame: &mut Frame<'_>, area: Rect, list: &ListState, help: &str, theme: &Theme) {
    let layout = sections(area, Constraint::Min(0));
    let len = list.visible_len();
    let count = if len == 0 {
        list.title.clone()
    } else {
        format!("{} ({}/{})", list.title, list.cursor + 1, len)
    };
    let title = match &list.filter {
        Some(filter) => format!("{count}  /{filter}"),
        None => count,
    };
    frame.render_widget(title_block(title, theme), layout[0]);

    let window = visible_window(list.cursor, len, usize::from(layout[1].height));
    let lines: Vec<Line<'_>> = list
        .visible_items()
        .enumerate()
        .skip(window.start)
        .take(window.len())
        .map(|(index, item)| {
            if index == list.cursor {
                Line::styled(format!("> {}", item.label), theme.selected())
            } else {
                Line::styled(format!("  {}", item.label), theme.body())
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), layout[1]);
    frame.render_widget(Paragraph::new(help.to_owned()).style(theme.help()), layout[2]);
}

fn render_request(
    frame: &mut Frame<'_>,
    area: Rect,
    request: &RequestScreen,
    help: &str,
    theme: &Theme,
) {
    let editor_height = request.editor_height().min(area.height);
    let mut constraints = vec![Constraint::Length(editor_height)];
    if request.show_schema {
        constraints.push(Constraint::Min(0));
    }
    constraints.push(Constraint::Length(HELP_HEIGHT));
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let editor_area = layout[0];
    let (row, col) = request.editor.cursor();
    let top = row.saturating_sub(usize::from(editor_area.height.saturating_sub(1)));
    let lines: Vec<Line<'_>> = request
        .editor
        .lines()
        .iter()
        .skip(top)
        .map(|line| Line::styled(line.clone(), theme.body()))
        .collect();
    frame.render_widget(Paragraph::new(lines), editor_area);
    if editor_area.height > 0 {
        let x = u16::try_from(col).unwrap_or(u16::MAX);
        let y = u16::try_from(row - top).unwrap_or(0);
        frame.set_cursor_position(Position::new(
            editor_area.x.saturating_add(x).min(editor_area.right().saturating_sub(1)),
            editor_area.y.saturating_add(y),
        ));
    }

    if request.show_schema {
        let schema = Paragraph::new(request.schema_text.clone())
            .style(theme.help())
            .block(
                Block::default()
                    .borders(Borders::TOP | Borders::BOTTOM)
                    .border_style(theme.help())
                    .title(Span::styled("input schema", theme.title())),
            );
        frame.render_widget(schema, layout[1]);
    }

    let method = request
        .method
        .as_deref()
        .map(|method| format!("{}  ", short_method_name(method)))
        .unwrap_or_default();
    let help_line = Line::from(vec![
        Span::styled(method, theme.title()),
        Span::styled(help.to_owned(), theme.help()),
    ]);
    frame.render_widget(Paragraph::new(help_line), layout[layout.len() - 1]);
}

fn render_response(
    frame: &mut Frame<'_>,
    area: Rect,
    response: &ResponseScreen,
    help: &str,
    theme: &Theme,
) {
    let layout = sections(area, Constraint::Min(0));
    frame.render_widget(title_block(response.title(), theme), layout[0]);
    let body = Paragraph::new(response.body())
        .style(theme.body())
        .scroll((response.scroll, 0));
    frame.render_widget(body, layout[1]);
    frame.render_widget(Paragraph::new(help.to_owned()).style(theme.help()), layout[2]);
}

/// Status text followed by the side message, if any.
pub fn status_line<'a>(status: &StatusLine, theme: &Theme) -> Line<'a> {
    let mut spans = vec![Span::styled(
        format!(" {} ", status.status),
        theme.severity(status.severity),
    )];
    if let Some(message) = &status.message {
        spans.push(Span::styled("│ ", theme.help()));
        spans.push(Span::styled(message.text.clone(), theme.message(message.kind)));
    }
    Line::from(spans)
}

fn render_status(frame: &mut Frame<'_>, area: Rect, status: &StatusLine, theme: &Theme) {
    if area.height == 0 {
        return;
    }
    frame.render_widget(Paragraph::new(status_line(status, theme)), area);
}
