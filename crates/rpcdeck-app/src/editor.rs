// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::EditOp;

/// Multi-line text with a character-indexed cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl TextBuffer {
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::default();
        buffer.set_text(text);
        buffer
    }

    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_owned).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.row = 0;
        self.col = 0;
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub const fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn set_cursor(&mut self, row: usize, col: usize) {
        self.row = row.min(self.lines.len().saturating_sub(1));
        self.col = col.min(self.line_len(self.row));
    }

    pub fn apply(&mut self, op: EditOp) {
        match op {
            EditOp::Insert(ch) => {
                let at = self.byte_offset(self.row, self.col);
                self.lines[self.row].insert(at, ch);
                self.col += 1;
            }
            EditOp::Newline => {
                let at = self.byte_offset(self.row, self.col);
                let rest = self.lines[self.row].split_off(at);
                self.lines.insert(self.row + 1, rest);
                self.row += 1;
                self.col = 0;
            }
            EditOp::Backspace => {
                if self.col > 0 {
                    let at = self.byte_offset(self.row, self.col - 1);
                    self.lines[self.row].remove(at);
                    self.col -= 1;
                } else if self.row > 0 {
                    let current = self.lines.remove(self.row);
                    self.row -= 1;
                    self.col = self.line_len(self.row);
                    self.lines[self.row].push_str(&current);
                }
            }
            EditOp::Delete => {
                if self.col < self.line_len(self.row) {
                    let at = self.byte_offset(self.row, self.col);
                    self.lines[self.row].remove(at);
                } else if self.row + 1 < self.lines.len() {
                    let next = self.lines.remove(self.row + 1);
                    self.lines[self.row].push_str(&next);
                }
            }
            EditOp::Left => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = self.line_len(self.row);
                }
            }
            EditOp::Right => {
                if self.col < self.line_len(self.row) {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
            }
            EditOp::Up => {
                if self.row > 0 {
                    self.row -= 1;
                    self.col = self.col.min(self.line_len(self.row));
                }
            }
            EditOp::Down => {
                if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = self.col.min(self.line_len(self.row));
                }
            }
            EditOp::Home => self.col = 0,
            EditOp::End => self.col = self.line_len(self.row),
        }
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |line| line.chars().count())
    }

    fn byte_offset(&self, row: usize, col: usize) -> usize {
        let line = &self.lines[row];
        line.char_indices()
            .nth(col)
            .map_or(line.len(), |(index, _)| index)
    }
}

/// Pretty-prints a JSON document, or returns `None` when it does not parse.
pub fn format_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

#[cfg(test)]
mod tests {
    use super::{TextBuffer, format_json};
    use crate::EditOp;

    fn type_text(buffer: &mut TextBuffer, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                buffer.apply(EditOp::Newline);
            } else {
                buffer.apply(EditOp::Insert(ch));
            }
        }
    }

    #[test]
    fn typing_and_newlines_build_lines() {
        let mut buffer = TextBuffer::default();
        type_text(&mut buffer, "{\n  \"a\": 1\n}");
        assert_eq!(buffer.text(), "{\n  \"a\": 1\n}");
        assert_eq!(buffer.cursor(), (2, 1));
    }

    #[test]
    fn backspace_at_line_start_joins_lines() {
        let mut buffer = TextBuffer::from_text("ab\ncd");
        buffer.set_cursor(1, 0);
        buffer.apply(EditOp::Backspace);
        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.cursor(), (0, 2));
    }

    #[test]
    fn delete_at_line_end_pulls_next_line() {
        let mut buffer = TextBuffer::from_text("ab\ncd");
        buffer.apply(EditOp::End);
        buffer.apply(EditOp::Delete);
        assert_eq!(buffer.text(), "abcd");
    }

    #[test]
    fn multibyte_characters_edit_by_char() {
        let mut buffer = TextBuffer::from_text("héllo");
        buffer.set_cursor(0, 2);
        buffer.apply(EditOp::Backspace);
        assert_eq!(buffer.text(), "hllo");
        buffer.apply(EditOp::Insert('é'));
        assert_eq!(buffer.text(), "héllo");
    }

    #[test]
    fn vertical_moves_clamp_column() {
        let mut buffer = TextBuffer::from_text("long line\nx");
        buffer.apply(EditOp::End);
        buffer.apply(EditOp::Down);
        assert_eq!(buffer.cursor(), (1, 1));
        buffer.apply(EditOp::Up);
        assert_eq!(buffer.cursor(), (0, 1));
    }

    #[test]
    fn left_and_right_wrap_across_lines() {
        let mut buffer = TextBuffer::from_text("a\nb");
        buffer.apply(EditOp::Right);
        buffer.apply(EditOp::Right);
        assert_eq!(buffer.cursor(), (1, 0));
        buffer.apply(EditOp::Left);
        assert_eq!(buffer.cursor(), (0, 1));
    }

    #[test]
    fn format_json_pretty_prints_valid_documents() {
        assert_eq!(
            format_json(r#"{"name":"x"}"#).as_deref(),
            Some("{\n  \"name\": \"x\"\n}")
        );
        assert_eq!(format_json("not json"), None);
    }
}
