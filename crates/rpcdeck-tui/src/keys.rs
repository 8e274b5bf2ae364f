// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rpcdeck_app::{EditOp, Input, View};
use std::fmt;

/// A key chord such as `ctrl+s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Parses chords like `ctrl+s`, `alt+enter`, `shift+tab` or `f5`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim().to_ascii_lowercase();
        if text.is_empty() {
            bail!("empty key binding");
        }
        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        // a trailing "+" means the plus key itself
        if text.ends_with("++") || text == "+" {
            parts.retain(|part| !part.is_empty());
            parts.push("+");
        }
        let Some(key) = parts.pop() else {
            bail!("empty key binding");
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            modifiers |= match part {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "meta" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                other => bail!("unknown modifier {other:?} in key binding {text:?}"),
            };
        }
        let code = key_code(key)
            .ok_or_else(|| anyhow::anyhow!("unknown key {key:?} in key binding {text:?}"))?;
        let (code, modifiers) = normalize(code, modifiers);
        Ok(Self { code, modifiers })
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        normalize(key.code, key.modifiers) == (self.code, self.modifiers)
    }
}

fn key_code(name: &str) -> Option<KeyCode> {
    let code = match name {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        _ => {
            if let Some(number) = name.strip_prefix('f')
                && let Ok(number) = number.parse::<u8>()
                && (1..=12).contains(&number)
            {
                return Some(KeyCode::F(number));
            }
            let mut chars = name.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            KeyCode::Char(c)
        }
    };
    Some(code)
}

/// Terminals report shifted letters as uppercase and shift+tab as backtab; fold both away.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(c) => (
            KeyCode::Char(c.to_ascii_lowercase()),
            modifiers - KeyModifiers::SHIFT,
        ),
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
            (KeyCode::BackTab, modifiers - KeyModifiers::SHIFT)
        }
        KeyCode::BackTab => (KeyCode::BackTab, modifiers - KeyModifiers::SHIFT),
        other => (other, modifiers),
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::BackTab => f.write_str("shift+tab"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Delete => f.write_str("delete"),
            KeyCode::Insert => f.write_str("insert"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pgup"),
            KeyCode::PageDown => f.write_str("pgdn"),
            KeyCode::F(number) => write!(f, "f{number}"),
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            _ => f.write_str("?"),
        }
    }
}

/// Bindings for every session-level action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMap {
    pub back: KeyBinding,
    pub quit: KeyBinding,
    pub select: KeyBinding,
    pub send: KeyBinding,
    pub format: KeyBinding,
    pub toggle_description: KeyBinding,
    pub resend: KeyBinding,
    pub filter: KeyBinding,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            back: KeyBinding::plain(KeyCode::Esc),
            quit: KeyBinding::ctrl('c'),
            select: KeyBinding::plain(KeyCode::Enter),
            send: KeyBinding::ctrl('s'),
            format: KeyBinding::ctrl('f'),
            toggle_description: KeyBinding::plain(KeyCode::Tab),
            resend: KeyBinding::ctrl('r'),
            filter: KeyBinding::plain(KeyCode::Char('/')),
        }
    }
}

impl KeyMap {
    /// Translates a terminal key into the input the given view understands, if any.
    ///
    /// While a list is `filtering`, printable keys edit the filter instead of navigating.
    pub fn input_for(&self, view: View, filtering: bool, key: &KeyEvent) -> Option<Input> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if self.quit.matches(key) {
            return Some(Input::ForceQuit);
        }
        if self.back.matches(key) {
            return Some(Input::Back);
        }
        match view {
            View::ServicesList | View::MethodsList => {
                if self.select.matches(key) {
                    return Some(Input::Select);
                }
                if filtering {
                    return filter_input(key);
                }
                if self.filter.matches(key) {
                    return Some(Input::Filter);
                }
                navigation_input(key.code)
            }
            View::RequestEditor => {
                if self.send.matches(key) {
                    Some(Input::Send)
                } else if self.format.matches(key) {
                    Some(Input::Format)
                } else if self.toggle_description.matches(key) {
                    Some(Input::ToggleDescription)
                } else {
                    edit_op(key).map(Input::Edit)
                }
            }
            View::ResponseViewer => {
                if self.resend.matches(key) {
                    return Some(Input::Resend);
                }
                navigation_input(key.code)
            }
        }
    }

    /// One-line key reference for the bottom of each screen.
    pub fn help(&self, view: View) -> String {
        let entries: Vec<(String, &str)> = match view {
            View::ServicesList | View::MethodsList => vec![
                ("↑/↓".to_owned(), "move"),
                (self.select.to_string(), "open"),
                (self.filter.to_string(), "filter"),
                (self.back.to_string(), "back"),
                (self.quit.to_string(), "quit"),
            ],
            View::RequestEditor => vec![
                (self.send.to_string(), "send"),
                (self.format.to_string(), "format"),
                (self.toggle_description.to_string(), "schema"),
                (self.back.to_string(), "back"),
                (self.quit.to_string(), "quit"),
            ],
            View::ResponseViewer => vec![
                ("↑/↓".to_owned(), "scroll"),
                (self.resend.to_string(), "resend"),
                (self.back.to_string(), "back"),
                (self.quit.to_string(), "quit"),
            ],
        };
        entries
            .iter()
            .map(|(key, action)| format!("{key} {action}"))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

fn navigation_input(code: KeyCode) -> Option<Input> {
    let input = match code {
        KeyCode::Up | KeyCode::Char('k') => Input::Up,
        KeyCode::Down | KeyCode::Char('j') => Input::Down,
        KeyCode::PageUp => Input::PageUp,
        KeyCode::PageDown => Input::PageDown,
        KeyCode::Home | KeyCode::Char('g') => Input::First,
        KeyCode::End | KeyCode::Char('G') => Input::Last,
        _ => return None,
    };
    Some(input)
}

fn filter_input(key: &KeyEvent) -> Option<Input> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(Input::Edit(EditOp::Insert(c)))
        }
        KeyCode::Backspace => Some(Input::Edit(EditOp::Backspace)),
        KeyCode::Char(_) => None,
        code => navigation_input(code),
    }
}

fn edit_op(key: &KeyEvent) -> Option<EditOp> {
    let op = match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            EditOp::Insert(c)
        }
        KeyCode::Enter => EditOp::Newline,
        KeyCode::Backspace => EditOp::Backspace,
        KeyCode::Delete => EditOp::Delete,
        KeyCode::Left => EditOp::Left,
        KeyCode::Right => EditOp::Right,
        KeyCode::Up => EditOp::Up,
        KeyCode::Down => EditOp::Down,
        KeyCode::Home => EditOp::Home,
        KeyCode::End => EditOp::End,
        _ => return None,
    };
    Some(op)
}
