// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Area, MessageKind, STATUS_READY, StatusSeverity, StatusUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: MessageKind,
}

/// Persistent status plus an independently cleared side message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub status: String,
    pub severity: StatusSeverity,
    pub message: Option<StatusMessage>,
    pub area: Area,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            status: STATUS_READY.to_owned(),
            severity: StatusSeverity::Ok,
            message: None,
            area: Area::default(),
        }
    }
}

impl StatusLine {
    pub fn apply(&mut self, update: &StatusUpdate) {
        match update {
            StatusUpdate::Set { text, severity } => {
                self.status.clone_from(text);
                self.severity = *severity;
            }
            StatusUpdate::SetMessage { text, kind } => {
                self.message = Some(StatusMessage {
                    text: text.clone(),
                    kind: *kind,
                });
            }
            StatusUpdate::ClearMessage => {
                self.message = None;
            }
        }
    }

    pub fn resize(&mut self, area: Area) {
        self.area = area;
    }
}
