// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_LOADING: &str = "Loading";
/// Trailer status text reported for a call that completed successfully.
pub const STATUS_OK: &str = "OK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    ServicesList,
    MethodsList,
    RequestEditor,
    ResponseViewer,
}

impl View {
    pub const ALL: [Self; 4] = [
        Self::ServicesList,
        Self::MethodsList,
        Self::RequestEditor,
        Self::ResponseViewer,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::ServicesList => "services",
            Self::MethodsList => "methods",
            Self::RequestEditor => "request",
            Self::ResponseViewer => "response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Area {
    pub width: u16,
    pub height: u16,
}

impl Area {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    Newline,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Back,
    ForceQuit,
    Select,
    Up,
    Down,
    PageUp,
    PageDown,
    First,
    Last,
    Send,
    Format,
    ToggleDescription,
    Resend,
    /// Starts narrowing the focused list by a typed substring.
    Filter,
    Edit(EditOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusSeverity {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Set {
        text: String,
        severity: StatusSeverity,
    },
    SetMessage {
        text: String,
        kind: MessageKind,
    },
    ClearMessage,
}

impl StatusUpdate {
    pub fn ready() -> Self {
        Self::Set {
            text: STATUS_READY.to_owned(),
            severity: StatusSeverity::Ok,
        }
    }

    pub fn loading() -> Self {
        Self::Set {
            text: STATUS_LOADING.to_owned(),
            severity: StatusSeverity::Warn,
        }
    }

    pub fn error_message(text: impl Into<String>) -> Self {
        Self::SetMessage {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }

    pub fn success_message(text: impl Into<String>) -> Self {
        Self::SetMessage {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMetadata {
    pub method: String,
    pub schema_text: String,
    pub example_json: String,
    /// Payload last sent to this method, when the payload cache has one.
    pub saved_payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationEvent {
    MethodResolved,
    HeadersSent,
    HeadersReceived,
    ResponseReceived { payload: String },
    TrailersReceived { status: String },
    Error { cause: String },
}

impl InvocationEvent {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::TrailersReceived { .. } | Self::Error { .. })
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::MethodResolved => "method resolved",
            Self::HeadersSent => "headers sent",
            Self::HeadersReceived => "headers received",
            Self::ResponseReceived { .. } => "response received",
            Self::TrailersReceived { .. } => "trailers received",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Input(Input),
    Resize(Area),
    ServicesLoaded {
        epoch: NavEpoch,
        names: Vec<String>,
    },
    MethodsLoaded {
        epoch: NavEpoch,
        service: String,
        names: Vec<String>,
    },
    MethodMetadataLoaded {
        epoch: NavEpoch,
        metadata: MethodMetadata,
    },
    InvocationStarted {
        invocation: InvocationId,
        method: String,
    },
    Invocation {
        invocation: InvocationId,
        event: InvocationEvent,
    },
    Err {
        cause: String,
    },
    Status(StatusUpdate),
}

impl Message {
    pub fn err(error: &anyhow::Error) -> Self {
        Self::Err {
            cause: format!("{error:#}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadServices {
        epoch: NavEpoch,
    },
    LoadMethods {
        epoch: NavEpoch,
        service: String,
    },
    LoadMethodMetadata {
        epoch: NavEpoch,
        method: String,
    },
    SendRequest {
        method: String,
        payload: String,
    },
    Resend,
    CancelInFlight,
    AwaitInvocationEvent(InvocationId),
    Status(StatusUpdate),
    Quit,
}

/// Lifecycle of the call shown on the response screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InvocationPhase {
    #[default]
    Idle,
    Resolving,
    HeadersExchanged,
    Streaming,
    Terminated(String),
    Failed(String),
    Cancelled,
}

impl InvocationPhase {
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Terminated(_) | Self::Failed(_) | Self::Cancelled
        )
    }

    pub fn label(&self) -> String {
        match self {
            Self::Idle => "idle".to_owned(),
            Self::Resolving => "resolving".to_owned(),
            Self::HeadersExchanged => "headers exchanged".to_owned(),
            Self::Streaming => "streaming".to_owned(),
            Self::Terminated(status) => format!("done: {status}"),
            Self::Failed(_) => "failed".to_owned(),
            Self::Cancelled => "cancelled".to_owned(),
        }
    }

    pub fn advance(&self, event: &InvocationEvent) -> Self {
        match event {
            InvocationEvent::MethodResolved => Self::Resolving,
            InvocationEvent::HeadersSent | InvocationEvent::HeadersReceived => {
                Self::HeadersExchanged
            }
            InvocationEvent::ResponseReceived { .. } => Self::Streaming,
            InvocationEvent::TrailersReceived { status } => Self::Terminated(status.clone()),
            InvocationEvent::Error { cause } => Self::Failed(cause.clone()),
        }
    }
}

pub fn short_method_name(method: &str) -> &str {
    let start = method.rfind(['.', '/']).map(|index| index + 1).unwrap_or(0);
    &method[start..]
}
