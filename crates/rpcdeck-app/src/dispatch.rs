// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use crate::{
    Command, Gateway, InvocationId, InvocationStream, Message, MethodMetadata, NavEpoch,
    StatusUpdate, start_invocation,
};

/// Remembers the last payload sent to each method.
pub trait PayloadHistory: Send + Sync {
    fn recall(&self, method: &str) -> Option<String>;
    fn remember(&self, method: &str, payload: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHistory;

impl PayloadHistory for NoHistory {
    fn recall(&self, _method: &str) -> Option<String> {
        None
    }

    fn remember(&self, _method: &str, _payload: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub method: String,
    pub payload: String,
}

#[derive(Debug)]
struct ActiveInvocation {
    stream: InvocationStream,
    awaiting: bool,
}

/// Runs session commands against the gateway and posts results back to the UI loop.
///
/// Discovery runs on one short-lived thread per request. At most one invocation is active;
/// its events are released to the loop one at a time, each after the loop asks for it.
pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    history: Arc<dyn PayloadHistory>,
    tx: Sender<Message>,
    active: Option<ActiveInvocation>,
    last_request: Option<SentRequest>,
    next_invocation: InvocationId,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        history: Arc<dyn PayloadHistory>,
        tx: Sender<Message>,
    ) -> Self {
        Self {
            gateway,
            history,
            tx,
            active: None,
            last_request: None,
            next_invocation: InvocationId::new(1),
        }
    }

    /// Executes one command. `Command::Quit` is left to the caller.
    pub fn execute(&mut self, command: Command) {
        match command {
            Command::LoadServices { epoch } => self.load_services(epoch),
            Command::LoadMethods { epoch, service } => self.load_methods(epoch, service),
            Command::LoadMethodMetadata { epoch, method } => {
                self.load_method_metadata(epoch, method);
            }
            Command::SendRequest { method, payload } => self.send_request(method, payload),
            Command::Resend => self.resend(),
            Command::CancelInFlight => {
                self.cancel_in_flight();
            }
            Command::AwaitInvocationEvent(invocation) => self.await_invocation_event(invocation),
            Command::Status(update) => self.post(Message::Status(update)),
            Command::Quit => {}
        }
    }

    pub fn load_services(&self, epoch: NavEpoch) {
        let gateway = Arc::clone(&self.gateway);
        self.spawn_operation("list-services", move || match gateway.list_services() {
            Ok(names) => Message::ServicesLoaded { epoch, names },
            Err(error) => Message::err(&error.context("list services")),
        });
    }

    pub fn load_methods(&self, epoch: NavEpoch, service: String) {
        let gateway = Arc::clone(&self.gateway);
        self.spawn_operation("list-methods", move || {
            match gateway.list_methods(&service) {
                Ok(names) => Message::MethodsLoaded {
                    epoch,
                    service,
                    names,
                },
                Err(error) => {
                    Message::err(&error.context(format!("list methods of {service}")))
                }
            }
        });
    }

    pub fn load_method_metadata(&self, epoch: NavEpoch, method: String) {
        let gateway = Arc::clone(&self.gateway);
        let history = Arc::clone(&self.history);
        self.spawn_operation("describe-method", move || {
            match gateway.describe_method_input(&method) {
                Ok(input) => {
                    let saved_payload = history.recall(&method);
                    let example_json = if input.example_json.trim().is_empty() {
                        "{}".to_owned()
                    } else {
                        input.example_json
                    };
                    Message::MethodMetadataLoaded {
                        epoch,
                        metadata: MethodMetadata {
                            method,
                            schema_text: input.schema_text,
                            example_json,
                            saved_payload,
                        },
                    }
                }
                Err(error) => Message::err(&error.context(format!("describe {method}"))),
            }
        });
    }

    /// Validates `payload` and starts a new invocation, cancelling any previous one first.
    pub fn send_request(&mut self, method: String, payload: String) {
        if let Err(error) = validate_payload(&payload) {
            tracing::debug!(%method, "rejecting payload: {error:#}");
            self.post(Message::err(&error));
            return;
        }

        self.cancel_in_flight();
        self.history.remember(&method, &payload);
        self.last_request = Some(SentRequest {
            method: method.clone(),
            payload: payload.clone(),
        });

        let id = self.next_invocation;
        self.next_invocation = id.next();
        self.post(Message::Status(StatusUpdate::loading()));
        tracing::info!(invocation = %id, %method, "sending request");

        match start_invocation(Arc::clone(&self.gateway), id, method.clone(), payload) {
            Ok(stream) => {
                self.active = Some(ActiveInvocation {
                    stream,
                    awaiting: false,
                });
                self.post(Message::InvocationStarted {
                    invocation: id,
                    method,
                });
            }
            Err(error) => {
                tracing::warn!(invocation = %id, "failed to start invocation: {error:#}");
                self.post(Message::err(&error));
                self.post(Message::Status(StatusUpdate::ready()));
            }
        }
    }

    pub fn resend(&mut self) {
        match self.last_request.clone() {
            Some(request) => self.send_request(request.method, request.payload),
            None => self.post(Message::Err {
                cause: "nothing to resend yet; send a request first".to_owned(),
            }),
        }
    }

    /// Cancels the active invocation, if any. Returns whether one was cancelled.
    pub fn cancel_in_flight(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        let invocation = active.stream.id();
        if active.stream.cancel() {
            tracing::info!(%invocation, "invocation cancelled");
        }
        drop(active);
        self.post(Message::Status(StatusUpdate::ready()));
        true
    }

    pub fn await_invocation_event(&mut self, invocation: InvocationId) {
        match self.active.as_mut() {
            Some(active) if active.stream.id() == invocation => active.awaiting = true,
            _ => tracing::debug!(%invocation, "ignoring await for inactive invocation"),
        }
    }

    /// Moves at most one pending invocation event onto the loop's queue.
    pub fn pump_invocation(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.awaiting {
            return false;
        }
        let Some(event) = active.stream.try_next() else {
            return false;
        };
        active.awaiting = false;
        let invocation = active.stream.id();
        let terminal = event.is_terminal();
        self.post(Message::Invocation { invocation, event });
        if terminal {
            self.active = None;
            tracing::info!(%invocation, "invocation finished");
            self.post(Message::Status(StatusUpdate::ready()));
        }
        true
    }

    pub fn active_invocation(&self) -> Option<InvocationId> {
        self.active.as_ref().map(|active| active.stream.id())
    }

    pub fn last_request(&self) -> Option<&SentRequest> {
        self.last_request.as_ref()
    }

    pub fn set_status(&self, update: StatusUpdate) {
        self.post(Message::Status(update));
    }

    pub fn shutdown(&mut self) {
        self.cancel_in_flight();
        self.gateway.close();
    }

    fn spawn_operation<F>(&self, name: &str, operation: F)
    where
        F: FnOnce() -> Message + Send + 'static,
    {
        self.post(Message::Status(StatusUpdate::loading()));
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("rpcdeck-{name}"))
            .spawn(move || {
                let message = operation();
                if let Message::Err { cause } = &message {
                    tracing::warn!("operation failed: {cause}");
                }
                let _ = tx.send(message);
                let _ = tx.send(Message::Status(StatusUpdate::ready()));
            })
            .with_context(|| format!("spawn {name} worker"));
        if let Err(error) = spawned {
            self.post(Message::err(&error));
            self.post(Message::Status(StatusUpdate::ready()));
        }
    }

    fn post(&self, message: Message) {
        let _ = self.tx.send(message);
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

/// Accepts only a syntactically valid JSON object.
pub fn validate_payload(payload: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(payload).context("invalid payload: not valid JSON")?;
    if !value.is_object() {
        bail!("invalid payload: expected a JSON object");
    }
    Ok(())
}
