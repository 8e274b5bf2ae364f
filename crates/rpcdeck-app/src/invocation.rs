// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::{CancelToken, Gateway, InvocationEvent, InvocationHandler, InvocationId};

/// Events buffered per call before the producer blocks.
pub const INVOCATION_QUEUE_CAPACITY: usize = 10;

/// Turns gateway lifecycle hooks into an ordered, bounded event queue.
///
/// Enforces the per-call ordering: `MethodResolved` first, at most one `HeadersSent`, at most
/// one `HeadersReceived` after it, any number of responses, then exactly one terminator.
/// Header and resolve hooks arriving after a response are out of order. Anything out of order
/// is dropped and logged.
pub struct EventAdapter {
    invocation: InvocationId,
    tx: SyncSender<InvocationEvent>,
    cancel: CancelToken,
    resolved: bool,
    headers_sent: bool,
    headers_received: bool,
    responded: bool,
    terminated: bool,
    disconnected: bool,
}

impl EventAdapter {
    pub fn new(
        invocation: InvocationId,
        tx: SyncSender<InvocationEvent>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            invocation,
            tx,
            cancel,
            resolved: false,
            headers_sent: false,
            headers_received: false,
            responded: false,
            terminated: false,
            disconnected: false,
        }
    }

    /// Closes the sequence once the gateway returns, guaranteeing a single terminator.
    pub fn finish(mut self, result: Result<()>) {
        if self.terminated || self.cancel.is_cancelled() {
            if let Err(error) = result {
                tracing::debug!(invocation = %self.invocation, "call ended after close: {error:#}");
            }
            return;
        }
        let cause = match result {
            Ok(()) => "call ended without a status".to_owned(),
            Err(error) => format!("{error:#}"),
        };
        self.forward(InvocationEvent::Error { cause });
    }

    fn forward(&mut self, event: InvocationEvent) {
        if self.terminated {
            tracing::error!(
                invocation = %self.invocation,
                event = event.label(),
                "dropping event after terminator"
            );
            return;
        }
        if event.is_terminal() {
            self.terminated = true;
        }
        if self.disconnected || self.cancel.is_cancelled() {
            return;
        }
        tracing::trace!(invocation = %self.invocation, event = event.label(), "queue event");
        if self.tx.send(event).is_err() {
            self.disconnected = true;
        }
    }

    /// Once a response or terminator went out, no lifecycle hook may follow.
    const fn past_headers(&self) -> bool {
        self.responded || self.terminated
    }

    fn out_of_order(&self, event: &InvocationEvent) {
        tracing::warn!(
            invocation = %self.invocation,
            event = event.label(),
            "dropping out-of-order event"
        );
    }
}

impl InvocationHandler for EventAdapter {
    fn on_resolve_method(&mut self) {
        let event = InvocationEvent::MethodResolved;
        if self.resolved || self.headers_sent || self.headers_received || self.past_headers() {
            self.out_of_order(&event);
            return;
        }
        self.resolved = true;
        self.forward(event);
    }

    fn on_send_headers(&mut self) {
        let event = InvocationEvent::HeadersSent;
        if self.headers_sent || self.headers_received || self.past_headers() {
            self.out_of_order(&event);
            return;
        }
        self.headers_sent = true;
        self.forward(event);
    }

    fn on_receive_headers(&mut self) {
        let event = InvocationEvent::HeadersReceived;
        if self.headers_received || self.past_headers() {
            self.out_of_order(&event);
            return;
        }
        self.headers_received = true;
        self.forward(event);
    }

    fn on_receive_response(&mut self, payload: String) {
        self.responded = true;
        self.forward(InvocationEvent::ResponseReceived { payload });
    }

    fn on_receive_trailers(&mut self, status: String) {
        self.forward(InvocationEvent::TrailersReceived { status });
    }
}

/// Consumer side of one call. Dropping it cancels the call.
#[derive(Debug)]
pub struct InvocationStream {
    id: InvocationId,
    rx: Receiver<InvocationEvent>,
    cancel: CancelToken,
    finished: bool,
}

impl InvocationStream {
    pub const fn id(&self) -> InvocationId {
        self.id
    }

    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Takes the next queued event without blocking.
    pub fn try_next(&mut self) -> Option<InvocationEvent> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.producer_vanished()),
        }
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<InvocationEvent> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) if self.cancel.is_cancelled() => {
                tracing::debug!(invocation = %self.id, event = event.label(), "discard after cancel");
                None
            }
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.producer_vanished()),
        }
    }

    fn observe(&mut self, event: InvocationEvent) -> InvocationEvent {
        if event.is_terminal() {
            self.finished = true;
        }
        event
    }

    fn producer_vanished(&mut self) -> InvocationEvent {
        self.finished = true;
        InvocationEvent::Error {
            cause: "invocation worker exited unexpectedly".to_owned(),
        }
    }
}

impl Drop for InvocationStream {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}

/// Starts `method` on a worker thread and returns the stream of its events.
pub fn start_invocation(
    gateway: Arc<dyn Gateway>,
    id: InvocationId,
    method: String,
    payload: String,
) -> Result<InvocationStream> {
    let (tx, rx) = mpsc::sync_channel(INVOCATION_QUEUE_CAPACITY);
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    thread::Builder::new()
        .name(format!("rpcdeck-invoke-{id}"))
        .spawn(move || {
            let mut adapter = EventAdapter::new(id, tx, worker_cancel.clone());
            tracing::debug!(invocation = %id, %method, "invocation started");
            let result = gateway.invoke(&method, &payload, &worker_cancel, &mut adapter);
            adapter.finish(result);
            tracing::debug!(invocation = %id, "invocation worker finished");
        })
        .context("spawn invocation worker")?;

    Ok(InvocationStream {
        id,
        rx,
        cancel,
        finished: false,
    })
}

#[cfg(test)]
mod tests {
    use super::{EventAdapter, INVOCATION_QUEUE_CAPACITY};
    use crate::{CancelToken, InvocationEvent, InvocationHandler, InvocationId};
    use anyhow::anyhow;
    use std::sync::mpsc;

    fn adapter() -> (EventAdapter, mpsc::Receiver<InvocationEvent>, CancelToken) {
        let (tx, rx) = mpsc::sync_channel(INVOCATION_QUEUE_CAPACITY);
        let cancel = CancelToken::new();
        (
            EventAdapter::new(InvocationId::new(1), tx, cancel.clone()),
            rx,
            cancel,
        )
    }

    fn drain(rx: &mpsc::Receiver<InvocationEvent>) -> Vec<InvocationEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn nothing_follows_the_terminator() {
        let (mut adapter, rx, _cancel) = adapter();
        adapter.on_receive_trailers("OK".to_owned());
        adapter.on_receive_response("{}".to_owned());
        adapter.on_receive_trailers("OK".to_owned());
        adapter.finish(Ok(()));

        assert_eq!(
            drain(&rx),
            vec![InvocationEvent::TrailersReceived {
                status: "OK".to_owned()
            }]
        );
    }

    #[test]
    fn gateway_error_becomes_single_error_event() {
        let (mut adapter, rx, _cancel) = adapter();
        adapter.on_resolve_method();
        adapter.finish(Err(anyhow!("connection reset")));

        assert_eq!(
            drain(&rx),
            vec![
                InvocationEvent::MethodResolved,
                InvocationEvent::Error {
                    cause: "connection reset".to_owned()
                },
            ]
        );
    }

    #[test]
    fn missing_status_is_reported_as_error() {
        let (mut adapter, rx, _cancel) = adapter();
        adapter.on_receive_response("{}".to_owned());
        adapter.finish(Ok(()));

        let events = drain(&rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], InvocationEvent::Error { .. }));
    }

    #[test]
    fn duplicate_and_late_headers_are_dropped() {
        let (mut adapter, rx, _cancel) = adapter();
        adapter.on_resolve_method();
        adapter.on_receive_headers();
        adapter.on_send_headers();
        adapter.on_receive_headers();
        adapter.on_resolve_method();
        adapter.on_receive_trailers("OK".to_owned());

        assert_eq!(
            drain(&rx),
            vec![
                InvocationEvent::MethodResolved,
                InvocationEvent::HeadersReceived,
                InvocationEvent::TrailersReceived {
                    status: "OK".to_owned()
                },
            ]
        );
    }

    #[test]
    fn headers_after_response_are_dropped() {
        let (mut adapter, rx, _cancel) = adapter();
        adapter.on_receive_response("{}".to_owned());
        adapter.on_send_headers();
        adapter.on_receive_headers();
        adapter.on_resolve_method();
        adapter.on_receive_trailers("OK".to_owned());

        assert_eq!(
            drain(&rx),
            vec![
                InvocationEvent::ResponseReceived {
                    payload: "{}".to_owned()
                },
                InvocationEvent::TrailersReceived {
                    status: "OK".to_owned()
                },
            ]
        );
    }

    #[test]
    fn cancelled_adapter_forwards_nothing() {
        let (mut adapter, rx, cancel) = adapter();
        adapter.on_resolve_method();
        cancel.cancel();
        adapter.on_receive_response("{}".to_owned());
        adapter.finish(Err(anyhow!("aborted")));

        assert_eq!(drain(&rx), vec![InvocationEvent::MethodResolved]);
    }
}
