// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInput {
    pub schema_text: String,
    pub example_json: String,
}

/// Lifecycle hooks a [`Gateway`] drives while a call is in flight.
pub trait InvocationHandler {
    fn on_resolve_method(&mut self);
    fn on_send_headers(&mut self);
    fn on_receive_headers(&mut self);
    fn on_receive_response(&mut self, payload: String);
    fn on_receive_trailers(&mut self, status: String);
}

/// Discovery and invocation against one remote target.
///
/// Implementations are shared by every background operation, so all methods take `&self`.
pub trait Gateway: Send + Sync {
    fn target(&self) -> &str;
    fn list_services(&self) -> Result<Vec<String>>;
    fn list_methods(&self, service: &str) -> Result<Vec<String>>;
    fn describe_method_input(&self, method: &str) -> Result<MethodInput>;
    /// Runs one call to completion, reporting progress through `handler`.
    ///
    /// Remote statuses go to `on_receive_trailers`; an `Err` means the call failed locally or
    /// in transport. Once `cancel` fires the call should be abandoned as soon as possible.
    fn invoke(
        &self,
        method: &str,
        payload_json: &str,
        cancel: &CancelToken,
        handler: &mut dyn InvocationHandler,
    ) -> Result<()>;
    fn close(&self);
}

type CancelHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<CancelHook>>,
}

#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token. Returns `false` when it had already fired.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let hooks = std::mem::take(&mut *self.hooks());
        for hook in hooks {
            hook();
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers `hook` to run when the token fires; runs it now if it already has.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self.hooks();
        if self.is_cancelled() {
            drop(hooks);
            hook();
            return;
        }
        hooks.push(Box::new(hook));
    }

    fn hooks(&self) -> MutexGuard<'_, Vec<CancelHook>> {
        match self.inner.hooks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
