// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rpcdeck_app::{CancelToken, Gateway, InvocationHandler, MethodInput};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const PACKAGES: [&str; 8] = [
    "acme", "billing", "catalog", "fleet", "inventory", "ledger", "orders", "telemetry",
];
const NOUNS: [&str; 10] = [
    "Account", "Device", "Invoice", "Item", "Order", "Report", "Route", "Shipment", "Sensor",
    "User",
];
const VERBS: [&str; 8] = [
    "Get", "List", "Create", "Update", "Delete", "Watch", "Search", "Sync",
];

/// How long an `AwaitCancel` step waits before giving up.
const CANCEL_WAIT: Duration = Duration::from_secs(5);

/// Small seeded PRNG so generated catalogs are stable across runs.
#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, n: usize) -> usize {
        match u64::try_from(n) {
            Ok(0 | 1) | Err(_) => 0,
            Ok(n) => usize::try_from(self.next_u64() % n).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeService {
    pub name: String,
    pub methods: Vec<String>,
}

/// Seeded generator of plausible service catalogs.
#[derive(Debug, Clone)]
pub struct CatalogFaker {
    rng: DeterministicRng,
}

impl CatalogFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(seed),
        }
    }

    pub fn service(&mut self) -> FakeService {
        let package = PACKAGES[self.rng.below(PACKAGES.len())];
        let noun = NOUNS[self.rng.below(NOUNS.len())];
        let name = format!("{package}.v1.{noun}Service");
        let count = 1 + self.rng.below(VERBS.len());
        let start = self.rng.below(VERBS.len());
        let methods = (0..count)
            .map(|offset| {
                let verb = VERBS[(start + offset) % VERBS.len()];
                format!("{name}.{verb}{noun}")
            })
            .collect();
        FakeService { name, methods }
    }

    /// `count` services with distinct names, sorted by name.
    pub fn catalog(&mut self, count: usize) -> Vec<FakeService> {
        let mut services: BTreeMap<String, FakeService> = BTreeMap::new();
        let mut attempts = 0;
        while services.len() < count && attempts < count * 64 {
            attempts += 1;
            let service = self.service();
            services.entry(service.name.clone()).or_insert(service);
        }
        services.into_values().collect()
    }
}

/// One scripted step of a mock call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Resolve,
    SendHeaders,
    ReceiveHeaders,
    Respond(String),
    Trailers(String),
    /// Blocks until the call is cancelled, then keeps running the script.
    AwaitCancel,
    /// Ends the call with a local error.
    Fail(String),
}

pub fn unary_script(response: &str) -> Vec<Step> {
    vec![
        Step::Resolve,
        Step::SendHeaders,
        Step::ReceiveHeaders,
        Step::Respond(response.to_owned()),
        Step::Trailers("OK".to_owned()),
    ]
}

pub fn server_stream_script(responses: &[&str], status: &str) -> Vec<Step> {
    let mut steps = vec![Step::Resolve, Step::SendHeaders, Step::ReceiveHeaders];
    steps.extend(
        responses
            .iter()
            .map(|response| Step::Respond((*response).to_owned())),
    );
    steps.push(Step::Trailers(status.to_owned()));
    steps
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub method: String,
    pub payload: String,
}

#[derive(Debug, Default)]
struct MockState {
    services: BTreeMap<String, Vec<String>>,
    inputs: BTreeMap<String, MethodInput>,
    scripts: BTreeMap<String, Vec<Step>>,
    discovery_error: Option<String>,
    calls: Vec<CallRecord>,
}

/// In-memory [`Gateway`] driven by per-method scripts.
#[derive(Debug, Default)]
pub struct MockGateway {
    target: String,
    state: Mutex<MockState>,
    discovery_calls: AtomicUsize,
    steps_run: AtomicUsize,
    steps_after_cancel: AtomicUsize,
    saw_cancel: AtomicBool,
    closed: AtomicBool,
}

impl MockGateway {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_owned(),
            ..Self::default()
        }
    }

    pub fn from_catalog(target: &str, catalog: &[FakeService]) -> Self {
        let gateway = Self::new(target);
        for service in catalog {
            let methods: Vec<&str> = service.methods.iter().map(String::as_str).collect();
            gateway.add_service(&service.name, &methods);
        }
        gateway
    }

    pub fn with_service(self, service: &str, methods: &[&str]) -> Self {
        self.add_service(service, methods);
        self
    }

    pub fn with_input(self, method: &str, schema_text: &str, example_json: &str) -> Self {
        self.lock().inputs.insert(
            method.to_owned(),
            MethodInput {
                schema_text: schema_text.to_owned(),
                example_json: example_json.to_owned(),
            },
        );
        self
    }

    pub fn with_script(self, method: &str, steps: Vec<Step>) -> Self {
        self.lock().scripts.insert(method.to_owned(), steps);
        self
    }

    pub fn failing_discovery(self, message: &str) -> Self {
        self.lock().discovery_error = Some(message.to_owned());
        self
    }

    pub fn add_service(&self, service: &str, methods: &[&str]) {
        self.lock().services.insert(
            service.to_owned(),
            methods.iter().map(|method| (*method).to_owned()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    pub fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    /// Whether any call observed its cancel token firing.
    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    /// Script steps whose handler callback has returned, across all calls.
    pub fn steps_run(&self) -> usize {
        self.steps_run.load(Ordering::SeqCst)
    }

    /// Handler callbacks made after cancellation; the adapter must swallow them.
    pub fn steps_after_cancel(&self) -> usize {
        self.steps_after_cancel.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn discovery(&self) -> Result<MutexGuard<'_, MockState>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        if let Some(message) = &state.discovery_error {
            bail!("{message}");
        }
        Ok(state)
    }
}

impl Gateway for MockGateway {
    fn target(&self) -> &str {
        &self.target
    }

    fn list_services(&self) -> Result<Vec<String>> {
        Ok(self.discovery()?.services.keys().cloned().collect())
    }

    fn list_methods(&self, service: &str) -> Result<Vec<String>> {
        self.discovery()?
            .services
            .get(service)
            .cloned()
            .ok_or_else(|| anyhow!("service {service} not found"))
    }

    fn describe_method_input(&self, method: &str) -> Result<MethodInput> {
        self.discovery()?
            .inputs
            .get(method)
            .cloned()
            .ok_or_else(|| anyhow!("method {method} not found"))
    }

    fn invoke(
        &self,
        method: &str,
        payload_json: &str,
        cancel: &CancelToken,
        handler: &mut dyn InvocationHandler,
    ) -> Result<()> {
        let steps = {
            let mut state = self.lock();
            state.calls.push(CallRecord {
                method: method.to_owned(),
                payload: payload_json.to_owned(),
            });
            state
                .scripts
                .get(method)
                .cloned()
                .with_context(|| format!("no script for {method}"))?
        };

        for step in steps {
            if cancel.is_cancelled() {
                self.steps_after_cancel.fetch_add(1, Ordering::SeqCst);
            }
            match step {
                Step::Resolve => handler.on_resolve_method(),
                Step::SendHeaders => handler.on_send_headers(),
                Step::ReceiveHeaders => handler.on_receive_headers(),
                Step::Respond(payload) => handler.on_receive_response(payload),
                Step::Trailers(status) => handler.on_receive_trailers(status),
                Step::AwaitCancel => {
                    let (tx, rx) = mpsc::channel();
                    cancel.on_cancel(move || {
                        let _ = tx.send(());
                    });
                    rx.recv_timeout(CANCEL_WAIT)
                        .context("timed out waiting for cancellation")?;
                    self.saw_cancel.store(true, Ordering::SeqCst);
                }
                Step::Fail(message) => bail!("{message}"),
            }
            self.steps_run.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn temp_cache_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let cache_dir = dir.path().join("rpcdeck");
    Ok((dir, cache_dir))
}

pub fn fixture_target() -> &'static str {
    "localhost:50051"
}

/// Gateway with one `greet.Greeter` service covering unary and streaming calls.
pub fn greeter_gateway() -> MockGateway {
    MockGateway::new(fixture_target())
        .with_service(
            "greet.Greeter",
            &["greet.Greeter.SayHello", "greet.Greeter.StreamHellos"],
        )
        .with_input(
            "greet.Greeter.SayHello",
            "message HelloRequest {\n  string name = 1;\n}",
            "{\n  \"name\": \"\"\n}",
        )
        .with_input(
            "greet.Greeter.StreamHellos",
            "message HelloRequest {\n  string name = 1;\n}",
            "{\n  \"name\": \"\"\n}",
        )
        .with_script(
            "greet.Greeter.SayHello",
            unary_script("{\n  \"message\": \"hello\"\n}"),
        )
        .with_script(
            "greet.Greeter.StreamHellos",
            server_stream_script(&["{\"n\": 1}", "{\"n\": 2}", "{\"n\": 3}"], "OK"),
        )
}
