// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rpcdeck_app::{CancelToken, Gateway, InvocationHandler, MethodInput};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::runtime::Runtime;
use tokio::sync::{Mutex, oneshot};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Code, Request, client::Grpc};

use crate::codec::{DynamicCodec, parse_request, render_message};
use crate::codes::{code_name, status_text};
use crate::connect::{ConnectOptions, connect};
use crate::descriptors::{Reflection, parse_method_name};
use crate::schema::{message_template, message_text};

/// [`Gateway`] over a live connection, discovering everything through server reflection.
///
/// Owns a small tokio runtime; the blocking trait methods enter it with `block_on`.
/// [`Gateway::close`] drops the gateway's channel handle, so the connection shuts down once any
/// call still in flight finishes.
pub struct ReflectionGateway {
    target: String,
    runtime: Runtime,
    channel: StdMutex<Option<Channel>>,
    reflection: Mutex<Reflection>,
    max_message_size: Option<usize>,
}

impl ReflectionGateway {
    /// Connects to `target`. Fails if the connection is not up within the connect timeout.
    pub fn connect(target: &str, options: &ConnectOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("rpcdeck-grpc")
            .enable_all()
            .build()
            .context("start gRPC runtime")?;
        let channel = runtime.block_on(connect(target, options))?;
        Ok(Self::with_channel(
            target,
            runtime,
            channel,
            options.max_message_size,
        ))
    }

    pub(crate) fn with_channel(
        target: &str,
        runtime: Runtime,
        channel: Channel,
        max_message_size: Option<usize>,
    ) -> Self {
        Self {
            target: target.to_owned(),
            runtime,
            channel: StdMutex::new(Some(channel)),
            reflection: Mutex::new(Reflection::new()),
            max_message_size,
        }
    }

    fn lock_channel(&self) -> MutexGuard<'_, Option<Channel>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A handle on the open connection; fails once the gateway is closed.
    fn channel(&self) -> Result<Channel> {
        match self.lock_channel().as_ref() {
            Some(channel) => Ok(channel.clone()),
            None => bail!("connection to {} is closed", self.target),
        }
    }

    async fn call(
        &self,
        channel: Channel,
        method: &str,
        payload_json: &str,
        handler: &mut dyn InvocationHandler,
    ) -> Result<()> {
        let method_ref = parse_method_name(method)?;
        let descriptor = self
            .reflection
            .lock()
            .await
            .method(&channel, &method_ref)
            .await?;
        handler.on_resolve_method();

        let request = parse_request(&descriptor.input(), payload_json)?;
        let path = PathAndQuery::try_from(method_ref.path())
            .with_context(|| format!("invalid method path for {method}"))?;

        let mut grpc = Grpc::new(channel);
        if let Some(limit) = self.max_message_size {
            grpc = grpc
                .max_decoding_message_size(limit)
                .max_encoding_message_size(limit);
        }
        grpc.ready()
            .await
            .map_err(|error| anyhow!("connection not ready: {error}"))?;

        handler.on_send_headers();
        let response = grpc
            .streaming(
                Request::new(tokio_stream::once(request)),
                path,
                DynamicCodec::new(descriptor.output()),
            )
            .await;
        let mut responses = match response {
            Ok(response) => response.into_inner(),
            Err(status) => {
                handler.on_receive_trailers(status_text(&status));
                return Ok(());
            }
        };
        handler.on_receive_headers();

        loop {
            match responses.message().await {
                Ok(Some(message)) => handler.on_receive_response(render_message(&message)?),
                Ok(None) => {
                    handler.on_receive_trailers(code_name(Code::Ok).to_owned());
                    return Ok(());
                }
                Err(status) => {
                    handler.on_receive_trailers(status_text(&status));
                    return Ok(());
                }
            }
        }
    }
}

impl Gateway for ReflectionGateway {
    fn target(&self) -> &str {
        &self.target
    }

    fn list_services(&self) -> Result<Vec<String>> {
        let channel = self.channel()?;
        self.runtime
            .block_on(async { self.reflection.lock().await.list_services(&channel).await })
    }

    fn list_methods(&self, service: &str) -> Result<Vec<String>> {
        let channel = self.channel()?;
        self.runtime.block_on(async {
            let descriptor = self
                .reflection
                .lock()
                .await
                .service(&channel, service)
                .await?;
            let mut methods: Vec<String> = descriptor
                .methods()
                .map(|method| format!("{}.{}", descriptor.full_name(), method.name()))
                .collect();
            methods.sort();
            Ok::<_, anyhow::Error>(methods)
        })
    }

    fn describe_method_input(&self, method: &str) -> Result<MethodInput> {
        let channel = self.channel()?;
        let method_ref = parse_method_name(method)?;
        let descriptor = self.runtime.block_on(async {
            self.reflection
                .lock()
                .await
                .method(&channel, &method_ref)
                .await
        })?;
        let input = descriptor.input();
        Ok(MethodInput {
            schema_text: message_text(&input),
            example_json: message_template(&input),
        })
    }

    fn invoke(
        &self,
        method: &str,
        payload_json: &str,
        cancel: &CancelToken,
        handler: &mut dyn InvocationHandler,
    ) -> Result<()> {
        let channel = self.channel()?;
        let (cancelled_tx, mut cancelled_rx) = oneshot::channel::<()>();
        cancel.on_cancel(move || {
            let _ = cancelled_tx.send(());
        });

        self.runtime.block_on(async {
            tokio::select! {
                result = self.call(channel, method, payload_json, handler) => result,
                Ok(()) = &mut cancelled_rx => {
                    tracing::debug!(%method, "call abandoned after cancel");
                    Ok(())
                }
            }
        })
    }

    fn close(&self) {
        if self.lock_channel().take().is_some() {
            tracing::info!(address = %self.target, "connection closed");
        }
    }
}
