// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    pub keepalive: Option<Duration>,
    pub max_message_size: Option<usize>,
    /// Plaintext HTTP/2 instead of TLS.
    pub insecure: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: None,
            max_message_size: None,
            insecure: false,
        }
    }
}

/// URI for `target`, adding a scheme when the address has none.
pub fn endpoint_uri(target: &str, insecure: bool) -> String {
    if target.contains("://") {
        return target.to_owned();
    }
    let scheme = if insecure { "http" } else { "https" };
    format!("{scheme}://{target}")
}

fn endpoint(target: &str, options: &ConnectOptions) -> Result<Endpoint> {
    let uri = endpoint_uri(target, options.insecure);
    let mut endpoint = Endpoint::from_shared(uri.clone())
        .with_context(|| format!("invalid target address {target:?}"))?
        .connect_timeout(options.connect_timeout)
        .user_agent(format!("rpcdeck/{}", env!("CARGO_PKG_VERSION")))
        .context("set user agent")?;

    if let Some(interval) = options.keepalive {
        endpoint = endpoint
            .http2_keep_alive_interval(interval)
            .keep_alive_timeout(interval)
            .keep_alive_while_idle(true);
    }
    if !options.insecure {
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new().with_webpki_roots())
            .with_context(|| format!("configure TLS for {uri}"))?;
    }
    Ok(endpoint)
}

/// Dials `target`, failing once `connect_timeout` elapses.
pub(crate) async fn connect(target: &str, options: &ConnectOptions) -> Result<Channel> {
    let endpoint = endpoint(target, options)?;
    tracing::info!(address = %target, insecure = options.insecure, "connecting");
    let channel = tokio::time::timeout(options.connect_timeout, endpoint.connect())
        .await
        .map_err(|_| {
            anyhow!(
                "connection to {target} timed out after {:?}",
                options.connect_timeout
            )
        })?
        .with_context(|| format!("connect to {target}"))?;
    tracing::info!(address = %target, "connected");
    Ok(channel)
}
