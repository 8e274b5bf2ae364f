// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use prost::Message as _;
use prost_reflect::{DescriptorPool, MethodDescriptor, ServiceDescriptor};
use prost_types::FileDescriptorProto;
use std::collections::BTreeMap;
use tonic::transport::Channel;
use tonic_reflection::pb::v1alpha::ServerReflectionRequest;
use tonic_reflection::pb::v1alpha::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1alpha::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1alpha::server_reflection_response::MessageResponse;

/// A method name split into its service and method parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub service: String,
    pub method: String,
}

impl MethodRef {
    /// Path used on the wire, `/pkg.Service/Method`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// Accepts `pkg.Service/Method`, `pkg.Service.Method`, and a leading `/`.
pub fn parse_method_name(name: &str) -> Result<MethodRef> {
    let trimmed = name.trim().trim_start_matches('/');
    let split = trimmed
        .rsplit_once('/')
        .or_else(|| trimmed.rsplit_once('.'));
    match split {
        Some((service, method)) if !service.is_empty() && !method.is_empty() => Ok(MethodRef {
            service: service.to_owned(),
            method: method.to_owned(),
        }),
        _ => bail!("invalid method name {name:?}; expected package.Service/Method"),
    }
}

/// Reflection client accumulating every file it fetches into one descriptor pool.
///
/// Holds no connection; each lookup borrows the caller's channel.
pub(crate) struct Reflection {
    pool: DescriptorPool,
}

impl Reflection {
    pub(crate) fn new() -> Self {
        Self {
            pool: DescriptorPool::new(),
        }
    }

    pub(crate) async fn list_services(&self, channel: &Channel) -> Result<Vec<String>> {
        match request(channel, MessageRequest::ListServices(String::new())).await? {
            MessageResponse::ListServicesResponse(list) => {
                let mut names: Vec<String> =
                    list.service.into_iter().map(|service| service.name).collect();
                names.sort();
                Ok(names)
            }
            other => bail!("unexpected reflection response: {}", response_kind(&other)),
        }
    }

    pub(crate) async fn service(
        &mut self,
        channel: &Channel,
        name: &str,
    ) -> Result<ServiceDescriptor> {
        if self.pool.get_service_by_name(name).is_none() {
            self.load_symbol(channel, name).await?;
        }
        self.pool
            .get_service_by_name(name)
            .ok_or_else(|| anyhow!("service {name} not found"))
    }

    pub(crate) async fn method(
        &mut self,
        channel: &Channel,
        method: &MethodRef,
    ) -> Result<MethodDescriptor> {
        let service = self.service(channel, &method.service).await?;
        service
            .methods()
            .find(|candidate| candidate.name() == method.method)
            .ok_or_else(|| anyhow!("method {} not found in {}", method.method, method.service))
    }

    async fn load_symbol(&mut self, channel: &Channel, symbol: &str) -> Result<()> {
        let mut files = BTreeMap::new();
        for file in files_for(channel, MessageRequest::FileContainingSymbol(symbol.to_owned()))
            .await
            .with_context(|| format!("resolve symbol {symbol}"))?
        {
            files.insert(file.name().to_owned(), file);
        }

        loop {
            let missing: Vec<String> = files
                .values()
                .flat_map(|file| file.dependency.iter())
                .filter(|dep| {
                    !files.contains_key(*dep) && self.pool.get_file_by_name(dep).is_none()
                })
                .cloned()
                .collect();
            if missing.is_empty() {
                break;
            }
            for name in missing {
                if files.contains_key(&name) {
                    continue;
                }
                tracing::debug!(file = %name, "fetching dependency");
                for file in files_for(channel, MessageRequest::FileByFilename(name.clone()))
                    .await
                    .with_context(|| format!("fetch {name}"))?
                {
                    files.insert(file.name().to_owned(), file);
                }
                if !files.contains_key(&name) {
                    bail!("server did not return {name}");
                }
            }
        }

        add_files(&mut self.pool, files)
    }
}

async fn files_for(channel: &Channel, message: MessageRequest) -> Result<Vec<FileDescriptorProto>> {
    match request(channel, message).await? {
        MessageResponse::FileDescriptorResponse(response) => response
            .file_descriptor_proto
            .iter()
            .map(|bytes| {
                FileDescriptorProto::decode(bytes.as_slice()).context("decode file descriptor")
            })
            .collect(),
        other => bail!("unexpected reflection response: {}", response_kind(&other)),
    }
}

async fn request(channel: &Channel, message: MessageRequest) -> Result<MessageResponse> {
    let mut client = ServerReflectionClient::new(channel.clone());
    let message = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(message),
    };
    let mut responses = client
        .server_reflection_info(tokio_stream::once(message))
        .await
        .context("server reflection unavailable")?
        .into_inner();
    let response = responses
        .message()
        .await
        .context("read reflection response")?
        .ok_or_else(|| anyhow!("reflection stream closed without a response"))?;
    match response.message_response {
        Some(MessageResponse::ErrorResponse(error)) => bail!(
            "reflection error {}: {}",
            error.error_code,
            error.error_message
        ),
        Some(other) => Ok(other),
        None => bail!("empty reflection response"),
    }
}

/// Adds `files` to `pool`, each after the files it imports.
fn add_files(
    pool: &mut DescriptorPool,
    mut files: BTreeMap<String, FileDescriptorProto>,
) -> Result<()> {
    files.retain(|name, _| pool.get_file_by_name(name).is_none());
    while !files.is_empty() {
        let ready: Vec<String> = files
            .iter()
            .filter(|(_, file)| {
                file.dependency
                    .iter()
                    .all(|dep| pool.get_file_by_name(dep).is_some())
            })
            .map(|(name, _)| name.clone())
            .collect();
        if ready.is_empty() {
            let names: Vec<&str> = files.keys().map(String::as_str).collect();
            bail!("unresolvable imports among {}", names.join(", "));
        }
        for name in ready {
            if let Some(file) = files.remove(&name) {
                pool.add_file_descriptor_proto(file)
                    .with_context(|| format!("add descriptor {name}"))?;
            }
        }
    }
    Ok(())
}

fn response_kind(response: &MessageResponse) -> &'static str {
    match response {
        MessageResponse::FileDescriptorResponse(_) => "file descriptors",
        MessageResponse::AllExtensionNumbersResponse(_) => "extension numbers",
        MessageResponse::ListServicesResponse(_) => "service list",
        MessageResponse::ErrorResponse(_) => "error",
    }
}
