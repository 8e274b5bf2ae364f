// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod codec;
mod codes;
mod connect;
mod descriptors;
#[cfg(test)]
mod fixtures;
mod gateway;
mod schema;

pub use codes::{code_name, status_text};
pub use connect::{ConnectOptions, DEFAULT_CONNECT_TIMEOUT, endpoint_uri};
pub use descriptors::{MethodRef, parse_method_name};
pub use gateway::ReflectionGateway;
pub use schema::{message_template, message_text};
