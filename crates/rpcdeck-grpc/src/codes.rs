// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tonic::{Code, Status};

/// Canonical gRPC code name, as other gRPC tooling prints it.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "Canceled",
        Code::Unknown => "Unknown",
        Code::InvalidArgument => "InvalidArgument",
        Code::DeadlineExceeded => "DeadlineExceeded",
        Code::NotFound => "NotFound",
        Code::AlreadyExists => "AlreadyExists",
        Code::PermissionDenied => "PermissionDenied",
        Code::ResourceExhausted => "ResourceExhausted",
        Code::FailedPrecondition => "FailedPrecondition",
        Code::Aborted => "Aborted",
        Code::OutOfRange => "OutOfRange",
        Code::Unimplemented => "Unimplemented",
        Code::Internal => "Internal",
        Code::Unavailable => "Unavailable",
        Code::DataLoss => "DataLoss",
        Code::Unauthenticated => "Unauthenticated",
    }
}

/// Trailer text for a finished call: the code name, plus the message when there is one.
pub fn status_text(status: &Status) -> String {
    let name = code_name(status.code());
    let message = status.message().trim();
    if message.is_empty() || status.code() == Code::Ok {
        name.to_owned()
    } else {
        format!("{name}: {message}")
    }
}
