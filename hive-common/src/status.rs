// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The Hive status/error model.
//!
//! Fallible operations return `Result<T, HiveError>`; `HiveError` carries a
//! coarse `StatusCode` so callers can branch on the failure class without
//! parsing messages.

use std::fmt;

/// Coarse failure classes. Discriminants are part of the wire contract for
/// cross-process error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum StatusCode {
    OutOfMemory = 1,
    KeyError = 2,
    Invalid = 4,
    IOError = 5,
    UnknownError = 9,
    NotImplemented = 10,
    TimedOut = 12,
    Interrupted = 13,
    NotFound = 17,
    Disconnected = 18,
    SchedulingCancelled = 19,
    AlreadyExists = 20,
    RpcError = 30,
    InvalidArgument = 34,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfMemory => "OutOfMemory",
            Self::KeyError => "KeyError",
            Self::Invalid => "Invalid",
            Self::IOError => "IOError",
            Self::UnknownError => "UnknownError",
            Self::NotImplemented => "NotImplemented",
            Self::TimedOut => "TimedOut",
            Self::Interrupted => "Interrupted",
            Self::NotFound => "NotFound",
            Self::Disconnected => "Disconnected",
            Self::SchedulingCancelled => "SchedulingCancelled",
            Self::AlreadyExists => "AlreadyExists",
            Self::RpcError => "RpcError",
            Self::InvalidArgument => "InvalidArgument",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary error type for Hive operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct HiveError {
    pub code: StatusCode,
    pub message: String,
    /// For `RpcError`, the transport-level status code.
    pub rpc_code: Option<i32>,
}

impl HiveError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            rpc_code: None,
        }
    }

    // Convenience constructors, one per code this workspace produces.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::OutOfMemory, msg)
    }
    pub fn key_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::KeyError, msg)
    }
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Invalid, msg)
    }
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::IOError, msg)
    }
    pub fn timed_out(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::TimedOut, msg)
    }
    pub fn interrupted(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Interrupted, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, msg)
    }
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::Disconnected, msg)
    }
    pub fn scheduling_cancelled(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::SchedulingCancelled, msg)
    }
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::AlreadyExists, msg)
    }
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, msg)
    }
    pub fn rpc_error(msg: impl Into<String>, rpc_code: i32) -> Self {
        Self {
            code: StatusCode::RpcError,
            message: msg.into(),
            rpc_code: Some(rpc_code),
        }
    }

    // Predicates for the codes callers branch on.
    pub fn is_io_error(&self) -> bool {
        self.code == StatusCode::IOError
    }
    pub fn is_timed_out(&self) -> bool {
        self.code == StatusCode::TimedOut
    }
    pub fn is_interrupted(&self) -> bool {
        self.code == StatusCode::Interrupted
    }
    pub fn is_disconnected(&self) -> bool {
        self.code == StatusCode::Disconnected
    }
    pub fn is_scheduling_cancelled(&self) -> bool {
        self.code == StatusCode::SchedulingCancelled
    }
    pub fn is_rpc_error(&self) -> bool {
        self.code == StatusCode::RpcError
    }
}

/// Result alias for Hive operations.
pub type HiveResult<T> = Result<T, HiveError>;
