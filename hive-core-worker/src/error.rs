// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Core worker error types.

use hive_common::status::HiveError;

/// Errors specific to the core worker library.
#[derive(Debug, thiserror::Error)]
pub enum CoreWorkerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("status error: {0}")]
    Status(#[from] HiveError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for core worker operations.
pub type CoreWorkerResult<T> = Result<T, CoreWorkerError>;
