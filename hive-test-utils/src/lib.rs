// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Shared test helpers for Hive crates.

use hive_common::id::{ActorId, JobId, TaskId};

pub mod wait;

/// Initialize tracing for tests.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Random JobId for testing.
pub fn random_job_id() -> JobId {
    JobId::from_int(rand::random::<u16>() as u32 + 1)
}

/// Random ActorId for testing.
pub fn random_actor_id() -> ActorId {
    ActorId::of(&random_job_id(), &TaskId::from_random(), rand::random())
}
