// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! RPC client for Hive actor workers.
//!
//! [`WorkerClient`] is the interface the task submitter talks to; the real
//! implementation speaks gRPC via tonic, and tests substitute fakes. The
//! [`WorkerClientPool`] shares one client per worker across the process.

pub mod client;
pub mod pool;
pub mod traits;

pub use client::WorkerRpcClient;
pub use pool::{ClientFactory, WorkerClientPool};
pub use traits::WorkerClient;
