// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async trait for per-worker RPC operations.

use hive_common::status::HiveResult;
use hive_proto::rpc;

/// RPC surface of a single actor worker.
///
/// Errors are reported as `HiveError` so callers can branch on the status
/// code: transport failures surface as `IOError`/`RpcError`, and a task
/// rejected by the receiver's scheduler surfaces as `SchedulingCancelled`.
#[async_trait::async_trait]
pub trait WorkerClient: Send + Sync {
    /// Push a task for execution. `skip_queue` asks any client-side ordering
    /// layer to bypass its per-actor queue; it is set when replaying
    /// completions to a restarted worker.
    async fn push_task(
        &self,
        req: rpc::PushTaskRequest,
        skip_queue: bool,
    ) -> HiveResult<rpc::PushTaskReply>;

    /// Terminate the worker process.
    async fn kill_actor(&self, req: rpc::KillActorRequest) -> HiveResult<rpc::KillActorReply>;

    /// Best-effort cancellation of a task already pushed to this worker.
    async fn cancel_task(&self, req: rpc::CancelTaskRequest)
        -> HiveResult<rpc::CancelTaskReply>;

    /// The address this client is connected to.
    fn addr(&self) -> rpc::Address;
}
