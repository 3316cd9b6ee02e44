// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Messages of the `hive.rpc` proto package.

/// Network location of a worker process.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Address {
    #[prost(bytes = "vec", tag = "1")]
    pub node_id: Vec<u8>,
    #[prost(string, tag = "2")]
    pub ip_address: String,
    #[prost(int32, tag = "3")]
    pub port: i32,
    #[prost(bytes = "vec", tag = "4")]
    pub worker_id: Vec<u8>,
}

/// Immutable description of a single task invocation.
///
/// `actor_counter` is the per-actor submission ordinal assigned by the
/// caller; the receiving actor executes tasks in this order. `skip_execution`
/// is flipped only when a previously completed task is replayed to a
/// restarted actor so the receiver can advance its sequence bookkeeping
/// without re-running side effects.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TaskSpec {
    #[prost(bytes = "vec", tag = "1")]
    pub task_id: Vec<u8>,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(bytes = "vec", tag = "3")]
    pub actor_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub caller_worker_id: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub actor_counter: u64,
    #[prost(bool, tag = "6")]
    pub skip_execution: bool,
    /// Object IDs this task's arguments depend on.
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub dependencies: Vec<Vec<u8>>,
}

/// Request to execute a task on a specific actor worker.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushTaskRequest {
    #[prost(message, optional, tag = "1")]
    pub task_spec: Option<TaskSpec>,
    /// Identity of the worker incarnation this push is aimed at; a restarted
    /// worker rejects pushes intended for its predecessor.
    #[prost(bytes = "vec", tag = "2")]
    pub intended_worker_id: Vec<u8>,
    /// Wire-level sequence the receiver uses to order execution.
    #[prost(uint64, tag = "3")]
    pub sequence_number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PushTaskReply {
    /// True when the task ran but raised in user code; the return objects
    /// then carry the serialized exception.
    #[prost(bool, tag = "1")]
    pub is_application_error: bool,
}

/// Request to terminate an actor worker process.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KillActorRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub intended_actor_id: Vec<u8>,
    /// Kill without running cleanup handlers.
    #[prost(bool, tag = "2")]
    pub force_kill: bool,
    /// Prevent the runtime from restarting the actor afterwards.
    #[prost(bool, tag = "3")]
    pub no_restart: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KillActorReply {}

/// Best-effort request to cancel a task already pushed to a worker.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelTaskRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub intended_task_id: Vec<u8>,
    #[prost(bool, tag = "2")]
    pub force_kill: bool,
    #[prost(bool, tag = "3")]
    pub recursive: bool,
    #[prost(bytes = "vec", tag = "4")]
    pub caller_worker_id: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelTaskReply {
    /// False when the executor could not cancel this attempt (e.g. the task
    /// is mid-execution and non-interruptible); the caller retries later.
    #[prost(bool, tag = "1")]
    pub attempt_succeeded: bool,
}

/// Why an actor died, as published with the death notification.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorDeathCause {
    #[prost(message, optional, tag = "1")]
    pub actor_died_error_context: Option<ActorDiedErrorContext>,
    /// Present when the actor was killed by the out-of-memory killer.
    #[prost(message, optional, tag = "2")]
    pub oom_context: Option<OomContext>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActorDiedErrorContext {
    #[prost(string, tag = "1")]
    pub error_message: String,
    #[prost(bytes = "vec", tag = "2")]
    pub actor_id: Vec<u8>,
    /// The node hosting the actor was preempted by the scheduler.
    #[prost(bool, tag = "3")]
    pub preempted: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OomContext {
    #[prost(string, tag = "1")]
    pub error_message: String,
    /// Skip the death-info grace period and fail dependents right away.
    #[prost(bool, tag = "2")]
    pub fail_immediately: bool,
}

/// Structured error detail attached to failed task results.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorInfo {
    #[prost(enumeration = "ErrorType", tag = "1")]
    pub error_type: i32,
    #[prost(string, tag = "2")]
    pub error_message: String,
    #[prost(message, optional, tag = "3")]
    pub actor_died_error: Option<ActorDeathCause>,
}

/// Task failure classes reported to result consumers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum ErrorType {
    ActorDied = 0,
    TaskCancelled = 1,
    DependencyResolutionFailed = 2,
}

/// Actor lifecycle states as published by the actor directory.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum ActorState {
    PendingCreation = 0,
    Alive = 1,
    Restarting = 2,
    Dead = 3,
}

impl ErrorInfo {
    /// Whether this error demands immediate failure of dependents, bypassing
    /// any death-info grace period (OOM kills request this).
    pub fn fail_immediately(&self) -> bool {
        self.actor_died_error
            .as_ref()
            .and_then(|cause| cause.oom_context.as_ref())
            .map(|oom| oom.fail_immediately)
            .unwrap_or(false)
    }
}

/// Build the [`ErrorInfo`] describing a dead actor from its death cause.
pub fn error_info_from_death_cause(cause: Option<&ActorDeathCause>) -> ErrorInfo {
    let error_message = match cause {
        Some(c) => c
            .oom_context
            .as_ref()
            .map(|oom| oom.error_message.clone())
            .or_else(|| {
                c.actor_died_error_context
                    .as_ref()
                    .map(|ctx| ctx.error_message.clone())
            })
            .unwrap_or_else(|| "The actor is dead.".to_string()),
        None => "The actor is dead.".to_string(),
    };
    ErrorInfo {
        error_type: ErrorType::ActorDied as i32,
        error_message,
        actor_died_error: cause.cloned(),
    }
}
