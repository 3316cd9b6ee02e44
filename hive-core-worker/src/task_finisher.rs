// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Interface to the task completion/result subsystem.

use hive_common::id::{NodeId, TaskId, WorkerId};
use hive_common::status::HiveError;
use hive_proto::rpc;

/// Owner of submitted-task bookkeeping: result objects, retry policy, and
/// terminal states.
///
/// The submitter reports task outcomes here and never stores results itself.
/// For every submitted task it calls exactly one of
/// [`complete_pending_task`](Self::complete_pending_task),
/// [`fail_or_retry_pending_task`](Self::fail_or_retry_pending_task) (with a
/// `false` return), or [`fail_pending_task`](Self::fail_pending_task) as the
/// terminal report.
///
/// Implementations may re-enter the submitter (a retry decision resubmits
/// the task), so the submitter never invokes these methods while holding its
/// internal lock.
pub trait TaskFinisher: Send + Sync {
    /// The task's argument dependencies finished resolving (successfully or
    /// not).
    fn mark_dependencies_resolved(&self, task_id: &TaskId);

    /// The task was handed to the RPC layer, destined for `worker_id` on
    /// `node_id`.
    fn mark_task_waiting_for_execution(
        &self,
        task_id: &TaskId,
        node_id: &NodeId,
        worker_id: &WorkerId,
    );

    /// Flag the task as canceled. Returns false when the task already
    /// reached a terminal state, in which case cancellation stops here.
    fn mark_task_canceled(&self, task_id: &TaskId) -> bool;

    /// The task executed; `is_application_error` marks a user-code exception
    /// carried in the reply rather than a system failure.
    fn complete_pending_task(
        &self,
        task_id: &TaskId,
        reply: &rpc::PushTaskReply,
        addr: &rpc::Address,
        is_application_error: bool,
    );

    /// The task failed with `error_type`; the finisher decides between
    /// retrying (returns true; it will resubmit the task itself) and failing
    /// the task's result objects. `mark_task_object_failed` forces the
    /// objects to be written as failed now; `fail_immediately` skips any
    /// retry delay.
    #[allow(clippy::too_many_arguments)]
    fn fail_or_retry_pending_task(
        &self,
        task_id: &TaskId,
        error_type: rpc::ErrorType,
        status: Option<&HiveError>,
        error_info: Option<&rpc::ErrorInfo>,
        mark_task_object_failed: bool,
        fail_immediately: bool,
    ) -> bool;

    /// Terminally fail the task without consulting the retry policy.
    fn fail_pending_task(
        &self,
        task_id: &TaskId,
        error_type: rpc::ErrorType,
        status: Option<&HiveError>,
        error_info: Option<&rpc::ErrorInfo>,
    );

    /// The spec of a task that has not finished yet, if known.
    fn get_task_spec(&self, task_id: &TaskId) -> Option<rpc::TaskSpec>;
}
