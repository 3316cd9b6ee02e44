// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Actor task submission.
//!
//! One [`ClientQueue`] per referenced actor holds the connectivity state
//! machine (alive / restarting / dead, guarded by the restart epoch), the
//! ordered submit queue, and the in-flight reply table. A single mutex
//! guards the whole table; collaborators (resolver, task finisher, RPC
//! clients) are only ever invoked with that mutex released, and in-flight
//! reply state is moved out of a queue before being failed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use hive_common::config::HiveConfig;
use hive_common::id::{ActorId, NodeId, TaskId, WorkerId};
use hive_common::runtime::PeriodicalRunner;
use hive_common::status::{HiveError, HiveResult};
use hive_proto::rpc::{self, ActorState, ErrorType};
use hive_util::time::current_time_ms;
use hive_worker_rpc_client::{WorkerClient, WorkerClientPool};

use crate::actor_submit_queue::{
    ActorSubmitQueue, OutOfOrderActorSubmitQueue, SequentialActorSubmitQueue,
};
use crate::dependency_resolver::DependencyResolver;
use crate::error::CoreWorkerResult;
use crate::task_finisher::TaskFinisher;

/// Called when an actor's in-flight queue depth crosses the warn threshold.
pub type WarnExcessQueueingHook = Box<dyn Fn(&ActorId, usize) + Send + Sync>;

/// Delay before re-sending a cancel when the actor has no client yet.
const CANCEL_RETRY_NO_CLIENT: Duration = Duration::from_millis(1_000);
/// Delay between cancel attempts the executor could not honor.
const CANCEL_RETRY_ATTEMPT_FAILED: Duration = Duration::from_millis(2_000);

/// Reply state for a task that was pushed and awaits its RPC response.
struct InflightTask {
    task_spec: rpc::TaskSpec,
    addr: rpc::Address,
}

/// Per-actor submission state.
struct ClientQueue {
    state: ActorState,
    /// Restart epoch of the incarnation this queue last heard about. Stale
    /// connect/disconnect notifications carry a lower epoch and are dropped.
    num_restarts: i64,
    /// Identity of the currently connected worker; empty without a client.
    worker_id: Vec<u8>,
    rpc_client: Option<Arc<dyn WorkerClient>>,
    submit_queue: Box<dyn ActorSubmitQueue>,
    inflight_tasks: HashMap<TaskId, InflightTask>,
    /// Tasks that failed with a network error and wait out the death-info
    /// grace period: (deadline ms, (spec, failing status)), FIFO by deadline.
    wait_for_death_info_tasks: VecDeque<(u64, (rpc::TaskSpec, HiveError))>,
    cur_pending_calls: i64,
    max_pending_calls: i64,
    fail_if_actor_unreachable: bool,
    pending_force_kill: Option<rpc::KillActorRequest>,
    death_cause: Option<rpc::ActorDeathCause>,
    preempted: bool,
}

impl ClientQueue {
    fn new(
        max_pending_calls: i64,
        execute_out_of_order: bool,
        fail_if_actor_unreachable: bool,
    ) -> Self {
        let submit_queue: Box<dyn ActorSubmitQueue> = if execute_out_of_order {
            Box::new(OutOfOrderActorSubmitQueue::new())
        } else {
            Box::new(SequentialActorSubmitQueue::new())
        };
        Self {
            state: ActorState::PendingCreation,
            num_restarts: 0,
            worker_id: Vec::new(),
            rpc_client: None,
            submit_queue,
            inflight_tasks: HashMap::new(),
            wait_for_death_info_tasks: VecDeque::new(),
            cur_pending_calls: 0,
            max_pending_calls,
            fail_if_actor_unreachable,
            pending_force_kill: None,
            death_cause: None,
            preempted: false,
        }
    }

    fn debug_string(&self) -> String {
        format!(
            "state={:?}, num_restarts={}, queued={}, inflight={}, wait_for_death_info={}, \
             pending_calls={}, max_pending_calls={}, force_kill_pending={}",
            self.state,
            self.num_restarts,
            self.submit_queue.len(),
            self.inflight_tasks.len(),
            self.wait_for_death_info_tasks.len(),
            self.cur_pending_calls,
            self.max_pending_calls,
            self.pending_force_kill.is_some(),
        )
    }
}

/// Work recorded under the lock and performed after it is released.
enum DispatchOp {
    Push {
        client: Arc<dyn WorkerClient>,
        request: rpc::PushTaskRequest,
        task_id: TaskId,
        actor_id: ActorId,
        addr: rpc::Address,
        skip_queue: bool,
    },
    /// Synthesize a network-error reply for a task that cannot be sent.
    ForceFail { task_spec: rpc::TaskSpec },
    Kill {
        client: Arc<dyn WorkerClient>,
        request: rpc::KillActorRequest,
    },
    Warn { actor_id: ActorId, num_queued: usize },
}

/// A task pulled out of the death-info grace queue by the timeout sweeper.
struct TimedOutTask {
    task_spec: rpc::TaskSpec,
    status: HiveError,
    preempted: bool,
}

struct SubmitterState {
    client_pool: Arc<WorkerClientPool>,
    resolver: Arc<dyn DependencyResolver>,
    task_finisher: Arc<dyn TaskFinisher>,
    /// How long a network-failed task waits for the actor's death
    /// notification before being failed; 0 fails it immediately.
    wait_for_death_info_timeout_ms: u64,
    warn_excess_queueing: Mutex<WarnExcessQueueingHook>,
    next_queueing_warn_threshold: AtomicU64,
    client_queues: Mutex<HashMap<ActorId, ClientQueue>>,
}

/// Submits tasks to actors this process holds references to.
///
/// Cheap to clone; clones share state. Retry timers and RPC continuations
/// capture a clone.
#[derive(Clone)]
pub struct ActorTaskSubmitter {
    inner: Arc<SubmitterState>,
}

fn queue_mut<'a>(
    queues: &'a mut HashMap<ActorId, ClientQueue>,
    actor_id: &ActorId,
) -> &'a mut ClientQueue {
    queues
        .get_mut(actor_id)
        .unwrap_or_else(|| panic!("no client queue for actor {actor_id}"))
}

fn queue_ref<'a>(
    queues: &'a HashMap<ActorId, ClientQueue>,
    actor_id: &ActorId,
) -> &'a ClientQueue {
    queues
        .get(actor_id)
        .unwrap_or_else(|| panic!("no client queue for actor {actor_id}"))
}

impl ActorTaskSubmitter {
    pub fn new(
        client_pool: Arc<WorkerClientPool>,
        resolver: Arc<dyn DependencyResolver>,
        task_finisher: Arc<dyn TaskFinisher>,
        config: &HiveConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SubmitterState {
                client_pool,
                resolver,
                task_finisher,
                wait_for_death_info_timeout_ms: config.timeout_ms_task_wait_for_death_info,
                warn_excess_queueing: Mutex::new(Box::new(|actor_id, num_queued| {
                    tracing::warn!(
                        actor_id = %actor_id,
                        num_queued,
                        "actor has a large number of in-flight tasks; is the receiver keeping up?"
                    );
                })),
                next_queueing_warn_threshold: AtomicU64::new(
                    config.actor_excess_queueing_warn_threshold,
                ),
                client_queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Replace the excess-queueing warning hook.
    pub fn with_warn_excess_queueing_hook(
        self,
        hook: impl Fn(&ActorId, usize) + Send + Sync + 'static,
    ) -> Self {
        *self.inner.warn_excess_queueing.lock() = Box::new(hook);
        self
    }

    /// Register an actor so tasks can be queued to it. Idempotent: a second
    /// registration never reconfigures the existing queue.
    pub fn add_actor_queue_if_not_exists(
        &self,
        actor_id: ActorId,
        max_pending_calls: i64,
        execute_out_of_order: bool,
        fail_if_actor_unreachable: bool,
    ) {
        let mut queues = self.inner.client_queues.lock();
        // This worker may hold multiple references to the same actor.
        tracing::info!(
            actor_id = %actor_id,
            max_pending_calls,
            "set max pending calls for actor"
        );
        queues.entry(actor_id).or_insert_with(|| {
            ClientQueue::new(
                max_pending_calls,
                execute_out_of_order,
                fail_if_actor_unreachable,
            )
        });
    }

    /// Submit a task to its actor.
    ///
    /// Always returns `Ok` once accepted; any later failure is reported
    /// asynchronously through the task finisher. The task's send slot is
    /// fixed here, before dependency resolution starts, so out-of-order
    /// resolution cannot reorder dispatch.
    pub fn submit_task(&self, task_spec: rpc::TaskSpec) -> CoreWorkerResult<()> {
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let actor_id = ActorId::from_binary(&task_spec.actor_id);
        let send_pos = task_spec.actor_counter;
        tracing::debug!(task_id = %task_id, actor_id = %actor_id, send_pos, "submitting actor task");

        let mut task_queued = false;
        {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, &actor_id);
            if queue.state != ActorState::Dead {
                assert!(
                    queue.submit_queue.emplace(send_pos, task_spec.clone()),
                    "sequence number {send_pos} reused for actor {actor_id}"
                );
                queue.cur_pending_calls += 1;
                task_queued = true;
            }
        }

        if task_queued {
            let this = self.clone();
            tokio::spawn(async move {
                // The resolver may complete on this stack; no lock is held.
                let status = this.inner.resolver.resolve_dependencies(&task_spec).await;
                this.on_dependencies_resolved(task_spec, send_pos, status);
            });
        } else {
            self.inner.task_finisher.mark_task_canceled(&task_id);
            let error_info = {
                let queues = self.inner.client_queues.lock();
                let queue = queue_ref(&queues, &actor_id);
                rpc::error_info_from_death_cause(queue.death_cause.as_ref())
            };
            let status = HiveError::io_error("canceling task of dead actor");
            let fail_immediately = error_info.fail_immediately();
            self.inner.task_finisher.fail_or_retry_pending_task(
                &task_id,
                error_info.error_type(),
                Some(&status),
                Some(&error_info),
                true,
                fail_immediately,
            );
        }

        // If dispatch later fails, the caller hears about it through the
        // task finisher.
        Ok(())
    }

    fn on_dependencies_resolved(
        &self,
        task_spec: rpc::TaskSpec,
        send_pos: u64,
        status: HiveResult<()>,
    ) {
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let actor_id = ActorId::from_binary(&task_spec.actor_id);

        self.inner.task_finisher.mark_dependencies_resolved(&task_id);

        let mut dependency_failed = false;
        let mut ops = Vec::new();
        {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, &actor_id);
            // Only dispatch if the task is still queued; the actor may have
            // died (or the task been canceled) since submission.
            if queue.submit_queue.contains(send_pos) {
                match &status {
                    Ok(()) => {
                        queue.submit_queue.mark_dependency_resolved(send_pos);
                        self.send_pending_tasks_locked(&actor_id, queue, &mut ops);
                    }
                    Err(_) => {
                        dependency_failed = true;
                        queue.submit_queue.mark_dependency_failed(send_pos);
                        queue.cur_pending_calls -= 1;
                    }
                }
            }
        }
        self.dispatch(ops);

        if dependency_failed {
            let err = status.unwrap_err();
            tracing::debug!(task_id = %task_id, error = %err, "dependency resolution failed");
            self.inner.task_finisher.fail_or_retry_pending_task(
                &task_id,
                ErrorType::DependencyResolutionFailed,
                Some(&err),
                None,
                true,
                false,
            );
        }
    }

    /// Connect (or reconnect) `actor_id` at `address`.
    ///
    /// `num_restarts` is the restart epoch carried by the notification;
    /// messages about an older incarnation are dropped.
    pub fn connect_actor(&self, actor_id: &ActorId, address: rpc::Address, num_restarts: i64) {
        tracing::debug!(
            actor_id = %actor_id,
            worker_id = %hex_prefix(&address.worker_id),
            num_restarts,
            "connecting to actor"
        );

        let mut moved_inflight = HashMap::new();
        let mut ops = Vec::new();
        {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, actor_id);

            if num_restarts < queue.num_restarts {
                tracing::info!(
                    actor_id = %actor_id,
                    "skipping connect for an incarnation that has already restarted"
                );
                return;
            }
            if let Some(client) = &queue.rpc_client {
                let connected = client.addr();
                if connected.ip_address == address.ip_address && connected.port == address.port {
                    tracing::debug!(actor_id = %actor_id, "actor already connected");
                    return;
                }
            }
            if queue.state == ActorState::Dead {
                return;
            }

            queue.num_restarts = num_restarts;
            if queue.rpc_client.is_some() {
                // Drop the client to the previous incarnation; its in-flight
                // replies are failed below, after the lock is released.
                self.disconnect_rpc_client(queue);
                moved_inflight = std::mem::take(&mut queue.inflight_tasks);
            }

            queue.state = ActorState::Alive;
            queue.worker_id = address.worker_id.clone();
            queue.rpc_client = Some(self.inner.client_pool.get_or_connect(&address));
            queue.submit_queue.on_client_connected();

            tracing::info!(
                actor_id = %actor_id,
                ip = %address.ip_address,
                port = address.port,
                "connected to actor"
            );
            self.resend_out_of_order_tasks_locked(actor_id, queue, &mut ops);
            self.send_pending_tasks_locked(actor_id, queue, &mut ops);
        }

        self.dispatch(ops);
        self.fail_inflight_tasks(moved_inflight);
    }

    /// Handle a disconnect notification: a restart in progress (`dead ==
    /// false`) or permanent death with its cause.
    pub fn disconnect_actor(
        &self,
        actor_id: &ActorId,
        num_restarts: i64,
        dead: bool,
        death_cause: Option<rpc::ActorDeathCause>,
    ) {
        tracing::debug!(actor_id = %actor_id, num_restarts, dead, "disconnecting from actor");

        let mut moved_inflight = HashMap::new();
        let mut moved_wait_for_death_info = VecDeque::new();
        let mut task_ids_to_fail = Vec::new();
        {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, actor_id);
            if !dead {
                assert!(num_restarts > 0, "restart disconnect must carry a positive epoch");
            }
            if num_restarts <= queue.num_restarts && !dead {
                tracing::info!(
                    actor_id = %actor_id,
                    "skipping disconnect for an incarnation that has already restarted"
                );
                return;
            }

            // Drop the client now. Either the actor is permanently dead or a
            // new client arrives with the next connect.
            self.disconnect_rpc_client(queue);
            moved_inflight = std::mem::take(&mut queue.inflight_tasks);

            if dead {
                queue.state = ActorState::Dead;
                queue.death_cause = death_cause.clone();
                tracing::info!(actor_id = %actor_id, "failing pending tasks of dead actor");
                task_ids_to_fail = queue.submit_queue.clear_all_tasks();
                queue.cur_pending_calls -= task_ids_to_fail.len() as i64;
                moved_wait_for_death_info =
                    std::mem::take(&mut queue.wait_for_death_info_tasks);
            } else if queue.state != ActorState::Dead {
                queue.state = ActorState::Restarting;
                queue.num_restarts = num_restarts;
            }
        }

        if !task_ids_to_fail.is_empty() || !moved_wait_for_death_info.is_empty() {
            let status = HiveError::io_error("canceling all pending tasks of dead actor");
            let error_info = rpc::error_info_from_death_cause(death_cause.as_ref());
            let error_type = error_info.error_type();
            let fail_immediately = error_info.fail_immediately();

            for task_id in &task_ids_to_fail {
                self.inner.task_finisher.mark_task_canceled(task_id);
                // The task may still be resolving dependencies.
                self.inner.resolver.cancel_dependency_resolution(task_id);
                self.inner.task_finisher.fail_or_retry_pending_task(
                    task_id,
                    error_type,
                    Some(&status),
                    Some(&error_info),
                    true,
                    fail_immediately,
                );
            }
            if !moved_wait_for_death_info.is_empty() {
                tracing::debug!(
                    actor_id = %actor_id,
                    count = moved_wait_for_death_info.len(),
                    "failing tasks that were waiting for death info"
                );
                for (_, (spec, net_err)) in &moved_wait_for_death_info {
                    self.inner.task_finisher.fail_pending_task(
                        &TaskId::from_binary(&spec.task_id),
                        error_type,
                        Some(net_err),
                        Some(&error_info),
                    );
                }
            }
        }

        self.fail_inflight_tasks(moved_inflight);
    }

    /// Queue a kill request for `actor_id`, merging with any earlier one: a
    /// forceful request upgrades a pending graceful one, and `no_restart`
    /// sticks once set on a forceful request.
    pub fn kill_actor(&self, actor_id: &ActorId, force_kill: bool, no_restart: bool) {
        let mut ops = Vec::new();
        {
            let mut queues = self.inner.client_queues.lock();
            // Only actors this worker holds a reference to can be killed.
            let queue = queue_mut(&mut queues, actor_id);
            let request = rpc::KillActorRequest {
                intended_actor_id: actor_id.binary(),
                force_kill,
                no_restart,
            };
            match &mut queue.pending_force_kill {
                None => queue.pending_force_kill = Some(request),
                Some(pending) if force_kill => {
                    pending.force_kill = true;
                    if no_restart {
                        pending.no_restart = true;
                    }
                }
                Some(_) => {}
            }
            self.send_pending_tasks_locked(actor_id, queue, &mut ops);
        }
        self.dispatch(ops);
    }

    /// Best-effort cancellation of `task_spec`.
    ///
    /// A still-queued task is failed right away; a task already sent gets a
    /// cancel RPC that is retried until the task finishes or the executor
    /// reports success. Force kill is not supported through this path; use
    /// [`kill_actor`](Self::kill_actor).
    pub fn cancel_task(&self, task_spec: rpc::TaskSpec, recursive: bool) -> CoreWorkerResult<()> {
        let force_kill = false;
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let actor_id = ActorId::from_binary(&task_spec.actor_id);
        let send_pos = task_spec.actor_counter;
        tracing::info!(
            task_id = %task_id,
            actor_id = %actor_id,
            force_kill,
            recursive,
            "canceling actor task"
        );

        // A task is in one of four states: dependencies unresolved, queued,
        // sent, or finished.

        if !self.inner.task_finisher.mark_task_canceled(&task_id) {
            tracing::debug!(task_id = %task_id, "task already finished or canceled");
            return Ok(());
        }

        let mut task_queued = false;
        let mut cancel_resolution = false;
        {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, &actor_id);
            if queue.state == ActorState::Dead {
                tracing::debug!(task_id = %task_id, "actor already dead; ignoring cancel");
                return Ok(());
            }

            if queue.submit_queue.contains(send_pos) {
                task_queued = true;
                let dependency_resolved = queue
                    .submit_queue
                    .get(send_pos)
                    .map_or(false, |(_, resolved)| resolved);
                cancel_resolution = !dependency_resolved;
                queue.submit_queue.mark_task_canceled(send_pos);
                queue.cur_pending_calls -= 1;
            }
        }

        if cancel_resolution {
            self.inner.resolver.cancel_dependency_resolution(&task_id);
        }

        if task_queued {
            // Still queued: fail it now, before it can reach the wire.
            let error_info = rpc::ErrorInfo {
                error_type: ErrorType::TaskCancelled as i32,
                error_message: format!(
                    "task {task_id} canceled before it executes on actor {actor_id}"
                ),
                actor_died_error: None,
            };
            self.inner.task_finisher.fail_or_retry_pending_task(
                &task_id,
                ErrorType::TaskCancelled,
                None,
                Some(&error_info),
                true,
                false,
            );
            return Ok(());
        }

        // The task was sent and has not finished. Cancel delivery is not
        // ordered with respect to the push, so keep retrying until the task
        // finishes or the executor confirms the attempt.
        let client = {
            let queues = self.inner.client_queues.lock();
            let queue = queue_ref(&queues, &actor_id);
            match &queue.rpc_client {
                // No client yet (actor still being created); try again later.
                None => {
                    self.retry_cancel_task(task_spec, recursive, CANCEL_RETRY_NO_CLIENT);
                    return Ok(());
                }
                Some(client) => Arc::clone(client),
            }
        };

        tracing::debug!(task_id = %task_id, "task already sent; issuing cancel RPC");
        let request = rpc::CancelTaskRequest {
            intended_task_id: task_id.binary(),
            force_kill,
            recursive,
            caller_worker_id: task_spec.caller_worker_id.clone(),
        };
        let this = self.clone();
        tokio::spawn(async move {
            let result = client.cancel_task(request).await;
            tracing::debug!(task_id = %task_id, ok = result.is_ok(), "cancel RPC replied");

            if this.inner.task_finisher.get_task_spec(&task_id).is_none() {
                tracing::debug!(task_id = %task_id, "task finished; stopping cancel retries");
                return;
            }
            let attempt_succeeded = matches!(&result, Ok(reply) if reply.attempt_succeeded);
            if !attempt_succeeded {
                this.retry_cancel_task(task_spec, recursive, CANCEL_RETRY_ATTEMPT_FAILED);
            }
        });

        // Cancellation of a sent task stays asynchronous and best-effort.
        Ok(())
    }

    fn retry_cancel_task(&self, task_spec: rpc::TaskSpec, recursive: bool, delay: Duration) {
        tracing::debug!(
            task_id = %hex_prefix(&task_spec.task_id),
            delay_ms = delay.as_millis() as u64,
            "cancel will be retried"
        );
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = this.cancel_task(task_spec, recursive);
        });
    }

    /// Fail every task whose death-info grace period has expired. Driven by
    /// an external ticker; must not be called with the submitter lock held.
    pub fn check_timeout_tasks(&self) {
        let mut timed_out = Vec::new();
        {
            let mut queues = self.inner.client_queues.lock();
            let now = current_time_ms();
            for queue in queues.values_mut() {
                while let Some((deadline, _)) = queue.wait_for_death_info_tasks.front() {
                    if *deadline >= now {
                        break;
                    }
                    let (_, (task_spec, status)) =
                        queue.wait_for_death_info_tasks.pop_front().unwrap();
                    timed_out.push(TimedOutTask {
                        task_spec,
                        status,
                        preempted: queue.preempted,
                    });
                }
            }
        }

        // The failure path may re-enter foreign code; the lock is released.
        for task in timed_out {
            self.fail_task_with_death_error(&task);
        }
    }

    /// Run [`check_timeout_tasks`](Self::check_timeout_tasks) every
    /// `interval` until the returned runner is stopped or dropped.
    pub fn start_timeout_sweeper(&self, interval: Duration) -> PeriodicalRunner {
        let this = self.clone();
        PeriodicalRunner::start(interval, move || this.check_timeout_tasks())
    }

    fn fail_task_with_death_error(&self, task: &TimedOutTask) {
        let task_id = TaskId::from_binary(&task.task_spec.task_id);
        let death_cause = rpc::ActorDeathCause {
            actor_died_error_context: Some(rpc::ActorDiedErrorContext {
                error_message: String::new(),
                actor_id: task.task_spec.actor_id.clone(),
                preempted: task.preempted,
            }),
            oom_context: None,
        };
        let error_info = rpc::ErrorInfo {
            error_type: ErrorType::ActorDied as i32,
            error_message: "Actor died.".to_string(),
            actor_died_error: Some(death_cause),
        };
        self.inner.task_finisher.fail_pending_task(
            &task_id,
            ErrorType::ActorDied,
            Some(&task.status),
            Some(&error_info),
        );
    }

    /// Record that the actor's node was preempted, for error context on
    /// subsequent death reports.
    pub fn set_preempted(&self, actor_id: &ActorId, preempted: bool) {
        let mut queues = self.inner.client_queues.lock();
        if let Some(queue) = queues.get_mut(actor_id) {
            queue.preempted = preempted;
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Whether the actor currently has a live connection.
    pub fn is_actor_alive(&self, actor_id: &ActorId) -> bool {
        let queues = self.inner.client_queues.lock();
        queues
            .get(actor_id)
            .map_or(false, |queue| queue.rpc_client.is_some())
    }

    /// Whether the actor's pending calls reached its admission limit.
    /// Advisory: submission is still accepted; callers are expected to stop
    /// submitting while this is true.
    pub fn pending_tasks_full(&self, actor_id: &ActorId) -> bool {
        let queues = self.inner.client_queues.lock();
        let queue = queue_ref(&queues, actor_id);
        queue.max_pending_calls > 0 && queue.cur_pending_calls >= queue.max_pending_calls
    }

    /// Number of tasks submitted but not yet finished for `actor_id`.
    pub fn num_pending_tasks(&self, actor_id: &ActorId) -> usize {
        let queues = self.inner.client_queues.lock();
        queue_ref(&queues, actor_id).cur_pending_calls as usize
    }

    /// Whether a queue was registered for `actor_id`.
    pub fn check_actor_exists(&self, actor_id: &ActorId) -> bool {
        self.inner.client_queues.lock().contains_key(actor_id)
    }

    /// Snapshot of the actor's submission state for debugging.
    pub fn debug_string(&self, actor_id: &ActorId) -> String {
        let queues = self.inner.client_queues.lock();
        format!(
            "Submitter debug string for actor {actor_id}: {}",
            queue_ref(&queues, actor_id).debug_string()
        )
    }

    // ── Dispatch internals ───────────────────────────────────────────

    fn disconnect_rpc_client(&self, queue: &mut ClientQueue) {
        queue.rpc_client = None;
        if !queue.worker_id.is_empty() {
            self.inner
                .client_pool
                .disconnect(&WorkerId::from_binary(&queue.worker_id));
            queue.worker_id.clear();
        }
        queue.pending_force_kill = None;
    }

    /// Collect everything currently sendable on `queue` into `ops`. Called
    /// under the lock after any event that may unblock the queue.
    fn send_pending_tasks_locked(
        &self,
        actor_id: &ActorId,
        queue: &mut ClientQueue,
        ops: &mut Vec<DispatchOp>,
    ) {
        let Some(client) = queue.rpc_client.clone() else {
            if queue.state == ActorState::Restarting && queue.fail_if_actor_unreachable {
                // Tasks submitted while the actor restarts fail immediately
                // under this policy; the synthesized replies run off-lock.
                while let Some((task_spec, _)) = queue.submit_queue.pop_next_task_to_send() {
                    ops.push(DispatchOp::ForceFail { task_spec });
                }
            }
            return;
        };

        if let Some(request) = queue.pending_force_kill.take() {
            tracing::info!(actor_id = %actor_id, "sending KillActor request");
            // Failure here is fine; it means the worker is already gone.
            ops.push(DispatchOp::Kill {
                client: Arc::clone(&client),
                request,
            });
        }

        while let Some((task_spec, skip_queue)) = queue.submit_queue.pop_next_task_to_send() {
            self.push_actor_task_locked(queue, &client, actor_id, task_spec, skip_queue, ops);
        }
    }

    /// Replay completions a restarted actor has not seen, so its sequence
    /// bookkeeping can advance without re-executing them.
    fn resend_out_of_order_tasks_locked(
        &self,
        actor_id: &ActorId,
        queue: &mut ClientQueue,
        ops: &mut Vec<DispatchOp>,
    ) {
        let client = match queue.rpc_client.clone() {
            Some(client) => client,
            None => return,
        };
        for (position, mut task_spec) in queue.submit_queue.pop_all_out_of_order_completed_tasks()
        {
            tracing::debug!(
                actor_id = %actor_id,
                position,
                "replaying completed task to restarted actor"
            );
            task_spec.skip_execution = true;
            // The replay occupies an in-flight slot until its reply lands.
            queue.cur_pending_calls += 1;
            self.push_actor_task_locked(queue, &client, actor_id, task_spec, true, ops);
        }
    }

    fn push_actor_task_locked(
        &self,
        queue: &mut ClientQueue,
        client: &Arc<dyn WorkerClient>,
        actor_id: &ActorId,
        task_spec: rpc::TaskSpec,
        skip_queue: bool,
        ops: &mut Vec<DispatchOp>,
    ) {
        assert!(
            !queue.worker_id.is_empty(),
            "pushing task for actor {actor_id} without a connected worker"
        );
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let sequence_number = queue.submit_queue.sequence_number(&task_spec);

        // The spec is copied into the request: if the push fails, the
        // original is still needed to fail or retry the task.
        let request = rpc::PushTaskRequest {
            task_spec: Some(task_spec.clone()),
            intended_worker_id: queue.worker_id.clone(),
            sequence_number,
        };

        let num_queued = queue.inflight_tasks.len();
        tracing::debug!(
            task_id = %task_id,
            actor_id = %actor_id,
            actor_counter = task_spec.actor_counter,
            sequence_number,
            num_queued,
            "pushing task to actor"
        );
        let threshold = self
            .inner
            .next_queueing_warn_threshold
            .load(Ordering::Relaxed);
        if num_queued as u64 >= threshold {
            self.inner
                .next_queueing_warn_threshold
                .store(threshold.saturating_mul(2), Ordering::Relaxed);
            ops.push(DispatchOp::Warn {
                actor_id: *actor_id,
                num_queued,
            });
        }

        let addr = client.addr();
        queue.inflight_tasks.insert(
            task_id,
            InflightTask {
                task_spec,
                addr: addr.clone(),
            },
        );
        ops.push(DispatchOp::Push {
            client: Arc::clone(client),
            request,
            task_id,
            actor_id: *actor_id,
            addr,
            skip_queue,
        });
    }

    /// Perform the side effects recorded under the lock. Never called with
    /// the lock held.
    fn dispatch(&self, ops: Vec<DispatchOp>) {
        for op in ops {
            match op {
                DispatchOp::Push {
                    client,
                    request,
                    task_id,
                    actor_id,
                    addr,
                    skip_queue,
                } => {
                    self.inner.task_finisher.mark_task_waiting_for_execution(
                        &task_id,
                        &NodeId::from_binary(&addr.node_id),
                        &WorkerId::from_binary(&addr.worker_id),
                    );
                    let this = self.clone();
                    tokio::spawn(async move {
                        let result = client.push_task(request, skip_queue).await;
                        this.on_push_task_rpc_done(task_id, actor_id, result);
                    });
                }
                DispatchOp::ForceFail { task_spec } => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        this.handle_push_task_reply(
                            Err(HiveError::io_error("The actor is temporarily unavailable.")),
                            rpc::Address::default(),
                            task_spec,
                        );
                    });
                }
                DispatchOp::Kill { client, request } => {
                    tokio::spawn(async move {
                        if let Err(err) = client.kill_actor(request).await {
                            tracing::debug!(error = %err, "KillActor RPC failed; worker is likely already dead");
                        }
                    });
                }
                DispatchOp::Warn {
                    actor_id,
                    num_queued,
                } => {
                    let hook = self.inner.warn_excess_queueing.lock();
                    (*hook)(&actor_id, num_queued);
                }
            }
        }
    }

    /// RPC-layer completion for a pushed task. Exactly one of this wrapper
    /// and the disconnect path consumes the in-flight entry; the loser of
    /// that race drops the reply.
    fn on_push_task_rpc_done(
        &self,
        task_id: TaskId,
        actor_id: ActorId,
        result: HiveResult<rpc::PushTaskReply>,
    ) {
        let inflight = {
            let mut queues = self.inner.client_queues.lock();
            let queue = queue_mut(&mut queues, &actor_id);
            match queue.inflight_tasks.remove(&task_id) {
                Some(inflight) => inflight,
                None => {
                    tracing::debug!(
                        task_id = %task_id,
                        "task already marked failed; ignoring its reply"
                    );
                    return;
                }
            }
        };
        self.handle_push_task_reply(result, inflight.addr, inflight.task_spec);
    }

    /// Invoke the reply path for every moved-out in-flight entry with a
    /// synthesized network error, so the task finisher applies its retry
    /// policy. Callers pass entries already removed from their queue; the
    /// lock is not held.
    fn fail_inflight_tasks(&self, inflight_tasks: HashMap<TaskId, InflightTask>) {
        let status = HiveError::io_error("failing all in-flight tasks due to actor state change");
        for (_, inflight) in inflight_tasks {
            self.handle_push_task_reply(Err(status.clone()), inflight.addr, inflight.task_spec);
        }
    }

    fn handle_push_task_reply(
        &self,
        result: HiveResult<rpc::PushTaskReply>,
        addr: rpc::Address,
        task_spec: rpc::TaskSpec,
    ) {
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let actor_id = ActorId::from_binary(&task_spec.actor_id);
        let actor_counter = task_spec.actor_counter;
        let task_skipped = task_spec.skip_execution;
        let mut will_retry = false;

        if task_skipped {
            // Reply for a replayed completion: the real result was already
            // reported; only the ordering bookkeeping below advances.
        } else {
            match &result {
                Ok(reply) => {
                    self.inner.task_finisher.complete_pending_task(
                        &task_id,
                        reply,
                        &addr,
                        reply.is_application_error,
                    );
                }
                Err(status) if status.is_scheduling_cancelled() => {
                    let message = format!(
                        "task {task_id} canceled on actor {actor_id} before it executed"
                    );
                    tracing::debug!("{message}");
                    let error_info = rpc::ErrorInfo {
                        error_type: ErrorType::TaskCancelled as i32,
                        error_message: message,
                        actor_died_error: None,
                    };
                    self.inner.task_finisher.fail_pending_task(
                        &task_id,
                        ErrorType::TaskCancelled,
                        None,
                        Some(&error_info),
                    );
                }
                Err(status) => {
                    // Network error: the actor may be dead, restarting, or
                    // about to be declared dead.
                    let (is_actor_dead, error_info) = {
                        let queues = self.inner.client_queues.lock();
                        let queue = queue_ref(&queues, &actor_id);
                        (
                            queue.state == ActorState::Dead,
                            rpc::error_info_from_death_cause(queue.death_cause.as_ref()),
                        )
                    };
                    let error_type = error_info.error_type();
                    let fail_immediately = error_info.fail_immediately();

                    // The task may still be resolving dependencies.
                    self.inner.resolver.cancel_dependency_resolution(&task_id);

                    will_retry = self.inner.task_finisher.fail_or_retry_pending_task(
                        &task_id,
                        error_type,
                        Some(status),
                        Some(&error_info),
                        is_actor_dead,
                        fail_immediately,
                    );

                    if !is_actor_dead && !will_retry {
                        if self.inner.wait_for_death_info_timeout_ms != 0 {
                            // Hold the task until the death notification
                            // arrives or the grace period expires.
                            let deadline = current_time_ms()
                                + self.inner.wait_for_death_info_timeout_ms;
                            let mut queues = self.inner.client_queues.lock();
                            let queue = queue_mut(&mut queues, &actor_id);
                            queue
                                .wait_for_death_info_tasks
                                .push_back((deadline, (task_spec.clone(), status.clone())));
                            tracing::info!(
                                task_id = %task_id,
                                wait_queue_size = queue.wait_for_death_info_tasks.len(),
                                "push failed with a network error; task stashed until death info arrives"
                            );
                        } else {
                            self.inner.task_finisher.fail_pending_task(
                                &task_id,
                                ErrorType::ActorDied,
                                Some(status),
                                None,
                            );
                        }
                    }
                }
            }
        }

        let mut queues = self.inner.client_queues.lock();
        let queue = queue_mut(&mut queues, &actor_id);
        if !will_retry {
            queue
                .submit_queue
                .mark_task_completed(actor_counter, &task_spec);
        }
        queue.cur_pending_calls -= 1;
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    const PREFIX_LEN: usize = 8;
    bytes
        .iter()
        .take(PREFIX_LEN)
        .map(|b| format!("{b:02x}"))
        .collect()
}
