// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Per-actor ordered stores of pending tasks.
//!
//! Positions are the caller-assigned per-actor counters; each position is
//! occupied at most once at a time. A queue tracks which positions have
//! their dependencies resolved and decides which task is dispatched next.

use std::collections::{BTreeMap, BTreeSet};

use hive_common::id::TaskId;
use hive_proto::rpc;

/// Ordered store of tasks pending dispatch to one actor.
pub trait ActorSubmitQueue: Send {
    /// Insert a task at `position`. Returns false if the position is already
    /// occupied; callers treat that as a fatal programming error.
    fn emplace(&mut self, position: u64, task_spec: rpc::TaskSpec) -> bool;

    /// Whether `position` currently holds a pending task.
    fn contains(&self, position: u64) -> bool;

    /// The pending task at `position` and whether its dependencies resolved.
    fn get(&self, position: u64) -> Option<(&rpc::TaskSpec, bool)>;

    /// The task at `position` may now be dispatched.
    fn mark_dependency_resolved(&mut self, position: u64);

    /// Dependency resolution failed; drop the entry. The caller fails the
    /// task through the task finisher.
    fn mark_dependency_failed(&mut self, position: u64);

    /// Drop the entry at `position` so it is never dispatched, resolved or
    /// not. The caller fails the task through the task finisher.
    fn mark_task_canceled(&mut self, position: u64);

    /// Record a terminal outcome for `position` so ordering bookkeeping can
    /// advance.
    fn mark_task_completed(&mut self, position: u64, task_spec: &rpc::TaskSpec);

    /// The next task eligible for dispatch in this queue's order, removed
    /// from the pending set. The bool asks the RPC layer to bypass its own
    /// per-actor ordering queue.
    fn pop_next_task_to_send(&mut self) -> Option<(rpc::TaskSpec, bool)>;

    /// Tasks that completed out of position order and must be replayed to a
    /// new incarnation with `skip_execution` so the receiver's sequence
    /// bookkeeping can advance past them. Drains the tracked set.
    fn pop_all_out_of_order_completed_tasks(&mut self) -> Vec<(u64, rpc::TaskSpec)>;

    /// The wire-level sequence number the receiver orders execution by.
    fn sequence_number(&self, task_spec: &rpc::TaskSpec) -> u64;

    /// Drop every pending task, returning the task ids so the caller can
    /// fail them.
    fn clear_all_tasks(&mut self) -> Vec<TaskId>;

    /// A new connection to the actor was established.
    fn on_client_connected(&mut self);

    /// Number of pending tasks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strict-FIFO queue: a task is dispatched only once every earlier position
/// has been dispatched or vacated.
///
/// `next_send_position` is the lowest position never yet sent. Cancellation
/// and dependency failure vacate a position without sending it; vacated
/// positions are skipped when the cursor reaches them. A task re-submitted
/// below the cursor (a retry of an already-sent position) is dispatched
/// immediately with the bypass bit set, since the receiver has already
/// ordered past it.
pub struct SequentialActorSubmitQueue {
    /// position -> (spec, dependencies resolved).
    requests: BTreeMap<u64, (rpc::TaskSpec, bool)>,
    next_send_position: u64,
    vacated: BTreeSet<u64>,
}

impl SequentialActorSubmitQueue {
    pub fn new() -> Self {
        Self {
            requests: BTreeMap::new(),
            next_send_position: 0,
            vacated: BTreeSet::new(),
        }
    }

    fn vacate(&mut self, position: u64) {
        if position == self.next_send_position {
            self.next_send_position += 1;
            self.skip_vacated();
        } else if position > self.next_send_position {
            self.vacated.insert(position);
        }
    }

    fn skip_vacated(&mut self) {
        while self.vacated.remove(&self.next_send_position) {
            self.next_send_position += 1;
        }
    }
}

impl Default for SequentialActorSubmitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSubmitQueue for SequentialActorSubmitQueue {
    fn emplace(&mut self, position: u64, task_spec: rpc::TaskSpec) -> bool {
        self.requests.insert(position, (task_spec, false)).is_none()
    }

    fn contains(&self, position: u64) -> bool {
        self.requests.contains_key(&position)
    }

    fn get(&self, position: u64) -> Option<(&rpc::TaskSpec, bool)> {
        self.requests
            .get(&position)
            .map(|(spec, resolved)| (spec, *resolved))
    }

    fn mark_dependency_resolved(&mut self, position: u64) {
        if let Some(entry) = self.requests.get_mut(&position) {
            entry.1 = true;
        }
    }

    fn mark_dependency_failed(&mut self, position: u64) {
        if self.requests.remove(&position).is_some() {
            self.vacate(position);
        }
    }

    fn mark_task_canceled(&mut self, position: u64) {
        if self.requests.remove(&position).is_some() {
            self.vacate(position);
        }
    }

    fn mark_task_completed(&mut self, _position: u64, _task_spec: &rpc::TaskSpec) {}

    fn pop_next_task_to_send(&mut self) -> Option<(rpc::TaskSpec, bool)> {
        self.skip_vacated();
        let (&position, &(_, resolved)) = self.requests.iter().next()?;
        if position > self.next_send_position || !resolved {
            return None;
        }
        let (spec, _) = self.requests.remove(&position).unwrap();
        let skip_queue = position < self.next_send_position;
        if !skip_queue {
            self.next_send_position = position + 1;
            self.skip_vacated();
        }
        Some((spec, skip_queue))
    }

    fn pop_all_out_of_order_completed_tasks(&mut self) -> Vec<(u64, rpc::TaskSpec)> {
        Vec::new()
    }

    fn sequence_number(&self, task_spec: &rpc::TaskSpec) -> u64 {
        task_spec.actor_counter
    }

    fn clear_all_tasks(&mut self) -> Vec<TaskId> {
        self.vacated.clear();
        std::mem::take(&mut self.requests)
            .into_values()
            .map(|(spec, _)| TaskId::from_binary(&spec.task_id))
            .collect()
    }

    fn on_client_connected(&mut self) {}

    fn len(&self) -> usize {
        self.requests.len()
    }
}

/// Queue for actors that execute in any order: every resolved task is
/// eligible immediately.
///
/// Completions are still tracked against a position cursor so that, on
/// reconnect, tasks that completed ahead of an unfinished lower position can
/// be replayed with `skip_execution` and the new incarnation's sequence
/// bookkeeping does not wait on them.
pub struct OutOfOrderActorSubmitQueue {
    /// position -> spec, dependencies not yet resolved.
    pending: BTreeMap<u64, rpc::TaskSpec>,
    /// position -> spec, resolved and awaiting dispatch.
    ready: BTreeMap<u64, rpc::TaskSpec>,
    /// Lowest position with no recorded completion.
    next_completed_position: u64,
    out_of_order_completed: BTreeMap<u64, rpc::TaskSpec>,
}

impl OutOfOrderActorSubmitQueue {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            ready: BTreeMap::new(),
            next_completed_position: 0,
            out_of_order_completed: BTreeMap::new(),
        }
    }
}

impl Default for OutOfOrderActorSubmitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSubmitQueue for OutOfOrderActorSubmitQueue {
    fn emplace(&mut self, position: u64, task_spec: rpc::TaskSpec) -> bool {
        if self.ready.contains_key(&position) {
            return false;
        }
        self.pending.insert(position, task_spec).is_none()
    }

    fn contains(&self, position: u64) -> bool {
        self.pending.contains_key(&position) || self.ready.contains_key(&position)
    }

    fn get(&self, position: u64) -> Option<(&rpc::TaskSpec, bool)> {
        if let Some(spec) = self.pending.get(&position) {
            return Some((spec, false));
        }
        self.ready.get(&position).map(|spec| (spec, true))
    }

    fn mark_dependency_resolved(&mut self, position: u64) {
        if let Some(spec) = self.pending.remove(&position) {
            self.ready.insert(position, spec);
        }
    }

    fn mark_dependency_failed(&mut self, position: u64) {
        self.pending.remove(&position);
        self.ready.remove(&position);
    }

    fn mark_task_canceled(&mut self, position: u64) {
        self.pending.remove(&position);
        self.ready.remove(&position);
    }

    fn mark_task_completed(&mut self, position: u64, task_spec: &rpc::TaskSpec) {
        if position == self.next_completed_position {
            self.next_completed_position += 1;
            while self
                .out_of_order_completed
                .remove(&self.next_completed_position)
                .is_some()
            {
                self.next_completed_position += 1;
            }
        } else if position > self.next_completed_position {
            self.out_of_order_completed
                .insert(position, task_spec.clone());
        }
    }

    fn pop_next_task_to_send(&mut self) -> Option<(rpc::TaskSpec, bool)> {
        let (&position, _) = self.ready.iter().next()?;
        let spec = self.ready.remove(&position).unwrap();
        Some((spec, false))
    }

    fn pop_all_out_of_order_completed_tasks(&mut self) -> Vec<(u64, rpc::TaskSpec)> {
        std::mem::take(&mut self.out_of_order_completed)
            .into_iter()
            .collect()
    }

    fn sequence_number(&self, task_spec: &rpc::TaskSpec) -> u64 {
        task_spec.actor_counter
    }

    fn clear_all_tasks(&mut self) -> Vec<TaskId> {
        self.out_of_order_completed.clear();
        std::mem::take(&mut self.pending)
            .into_values()
            .chain(std::mem::take(&mut self.ready).into_values())
            .map(|spec| TaskId::from_binary(&spec.task_id))
            .collect()
    }

    fn on_client_connected(&mut self) {}

    fn len(&self) -> usize {
        self.pending.len() + self.ready.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_common::id::{ActorId, JobId, TaskId};

    fn make_spec(counter: u64) -> rpc::TaskSpec {
        let actor_id = ActorId::of(&JobId::from_int(1), &TaskId::nil(), 0);
        rpc::TaskSpec {
            task_id: TaskId::for_actor_task(&TaskId::nil(), counter as usize, &actor_id)
                .binary(),
            name: format!("task_{counter}"),
            actor_id: actor_id.binary(),
            actor_counter: counter,
            ..Default::default()
        }
    }

    // ── Sequential ───────────────────────────────────────────────────

    #[test]
    fn test_sequential_dispatches_in_order() {
        let mut queue = SequentialActorSubmitQueue::new();
        assert!(queue.emplace(0, make_spec(0)));
        assert!(queue.emplace(1, make_spec(1)));

        // Resolving position 1 first must not unblock it.
        queue.mark_dependency_resolved(1);
        assert!(queue.pop_next_task_to_send().is_none());

        queue.mark_dependency_resolved(0);
        let (spec, skip) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 0);
        assert!(!skip);
        let (spec, skip) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 1);
        assert!(!skip);
        assert!(queue.pop_next_task_to_send().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sequential_duplicate_position_rejected() {
        let mut queue = SequentialActorSubmitQueue::new();
        assert!(queue.emplace(3, make_spec(3)));
        assert!(!queue.emplace(3, make_spec(3)));
    }

    #[test]
    fn test_sequential_canceled_head_does_not_stall() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));
        queue.mark_dependency_resolved(1);

        queue.mark_task_canceled(0);
        let (spec, _) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 1);
    }

    #[test]
    fn test_sequential_vacated_gap_above_cursor() {
        let mut queue = SequentialActorSubmitQueue::new();
        for counter in 0..3 {
            queue.emplace(counter, make_spec(counter));
            queue.mark_dependency_resolved(counter);
        }
        // Send 0, cancel 1, then 2 must still go out.
        assert_eq!(queue.pop_next_task_to_send().unwrap().0.actor_counter, 0);
        queue.mark_task_canceled(1);
        assert_eq!(queue.pop_next_task_to_send().unwrap().0.actor_counter, 2);
    }

    #[test]
    fn test_sequential_dependency_failure_vacates() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));
        queue.mark_dependency_resolved(1);

        queue.mark_dependency_failed(0);
        assert!(!queue.contains(0));
        assert_eq!(queue.pop_next_task_to_send().unwrap().0.actor_counter, 1);
    }

    #[test]
    fn test_sequential_resubmit_below_cursor_bypasses() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.mark_dependency_resolved(0);
        assert_eq!(queue.pop_next_task_to_send().unwrap().0.actor_counter, 0);

        // The push failed and the task is resubmitted at its old position.
        queue.emplace(0, make_spec(0));
        queue.mark_dependency_resolved(0);
        let (spec, skip) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 0);
        assert!(skip);

        // Progress at the cursor is unaffected.
        queue.emplace(1, make_spec(1));
        queue.mark_dependency_resolved(1);
        let (spec, skip) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 1);
        assert!(!skip);
    }

    #[test]
    fn test_sequential_unresolved_head_blocks_resubmit_behind_it() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        assert!(queue.pop_next_task_to_send().is_none());
        assert!(queue.contains(0));
    }

    #[test]
    fn test_sequential_clear_all_returns_ids() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));
        let ids = queue.clear_all_tasks();
        assert_eq!(ids.len(), 2);
        assert!(queue.is_empty());
        assert!(!queue.contains(0));
    }

    #[test]
    fn test_sequential_no_out_of_order_replay() {
        let mut queue = SequentialActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.mark_task_completed(0, &make_spec(0));
        assert!(queue.pop_all_out_of_order_completed_tasks().is_empty());
    }

    // ── Out of order ─────────────────────────────────────────────────

    #[test]
    fn test_out_of_order_dispatches_any_resolved() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));

        queue.mark_dependency_resolved(1);
        let (spec, skip) = queue.pop_next_task_to_send().unwrap();
        assert_eq!(spec.actor_counter, 1);
        assert!(!skip);
        assert!(queue.pop_next_task_to_send().is_none());

        queue.mark_dependency_resolved(0);
        assert_eq!(queue.pop_next_task_to_send().unwrap().0.actor_counter, 0);
    }

    #[test]
    fn test_out_of_order_get_reflects_resolution() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        queue.emplace(5, make_spec(5));
        assert_eq!(queue.get(5).unwrap().1, false);
        queue.mark_dependency_resolved(5);
        assert_eq!(queue.get(5).unwrap().1, true);
        assert!(queue.contains(5));
        assert!(queue.get(6).is_none());
    }

    #[test]
    fn test_out_of_order_completion_tracking() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        // Position 1 completes while 0 is still outstanding.
        queue.mark_task_completed(1, &make_spec(1));
        let replay = queue.pop_all_out_of_order_completed_tasks();
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].0, 1);
        // Drained.
        assert!(queue.pop_all_out_of_order_completed_tasks().is_empty());
    }

    #[test]
    fn test_out_of_order_cursor_drains_consecutive() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        queue.mark_task_completed(1, &make_spec(1));
        queue.mark_task_completed(2, &make_spec(2));
        // Completing 0 drains the whole run; nothing is left to replay.
        queue.mark_task_completed(0, &make_spec(0));
        assert!(queue.pop_all_out_of_order_completed_tasks().is_empty());
    }

    #[test]
    fn test_out_of_order_cancel_removes_from_both_phases() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));
        queue.mark_dependency_resolved(1);

        queue.mark_task_canceled(0);
        queue.mark_task_canceled(1);
        assert!(queue.is_empty());
        assert!(queue.pop_next_task_to_send().is_none());
    }

    #[test]
    fn test_out_of_order_clear_all_returns_both_phases() {
        let mut queue = OutOfOrderActorSubmitQueue::new();
        queue.emplace(0, make_spec(0));
        queue.emplace(1, make_spec(1));
        queue.mark_dependency_resolved(0);
        let ids = queue.clear_all_tasks();
        assert_eq!(ids.len(), 2);
        assert!(queue.is_empty());
    }
}
