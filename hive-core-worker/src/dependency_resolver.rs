// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Dependency resolution for task arguments.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use hive_common::id::{ObjectId, TaskId};
use hive_common::status::{HiveError, HiveResult};
use hive_proto::rpc;

/// Resolves a task's argument dependencies before it may be dispatched.
///
/// `resolve_dependencies` may complete synchronously on the caller's stack
/// when nothing is missing; callers must not hold locks across the call.
#[async_trait::async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Wait until every dependency of `task_spec` is available.
    async fn resolve_dependencies(&self, task_spec: &rpc::TaskSpec) -> HiveResult<()>;

    /// Abort an outstanding resolution for `task_id`. Idempotent; a no-op if
    /// the task is unknown or already resolved.
    fn cancel_dependency_resolution(&self, task_id: &TaskId);
}

/// Resolver backed by local availability signals.
///
/// Objects become available via [`object_available`](Self::object_available)
/// (wired to the in-process object store); resolutions for missing objects
/// park on oneshot channels until then.
pub struct LocalDependencyResolver {
    available: Mutex<HashSet<ObjectId>>,
    waiting: Mutex<HashMap<ObjectId, Vec<oneshot::Sender<()>>>>,
    cancels: Mutex<HashMap<TaskId, oneshot::Sender<()>>>,
}

impl LocalDependencyResolver {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(HashSet::new()),
            waiting: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
        }
    }

    /// Signal that `object_id` is now locally available, waking all waiters.
    pub fn object_available(&self, object_id: &ObjectId) {
        self.available.lock().insert(*object_id);
        if let Some(waiters) = self.waiting.lock().remove(object_id) {
            for tx in waiters {
                let _ = tx.send(());
            }
        }
    }

    /// Number of objects with parked waiters.
    pub fn num_pending_objects(&self) -> usize {
        self.waiting.lock().len()
    }

    /// Number of resolutions that can still be canceled.
    pub fn num_pending_tasks(&self) -> usize {
        self.cancels.lock().len()
    }
}

impl Default for LocalDependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DependencyResolver for LocalDependencyResolver {
    async fn resolve_dependencies(&self, task_spec: &rpc::TaskSpec) -> HiveResult<()> {
        let task_id = TaskId::from_binary(&task_spec.task_id);
        let dependencies: Vec<ObjectId> = task_spec
            .dependencies
            .iter()
            .map(|bytes| ObjectId::from_binary(bytes))
            .collect();

        let mut receivers = Vec::new();
        {
            let available = self.available.lock();
            let mut waiting = self.waiting.lock();
            for object_id in &dependencies {
                if available.contains(object_id) {
                    continue;
                }
                let (tx, rx) = oneshot::channel();
                waiting.entry(*object_id).or_default().push(tx);
                receivers.push(rx);
            }
        }

        if receivers.is_empty() {
            // Everything is local; complete on the caller's stack.
            return Ok(());
        }

        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        self.cancels.lock().insert(task_id, cancel_tx);

        let wait_all = async {
            for rx in receivers {
                rx.await.map_err(|_| {
                    HiveError::interrupted("dependency resolution waiter dropped")
                })?;
            }
            Ok(())
        };

        let result = tokio::select! {
            _ = &mut cancel_rx => Err(HiveError::interrupted("dependency resolution canceled")),
            result = wait_all => result,
        };

        self.cancels.lock().remove(&task_id);
        result
    }

    fn cancel_dependency_resolution(&self, task_id: &TaskId) {
        // Dropping the sender fires the cancel branch of the select.
        self.cancels.lock().remove(task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn make_object_id(v: u8) -> ObjectId {
        let mut data = [0u8; 28];
        data[0] = v;
        ObjectId::from_binary(&data)
    }

    fn spec_with_deps(counter: u64, deps: &[ObjectId]) -> rpc::TaskSpec {
        rpc::TaskSpec {
            task_id: TaskId::from_random().binary(),
            name: format!("task_{counter}"),
            actor_counter: counter,
            dependencies: deps.iter().map(|d| d.binary()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_dependencies_resolves_synchronously() {
        let resolver = LocalDependencyResolver::new();
        resolver
            .resolve_dependencies(&spec_with_deps(0, &[]))
            .await
            .unwrap();
        assert_eq!(resolver.num_pending_objects(), 0);
        assert_eq!(resolver.num_pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_missing_object() {
        let resolver = Arc::new(LocalDependencyResolver::new());
        let obj = make_object_id(1);
        let spec = spec_with_deps(0, &[obj]);

        let resolver_clone = Arc::clone(&resolver);
        let handle =
            tokio::spawn(async move { resolver_clone.resolve_dependencies(&spec).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resolver.num_pending_objects(), 1);

        resolver.object_available(&obj);
        handle.await.unwrap().unwrap();
        assert_eq!(resolver.num_pending_objects(), 0);
        assert_eq!(resolver.num_pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_already_available_object_skipped() {
        let resolver = LocalDependencyResolver::new();
        let obj = make_object_id(2);
        resolver.object_available(&obj);
        resolver
            .resolve_dependencies(&spec_with_deps(0, &[obj]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_interrupts_resolution() {
        let resolver = Arc::new(LocalDependencyResolver::new());
        let obj = make_object_id(3);
        let spec = spec_with_deps(0, &[obj]);
        let task_id = TaskId::from_binary(&spec.task_id);

        let resolver_clone = Arc::clone(&resolver);
        let handle =
            tokio::spawn(async move { resolver_clone.resolve_dependencies(&spec).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        resolver.cancel_dependency_resolution(&task_id);

        let result = handle.await.unwrap();
        assert!(result.unwrap_err().is_interrupted());
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_is_noop() {
        let resolver = LocalDependencyResolver::new();
        resolver.cancel_dependency_resolution(&TaskId::from_random());
        assert_eq!(resolver.num_pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_multiple_waiters_on_same_object() {
        let resolver = Arc::new(LocalDependencyResolver::new());
        let obj = make_object_id(4);

        let r1 = Arc::clone(&resolver);
        let s1 = spec_with_deps(0, &[obj]);
        let h1 = tokio::spawn(async move { r1.resolve_dependencies(&s1).await });
        let r2 = Arc::clone(&resolver);
        let s2 = spec_with_deps(1, &[obj]);
        let h2 = tokio::spawn(async move { r2.resolve_dependencies(&s2).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resolver.num_pending_objects(), 1);
        assert_eq!(resolver.num_pending_tasks(), 2);

        resolver.object_available(&obj);
        h1.await.unwrap().unwrap();
        h2.await.unwrap().unwrap();
    }
}
