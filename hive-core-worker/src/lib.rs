// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Worker-side task submission for Hive actors.
//!
//! [`ActorTaskSubmitter`] owns an outgoing pipeline per actor the process
//! holds a reference to: it orders submitted tasks by their per-actor
//! counter, resolves argument dependencies, pushes tasks over RPC once the
//! actor is reachable, and drives completion, retry hand-off, cancellation,
//! and kill across actor restarts and death.

pub mod actor_submit_queue;
pub mod actor_task_submitter;
pub mod dependency_resolver;
pub mod error;
pub mod task_finisher;

pub use actor_submit_queue::{
    ActorSubmitQueue, OutOfOrderActorSubmitQueue, SequentialActorSubmitQueue,
};
pub use actor_task_submitter::ActorTaskSubmitter;
pub use dependency_resolver::{DependencyResolver, LocalDependencyResolver};
pub use error::{CoreWorkerError, CoreWorkerResult};
pub use task_finisher::TaskFinisher;
