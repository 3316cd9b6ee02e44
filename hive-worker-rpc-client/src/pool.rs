// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Process-wide pool of worker clients.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use hive_common::id::WorkerId;
use hive_proto::rpc;
use hive_rpc::client::RetryConfig;

use crate::client::WorkerRpcClient;
use crate::traits::WorkerClient;

/// Builds a client for a worker address. Factories must not block; the real
/// factory hands out lazily-connecting channels, and callers may invoke the
/// pool while holding their own locks.
pub type ClientFactory = Box<dyn Fn(&rpc::Address) -> Arc<dyn WorkerClient> + Send + Sync>;

/// Shares one [`WorkerClient`] per worker across the process.
///
/// Clients are keyed by worker id: a restarted actor comes back as a new
/// worker with a new id, so a stale entry can never be handed out for the
/// new incarnation.
pub struct WorkerClientPool {
    factory: ClientFactory,
    clients: Mutex<HashMap<WorkerId, Arc<dyn WorkerClient>>>,
}

impl WorkerClientPool {
    /// Pool with a custom factory (tests inject fakes here).
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Pool producing real tonic clients with the given retry policy.
    pub fn with_retry_config(retry_config: RetryConfig) -> Self {
        Self::new(Box::new(move |addr| {
            Arc::new(WorkerRpcClient::new(addr.clone(), retry_config.clone()))
        }))
    }

    /// Get the cached client for the worker at `addr`, creating one if
    /// needed.
    pub fn get_or_connect(&self, addr: &rpc::Address) -> Arc<dyn WorkerClient> {
        let worker_id = WorkerId::from_binary(&addr.worker_id);
        let mut clients = self.clients.lock();
        clients
            .entry(worker_id)
            .or_insert_with(|| {
                tracing::debug!(
                    worker_id = %worker_id,
                    ip = %addr.ip_address,
                    port = addr.port,
                    "connecting worker client"
                );
                (self.factory)(addr)
            })
            .clone()
    }

    /// Drop the cached client for `worker_id`, if any.
    pub fn disconnect(&self, worker_id: &WorkerId) {
        if self.clients.lock().remove(worker_id).is_some() {
            tracing::debug!(worker_id = %worker_id, "disconnected worker client");
        }
    }

    /// Number of cached clients.
    pub fn size(&self) -> usize {
        self.clients.lock().len()
    }
}

impl Default for WorkerClientPool {
    fn default() -> Self {
        Self::with_retry_config(RetryConfig::default())
    }
}
