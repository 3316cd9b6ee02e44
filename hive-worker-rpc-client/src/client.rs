// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Worker RPC client backed by tonic.
//!
//! The unary stubs are written out by hand against `tonic::client::Grpc`
//! (matching the `hive.rpc.WorkerService` method paths) so no code
//! generation step is needed. Transient transport failures are retried by
//! [`RetryableGrpcClient`]; a duplicate delivery caused by such a retry is
//! deduplicated on the receiver by sequence number.

use parking_lot::Mutex;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Code, Status};

use hive_common::status::{HiveError, HiveResult};
use hive_proto::rpc;
use hive_rpc::client::{RetryConfig, RetryableGrpcClient};

use crate::traits::WorkerClient;

/// Hand-rolled unary stub for the `hive.rpc.WorkerService` methods.
#[derive(Clone)]
struct WorkerServiceStub {
    inner: tonic::client::Grpc<Channel>,
}

impl WorkerServiceStub {
    fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    async fn unary<Req, Resp>(&mut self, req: Req, path: &'static str) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unknown(format!("worker service not ready: {e}")))?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = self
            .inner
            .unary(
                tonic::Request::new(req),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }

    async fn push_task(
        &mut self,
        req: rpc::PushTaskRequest,
    ) -> Result<rpc::PushTaskReply, Status> {
        self.unary(req, "/hive.rpc.WorkerService/PushTask").await
    }

    async fn kill_actor(
        &mut self,
        req: rpc::KillActorRequest,
    ) -> Result<rpc::KillActorReply, Status> {
        self.unary(req, "/hive.rpc.WorkerService/KillActor").await
    }

    async fn cancel_task(
        &mut self,
        req: rpc::CancelTaskRequest,
    ) -> Result<rpc::CancelTaskReply, Status> {
        self.unary(req, "/hive.rpc.WorkerService/CancelTask").await
    }
}

/// Real worker RPC client: tonic channel plus transport retry.
pub struct WorkerRpcClient {
    addr: rpc::Address,
    retry_client: RetryableGrpcClient,
    stub: Mutex<WorkerServiceStub>,
}

impl WorkerRpcClient {
    /// Create a client for the worker at `addr`. The channel connects
    /// lazily, so this never blocks.
    pub fn new(addr: rpc::Address, retry_config: RetryConfig) -> Self {
        let endpoint = format!("http://{}:{}", addr.ip_address, addr.port);
        let channel = RetryableGrpcClient::connect_lazy(&endpoint);
        Self::from_channel(addr, channel, retry_config)
    }

    /// Create from an existing channel (useful for testing).
    pub fn from_channel(addr: rpc::Address, channel: Channel, retry_config: RetryConfig) -> Self {
        Self {
            addr,
            retry_client: RetryableGrpcClient::new(channel.clone(), retry_config),
            stub: Mutex::new(WorkerServiceStub::new(channel)),
        }
    }

    /// The underlying retry client, for connection state inspection.
    pub fn retry_client(&self) -> &RetryableGrpcClient {
        &self.retry_client
    }
}

/// Map a tonic status onto the Hive status model.
fn status_to_error(status: &Status) -> HiveError {
    match status.code() {
        Code::Cancelled => HiveError::scheduling_cancelled(status.message()),
        Code::Unavailable | Code::DeadlineExceeded | Code::Aborted | Code::Unknown => {
            HiveError::io_error(status.message())
        }
        code => HiveError::rpc_error(status.message(), code as i32),
    }
}

macro_rules! impl_worker_rpc {
    ($self:ident, $method:ident, $req:expr) => {{
        let retry = &$self.retry_client;
        let stub_mutex = &$self.stub;
        retry
            .call_with_retry(None, || {
                let mut stub = stub_mutex.lock().clone();
                let req = $req.clone();
                async move { stub.$method(req).await }
            })
            .await
            .map_err(|status| status_to_error(&status))
    }};
}

#[async_trait::async_trait]
impl WorkerClient for WorkerRpcClient {
    async fn push_task(
        &self,
        req: rpc::PushTaskRequest,
        skip_queue: bool,
    ) -> HiveResult<rpc::PushTaskReply> {
        // Unary pushes go straight to the transport; there is no client-side
        // ordering queue here for `skip_queue` to bypass.
        let _ = skip_queue;
        impl_worker_rpc!(self, push_task, req)
    }

    async fn kill_actor(&self, req: rpc::KillActorRequest) -> HiveResult<rpc::KillActorReply> {
        impl_worker_rpc!(self, kill_actor, req)
    }

    async fn cancel_task(
        &self,
        req: rpc::CancelTaskRequest,
    ) -> HiveResult<rpc::CancelTaskReply> {
        impl_worker_rpc!(self, cancel_task, req)
    }

    fn addr(&self) -> rpc::Address {
        self.addr.clone()
    }
}
