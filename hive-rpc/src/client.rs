// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Retrying wrapper around a tonic channel.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::Channel;
use tonic::{Code, Status};

/// What the client currently believes about the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connected = 0,
    Disconnected = 1,
    Reconnecting = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connected,
            2 => Self::Reconnecting,
            _ => Self::Disconnected,
        }
    }
}

/// Retry policy for transient RPC failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries attempted after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub initial_delay: Duration,
    /// Cap on the per-attempt delay.
    pub max_delay: Duration,
    /// Give up once the whole call has been outstanding this long.
    pub server_unavailable_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            server_unavailable_timeout: Duration::from_secs(60),
        }
    }
}

/// A tonic channel paired with retry logic for transient failures.
///
/// Service stubs clone the channel; [`call_with_retry`](Self::call_with_retry)
/// re-issues the closure until it succeeds, fails non-transiently, exhausts
/// `max_retries`, or runs past the unavailability deadline.
#[derive(Clone)]
pub struct RetryableGrpcClient {
    channel: Channel,
    retry_config: RetryConfig,
    connection_state: Arc<AtomicU8>,
}

impl RetryableGrpcClient {
    pub fn new(channel: Channel, retry_config: RetryConfig) -> Self {
        Self {
            channel,
            retry_config,
            connection_state: Arc::new(AtomicU8::new(ConnectionState::Connected as u8)),
        }
    }

    /// The wrapped channel, for building service stubs.
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.connection_state.load(Ordering::Relaxed))
    }

    /// Whether the client believes the server is reachable.
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Create a channel that connects on first use. Panics on a malformed
    /// URI; callers pass addresses produced by the runtime itself.
    pub fn connect_lazy(addr: &str) -> Channel {
        Channel::from_shared(addr.to_string())
            .expect("invalid URI")
            .connect_lazy()
    }

    /// Run `rpc_fn` with retry on transient failure. `timeout` overrides the
    /// configured unavailability deadline. The closure is re-invoked for each
    /// attempt and must build a fresh request.
    pub async fn call_with_retry<F, Fut, T>(
        &self,
        timeout: Option<Duration>,
        rpc_fn: F,
    ) -> Result<T, Status>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, Status>>,
    {
        let timeout_duration = timeout.unwrap_or(self.retry_config.server_unavailable_timeout);
        let deadline = tokio::time::Instant::now() + timeout_duration;
        let mut delay = self.retry_config.initial_delay;
        let mut attempts = 0u32;

        loop {
            let result = rpc_fn().await;

            match &result {
                Ok(_) => {
                    self.connection_state
                        .store(ConnectionState::Connected as u8, Ordering::Relaxed);
                    return result;
                }
                Err(status) => {
                    if !is_transient(status.code()) {
                        return result;
                    }

                    attempts += 1;
                    if attempts > self.retry_config.max_retries {
                        self.connection_state
                            .store(ConnectionState::Disconnected as u8, Ordering::Relaxed);
                        return result;
                    }

                    if tokio::time::Instant::now() + delay > deadline {
                        self.connection_state
                            .store(ConnectionState::Disconnected as u8, Ordering::Relaxed);
                        return Err(Status::deadline_exceeded(format!(
                            "server unavailable after {timeout_duration:?}"
                        )));
                    }

                    self.connection_state
                        .store(ConnectionState::Reconnecting as u8, Ordering::Relaxed);

                    tracing::debug!(
                        attempts,
                        code = ?status.code(),
                        delay_ms = delay.as_millis() as u64,
                        "retrying RPC"
                    );

                    tokio::time::sleep(delay).await;

                    delay = std::cmp::min(delay * 2, self.retry_config.max_delay);
                }
            }
        }
    }
}

/// Whether a gRPC status code is worth retrying.
pub fn is_transient(code: Code) -> bool {
    matches!(
        code,
        Code::Unavailable | Code::DeadlineExceeded | Code::ResourceExhausted | Code::Aborted
    )
}
