// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Protobuf message types for Hive's worker-to-worker RPC surface.
//!
//! The messages are written out by hand with `prost` derives rather than
//! generated at build time, so building the workspace needs no `protoc`.
//! Field tags are part of the wire contract (proto package `hive.rpc`) and
//! must not be renumbered.

pub mod rpc;
