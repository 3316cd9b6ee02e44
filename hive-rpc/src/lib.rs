// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! gRPC client plumbing for Hive.
//!
//! Transport-level retry lives here so higher layers can treat an RPC call
//! as fire-and-complete and reason only about its final status.

pub mod client;
