// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Common types for Hive: IDs, the status/error model, configuration, and
//! async runtime helpers.

pub mod config;
pub mod id;
pub mod runtime;
pub mod status;
