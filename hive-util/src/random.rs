// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Random byte helpers used by ID generation.

use rand::Rng;

/// Fill `buf` with random bytes from the thread-local RNG.
pub fn fill_random(buf: &mut [u8]) {
    rand::thread_rng().fill(buf);
}
