// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Hive ID types.
//!
//! IDs are fixed-size byte arrays with parent IDs embedded in the trailing
//! bytes so ownership can be recovered without a lookup:
//! - `JobId` (4 bytes)
//! - `ActorId` (16 bytes = 12 unique + 4 JobId)
//! - `TaskId` (24 bytes = 8 unique + 16 ActorId)
//! - `ObjectId` (28 bytes = 4 index + 24 TaskId)
//! - `UniqueId` / `WorkerId` / `NodeId` (28 bytes)
//!
//! Hashing uses MurmurHash64A so that IDs hash identically in every language
//! frontend that embeds this runtime.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Byte length of full-size unique IDs (`UniqueId`, `WorkerId`, `NodeId`).
pub const UNIQUE_ID_SIZE: usize = 28;

// ─── MurmurHash64A ──────────────────────────────────────────────────────────

fn murmur_hash_64a(key: &[u8], seed: u64) -> u64 {
    const M: u64 = 0xc6a4a7935bd1e995;
    const R: i32 = 47;

    let len = key.len();
    let mut h: u64 = seed ^ ((len as u64).wrapping_mul(M));

    let n_blocks = len / 8;
    for i in 0..n_blocks {
        let offset = i * 8;
        let mut k = u64::from_le_bytes(key[offset..offset + 8].try_into().unwrap());

        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = &key[n_blocks * 8..];
    let remaining = len & 7;
    if remaining >= 7 {
        h ^= (tail[6] as u64) << 48;
    }
    if remaining >= 6 {
        h ^= (tail[5] as u64) << 40;
    }
    if remaining >= 5 {
        h ^= (tail[4] as u64) << 32;
    }
    if remaining >= 4 {
        h ^= (tail[3] as u64) << 24;
    }
    if remaining >= 3 {
        h ^= (tail[2] as u64) << 16;
    }
    if remaining >= 2 {
        h ^= (tail[1] as u64) << 8;
    }
    if remaining >= 1 {
        h ^= tail[0] as u64;
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;

    h
}

// ─── ID macro ───────────────────────────────────────────────────────────────

/// Defines a fixed-size Hive ID newtype with binary/hex/random constructors,
/// a nil default (all 0xFF), and murmur-based hashing.
macro_rules! define_hive_id {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy)]
        #[repr(C)]
        pub struct $name {
            data: [u8; $size],
        }

        impl $name {
            /// Fixed byte size of this ID type.
            pub const SIZE: usize = $size;

            /// The nil ID (all 0xFF bytes).
            pub const fn nil() -> Self {
                Self {
                    data: [0xFF; $size],
                }
            }

            /// Build an ID from raw bytes. Panics if `bytes.len() != SIZE`.
            pub fn from_binary(bytes: &[u8]) -> Self {
                assert_eq!(
                    bytes.len(),
                    $size,
                    "expected {} bytes for {}, got {}",
                    $size,
                    stringify!($name),
                    bytes.len()
                );
                let mut data = [0u8; $size];
                data.copy_from_slice(bytes);
                Self { data }
            }

            /// Parse a lowercase hex string. Returns nil on malformed input.
            pub fn from_hex(hex_str: &str) -> Self {
                if hex_str.len() != $size * 2 {
                    tracing::error!(
                        "bad hex length for {}: expected {}, got {}",
                        stringify!($name),
                        $size * 2,
                        hex_str.len()
                    );
                    return Self::nil();
                }
                match hex::decode(hex_str) {
                    Ok(bytes) => Self::from_binary(&bytes),
                    Err(_) => {
                        tracing::error!("invalid hex string for {}", stringify!($name));
                        Self::nil()
                    }
                }
            }

            /// Generate a random ID.
            pub fn from_random() -> Self {
                let mut data = [0u8; $size];
                hive_util::random::fill_random(&mut data);
                Self { data }
            }

            /// Whether this is the nil ID.
            pub fn is_nil(&self) -> bool {
                self.data == [0xFF; $size]
            }

            /// Raw bytes.
            pub fn data(&self) -> &[u8; $size] {
                &self.data
            }

            /// Raw bytes as a slice.
            pub fn as_bytes(&self) -> &[u8] {
                &self.data
            }

            /// Owned copy of the bytes, as carried on the wire.
            pub fn binary(&self) -> Vec<u8> {
                self.data.to_vec()
            }

            /// Lowercase hex encoding.
            pub fn hex(&self) -> String {
                hex::encode(self.data)
            }

            /// MurmurHash64A of the bytes; stable across language frontends.
            pub fn murmur_hash(&self) -> u64 {
                murmur_hash_64a(&self.data, 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.data == other.data
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.murmur_hash().hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.data
            }
        }
    };
}

// ─── ID types ───────────────────────────────────────────────────────────────

define_hive_id!(UniqueId, UNIQUE_ID_SIZE);
define_hive_id!(JobId, 4);
define_hive_id!(ActorId, 16);
define_hive_id!(TaskId, 24);
define_hive_id!(ObjectId, 28);
define_hive_id!(WorkerId, UNIQUE_ID_SIZE);
define_hive_id!(NodeId, UNIQUE_ID_SIZE);

// ─── JobId extras ───────────────────────────────────────────────────────────

impl JobId {
    /// Build a JobId from an integer, big-endian.
    pub fn from_int(value: u32) -> Self {
        Self {
            data: value.to_be_bytes(),
        }
    }

    /// Integer value of this JobId.
    pub fn to_int(&self) -> u32 {
        u32::from_be_bytes(self.data)
    }
}

// ─── ActorId extras ─────────────────────────────────────────────────────────

impl ActorId {
    const UNIQUE_BYTES_LENGTH: usize = 12;

    /// Derive an ActorId from the creating job and task. Deterministic so
    /// every process that observes the same creation derives the same ID.
    pub fn of(job_id: &JobId, parent_task_id: &TaskId, parent_task_counter: usize) -> Self {
        let mut data = [0u8; 16];

        let mut hash_input = Vec::with_capacity(TaskId::SIZE + 8);
        hash_input.extend_from_slice(parent_task_id.as_bytes());
        hash_input.extend_from_slice(&(parent_task_counter as u64).to_le_bytes());

        let hash = murmur_hash_64a(&hash_input, 0);
        let hash_bytes = hash.to_le_bytes();
        data[..8].copy_from_slice(&hash_bytes);

        let hash2 = murmur_hash_64a(&hash_bytes, 1);
        data[8..Self::UNIQUE_BYTES_LENGTH].copy_from_slice(&hash2.to_le_bytes()[..4]);

        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(job_id.data());

        Self { data }
    }

    /// The embedded JobId (trailing 4 bytes).
    pub fn job_id(&self) -> JobId {
        JobId::from_binary(&self.data[Self::UNIQUE_BYTES_LENGTH..])
    }
}

// ─── TaskId extras ──────────────────────────────────────────────────────────

impl TaskId {
    const UNIQUE_BYTES_LENGTH: usize = 8;

    /// TaskId of the creation task of `actor_id` (unique bytes all zero).
    pub fn for_actor_creation_task(actor_id: &ActorId) -> Self {
        let mut data = [0u8; 24];
        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(actor_id.data());
        Self { data }
    }

    /// TaskId for the `parent_task_counter`-th task submitted by
    /// `parent_task_id` to `actor_id`.
    pub fn for_actor_task(
        parent_task_id: &TaskId,
        parent_task_counter: usize,
        actor_id: &ActorId,
    ) -> Self {
        let mut data = [0u8; 24];

        let mut hash_input = Vec::with_capacity(TaskId::SIZE + 8);
        hash_input.extend_from_slice(parent_task_id.as_bytes());
        hash_input.extend_from_slice(&(parent_task_counter as u64).to_le_bytes());
        let hash = murmur_hash_64a(&hash_input, 0);

        data[..Self::UNIQUE_BYTES_LENGTH].copy_from_slice(&hash.to_le_bytes());
        data[Self::UNIQUE_BYTES_LENGTH..].copy_from_slice(actor_id.data());

        Self { data }
    }

    /// The embedded ActorId (trailing 16 bytes).
    pub fn actor_id(&self) -> ActorId {
        ActorId::from_binary(&self.data[Self::UNIQUE_BYTES_LENGTH..])
    }

    /// The embedded JobId, via the ActorId.
    pub fn job_id(&self) -> JobId {
        self.actor_id().job_id()
    }

    /// Whether this is an actor creation task.
    pub fn is_for_actor_creation_task(&self) -> bool {
        self.data[..Self::UNIQUE_BYTES_LENGTH]
            .iter()
            .all(|&b| b == 0)
    }
}

// ─── ObjectId extras ────────────────────────────────────────────────────────

impl ObjectId {
    const INDEX_BYTES_LENGTH: usize = 4;

    /// ObjectId of the `index`-th return of `task_id`.
    pub fn from_index(task_id: &TaskId, index: u32) -> Self {
        let mut data = [0u8; 28];
        data[..Self::INDEX_BYTES_LENGTH].copy_from_slice(&index.to_be_bytes());
        data[Self::INDEX_BYTES_LENGTH..].copy_from_slice(task_id.data());
        Self { data }
    }

    /// Return index within the producing task.
    pub fn object_index(&self) -> u32 {
        u32::from_be_bytes(self.data[..Self::INDEX_BYTES_LENGTH].try_into().unwrap())
    }

    /// The embedded TaskId (trailing 24 bytes).
    pub fn task_id(&self) -> TaskId {
        TaskId::from_binary(&self.data[Self::INDEX_BYTES_LENGTH..])
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
