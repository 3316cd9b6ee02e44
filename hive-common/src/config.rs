// Copyright 2025 The Hive Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Hive configuration.
//!
//! A plain struct with defaults, overridable from a JSON document (raw or
//! base64-encoded, as handed down by a language launcher) and from
//! `HIVE_<field_name>` environment variables.

/// Process-wide configuration knobs read by the worker library.
#[derive(Debug, Clone)]
pub struct HiveConfig {
    /// How long a task that failed with a network error is held back while
    /// waiting for the actor's death notification, before it is failed with
    /// an actor-died error. `0` disables the holding queue and fails such
    /// tasks immediately.
    pub timeout_ms_task_wait_for_death_info: u64,

    /// In-flight call count at which the submitter first warns about an
    /// actor's queue depth. The threshold doubles after each warning.
    pub actor_excess_queueing_warn_threshold: u64,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            timeout_ms_task_wait_for_death_info: 1_000,
            actor_excess_queueing_warn_threshold: 5_000,
        }
    }
}

impl HiveConfig {
    /// Parse from base64-encoded JSON.
    pub fn from_base64_json(b64: &str) -> Result<Self, String> {
        let decoded = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, b64)
            .map_err(|e| format!("base64 decode error: {e}"))?;
        let json_str =
            String::from_utf8(decoded).map_err(|e| format!("UTF-8 decode error: {e}"))?;
        Self::from_json(&json_str)
    }

    /// Parse from a JSON object; unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let map: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))?;

        let mut config = Self::default();

        macro_rules! set_field {
            ($field:ident, u64) => {
                if let Some(v) = map.get(stringify!($field)).and_then(|v| v.as_u64()) {
                    config.$field = v;
                }
            };
        }

        set_field!(timeout_ms_task_wait_for_death_info, u64);
        set_field!(actor_excess_queueing_warn_threshold, u64);

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply `HIVE_<field_name>` environment overrides.
    fn apply_env_overrides(&mut self) {
        macro_rules! env_override {
            ($field:ident, u64) => {
                let env_key = concat!("HIVE_", stringify!($field));
                if let Ok(val) = std::env::var(env_key) {
                    if let Ok(v) = val.parse::<u64>() {
                        self.$field = v;
                    }
                }
            };
        }

        env_override!(timeout_ms_task_wait_for_death_info, u64);
        env_override!(actor_excess_queueing_warn_threshold, u64);
    }
}
