//! TTL memoization of successful tool results.
//!
//! Entries are keyed by tool name and the canonical JSON form of the
//! arguments, so key order in the caller's object does not matter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tcommon::Clock;

use crate::ToolError;

type CacheKey = (String, String);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: Value,
    /// `None` when the TTL reaches past representable time.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

pub struct ResultCache {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<CacheKey, CacheEntry>>, ToolError> {
        self.entries
            .lock()
            .map_err(|_| ToolError::internal("result cache lock poisoned"))
    }

    pub fn get(&self, tool_name: &str, args: &Value) -> Result<Option<Value>, ToolError> {
        let key = cache_key(tool_name, args);
        let now = self.clock.now();
        let mut entries = self.entries()?;

        match entries.get(&key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.result.clone())),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores `result` and drops every expired entry; a zero `ttl` stores
    /// nothing.
    pub fn put(
        &self,
        tool_name: &str,
        args: &Value,
        result: Value,
        ttl: Duration,
    ) -> Result<(), ToolError> {
        if ttl.is_zero() {
            return Ok(());
        }

        let now = self.clock.now();
        let expires_at = now.checked_add(ttl);
        let mut entries = self.entries()?;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(cache_key(tool_name, args), CacheEntry { result, expires_at });
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ToolError> {
        self.entries()?.clear();
        Ok(())
    }

    pub fn clear_tool(&self, tool_name: &str) -> Result<usize, ToolError> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|(name, _), _| name != tool_name);
        Ok(before - entries.len())
    }

    /// Number of live entries; expired entries are purged first.
    pub fn len(&self) -> Result<usize, ToolError> {
        let now = self.clock.now();
        let mut entries = self.entries()?;
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, ToolError> {
        Ok(self.len()? == 0)
    }
}

fn cache_key(tool_name: &str, args: &Value) -> CacheKey {
    (tool_name.to_string(), canonical_args(args))
}

/// Serializes `args` with object keys sorted at every depth.
pub fn canonical_args(args: &Value) -> String {
    canonicalize(args).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
