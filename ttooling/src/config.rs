//! Runtime policies: rate limits, cache lifetimes, timeouts, and breaker thresholds.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use ttooling::{RateLimit, RuntimeConfig, ToolPolicy};
//!
//! let config = RuntimeConfig::default()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_tool_policy(
//!         "search",
//!         ToolPolicy::default()
//!             .with_rate_limit(RateLimit::per_minute(10))
//!             .with_cache_ttl(Duration::from_secs(300)),
//!     );
//!
//! let search = config.policy_for("search");
//! assert_eq!(search.rate_limit.max_calls, 10);
//! assert_eq!(search.cache_ttl, Duration::from_secs(300));
//! assert_eq!(config.policy_for("other").rate_limit.max_calls, 60);
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_calls: u32,
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

impl RateLimit {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    pub fn per_minute(max_calls: u32) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if self.max_calls == 0 {
            return Err(ToolError::invalid_config(
                "rate limit requires max_calls >= 1",
            ));
        }
        if self.window.is_zero() {
            return Err(ToolError::invalid_config(
                "rate limit requires a non-zero window",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitPolicy {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

impl CircuitPolicy {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if self.failure_threshold == 0 {
            return Err(ToolError::invalid_config(
                "circuit policy requires failure_threshold >= 1",
            ));
        }
        Ok(())
    }
}

/// Per-tool overrides; unset fields fall back to the runtime defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPolicy {
    pub rate_limit: Option<RateLimit>,
    pub cache_ttl: Option<Duration>,
    pub timeout: Option<Duration>,
    pub circuit: Option<CircuitPolicy>,
}

impl ToolPolicy {
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = Some(cache_ttl);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_circuit(mut self, circuit: CircuitPolicy) -> Self {
        self.circuit = Some(circuit);
        self
    }
}

/// Effective policy for one tool after applying overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub rate_limit: RateLimit,
    pub cache_ttl: Duration,
    pub timeout: Duration,
    pub circuit: CircuitPolicy,
}

impl ResolvedPolicy {
    pub fn caches_results(&self) -> bool {
        !self.cache_ttl.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub rate_limit: RateLimit,
    /// Zero disables caching unless a tool policy opts in.
    pub cache_ttl: Duration,
    pub timeout: Duration,
    pub circuit: CircuitPolicy,
    pub learning_log_capacity: usize,
    pub tools: HashMap<String, ToolPolicy>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimit::default(),
            cache_ttl: Duration::ZERO,
            timeout: Duration::from_secs(30),
            circuit: CircuitPolicy::default(),
            learning_log_capacity: 100,
            tools: HashMap::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_circuit(mut self, circuit: CircuitPolicy) -> Self {
        self.circuit = circuit;
        self
    }

    pub fn with_learning_log_capacity(mut self, capacity: usize) -> Self {
        self.learning_log_capacity = capacity;
        self
    }

    pub fn with_tool_policy(mut self, tool_name: impl Into<String>, policy: ToolPolicy) -> Self {
        self.tools.insert(tool_name.into(), policy);
        self
    }

    pub fn policy_for(&self, tool_name: &str) -> ResolvedPolicy {
        let overrides = self.tools.get(tool_name);
        ResolvedPolicy {
            rate_limit: overrides
                .and_then(|policy| policy.rate_limit)
                .unwrap_or(self.rate_limit),
            cache_ttl: overrides
                .and_then(|policy| policy.cache_ttl)
                .unwrap_or(self.cache_ttl),
            timeout: overrides
                .and_then(|policy| policy.timeout)
                .unwrap_or(self.timeout),
            circuit: overrides
                .and_then(|policy| policy.circuit)
                .unwrap_or(self.circuit),
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        if self.learning_log_capacity == 0 {
            return Err(ToolError::invalid_config(
                "runtime config requires learning_log_capacity >= 1",
            ));
        }

        validate_resolved(&self.policy_for(""), "default")?;
        for tool_name in self.tools.keys() {
            validate_resolved(&self.policy_for(tool_name), tool_name)?;
        }

        Ok(())
    }
}

fn validate_resolved(policy: &ResolvedPolicy, scope: &str) -> Result<(), ToolError> {
    let scoped = |error: ToolError| {
        ToolError::invalid_config(format!("{scope} policy: {}", error.message))
    };

    policy.rate_limit.validate().map_err(scoped)?;
    policy.circuit.validate().map_err(scoped)?;
    if policy.timeout.is_zero() {
        return Err(ToolError::invalid_config(format!(
            "{scope} policy: timeout must be non-zero"
        )));
    }
    Ok(())
}
