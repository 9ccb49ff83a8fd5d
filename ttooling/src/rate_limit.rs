//! Per-tool fixed-window call budgets.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tcommon::ManualClock;
//! use ttooling::{RateLimit, RateLimiter};
//!
//! let clock = Arc::new(ManualClock::new());
//! let limiter = RateLimiter::new(clock.clone());
//! let limit = RateLimit::new(1, Duration::from_secs(10));
//!
//! assert!(limiter.try_acquire("search", limit).is_ok());
//! assert!(limiter.try_acquire("search", limit).is_err());
//!
//! clock.advance(Duration::from_secs(10));
//! assert!(limiter.try_acquire("search", limit).is_ok());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tcommon::Clock;

use crate::{RateLimit, ToolError};

#[derive(Debug, Clone, Copy)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

impl WindowState {
    /// A window that ends past representable time never resets.
    fn is_current(&self, now: Instant, window: Duration) -> bool {
        self.window_start
            .checked_add(window)
            .is_none_or(|ends_at| now < ends_at)
    }
}

pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn windows(&self) -> Result<MutexGuard<'_, HashMap<String, WindowState>>, ToolError> {
        self.windows
            .lock()
            .map_err(|_| ToolError::internal("rate limiter lock poisoned"))
    }

    /// Consumes one call from the tool's current window.
    pub fn try_acquire(&self, tool_name: &str, limit: RateLimit) -> Result<(), ToolError> {
        let now = self.clock.now();
        let mut windows = self.windows()?;
        let state = windows
            .entry(tool_name.to_string())
            .or_insert(WindowState {
                window_start: now,
                count: 0,
            });

        if !state.is_current(now, limit.window) {
            *state = WindowState {
                window_start: now,
                count: 0,
            };
        }

        if state.count >= limit.max_calls {
            let retry_after = state
                .window_start
                .checked_add(limit.window)
                .map_or(Duration::MAX, |ends_at| ends_at.saturating_duration_since(now));
            return Err(ToolError::rate_limited(format!(
                "tool '{tool_name}' exceeded {} calls per {}ms window; retry in {}ms",
                limit.max_calls,
                limit.window.as_millis(),
                retry_after.as_millis()
            ))
            .with_tool_name(tool_name));
        }

        state.count += 1;
        Ok(())
    }

    pub fn remaining(&self, tool_name: &str, limit: RateLimit) -> Result<u32, ToolError> {
        let now = self.clock.now();
        let windows = self.windows()?;
        Ok(match windows.get(tool_name) {
            Some(state) if state.is_current(now, limit.window) => {
                limit.max_calls.saturating_sub(state.count)
            }
            _ => limit.max_calls,
        })
    }

    pub fn reset(&self, tool_name: &str) -> Result<(), ToolError> {
        self.windows()?.remove(tool_name);
        Ok(())
    }
}
