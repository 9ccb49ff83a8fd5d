//! Per-tool circuit breakers.
//!
//! A breaker opens after `failure_threshold` consecutive failures, rejects
//! calls until `cooldown` has elapsed, then admits exactly one trial call in
//! the half-open state. The trial's outcome closes or re-opens the circuit.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use tcommon::ManualClock;
//! use ttooling::{CircuitBreaker, CircuitPolicy, CircuitState};
//!
//! let clock = Arc::new(ManualClock::new());
//! let breaker = CircuitBreaker::new(clock.clone());
//! let policy = CircuitPolicy::new(1, Duration::from_secs(5));
//!
//! breaker.record_failure("deploy", policy).expect("record");
//! assert_eq!(breaker.state("deploy").expect("state"), CircuitState::Open);
//! assert!(breaker.admit("deploy", policy).is_err());
//!
//! clock.advance(Duration::from_secs(5));
//! breaker.admit("deploy", policy).expect("trial call admitted");
//! breaker.record_success("deploy").expect("record");
//! assert_eq!(breaker.state("deploy").expect("state"), CircuitState::Closed);
//! ```

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tcommon::Clock;

use crate::{CircuitPolicy, ToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl Display for CircuitState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        })
    }
}

/// How a call was let through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Normal,
    Trial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitTransition {
    pub tool_name: String,
    pub from: CircuitState,
    pub to: CircuitState,
}

#[derive(Debug, Clone, Copy)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmitDecision {
    pub admission: Admission,
    pub transition: Option<CircuitTransition>,
}

pub struct CircuitBreaker {
    clock: Arc<dyn Clock>,
    circuits: Mutex<HashMap<String, Circuit>>,
}

impl CircuitBreaker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    fn circuits(&self) -> Result<MutexGuard<'_, HashMap<String, Circuit>>, ToolError> {
        self.circuits
            .lock()
            .map_err(|_| ToolError::internal("circuit breaker lock poisoned"))
    }

    pub fn admit(&self, tool_name: &str, policy: CircuitPolicy) -> Result<AdmitDecision, ToolError> {
        let now = self.clock.now();
        let mut circuits = self.circuits()?;
        let circuit = circuits.entry(tool_name.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed => Ok(AdmitDecision {
                admission: Admission::Normal,
                transition: None,
            }),
            CircuitState::Open => {
                // A cooldown ending past representable time keeps the
                // circuit open until it is reset.
                let reopens_at = circuit.opened_at.unwrap_or(now).checked_add(policy.cooldown);
                if reopens_at.is_none_or(|reopens_at| now < reopens_at) {
                    let retry_in = reopens_at
                        .map_or(Duration::MAX, |reopens_at| reopens_at.saturating_duration_since(now));
                    return Err(ToolError::circuit_open(format!(
                        "circuit for tool '{tool_name}' is open; retry in {}ms",
                        retry_in.as_millis()
                    ))
                    .with_tool_name(tool_name));
                }

                circuit.state = CircuitState::HalfOpen;
                circuit.trial_in_flight = true;
                Ok(AdmitDecision {
                    admission: Admission::Trial,
                    transition: Some(CircuitTransition {
                        tool_name: tool_name.to_string(),
                        from: CircuitState::Open,
                        to: CircuitState::HalfOpen,
                    }),
                })
            }
            CircuitState::HalfOpen if circuit.trial_in_flight => Err(ToolError::circuit_open(
                format!("circuit for tool '{tool_name}' is half-open with a trial call in flight"),
            )
            .with_tool_name(tool_name)),
            CircuitState::HalfOpen => {
                circuit.trial_in_flight = true;
                Ok(AdmitDecision {
                    admission: Admission::Trial,
                    transition: None,
                })
            }
        }
    }

    pub fn record_success(&self, tool_name: &str) -> Result<Option<CircuitTransition>, ToolError> {
        let mut circuits = self.circuits()?;
        let circuit = circuits.entry(tool_name.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures = 0;
                Ok(None)
            }
            CircuitState::HalfOpen => {
                *circuit = Circuit::default();
                Ok(Some(CircuitTransition {
                    tool_name: tool_name.to_string(),
                    from: CircuitState::HalfOpen,
                    to: CircuitState::Closed,
                }))
            }
            // A call admitted before the circuit opened finished late.
            CircuitState::Open => Ok(None),
        }
    }

    pub fn record_failure(
        &self,
        tool_name: &str,
        policy: CircuitPolicy,
    ) -> Result<Option<CircuitTransition>, ToolError> {
        let now = self.clock.now();
        let mut circuits = self.circuits()?;
        let circuit = circuits.entry(tool_name.to_string()).or_default();
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);

        let from = circuit.state;
        let should_open = match from {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => circuit.consecutive_failures >= policy.failure_threshold,
            CircuitState::Open => false,
        };

        if !should_open {
            return Ok(None);
        }

        circuit.state = CircuitState::Open;
        circuit.opened_at = Some(now);
        circuit.trial_in_flight = false;
        Ok(Some(CircuitTransition {
            tool_name: tool_name.to_string(),
            from,
            to: CircuitState::Open,
        }))
    }

    /// Gives back a trial slot that ended without a tool outcome, such as a cache hit.
    pub fn release_trial(&self, tool_name: &str) -> Result<(), ToolError> {
        if let Some(circuit) = self.circuits()?.get_mut(tool_name) {
            circuit.trial_in_flight = false;
        }
        Ok(())
    }

    pub fn state(&self, tool_name: &str) -> Result<CircuitState, ToolError> {
        Ok(self
            .circuits()?
            .get(tool_name)
            .map(|circuit| circuit.state)
            .unwrap_or(CircuitState::Closed))
    }

    pub fn consecutive_failures(&self, tool_name: &str) -> Result<u32, ToolError> {
        Ok(self
            .circuits()?
            .get(tool_name)
            .map(|circuit| circuit.consecutive_failures)
            .unwrap_or(0))
    }

    pub fn open_circuits(&self) -> Result<Vec<String>, ToolError> {
        let mut open: Vec<String> = self
            .circuits()?
            .iter()
            .filter(|(_, circuit)| circuit.state == CircuitState::Open)
            .map(|(name, _)| name.clone())
            .collect();
        open.sort();
        Ok(open)
    }

    pub fn reset(&self, tool_name: &str) -> Result<Option<CircuitTransition>, ToolError> {
        let previous = self.circuits()?.remove(tool_name);
        Ok(previous
            .filter(|circuit| circuit.state != CircuitState::Closed)
            .map(|circuit| CircuitTransition {
                tool_name: tool_name.to_string(),
                from: circuit.state,
                to: CircuitState::Closed,
            }))
    }
}

#[cfg(test)]
mod tests {
    use tcommon::ManualClock;

    use super::*;
    use crate::ToolErrorKind;

    fn breaker() -> (Arc<ManualClock>, CircuitBreaker) {
        let clock = Arc::new(ManualClock::new());
        let breaker = CircuitBreaker::new(clock.clone());
        (clock, breaker)
    }

    fn policy() -> CircuitPolicy {
        CircuitPolicy::new(3, Duration::from_secs(30))
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let (_clock, breaker) = breaker();

        assert_eq!(breaker.record_failure("flaky", policy()).expect("record"), None);
        assert_eq!(breaker.record_failure("flaky", policy()).expect("record"), None);
        let transition = breaker
            .record_failure("flaky", policy())
            .expect("record")
            .expect("third failure opens circuit");

        assert_eq!(transition.from, CircuitState::Closed);
        assert_eq!(transition.to, CircuitState::Open);
        assert_eq!(breaker.open_circuits().expect("open"), vec!["flaky".to_string()]);

        let error = breaker.admit("flaky", policy()).expect_err("open circuit rejects");
        assert_eq!(error.kind, ToolErrorKind::CircuitOpen);
    }

    #[test]
    fn success_resets_consecutive_failure_count() {
        let (_clock, breaker) = breaker();

        breaker.record_failure("flaky", policy()).expect("record");
        breaker.record_failure("flaky", policy()).expect("record");
        breaker.record_success("flaky").expect("record");
        breaker.record_failure("flaky", policy()).expect("record");

        assert_eq!(breaker.state("flaky").expect("state"), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures("flaky").expect("count"), 1);
    }

    #[test]
    fn cooldown_admits_single_trial_then_closes_on_success() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure("flaky", policy()).expect("record");
        }

        clock.advance(Duration::from_secs(29));
        assert!(breaker.admit("flaky", policy()).is_err());

        clock.advance(Duration::from_secs(1));
        let decision = breaker.admit("flaky", policy()).expect("trial admitted");
        assert_eq!(decision.admission, Admission::Trial);
        assert_eq!(
            decision.transition.map(|transition| transition.to),
            Some(CircuitState::HalfOpen)
        );

        let concurrent = breaker
            .admit("flaky", policy())
            .expect_err("only one trial may be in flight");
        assert!(concurrent.message.contains("half-open"));

        let closed = breaker.record_success("flaky").expect("record");
        assert_eq!(closed.map(|transition| transition.to), Some(CircuitState::Closed));
        assert_eq!(
            breaker.admit("flaky", policy()).expect("closed").admission,
            Admission::Normal
        );
        assert!(breaker.open_circuits().expect("open").is_empty());
    }

    #[test]
    fn failed_trial_reopens_immediately() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure("flaky", policy()).expect("record");
        }
        clock.advance(Duration::from_secs(30));
        breaker.admit("flaky", policy()).expect("trial admitted");

        let reopened = breaker
            .record_failure("flaky", policy())
            .expect("record")
            .expect("trial failure reopens");
        assert_eq!(reopened.from, CircuitState::HalfOpen);
        assert_eq!(breaker.state("flaky").expect("state"), CircuitState::Open);

        clock.advance(Duration::from_secs(10));
        assert!(breaker.admit("flaky", policy()).is_err());
    }

    #[test]
    fn released_trial_can_be_retaken() {
        let (clock, breaker) = breaker();
        for _ in 0..3 {
            breaker.record_failure("flaky", policy()).expect("record");
        }
        clock.advance(Duration::from_secs(30));
        breaker.admit("flaky", policy()).expect("trial admitted");
        breaker.release_trial("flaky").expect("release");

        let decision = breaker.admit("flaky", policy()).expect("trial re-admitted");
        assert_eq!(decision.admission, Admission::Trial);
        assert_eq!(decision.transition, None);
    }

    #[test]
    fn unbounded_cooldown_stays_open_until_reset() {
        let (clock, breaker) = breaker();
        let forever = CircuitPolicy::new(1, Duration::MAX);
        breaker.record_failure("flaky", forever).expect("record");

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        let error = breaker.admit("flaky", forever).expect_err("still open");
        assert_eq!(error.kind, ToolErrorKind::CircuitOpen);
        assert_eq!(breaker.state("flaky").expect("state"), CircuitState::Open);

        breaker.reset("flaky").expect("reset");
        let decision = breaker.admit("flaky", forever).expect("closed after reset");
        assert_eq!(decision.admission, Admission::Normal);
    }

    #[test]
    fn reset_closes_circuit() {
        let (_clock, breaker) = breaker();
        let single = CircuitPolicy::new(1, Duration::from_secs(60));
        breaker.record_failure("flaky", single).expect("record");

        let transition = breaker.reset("flaky").expect("reset");
        assert_eq!(transition.map(|transition| transition.from), Some(CircuitState::Open));
        assert_eq!(breaker.state("flaky").expect("state"), CircuitState::Closed);
        assert_eq!(breaker.reset("flaky").expect("reset"), None);
    }
}
