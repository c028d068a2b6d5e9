//! Circuit breaker state machine.

/// The state of a circuit breaker.
///
/// State transitions:
/// ```text
/// Closed ──(max_failures consecutive failures)──► Open
/// Open ──(reset_timeout elapsed, next call)──► HalfOpen
/// HalfOpen ──(trial succeeds)──► Closed
/// HalfOpen ──(trial fails)──► Open
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CircuitState {
    /// Calls pass through; consecutive failures are counted.
    #[default]
    Closed,

    /// Calls fast-fail until the reset timeout elapses.
    Open,

    /// A single trial call is probing whether the dependency recovered.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_closed() {
        assert_eq!(CircuitState::default(), CircuitState::Closed);
    }

    #[test]
    fn display() {
        assert_eq!(CircuitState::Closed.to_string(), "Closed");
        assert_eq!(CircuitState::Open.to_string(), "Open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HalfOpen");
    }
}
