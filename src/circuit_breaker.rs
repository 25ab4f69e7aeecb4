use failsafe::{backoff, failure_policy, Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding one AI provider.
pub type ProviderBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Consecutive failures that open a provider's circuit.
pub const FAILURE_THRESHOLD: u32 = 5;

/// Creates a circuit breaker for provider calls so a dead provider fails fast
/// instead of holding every request for the full timeout.
///
/// # Configuration
///
/// - **Failure threshold**: 5 consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, requests pass through.
/// - **OPEN**: Too many failures, requests fail fast.
/// - **HALF_OPEN**: Testing if the provider recovered.
///
/// Clones share state, so one breaker per provider is enough for the whole process.
pub fn create_provider_circuit_breaker() -> ProviderBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(FAILURE_THRESHOLD, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_circuit_breaker_opens_after_failures() {
        let cb = create_provider_circuit_breaker();

        for _ in 0..FAILURE_THRESHOLD {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("provider down"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));

        match result {
            Err(Error::Rejected) => {}
            _ => panic!("Expected circuit to be open and reject requests"),
        }
    }

    #[test]
    fn test_circuit_breaker_success_resets_streak() {
        let cb = create_provider_circuit_breaker();

        for _ in 0..FAILURE_THRESHOLD - 1 {
            let _: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("flaky"));
        }
        let ok: Result<i32, Error<&str>> = cb.call(|| Ok::<i32, &str>(42));
        assert_eq!(ok.unwrap(), 42);

        let _: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("flaky"));
        assert!(cb.is_call_permitted());
    }

    #[test]
    fn test_clones_share_state() {
        let cb = create_provider_circuit_breaker();
        let shared = cb.clone();

        for _ in 0..FAILURE_THRESHOLD {
            let _: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("down"));
        }

        assert!(!shared.is_call_permitted());
    }
}
