//! Fixed-cadence convergence polling.
//!
//! One attempt per second, up to the timeout. No backoff, no jitter: total
//! wall time stays bounded and predictable, and the timeout is the system's
//! sole abort mechanism. It is non-preemptive; an in-flight query may
//! finish after the nominal deadline.

use std::future::Future;
use std::time::Duration;
use tracing::trace;

use ring_gateway::{GatewayClient, GatewayError};
use ring_types::DomainId;

use crate::oracle;

const CADENCE: Duration = Duration::from_secs(1);

/// Poll `probe` once per second until it succeeds or `timeout_secs` attempts
/// are exhausted.
///
/// Returns `Ok(true)` on the first success and `Ok(false)` on exhaustion.
/// Probe errors propagate: they are protocol-level faults, distinguishable
/// from ordinary non-convergence.
pub async fn wait_until<F, Fut, E>(timeout_secs: u64, mut probe: F) -> Result<bool, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for attempt in 1..=timeout_secs {
        tokio::time::sleep(CADENCE).await;
        if probe().await? {
            trace!(attempt, "predicate satisfied");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Wait until ring membership has exactly `n` entries, all ok.
pub async fn wait_for_members(
    gateway: &GatewayClient,
    n: usize,
    timeout_secs: u64,
) -> Result<bool, GatewayError> {
    wait_until(timeout_secs, || async move {
        Ok(oracle::cluster_converged(&gateway.membership().await?, n))
    })
    .await
}

/// Wait until a domain is fully consistent: `nrepl` replicas, each with
/// exactly `nentries` entries, all digests equal to the owner's.
pub async fn wait_for_domain(
    gateway: &GatewayClient,
    id: &DomainId,
    nrepl: usize,
    nentries: u64,
    timeout_secs: u64,
) -> Result<bool, GatewayError> {
    wait_for_domain_within(gateway, id, nrepl, nentries, 0, timeout_secs).await
}

/// Like [`wait_for_domain`], accepting counts up to `slack` short, for
/// scenarios that race writes against disruptive operations.
pub async fn wait_for_domain_within(
    gateway: &GatewayClient,
    id: &DomainId,
    nrepl: usize,
    nentries: u64,
    slack: u64,
    timeout_secs: u64,
) -> Result<bool, GatewayError> {
    let id = *id;
    wait_until(timeout_secs, || async move {
        Ok(oracle::domain_consistent_within(
            &gateway.domain_status(&id).await?,
            nrepl,
            nentries,
            slack,
        ))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[tokio::test(start_paused = true)]
    async fn returns_true_on_first_success() {
        let calls = Cell::new(0u64);
        let ok = wait_until(10, || {
            let calls = &calls;
            async move {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(calls.get() == 3)
            }
        })
        .await
        .unwrap();

        assert!(ok);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_the_timeout_attempt_by_attempt() {
        let calls = Cell::new(0u64);
        let ok = wait_until(4, || {
            let calls = &calls;
            async move {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(false)
            }
        })
        .await
        .unwrap();

        assert!(!ok);
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_never_probes() {
        let ok = wait_until(0, || async { Ok::<_, Infallible>(true) })
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_propagate() {
        let calls = Cell::new(0u64);
        let result: Result<bool, &str> = wait_until(10, || {
            let calls = &calls;
            async move {
                calls.set(calls.get() + 1);
                if calls.get() == 2 {
                    Err("gateway exploded")
                } else {
                    Ok(false)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "gateway exploded");
        assert_eq!(calls.get(), 2);
    }
}
