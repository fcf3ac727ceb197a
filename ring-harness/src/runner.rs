//! Scenario execution.
//!
//! Scenarios run in deterministic lexicographic order, optionally filtered
//! by an allow-list. Shared ring/domain registries are reset and stray
//! harness-managed processes killed before each scenario. The first failure
//! halts the run: later scenarios assume a freshly reset cluster, which an
//! unexplained failure no longer guarantees.

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use ring_gateway::{CreateOptions, GatewayClient, GatewayError, PutOptions};
use ring_types::{DomainId, NodeId};

use crate::cluster::{Cluster, ClusterError};
use crate::poll;
use crate::scenarios;

/// Pause between node launches; back-to-back joins destabilize a forming ring.
const LAUNCH_PAUSE: Duration = Duration::from_secs(1);

/// Settle time after a registry reset.
const RESET_PAUSE: Duration = Duration::from_secs(1);

/// Protocol-level faults that abort a scenario.
///
/// Ordinary non-convergence is not an error; scenarios report it by
/// returning `Ok(false)`.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The gateway failed or answered outside its contract.
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    /// A node could not be spawned or addressed.
    #[error("cluster: {0}")]
    Cluster(#[from] ClusterError),

    /// On-disk verification hit an I/O error; possible data loss.
    #[error("disk verification: {0}")]
    Disk(#[from] std::io::Error),

    /// A gateway node ref did not embed a node identity.
    #[error("node ref {0:?} does not embed a node identity")]
    NodeRef(String),
}

/// What a scenario resolves to: passed, failed, or aborted.
pub type ScenarioResult = Result<bool, ScenarioError>;

/// Shared state handed to every scenario.
pub struct ScenarioContext {
    /// Client for the monitoring gateway.
    pub gateway: GatewayClient,
    /// The harness-managed node processes.
    pub cluster: Cluster,
}

impl ScenarioContext {
    /// Create a context over a gateway and an empty cluster.
    pub fn new(gateway: GatewayClient, cluster: Cluster) -> Self {
        Self { gateway, cluster }
    }

    /// Launch `n` nodes under derived identities, one second apart.
    pub async fn launch_ring(&mut self, n: usize) -> Result<Vec<NodeId>, ScenarioError> {
        info!(nodes = n, "launching nodes");
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            tokio::time::sleep(LAUNCH_PAUSE).await;
            ids.push(self.cluster.spawn().await?);
        }
        Ok(ids)
    }

    /// Launch nodes under the given identities, one second apart.
    pub async fn launch_ring_as(&mut self, ids: &[NodeId]) -> Result<(), ScenarioError> {
        info!(nodes = ids.len(), "launching nodes");
        for id in ids {
            tokio::time::sleep(LAUNCH_PAUSE).await;
            self.cluster.spawn_as(*id).await?;
        }
        Ok(())
    }

    /// Wait for ring membership to converge at exactly `n` healthy nodes.
    pub async fn ring_converges(&self, n: usize, timeout_secs: u64) -> Result<bool, ScenarioError> {
        let started = Instant::now();
        let ok = poll::wait_for_members(&self.gateway, n, timeout_secs).await?;
        if ok {
            info!(nodes = n, elapsed = ?started.elapsed(), "ring converged");
        } else {
            warn!(nodes = n, timeout_secs, "ring did not converge");
        }
        Ok(ok)
    }

    /// Put `count` entries into a domain, keys `item-<i>`, values `entry-<i>`.
    ///
    /// The ring appends, so repeating this with the same count doubles the
    /// domain's entry count.
    pub async fn put_entries(
        &self,
        domain: &str,
        count: u32,
        retries: u32,
    ) -> Result<(), ScenarioError> {
        let started = Instant::now();
        let options = PutOptions::retries(retries);
        for i in 0..count {
            self.gateway
                .put(
                    domain,
                    &format!("item-{i}"),
                    format!("entry-{i}").as_bytes(),
                    &options,
                )
                .await?;
        }
        info!(domain, count, elapsed = ?started.elapsed(), "entries put");
        Ok(())
    }

    /// Create a domain and put its initial entries.
    pub async fn populate(
        &mut self,
        name: &str,
        nrepl: usize,
        nentries: u32,
    ) -> Result<DomainId, ScenarioError> {
        let (owner, id) = self
            .gateway
            .create(name, nrepl, &CreateOptions::default())
            .await?;
        info!(domain = name, id = %id, owner = %owner, "domain created");
        self.put_entries(name, nentries, 0).await?;
        Ok(id)
    }

    /// Wait for full replica agreement on a domain.
    pub async fn domain_converges(
        &self,
        id: &DomainId,
        nrepl: usize,
        nentries: u64,
        timeout_secs: u64,
    ) -> Result<bool, ScenarioError> {
        self.domain_converges_within(id, nrepl, nentries, 0, timeout_secs)
            .await
    }

    /// Wait for replica agreement on a domain, with off-by-`slack` tolerance.
    pub async fn domain_converges_within(
        &self,
        id: &DomainId,
        nrepl: usize,
        nentries: u64,
        slack: u64,
        timeout_secs: u64,
    ) -> Result<bool, ScenarioError> {
        let started = Instant::now();
        let ok =
            poll::wait_for_domain_within(&self.gateway, id, nrepl, nentries, slack, timeout_secs)
                .await?;
        if ok {
            info!(domain = %id, nrepl, nentries, elapsed = ?started.elapsed(), "domain consistent");
        } else {
            warn!(domain = %id, nrepl, nentries, timeout_secs, "domain did not converge");
        }
        Ok(ok)
    }
}

/// Runs the scenario catalog against one cluster.
pub struct Runner {
    ctx: ScenarioContext,
}

/// Whether `name` survives the allow-list. An empty filter selects all.
fn selected(name: &str, filter: &[String]) -> bool {
    filter.is_empty() || filter.iter().any(|f| f == name)
}

impl Runner {
    /// Create a runner.
    pub fn new(gateway: GatewayClient, cluster: Cluster) -> Self {
        Self {
            ctx: ScenarioContext::new(gateway, cluster),
        }
    }

    /// Execute the catalog in lexicographic order, skipping names outside a
    /// non-empty `filter`. Halts on the first failure.
    ///
    /// Returns `Ok(true)` iff every executed scenario passed.
    pub async fn run(&mut self, filter: &[String]) -> ScenarioResult {
        let catalog = scenarios::catalog();
        for name in filter {
            if !catalog.iter().any(|s| s.name == name) {
                warn!(scenario = %name, "unknown scenario name in filter");
            }
        }

        for scenario in &catalog {
            if !selected(scenario.name, filter) {
                continue;
            }
            self.reset().await?;
            info!(scenario = scenario.name, "starting");
            let started = Instant::now();
            match (scenario.run)(&mut self.ctx).await {
                Ok(true) => {
                    info!(scenario = scenario.name, elapsed = ?started.elapsed(), "passed");
                }
                Ok(false) => {
                    error!(scenario = scenario.name, "failed");
                    self.teardown().await;
                    return Ok(false);
                }
                Err(e) => {
                    error!(scenario = scenario.name, error = %e, "aborted");
                    self.teardown().await;
                    return Err(e);
                }
            }
        }
        self.teardown().await;
        Ok(true)
    }

    /// Kill stray processes from the previous scenario and reset the shared
    /// ring/domain registries.
    async fn reset(&mut self) -> Result<(), ScenarioError> {
        self.ctx.cluster.kill_all();
        self.ctx.cluster.reap().await;
        self.ctx.gateway.reset_ring().await?;
        self.ctx.gateway.reset_domains().await?;
        tokio::time::sleep(RESET_PAUSE).await;
        Ok(())
    }

    async fn teardown(&mut self) {
        self.ctx.cluster.kill_all();
        self.ctx.cluster.reap().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_selects_everything() {
        assert!(selected("ring_small", &[]));
    }

    #[test]
    fn filter_selects_by_exact_name() {
        let filter = vec!["ring_small".to_string(), "get_stream".to_string()];
        assert!(selected("ring_small", &filter));
        assert!(selected("get_stream", &filter));
        assert!(!selected("ring_large", &filter));
        assert!(!selected("ring", &filter));
    }
}
