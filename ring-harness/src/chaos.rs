//! Chaos injection: random kills and rolling restarts under live traffic.

use std::time::Duration;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use ring_gateway::{GatewayClient, PutOptions};
use ring_types::NodeId;

use crate::cluster::{Cluster, ClusterError};

/// Sample `k` distinct identities uniformly, without replacement.
pub fn sample_victims(ids: &[NodeId], k: usize) -> Vec<NodeId> {
    let mut rng = rand::thread_rng();
    ids.choose_multiple(&mut rng, k).copied().collect()
}

/// Kill `k` randomly chosen live nodes.
///
/// Does not await the effect; callers poll membership for the resulting
/// ring size.
pub fn kill_random_subset(cluster: &mut Cluster, k: usize) -> Vec<NodeId> {
    let victims = sample_victims(&cluster.live(), k);
    for id in &victims {
        info!(node = %id, "chaos kill");
        cluster.kill(id);
    }
    victims
}

/// One detached batch of write traffic, launched per restarted node.
#[derive(Debug, Clone)]
pub struct WriteWorkload {
    /// Domains to write into.
    pub domains: Vec<String>,
    /// Entries put per domain per batch.
    pub entries: u32,
    /// Per-put resubmit bound; restarts make transient failures routine.
    pub retries: u32,
}

/// Kill and immediately respawn each identity in order, pausing `pause`
/// between nodes. With a workload, one detached write batch is launched
/// before each restart.
///
/// Models an in-place rolling code update under live traffic. A put that
/// hits a node mid-restart may land a replica or an entry short; callers
/// assert through the slack-tolerant predicate.
pub async fn rolling_restart(
    cluster: &mut Cluster,
    gateway: &GatewayClient,
    ids: &[NodeId],
    pause: Duration,
    workload: Option<&WriteWorkload>,
) -> Result<(), ClusterError> {
    for id in ids {
        if let Some(workload) = workload {
            spawn_background_writes(gateway.clone(), workload.clone());
        }
        info!(node = %id, "rolling restart");
        cluster.kill(id);
        cluster.spawn_as(*id).await?;
        // Too short a pause lets a replica jump past the restarting node
        // before earlier puts have propagated, minting a spurious replica.
        tokio::time::sleep(pause).await;
    }
    Ok(())
}

/// Launch one fire-and-forget write batch.
///
/// Never joined: the batch is bounded, failures are logged and tolerated,
/// and the scenario judges the outcome separately through the gateway.
fn spawn_background_writes(gateway: GatewayClient, workload: WriteWorkload) {
    tokio::spawn(async move {
        let options = PutOptions::retries(workload.retries);
        for i in 0..workload.entries {
            let key = format!("item-{i}");
            let value = format!("entry-{i}");
            for domain in &workload.domains {
                if let Err(e) = gateway.put(domain, &key, value.as_bytes(), &options).await {
                    debug!(domain = %domain, key = %key, error = %e, "background write failed");
                }
            }
        }
        debug!("background write batch complete");
    });
}
