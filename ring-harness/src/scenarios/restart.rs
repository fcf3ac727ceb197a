//! Rolling restart under live write traffic.

use std::time::Duration;
use tracing::info;

use ring_gateway::CreateOptions;
use ring_types::{DomainId, NodeId};

use crate::chaos::{self, WriteWorkload};
use crate::runner::{ScenarioContext, ScenarioResult};

/// Replicas may land one short, and entry counts one low, when a put hits a
/// node mid-restart.
const RESTART_SLACK: u64 = 1;

/// Every node is killed and respawned in place, one at a time, while
/// detached write batches run against two domains. Simulates a rolling code
/// update: concurrent puts may need re-requests but must not corrupt the
/// domains.
pub(crate) async fn rolling_restart(ctx: &mut ScenarioContext) -> ScenarioResult {
    let names = ["rolling_restart_a", "rolling_restart_b"];
    let d1 = DomainId::derive(names[0], 0);
    let d2 = DomainId::derive(names[1], 0);

    // pack the ring tightly above the lower domain so both domains share
    // the same neighborhood of nodes
    let base = d1.position().min(d2.position());
    let ids: Vec<NodeId> = (0..10).map(|i| NodeId::at(base.wrapping_add(i))).collect();

    ctx.launch_ring_as(&ids).await?;
    if !ctx.ring_converges(10, 30).await? {
        return Ok(false);
    }

    for name in names {
        ctx.gateway.create(name, 6, &CreateOptions::default()).await?;
    }

    let workload = WriteWorkload {
        domains: names.iter().map(|n| n.to_string()).collect(),
        entries: 10,
        retries: 10,
    };
    chaos::rolling_restart(
        &mut ctx.cluster,
        &ctx.gateway,
        &ids,
        Duration::from_secs(7),
        Some(&workload),
    )
    .await?;
    info!("all nodes restarted");

    for id in [d1, d2] {
        if !ctx
            .domain_converges_within(&id, 8, 100, RESTART_SLACK, 300)
            .await?
        {
            return Ok(false);
        }
    }
    Ok(true)
}
