//! Replication, resync, and ownership scenarios.

use std::time::Duration;
use tracing::{info, warn};

use ring_gateway::CreateOptions;
use ring_types::{DomainId, NodeId, Queried};

use crate::runner::{ScenarioContext, ScenarioError, ScenarioResult};

/// An unreplicated domain accepts and reports its entries.
pub(crate) async fn replication_single(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(1).await?;
    if !ctx.ring_converges(1, 30).await? {
        return Ok(false);
    }
    let id = ctx.populate("replication_single", 1, 100).await?;
    ctx.domain_converges(&id, 1, 100, 50).await
}

/// Five replicas agree on 100 entries within 50 seconds.
pub(crate) async fn replication_five(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(10).await?;
    if !ctx.ring_converges(10, 30).await? {
        return Ok(false);
    }
    let id = ctx.populate("replication_five", 5, 100).await?;
    ctx.domain_converges(&id, 5, 100, 50).await
}

/// Every node of a 50-node ring holds a full replica.
pub(crate) async fn replication_full(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(50).await?;
    if !ctx.ring_converges(50, 30).await? {
        return Ok(false);
    }
    let id = ctx.populate("replication_full", 50, 100).await?;
    ctx.domain_converges(&id, 50, 100, 50).await
}

/// A node added after writes becomes a full replica.
pub(crate) async fn add_replica(ctx: &mut ScenarioContext) -> ScenarioResult {
    add_node_resync(ctx, "add_replica", true).await
}

/// A node added after writes takes over ownership and resyncs.
pub(crate) async fn add_owner(ctx: &mut ScenarioContext) -> ScenarioResult {
    add_node_resync(ctx, "add_owner", false).await
}

/// Shared body of `add_replica`/`add_owner`. With `owner_first`, the
/// eventual owner is spawned before the domain exists; otherwise the plain
/// replica comes first and ownership must transfer to the late node.
async fn add_node_resync(
    ctx: &mut ScenarioContext,
    name: &str,
    owner_first: bool,
) -> ScenarioResult {
    let domain = DomainId::derive(name, 0);
    // the node just below the domain position is guaranteed to own it;
    // the node just above is guaranteed to stay a plain replica
    let owner = NodeId::at(domain.offset(-1));
    let replica = NodeId::at(domain.offset(1));
    let (first, second) = if owner_first {
        (owner, replica)
    } else {
        (replica, owner)
    };

    ctx.cluster.spawn_as(first).await?;
    if !ctx.ring_converges(1, 30).await? {
        return Ok(false);
    }

    let id = ctx.populate(name, 2, 50).await?;
    if !ctx.domain_converges(&id, 1, 50, 50).await? {
        return Ok(false);
    }

    info!(node = %second, "adding the second node");
    ctx.cluster.spawn_as(second).await?;
    if !ctx.ring_converges(2, 30).await? {
        return Ok(false);
    }

    ctx.put_entries(name, 50, 0).await?;

    info!("waiting for resync");
    if !ctx.domain_converges(&id, 2, 100, 300).await? {
        return Ok(false);
    }

    let Queried::Ready(view) = ctx.gateway.domain_status(&id).await? else {
        return Ok(false);
    };
    let Some(entry) = view.owner() else {
        return Ok(false);
    };
    if NodeId::from_node_ref(&entry.node) != Some(owner) {
        warn!(expected = %owner, got = %entry.node, "domain owned by the wrong node");
        return Ok(false);
    }
    Ok(true)
}

/// The owner is killed under write load, the domain resyncs, the owner
/// reincarnates under its old identity, and the domain resyncs again.
pub(crate) async fn owner_kill_reincarnate(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "owner_kill_reincarnate";
    ctx.launch_ring(10).await?;
    if !ctx.ring_converges(10, 30).await? {
        return Ok(false);
    }

    let (owner_ref, id) = ctx
        .gateway
        .create(name, 5, &CreateOptions::default())
        .await?;
    ctx.put_entries(name, 50, 0).await?;

    let owner = NodeId::from_node_ref(&owner_ref)
        .ok_or_else(|| ScenarioError::NodeRef(owner_ref.clone()))?;
    info!(owner = %owner, "killing the owner");
    ctx.cluster.kill(&owner);

    ctx.put_entries(name, 50, 10).await?;
    if !ctx.domain_converges(&id, 6, 100, 300).await? {
        return Ok(false);
    }

    info!(owner = %owner, "owner reincarnates");
    ctx.cluster.spawn_as(owner).await?;

    ctx.put_entries(name, 50, 10).await?;
    ctx.domain_converges(&id, 7, 150, 300).await
}

/// A stale replica far from the owner resyncs after the owner reincarnates
/// and fresh nodes are inserted between them.
pub(crate) async fn distant_resync(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "distant_resync";
    let domain = DomainId::derive(name, 0);
    let distant = NodeId::at(domain.offset(-20));
    let owner = NodeId::at(domain.position());

    ctx.cluster.spawn_as(distant).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    ctx.cluster.spawn_as(owner).await?;
    info!(owner = %owner, distant = %distant, "two-node ring up");
    if !ctx.ring_converges(2, 30).await? {
        return Ok(false);
    }

    let id = ctx.populate(name, 3, 60).await?;
    if !ctx.domain_converges(&id, 2, 60, 50).await? {
        return Ok(false);
    }

    info!(owner = %owner, "killing the owner");
    ctx.cluster.kill(&owner);
    ctx.put_entries(name, 30, 10).await?;

    info!("inserting nodes between the stale replica and the owner");
    let infill: Vec<NodeId> = (-19..20).map(|i| NodeId::at(domain.offset(i))).collect();
    ctx.launch_ring_as(&infill).await?;
    if !ctx.ring_converges(40, 30).await? {
        return Ok(false);
    }

    ctx.put_entries(name, 10, 0).await?;

    info!("waiting for the full resync");
    ctx.domain_converges(&id, 5, 100, 300).await
}
