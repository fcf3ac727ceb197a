//! Large-value storage scenarios: external files and regeneration.

use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

use ring_gateway::{CreateOptions, PutOptions};
use ring_types::{DomainId, DomainView, NodeId, Queried};

use crate::disk;
use crate::poll;
use crate::runner::{ScenarioContext, ScenarioError, ScenarioResult};

/// Comfortably above the engine's external-store threshold.
const EXTERNAL_VALUE_LEN: usize = 1024 * 1024;

/// Map every replica of a domain to its on-disk domain directory.
fn replica_dirs(
    ctx: &ScenarioContext,
    view: &DomainView,
    id: &DomainId,
) -> Result<Vec<(NodeId, PathBuf)>, ScenarioError> {
    view.replicas
        .iter()
        .map(|replica| {
            let node = NodeId::from_node_ref(&replica.node)
                .ok_or_else(|| ScenarioError::NodeRef(replica.node.clone()))?;
            let dir = disk::domain_dir(&ctx.cluster.node_dir(&node), id);
            Ok((node, dir))
        })
        .collect()
}

/// Ten 1M values land as external files on every replica; a node added
/// afterwards resyncs all of them plus one more.
pub(crate) async fn external_values(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "external_values";
    ctx.launch_ring(5).await?;
    if !ctx.ring_converges(5, 30).await? {
        return Ok(false);
    }

    let (_, id) = ctx.gateway.create(name, 6, &CreateOptions::default()).await?;
    let value = vec![b'!'; EXTERNAL_VALUE_LEN];
    let options = PutOptions {
        retries: 0,
        verbose: true,
    };
    info!("putting ten 1M values");
    for i in 0..10 {
        ctx.gateway
            .put(name, &format!("bulk-{i}"), &value, &options)
            .await?;
    }

    let gateway = &ctx.gateway;
    let ready = poll::wait_until(30, || async move {
        Ok::<bool, ScenarioError>(gateway.domain_status(&id).await?.is_ready())
    })
    .await?;
    if !ready {
        return Ok(false);
    }

    let Queried::Ready(view) = ctx.gateway.domain_status(&id).await? else {
        return Ok(false);
    };
    let dirs = replica_dirs(ctx, &view, &id)?;
    for (node, dir) in &dirs {
        let found = disk::count_external_files(dir)?;
        if found != 10 {
            warn!(node = %node, found, "external files missing on replica");
            return Ok(false);
        }
    }
    info!("external files written to all replicas");

    // lose a few files on one replica; the resync below must tolerate it
    let Some((damaged, damaged_dir)) = dirs.last() else {
        return Ok(false);
    };
    let deleted = disk::delete_random_external(damaged_dir, 3)?;
    info!(node = %damaged, deleted = deleted.len(), "deleted external files on one replica");

    let new_node = ctx.cluster.spawn().await?;
    info!(node = %new_node, "new node joins; putting one more value");
    ctx.gateway.put(name, "bulk-extra", &value, &options).await?;

    if !ctx.domain_converges(&id, 6, 11, 300).await? {
        return Ok(false);
    }

    let dir = disk::domain_dir(&ctx.cluster.node_dir(&new_node), &id);
    let found = disk::count_external_files(&dir)?;
    if found != 11 {
        warn!(node = %new_node, found, "external files missing on the new node");
        return Ok(false);
    }
    Ok(true)
}

/// External files deleted from one replica regenerate after the node
/// restarts, and its content blocks come back bit-for-bit identical.
pub(crate) async fn external_regen(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "external_regen";
    ctx.launch_ring(5).await?;
    if !ctx.ring_converges(5, 30).await? {
        return Ok(false);
    }

    let (_, id) = ctx.gateway.create(name, 3, &CreateOptions::default()).await?;
    let value = vec![b'!'; EXTERNAL_VALUE_LEN];
    for i in 0..5 {
        ctx.gateway
            .put(name, &format!("bulk-{i}"), &value, &PutOptions::default())
            .await?;
    }
    // small values pack into fixed-size blocks
    ctx.put_entries(name, 20, 0).await?;
    if !ctx.domain_converges(&id, 3, 25, 50).await? {
        return Ok(false);
    }

    let Queried::Ready(view) = ctx.gateway.domain_status(&id).await? else {
        return Ok(false);
    };
    let Some(replica) = view.replicas.iter().find(|r| !r.owner) else {
        return Ok(false);
    };
    let node = NodeId::from_node_ref(&replica.node)
        .ok_or_else(|| ScenarioError::NodeRef(replica.node.clone()))?;
    let dir = disk::domain_dir(&ctx.cluster.node_dir(&node), &id);

    let before = disk::block_checksums(&dir)?;
    let deleted = disk::delete_random_external(&dir, 2)?;
    info!(node = %node, deleted = deleted.len(), "simulated local corruption");

    ctx.cluster.kill(&node);
    ctx.cluster.spawn_as(node).await?;

    if !ctx.domain_converges(&id, 3, 25, 300).await? {
        return Ok(false);
    }

    let dir_ref = &dir;
    let regenerated = poll::wait_until(120, || async move {
        match disk::count_external_files(dir_ref) {
            Ok(found) => Ok::<bool, ScenarioError>(found == 5),
            // the node may rebuild the directory mid-restart
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    })
    .await?;
    if !regenerated {
        warn!(node = %node, "external files did not regenerate");
        return Ok(false);
    }

    let after = disk::block_checksums(&dir)?;
    if before != after {
        warn!(node = %node, "block content changed across regeneration");
        return Ok(false);
    }
    Ok(true)
}
