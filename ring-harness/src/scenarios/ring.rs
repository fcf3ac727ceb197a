//! Ring membership scenarios.

use std::time::Duration;
use tracing::info;

use crate::chaos;
use crate::runner::{ScenarioContext, ScenarioResult};

/// A small ring converges from cold start.
pub(crate) async fn ring_small(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(10).await?;
    ctx.ring_converges(10, 30).await
}

/// A large ring converges from cold start.
pub(crate) async fn ring_large(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(100).await?;
    ctx.ring_converges(100, 30).await
}

/// A ring grown in two phases converges after each phase.
pub(crate) async fn ring_growth(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(10).await?;
    if !ctx.ring_converges(10, 30).await? {
        return Ok(false);
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    info!("launching second batch");
    ctx.launch_ring(10).await?;
    ctx.ring_converges(20, 30).await
}

/// Membership heals after killing a random half of the ring.
pub(crate) async fn ring_random_kill(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(50).await?;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let victims = chaos::kill_random_subset(&mut ctx.cluster, 23);
    info!(killed = victims.len(), "waiting for the ring to heal");
    ctx.ring_converges(27, 60).await
}
