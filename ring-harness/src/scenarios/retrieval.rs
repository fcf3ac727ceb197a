//! Value retrieval scenarios.

use tracing::{info, warn};

use ring_gateway::{CreateOptions, GatewayError, GetOptions, PutOptions};

use crate::runner::{ScenarioContext, ScenarioResult};

/// A single-value get returns exactly one value, and rejects a key that has
/// accumulated several.
pub(crate) async fn get_single(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "get_single";
    ctx.launch_ring(3).await?;
    if !ctx.ring_converges(3, 30).await? {
        return Ok(false);
    }

    let (_, id) = ctx.gateway.create(name, 2, &CreateOptions::default()).await?;
    ctx.gateway
        .put(name, "only", b"sole-value", &PutOptions::default())
        .await?;
    if !ctx.domain_converges(&id, 2, 1, 50).await? {
        return Ok(false);
    }

    let single = GetOptions { single: true };
    let values = ctx.gateway.get(name, "only", &single).await?;
    if values != ["sole-value"] {
        warn!(?values, "unexpected single-get result");
        return Ok(false);
    }

    // a second put makes the key multi-valued
    ctx.gateway
        .put(name, "only", b"sole-value-2", &PutOptions::default())
        .await?;
    if !ctx.domain_converges(&id, 2, 2, 50).await? {
        return Ok(false);
    }

    match ctx.gateway.get(name, "only", &single).await {
        Err(GatewayError::SingleValueExpected { .. }) => {}
        Ok(values) => {
            warn!(?values, "single get accepted a multi-valued key");
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    }

    let values = ctx.gateway.get(name, "only", &GetOptions::default()).await?;
    Ok(values == ["sole-value", "sole-value-2"])
}

/// A key put 1000 times streams back all 1000 values in put order.
pub(crate) async fn get_stream(ctx: &mut ScenarioContext) -> ScenarioResult {
    let name = "get_stream";
    ctx.launch_ring(3).await?;
    if !ctx.ring_converges(3, 30).await? {
        return Ok(false);
    }

    let (_, id) = ctx.gateway.create(name, 2, &CreateOptions::default()).await?;
    info!("putting 1000 values under one key");
    let options = PutOptions::default();
    for i in 0..1000u32 {
        ctx.gateway
            .put(name, "stream", format!("value-{i}").as_bytes(), &options)
            .await?;
    }
    if !ctx.domain_converges(&id, 2, 1000, 50).await? {
        return Ok(false);
    }

    let mut values = Vec::new();
    let count = ctx
        .gateway
        .get_each(name, "stream", |value| values.push(value))
        .await?;
    if count != 1000 {
        warn!(count, "wrong number of streamed values");
        return Ok(false);
    }

    let in_order = values
        .iter()
        .enumerate()
        .all(|(i, value)| value == &format!("value-{i}"));
    if !in_order {
        warn!("streamed values out of put order");
    }
    Ok(in_order)
}

/// A domain created with the alternate key-cache strategy behaves exactly
/// like a default one.
pub(crate) async fn cache_mode(ctx: &mut ScenarioContext) -> ScenarioResult {
    ctx.launch_ring(5).await?;
    if !ctx.ring_converges(5, 30).await? {
        return Ok(false);
    }

    let (_, plain) = ctx
        .gateway
        .create("cache_plain", 3, &CreateOptions::default())
        .await?;
    let (_, keyed) = ctx
        .gateway
        .create("cache_keyed", 3, &CreateOptions::default().keycache())
        .await?;

    ctx.put_entries("cache_plain", 50, 0).await?;
    ctx.put_entries("cache_keyed", 50, 0).await?;

    if !ctx.domain_converges(&plain, 3, 50, 50).await? {
        return Ok(false);
    }
    if !ctx.domain_converges(&keyed, 3, 50, 50).await? {
        return Ok(false);
    }

    for i in [0u32, 17, 49] {
        let key = format!("item-{i}");
        let from_plain = ctx.gateway.get("cache_plain", &key, &GetOptions::default()).await?;
        let from_keyed = ctx.gateway.get("cache_keyed", &key, &GetOptions::default()).await?;
        if from_plain != from_keyed {
            warn!(key = %key, ?from_plain, ?from_keyed, "cache modes disagree");
            return Ok(false);
        }
    }
    Ok(true)
}
