//! The end-to-end scenario catalog.
//!
//! Organized by concern:
//!
//! - `ring` - membership: cold start, growth, healing after random kills
//! - `replication` - put/replicate/resync, ownership transfer, reincarnation
//! - `restart` - rolling restart under live write traffic
//! - `storage` - large external values, simulated corruption, regeneration
//! - `retrieval` - single get, streaming multi-get, cache-mode equivalence
//!
//! Every scenario is independent: it builds its own ring against freshly
//! reset registries and reports failure by value. Thrown errors are reserved
//! for protocol-level faults.

use std::future::Future;
use std::pin::Pin;

use crate::runner::{ScenarioContext, ScenarioResult};

pub mod replication;
pub mod restart;
pub mod retrieval;
pub mod ring;
pub mod storage;

/// A boxed scenario future borrowing the shared context.
pub type ScenarioFuture<'a> = Pin<Box<dyn Future<Output = ScenarioResult> + Send + 'a>>;

/// Entry point of one scenario.
pub type ScenarioFn = for<'a> fn(&'a mut ScenarioContext) -> ScenarioFuture<'a>;

/// A named, runnable scenario.
pub struct Scenario {
    /// Stable name; the CLI filter and ordering key.
    pub name: &'static str,
    /// One-line description for the list mode.
    pub summary: &'static str,
    /// The scenario body.
    pub run: ScenarioFn,
}

/// Every scenario, sorted lexicographically by name.
pub fn catalog() -> Vec<Scenario> {
    let mut all = vec![
        Scenario {
            name: "ring_small",
            summary: "10-node ring converges from cold start",
            run: |ctx| Box::pin(ring::ring_small(ctx)),
        },
        Scenario {
            name: "ring_large",
            summary: "100-node ring converges from cold start",
            run: |ctx| Box::pin(ring::ring_large(ctx)),
        },
        Scenario {
            name: "ring_growth",
            summary: "ring grown in two phases converges at every step",
            run: |ctx| Box::pin(ring::ring_growth(ctx)),
        },
        Scenario {
            name: "ring_random_kill",
            summary: "ring of 50 heals after 23 random kills",
            run: |ctx| Box::pin(ring::ring_random_kill(ctx)),
        },
        Scenario {
            name: "replication_single",
            summary: "unreplicated domain accepts and reports 100 entries",
            run: |ctx| Box::pin(replication::replication_single(ctx)),
        },
        Scenario {
            name: "replication_five",
            summary: "5 replicas agree on 100 entries within 50s",
            run: |ctx| Box::pin(replication::replication_five(ctx)),
        },
        Scenario {
            name: "replication_full",
            summary: "50 replicas across 50 nodes reach full agreement",
            run: |ctx| Box::pin(replication::replication_full(ctx)),
        },
        Scenario {
            name: "add_replica",
            summary: "a node added after writes resyncs to a full replica",
            run: |ctx| Box::pin(replication::add_replica(ctx)),
        },
        Scenario {
            name: "add_owner",
            summary: "a node added after writes takes ownership and resyncs",
            run: |ctx| Box::pin(replication::add_owner(ctx)),
        },
        Scenario {
            name: "owner_kill_reincarnate",
            summary: "owner killed and reincarnated under write load resyncs",
            run: |ctx| Box::pin(replication::owner_kill_reincarnate(ctx)),
        },
        Scenario {
            name: "distant_resync",
            summary: "stale distant replica resyncs across inserted nodes",
            run: |ctx| Box::pin(replication::distant_resync(ctx)),
        },
        Scenario {
            name: "rolling_restart",
            summary: "rolling kill/respawn under live writes stays consistent",
            run: |ctx| Box::pin(restart::rolling_restart(ctx)),
        },
        Scenario {
            name: "external_values",
            summary: "1M values land as external files on every replica",
            run: |ctx| Box::pin(storage::external_values(ctx)),
        },
        Scenario {
            name: "external_regen",
            summary: "deleted external files regenerate bit-for-bit on restart",
            run: |ctx| Box::pin(storage::external_regen(ctx)),
        },
        Scenario {
            name: "get_single",
            summary: "single-value get returns one value and rejects several",
            run: |ctx| Box::pin(retrieval::get_single(ctx)),
        },
        Scenario {
            name: "get_stream",
            summary: "streaming multi-get yields 1000 values in put order",
            run: |ctx| Box::pin(retrieval::get_stream(ctx)),
        },
        Scenario {
            name: "cache_mode",
            summary: "keycache domains are observably equivalent to default",
            run: |ctx| Box::pin(retrieval::cache_mode(ctx)),
        },
    ];
    all.sort_by_key(|s| s.name);
    all
}
