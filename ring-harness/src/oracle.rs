//! Pure convergence predicates.
//!
//! These judge query snapshots and never touch the network. Replica
//! agreement is decided by digest comparison rather than content diffing,
//! mirroring the engine's anti-entropy design: verification cost is
//! O(replicas), not O(replicas × entries).

use ring_types::{DomainView, MembershipView, OperationResultList, Queried};

/// True iff the membership snapshot has exactly `n` entries, all ok.
pub fn cluster_converged(reply: &Queried<MembershipView>, n: usize) -> bool {
    match reply.ready() {
        Some(view) => view.len() == n && view.members().iter().all(|m| m.ok),
        None => false,
    }
}

/// True iff a generic operation-result list has exactly `n` entries, all ok.
pub fn result_set_ok(reply: &Queried<OperationResultList>, n: usize) -> bool {
    match reply.ready() {
        Some(results) => results.len() == n && results.results().iter().all(|r| r.ok),
        None => false,
    }
}

/// True iff the domain snapshot shows full replica agreement: exactly
/// `nrepl` replicas, every entry count exactly `nentries`, exactly `nrepl`
/// digests exposed, and every digest equal to the owner's.
///
/// An uninitialized entry count is a hard mismatch, never "almost there";
/// so is a missing digest.
pub fn domain_consistent(reply: &Queried<DomainView>, nrepl: usize, nentries: u64) -> bool {
    domain_consistent_within(reply, nrepl, nentries, 0)
}

/// [`domain_consistent`] with tolerance: replica count may fall short of
/// `nrepl` by up to `slack`, and the (still unanimous) entry count may fall
/// short of `nentries` by up to `slack`.
///
/// Writes racing a kill/respawn legitimately land one replica or one entry
/// short; scenarios that inject that race assert through this predicate.
pub fn domain_consistent_within(
    reply: &Queried<DomainView>,
    nrepl: usize,
    nentries: u64,
    slack: u64,
) -> bool {
    let Some(view) = reply.ready() else {
        return false;
    };

    let floor = nrepl.saturating_sub(slack as usize);
    if view.replicas.len() < floor || view.replicas.len() > nrepl {
        return false;
    }

    // every replica must report the same known count, within tolerance
    let mut counts = view.replicas.iter().map(|r| r.entries.known());
    let Some(Some(count)) = counts.next() else {
        return false;
    };
    if !counts.all(|c| c == Some(count)) {
        return false;
    }
    if count > nentries || count + slack < nentries {
        return false;
    }

    // the replica set is formed only once every member exposes a digest
    let digests = view.digests();
    if digests.len() != view.replicas.len() {
        return false;
    }

    let Some(owner) = view.owner() else {
        return false;
    };
    let Some(owner_digest) = owner.digest.as_deref() else {
        return false;
    };
    digests.iter().all(|d| *d == owner_digest)
}
