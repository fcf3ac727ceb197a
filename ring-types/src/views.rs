//! Typed snapshots of the monitoring surface.
//!
//! One explicit type per query kind: membership, single-domain status, and
//! generic operation results. All are read-only views; the harness never
//! mutates them, only judges them.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The string the gateway emits for a replica that has not initialized its
/// copy of a domain yet.
const UNINITIALIZED: &str = "undefined";

/// A replica's entry count, with an explicit uninitialized variant.
///
/// On the wire this is either a JSON number or the literal `"undefined"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCount {
    /// The replica has not initialized its copy of the domain.
    Uninitialized,
    /// The replica reports exactly this many entries.
    Known(u64),
}

impl EntryCount {
    /// The count, if the replica has one.
    pub fn known(&self) -> Option<u64> {
        match self {
            EntryCount::Known(n) => Some(*n),
            EntryCount::Uninitialized => None,
        }
    }
}

impl Serialize for EntryCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntryCount::Known(n) => serializer.serialize_u64(*n),
            EntryCount::Uninitialized => serializer.serialize_str(UNINITIALIZED),
        }
    }
}

impl<'de> Deserialize<'de> for EntryCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl Visitor<'_> for CountVisitor {
            type Value = EntryCount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an entry count or \"{UNINITIALIZED}\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntryCount, E> {
                Ok(EntryCount::Known(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntryCount, E> {
                u64::try_from(v)
                    .map(EntryCount::Known)
                    .map_err(|_| E::custom(format!("negative entry count: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntryCount, E> {
                if v == UNINITIALIZED {
                    Ok(EntryCount::Uninitialized)
                } else {
                    Err(E::custom(format!("unexpected entry count string: {v:?}")))
                }
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

/// One node's view of a domain, as reported by the domain status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaStatus {
    /// Gateway node ref (decorated identity, e.g. `ring-<hex>@host`).
    pub node: String,
    /// Entry count, or uninitialized.
    #[serde(rename = "num_entries")]
    pub entries: EntryCount,
    /// Synctree root digest, absent until the replica set is formed.
    #[serde(rename = "synctree_root", default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    /// Whether this node owns the domain.
    pub owner: bool,
}

/// Ordered snapshot of every replica of one domain, from one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainView {
    /// Domain id, fixed-width uppercase hex.
    pub id: String,
    /// Per-replica statuses.
    pub replicas: Vec<ReplicaStatus>,
}

impl DomainView {
    /// The owner-flagged replica, if exactly one exists.
    pub fn owner(&self) -> Option<&ReplicaStatus> {
        let mut owners = self.replicas.iter().filter(|r| r.owner);
        match (owners.next(), owners.next()) {
            (Some(owner), None) => Some(owner),
            _ => None,
        }
    }

    /// Every digest currently exposed by a replica.
    pub fn digests(&self) -> Vec<&str> {
        self.replicas
            .iter()
            .filter_map(|r| r.digest.as_deref())
            .collect()
    }
}

/// One membership entry from the ring nodes query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    /// Gateway node ref.
    pub node: String,
    /// Whether the node currently answers the ring monitor.
    pub ok: bool,
}

/// Snapshot of ring membership from one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipView(pub Vec<MemberEntry>);

impl MembershipView {
    /// Number of members in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The member entries.
    pub fn members(&self) -> &[MemberEntry] {
        &self.0
    }
}

/// One per-node result of a generic ring operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResult {
    /// Gateway node ref.
    pub node: String,
    /// Whether the operation succeeded on this node.
    pub ok: bool,
}

/// Per-node results of one generic ring operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationResultList(pub Vec<OpResult>);

impl OperationResultList {
    /// Number of results.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The results.
    pub fn results(&self) -> &[OpResult] {
        &self.0
    }
}

/// Outcome of a single monitoring query.
///
/// A non-success status is an ordinary outcome during convergence ("not
/// yet"), not an error; poll predicates consume this type directly.
#[derive(Debug, Clone)]
pub enum Queried<T> {
    /// The gateway answered with a parseable payload.
    Ready(T),
    /// The gateway answered with a non-success status.
    Unavailable(u16),
}

impl<T> Queried<T> {
    /// The payload, if the query succeeded.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Queried::Ready(t) => Some(t),
            Queried::Unavailable(_) => None,
        }
    }

    /// Whether the query succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self, Queried::Ready(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_count_from_number() {
        let count: EntryCount = serde_json::from_str("42").unwrap();
        assert_eq!(count, EntryCount::Known(42));
    }

    #[test]
    fn entry_count_from_sentinel() {
        let count: EntryCount = serde_json::from_str("\"undefined\"").unwrap();
        assert_eq!(count, EntryCount::Uninitialized);
    }

    #[test]
    fn entry_count_rejects_other_strings() {
        assert!(serde_json::from_str::<EntryCount>("\"many\"").is_err());
        assert!(serde_json::from_str::<EntryCount>("-3").is_err());
    }

    #[test]
    fn entry_count_serializes_back() {
        assert_eq!(serde_json::to_string(&EntryCount::Known(7)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&EntryCount::Uninitialized).unwrap(),
            "\"undefined\""
        );
    }

    #[test]
    fn replica_status_with_digest() {
        let json = r#"{
            "node": "ring-aa8e9a9115685ffab95d24c40714db6f@host1",
            "num_entries": 100,
            "synctree_root": "8f4e",
            "owner": true
        }"#;
        let status: ReplicaStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.entries, EntryCount::Known(100));
        assert_eq!(status.digest.as_deref(), Some("8f4e"));
        assert!(status.owner);
    }

    #[test]
    fn replica_status_without_digest() {
        let json = r#"{"node": "n1", "num_entries": "undefined", "owner": false}"#;
        let status: ReplicaStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.entries, EntryCount::Uninitialized);
        assert!(status.digest.is_none());
    }

    #[test]
    fn membership_view_is_a_bare_array() {
        let json = r#"[{"node": "n1", "ok": true}, {"node": "n2", "ok": false}]"#;
        let view: MembershipView = serde_json::from_str(json).unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.members()[0].ok);
        assert!(!view.members()[1].ok);
    }

    #[test]
    fn domain_view_owner_requires_exactly_one() {
        let mut view: DomainView = serde_json::from_str(
            r#"{"id": "AB", "replicas": [
                {"node": "n1", "num_entries": 1, "owner": true},
                {"node": "n2", "num_entries": 1, "owner": false}
            ]}"#,
        )
        .unwrap();
        assert_eq!(view.owner().unwrap().node, "n1");

        view.replicas[1].owner = true;
        assert!(view.owner().is_none());
    }

    #[test]
    fn domain_view_digests_skip_missing() {
        let view: DomainView = serde_json::from_str(
            r#"{"id": "AB", "replicas": [
                {"node": "n1", "num_entries": 1, "synctree_root": "aa", "owner": true},
                {"node": "n2", "num_entries": 1, "owner": false}
            ]}"#,
        )
        .unwrap();
        assert_eq!(view.digests(), vec!["aa"]);
    }

    #[test]
    fn queried_accessors() {
        let ready: Queried<u32> = Queried::Ready(5);
        assert!(ready.is_ready());
        assert_eq!(ready.ready(), Some(&5));

        let down: Queried<u32> = Queried::Unavailable(503);
        assert!(!down.is_ready());
        assert_eq!(down.ready(), None);
    }
}
