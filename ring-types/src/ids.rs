//! Ring identity types.
//!
//! Both nodes and domains live at 128-bit positions on the consistent-hash
//! ring. Positions are content hashes rendered as fixed-width 32-char hex:
//! lowercase for nodes (matching node working-directory names), uppercase for
//! domains (matching the gateway's domain-id rendering).

use md5::{Digest, Md5};
use std::fmt;
use std::str::FromStr;

use crate::error::IdParseError;

fn hash_position(input: &str) -> u128 {
    let digest: [u8; 16] = Md5::digest(input.as_bytes()).into();
    u128::from_be_bytes(digest)
}

fn parse_hex128(s: &str) -> Result<u128, IdParseError> {
    if s.len() != 32 {
        return Err(IdParseError::BadLength(s.len()));
    }
    if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(IdParseError::BadChar(c));
    }
    // cannot fail after the checks above
    Ok(u128::from_str_radix(s, 16).unwrap_or_default())
}

/// A node's position on the ring.
///
/// Unique per harness run. Derived deterministically from a run-local counter
/// when not placed explicitly with [`NodeId::at`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u128);

impl NodeId {
    /// Place a node at an explicit ring position.
    pub fn at(position: u128) -> Self {
        Self(position)
    }

    /// Derive the identity for the `counter`-th spawned node of a run.
    pub fn derive(counter: u64) -> Self {
        Self(hash_position(&format!("node-{counter}")))
    }

    /// The raw ring position.
    pub fn position(&self) -> u128 {
        self.0
    }

    /// Extract a node identity from a gateway node ref.
    ///
    /// Refs are decorated (`ring-<hex>@host`); the identity is the embedded
    /// 32-char hex token.
    pub fn from_node_ref(node_ref: &str) -> Option<Self> {
        node_ref
            .split(|c: char| !c.is_ascii_hexdigit())
            .find(|token| token.len() == 32)
            .and_then(|token| token.parse().ok())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &self.to_string()[..8])
    }
}

impl FromStr for NodeId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex128(s).map(Self)
    }
}

/// A replicated domain's position on the ring.
///
/// The content hash of `(chunk, name)`, compared as an unsigned big integer
/// for ring-position arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(u128);

impl DomainId {
    /// Derive the domain id for `(name, chunk)`.
    pub fn derive(name: &str, chunk: u32) -> Self {
        Self(hash_position(&format!("{chunk} {name}")))
    }

    /// The raw ring position.
    pub fn position(&self) -> u128 {
        self.0
    }

    /// The ring position `delta` steps away, wrapping around the ring.
    ///
    /// Used to construct node identities guaranteed to fall just before or
    /// after this domain on the ring.
    pub fn offset(&self, delta: i64) -> u128 {
        if delta >= 0 {
            self.0.wrapping_add(delta as u128)
        } else {
            self.0.wrapping_sub(delta.unsigned_abs() as u128)
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032X}", self.0)
    }
}

impl fmt::Debug for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainId({})", &self.to_string()[..8])
    }
}

impl FromStr for DomainId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex128(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_fixed_width() {
        assert_eq!(NodeId::at(0).to_string().len(), 32);
        assert_eq!(NodeId::at(u128::MAX).to_string().len(), 32);
        assert_eq!(NodeId::at(0xab).to_string(), format!("{:032x}", 0xab));
    }

    #[test]
    fn node_id_derivation_is_stable_and_unique() {
        assert_eq!(NodeId::derive(0), NodeId::derive(0));
        let ids: Vec<NodeId> = (0..100).map(NodeId::derive).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn node_id_roundtrips_through_display() {
        let id = NodeId::derive(7);
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn node_id_rejects_bad_tokens() {
        assert_eq!("abc".parse::<NodeId>(), Err(IdParseError::BadLength(3)));
        let bad = "zz8e9a9115685ffab95d24c40714db6f";
        assert_eq!(bad.parse::<NodeId>(), Err(IdParseError::BadChar('z')));
    }

    #[test]
    fn node_id_from_decorated_ref() {
        let id = NodeId::derive(3);
        let node_ref = format!("ring-{id}@host1.example");
        assert_eq!(NodeId::from_node_ref(&node_ref), Some(id));
        assert_eq!(NodeId::from_node_ref("ring-abc@host"), None);
    }

    #[test]
    fn node_ids_order_by_position() {
        assert!(NodeId::at(1) < NodeId::at(2));
        assert!(NodeId::at(u128::MAX) > NodeId::at(0));
    }

    #[test]
    fn domain_id_uppercase_fixed_width() {
        let id = DomainId::derive("accounts", 0);
        let hex = id.to_string();
        assert_eq!(hex.len(), 32);
        assert_eq!(hex, hex.to_uppercase());
    }

    #[test]
    fn domain_id_depends_on_name_and_chunk() {
        assert_eq!(DomainId::derive("a", 0), DomainId::derive("a", 0));
        assert_ne!(DomainId::derive("a", 0), DomainId::derive("b", 0));
        assert_ne!(DomainId::derive("a", 0), DomainId::derive("a", 1));
    }

    #[test]
    fn domain_id_parse_accepts_both_cases() {
        let id = DomainId::derive("accounts", 0);
        let upper: DomainId = id.to_string().parse().unwrap();
        let lower: DomainId = id.to_string().to_lowercase().parse().unwrap();
        assert_eq!(upper, id);
        assert_eq!(lower, id);
    }

    #[test]
    fn offset_wraps_around_the_ring() {
        let id = DomainId::derive("wrap", 0);
        assert_eq!(id.offset(1), id.position().wrapping_add(1));
        assert_eq!(id.offset(-20), id.position().wrapping_sub(20));
        assert_eq!(DomainId(0).offset(-1), u128::MAX);
    }
}
