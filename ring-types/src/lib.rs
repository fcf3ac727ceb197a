//! # ring-types
//!
//! Identity and monitoring-view types for the ringtest harness.
//!
//! This crate provides the foundational types shared by the gateway client
//! and the harness:
//! - [`NodeId`], [`DomainId`] - ring positions as 128-bit content hashes
//! - [`MembershipView`], [`DomainView`], [`OperationResultList`] - typed
//!   snapshots of the monitoring surface, one type per query kind
//! - [`EntryCount`] - per-replica entry count with an explicit uninitialized
//!   variant
//! - [`Queried`] - outcome of a single monitoring query
//! - [`IdParseError`] - error type

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod views;

pub use error::IdParseError;
pub use ids::{DomainId, NodeId};
pub use views::{
    DomainView, EntryCount, MemberEntry, MembershipView, OpResult, OperationResultList, Queried,
    ReplicaStatus,
};
