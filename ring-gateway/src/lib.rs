//! # ring-gateway
//!
//! HTTP client for the ring monitoring gateway.
//!
//! The gateway is the harness's only window into the storage ring. This crate
//! wraps its surface in typed calls:
//! - registry resets (`/mon/ring/reset`, `/mon/domains/reset`)
//! - membership listing (`/mon/ring/nodes`)
//! - single-domain status lookup (`/mon/domains/domain?id=0x…`)
//! - domain create / put / get on `/mon/data/…`
//!
//! Monitoring queries return [`Queried`](ring_types::Queried) so that a
//! non-success status reads as "not yet" to a convergence poller. Data-path
//! operations surface non-success as [`GatewayError::Protocol`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod error;

pub use client::{CreateOptions, GatewayClient, GatewayConfig, GetOptions, PutOptions};
pub use error::GatewayError;
