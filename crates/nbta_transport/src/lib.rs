//! # NBTA Transport
//!
//! An in-process network carrying notifications between replicas.
//!
//! This crate provides:
//! - [`Network`]: an explicit endpoint registry with one bounded mailbox
//!   per `(from, to)` link
//! - [`NetworkPeer`]: the [`nbta_core::Peer`] for one replica
//! - [`ClusterClient`]: a [`nbta_core::Server`] routing writes to every
//!   replica of a key
//! - Deterministic pumping with seeded fault injection, and a tokio task
//!   for background delivery
//!
//! # Delivery
//!
//! Sending never blocks. Frames are CBOR-encoded [`NotifyEnvelope`]s and
//! wait in their link's mailbox until delivered. A full mailbox either
//! refuses the frame or evicts its oldest one, per [`OverflowPolicy`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod client;
mod config;
mod error;
mod mailbox;
mod message;
mod network;
mod peer;
mod stats;

pub use client::ClusterClient;
pub use config::{FaultConfig, OverflowPolicy, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use message::NotifyEnvelope;
pub use network::{DeliveryHandle, Endpoint, Network};
pub use peer::NetworkPeer;
pub use stats::{NetworkStats, NetworkStatsSnapshot};
