//! # NBTA Core
//!
//! Non-blocking transactional atomicity for replicated key-value stores.
//!
//! A client commits a multi-key write without a coordinator or locks. Each
//! key's piece is added as a *pending* write on every replica of that key;
//! replicas then notify every replica of every sibling key, and a piece is
//! promoted to *stable* only once the whole transaction footprint has
//! acknowledged it. Readers never block: they see stable writes, and fall
//! back to pending ones only when an earlier read proved one must exist.
//!
//! This crate provides:
//! - The data model ([`Key`], [`Timestamp`], [`Write`])
//! - The [`Store`] contract with [`MemoryStore`] and the log-backed
//!   [`DurableStore`]
//! - The [`Peer`] and [`NotifyReceiver`] messaging contracts and the
//!   [`StaticDirectory`] placement resolver
//! - The per-replica [`Controller`] and the client [`Transaction`]
//!
//! ## Example
//!
//! ```rust
//! use nbta_core::{
//!     Controller, CoreResult, Key, MemoryStore, Notify, NotifyReceiver, Peer, ReplicaAddr,
//!     Timestamp, Transaction,
//! };
//! use std::sync::Mutex;
//!
//! /// A single replica that keeps its own notifications for later.
//! #[derive(Default)]
//! struct Loopback(Mutex<Vec<Notify>>);
//!
//! impl Peer for Loopback {
//!     fn replicas_for(&self, _key: &Key) -> Vec<ReplicaAddr> {
//!         vec![ReplicaAddr::from("solo")]
//!     }
//!
//!     fn async_notify(&self, _to: &ReplicaAddr, notify: Notify) -> CoreResult<()> {
//!         self.0.lock().unwrap().push(notify);
//!         Ok(())
//!     }
//! }
//!
//! let replica = Controller::new(MemoryStore::new(), Loopback::default());
//!
//! let mut txn = Transaction::begin(&replica, Timestamp::new(10))?;
//! txn.set("x", b"xxx".to_vec())?;
//! txn.commit(true)?;
//!
//! let queued: Vec<Notify> = std::mem::take(&mut *replica.peer().0.lock().unwrap());
//! for notify in queued {
//!     replica.receive_notify(&ReplicaAddr::from("solo"), notify)?;
//! }
//!
//! let mut reader = Transaction::begin(&replica, Timestamp::new(11))?;
//! assert_eq!(reader.get(&Key::from("x"))?, Some(b"xxx".to_vec()));
//! # Ok::<(), nbta_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod directory;
mod error;
mod peer;
mod server;
mod stats;
mod store;
mod transaction;
mod types;
mod write;

pub use config::DurableStoreConfig;
pub use controller::Controller;
pub use directory::StaticDirectory;
pub use error::{CoreError, CoreResult};
pub use peer::{Notify, NotifyReceiver, Peer, ReplicaDirectory};
pub use server::Server;
pub use stats::{ControllerStats, ControllerStatsSnapshot};
pub use store::{DurableStore, MemoryStore, Store};
pub use transaction::{Transaction, TransactionState};
pub use types::{Key, ReplicaAddr, Timestamp};
pub use write::Write;
