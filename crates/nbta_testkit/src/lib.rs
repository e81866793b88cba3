//! # NBTA Testkit
//!
//! Test utilities for NBTA.
//!
//! This crate provides:
//! - [`Cluster`]: a multi-replica deployment on one in-process network
//! - [`TimestampSource`]: a Lamport-style client clock
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//! - Tracing initialisation for tests
//!
//! ## Usage
//!
//! ```rust
//! use nbta_testkit::Cluster;
//!
//! let cluster = Cluster::builder()
//!     .replicas(["r1", "r2", "r3"])
//!     .replication_factor(2)
//!     .build()
//!     .unwrap();
//!
//! cluster.commit(10, [("x", "xx"), ("y", "yy")]).unwrap();
//! cluster.settle().unwrap();
//! assert_eq!(cluster.read(11, "x").unwrap(), Some(b"xx".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod cluster;
pub mod generators;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::cluster::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
}

pub use clock::*;
pub use cluster::*;
pub use generators::*;
pub use logging::*;
pub use stress::*;
