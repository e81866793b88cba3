//! # NBTA Storage
//!
//! Append-only byte logs backing replica write stores.
//!
//! Backends are **opaque**: they never interpret the bytes they hold. The
//! record framing, CBOR payloads and replay logic all live in `nbta_core`.
//!
//! ## Design Principles
//!
//! - A backend is a single growing byte sequence (append, read, sync)
//! - Methods take `&self`; implementations synchronise internally
//! - `truncate` exists only to cut off a torn tail found during replay
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral replicas
//! - [`FileBackend`] - For replicas that must survive a restart
//!
//! [`crc32`] is the frame checksum the write log uses on top of them.
//!
//! ## Example
//!
//! ```rust
//! use nbta_storage::{InMemoryBackend, StorageBackend};
//!
//! let backend = InMemoryBackend::new();
//! let offset = backend.append(b"pending").unwrap();
//! assert_eq!(backend.read_at(offset, 7).unwrap(), b"pending");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod checksum;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use checksum::{crc32, Crc32};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
