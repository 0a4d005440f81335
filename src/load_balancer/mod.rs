//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! POST /add { address }
//!     → backend.rs (parse + validate target)
//!     → registry.rs (append under lock, publish new snapshot)
//!
//! Proxied request
//!     → registry.rs (atomic cursor++, snapshot[cursor % len])
//!     → Arc<Backend> handed to the dispatcher
//! ```
//!
//! # Design Decisions
//! - Append-only: positions never change meaning once assigned
//! - Lock-free selection; only registration takes a lock
//! - Plain round robin, no health or weight filtering

pub mod backend;
pub mod registry;

pub use backend::{Backend, BackendId, BackendTarget};
pub use registry::{BackendRegistry, RegistryError};
