//! # Momentum Core
//!
//! Client-side state layer for the habit tracker: one [`store::Store`] holds
//! the authoritative local state, slices expose the operations, and every
//! remote write runs through an optimistic Propose → Commit →
//! Reconcile/Rollback protocol so the UI reflects intent immediately and
//! converges on what the server confirmed.
//!
//! Typical wiring at process start:
//!
//! ```no_run
//! use std::sync::Arc;
//! use momentum_core::backend::{Backend, BackendConfig};
//! use momentum_core::session::FileSessionStore;
//! use momentum_core::store::Store;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = BackendConfig::rest("https://api.example.com");
//! let session = Arc::new(FileSessionStore::new("/tmp/momentum-session")?);
//! let store = Store::new(Backend::from_config(&config)?, session);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod metrics;
pub mod models;
pub mod session;
pub mod store;

pub use backend::{Backend, BackendConfig, BackendKind};
pub use error::BackendError;
pub use store::{MutationOutcome, Store};
