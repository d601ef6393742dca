//! # FlatStore
//!
//! An embedded key-value store kept in a single JSON file:
//! - Whole-file reload before every operation
//! - Whole-file rewrite (truncated, optionally fsynced) after every mutation
//! - One lock per store serializing reload, mutation and persist
//! - Typed reads and writes through serde
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Request Handlers / CLI                      │
//! │                 (share Arc<FlatStore>)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      FlatStore                               │
//! │              (one Mutex, one critical section)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Snapshot   │  reload  │  db.json    │
//!   │  (BTreeMap) │◄────────►│ (one file)  │
//!   └─────────────┘  persist └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod tracking;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatError, Result};
pub use config::{Config, SyncStrategy};
pub use store::FlatStore;
pub use tracking::{TrackedEntry, Tracker, TrackingRecord};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FlatStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
