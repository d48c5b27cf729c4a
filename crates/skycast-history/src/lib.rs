//! Search history for SkyCast.
//!
//! Provides the bounded, case-insensitively de-duplicated city list, its
//! key-value persistence, and the timed undo window for removals.

pub mod error;
pub mod storage;
pub mod store;
pub mod undo;

pub use error::StorageError;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{HistoryStore, LoadOutcome, SharedHistory};
pub use undo::{
    PendingDeletion, UndoCoordinator, UndoState, DEFAULT_UNDO_DURATION, SETTLE_DELAY,
    TICK_INTERVAL,
};
