//! `hermes-core`: order records and the store they live in.
//!
//! No file formats here: CSV and backup codecs live in `hermes-io`, the
//! import engine in `hermes-recon`.

pub mod candidate;
pub mod memory;
pub mod order;
pub mod stats;
pub mod store;
pub mod validation;

pub use candidate::{Candidate, ParsedCandidate, RowError};
pub use memory::MemoryStore;
pub use order::{
    new_order_id, normalize_executors, now_timestamp, Executor, ExecutorRole, LookupField, Order,
    OrderField, OrderStatus, SortDirection, EXECUTOR_SLOTS,
};
pub use stats::{compute_stats, OrderStats};
pub use store::{archive_order, delete_many, save_order, OrderStore, SaveError, StoreError};
pub use validation::ValidationError;
