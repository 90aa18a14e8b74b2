//! SQLite storage for summary records.
//!
//! Each record tracks one submitted article URL and its summary. Records are
//! created with an empty summary (pending) and updated once summarization
//! succeeds.

pub mod error;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{SummaryRecord, SummaryStore};
