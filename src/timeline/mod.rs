//! Merged, paginated home timeline.
//!
//! Each source keeps its own items and end-of-data flag. The paging cursor
//! is never stored; it is read off the oldest item held.

pub mod state;
pub mod synchronizer;

pub use state::{SourceState, TimelineState};
pub use synchronizer::{LoadOutcome, SourceReport, TimelineSynchronizer};
