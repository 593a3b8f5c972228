pub mod snapshot;

pub use snapshot::{ObjectRecord, Snapshot, SnapshotSummary};
