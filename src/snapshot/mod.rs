mod composer;
pub mod encode;

pub use composer::SnapshotComposer;
