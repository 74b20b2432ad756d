pub mod comparator;
pub mod engine;
pub mod purge;
pub mod transfer;

pub use comparator::{Classification, CompareConfig, ComparePolicy, FileComparator, FileRelation};
pub use engine::{LevelOutcome, SyncEngine, SyncReport};
pub use purge::purge;
pub use transfer::{reconcile, EntryFailure, TransferSummary};
