//! Briefing Cache Library
//! Reconciles three storage tiers for per-user daily briefings: the durable
//! store service (source of truth), an in-process accelerator map, and a
//! single-record file that survives restarts.

mod file_tier;
mod memory;
mod record;
mod store;

pub mod durable;

pub use durable::{BriefingStore, HttpBriefingStore, InMemoryBriefingStore, StoreConfig, StoreError};
pub use file_tier::FileTier;
pub use memory::MemoryTier;
pub use record::{BriefingRecord, BriefingVariant};
pub use store::{BriefingCache, CacheError};
