//! Farm registry: group classification, farm records and the pipe index.

pub mod farm;
pub mod group;
pub mod pipes;

pub use farm::{FarmRecord, ingest_registry};
pub use group::{Group, RegistryFlags, SubStatus, Track, TrackFlags, classify};
pub use pipes::PipeRegistry;
