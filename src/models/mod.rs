//! Models module
//!
//! Defines the value types shared by resolvers, the import session and
//! dependency reports.

pub mod dependency;
pub mod enums;
pub mod resource_entry;

pub use dependency::DependencySummary;
pub use enums::*;
pub use resource_entry::{ResourceEntry, ResourceEntryHeader};
