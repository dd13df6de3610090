#![forbid(unsafe_code)]

pub mod access;
pub mod catalog;
pub mod model;
pub mod runner;
pub mod time;

pub use access::{AccessContext, AccessDecision, AccessPolicy, LockReason};
pub use catalog::{CatalogError, LessonCatalog, Section};
pub use time::{Clock, ManualClock};
