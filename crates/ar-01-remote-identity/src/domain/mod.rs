//! # Domain Layer - Remote Identity
//!
//! - `native`: opaque driver handles
//! - `entries`: typed per-class entries and the ownership relation
//! - `map`: `IdentityMap<V>` with claim-based teardown
//! - `registry`: the five maps of one broker

pub mod entries;
pub mod map;
pub mod native;
pub mod registry;

pub use entries::*;
pub use map::*;
pub use native::*;
pub use registry::*;
