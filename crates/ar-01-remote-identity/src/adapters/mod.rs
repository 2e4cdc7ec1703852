//! Id source implementations.

pub mod generator;

pub use generator::{RemoteIdGenerator, ScriptedIdSource};
