//! Transport adapters.

pub mod tcp;
