//! # Shared Types Crate
//!
//! Vocabulary shared by the broker and the client stub.
//!
//! ## Design Principles
//!
//! - **Opaque identity**: resources crossing the boundary are named only by
//!   [`RemoteId`]. Native driver handles never leave the server.
//! - **Result codes are data**: every reply carries an [`FpgaResult`]; nothing
//!   is signalled through panics or dropped connections.
//! - **One payload pair per operation**: [`protocol::Request`] and
//!   [`protocol::Reply`] have a variant for every remote operation.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod device;
pub mod properties;
pub mod protocol;
pub mod remote_id;
pub mod result;

pub use device::*;
pub use properties::{AcceleratorState, FpgaProperties, ObjectType, Properties};
pub use protocol::{Enumerated, Outcome, Reply, Request};
pub use remote_id::RemoteId;
pub use result::{DriverResult, FpgaError, FpgaResult};
