//! # Accel-Remote Test Suite
//!
//! End-to-end scenarios that drive a real broker over loopback TCP through
//! the client stub, plus benchmarks.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs            # Broker on an ephemeral port + client factory
//! └── integration/
//!     ├── handles.rs        # open / mmio / close, concurrent teardown
//!     ├── buffers.rs        # ownership cross-checks, buffer helpers
//!     ├── enumeration.rs    # id reuse, parent translation, objects, metrics
//!     └── transport.rs      # server loss, rejected frames, reconnects
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ar-tests
//! cargo test -p ar-tests integration::buffers
//! cargo bench -p ar-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod harness;
pub mod integration;
