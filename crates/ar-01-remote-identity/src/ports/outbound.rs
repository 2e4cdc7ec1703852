//! Outbound (driven) ports.

use shared_types::RemoteId;

/// Source of fresh remote ids.
///
/// Abstracted so tests can inject deterministic or colliding sequences.
pub trait IdSource: Send + Sync {
    /// Returns an id. Production sources never repeat and never return
    /// [`RemoteId::INVALID`]; callers must still cope with both.
    fn next_id(&self) -> RemoteId;
}
