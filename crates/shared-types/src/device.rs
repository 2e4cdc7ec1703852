//! # Device Vocabulary
//!
//! Plain data returned by device operations: token and handle headers,
//! error descriptors, sysfs-like object kinds, user clocks and metrics.

use crate::properties::ObjectType;
use crate::remote_id::RemoteId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

// =============================================================================
// FLAGS
// =============================================================================

/// Bit flags accepted by open, prepare-buffer and the object calls.
///
/// Flags are forwarded to the driver verbatim; these constants name the bits
/// the bundled simulated driver understands.
pub mod flags {
    /// Open: allow more than one concurrent handle on a token.
    pub const OPEN_SHARED: u32 = 1 << 0;

    /// Prepare-buffer: the caller supplies the address.
    pub const BUF_PREALLOCATED: u32 = 1 << 0;
    /// Prepare-buffer: do not log allocation failures.
    pub const BUF_QUIET: u32 = 1 << 1;
    /// Prepare-buffer: the device may only read the buffer.
    pub const BUF_READ_ONLY: u32 = 1 << 2;

    /// Object calls: re-read the backing value instead of using a cache.
    pub const OBJECT_SYNC: u32 = 1 << 0;
    /// Object calls: treat the name as a glob pattern.
    pub const OBJECT_GLOB: u32 = 1 << 1;
    /// Object calls: return raw bytes without parsing.
    pub const OBJECT_RAW: u32 = 1 << 2;
}

// =============================================================================
// HEADERS
// =============================================================================

/// Identifying fields of an enumerated device or accelerator.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHeader {
    pub vendor_id: u16,
    pub device_id: u16,
    pub segment: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    pub interface: String,
    pub object_type: ObjectType,
    pub object_id: u64,
    #[serde_as(as = "Bytes")]
    pub guid: [u8; 16],
    pub subsystem_vendor_id: u16,
    pub subsystem_device_id: u16,
}

/// An enumerated token as seen by a remote client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Broker-issued id for the token.
    pub token_id: RemoteId,
    pub header: DeviceHeader,
}

/// An opened handle as seen by a remote client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleHeader {
    /// Broker-issued id for the handle.
    pub handle_id: RemoteId,
    /// Token the handle was opened from.
    pub token_id: RemoteId,
}

// =============================================================================
// ERRORS, OBJECTS, CLOCKS
// =============================================================================

/// Descriptor of one error register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub can_clear: bool,
}

/// Kind of a sysfs-like object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SysObjectType {
    /// Holds child objects.
    Container,
    /// Holds a value.
    Attribute,
}

/// User clock pair, in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserClock {
    pub high_hz: u64,
    pub low_hz: u64,
}

/// One 512-bit MMIO word.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mmio512(#[serde_as(as = "Bytes")] pub [u8; 64]);

impl Mmio512 {
    pub const LEN: usize = 64;

    /// Build from a slice. `None` unless at least 64 bytes are given; extra
    /// bytes are ignored.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let head = bytes.get(..Self::LEN)?;
        let mut word = [0u8; 64];
        word.copy_from_slice(head);
        Some(Self(word))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Mmio512 {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

// =============================================================================
// METRICS
// =============================================================================

/// Data type of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricDatatype {
    Int,
    Float,
    Double,
    Bool,
    Unknown,
}

/// Category of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    Power,
    Thermal,
    Performance,
    Afu,
    Unknown,
}

/// Static description of a metric.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub metric_num: u64,
    #[serde_as(as = "Bytes")]
    pub metric_guid: [u8; 16],
    pub qualifier_name: String,
    pub group_name: String,
    pub metric_name: String,
    pub metric_units: String,
    pub datatype: MetricDatatype,
    pub metric_type: MetricType,
}

/// A sampled metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Int(u64),
    Double(f64),
    Bool(bool),
}

/// One metric sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_num: u64,
    pub value: MetricValue,
    pub is_valid: bool,
}

/// A named threshold value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub name: String,
    pub value: f64,
}

/// Threshold set of one metric. Unset levels are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricThreshold {
    pub metric_name: String,
    pub upper_non_recoverable: Option<Threshold>,
    pub upper_critical: Option<Threshold>,
    pub upper_non_critical: Option<Threshold>,
    pub lower_non_recoverable: Option<Threshold>,
    pub lower_critical: Option<Threshold>,
    pub lower_non_critical: Option<Threshold>,
    pub hysteresis: Option<Threshold>,
}
