//! # Wire Protocol
//!
//! One [`Request`] variant and one [`Reply`] variant per remote operation.
//! Resources are always referenced by full [`RemoteId`]s, scalars travel as
//! fixed-width integers and byte payloads as length-carrying vectors.
//!
//! Every reply carries an [`Outcome`], whose `result` is always set. The
//! value is only present when the result is `Ok`.

use crate::device::{
    ErrorInfo, HandleHeader, Metric, MetricInfo, MetricThreshold, Mmio512, SysObjectType,
    TokenHeader, UserClock,
};
use crate::properties::Properties;
use crate::remote_id::RemoteId;
use crate::result::{DriverResult, FpgaError, FpgaResult};
use serde::{Deserialize, Serialize};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result code plus the value produced on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub result: FpgaResult,
    pub value: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            result: FpgaResult::Ok,
            value: Some(value),
        }
    }

    pub fn err(err: FpgaError) -> Self {
        Self {
            result: err.into(),
            value: None,
        }
    }

    /// Split into the operation result.
    ///
    /// Returns `None` for a success code without a value, which no
    /// well-behaved peer sends.
    pub fn into_result(self) -> Option<DriverResult<T>> {
        match (FpgaError::from_result(self.result), self.value) {
            (Some(err), _) => Some(Err(err)),
            (None, Some(value)) => Some(Ok(value)),
            (None, None) => None,
        }
    }
}

impl<T> From<DriverResult<T>> for Outcome<T> {
    fn from(result: DriverResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::ok(value),
            Err(err) => Outcome::err(err),
        }
    }
}

/// Enumeration result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumerated {
    /// At most `max_tokens` headers.
    pub tokens: Vec<TokenHeader>,
    /// Total matches, which may exceed `tokens.len()`.
    pub num_matches: u32,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A remote operation and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    // Tokens and properties
    Enumerate {
        filters: Vec<Properties>,
        max_tokens: u32,
    },
    DestroyToken {
        token_id: RemoteId,
    },
    CloneToken {
        src_token_id: RemoteId,
    },
    GetProperties {
        token_id: RemoteId,
    },
    UpdateProperties {
        token_id: RemoteId,
    },

    // Handles
    Open {
        token_id: RemoteId,
        flags: u32,
    },
    Close {
        handle_id: RemoteId,
    },
    Reset {
        handle_id: RemoteId,
    },
    GetPropertiesFromHandle {
        handle_id: RemoteId,
    },

    // MMIO
    MapMmio {
        handle_id: RemoteId,
        mmio_num: u32,
    },
    UnmapMmio {
        handle_id: RemoteId,
        mmio_id: RemoteId,
        mmio_num: u32,
    },
    ReadMmio32 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    },
    WriteMmio32 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u32,
    },
    ReadMmio64 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    },
    WriteMmio64 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u64,
    },
    ReadMmio512 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    },
    WriteMmio512 {
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        values: Vec<u8>,
    },

    // Buffers
    PrepareBuffer {
        handle_id: RemoteId,
        length: u64,
        pre_allocated_addr: Option<u64>,
        flags: u32,
    },
    ReleaseBuffer {
        handle_id: RemoteId,
        buf_id: RemoteId,
    },
    GetIoAddress {
        handle_id: RemoteId,
        buf_id: RemoteId,
    },

    // Errors
    ReadError {
        token_id: RemoteId,
        error_num: u32,
    },
    GetErrorInfo {
        token_id: RemoteId,
        error_num: u32,
    },
    ClearError {
        token_id: RemoteId,
        error_num: u32,
    },
    ClearAllErrors {
        token_id: RemoteId,
    },

    // System objects
    TokenGetObject {
        token_id: RemoteId,
        name: String,
        flags: u32,
    },
    HandleGetObject {
        handle_id: RemoteId,
        name: String,
        flags: u32,
    },
    DestroyObject {
        object_id: RemoteId,
    },
    ObjectGetType {
        object_id: RemoteId,
    },
    ObjectGetName {
        object_id: RemoteId,
    },
    ObjectGetSize {
        object_id: RemoteId,
        flags: u32,
    },
    ObjectRead {
        object_id: RemoteId,
        offset: u64,
        length: u64,
        flags: u32,
    },
    ObjectRead64 {
        object_id: RemoteId,
        flags: u32,
    },
    ObjectWrite64 {
        object_id: RemoteId,
        value: u64,
        flags: u32,
    },
    ObjectGetObject {
        object_id: RemoteId,
        name: String,
        flags: u32,
    },
    ObjectGetObjectAt {
        object_id: RemoteId,
        index: u64,
    },

    // Clocks and metrics
    SetUserClock {
        handle_id: RemoteId,
        high_hz: u64,
        low_hz: u64,
        flags: u32,
    },
    GetUserClock {
        handle_id: RemoteId,
        flags: u32,
    },
    GetNumMetrics {
        handle_id: RemoteId,
    },
    GetMetricsInfo {
        handle_id: RemoteId,
        num_metrics: u64,
    },
    GetMetricsByIndex {
        handle_id: RemoteId,
        metric_nums: Vec<u64>,
    },
    GetMetricsByName {
        handle_id: RemoteId,
        metric_names: Vec<String>,
    },
    GetMetricsThresholdInfo {
        handle_id: RemoteId,
        num_thresholds: u32,
    },

    // Reconfiguration
    ReconfigureSlotByName {
        handle_id: RemoteId,
        slot: u32,
        path: String,
        flags: u32,
    },

    // Buffer helpers
    BufMemSet {
        handle_id: RemoteId,
        buf_id: RemoteId,
        offset: u64,
        c: u8,
        n: u64,
    },
    BufMemCpyToRemote {
        handle_id: RemoteId,
        dest_buf_id: RemoteId,
        dest_offset: u64,
        src: Vec<u8>,
        n: u64,
    },
    BufMemCpyFromRemote {
        handle_id: RemoteId,
        src_buf_id: RemoteId,
        src_offset: u64,
        n: u64,
    },
    BufPoll {
        handle_id: RemoteId,
        buf_id: RemoteId,
        offset: u64,
        width: u32,
        mask: u64,
        expected_value: u64,
        sleep_interval_us: u64,
        loops_timeout: u64,
    },
    BufMemCmp {
        handle_id: RemoteId,
        bufa_id: RemoteId,
        bufa_offset: u64,
        bufb_id: RemoteId,
        bufb_offset: u64,
        n: u64,
    },
    BufWritePattern {
        handle_id: RemoteId,
        buf_id: RemoteId,
        pattern_name: String,
    },
}

impl Request {
    /// Operation name, for logs.
    pub fn method(&self) -> &'static str {
        match self {
            Request::Enumerate { .. } => "enumerate",
            Request::DestroyToken { .. } => "destroy_token",
            Request::CloneToken { .. } => "clone_token",
            Request::GetProperties { .. } => "get_properties",
            Request::UpdateProperties { .. } => "update_properties",
            Request::Open { .. } => "open",
            Request::Close { .. } => "close",
            Request::Reset { .. } => "reset",
            Request::GetPropertiesFromHandle { .. } => "get_properties_from_handle",
            Request::MapMmio { .. } => "map_mmio",
            Request::UnmapMmio { .. } => "unmap_mmio",
            Request::ReadMmio32 { .. } => "read_mmio32",
            Request::WriteMmio32 { .. } => "write_mmio32",
            Request::ReadMmio64 { .. } => "read_mmio64",
            Request::WriteMmio64 { .. } => "write_mmio64",
            Request::ReadMmio512 { .. } => "read_mmio512",
            Request::WriteMmio512 { .. } => "write_mmio512",
            Request::PrepareBuffer { .. } => "prepare_buffer",
            Request::ReleaseBuffer { .. } => "release_buffer",
            Request::GetIoAddress { .. } => "get_io_address",
            Request::ReadError { .. } => "read_error",
            Request::GetErrorInfo { .. } => "get_error_info",
            Request::ClearError { .. } => "clear_error",
            Request::ClearAllErrors { .. } => "clear_all_errors",
            Request::TokenGetObject { .. } => "token_get_object",
            Request::HandleGetObject { .. } => "handle_get_object",
            Request::DestroyObject { .. } => "destroy_object",
            Request::ObjectGetType { .. } => "object_get_type",
            Request::ObjectGetName { .. } => "object_get_name",
            Request::ObjectGetSize { .. } => "object_get_size",
            Request::ObjectRead { .. } => "object_read",
            Request::ObjectRead64 { .. } => "object_read64",
            Request::ObjectWrite64 { .. } => "object_write64",
            Request::ObjectGetObject { .. } => "object_get_object",
            Request::ObjectGetObjectAt { .. } => "object_get_object_at",
            Request::SetUserClock { .. } => "set_user_clock",
            Request::GetUserClock { .. } => "get_user_clock",
            Request::GetNumMetrics { .. } => "get_num_metrics",
            Request::GetMetricsInfo { .. } => "get_metrics_info",
            Request::GetMetricsByIndex { .. } => "get_metrics_by_index",
            Request::GetMetricsByName { .. } => "get_metrics_by_name",
            Request::GetMetricsThresholdInfo { .. } => "get_metrics_threshold_info",
            Request::ReconfigureSlotByName { .. } => "reconfigure_slot_by_name",
            Request::BufMemSet { .. } => "buf_memset",
            Request::BufMemCpyToRemote { .. } => "buf_memcpy_to_remote",
            Request::BufMemCpyFromRemote { .. } => "buf_memcpy_from_remote",
            Request::BufPoll { .. } => "buf_poll",
            Request::BufMemCmp { .. } => "buf_memcmp",
            Request::BufWritePattern { .. } => "buf_write_pattern",
        }
    }
}

// =============================================================================
// REPLIES
// =============================================================================

macro_rules! replies {
    ($($variant:ident($value:ty) => $method:literal,)*) => {
        /// Reply to a [`Request`], in the variant of the same name.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Reply {
            $($variant(Outcome<$value>),)*
            /// The broker could not decode or accept the request.
            Rejected { reason: String },
        }

        impl Reply {
            /// Operation name, for logs. Matches [`Request::method`].
            pub fn method(&self) -> &'static str {
                match self {
                    $(Reply::$variant(_) => $method,)*
                    Reply::Rejected { .. } => "rejected",
                }
            }

            /// The carried result code, absent for `Rejected`.
            pub fn result(&self) -> Option<FpgaResult> {
                match self {
                    $(Reply::$variant(outcome) => Some(outcome.result),)*
                    Reply::Rejected { .. } => None,
                }
            }
        }
    };
}

replies! {
    Enumerate(Enumerated) => "enumerate",
    DestroyToken(()) => "destroy_token",
    CloneToken(TokenHeader) => "clone_token",
    GetProperties(Properties) => "get_properties",
    UpdateProperties(Properties) => "update_properties",
    Open(HandleHeader) => "open",
    Close(()) => "close",
    Reset(()) => "reset",
    GetPropertiesFromHandle(Properties) => "get_properties_from_handle",
    MapMmio(RemoteId) => "map_mmio",
    UnmapMmio(()) => "unmap_mmio",
    ReadMmio32(u32) => "read_mmio32",
    WriteMmio32(()) => "write_mmio32",
    ReadMmio64(u64) => "read_mmio64",
    WriteMmio64(()) => "write_mmio64",
    ReadMmio512(Mmio512) => "read_mmio512",
    WriteMmio512(()) => "write_mmio512",
    PrepareBuffer(RemoteId) => "prepare_buffer",
    ReleaseBuffer(()) => "release_buffer",
    GetIoAddress(u64) => "get_io_address",
    ReadError(u64) => "read_error",
    GetErrorInfo(ErrorInfo) => "get_error_info",
    ClearError(()) => "clear_error",
    ClearAllErrors(()) => "clear_all_errors",
    TokenGetObject(RemoteId) => "token_get_object",
    HandleGetObject(RemoteId) => "handle_get_object",
    DestroyObject(()) => "destroy_object",
    ObjectGetType(SysObjectType) => "object_get_type",
    ObjectGetName(String) => "object_get_name",
    ObjectGetSize(u32) => "object_get_size",
    ObjectRead(Vec<u8>) => "object_read",
    ObjectRead64(u64) => "object_read64",
    ObjectWrite64(()) => "object_write64",
    ObjectGetObject(RemoteId) => "object_get_object",
    ObjectGetObjectAt(RemoteId) => "object_get_object_at",
    SetUserClock(()) => "set_user_clock",
    GetUserClock(UserClock) => "get_user_clock",
    GetNumMetrics(u64) => "get_num_metrics",
    GetMetricsInfo(Vec<MetricInfo>) => "get_metrics_info",
    GetMetricsByIndex(Vec<Metric>) => "get_metrics_by_index",
    GetMetricsByName(Vec<Metric>) => "get_metrics_by_name",
    GetMetricsThresholdInfo(Vec<MetricThreshold>) => "get_metrics_threshold_info",
    ReconfigureSlotByName(()) => "reconfigure_slot_by_name",
    BufMemSet(()) => "buf_memset",
    BufMemCpyToRemote(()) => "buf_memcpy_to_remote",
    BufMemCpyFromRemote(Vec<u8>) => "buf_memcpy_from_remote",
    BufPoll(()) => "buf_poll",
    BufMemCmp(i32) => "buf_memcmp",
    BufWritePattern(()) => "buf_write_pattern",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_driver_result() {
        let ok: Outcome<u32> = Ok(5).into();
        assert_eq!(ok.result, FpgaResult::Ok);
        assert_eq!(ok.value, Some(5));

        let err: Outcome<u32> = Err(FpgaError::NoMemory).into();
        assert_eq!(err.result, FpgaResult::NoMemory);
        assert_eq!(err.value, None);
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(Outcome::ok(1u8).into_result(), Some(Ok(1)));
        assert_eq!(
            Outcome::<u8>::err(FpgaError::Busy).into_result(),
            Some(Err(FpgaError::Busy))
        );

        let malformed = Outcome::<u8> {
            result: FpgaResult::Ok,
            value: None,
        };
        assert_eq!(malformed.into_result(), None);
    }

    #[test]
    fn test_error_code_wins_over_stray_value() {
        let outcome = Outcome {
            result: FpgaResult::NotFound,
            value: Some(3u64),
        };
        assert_eq!(outcome.into_result(), Some(Err(FpgaError::NotFound)));
    }

    #[test]
    fn test_reply_method_matches_request() {
        let request = Request::Close {
            handle_id: RemoteId::new(1, 2),
        };
        let reply = Reply::Close(Outcome::ok(()));
        assert_eq!(request.method(), reply.method());
        assert_eq!(reply.result(), Some(FpgaResult::Ok));
    }

    #[test]
    fn test_rejected_has_no_result() {
        let reply = Reply::Rejected {
            reason: "bad frame".into(),
        };
        assert_eq!(reply.result(), None);
        assert_eq!(reply.method(), "rejected");
    }

    #[test]
    fn test_request_survives_bincode() {
        let request = Request::WriteMmio512 {
            handle_id: RemoteId::new(3, 4),
            mmio_num: 0,
            offset: 0x40,
            values: vec![0xab; 64],
        };
        let bytes = bincode::serialize(&request).unwrap();
        let decoded: Request = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, request);
    }
}
