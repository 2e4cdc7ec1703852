//! # Outbound Port - AcceleratorDriver
//!
//! The local accelerator library the broker fronts. Every method is
//! synchronous and takes native handles only; remote ids never reach the
//! driver.
//!
//! Implementations must be callable from several threads at once. The
//! dispatcher runs requests from different clients in parallel.

use ar_01_remote_identity::{NativeHandle, NativeObject, NativeToken};
use shared_types::{
    DeviceHeader, DriverResult, ErrorInfo, FpgaProperties, Metric, MetricInfo, MetricThreshold,
    Mmio512, SysObjectType, UserClock,
};

/// Properties whose parent is a native token.
pub type LocalProperties = FpgaProperties<NativeToken>;

/// A token as the driver hands it out, with the fields a client needs to
/// pick a device without another round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalToken {
    pub token: NativeToken,
    pub header: DeviceHeader,
}

/// A buffer the driver pinned for DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedBuffer {
    /// Workspace id, the driver's own name for the buffer.
    pub wsid: u64,
    /// Virtual address in the broker process.
    pub address: u64,
}

pub trait AcceleratorDriver: Send + Sync {
    // ---------------------------------------------------------------------
    // Tokens and properties
    // ---------------------------------------------------------------------

    /// Tokens matching any of `filters` (all tokens when empty), at most
    /// `max_tokens` of them, plus the total number of matches.
    fn enumerate(
        &self,
        filters: &[LocalProperties],
        max_tokens: u32,
    ) -> DriverResult<(Vec<LocalToken>, u32)>;

    fn destroy_token(&self, token: NativeToken) -> DriverResult<()>;

    fn clone_token(&self, token: NativeToken) -> DriverResult<LocalToken>;

    fn get_properties(&self, token: NativeToken) -> DriverResult<LocalProperties>;

    /// Re-read the properties from the device.
    fn update_properties(&self, token: NativeToken) -> DriverResult<LocalProperties>;

    // ---------------------------------------------------------------------
    // Handles
    // ---------------------------------------------------------------------

    fn open(&self, token: NativeToken, flags: u32) -> DriverResult<NativeHandle>;

    /// Close a handle. Unmaps its MMIO regions and releases its buffers.
    fn close(&self, handle: NativeHandle) -> DriverResult<()>;

    fn reset(&self, handle: NativeHandle) -> DriverResult<()>;

    fn get_properties_from_handle(&self, handle: NativeHandle) -> DriverResult<LocalProperties>;

    // ---------------------------------------------------------------------
    // MMIO
    // ---------------------------------------------------------------------

    /// Map region `mmio_num`, returning its base address.
    fn map_mmio(&self, handle: NativeHandle, mmio_num: u32) -> DriverResult<u64>;

    fn unmap_mmio(&self, handle: NativeHandle, mmio_num: u32) -> DriverResult<()>;

    fn read_mmio32(&self, handle: NativeHandle, mmio_num: u32, offset: u64) -> DriverResult<u32>;

    fn write_mmio32(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        value: u32,
    ) -> DriverResult<()>;

    fn read_mmio64(&self, handle: NativeHandle, mmio_num: u32, offset: u64) -> DriverResult<u64>;

    fn write_mmio64(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        value: u64,
    ) -> DriverResult<()>;

    fn read_mmio512(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
    ) -> DriverResult<Mmio512>;

    fn write_mmio512(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        values: &Mmio512,
    ) -> DriverResult<()>;

    // ---------------------------------------------------------------------
    // Shared buffers
    // ---------------------------------------------------------------------

    fn prepare_buffer(
        &self,
        handle: NativeHandle,
        length: u64,
        pre_allocated_addr: Option<u64>,
        flags: u32,
    ) -> DriverResult<PreparedBuffer>;

    fn release_buffer(&self, handle: NativeHandle, wsid: u64) -> DriverResult<()>;

    fn get_io_address(&self, handle: NativeHandle, wsid: u64) -> DriverResult<u64>;

    /// Copy `len` bytes out of a prepared buffer.
    fn buf_read(
        &self,
        handle: NativeHandle,
        wsid: u64,
        offset: u64,
        len: u64,
    ) -> DriverResult<Vec<u8>>;

    /// Copy `data` into a prepared buffer.
    fn buf_write(
        &self,
        handle: NativeHandle,
        wsid: u64,
        offset: u64,
        data: &[u8],
    ) -> DriverResult<()>;

    // ---------------------------------------------------------------------
    // Error registers
    // ---------------------------------------------------------------------

    fn read_error(&self, token: NativeToken, error_num: u32) -> DriverResult<u64>;

    fn get_error_info(&self, token: NativeToken, error_num: u32) -> DriverResult<ErrorInfo>;

    fn clear_error(&self, token: NativeToken, error_num: u32) -> DriverResult<()>;

    fn clear_all_errors(&self, token: NativeToken) -> DriverResult<()>;

    // ---------------------------------------------------------------------
    // System objects
    // ---------------------------------------------------------------------

    fn token_get_object(
        &self,
        token: NativeToken,
        name: &str,
        flags: u32,
    ) -> DriverResult<NativeObject>;

    fn handle_get_object(
        &self,
        handle: NativeHandle,
        name: &str,
        flags: u32,
    ) -> DriverResult<NativeObject>;

    fn destroy_object(&self, object: NativeObject) -> DriverResult<()>;

    fn object_get_type(&self, object: NativeObject) -> DriverResult<SysObjectType>;

    fn object_get_name(&self, object: NativeObject) -> DriverResult<String>;

    fn object_get_size(&self, object: NativeObject, flags: u32) -> DriverResult<u32>;

    /// Up to `len` bytes of the object's value starting at `offset`.
    fn object_read(
        &self,
        object: NativeObject,
        offset: u64,
        len: u64,
        flags: u32,
    ) -> DriverResult<Vec<u8>>;

    fn object_read64(&self, object: NativeObject, flags: u32) -> DriverResult<u64>;

    fn object_write64(&self, object: NativeObject, value: u64, flags: u32) -> DriverResult<()>;

    fn object_get_object(
        &self,
        parent: NativeObject,
        name: &str,
        flags: u32,
    ) -> DriverResult<NativeObject>;

    fn object_get_object_at(&self, parent: NativeObject, index: u64) -> DriverResult<NativeObject>;

    // ---------------------------------------------------------------------
    // Clocks and metrics
    // ---------------------------------------------------------------------

    fn set_user_clock(
        &self,
        handle: NativeHandle,
        high_hz: u64,
        low_hz: u64,
        flags: u32,
    ) -> DriverResult<()>;

    fn get_user_clock(&self, handle: NativeHandle, flags: u32) -> DriverResult<UserClock>;

    fn get_num_metrics(&self, handle: NativeHandle) -> DriverResult<u64>;

    /// Descriptions of the first `max` metrics.
    fn get_metrics_info(&self, handle: NativeHandle, max: u64) -> DriverResult<Vec<MetricInfo>>;

    fn get_metrics_by_index(
        &self,
        handle: NativeHandle,
        metric_nums: &[u64],
    ) -> DriverResult<Vec<Metric>>;

    fn get_metrics_by_name(
        &self,
        handle: NativeHandle,
        metric_names: &[String],
    ) -> DriverResult<Vec<Metric>>;

    fn get_metrics_threshold_info(
        &self,
        handle: NativeHandle,
        max: u32,
    ) -> DriverResult<Vec<MetricThreshold>>;

    // ---------------------------------------------------------------------
    // Reconfiguration
    // ---------------------------------------------------------------------

    /// Program `slot` with the bitstream stored at `path`.
    fn reconfigure_slot_by_name(
        &self,
        handle: NativeHandle,
        slot: u32,
        path: &str,
        flags: u32,
    ) -> DriverResult<()>;
}
