//! # Dispatcher Service
//!
//! Executes remote operations against the local driver on behalf of
//! clients that only know remote ids.
//!
//! ## Per-call algorithm
//!
//! 1. Resolve every referenced id in its class map. Sentinel or unknown
//!    ids fail with `InvalidParam` before the driver is touched.
//! 2. Call the driver with the resolved native handles.
//! 3. Creates register the new resource and reply with its id. If the id
//!    cannot be registered the resource is destroyed again and the reply
//!    carries `Exception`.
//! 4. Destroys claim the id first and remove it only once the driver
//!    succeeded. A failed destroy leaves the id valid.
//!
//! Children (MMIO mappings, buffers) record the handle they were created
//! through. Naming a child through a different handle is `NotFound`.

use crate::domain::config::DispatcherConfig;
use crate::domain::patterns::FillPattern;
use crate::ports::outbound::{AcceleratorDriver, LocalProperties, LocalToken};
use ar_01_remote_identity::{
    BufferEntry, Claim, ClaimError, HandleEntry, IdSource, IdentityMap, LocalResource,
    MmioEntry, ObjectEntry, OwnedResource, RemoteIdGenerator, ResourceRegistry, TokenEntry,
};
use shared_types::{
    DriverResult, Enumerated, ErrorInfo, FpgaError, HandleHeader, Metric, MetricInfo,
    MetricThreshold, Mmio512, Properties, RemoteId, SysObjectType, TokenHeader, UserClock,
};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Widths, in bytes, accepted by `buf_poll`.
const POLL_WIDTHS: [u32; 4] = [1, 2, 4, 8];

pub struct Dispatcher<D: AcceleratorDriver> {
    registry: ResourceRegistry,
    driver: D,
    config: DispatcherConfig,
}

impl<D: AcceleratorDriver> Dispatcher<D> {
    /// Dispatcher with a randomly salted id generator.
    pub fn new(driver: D, config: DispatcherConfig) -> Self {
        Self::with_id_source(driver, Arc::new(RemoteIdGenerator::new()), config)
    }

    pub fn with_id_source(driver: D, ids: Arc<dyn IdSource>, config: DispatcherConfig) -> Self {
        Self {
            registry: ResourceRegistry::new(ids),
            driver,
            config,
        }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    // =========================================================================
    // RESOLUTION HELPERS
    // =========================================================================

    fn lookup<V: LocalResource>(map: &IdentityMap<V>, id: &RemoteId) -> DriverResult<V> {
        if !id.is_valid() {
            return Err(FpgaError::InvalidParam);
        }
        map.find(id).ok_or_else(|| {
            debug!(class = map.class(), id = %id, "Unknown remote id");
            FpgaError::InvalidParam
        })
    }

    fn token(&self, id: &RemoteId) -> DriverResult<TokenEntry> {
        Self::lookup(&self.registry.tokens, id)
    }

    fn handle(&self, id: &RemoteId) -> DriverResult<HandleEntry> {
        Self::lookup(&self.registry.handles, id)
    }

    fn object(&self, id: &RemoteId) -> DriverResult<ObjectEntry> {
        Self::lookup(&self.registry.objects, id)
    }

    /// Resolve a child entry and check it belongs to `owner`.
    fn resolve_owned<V>(map: &IdentityMap<V>, id: &RemoteId, owner: &RemoteId) -> DriverResult<V>
    where
        V: LocalResource + OwnedResource,
    {
        let entry = Self::lookup(map, id)?;
        if entry.owner() != *owner {
            warn!(
                class = map.class(),
                id = %id,
                owner = %entry.owner(),
                presented = %owner,
                "Owner mismatch"
            );
            return Err(FpgaError::NotFound);
        }
        Ok(entry)
    }

    fn claim<'a, V: LocalResource>(
        map: &'a IdentityMap<V>,
        id: &RemoteId,
    ) -> DriverResult<Claim<'a, V>> {
        if !id.is_valid() {
            return Err(FpgaError::InvalidParam);
        }
        map.claim(id).map_err(|err| match err {
            ClaimError::Absent => FpgaError::InvalidParam,
            ClaimError::Busy => FpgaError::Busy,
        })
    }

    /// Claim a child entry for teardown. A mismatched owner releases the
    /// claim again.
    fn claim_owned<'a, V>(
        map: &'a IdentityMap<V>,
        id: &RemoteId,
        owner: &RemoteId,
    ) -> DriverResult<Claim<'a, V>>
    where
        V: LocalResource + OwnedResource,
    {
        let claim = Self::claim(map, id)?;
        if claim.entry().owner() != *owner {
            warn!(
                class = map.class(),
                id = %id,
                owner = %claim.entry().owner(),
                presented = %owner,
                "Owner mismatch on teardown"
            );
            return Err(FpgaError::NotFound);
        }
        Ok(claim)
    }

    fn check_payload(&self, len: u64) -> DriverResult<usize> {
        if len > self.config.max_payload_bytes {
            warn!(
                len,
                max = self.config.max_payload_bytes,
                "Payload above limit"
            );
            return Err(FpgaError::InvalidParam);
        }
        Self::byte_len(len)
    }

    /// Bytes that stay on the server are bounded by the buffer, not the
    /// wire payload limit.
    fn byte_len(len: u64) -> DriverResult<usize> {
        usize::try_from(len).map_err(|_| FpgaError::InvalidParam)
    }

    /// Resolve a buffer owned by `handle_id` and check the byte range.
    fn buffer_range(
        &self,
        handle_id: &RemoteId,
        buf_id: &RemoteId,
        offset: u64,
        len: u64,
    ) -> DriverResult<(HandleEntry, BufferEntry)> {
        let handle = self.handle(handle_id)?;
        let buffer = Self::resolve_owned(&self.registry.buffers, buf_id, handle_id)?;
        if !buffer.contains(offset, len) {
            debug!(buf_id = %buf_id, offset, len, length = buffer.length, "Range outside buffer");
            return Err(FpgaError::InvalidParam);
        }
        Ok((handle, buffer))
    }

    // =========================================================================
    // TOKEN TRANSLATION
    // =========================================================================

    fn intern_token(&self, local: &LocalToken) -> DriverResult<RemoteId> {
        self.registry
            .intern(&self.registry.tokens, TokenEntry { token: local.token })
            .map(|registration| registration.id())
            .ok_or(FpgaError::Exception)
    }

    /// Track a freshly obtained token, giving it back to the driver if no id
    /// can be issued for it.
    fn export_token(&self, local: LocalToken) -> DriverResult<TokenHeader> {
        match self.intern_token(&local) {
            Ok(token_id) => Ok(TokenHeader {
                token_id,
                header: local.header,
            }),
            Err(err) => {
                warn!(token = %local.token, "Could not register token, destroying it");
                let _ = self.driver.destroy_token(local.token);
                Err(err)
            }
        }
    }

    fn export_properties(&self, props: LocalProperties) -> DriverResult<Properties> {
        props.try_map_parent(|parent| {
            self.registry
                .intern(&self.registry.tokens, TokenEntry { token: parent })
                .map(|registration| registration.id())
                .ok_or(FpgaError::Exception)
        })
    }

    fn import_filter(&self, filter: &Properties) -> DriverResult<LocalProperties> {
        filter
            .clone()
            .try_map_parent(|parent| self.token(&parent).map(|entry| entry.token))
    }

    /// Register a resource the driver just created. On failure `undo`
    /// destroys it and the caller gets `Exception`.
    fn register_or_undo<V, F>(&self, map: &IdentityMap<V>, entry: V, undo: F) -> DriverResult<RemoteId>
    where
        V: LocalResource,
        F: FnOnce() -> DriverResult<()>,
    {
        match self.registry.register(map, entry) {
            Some(id) => Ok(id),
            None => {
                warn!(class = map.class(), "Could not register new resource, destroying it");
                if let Err(err) = undo() {
                    warn!(class = map.class(), error = %err, "Local destroy after failed registration also failed");
                }
                Err(FpgaError::Exception)
            }
        }
    }

    // =========================================================================
    // TOKENS AND PROPERTIES
    // =========================================================================

    pub fn enumerate(&self, filters: &[Properties], max_tokens: u32) -> DriverResult<Enumerated> {
        let local_filters = filters
            .iter()
            .map(|filter| self.import_filter(filter))
            .collect::<DriverResult<Vec<_>>>()?;

        let (tokens, num_matches) = self.driver.enumerate(&local_filters, max_tokens)?;
        let tokens = tokens
            .into_iter()
            .take(max_tokens as usize)
            .map(|local| self.export_token(local))
            .collect::<DriverResult<Vec<_>>>()?;

        debug!(returned = tokens.len(), num_matches, "Enumerated tokens");
        Ok(Enumerated {
            tokens,
            num_matches,
        })
    }

    pub fn destroy_token(&self, token_id: &RemoteId) -> DriverResult<()> {
        let claim = Self::claim(&self.registry.tokens, token_id)?;
        self.driver.destroy_token(claim.entry().token)?;
        claim.commit();
        debug!(token_id = %token_id, "Destroyed token");
        Ok(())
    }

    pub fn clone_token(&self, src_token_id: &RemoteId) -> DriverResult<TokenHeader> {
        let src = self.token(src_token_id)?;
        let local = self.driver.clone_token(src.token)?;
        self.export_token(local)
    }

    pub fn get_properties(&self, token_id: &RemoteId) -> DriverResult<Properties> {
        let entry = self.token(token_id)?;
        let props = self.driver.get_properties(entry.token)?;
        self.export_properties(props)
    }

    pub fn update_properties(&self, token_id: &RemoteId) -> DriverResult<Properties> {
        let entry = self.token(token_id)?;
        let props = self.driver.update_properties(entry.token)?;
        self.export_properties(props)
    }

    // =========================================================================
    // HANDLES
    // =========================================================================

    pub fn open(&self, token_id: &RemoteId, flags: u32) -> DriverResult<HandleHeader> {
        let token = self.token(token_id)?;
        let handle = self.driver.open(token.token, flags)?;

        let entry = HandleEntry {
            handle,
            token_id: *token_id,
        };
        let handle_id = self.register_or_undo(&self.registry.handles, entry, || {
            self.driver.close(handle)
        })?;
        info!(handle_id = %handle_id, token_id = %token_id, flags, "Opened handle");
        Ok(HandleHeader {
            handle_id,
            token_id: *token_id,
        })
    }

    /// Close a handle and forget the mappings and buffers made through it.
    pub fn close(&self, handle_id: &RemoteId) -> DriverResult<()> {
        let claim = Self::claim(&self.registry.handles, handle_id)?;
        self.driver.close(claim.entry().handle)?;
        claim.commit();

        let mmio = self.registry.mmio.remove_owned_by(handle_id);
        let buffers = self.registry.buffers.remove_owned_by(handle_id);
        info!(
            handle_id = %handle_id,
            mmio = mmio.len(),
            buffers = buffers.len(),
            "Closed handle"
        );
        Ok(())
    }

    pub fn reset(&self, handle_id: &RemoteId) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        self.driver.reset(entry.handle)
    }

    pub fn get_properties_from_handle(&self, handle_id: &RemoteId) -> DriverResult<Properties> {
        let entry = self.handle(handle_id)?;
        let props = self.driver.get_properties_from_handle(entry.handle)?;
        self.export_properties(props)
    }

    // =========================================================================
    // MMIO
    // =========================================================================

    pub fn map_mmio(&self, handle_id: &RemoteId, mmio_num: u32) -> DriverResult<RemoteId> {
        let handle = self.handle(handle_id)?;
        let base = self.driver.map_mmio(handle.handle, mmio_num)?;

        let entry = MmioEntry {
            owner: *handle_id,
            mmio_num,
            base,
        };
        let mmio_id = self.register_or_undo(&self.registry.mmio, entry, || {
            self.driver.unmap_mmio(handle.handle, mmio_num)
        })?;
        debug!(handle_id = %handle_id, mmio_id = %mmio_id, mmio_num, "Mapped MMIO");
        Ok(mmio_id)
    }

    pub fn unmap_mmio(
        &self,
        handle_id: &RemoteId,
        mmio_id: &RemoteId,
        mmio_num: u32,
    ) -> DriverResult<()> {
        let handle = self.handle(handle_id)?;
        let claim = Self::claim_owned(&self.registry.mmio, mmio_id, handle_id)?;
        if claim.entry().mmio_num != mmio_num {
            debug!(
                mmio_id = %mmio_id,
                mapped = claim.entry().mmio_num,
                requested = mmio_num,
                "MMIO region number does not match mapping"
            );
            return Err(FpgaError::InvalidParam);
        }

        self.driver.unmap_mmio(handle.handle, mmio_num)?;
        claim.commit();
        debug!(handle_id = %handle_id, mmio_id = %mmio_id, "Unmapped MMIO");
        Ok(())
    }

    pub fn read_mmio32(&self, handle_id: &RemoteId, mmio_num: u32, offset: u64) -> DriverResult<u32> {
        let entry = self.handle(handle_id)?;
        self.driver.read_mmio32(entry.handle, mmio_num, offset)
    }

    pub fn write_mmio32(
        &self,
        handle_id: &RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u32,
    ) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        self.driver.write_mmio32(entry.handle, mmio_num, offset, value)
    }

    pub fn read_mmio64(&self, handle_id: &RemoteId, mmio_num: u32, offset: u64) -> DriverResult<u64> {
        let entry = self.handle(handle_id)?;
        self.driver.read_mmio64(entry.handle, mmio_num, offset)
    }

    pub fn write_mmio64(
        &self,
        handle_id: &RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u64,
    ) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        self.driver.write_mmio64(entry.handle, mmio_num, offset, value)
    }

    pub fn read_mmio512(
        &self,
        handle_id: &RemoteId,
        mmio_num: u32,
        offset: u64,
    ) -> DriverResult<Mmio512> {
        let entry = self.handle(handle_id)?;
        self.driver.read_mmio512(entry.handle, mmio_num, offset)
    }

    /// Only the first 64 bytes of `values` are written.
    pub fn write_mmio512(
        &self,
        handle_id: &RemoteId,
        mmio_num: u32,
        offset: u64,
        values: &[u8],
    ) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        self.check_payload(values.len() as u64)?;
        let block = Mmio512::from_slice(values).ok_or_else(|| {
            debug!(len = values.len(), "Short write_mmio512 payload");
            FpgaError::InvalidParam
        })?;
        self.driver.write_mmio512(entry.handle, mmio_num, offset, &block)
    }

    // =========================================================================
    // SHARED BUFFERS
    // =========================================================================

    pub fn prepare_buffer(
        &self,
        handle_id: &RemoteId,
        length: u64,
        pre_allocated_addr: Option<u64>,
        flags: u32,
    ) -> DriverResult<RemoteId> {
        let handle = self.handle(handle_id)?;
        let prepared = self
            .driver
            .prepare_buffer(handle.handle, length, pre_allocated_addr, flags)?;

        let entry = BufferEntry {
            owner: *handle_id,
            length,
            flags,
            wsid: prepared.wsid,
            address: prepared.address,
        };
        let buf_id = self.register_or_undo(&self.registry.buffers, entry, || {
            self.driver.release_buffer(handle.handle, prepared.wsid)
        })?;
        debug!(handle_id = %handle_id, buf_id = %buf_id, length, "Prepared buffer");
        Ok(buf_id)
    }

    pub fn release_buffer(&self, handle_id: &RemoteId, buf_id: &RemoteId) -> DriverResult<()> {
        let handle = self.handle(handle_id)?;
        let claim = Self::claim_owned(&self.registry.buffers, buf_id, handle_id)?;
        self.driver.release_buffer(handle.handle, claim.entry().wsid)?;
        claim.commit();
        debug!(handle_id = %handle_id, buf_id = %buf_id, "Released buffer");
        Ok(())
    }

    pub fn get_io_address(&self, handle_id: &RemoteId, buf_id: &RemoteId) -> DriverResult<u64> {
        let handle = self.handle(handle_id)?;
        let buffer = Self::resolve_owned(&self.registry.buffers, buf_id, handle_id)?;
        self.driver.get_io_address(handle.handle, buffer.wsid)
    }

    // =========================================================================
    // ERROR REGISTERS
    // =========================================================================

    pub fn read_error(&self, token_id: &RemoteId, error_num: u32) -> DriverResult<u64> {
        let entry = self.token(token_id)?;
        self.driver.read_error(entry.token, error_num)
    }

    pub fn get_error_info(&self, token_id: &RemoteId, error_num: u32) -> DriverResult<ErrorInfo> {
        let entry = self.token(token_id)?;
        self.driver.get_error_info(entry.token, error_num)
    }

    pub fn clear_error(&self, token_id: &RemoteId, error_num: u32) -> DriverResult<()> {
        let entry = self.token(token_id)?;
        self.driver.clear_error(entry.token, error_num)
    }

    pub fn clear_all_errors(&self, token_id: &RemoteId) -> DriverResult<()> {
        let entry = self.token(token_id)?;
        self.driver.clear_all_errors(entry.token)
    }

    // =========================================================================
    // SYSTEM OBJECTS
    // =========================================================================

    fn register_object(&self, object: ObjectEntry) -> DriverResult<RemoteId> {
        self.register_or_undo(&self.registry.objects, object, || {
            self.driver.destroy_object(object.object)
        })
    }

    pub fn token_get_object(
        &self,
        token_id: &RemoteId,
        name: &str,
        flags: u32,
    ) -> DriverResult<RemoteId> {
        let entry = self.token(token_id)?;
        let object = self.driver.token_get_object(entry.token, name, flags)?;
        self.register_object(ObjectEntry { object })
    }

    pub fn handle_get_object(
        &self,
        handle_id: &RemoteId,
        name: &str,
        flags: u32,
    ) -> DriverResult<RemoteId> {
        let entry = self.handle(handle_id)?;
        let object = self.driver.handle_get_object(entry.handle, name, flags)?;
        self.register_object(ObjectEntry { object })
    }

    pub fn destroy_object(&self, object_id: &RemoteId) -> DriverResult<()> {
        let claim = Self::claim(&self.registry.objects, object_id)?;
        self.driver.destroy_object(claim.entry().object)?;
        claim.commit();
        Ok(())
    }

    pub fn object_get_type(&self, object_id: &RemoteId) -> DriverResult<SysObjectType> {
        let entry = self.object(object_id)?;
        self.driver.object_get_type(entry.object)
    }

    pub fn object_get_name(&self, object_id: &RemoteId) -> DriverResult<String> {
        let entry = self.object(object_id)?;
        self.driver.object_get_name(entry.object)
    }

    pub fn object_get_size(&self, object_id: &RemoteId, flags: u32) -> DriverResult<u32> {
        let entry = self.object(object_id)?;
        self.driver.object_get_size(entry.object, flags)
    }

    /// At most `length` bytes, starting at `offset`.
    pub fn object_read(
        &self,
        object_id: &RemoteId,
        offset: u64,
        length: u64,
        flags: u32,
    ) -> DriverResult<Vec<u8>> {
        let entry = self.object(object_id)?;
        let max = self.check_payload(length)?;
        let mut bytes = self.driver.object_read(entry.object, offset, length, flags)?;
        bytes.truncate(max);
        Ok(bytes)
    }

    pub fn object_read64(&self, object_id: &RemoteId, flags: u32) -> DriverResult<u64> {
        let entry = self.object(object_id)?;
        self.driver.object_read64(entry.object, flags)
    }

    pub fn object_write64(&self, object_id: &RemoteId, value: u64, flags: u32) -> DriverResult<()> {
        let entry = self.object(object_id)?;
        self.driver.object_write64(entry.object, value, flags)
    }

    pub fn object_get_object(
        &self,
        object_id: &RemoteId,
        name: &str,
        flags: u32,
    ) -> DriverResult<RemoteId> {
        let parent = self.object(object_id)?;
        let object = self.driver.object_get_object(parent.object, name, flags)?;
        self.register_object(ObjectEntry { object })
    }

    pub fn object_get_object_at(&self, object_id: &RemoteId, index: u64) -> DriverResult<RemoteId> {
        let parent = self.object(object_id)?;
        let object = self.driver.object_get_object_at(parent.object, index)?;
        self.register_object(ObjectEntry { object })
    }

    // =========================================================================
    // CLOCKS AND METRICS
    // =========================================================================

    pub fn set_user_clock(
        &self,
        handle_id: &RemoteId,
        high_hz: u64,
        low_hz: u64,
        flags: u32,
    ) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        self.driver.set_user_clock(entry.handle, high_hz, low_hz, flags)
    }

    pub fn get_user_clock(&self, handle_id: &RemoteId, flags: u32) -> DriverResult<UserClock> {
        let entry = self.handle(handle_id)?;
        self.driver.get_user_clock(entry.handle, flags)
    }

    pub fn get_num_metrics(&self, handle_id: &RemoteId) -> DriverResult<u64> {
        let entry = self.handle(handle_id)?;
        self.driver.get_num_metrics(entry.handle)
    }

    pub fn get_metrics_info(
        &self,
        handle_id: &RemoteId,
        num_metrics: u64,
    ) -> DriverResult<Vec<MetricInfo>> {
        let entry = self.handle(handle_id)?;
        let mut info = self.driver.get_metrics_info(entry.handle, num_metrics)?;
        info.truncate(usize::try_from(num_metrics).unwrap_or(usize::MAX));
        Ok(info)
    }

    pub fn get_metrics_by_index(
        &self,
        handle_id: &RemoteId,
        metric_nums: &[u64],
    ) -> DriverResult<Vec<Metric>> {
        let entry = self.handle(handle_id)?;
        let mut metrics = self.driver.get_metrics_by_index(entry.handle, metric_nums)?;
        metrics.truncate(metric_nums.len());
        Ok(metrics)
    }

    pub fn get_metrics_by_name(
        &self,
        handle_id: &RemoteId,
        metric_names: &[String],
    ) -> DriverResult<Vec<Metric>> {
        let entry = self.handle(handle_id)?;
        let mut metrics = self.driver.get_metrics_by_name(entry.handle, metric_names)?;
        metrics.truncate(metric_names.len());
        Ok(metrics)
    }

    pub fn get_metrics_threshold_info(
        &self,
        handle_id: &RemoteId,
        num_thresholds: u32,
    ) -> DriverResult<Vec<MetricThreshold>> {
        let entry = self.handle(handle_id)?;
        let mut thresholds = self
            .driver
            .get_metrics_threshold_info(entry.handle, num_thresholds)?;
        thresholds.truncate(num_thresholds as usize);
        Ok(thresholds)
    }

    // =========================================================================
    // RECONFIGURATION
    // =========================================================================

    pub fn reconfigure_slot_by_name(
        &self,
        handle_id: &RemoteId,
        slot: u32,
        path: &str,
        flags: u32,
    ) -> DriverResult<()> {
        let entry = self.handle(handle_id)?;
        info!(handle_id = %handle_id, slot, path, "Reconfiguring slot");
        self.driver
            .reconfigure_slot_by_name(entry.handle, slot, path, flags)
    }

    // =========================================================================
    // BUFFER HELPERS
    // =========================================================================

    pub fn buf_memset(
        &self,
        handle_id: &RemoteId,
        buf_id: &RemoteId,
        offset: u64,
        c: u8,
        n: u64,
    ) -> DriverResult<()> {
        let (handle, buffer) = self.buffer_range(handle_id, buf_id, offset, n)?;
        let len = Self::byte_len(n)?;
        self.driver
            .buf_write(handle.handle, buffer.wsid, offset, &vec![c; len])
    }

    /// Copy the first `n` bytes of `src` into the buffer.
    pub fn buf_memcpy_to_remote(
        &self,
        handle_id: &RemoteId,
        dest_buf_id: &RemoteId,
        dest_offset: u64,
        src: &[u8],
        n: u64,
    ) -> DriverResult<()> {
        let len = self.check_payload(n)?;
        if src.len() < len {
            debug!(have = src.len(), want = n, "Short memcpy payload");
            return Err(FpgaError::InvalidParam);
        }
        let (handle, buffer) = self.buffer_range(handle_id, dest_buf_id, dest_offset, n)?;
        self.driver
            .buf_write(handle.handle, buffer.wsid, dest_offset, &src[..len])
    }

    pub fn buf_memcpy_from_remote(
        &self,
        handle_id: &RemoteId,
        src_buf_id: &RemoteId,
        src_offset: u64,
        n: u64,
    ) -> DriverResult<Vec<u8>> {
        let len = self.check_payload(n)?;
        let (handle, buffer) = self.buffer_range(handle_id, src_buf_id, src_offset, n)?;
        let mut bytes = self
            .driver
            .buf_read(handle.handle, buffer.wsid, src_offset, n)?;
        bytes.truncate(len);
        Ok(bytes)
    }

    /// Read a `width`-byte little-endian word until `(word & mask) ==
    /// (expected_value & mask)`, sleeping between reads.
    ///
    /// Gives up with `Busy` after `loops_timeout` reads.
    #[allow(clippy::too_many_arguments)]
    pub fn buf_poll(
        &self,
        handle_id: &RemoteId,
        buf_id: &RemoteId,
        offset: u64,
        width: u32,
        mask: u64,
        expected_value: u64,
        sleep_interval_us: u64,
        loops_timeout: u64,
    ) -> DriverResult<()> {
        if !POLL_WIDTHS.contains(&width) {
            return Err(FpgaError::InvalidParam);
        }
        let (handle, buffer) = self.buffer_range(handle_id, buf_id, offset, u64::from(width))?;
        let expected = expected_value & mask;
        let sleep = Duration::from_micros(sleep_interval_us);

        for attempt in 0..loops_timeout.max(1) {
            if attempt > 0 && !sleep.is_zero() {
                std::thread::sleep(sleep);
            }
            let bytes = self
                .driver
                .buf_read(handle.handle, buffer.wsid, offset, u64::from(width))?;
            let mut word = [0u8; 8];
            let n = bytes.len().min(width as usize);
            word[..n].copy_from_slice(&bytes[..n]);
            if u64::from_le_bytes(word) & mask == expected {
                return Ok(());
            }
        }

        debug!(buf_id = %buf_id, offset, loops_timeout, "Buffer poll timed out");
        Err(FpgaError::Busy)
    }

    /// Sign of the lexicographic comparison of the two ranges: -1, 0 or 1.
    pub fn buf_memcmp(
        &self,
        handle_id: &RemoteId,
        bufa_id: &RemoteId,
        bufa_offset: u64,
        bufb_id: &RemoteId,
        bufb_offset: u64,
        n: u64,
    ) -> DriverResult<i32> {
        let (handle, a) = self.buffer_range(handle_id, bufa_id, bufa_offset, n)?;
        let (_, b) = self.buffer_range(handle_id, bufb_id, bufb_offset, n)?;

        let left = self.driver.buf_read(handle.handle, a.wsid, bufa_offset, n)?;
        let right = self.driver.buf_read(handle.handle, b.wsid, bufb_offset, n)?;
        Ok(match left.cmp(&right) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    }

    /// Fill the whole buffer with a named pattern.
    pub fn buf_write_pattern(
        &self,
        handle_id: &RemoteId,
        buf_id: &RemoteId,
        pattern_name: &str,
    ) -> DriverResult<()> {
        let handle = self.handle(handle_id)?;
        let buffer = Self::resolve_owned(&self.registry.buffers, buf_id, handle_id)?;
        let pattern: FillPattern = pattern_name.parse().map_err(|_| {
            debug!(pattern = pattern_name, "Unknown fill pattern");
            FpgaError::InvalidParam
        })?;

        let bytes = pattern.fill(Self::byte_len(buffer.length)?);
        self.driver.buf_write(handle.handle, buffer.wsid, 0, &bytes)
    }
}
