//! # Simulated Driver
//!
//! In-memory [`AcceleratorDriver`] used by the broker binary when no
//! hardware backend is linked, and by the tests.
//!
//! Besides behaving like a small set of cards it counts every call it
//! receives and can be told to fail the next call of a given operation.

mod model;

pub use model::{
    SysNode, AFU_ID_H, AFU_ID_L, DEFAULT_AFU_GUID, FME_GUID, MAX_BUFFER_BYTES, MMIO_REGION_BYTES,
};

use crate::ports::outbound::{AcceleratorDriver, LocalProperties, LocalToken, PreparedBuffer};
use ar_01_remote_identity::{NativeHandle, NativeObject, NativeToken};
use model::{metric_table, parse_attr_u64, split_path, threshold_table, Resource};
use parking_lot::Mutex;
use shared_types::{
    flags, DriverResult, ErrorInfo, FpgaError, Metric, MetricInfo, MetricThreshold,
    MetricValue, Mmio512, SysObjectType, UserClock,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

const CANONICAL_TOKEN_BASE: u64 = 0x1000;
const CLONED_TOKEN_BASE: u64 = 0x10_0000;
const HANDLE_BASE: u64 = 0x2000_0000;
const OBJECT_BASE: u64 = 0x3000_0000;
const MMIO_BASE: u64 = 0x4000_0000;
const IOVA_BASE: u64 = 0x1_0000_0000;
const VIRT_BASE: u64 = 0x7f00_0000_0000;

#[derive(Debug)]
struct SimBuffer {
    data: Vec<u8>,
    address: u64,
    iova: u64,
}

#[derive(Debug)]
struct SimHandle {
    resource: usize,
    exclusive: bool,
    mapped: BTreeSet<u32>,
    buffers: HashMap<u64, SimBuffer>,
}

#[derive(Debug, Clone)]
struct SimObject {
    resource: usize,
    path: Vec<String>,
}

#[derive(Debug)]
struct SimState {
    resources: Vec<Resource>,
    /// Live tokens and the resource each names.
    tokens: HashMap<NativeToken, usize>,
    handles: HashMap<NativeHandle, SimHandle>,
    objects: HashMap<NativeObject, SimObject>,
    next_token: u64,
    next_handle: u64,
    next_object: u64,
    next_wsid: u64,
    /// Hand out the lowest free handle value, like an allocator would.
    recycle_handles: bool,
}

impl SimState {
    fn resource_of(&self, token: NativeToken) -> DriverResult<usize> {
        self.tokens
            .get(&token)
            .copied()
            .ok_or(FpgaError::InvalidParam)
    }

    fn handle(&self, handle: NativeHandle) -> DriverResult<&SimHandle> {
        self.handles.get(&handle).ok_or(FpgaError::InvalidParam)
    }

    fn handle_mut(&mut self, handle: NativeHandle) -> DriverResult<&mut SimHandle> {
        self.handles.get_mut(&handle).ok_or(FpgaError::InvalidParam)
    }

    fn object(&self, object: NativeObject) -> DriverResult<&SimObject> {
        self.objects.get(&object).ok_or(FpgaError::InvalidParam)
    }

    fn node(&self, object: &SimObject) -> DriverResult<&SysNode> {
        self.resources[object.resource]
            .sysfs
            .find(&object.path)
            .ok_or(FpgaError::NotFound)
    }

    fn attribute(&self, object: NativeObject) -> DriverResult<&str> {
        let object = self.object(object)?;
        match self.node(object)? {
            SysNode::Attribute(value) => Ok(value.as_str()),
            SysNode::Container(_) => Err(FpgaError::InvalidParam),
        }
    }

    /// Make sure the resource's canonical token is live and return it.
    fn publish(&mut self, resource: usize) -> NativeToken {
        let token = self.resources[resource].canonical;
        self.tokens.insert(token, resource);
        token
    }

    fn local_token(&mut self, resource: usize, token: NativeToken) -> LocalToken {
        self.tokens.insert(token, resource);
        LocalToken {
            token,
            header: self.resources[resource].header(),
        }
    }

    /// Properties with the parent published as a live token.
    fn properties(&mut self, resource: usize) -> LocalProperties {
        if let Some(parent) = self.resources[resource].props.parent {
            if let Some(index) = self.resources.iter().position(|r| r.canonical == parent) {
                self.publish(index);
            }
        }
        self.resources[resource].properties()
    }

    fn new_object(&mut self, resource: usize, path: Vec<String>) -> DriverResult<NativeObject> {
        self.resources[resource]
            .sysfs
            .find(&path)
            .ok_or(FpgaError::NotFound)?;
        let object = NativeObject(OBJECT_BASE + self.next_object);
        self.next_object += 1;
        self.objects.insert(object, SimObject { resource, path });
        Ok(object)
    }

    fn region(
        &mut self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        width: usize,
    ) -> DriverResult<&mut [u8]> {
        let resource = self.handle(handle)?.resource;
        let region = self.resources[resource]
            .regions
            .get_mut(mmio_num as usize)
            .ok_or(FpgaError::InvalidParam)?;
        let start = usize::try_from(offset).map_err(|_| FpgaError::InvalidParam)?;
        let end = start.checked_add(width).ok_or(FpgaError::InvalidParam)?;
        if start % width != 0 || end > region.len() {
            return Err(FpgaError::InvalidParam);
        }
        Ok(&mut region[start..end])
    }

    fn buffer_mut(&mut self, handle: NativeHandle, wsid: u64) -> DriverResult<&mut SimBuffer> {
        self.handle_mut(handle)?
            .buffers
            .get_mut(&wsid)
            .ok_or(FpgaError::InvalidParam)
    }

    fn sample(&mut self, resource: usize, metric_num: u64) -> DriverResult<Metric> {
        let resource = &mut self.resources[resource];
        let value = match metric_num {
            0 => MetricValue::Double(21.5 + resource.card as f64),
            1 => MetricValue::Double(45.0),
            2 => {
                resource.perf_counter += 1;
                MetricValue::Int(resource.perf_counter)
            }
            _ => return Err(FpgaError::NotFound),
        };
        Ok(Metric {
            metric_num,
            value,
            is_valid: true,
        })
    }
}

/// In-memory driver with `num_cards` cards.
pub struct SimulatedDriver {
    state: Mutex<SimState>,
    calls: AtomicU64,
    failures: Mutex<HashMap<&'static str, FpgaError>>,
}

impl SimulatedDriver {
    pub fn new(num_cards: usize) -> Self {
        let mut resources = Vec::with_capacity(num_cards * 2);
        for card in 0..num_cards {
            let device = NativeToken(CANONICAL_TOKEN_BASE + 2 * card as u64);
            let port = NativeToken(CANONICAL_TOKEN_BASE + 2 * card as u64 + 1);
            resources.push(Resource::device(card, device));
            resources.push(Resource::accelerator(card, port, device));
        }

        Self {
            state: Mutex::new(SimState {
                resources,
                tokens: HashMap::new(),
                handles: HashMap::new(),
                objects: HashMap::new(),
                next_token: 0,
                next_handle: 0,
                next_object: 0,
                next_wsid: 1,
                recycle_handles: false,
            }),
            calls: AtomicU64::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Driver calls received so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: FpgaError) {
        self.failures.lock().insert(op, err);
    }

    /// Reuse the values of closed handles for later opens.
    pub fn recycle_handle_values(&self) {
        self.state.lock().recycle_handles = true;
    }

    /// Handles currently open across all resources.
    pub fn open_handles(&self) -> usize {
        self.state.lock().handles.len()
    }

    /// Set bits in an error register of the resource `token` names.
    pub fn raise_error(&self, token: NativeToken, error_num: u32, bits: u64) -> DriverResult<()> {
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        let register = state.resources[resource]
            .errors
            .get_mut(error_num as usize)
            .ok_or(FpgaError::InvalidParam)?;
        register.value |= bits;
        Ok(())
    }

    fn enter(&self, op: &'static str) -> DriverResult<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        trace!(op, "Simulated driver call");
        match self.failures.lock().remove(op) {
            Some(err) => {
                debug!(op, error = %err, "Injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(1)
    }
}

impl AcceleratorDriver for SimulatedDriver {
    // =========================================================================
    // Tokens and properties
    // =========================================================================

    fn enumerate(
        &self,
        filters: &[LocalProperties],
        max_tokens: u32,
    ) -> DriverResult<(Vec<LocalToken>, u32)> {
        self.enter("enumerate")?;
        let mut state = self.state.lock();

        // compare parents by resource, not by token value
        let filters: Vec<LocalProperties> = filters
            .iter()
            .map(|filter| {
                filter.clone().map_parent(|parent| {
                    state
                        .tokens
                        .get(&parent)
                        .map(|&index| state.resources[index].canonical)
                        .unwrap_or(parent)
                })
            })
            .collect();

        let matches: Vec<usize> = (0..state.resources.len())
            .filter(|&index| {
                let props = state.resources[index].properties();
                filters.is_empty() || filters.iter().any(|filter| props.matches(filter))
            })
            .collect();

        let tokens = matches
            .iter()
            .take(max_tokens as usize)
            .map(|&index| {
                let token = state.resources[index].canonical;
                state.local_token(index, token)
            })
            .collect();
        Ok((tokens, matches.len() as u32))
    }

    fn destroy_token(&self, token: NativeToken) -> DriverResult<()> {
        self.enter("destroy_token")?;
        let mut state = self.state.lock();
        state
            .tokens
            .remove(&token)
            .map(|_| ())
            .ok_or(FpgaError::InvalidParam)
    }

    fn clone_token(&self, token: NativeToken) -> DriverResult<LocalToken> {
        self.enter("clone_token")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        let clone = NativeToken(CLONED_TOKEN_BASE + state.next_token);
        state.next_token += 1;
        Ok(state.local_token(resource, clone))
    }

    fn get_properties(&self, token: NativeToken) -> DriverResult<LocalProperties> {
        self.enter("get_properties")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        Ok(state.properties(resource))
    }

    fn update_properties(&self, token: NativeToken) -> DriverResult<LocalProperties> {
        self.enter("update_properties")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        Ok(state.properties(resource))
    }

    // =========================================================================
    // Handles
    // =========================================================================

    fn open(&self, token: NativeToken, open_flags: u32) -> DriverResult<NativeHandle> {
        self.enter("open")?;
        let mut state = self.state.lock();
        let index = state.resource_of(token)?;

        let shared = open_flags & flags::OPEN_SHARED != 0;
        let resource = &mut state.resources[index];
        if resource.exclusive || (!shared && resource.open_count > 0) {
            return Err(FpgaError::Busy);
        }
        resource.open_count += 1;
        resource.exclusive = !shared;

        let mut slot = if state.recycle_handles {
            0
        } else {
            state.next_handle
        };
        while state.handles.contains_key(&NativeHandle(HANDLE_BASE + slot)) {
            slot += 1;
        }
        let handle = NativeHandle(HANDLE_BASE + slot);
        state.next_handle = state.next_handle.max(slot + 1);
        state.handles.insert(
            handle,
            SimHandle {
                resource: index,
                exclusive: !shared,
                mapped: BTreeSet::new(),
                buffers: HashMap::new(),
            },
        );
        debug!(handle = %handle, shared, "Simulated open");
        Ok(handle)
    }

    fn close(&self, handle: NativeHandle) -> DriverResult<()> {
        self.enter("close")?;
        let mut state = self.state.lock();
        let closed = state
            .handles
            .remove(&handle)
            .ok_or(FpgaError::InvalidParam)?;
        let resource = &mut state.resources[closed.resource];
        resource.open_count = resource.open_count.saturating_sub(1);
        if closed.exclusive {
            resource.exclusive = false;
        }
        debug!(
            handle = %handle,
            buffers = closed.buffers.len(),
            mapped = closed.mapped.len(),
            "Simulated close"
        );
        Ok(())
    }

    fn reset(&self, handle: NativeHandle) -> DriverResult<()> {
        self.enter("reset")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        state.resources[resource].reset_registers();
        Ok(())
    }

    fn get_properties_from_handle(&self, handle: NativeHandle) -> DriverResult<LocalProperties> {
        self.enter("get_properties_from_handle")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        Ok(state.properties(resource))
    }

    // =========================================================================
    // MMIO
    // =========================================================================

    fn map_mmio(&self, handle: NativeHandle, mmio_num: u32) -> DriverResult<u64> {
        self.enter("map_mmio")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        if mmio_num as usize >= state.resources[resource].regions.len() {
            return Err(FpgaError::InvalidParam);
        }
        state.handle_mut(handle)?.mapped.insert(mmio_num);
        Ok(MMIO_BASE
            + (resource as u64) * 0x10_0000
            + u64::from(mmio_num) * MMIO_REGION_BYTES as u64)
    }

    fn unmap_mmio(&self, handle: NativeHandle, mmio_num: u32) -> DriverResult<()> {
        self.enter("unmap_mmio")?;
        let mut state = self.state.lock();
        if state.handle_mut(handle)?.mapped.remove(&mmio_num) {
            Ok(())
        } else {
            Err(FpgaError::InvalidParam)
        }
    }

    fn read_mmio32(&self, handle: NativeHandle, mmio_num: u32, offset: u64) -> DriverResult<u32> {
        self.enter("read_mmio32")?;
        let mut state = self.state.lock();
        let bytes = state.region(handle, mmio_num, offset, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(word))
    }

    fn write_mmio32(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        value: u32,
    ) -> DriverResult<()> {
        self.enter("write_mmio32")?;
        let mut state = self.state.lock();
        state
            .region(handle, mmio_num, offset, 4)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_mmio64(&self, handle: NativeHandle, mmio_num: u32, offset: u64) -> DriverResult<u64> {
        self.enter("read_mmio64")?;
        let mut state = self.state.lock();
        let bytes = state.region(handle, mmio_num, offset, 8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(word))
    }

    fn write_mmio64(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        value: u64,
    ) -> DriverResult<()> {
        self.enter("write_mmio64")?;
        let mut state = self.state.lock();
        state
            .region(handle, mmio_num, offset, 8)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_mmio512(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
    ) -> DriverResult<Mmio512> {
        self.enter("read_mmio512")?;
        let mut state = self.state.lock();
        let bytes = state.region(handle, mmio_num, offset, Mmio512::LEN)?;
        Mmio512::from_slice(bytes).ok_or(FpgaError::Exception)
    }

    fn write_mmio512(
        &self,
        handle: NativeHandle,
        mmio_num: u32,
        offset: u64,
        values: &Mmio512,
    ) -> DriverResult<()> {
        self.enter("write_mmio512")?;
        let mut state = self.state.lock();
        state
            .region(handle, mmio_num, offset, Mmio512::LEN)?
            .copy_from_slice(values.as_bytes());
        Ok(())
    }

    // =========================================================================
    // Shared buffers
    // =========================================================================

    fn prepare_buffer(
        &self,
        handle: NativeHandle,
        length: u64,
        pre_allocated_addr: Option<u64>,
        buf_flags: u32,
    ) -> DriverResult<PreparedBuffer> {
        self.enter("prepare_buffer")?;
        if length == 0 {
            return Err(FpgaError::InvalidParam);
        }
        let preallocated = buf_flags & flags::BUF_PREALLOCATED != 0;
        if preallocated != pre_allocated_addr.is_some() {
            return Err(FpgaError::InvalidParam);
        }
        if length > MAX_BUFFER_BYTES {
            return Err(FpgaError::NoMemory);
        }

        let mut state = self.state.lock();
        state.handle(handle)?;
        let wsid = state.next_wsid;
        state.next_wsid += 1;

        let address = pre_allocated_addr.unwrap_or(VIRT_BASE + (wsid << 26));
        let buffer = SimBuffer {
            data: vec![0; length as usize],
            address,
            iova: IOVA_BASE + (wsid << 26),
        };
        state.handle_mut(handle)?.buffers.insert(wsid, buffer);
        Ok(PreparedBuffer { wsid, address })
    }

    fn release_buffer(&self, handle: NativeHandle, wsid: u64) -> DriverResult<()> {
        self.enter("release_buffer")?;
        let mut state = self.state.lock();
        let buffer = state
            .handle_mut(handle)?
            .buffers
            .remove(&wsid)
            .ok_or(FpgaError::InvalidParam)?;
        trace!(wsid, address = buffer.address, "Released buffer");
        Ok(())
    }

    fn get_io_address(&self, handle: NativeHandle, wsid: u64) -> DriverResult<u64> {
        self.enter("get_io_address")?;
        let mut state = self.state.lock();
        Ok(state.buffer_mut(handle, wsid)?.iova)
    }

    fn buf_read(
        &self,
        handle: NativeHandle,
        wsid: u64,
        offset: u64,
        len: u64,
    ) -> DriverResult<Vec<u8>> {
        self.enter("buf_read")?;
        let mut state = self.state.lock();
        let buffer = state.buffer_mut(handle, wsid)?;
        let start = usize::try_from(offset).map_err(|_| FpgaError::InvalidParam)?;
        let len = usize::try_from(len).map_err(|_| FpgaError::InvalidParam)?;
        buffer
            .data
            .get(start..start.saturating_add(len))
            .map(<[u8]>::to_vec)
            .ok_or(FpgaError::InvalidParam)
    }

    fn buf_write(
        &self,
        handle: NativeHandle,
        wsid: u64,
        offset: u64,
        data: &[u8],
    ) -> DriverResult<()> {
        self.enter("buf_write")?;
        let mut state = self.state.lock();
        let buffer = state.buffer_mut(handle, wsid)?;
        let start = usize::try_from(offset).map_err(|_| FpgaError::InvalidParam)?;
        buffer
            .data
            .get_mut(start..start.saturating_add(data.len()))
            .ok_or(FpgaError::InvalidParam)?
            .copy_from_slice(data);
        Ok(())
    }

    // =========================================================================
    // Error registers
    // =========================================================================

    fn read_error(&self, token: NativeToken, error_num: u32) -> DriverResult<u64> {
        self.enter("read_error")?;
        let state = self.state.lock();
        let resource = state.resource_of(token)?;
        state.resources[resource]
            .errors
            .get(error_num as usize)
            .map(|register| register.value)
            .ok_or(FpgaError::InvalidParam)
    }

    fn get_error_info(&self, token: NativeToken, error_num: u32) -> DriverResult<ErrorInfo> {
        self.enter("get_error_info")?;
        let state = self.state.lock();
        let resource = state.resource_of(token)?;
        state.resources[resource]
            .errors
            .get(error_num as usize)
            .map(|register| ErrorInfo {
                name: register.name.to_string(),
                can_clear: register.can_clear,
            })
            .ok_or(FpgaError::InvalidParam)
    }

    fn clear_error(&self, token: NativeToken, error_num: u32) -> DriverResult<()> {
        self.enter("clear_error")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        let register = state.resources[resource]
            .errors
            .get_mut(error_num as usize)
            .ok_or(FpgaError::InvalidParam)?;
        if !register.can_clear {
            return Err(FpgaError::NotSupported);
        }
        register.value = 0;
        Ok(())
    }

    fn clear_all_errors(&self, token: NativeToken) -> DriverResult<()> {
        self.enter("clear_all_errors")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        state.resources[resource]
            .errors
            .iter_mut()
            .filter(|register| register.can_clear)
            .for_each(|register| register.value = 0);
        Ok(())
    }

    // =========================================================================
    // System objects
    // =========================================================================

    fn token_get_object(
        &self,
        token: NativeToken,
        name: &str,
        _flags: u32,
    ) -> DriverResult<NativeObject> {
        self.enter("token_get_object")?;
        let mut state = self.state.lock();
        let resource = state.resource_of(token)?;
        state.new_object(resource, split_path(name))
    }

    fn handle_get_object(
        &self,
        handle: NativeHandle,
        name: &str,
        _flags: u32,
    ) -> DriverResult<NativeObject> {
        self.enter("handle_get_object")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        state.new_object(resource, split_path(name))
    }

    fn destroy_object(&self, object: NativeObject) -> DriverResult<()> {
        self.enter("destroy_object")?;
        let mut state = self.state.lock();
        state
            .objects
            .remove(&object)
            .map(|_| ())
            .ok_or(FpgaError::InvalidParam)
    }

    fn object_get_type(&self, object: NativeObject) -> DriverResult<SysObjectType> {
        self.enter("object_get_type")?;
        let state = self.state.lock();
        let object = state.object(object)?;
        Ok(match state.node(object)? {
            SysNode::Attribute(_) => SysObjectType::Attribute,
            SysNode::Container(_) => SysObjectType::Container,
        })
    }

    fn object_get_name(&self, object: NativeObject) -> DriverResult<String> {
        self.enter("object_get_name")?;
        let state = self.state.lock();
        let object = state.object(object)?;
        Ok(object.path.last().cloned().unwrap_or_default())
    }

    fn object_get_size(&self, object: NativeObject, _flags: u32) -> DriverResult<u32> {
        self.enter("object_get_size")?;
        let state = self.state.lock();
        let object = state.object(object)?;
        let size = match state.node(object)? {
            SysNode::Attribute(value) => value.len(),
            SysNode::Container(children) => children.len(),
        };
        u32::try_from(size).map_err(|_| FpgaError::Exception)
    }

    fn object_read(
        &self,
        object: NativeObject,
        offset: u64,
        len: u64,
        _flags: u32,
    ) -> DriverResult<Vec<u8>> {
        self.enter("object_read")?;
        let state = self.state.lock();
        let bytes = state.attribute(object)?.as_bytes();
        let start = usize::try_from(offset).map_err(|_| FpgaError::InvalidParam)?;
        if start > bytes.len() {
            return Err(FpgaError::InvalidParam);
        }
        let end = usize::try_from(len)
            .map(|len| start.saturating_add(len).min(bytes.len()))
            .unwrap_or(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    fn object_read64(&self, object: NativeObject, _flags: u32) -> DriverResult<u64> {
        self.enter("object_read64")?;
        let state = self.state.lock();
        parse_attr_u64(state.attribute(object)?).ok_or(FpgaError::Exception)
    }

    fn object_write64(&self, object: NativeObject, value: u64, _flags: u32) -> DriverResult<()> {
        self.enter("object_write64")?;
        let mut state = self.state.lock();
        let object = state.object(object)?.clone();
        match state.resources[object.resource]
            .sysfs
            .find_mut(&object.path)
            .ok_or(FpgaError::NotFound)?
        {
            SysNode::Attribute(current) => {
                *current = format!("{value:#x}");
                Ok(())
            }
            SysNode::Container(_) => Err(FpgaError::InvalidParam),
        }
    }

    fn object_get_object(
        &self,
        parent: NativeObject,
        name: &str,
        _flags: u32,
    ) -> DriverResult<NativeObject> {
        self.enter("object_get_object")?;
        let mut state = self.state.lock();
        let parent = state.object(parent)?.clone();
        let mut path = parent.path;
        path.extend(split_path(name));
        state.new_object(parent.resource, path)
    }

    fn object_get_object_at(&self, parent: NativeObject, index: u64) -> DriverResult<NativeObject> {
        self.enter("object_get_object_at")?;
        let mut state = self.state.lock();
        let parent = state.object(parent)?.clone();
        let node = state.node(&parent)?;
        if let SysNode::Attribute(_) = node {
            return Err(FpgaError::InvalidParam);
        }
        let child = node
            .child_name(index)
            .map(str::to_string)
            .ok_or(FpgaError::NotFound)?;
        let mut path = parent.path;
        path.push(child);
        state.new_object(parent.resource, path)
    }

    // =========================================================================
    // Clocks and metrics
    // =========================================================================

    fn set_user_clock(
        &self,
        handle: NativeHandle,
        high_hz: u64,
        low_hz: u64,
        _flags: u32,
    ) -> DriverResult<()> {
        self.enter("set_user_clock")?;
        if high_hz == 0 {
            return Err(FpgaError::InvalidParam);
        }
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        let clock = state.resources[resource]
            .clock
            .as_mut()
            .ok_or(FpgaError::NotSupported)?;
        clock.high_hz = high_hz;
        clock.low_hz = if low_hz == 0 { high_hz / 2 } else { low_hz };
        Ok(())
    }

    fn get_user_clock(&self, handle: NativeHandle, _flags: u32) -> DriverResult<UserClock> {
        self.enter("get_user_clock")?;
        let state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        state.resources[resource]
            .clock
            .ok_or(FpgaError::NotSupported)
    }

    fn get_num_metrics(&self, handle: NativeHandle) -> DriverResult<u64> {
        self.enter("get_num_metrics")?;
        self.state.lock().handle(handle)?;
        Ok(metric_table().len() as u64)
    }

    fn get_metrics_info(&self, handle: NativeHandle, max: u64) -> DriverResult<Vec<MetricInfo>> {
        self.enter("get_metrics_info")?;
        self.state.lock().handle(handle)?;
        let max = usize::try_from(max).unwrap_or(usize::MAX);
        Ok(metric_table().into_iter().take(max).collect())
    }

    fn get_metrics_by_index(
        &self,
        handle: NativeHandle,
        metric_nums: &[u64],
    ) -> DriverResult<Vec<Metric>> {
        self.enter("get_metrics_by_index")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        metric_nums
            .iter()
            .map(|&num| state.sample(resource, num))
            .collect()
    }

    fn get_metrics_by_name(
        &self,
        handle: NativeHandle,
        metric_names: &[String],
    ) -> DriverResult<Vec<Metric>> {
        self.enter("get_metrics_by_name")?;
        let mut state = self.state.lock();
        let resource = state.handle(handle)?.resource;
        let table = metric_table();
        metric_names
            .iter()
            .map(|name| {
                let info = table
                    .iter()
                    .find(|info| info.metric_name == *name || info.qualifier_name == *name)
                    .ok_or(FpgaError::NotFound)?;
                state.sample(resource, info.metric_num)
            })
            .collect()
    }

    fn get_metrics_threshold_info(
        &self,
        handle: NativeHandle,
        max: u32,
    ) -> DriverResult<Vec<MetricThreshold>> {
        self.enter("get_metrics_threshold_info")?;
        self.state.lock().handle(handle)?;
        Ok(threshold_table().into_iter().take(max as usize).collect())
    }

    // =========================================================================
    // Reconfiguration
    // =========================================================================

    fn reconfigure_slot_by_name(
        &self,
        handle: NativeHandle,
        slot: u32,
        path: &str,
        _flags: u32,
    ) -> DriverResult<()> {
        self.enter("reconfigure_slot_by_name")?;
        let image = std::fs::read(path).map_err(|err| {
            debug!(path, error = %err, "Cannot read bitstream");
            FpgaError::NotFound
        })?;

        let mut state = self.state.lock();
        let device = state.handle(handle)?.resource;
        if state.resources[device].is_accelerator() {
            return Err(FpgaError::InvalidParam);
        }
        if slot >= state.resources[device].props.num_slots.unwrap_or(0) {
            return Err(FpgaError::InvalidParam);
        }
        let guid: [u8; 16] = image
            .get(..16)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(FpgaError::ReconfError)?;

        let card = state.resources[device].card;
        let port = state
            .resources
            .iter_mut()
            .find(|r| r.card == card && r.is_accelerator())
            .ok_or(FpgaError::NotFound)?;
        if port.open_count > 0 {
            return Err(FpgaError::Busy);
        }
        port.props.guid = Some(guid);
        port.reset_registers();
        debug!(card, slot, "Slot reconfigured");
        Ok(())
    }
}
