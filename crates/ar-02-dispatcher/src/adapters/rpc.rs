//! # RPC Adapter
//!
//! Maps each wire [`Request`] onto the matching [`Dispatcher`] operation
//! and wraps the result in the [`Reply`] variant of the same name.

use crate::ports::inbound::RequestHandler;
use crate::ports::outbound::AcceleratorDriver;
use crate::service::Dispatcher;
use shared_types::{Reply, Request};
use tracing::debug;

impl<D: AcceleratorDriver> RequestHandler for Dispatcher<D> {
    fn handle(&self, request: Request) -> Reply {
        let method = request.method();
        debug!(method, "Dispatching request");

        let reply = match request {
            // Tokens and properties
            Request::Enumerate {
                filters,
                max_tokens,
            } => Reply::Enumerate(self.enumerate(&filters, max_tokens).into()),
            Request::DestroyToken { token_id } => {
                Reply::DestroyToken(self.destroy_token(&token_id).into())
            }
            Request::CloneToken { src_token_id } => {
                Reply::CloneToken(self.clone_token(&src_token_id).into())
            }
            Request::GetProperties { token_id } => {
                Reply::GetProperties(self.get_properties(&token_id).into())
            }
            Request::UpdateProperties { token_id } => {
                Reply::UpdateProperties(self.update_properties(&token_id).into())
            }

            // Handles
            Request::Open { token_id, flags } => Reply::Open(self.open(&token_id, flags).into()),
            Request::Close { handle_id } => Reply::Close(self.close(&handle_id).into()),
            Request::Reset { handle_id } => Reply::Reset(self.reset(&handle_id).into()),
            Request::GetPropertiesFromHandle { handle_id } => Reply::GetPropertiesFromHandle(
                self.get_properties_from_handle(&handle_id).into(),
            ),

            // MMIO
            Request::MapMmio {
                handle_id,
                mmio_num,
            } => Reply::MapMmio(self.map_mmio(&handle_id, mmio_num).into()),
            Request::UnmapMmio {
                handle_id,
                mmio_id,
                mmio_num,
            } => Reply::UnmapMmio(self.unmap_mmio(&handle_id, &mmio_id, mmio_num).into()),
            Request::ReadMmio32 {
                handle_id,
                mmio_num,
                offset,
            } => Reply::ReadMmio32(self.read_mmio32(&handle_id, mmio_num, offset).into()),
            Request::WriteMmio32 {
                handle_id,
                mmio_num,
                offset,
                value,
            } => Reply::WriteMmio32(
                self.write_mmio32(&handle_id, mmio_num, offset, value)
                    .into(),
            ),
            Request::ReadMmio64 {
                handle_id,
                mmio_num,
                offset,
            } => Reply::ReadMmio64(self.read_mmio64(&handle_id, mmio_num, offset).into()),
            Request::WriteMmio64 {
                handle_id,
                mmio_num,
                offset,
                value,
            } => Reply::WriteMmio64(
                self.write_mmio64(&handle_id, mmio_num, offset, value)
                    .into(),
            ),
            Request::ReadMmio512 {
                handle_id,
                mmio_num,
                offset,
            } => Reply::ReadMmio512(self.read_mmio512(&handle_id, mmio_num, offset).into()),
            Request::WriteMmio512 {
                handle_id,
                mmio_num,
                offset,
                values,
            } => Reply::WriteMmio512(
                self.write_mmio512(&handle_id, mmio_num, offset, &values)
                    .into(),
            ),

            // Buffers
            Request::PrepareBuffer {
                handle_id,
                length,
                pre_allocated_addr,
                flags,
            } => Reply::PrepareBuffer(
                self.prepare_buffer(&handle_id, length, pre_allocated_addr, flags)
                    .into(),
            ),
            Request::ReleaseBuffer { handle_id, buf_id } => {
                Reply::ReleaseBuffer(self.release_buffer(&handle_id, &buf_id).into())
            }
            Request::GetIoAddress { handle_id, buf_id } => {
                Reply::GetIoAddress(self.get_io_address(&handle_id, &buf_id).into())
            }

            // Errors
            Request::ReadError {
                token_id,
                error_num,
            } => Reply::ReadError(self.read_error(&token_id, error_num).into()),
            Request::GetErrorInfo {
                token_id,
                error_num,
            } => Reply::GetErrorInfo(self.get_error_info(&token_id, error_num).into()),
            Request::ClearError {
                token_id,
                error_num,
            } => Reply::ClearError(self.clear_error(&token_id, error_num).into()),
            Request::ClearAllErrors { token_id } => {
                Reply::ClearAllErrors(self.clear_all_errors(&token_id).into())
            }

            // System objects
            Request::TokenGetObject {
                token_id,
                name,
                flags,
            } => Reply::TokenGetObject(self.token_get_object(&token_id, &name, flags).into()),
            Request::HandleGetObject {
                handle_id,
                name,
                flags,
            } => Reply::HandleGetObject(self.handle_get_object(&handle_id, &name, flags).into()),
            Request::DestroyObject { object_id } => {
                Reply::DestroyObject(self.destroy_object(&object_id).into())
            }
            Request::ObjectGetType { object_id } => {
                Reply::ObjectGetType(self.object_get_type(&object_id).into())
            }
            Request::ObjectGetName { object_id } => {
                Reply::ObjectGetName(self.object_get_name(&object_id).into())
            }
            Request::ObjectGetSize { object_id, flags } => {
                Reply::ObjectGetSize(self.object_get_size(&object_id, flags).into())
            }
            Request::ObjectRead {
                object_id,
                offset,
                length,
                flags,
            } => Reply::ObjectRead(self.object_read(&object_id, offset, length, flags).into()),
            Request::ObjectRead64 { object_id, flags } => {
                Reply::ObjectRead64(self.object_read64(&object_id, flags).into())
            }
            Request::ObjectWrite64 {
                object_id,
                value,
                flags,
            } => Reply::ObjectWrite64(self.object_write64(&object_id, value, flags).into()),
            Request::ObjectGetObject {
                object_id,
                name,
                flags,
            } => Reply::ObjectGetObject(self.object_get_object(&object_id, &name, flags).into()),
            Request::ObjectGetObjectAt { object_id, index } => {
                Reply::ObjectGetObjectAt(self.object_get_object_at(&object_id, index).into())
            }

            // Clocks and metrics
            Request::SetUserClock {
                handle_id,
                high_hz,
                low_hz,
                flags,
            } => Reply::SetUserClock(
                self.set_user_clock(&handle_id, high_hz, low_hz, flags)
                    .into(),
            ),
            Request::GetUserClock { handle_id, flags } => {
                Reply::GetUserClock(self.get_user_clock(&handle_id, flags).into())
            }
            Request::GetNumMetrics { handle_id } => {
                Reply::GetNumMetrics(self.get_num_metrics(&handle_id).into())
            }
            Request::GetMetricsInfo {
                handle_id,
                num_metrics,
            } => Reply::GetMetricsInfo(self.get_metrics_info(&handle_id, num_metrics).into()),
            Request::GetMetricsByIndex {
                handle_id,
                metric_nums,
            } => Reply::GetMetricsByIndex(
                self.get_metrics_by_index(&handle_id, &metric_nums)
                    .into(),
            ),
            Request::GetMetricsByName {
                handle_id,
                metric_names,
            } => Reply::GetMetricsByName(
                self.get_metrics_by_name(&handle_id, &metric_names)
                    .into(),
            ),
            Request::GetMetricsThresholdInfo {
                handle_id,
                num_thresholds,
            } => Reply::GetMetricsThresholdInfo(
                self.get_metrics_threshold_info(&handle_id, num_thresholds)
                    .into(),
            ),

            // Reconfiguration
            Request::ReconfigureSlotByName {
                handle_id,
                slot,
                path,
                flags,
            } => Reply::ReconfigureSlotByName(
                self.reconfigure_slot_by_name(&handle_id, slot, &path, flags)
                    .into(),
            ),

            // Buffer helpers
            Request::BufMemSet {
                handle_id,
                buf_id,
                offset,
                c,
                n,
            } => Reply::BufMemSet(self.buf_memset(&handle_id, &buf_id, offset, c, n).into()),
            Request::BufMemCpyToRemote {
                handle_id,
                dest_buf_id,
                dest_offset,
                src,
                n,
            } => Reply::BufMemCpyToRemote(
                self.buf_memcpy_to_remote(&handle_id, &dest_buf_id, dest_offset, &src, n)
                    .into(),
            ),
            Request::BufMemCpyFromRemote {
                handle_id,
                src_buf_id,
                src_offset,
                n,
            } => Reply::BufMemCpyFromRemote(
                self.buf_memcpy_from_remote(&handle_id, &src_buf_id, src_offset, n)
                    .into(),
            ),
            Request::BufPoll {
                handle_id,
                buf_id,
                offset,
                width,
                mask,
                expected_value,
                sleep_interval_us,
                loops_timeout,
            } => Reply::BufPoll(
                self.buf_poll(
                    &handle_id,
                    &buf_id,
                    offset,
                    width,
                    mask,
                    expected_value,
                    sleep_interval_us,
                    loops_timeout,
                )
                .into(),
            ),
            Request::BufMemCmp {
                handle_id,
                bufa_id,
                bufa_offset,
                bufb_id,
                bufb_offset,
                n,
            } => Reply::BufMemCmp(
                self.buf_memcmp(&handle_id, &bufa_id, bufa_offset, &bufb_id, bufb_offset, n)
                    .into(),
            ),
            Request::BufWritePattern {
                handle_id,
                buf_id,
                pattern_name,
            } => Reply::BufWritePattern(
                self.buf_write_pattern(&handle_id, &buf_id, &pattern_name)
                    .into(),
            ),
        };

        debug!(method, result = ?reply.result(), "Request complete");
        reply
    }
}
