//! # Remote Client
//!
//! One async method per broker operation. Every call sends the full remote
//! ids it references; nothing is cached between calls.
//!
//! A reply is trusted only after the transport succeeded and the reply is
//! the variant matching the request. Variable-length results are clamped to
//! what the caller asked for, whatever the broker sent.

use crate::domain::{CallError, ClientConfig, ClientConfigError};
use crate::ports::outbound::BrokerTransport;
use shared_transport::{ClientConnection, TransportError};
use shared_types::{
    Enumerated, ErrorInfo, HandleHeader, Metric, MetricInfo, MetricThreshold, Mmio512, Outcome,
    Properties, RemoteId, Reply, Request, SysObjectType, TokenHeader, UserClock,
};
use tracing::{debug, warn};

/// Builds the extractor for one reply variant.
macro_rules! expect {
    ($variant:ident) => {
        |reply: Reply| match reply {
            Reply::$variant(outcome) => Ok(outcome),
            other => Err(other),
        }
    };
}

/// Client stub for one broker.
pub struct RemoteClient<T: BrokerTransport = ClientConnection> {
    transport: T,
}

impl RemoteClient<ClientConnection> {
    /// Validate `config` and prepare a connection. Nothing is dialed until
    /// the first call.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientConfigError> {
        config.validate()?;
        Ok(Self::with_transport(ClientConnection::new(config.connection())))
    }

    /// Drop the current connection; the next call reconnects.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }
}

impl<T: BrokerTransport> RemoteClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn invoke<V>(
        &self,
        request: Request,
        extract: impl FnOnce(Reply) -> Result<Outcome<V>, Reply>,
    ) -> Result<V, CallError> {
        let method = request.method();
        debug!(method, "Calling broker");

        let reply = self.transport.round_trip(request).await.map_err(|err| {
            warn!(method, error = %err, "Broker call failed");
            CallError::Transport(err)
        })?;

        let outcome = match extract(reply) {
            Ok(outcome) => outcome,
            Err(Reply::Rejected { reason }) => {
                warn!(method, %reason, "Broker rejected request");
                return Err(TransportError::Rejected(reason).into());
            }
            Err(other) => {
                return Err(TransportError::UnexpectedReply {
                    method,
                    detail: format!("got {} reply", other.method()),
                }
                .into());
            }
        };

        match outcome.into_result() {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => {
                debug!(method, error = %err, "Broker returned error");
                Err(CallError::Remote(err))
            }
            None => Err(TransportError::UnexpectedReply {
                method,
                detail: "success without a value".into(),
            }
            .into()),
        }
    }

    // =========================================================================
    // TOKENS AND PROPERTIES
    // =========================================================================

    /// Tokens matching any of `filters` (all tokens when empty), at most
    /// `max_tokens` of them. `num_matches` may exceed the returned count.
    pub async fn enumerate(
        &self,
        filters: &[Properties],
        max_tokens: u32,
    ) -> Result<Enumerated, CallError> {
        let request = Request::Enumerate {
            filters: filters.to_vec(),
            max_tokens,
        };
        let mut found = self.invoke(request, expect!(Enumerate)).await?;
        found.tokens = clamp(found.tokens, u64::from(max_tokens));
        Ok(found)
    }

    pub async fn destroy_token(&self, token_id: RemoteId) -> Result<(), CallError> {
        self.invoke(Request::DestroyToken { token_id }, expect!(DestroyToken))
            .await
    }

    pub async fn clone_token(&self, src_token_id: RemoteId) -> Result<TokenHeader, CallError> {
        self.invoke(Request::CloneToken { src_token_id }, expect!(CloneToken))
            .await
    }

    pub async fn get_properties(&self, token_id: RemoteId) -> Result<Properties, CallError> {
        self.invoke(Request::GetProperties { token_id }, expect!(GetProperties))
            .await
    }

    pub async fn update_properties(&self, token_id: RemoteId) -> Result<Properties, CallError> {
        self.invoke(
            Request::UpdateProperties { token_id },
            expect!(UpdateProperties),
        )
        .await
    }

    // =========================================================================
    // HANDLES
    // =========================================================================

    pub async fn open(&self, token_id: RemoteId, flags: u32) -> Result<HandleHeader, CallError> {
        self.invoke(Request::Open { token_id, flags }, expect!(Open))
            .await
    }

    pub async fn close(&self, handle_id: RemoteId) -> Result<(), CallError> {
        self.invoke(Request::Close { handle_id }, expect!(Close))
            .await
    }

    pub async fn reset(&self, handle_id: RemoteId) -> Result<(), CallError> {
        self.invoke(Request::Reset { handle_id }, expect!(Reset))
            .await
    }

    pub async fn get_properties_from_handle(
        &self,
        handle_id: RemoteId,
    ) -> Result<Properties, CallError> {
        self.invoke(
            Request::GetPropertiesFromHandle { handle_id },
            expect!(GetPropertiesFromHandle),
        )
        .await
    }

    // =========================================================================
    // MMIO
    // =========================================================================

    /// Map region `mmio_num` of the handle; returns the mapping's id.
    pub async fn map_mmio(&self, handle_id: RemoteId, mmio_num: u32) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::MapMmio {
                handle_id,
                mmio_num,
            },
            expect!(MapMmio),
        )
        .await
    }

    pub async fn unmap_mmio(
        &self,
        handle_id: RemoteId,
        mmio_id: RemoteId,
        mmio_num: u32,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::UnmapMmio {
                handle_id,
                mmio_id,
                mmio_num,
            },
            expect!(UnmapMmio),
        )
        .await
    }

    pub async fn read_mmio32(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    ) -> Result<u32, CallError> {
        self.invoke(
            Request::ReadMmio32 {
                handle_id,
                mmio_num,
                offset,
            },
            expect!(ReadMmio32),
        )
        .await
    }

    pub async fn write_mmio32(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u32,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::WriteMmio32 {
                handle_id,
                mmio_num,
                offset,
                value,
            },
            expect!(WriteMmio32),
        )
        .await
    }

    pub async fn read_mmio64(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    ) -> Result<u64, CallError> {
        self.invoke(
            Request::ReadMmio64 {
                handle_id,
                mmio_num,
                offset,
            },
            expect!(ReadMmio64),
        )
        .await
    }

    pub async fn write_mmio64(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        value: u64,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::WriteMmio64 {
                handle_id,
                mmio_num,
                offset,
                value,
            },
            expect!(WriteMmio64),
        )
        .await
    }

    pub async fn read_mmio512(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
    ) -> Result<Mmio512, CallError> {
        self.invoke(
            Request::ReadMmio512 {
                handle_id,
                mmio_num,
                offset,
            },
            expect!(ReadMmio512),
        )
        .await
    }

    pub async fn write_mmio512(
        &self,
        handle_id: RemoteId,
        mmio_num: u32,
        offset: u64,
        value: &Mmio512,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::WriteMmio512 {
                handle_id,
                mmio_num,
                offset,
                values: value.as_bytes().to_vec(),
            },
            expect!(WriteMmio512),
        )
        .await
    }

    // =========================================================================
    // BUFFERS
    // =========================================================================

    /// Allocate a shared buffer on the handle; returns the buffer's id.
    pub async fn prepare_buffer(
        &self,
        handle_id: RemoteId,
        length: u64,
        pre_allocated_addr: Option<u64>,
        flags: u32,
    ) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::PrepareBuffer {
                handle_id,
                length,
                pre_allocated_addr,
                flags,
            },
            expect!(PrepareBuffer),
        )
        .await
    }

    pub async fn release_buffer(&self, handle_id: RemoteId, buf_id: RemoteId) -> Result<(), CallError> {
        self.invoke(
            Request::ReleaseBuffer { handle_id, buf_id },
            expect!(ReleaseBuffer),
        )
        .await
    }

    pub async fn get_io_address(&self, handle_id: RemoteId, buf_id: RemoteId) -> Result<u64, CallError> {
        self.invoke(
            Request::GetIoAddress { handle_id, buf_id },
            expect!(GetIoAddress),
        )
        .await
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    pub async fn read_error(&self, token_id: RemoteId, error_num: u32) -> Result<u64, CallError> {
        self.invoke(
            Request::ReadError {
                token_id,
                error_num,
            },
            expect!(ReadError),
        )
        .await
    }

    pub async fn get_error_info(
        &self,
        token_id: RemoteId,
        error_num: u32,
    ) -> Result<ErrorInfo, CallError> {
        self.invoke(
            Request::GetErrorInfo {
                token_id,
                error_num,
            },
            expect!(GetErrorInfo),
        )
        .await
    }

    pub async fn clear_error(&self, token_id: RemoteId, error_num: u32) -> Result<(), CallError> {
        self.invoke(
            Request::ClearError {
                token_id,
                error_num,
            },
            expect!(ClearError),
        )
        .await
    }

    pub async fn clear_all_errors(&self, token_id: RemoteId) -> Result<(), CallError> {
        self.invoke(Request::ClearAllErrors { token_id }, expect!(ClearAllErrors))
            .await
    }

    // =========================================================================
    // SYSTEM OBJECTS
    // =========================================================================

    pub async fn token_get_object(
        &self,
        token_id: RemoteId,
        name: &str,
        flags: u32,
    ) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::TokenGetObject {
                token_id,
                name: name.to_string(),
                flags,
            },
            expect!(TokenGetObject),
        )
        .await
    }

    pub async fn handle_get_object(
        &self,
        handle_id: RemoteId,
        name: &str,
        flags: u32,
    ) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::HandleGetObject {
                handle_id,
                name: name.to_string(),
                flags,
            },
            expect!(HandleGetObject),
        )
        .await
    }

    pub async fn destroy_object(&self, object_id: RemoteId) -> Result<(), CallError> {
        self.invoke(Request::DestroyObject { object_id }, expect!(DestroyObject))
            .await
    }

    pub async fn object_get_type(&self, object_id: RemoteId) -> Result<SysObjectType, CallError> {
        self.invoke(Request::ObjectGetType { object_id }, expect!(ObjectGetType))
            .await
    }

    pub async fn object_get_name(&self, object_id: RemoteId) -> Result<String, CallError> {
        self.invoke(Request::ObjectGetName { object_id }, expect!(ObjectGetName))
            .await
    }

    pub async fn object_get_size(&self, object_id: RemoteId, flags: u32) -> Result<u32, CallError> {
        self.invoke(
            Request::ObjectGetSize { object_id, flags },
            expect!(ObjectGetSize),
        )
        .await
    }

    /// Read up to `length` bytes of the object's value starting at `offset`.
    pub async fn object_read(
        &self,
        object_id: RemoteId,
        offset: u64,
        length: u64,
        flags: u32,
    ) -> Result<Vec<u8>, CallError> {
        let bytes = self
            .invoke(
                Request::ObjectRead {
                    object_id,
                    offset,
                    length,
                    flags,
                },
                expect!(ObjectRead),
            )
            .await?;
        Ok(clamp(bytes, length))
    }

    pub async fn object_read64(&self, object_id: RemoteId, flags: u32) -> Result<u64, CallError> {
        self.invoke(
            Request::ObjectRead64 { object_id, flags },
            expect!(ObjectRead64),
        )
        .await
    }

    pub async fn object_write64(
        &self,
        object_id: RemoteId,
        value: u64,
        flags: u32,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::ObjectWrite64 {
                object_id,
                value,
                flags,
            },
            expect!(ObjectWrite64),
        )
        .await
    }

    pub async fn object_get_object(
        &self,
        object_id: RemoteId,
        name: &str,
        flags: u32,
    ) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::ObjectGetObject {
                object_id,
                name: name.to_string(),
                flags,
            },
            expect!(ObjectGetObject),
        )
        .await
    }

    pub async fn object_get_object_at(
        &self,
        object_id: RemoteId,
        index: u64,
    ) -> Result<RemoteId, CallError> {
        self.invoke(
            Request::ObjectGetObjectAt { object_id, index },
            expect!(ObjectGetObjectAt),
        )
        .await
    }

    // =========================================================================
    // CLOCKS AND METRICS
    // =========================================================================

    pub async fn set_user_clock(
        &self,
        handle_id: RemoteId,
        high_hz: u64,
        low_hz: u64,
        flags: u32,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::SetUserClock {
                handle_id,
                high_hz,
                low_hz,
                flags,
            },
            expect!(SetUserClock),
        )
        .await
    }

    pub async fn get_user_clock(&self, handle_id: RemoteId, flags: u32) -> Result<UserClock, CallError> {
        self.invoke(
            Request::GetUserClock { handle_id, flags },
            expect!(GetUserClock),
        )
        .await
    }

    pub async fn get_num_metrics(&self, handle_id: RemoteId) -> Result<u64, CallError> {
        self.invoke(Request::GetNumMetrics { handle_id }, expect!(GetNumMetrics))
            .await
    }

    pub async fn get_metrics_info(
        &self,
        handle_id: RemoteId,
        num_metrics: u64,
    ) -> Result<Vec<MetricInfo>, CallError> {
        let info = self
            .invoke(
                Request::GetMetricsInfo {
                    handle_id,
                    num_metrics,
                },
                expect!(GetMetricsInfo),
            )
            .await?;
        Ok(clamp(info, num_metrics))
    }

    pub async fn get_metrics_by_index(
        &self,
        handle_id: RemoteId,
        metric_nums: &[u64],
    ) -> Result<Vec<Metric>, CallError> {
        let metrics = self
            .invoke(
                Request::GetMetricsByIndex {
                    handle_id,
                    metric_nums: metric_nums.to_vec(),
                },
                expect!(GetMetricsByIndex),
            )
            .await?;
        Ok(clamp(metrics, metric_nums.len() as u64))
    }

    pub async fn get_metrics_by_name(
        &self,
        handle_id: RemoteId,
        metric_names: &[String],
    ) -> Result<Vec<Metric>, CallError> {
        let metrics = self
            .invoke(
                Request::GetMetricsByName {
                    handle_id,
                    metric_names: metric_names.to_vec(),
                },
                expect!(GetMetricsByName),
            )
            .await?;
        Ok(clamp(metrics, metric_names.len() as u64))
    }

    pub async fn get_metrics_threshold_info(
        &self,
        handle_id: RemoteId,
        num_thresholds: u32,
    ) -> Result<Vec<MetricThreshold>, CallError> {
        let thresholds = self
            .invoke(
                Request::GetMetricsThresholdInfo {
                    handle_id,
                    num_thresholds,
                },
                expect!(GetMetricsThresholdInfo),
            )
            .await?;
        Ok(clamp(thresholds, u64::from(num_thresholds)))
    }

    // =========================================================================
    // RECONFIGURATION
    // =========================================================================

    /// Program `slot` from a bitstream file on the broker's host.
    pub async fn reconfigure_slot_by_name(
        &self,
        handle_id: RemoteId,
        slot: u32,
        path: &str,
        flags: u32,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::ReconfigureSlotByName {
                handle_id,
                slot,
                path: path.to_string(),
                flags,
            },
            expect!(ReconfigureSlotByName),
        )
        .await
    }

    // =========================================================================
    // BUFFER HELPERS
    // =========================================================================

    pub async fn buf_memset(
        &self,
        handle_id: RemoteId,
        buf_id: RemoteId,
        offset: u64,
        c: u8,
        n: u64,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::BufMemSet {
                handle_id,
                buf_id,
                offset,
                c,
                n,
            },
            expect!(BufMemSet),
        )
        .await
    }

    /// Copy `src` into the remote buffer at `dest_offset`.
    pub async fn buf_memcpy_to_remote(
        &self,
        handle_id: RemoteId,
        dest_buf_id: RemoteId,
        dest_offset: u64,
        src: &[u8],
    ) -> Result<(), CallError> {
        self.invoke(
            Request::BufMemCpyToRemote {
                handle_id,
                dest_buf_id,
                dest_offset,
                src: src.to_vec(),
                n: src.len() as u64,
            },
            expect!(BufMemCpyToRemote),
        )
        .await
    }

    /// Copy up to `n` bytes out of the remote buffer.
    pub async fn buf_memcpy_from_remote(
        &self,
        handle_id: RemoteId,
        src_buf_id: RemoteId,
        src_offset: u64,
        n: u64,
    ) -> Result<Vec<u8>, CallError> {
        let bytes = self
            .invoke(
                Request::BufMemCpyFromRemote {
                    handle_id,
                    src_buf_id,
                    src_offset,
                    n,
                },
                expect!(BufMemCpyFromRemote),
            )
            .await?;
        Ok(clamp(bytes, n))
    }

    /// Wait on the broker until `(value & mask) == expected_value` for the
    /// `width`-byte word at `offset`. `Busy` once `loops_timeout` polls
    /// spaced `sleep_interval_us` apart all miss.
    #[allow(clippy::too_many_arguments)]
    pub async fn buf_poll(
        &self,
        handle_id: RemoteId,
        buf_id: RemoteId,
        offset: u64,
        width: u32,
        mask: u64,
        expected_value: u64,
        sleep_interval_us: u64,
        loops_timeout: u64,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::BufPoll {
                handle_id,
                buf_id,
                offset,
                width,
                mask,
                expected_value,
                sleep_interval_us,
                loops_timeout,
            },
            expect!(BufPoll),
        )
        .await
    }

    /// Compare two remote ranges; `-1`, `0` or `1`.
    pub async fn buf_memcmp(
        &self,
        handle_id: RemoteId,
        bufa_id: RemoteId,
        bufa_offset: u64,
        bufb_id: RemoteId,
        bufb_offset: u64,
        n: u64,
    ) -> Result<i32, CallError> {
        self.invoke(
            Request::BufMemCmp {
                handle_id,
                bufa_id,
                bufa_offset,
                bufb_id,
                bufb_offset,
                n,
            },
            expect!(BufMemCmp),
        )
        .await
    }

    pub async fn buf_write_pattern(
        &self,
        handle_id: RemoteId,
        buf_id: RemoteId,
        pattern_name: &str,
    ) -> Result<(), CallError> {
        self.invoke(
            Request::BufWritePattern {
                handle_id,
                buf_id,
                pattern_name: pattern_name.to_string(),
            },
            expect!(BufWritePattern),
        )
        .await
    }
}

fn clamp<V>(mut values: Vec<V>, limit: u64) -> Vec<V> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    values.truncate(limit);
    values
}
