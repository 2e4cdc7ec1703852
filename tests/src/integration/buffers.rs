//! # Shared Buffers
//!
//! Buffer ownership is checked against the handle named in each request.
//! Also covers the byte-level helpers the broker runs on behalf of clients.

#[cfg(test)]
mod tests {
    use crate::harness::{open_accelerator, TestBroker};
    use ar_02_dispatcher::DispatcherConfig;
    use ar_03_client_stub::CallError;
    use shared_types::FpgaError;

    #[tokio::test]
    async fn test_release_through_wrong_handle_is_not_found() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h1 = open_accelerator(&client).await.unwrap().handle_id;
        let h2 = open_accelerator(&client).await.unwrap().handle_id;

        let buf = client.prepare_buffer(h1, 4096, None, 0).await.unwrap();

        let err = client.release_buffer(h2, buf).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::NotFound)));

        client.release_buffer(h1, buf).await.unwrap();

        let err = client.release_buffer(h1, buf).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
    }

    #[tokio::test]
    async fn test_io_address_only_through_owner() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h1 = open_accelerator(&client).await.unwrap().handle_id;
        let h2 = open_accelerator(&client).await.unwrap().handle_id;
        let buf = client.prepare_buffer(h1, 8192, None, 0).await.unwrap();

        assert!(client.get_io_address(h1, buf).await.unwrap() != 0);
        let err = client.get_io_address(h2, buf).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::NotFound)));
    }

    #[tokio::test]
    async fn test_copy_in_and_out() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h = open_accelerator(&client).await.unwrap().handle_id;
        let buf = client.prepare_buffer(h, 4096, None, 0).await.unwrap();

        let payload: Vec<u8> = (0..=255u8).collect();
        client
            .buf_memcpy_to_remote(h, buf, 1024, &payload)
            .await
            .unwrap();
        let copied = client
            .buf_memcpy_from_remote(h, buf, 1024, 256)
            .await
            .unwrap();
        assert_eq!(copied, payload);

        // past the end of the buffer
        let err = client
            .buf_memcpy_to_remote(h, buf, 4000, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
    }

    #[tokio::test]
    async fn test_memset_memcmp_and_pattern() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h = open_accelerator(&client).await.unwrap().handle_id;
        let a = client.prepare_buffer(h, 512, None, 0).await.unwrap();
        let b = client.prepare_buffer(h, 512, None, 0).await.unwrap();

        client.buf_memset(h, a, 0, 0x5a, 512).await.unwrap();
        client.buf_memset(h, b, 0, 0x5a, 512).await.unwrap();
        assert_eq!(client.buf_memcmp(h, a, 0, b, 0, 512).await.unwrap(), 0);

        client.buf_memset(h, b, 100, 0x00, 1).await.unwrap();
        assert_eq!(client.buf_memcmp(h, a, 0, b, 0, 512).await.unwrap(), 1);
        assert_eq!(client.buf_memcmp(h, b, 0, a, 0, 512).await.unwrap(), -1);

        client.buf_write_pattern(h, a, "ones").await.unwrap();
        let head = client.buf_memcpy_from_remote(h, a, 0, 4).await.unwrap();
        assert_eq!(head, vec![0xff; 4]);

        let err = client
            .buf_write_pattern(h, a, "checkerboard")
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
    }

    #[tokio::test]
    async fn test_poll_sees_value_or_times_out() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h = open_accelerator(&client).await.unwrap().handle_id;
        let buf = client.prepare_buffer(h, 64, None, 0).await.unwrap();

        client
            .buf_memcpy_to_remote(h, buf, 8, &0x1234_5678u32.to_le_bytes())
            .await
            .unwrap();
        client
            .buf_poll(h, buf, 8, 4, 0xffff, 0x5678, 10, 3)
            .await
            .unwrap();

        let err = client
            .buf_poll(h, buf, 8, 4, u64::MAX, 0xdead, 10, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::Busy)));
    }

    #[tokio::test]
    async fn test_payload_limit_applies_over_wire() {
        let config = DispatcherConfig {
            max_payload_bytes: 1024,
        };
        let broker = TestBroker::start_with(1, config).await.unwrap();
        let client = broker.client();
        let h = open_accelerator(&client).await.unwrap().handle_id;
        let buf = client.prepare_buffer(h, 8192, None, 0).await.unwrap();

        assert!(client.buf_memcpy_from_remote(h, buf, 0, 1024).await.is_ok());
        let err = client
            .buf_memcpy_from_remote(h, buf, 0, 2048)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));

        // nothing crosses the wire, so only the buffer bounds apply
        client.buf_memset(h, buf, 0, 0x7f, 8192).await.unwrap();
        client.buf_write_pattern(h, buf, "deadbeef").await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_length_buffer_rejected() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let h = open_accelerator(&client).await.unwrap().handle_id;

        let err = client.prepare_buffer(h, 0, None, 0).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
        assert!(broker.dispatcher().registry().buffers.is_empty());
    }
}
