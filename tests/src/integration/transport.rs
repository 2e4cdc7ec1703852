//! # Transport Faults
//!
//! Anything that keeps a trustworthy reply from arriving surfaces as
//! `CallError::Transport`, never as a device result code.

#[cfg(test)]
mod tests {
    use crate::harness::{accelerator_token, open_accelerator, TestBroker};
    use ar_03_client_stub::{CallError, ClientConfig, RemoteClient};
    use shared_transport::TransportError;
    use shared_types::FpgaResult;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client_for(port: u16, call_timeout_ms: u64) -> RemoteClient {
        let config = ClientConfig {
            connect_timeout_ms: 500,
            call_timeout_ms,
            ..ClientConfig::new("127.0.0.1", port)
        };
        RemoteClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_server_gone_is_transport_error() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let token = accelerator_token(&client).await.unwrap();

        broker.stop().await.unwrap();

        let err = client.get_properties(token).await.unwrap_err();
        assert!(err.is_transport(), "unexpected {err:?}");
        assert_eq!(err.result_code(), FpgaResult::Exception);

        // the broken stream was dropped and the listener is gone
        let err = client.get_properties(token).await.unwrap_err();
        assert!(err.is_transport(), "unexpected {err:?}");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client_for(port, 1_000)
            .enumerate(&[], 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CallError::Transport(TransportError::Connect { .. } | TransportError::ConnectTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let peer = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut sink = Vec::new();
            let _ = socket.read_to_end(&mut sink).await;
        });

        let err = client_for(port, 200).reset(shared_types::RemoteId::new(1, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            CallError::Transport(TransportError::CallTimeout { millis: 200 })
        ));
        peer.abort();
    }

    #[tokio::test]
    async fn test_garbage_reply_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(&[0, 0, 0, 3, 0xde, 0xad, 0x01]).await;
            let _ = socket.flush().await;
        });

        let err = client_for(port, 2_000)
            .close(shared_types::RemoteId::new(1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Transport(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_ids_survive_reconnect() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let handle = open_accelerator(&client).await.unwrap();
        assert!(client.transport().is_connected().await);

        client.disconnect().await;
        assert!(!client.transport().is_connected().await);

        // ids belong to the broker, not to the connection
        client.reset(handle.handle_id).await.unwrap();
        client.close(handle.handle_id).await.unwrap();
    }
}
