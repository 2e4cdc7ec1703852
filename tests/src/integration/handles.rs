//! # Handle Lifecycle
//!
//! Open, MMIO access and close through the client stub, including teardown
//! races between clients on separate connections.

#[cfg(test)]
mod tests {
    use crate::harness::{accelerator_token, open_accelerator, TestBroker};
    use ar_03_client_stub::CallError;
    use shared_types::{flags, FpgaError, Mmio512, RemoteId};

    #[tokio::test]
    async fn test_mmio_round_trip_then_stale_handle() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();

        let token_id = accelerator_token(&client).await.unwrap();
        let handle = client.open(token_id, 0).await.unwrap();
        assert_eq!(handle.token_id, token_id);

        let mmio = client.map_mmio(handle.handle_id, 0).await.unwrap();
        assert!(mmio.is_valid());

        client
            .write_mmio32(handle.handle_id, 0, 0x40, 0xcafe_f00d)
            .await
            .unwrap();
        let value = client.read_mmio32(handle.handle_id, 0, 0x40).await.unwrap();
        assert_eq!(value, 0xcafe_f00d);

        client.close(handle.handle_id).await.unwrap();

        let err = client
            .read_mmio32(handle.handle_id, 0, 0x40)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
        assert!(broker.dispatcher().registry().mmio.is_empty());

        broker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_exclusive_open_is_busy_for_second_client() {
        let broker = TestBroker::start(1).await.unwrap();
        let first = broker.client();
        let second = broker.client();

        let token_id = accelerator_token(&first).await.unwrap();
        let handle = first.open(token_id, 0).await.unwrap();

        let err = second.open(token_id, 0).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::Busy)));

        first.close(handle.handle_id).await.unwrap();
        let again = second.open(token_id, 0).await.unwrap();
        assert_ne!(again.handle_id, handle.handle_id);
    }

    #[tokio::test]
    async fn test_concurrent_close_from_many_clients() {
        let broker = TestBroker::start(1).await.unwrap();
        let handle = open_accelerator(&broker.client()).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let client = broker.client();
                let handle_id = handle.handle_id;
                tokio::spawn(async move { client.close(handle_id).await })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    CallError::Remote(FpgaError::InvalidParam | FpgaError::Busy)
                ));
            }
        }
        assert_eq!(broker.dispatcher().driver().open_handles(), 0);
        assert!(broker.dispatcher().registry().handles.is_empty());
    }

    #[tokio::test]
    async fn test_failed_close_keeps_handle_usable() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let handle = open_accelerator(&client).await.unwrap();

        broker
            .dispatcher()
            .driver()
            .fail_next("close", FpgaError::Busy);
        let err = client.close(handle.handle_id).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::Busy)));

        client
            .write_mmio64(handle.handle_id, 0, 0x100, u64::MAX)
            .await
            .unwrap();
        client.close(handle.handle_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_ids_never_reach_driver() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let before = broker.dispatcher().driver().calls();

        let forged = RemoteId::new(0x1234, 0x5678);
        for err in [
            client.close(forged).await.unwrap_err(),
            client.reset(RemoteId::INVALID).await.unwrap_err(),
            client.map_mmio(forged, 0).await.unwrap_err(),
            client.destroy_token(forged).await.unwrap_err(),
        ] {
            assert_eq!(err.result_code(), shared_types::FpgaResult::InvalidParam);
        }
        assert_eq!(broker.dispatcher().driver().calls(), before);
    }

    #[tokio::test]
    async fn test_mmio512_over_the_wire() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let handle = open_accelerator(&client).await.unwrap();

        let mut word = [0u8; Mmio512::LEN];
        for (i, byte) in word.iter_mut().enumerate() {
            *byte = i as u8;
        }
        client
            .write_mmio512(handle.handle_id, 1, 0x200, &Mmio512(word))
            .await
            .unwrap();
        let read = client.read_mmio512(handle.handle_id, 1, 0x200).await.unwrap();
        assert_eq!(read.as_bytes(), &word);
    }

    #[tokio::test]
    async fn test_cloned_token_lifecycle() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let token_id = accelerator_token(&client).await.unwrap();

        let clone = client.clone_token(token_id).await.unwrap();
        let handle = client
            .open(clone.token_id, flags::OPEN_SHARED)
            .await
            .unwrap();
        client.close(handle.handle_id).await.unwrap();

        client.destroy_token(clone.token_id).await.unwrap();
        let err = client.destroy_token(clone.token_id).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
        assert!(client.get_properties(token_id).await.is_ok());
    }
}
