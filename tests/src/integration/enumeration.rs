//! # Enumeration, Properties and System Objects
//!
//! Ids handed out for tokens are stable across clients and calls; parent
//! references in properties travel as remote ids in both directions.

#[cfg(test)]
mod tests {
    use crate::harness::{accelerator_filter, accelerator_token, open_accelerator, TestBroker};
    use ar_03_client_stub::CallError;
    use shared_types::{
        AcceleratorState, FpgaError, ObjectType, Properties, RemoteId, SysObjectType,
    };

    #[tokio::test]
    async fn test_reenumeration_reuses_ids_across_clients() {
        let broker = TestBroker::start(2).await.unwrap();
        let first = broker.client().enumerate(&[], 16).await.unwrap();
        let second = broker.client().enumerate(&[], 16).await.unwrap();

        assert_eq!(first.num_matches, 4);
        let ids = |tokens: &[shared_types::TokenHeader]| {
            tokens.iter().map(|t| t.token_id).collect::<Vec<RemoteId>>()
        };
        assert_eq!(ids(&first.tokens), ids(&second.tokens));
        assert_eq!(broker.dispatcher().registry().tokens.len(), 4);
    }

    #[tokio::test]
    async fn test_max_tokens_bounds_reply() {
        let broker = TestBroker::start(2).await.unwrap();
        let found = broker.client().enumerate(&[], 1).await.unwrap();
        assert_eq!(found.tokens.len(), 1);
        assert_eq!(found.num_matches, 4);
    }

    #[tokio::test]
    async fn test_parent_round_trips_as_remote_id() {
        let broker = TestBroker::start(2).await.unwrap();
        let client = broker.client();
        let accel = accelerator_token(&client).await.unwrap();

        let props = client.get_properties(accel).await.unwrap();
        assert_eq!(props.object_type, Some(ObjectType::Accelerator));
        let parent = props.parent.unwrap();

        let device = client.get_properties(parent).await.unwrap();
        assert_eq!(device.object_type, Some(ObjectType::Device));

        let filter = Properties {
            parent: Some(parent),
            ..accelerator_filter()
        };
        let children = client.enumerate(&[filter], 8).await.unwrap();
        assert_eq!(children.num_matches, 1);
        assert_eq!(children.tokens[0].token_id, accel);

        let bogus = Properties {
            parent: Some(RemoteId::new(9, 9)),
            ..Default::default()
        };
        let err = client.enumerate(&[bogus], 8).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
    }

    #[tokio::test]
    async fn test_properties_from_handle_show_assignment() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let accel = accelerator_token(&client).await.unwrap();

        let before = client.update_properties(accel).await.unwrap();
        assert_eq!(before.accelerator_state, Some(AcceleratorState::Unassigned));

        let handle = client.open(accel, 0).await.unwrap();
        let props = client
            .get_properties_from_handle(handle.handle_id)
            .await
            .unwrap();
        assert_eq!(props.accelerator_state, Some(AcceleratorState::Assigned));
        assert_eq!(props.parent, before.parent);
    }

    #[tokio::test]
    async fn test_object_tree_walk() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let handle = open_accelerator(&client).await.unwrap().handle_id;

        let userclk = client.handle_get_object(handle, "userclk", 0).await.unwrap();
        assert_eq!(
            client.object_get_type(userclk).await.unwrap(),
            SysObjectType::Container
        );
        assert_eq!(client.object_get_size(userclk, 0).await.unwrap(), 2);

        let freq = client
            .object_get_object(userclk, "frequency", 0)
            .await
            .unwrap();
        assert_eq!(client.object_get_name(freq).await.unwrap(), "frequency");
        assert_eq!(client.object_read64(freq, 0).await.unwrap(), 312_500_000);
        assert_eq!(client.object_read(freq, 0, 3, 0).await.unwrap(), b"312");

        let first = client.object_get_object_at(userclk, 0).await.unwrap();
        assert_eq!(client.object_get_name(first).await.unwrap(), "frequency");

        client.destroy_object(freq).await.unwrap();
        let err = client.object_read64(freq, 0).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::InvalidParam)));
    }

    #[tokio::test]
    async fn test_object_write_then_read() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let token = accelerator_token(&client).await.unwrap();

        let power = client.token_get_object(token, "power_state", 0).await.unwrap();
        client.object_write64(power, 2, 0).await.unwrap();
        assert_eq!(client.object_read64(power, 0).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_error_registers() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let token = accelerator_token(&client).await.unwrap();

        assert_eq!(client.read_error(token, 0).await.unwrap(), 0);
        let info = client.get_error_info(token, 0).await.unwrap();
        assert_eq!(info.name, "errors");
        assert!(info.can_clear);

        client.clear_all_errors(token).await.unwrap();
        let err = client.read_error(token, 7).await.unwrap_err();
        assert!(matches!(err, CallError::Remote(_)));
    }

    #[tokio::test]
    async fn test_user_clock_and_metrics() {
        let broker = TestBroker::start(1).await.unwrap();
        let client = broker.client();
        let handle = open_accelerator(&client).await.unwrap().handle_id;

        client
            .set_user_clock(handle, 400_000_000, 200_000_000, 0)
            .await
            .unwrap();
        let clock = client.get_user_clock(handle, 0).await.unwrap();
        assert_eq!(clock.high_hz, 400_000_000);
        assert_eq!(clock.low_hz, 200_000_000);

        assert_eq!(client.get_num_metrics(handle).await.unwrap(), 3);
        assert_eq!(client.get_metrics_info(handle, 2).await.unwrap().len(), 2);

        let by_name = client
            .get_metrics_by_name(handle, &["fpga_die".to_string()])
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].metric_num, 1);

        let thresholds = client.get_metrics_threshold_info(handle, 8).await.unwrap();
        assert_eq!(thresholds.len(), 2);

        let err = client
            .get_metrics_by_index(handle, &[42])
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Remote(FpgaError::NotFound)));
    }
}
