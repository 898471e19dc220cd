//! # Session Flows
//!
//! A scripted signing engine behind the full session stack: in-memory
//! broker, session runner, controller, guard and mutation store.
//!
//! ## Flows Tested:
//!
//! 1. **Handshake → steady state → checkpoint**: responses leave in order and
//!    mutations are durable before the response that depends on them
//! 2. **Unknown topic**: discarded with no side effects
//! 3. **Sequence violation**: store wiped, handshake restarted
//! 4. **Reconnect**: the session restarts, the store survives

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared_bus::{InMemoryBroker, InMemoryTransport, Subscription, TopicFilter};
    use shared_types::{topic_suffix, topics, Network};
    use signer_runtime::{SessionRunner, StopReason};
    use tokio::sync::watch;
    use vs_01_mutation_store::{
        InMemoryRecordBackend, MutationBatch, MutationRecord, MutationStoreApi,
        MutationStoreService,
    };
    use vs_02_sequence_guard::{Phase, RejectReason, Session};
    use vs_03_session_controller::{
        EngineReturn, FixedArgsProvider, Outcome, ScriptedEngine, SessionController,
        SessionControllerApi,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Store = Arc<MutationStoreService<InMemoryRecordBackend>>;
    type Controller =
        SessionController<InMemoryTransport, ScriptedEngine, Store, FixedArgsProvider>;

    const CLIENT: &str = "node-a";

    struct Stack {
        broker: Arc<InMemoryBroker>,
        transport: Arc<InMemoryTransport>,
        store: Store,
        controller: Controller,
        wire: Subscription,
    }

    /// Everything the signer side publishes, seen from the broker.
    fn outbound_filter() -> TopicFilter {
        TopicFilter::suffixes([
            topics::HELLO,
            topics::BYE,
            topics::INIT_1_RES,
            topics::INIT_2_RES,
            topics::VLS_RES,
            topics::LSS_RES,
        ])
    }

    fn stack() -> Stack {
        let broker = Arc::new(InMemoryBroker::new());
        let wire = broker.observe(outbound_filter());
        let transport = Arc::new(broker.connect(CLIENT));
        let store: Store = Arc::new(MutationStoreService::new(InMemoryRecordBackend::new()));
        let controller = SessionController::new(
            Arc::clone(&transport),
            ScriptedEngine::new(),
            Arc::clone(&store),
            FixedArgsProvider::new([9; 32], Network::Regtest, [3; 32]),
        );
        Stack {
            broker,
            transport,
            store,
            controller,
            wire,
        }
    }

    fn topic(name: &str) -> String {
        format!("{CLIENT}/{name}")
    }

    fn vls_payload(seq: u16) -> Vec<u8> {
        let [hi, lo] = seq.to_be_bytes();
        vec![0xAA, 0x55, hi, lo, 0x42]
    }

    fn record_batch(name: &str, version: i64) -> MutationBatch {
        MutationBatch::from_records([MutationRecord::new(name, version, vec![version as u8])])
    }

    fn script_handshake(engine: &ScriptedEngine, created: &MutationBatch) {
        engine.push_ok(EngineReturn::lss(topics::INIT_1_RES, b"init-1-res".to_vec(), "LssInit"));
        engine.push_ok(EngineReturn::lss(
            topics::INIT_2_RES,
            created.encode_created().unwrap(),
            "LssCreated",
        ));
    }

    fn drain(wire: &mut Subscription) -> Vec<(String, Vec<u8>)> {
        wire.drain()
            .into_iter()
            .map(|m| (topic_suffix(&m.topic).to_string(), m.payload))
            .collect()
    }

    fn suffixes(wire: &mut Subscription) -> Vec<String> {
        drain(wire).into_iter().map(|(t, _)| t).collect()
    }

    async fn until_subscribed(broker: &InMemoryBroker) {
        while broker.subscriptions(CLIENT).is_empty() {
            tokio::task::yield_now().await;
        }
    }

    async fn handshake(stack: &Stack, session: &mut Session, created: &MutationBatch) {
        script_handshake(stack.controller.engine(), created);
        assert!(stack
            .controller
            .on_message(session, &topic(topics::INIT_1_MSG), b"m1")
            .await
            .is_published());
        assert!(stack
            .controller
            .on_message(session, &topic(topics::INIT_2_MSG), b"m2")
            .await
            .is_published());
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_full_session_through_runner() {
        let Stack {
            broker,
            transport,
            store,
            controller,
            mut wire,
        } = stack();

        let engine = controller.engine();
        script_handshake(engine, &record_batch("node", 1));
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"pong".to_vec(), 0, "Ping"));
        engine.push_ok(EngineReturn::checkpoint(
            b"signed".to_vec(),
            record_batch("chan/1", 2).encode().unwrap(),
            1,
            "SignChannelAnnouncement",
        ));
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"signed".to_vec(), 1, "VLS"));
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"pong2".to_vec(), 2, "Ping"));

        let (_shutdown, rx) = watch::channel(false);
        let mut runner = SessionRunner::new(transport, controller, CLIENT, Duration::from_millis(1), rx);

        let feeder_broker = Arc::clone(&broker);
        let feeder = tokio::spawn(async move {
            until_subscribed(&feeder_broker).await;
            feeder_broker.inject(&topic(topics::INIT_1_MSG), b"m1".to_vec());
            feeder_broker.inject(&topic(topics::INIT_2_MSG), b"m2".to_vec());
            feeder_broker.inject(&topic(topics::VLS), vls_payload(0));
            feeder_broker.inject(&topic(topics::VLS), vls_payload(1));
            feeder_broker.inject(&topic(topics::LSS_MSG), b"stored".to_vec());
            feeder_broker.inject(&topic(topics::VLS), vls_payload(2));
            feeder_broker.close(CLIENT);
        });

        assert_eq!(runner.run().await, StopReason::TransportClosed);
        feeder.await.unwrap();

        let stats = runner.stats();
        assert_eq!(stats.messages, 6);
        assert_eq!(stats.published, 6);
        assert_eq!(runner.controller().engine().remaining(), 0);

        assert_eq!(
            drain(&mut wire),
            vec![
                ("hello".to_string(), Vec::new()),
                ("init-1-res".to_string(), b"init-1-res".to_vec()),
                (
                    "init-2-res".to_string(),
                    record_batch("node", 1).encode_created().unwrap()
                ),
                ("vls-res".to_string(), b"pong".to_vec()),
                (
                    "lss-res".to_string(),
                    record_batch("chan/1", 2).encode().unwrap()
                ),
                ("vls-res".to_string(), b"signed".to_vec()),
                ("vls-res".to_string(), b"pong2".to_vec()),
            ]
        );

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["node"], (1, vec![1]));
        assert_eq!(snapshot["chan/1"], (2, vec![2]));

        // The last steady-state call saw the checkpoint's mutations.
        let calls = runner.controller().engine().calls();
        let last = calls.last().unwrap();
        assert_eq!(last.state.len(), 2);
        assert_eq!(last.expected_sequence, Some(2));
        assert_eq!(last.handshake, Some((b"m1".to_vec(), b"m2".to_vec())));
    }

    #[tokio::test]
    async fn test_unknown_topic_has_no_effect() {
        let mut stack = stack();
        let mut session = Session::new(CLIENT);
        stack.controller.on_connect(&mut session).await.unwrap();
        handshake(&stack, &mut session, &record_batch("node", 1)).await;
        stack
            .controller
            .engine()
            .push_ok(EngineReturn::vls(topics::VLS_RES, b"pong".to_vec(), 4, "Ping"));
        stack
            .controller
            .on_message(&mut session, &topic(topics::VLS), &vls_payload(4))
            .await;
        stack.wire.drain();

        let before = session.clone();
        let calls_before = stack.controller.engine().call_count();
        let snapshot_before = stack.store.snapshot().await.unwrap();

        let outcome = stack
            .controller
            .on_message(&mut session, &topic("firmware-blob"), b"\x00\x01")
            .await;

        assert_eq!(
            outcome,
            Outcome::Discarded {
                topic: topic("firmware-blob")
            }
        );
        assert_eq!(session, before);
        assert_eq!(session.expected_sequence, Some(5));
        assert_eq!(stack.controller.engine().call_count(), calls_before);
        assert_eq!(stack.store.snapshot().await.unwrap(), snapshot_before);
        assert!(stack.wire.drain().is_empty());
    }

    #[tokio::test]
    async fn test_sequence_violation_restarts_from_scratch() {
        let mut stack = stack();
        let mut session = Session::new(CLIENT);
        stack.controller.on_connect(&mut session).await.unwrap();
        handshake(&stack, &mut session, &record_batch("node", 1)).await;

        let engine = stack.controller.engine();
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"v0".to_vec(), 0, "Ping"));
        // Engine reports a sequence behind the one just completed.
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"v?".to_vec(), 0, "Ping"));

        assert!(stack
            .controller
            .on_message(&mut session, &topic(topics::VLS), &vls_payload(0))
            .await
            .is_published());
        assert_eq!(stack.store.len().await.unwrap(), 1);
        stack.wire.drain();

        let outcome = stack
            .controller
            .on_message(&mut session, &topic(topics::VLS), &vls_payload(1))
            .await;
        assert!(matches!(outcome, Outcome::Reset { .. }));
        assert_eq!(session.phase, Phase::AwaitingInit1);
        assert_eq!(session.expected_sequence, None);
        assert!(session.handshake_msg_1.is_none());
        assert_eq!(stack.store.len().await.unwrap(), 0);
        assert_eq!(suffixes(&mut stack.wire), vec!["hello"]);

        // Nothing steady-state gets through until the handshake is redone.
        let outcome = stack
            .controller
            .on_message(&mut session, &topic(topics::VLS), &vls_payload(2))
            .await;
        assert_eq!(
            outcome,
            Outcome::Rejected(RejectReason::HandshakeIncomplete {
                phase: Phase::AwaitingInit1
            })
        );

        handshake(&stack, &mut session, &record_batch("node", 7)).await;
        assert_eq!(session.phase, Phase::Steady);
        assert_eq!(stack.store.snapshot().await.unwrap()["node"], (7, vec![7]));
    }

    #[tokio::test]
    async fn test_reconnect_requires_new_handshake() {
        let Stack {
            broker,
            transport,
            store,
            controller,
            mut wire,
        } = stack();

        let engine = controller.engine();
        script_handshake(engine, &record_batch("node", 1));
        script_handshake(engine, &MutationBatch::default());
        engine.push_ok(EngineReturn::vls(topics::VLS_RES, b"after".to_vec(), 9, "Ping"));

        let (_shutdown, rx) = watch::channel(false);
        let mut runner = SessionRunner::new(transport, controller, CLIENT, Duration::from_millis(1), rx);

        let feeder_broker = Arc::clone(&broker);
        let feeder = tokio::spawn(async move {
            until_subscribed(&feeder_broker).await;
            feeder_broker.inject(&topic(topics::INIT_1_MSG), b"m1".to_vec());
            feeder_broker.inject(&topic(topics::INIT_2_MSG), b"m2".to_vec());
            feeder_broker.disconnect(CLIENT, "broker restart");
            feeder_broker.reconnect(CLIENT);
            until_subscribed(&feeder_broker).await;
            feeder_broker.inject(&topic(topics::VLS), vls_payload(9));
            feeder_broker.inject(&topic(topics::INIT_1_MSG), b"n1".to_vec());
            feeder_broker.inject(&topic(topics::INIT_2_MSG), b"n2".to_vec());
            feeder_broker.inject(&topic(topics::VLS), vls_payload(9));
            feeder_broker.close(CLIENT);
        });

        runner.run().await;
        feeder.await.unwrap();

        let stats = runner.stats();
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.disconnects, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.published, 5);

        assert_eq!(
            suffixes(&mut wire),
            vec![
                "hello",
                "init-1-res",
                "init-2-res",
                "hello",
                "init-1-res",
                "init-2-res",
                "vls-res"
            ]
        );

        // The store outlived the connection and fed the new session.
        assert_eq!(store.snapshot().await.unwrap()["node"], (1, vec![1]));
        let calls = runner.controller().engine().calls();
        let last = calls.last().unwrap();
        assert_eq!(last.handshake, Some((b"n1".to_vec(), b"n2".to_vec())));
        assert_eq!(last.state.len(), 1);
    }
}
