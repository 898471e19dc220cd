//! # Persistence Flows
//!
//! The runtime container over a real state file: mutation records written
//! by session rounds and settings written by the runtime share one file and
//! must both survive a restart.

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use shared_bus::InMemoryBroker;
    use shared_types::{topics, Velocity};
    use signer_runtime::{RuntimeConfig, SignerContainer};
    use vs_01_mutation_store::{MutationBatch, MutationRecord, MutationStoreApi, TextBackend};
    use vs_02_sequence_guard::Session;
    use vs_03_session_controller::{
        ArgsProvider, EngineReturn, ScriptedEngine, SessionControllerApi,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const CLIENT: &str = "signer";

    /// Engine `VlsMuts` response naming "aaaa", "bbbb" and "cccc", each at
    /// version 15 with payload `ff ff ff`.
    fn three_record_batch() -> Vec<u8> {
        let mut bytes = vec![
            129, 167, 86, 108, 115, 77, 117, 116, 115, 130, 171, 99, 108, 105, 101, 110, 116, 95,
            104, 109, 97, 99, 196, 32,
        ];
        bytes.extend_from_slice(&[255u8; 32]);
        bytes.extend_from_slice(&[
            164, 109, 117, 116, 115, 147, 146, 164, 97, 97, 97, 97, 146, 15, 196, 3, 255, 255,
            255, 146, 164, 98, 98, 98, 98, 146, 15, 196, 3, 255, 255, 255, 146, 164, 99, 99, 99,
            99, 146, 15, 196, 3, 255, 255, 255,
        ]);
        bytes
    }

    fn config_in(dir: &Path) -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.storage.state_dir = dir.to_path_buf();
        config.session.client_id = CLIENT.to_string();
        config
    }

    fn topic(name: &str) -> String {
        format!("{CLIENT}/{name}")
    }

    /// Connect a controller and complete the handshake with no mutations.
    async fn steady_session(
        container: &SignerContainer,
        engine: ScriptedEngine,
    ) -> (
        signer_runtime::container::RuntimeController<
            shared_bus::InMemoryTransport,
            ScriptedEngine,
        >,
        Session,
    ) {
        let broker = Arc::new(InMemoryBroker::new());
        let controller = container.controller(Arc::new(broker.connect(CLIENT)), engine);
        let mut session = Session::new(CLIENT);
        controller.on_connect(&mut session).await.unwrap();

        controller
            .engine()
            .push_ok(EngineReturn::lss(topics::INIT_1_RES, b"r1".to_vec(), "LssInit"));
        controller.engine().push_ok(EngineReturn::lss(
            topics::INIT_2_RES,
            MutationBatch::default().encode_created().unwrap(),
            "LssCreated",
        ));
        controller
            .on_message(&mut session, &topic(topics::INIT_1_MSG), b"m1")
            .await;
        controller
            .on_message(&mut session, &topic(topics::INIT_2_MSG), b"m2")
            .await;
        (controller, session)
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test]
    async fn test_engine_batch_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
            let (controller, mut session) = steady_session(&container, ScriptedEngine::new()).await;
            controller.engine().push_ok(EngineReturn::checkpoint(
                b"held".to_vec(),
                three_record_batch(),
                0,
                "SignInvoice",
            ));
            let outcome = controller
                .on_message(&mut session, &topic(topics::VLS), &[0xAA, 0x55, 0, 0])
                .await;
            assert_eq!(outcome.summary().unwrap().applied, 3);
        }

        let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
        let snapshot = container.store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        for name in ["aaaa", "bbbb", "cccc"] {
            assert_eq!(snapshot[name], (15, vec![255, 255, 255]));
        }

        // Records are base64 text alongside the settings.
        let keys = container.backend().text_keys("").await.unwrap();
        assert!(keys.contains(&"muts/aaaa".to_string()));
        assert!(keys.contains(&"settings/seed".to_string()));
    }

    #[tokio::test]
    async fn test_repeated_apply_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
        let batch = MutationBatch::from_records([
            MutationRecord::new("A", 1, b"x".to_vec()),
            MutationRecord::new("B", 2, b"y".to_vec()),
        ]);

        container.store.apply(&batch).await.unwrap();
        let once = container.store.snapshot().await.unwrap();
        container.store.apply(&batch).await.unwrap();
        let twice = container.store.snapshot().await.unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.len(), 2);
        assert_eq!(twice["A"], (1, b"x".to_vec()));
        assert_eq!(twice["B"], (2, b"y".to_vec()));
    }

    #[tokio::test]
    async fn test_velocity_from_engine_reaches_next_args() {
        let dir = tempfile::tempdir().unwrap();
        {
            let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
            let (controller, mut session) = steady_session(&container, ScriptedEngine::new()).await;
            controller.engine().push_ok(
                EngineReturn::vls(topics::VLS_RES, b"ok".to_vec(), 0, "SendPayment")
                    .with_velocity(Velocity(1_700_000_000, vec![500, 700])),
            );
            assert!(controller
                .on_message(&mut session, &topic(topics::VLS), &[0xAA, 0x55, 0, 0])
                .await
                .is_published());
        }

        let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
        let args = container.settings.make_args().await.unwrap();
        assert_eq!(args.velocity, Some(Velocity(1_700_000_000, vec![500, 700])));
    }

    #[tokio::test]
    async fn test_clearing_state_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let container = SignerContainer::open(config_in(dir.path())).await.unwrap();
        let seed = *container.settings.seed().await.unwrap();
        container
            .store
            .apply(&MutationBatch::from_records([MutationRecord::new("A", 1, vec![1])]))
            .await
            .unwrap();

        assert_eq!(container.store.clear().await.unwrap(), 1);
        assert_eq!(container.store.len().await.unwrap(), 0);
        assert_eq!(*container.settings.seed().await.unwrap(), seed);
    }
}
