//! # Control Flows
//!
//! Signed control commands from the runtime's settings-backed nonce store
//! to a loopback device that verifies every envelope.
//!
//! ## Properties Tested:
//!
//! 1. **Nonce non-reuse**: concurrent commands consume distinct, gapless nonces
//! 2. **Recovery**: a stale local counter catches up via the `Nonce` query
//! 3. **Burned nonces**: a failed request never hands its nonce out again

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use shared_types::{Network, Policy};
    use signer_runtime::SettingsStore;
    use vs_01_mutation_store::InMemoryTextBackend;
    use vs_04_control_channel::{
        ControlApi, ControlCommand, ControlError, ControlResponse, ControlService,
        LoopbackSigner, Secp256k1Envelope,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Settings = Arc<SettingsStore<InMemoryTextBackend>>;
    type Service = ControlService<Secp256k1Envelope, Arc<LoopbackSigner>, Settings>;

    fn settings() -> Settings {
        Arc::new(SettingsStore::new(InMemoryTextBackend::new(), Network::Regtest))
    }

    fn service_for(key_hex: &str, device: &Arc<LoopbackSigner>, settings: &Settings) -> Service {
        ControlService::new(
            Secp256k1Envelope::from_secret_hex(key_hex).unwrap(),
            Arc::clone(device),
            Arc::clone(settings),
        )
    }

    fn fixture() -> (String, Arc<LoopbackSigner>) {
        let key = Secp256k1Envelope::random();
        let device = Arc::new(LoopbackSigner::new(key.verifying_key()));
        (key.secret_hex().to_string(), device)
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_commands_use_distinct_nonces() {
        const N: u64 = 32;
        let (key, device) = fixture();
        let settings = settings();
        let service = Arc::new(service_for(&key, &device, &settings));

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.send(ControlCommand::QueryPolicy).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(
                handle.await.unwrap().unwrap(),
                ControlResponse::PolicyCurrent(Policy::default())
            );
        }

        let seen: BTreeSet<u64> = device.nonces().into_iter().collect();
        assert_eq!(seen, (1..=N).collect::<BTreeSet<u64>>());
        assert_eq!(settings.nonce().await.unwrap(), N);
    }

    #[tokio::test]
    async fn test_fresh_install_catches_up_with_device() {
        let (key, device) = fixture();
        let previous = service_for(&key, &device, &settings());
        for _ in 0..5 {
            previous.query_allowlist().await.unwrap();
        }

        // Same key, lost counter.
        let settings = settings();
        let service = service_for(&key, &device, &settings);
        assert!(matches!(
            service.query_allowlist().await,
            Err(ControlError::Remote(_))
        ));

        assert_eq!(service.query_nonce().await.unwrap(), 5);
        assert_eq!(settings.nonce().await.unwrap(), 5);

        let updated = service
            .update_allowlist(vec!["02ab@10.0.0.1:9735".to_string()])
            .await
            .unwrap();
        assert_eq!(updated, vec!["02ab@10.0.0.1:9735".to_string()]);
        assert_eq!(device.nonces(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_failed_request_burns_its_nonce() {
        let (key, device) = fixture();
        let settings = settings();
        let service = service_for(&key, &device, &settings);

        device.set_offline(true);
        assert!(matches!(
            service.send(ControlCommand::ResetWifi).await,
            Err(ControlError::Transport(_))
        ));
        assert_eq!(settings.nonce().await.unwrap(), 1);

        device.set_offline(false);
        assert_eq!(
            service.send(ControlCommand::ResetWifi).await.unwrap(),
            ControlResponse::ResetWifi
        );
        assert_eq!(device.nonces(), vec![2]);
    }

    #[tokio::test]
    async fn test_foreign_key_is_refused() {
        let (_, device) = fixture();
        let intruder = Secp256k1Envelope::random().secret_hex().to_string();
        let service = service_for(&intruder, &device, &settings());

        assert!(matches!(
            service.send(ControlCommand::ResetAll).await,
            Err(ControlError::Remote(_))
        ));
        assert!(device.nonces().is_empty());
    }
}
