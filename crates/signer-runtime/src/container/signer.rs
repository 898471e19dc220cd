//! Collaborator wiring for the signer session layer.

use std::sync::Arc;

use shared_bus::Transport;
use thiserror::Error;
use tracing::{info, instrument};
use vs_01_mutation_store::{Base64Backend, FileTextBackend, MutationStoreService, StoreError};
use vs_03_session_controller::{SessionController, SigningEngine};
use vs_04_control_channel::{
    ControlError, ControlService, HttpControlTransport, Secp256k1Envelope,
};

use crate::adapters::{SettingsError, SettingsStore};
use crate::container::config::{ConfigError, RuntimeConfig};

/// Mutation store over the shared state file.
pub type FileMutationStore = MutationStoreService<Base64Backend<Arc<FileTextBackend>>>;

/// Settings over the shared state file.
pub type FileSettings = SettingsStore<Arc<FileTextBackend>>;

/// Control channel speaking HTTP, with its nonce persisted in settings.
pub type HttpControl = ControlService<Secp256k1Envelope, HttpControlTransport, Arc<FileSettings>>;

/// Controller wired to the container's store and settings.
pub type RuntimeController<T, E> =
    SessionController<T, E, Arc<FileMutationStore>, Arc<FileSettings>>;

/// Errors building the container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("State file error: {0}")]
    Store(#[from] StoreError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Control channel error: {0}")]
    Control(#[from] ControlError),
}

/// Long-lived collaborators shared by every session.
pub struct SignerContainer {
    config: RuntimeConfig,
    backend: Arc<FileTextBackend>,
    /// Engine state records.
    pub store: Arc<FileMutationStore>,
    /// Seed, nonces and engine arguments.
    pub settings: Arc<FileSettings>,
    /// Administrative channel to the signer.
    pub control: HttpControl,
}

impl SignerContainer {
    /// Validate `config`, open the state file and wire the collaborators.
    ///
    /// The control secret comes from the configuration when set, otherwise
    /// it is generated once and persisted in settings.
    #[instrument(skip(config), fields(state_file = %config.state_file().display()))]
    pub async fn open(config: RuntimeConfig) -> Result<Self, ContainerError> {
        config.validate()?;

        let backend = Arc::new(FileTextBackend::open(config.state_file()).await?);
        let store = Arc::new(MutationStoreService::new(Base64Backend::new(Arc::clone(
            &backend,
        ))));
        let settings = Arc::new(SettingsStore::new(
            Arc::clone(&backend),
            config.signer.network,
        ));

        let envelope = match &config.control.secret_hex {
            Some(secret) => Secp256k1Envelope::from_secret_hex(secret)?,
            None => Secp256k1Envelope::from_secret_hex(&settings.control_secret().await?)?,
        };
        let transport = HttpControlTransport::with_timeouts(
            &config.control.api_root,
            std::time::Duration::from_secs(config.control.request_timeout_secs),
            std::time::Duration::from_secs(config.control.connect_timeout_secs),
        )?;
        let control = ControlService::new(envelope, transport, Arc::clone(&settings));

        info!(
            client = %config.session.client_id,
            api_root = %config.control.api_root,
            "Signer container ready"
        );

        Ok(Self {
            config,
            backend,
            store,
            settings,
            control,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<FileTextBackend> {
        &self.backend
    }

    /// A controller for one transport endpoint and signing engine.
    #[must_use]
    pub fn controller<T, E>(&self, transport: Arc<T>, engine: E) -> RuntimeController<T, E>
    where
        T: Transport,
        E: SigningEngine,
    {
        SessionController::new(
            transport,
            engine,
            Arc::clone(&self.store),
            Arc::clone(&self.settings),
        )
    }
}
