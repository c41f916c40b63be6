use crate::config::AppConfig;
use crate::services::client_repository::ClientDirectoryRepository;
use crate::services::provisioner::{Provisioner, ScriptProvisioner};
use crate::services::token_cache::DownloadTokenCache;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<ClientDirectoryRepository>,
    pub tokens: Arc<DownloadTokenCache>,
    pub config: Arc<AppConfig>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let provisioner = Arc::new(ScriptProvisioner::new(
            config.client_script_path.clone(),
            config.provision_timeout(),
        ));
        Self::with_provisioner(config, provisioner)
    }

    /// Build state around a caller-supplied provisioner.
    pub fn with_provisioner(config: AppConfig, provisioner: Arc<dyn Provisioner>) -> Self {
        let clients = ClientDirectoryRepository::new(
            config.vpn_clients_dir.clone(),
            config.antizapret_clients_dir.clone(),
            provisioner,
        );
        let lifetime = config.token_lifetime();
        Self {
            clients: Arc::new(clients),
            tokens: Arc::new(DownloadTokenCache::new(lifetime)),
            config: Arc::new(config),
            start_time: chrono::Utc::now(),
        }
    }
}
