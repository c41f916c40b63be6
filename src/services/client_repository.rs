use crate::error::AppError;
use crate::models::client::{
    ClientKind, ClientRecord, ClientStatus, ConfigType, PaginatedClients,
};
use crate::services::naming::parse_client_name;
use crate::services::provisioner::Provisioner;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Client catalog derived from the config files on disk.
///
/// Nothing is cached: every call rescans the directory, so files written or
/// removed by the provisioning script show up on the next call.
pub struct ClientDirectoryRepository {
    vpn_dir: PathBuf,
    antizapret_dir: PathBuf,
    provisioner: Arc<dyn Provisioner>,
}

impl ClientDirectoryRepository {
    pub fn new(
        vpn_dir: impl Into<PathBuf>,
        antizapret_dir: impl Into<PathBuf>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            vpn_dir: vpn_dir.into(),
            antizapret_dir: antizapret_dir.into(),
            provisioner,
        }
    }

    fn dir_for(&self, config_type: ConfigType) -> &Path {
        match config_type {
            ConfigType::Vpn => &self.vpn_dir,
            ConfigType::Antizapret => &self.antizapret_dir,
        }
    }

    /// Scan the VPN directory, newest first, with ids `1..=N` in that order.
    pub async fn list_all(&self) -> Result<Vec<ClientRecord>, AppError> {
        let mut entries = tokio::fs::read_dir(&self.vpn_dir)
            .await
            .map_err(AppError::IoUnavailable)?;

        let mut found: Vec<(String, DateTime<Utc>)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(AppError::IoUnavailable)?
        {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(parse_client_name) else {
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(
                        file = %entry.path().display(),
                        error = %e,
                        "Failed to read client file metadata, skipping"
                    );
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::warn!(
                        file = %entry.path().display(),
                        error = %e,
                        "Client file has no modification time, skipping"
                    );
                    continue;
                }
            };

            found.push((name.to_string(), modified));
        }

        // Name as tie-breaker keeps equal mtimes in a fixed order.
        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let clients = found
            .into_iter()
            .enumerate()
            .map(|(i, (name, created_at))| ClientRecord {
                id: i as i64 + 1,
                name,
                kind: ClientKind::OpenVPN,
                status: ClientStatus::Active,
                created_at,
            })
            .collect();

        Ok(clients)
    }

    /// Page through [`list_all`](Self::list_all). `page` and `limit` are
    /// clamped to at least 1; a page past the end is empty but keeps `total`.
    pub async fn list_paginated(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<PaginatedClients, AppError> {
        let all = self.list_all().await?;
        Ok(paginate(all, page, limit))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<ClientRecord, AppError> {
        self.list_all()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("client with ID {} not found", id)))
    }

    pub async fn resolve_config_path(
        &self,
        name: &str,
        config_type: ConfigType,
    ) -> Result<PathBuf, AppError> {
        let dir = self.dir_for(config_type);
        let not_found = || AppError::NotFound(format!("config file not found for client: {}", name));

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Config directory unreadable");
                return Err(not_found());
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return Err(not_found()),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Config directory unreadable");
                    return Err(not_found());
                }
            };

            let file_name = entry.file_name();
            if file_name.to_str().and_then(parse_client_name) != Some(name) {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => continue,
                _ => return Ok(dir.join(file_name)),
            }
        }
    }

    /// Provision a client. The returned record is provisional (`id == -1`);
    /// the next scan assigns the real positional id.
    pub async fn create(&self, name: &str, ttl_days: i64) -> Result<ClientRecord, AppError> {
        self.provisioner.create(name, ttl_days).await?;
        Ok(ClientRecord {
            id: -1,
            name: name.to_string(),
            kind: ClientKind::OpenVPN,
            status: ClientStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub async fn delete_by_name(&self, name: &str) -> Result<(), AppError> {
        self.provisioner.delete(name).await
    }

    /// Resolve `id` within a single scan, then delete by name.
    pub async fn delete_by_id(&self, id: i64) -> Result<ClientRecord, AppError> {
        let client = self.find_by_id(id).await?;
        self.delete_by_name(&client.name).await?;
        Ok(client)
    }
}

fn paginate(all: Vec<ClientRecord>, page: usize, limit: usize) -> PaginatedClients {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = all.len();
    let start = (page - 1).saturating_mul(limit);

    if start >= total {
        return PaginatedClients {
            total,
            clients: Vec::new(),
        };
    }

    let clients = all.into_iter().skip(start).take(limit).collect();
    PaginatedClients { total, clients }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs::File;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    #[derive(Default)]
    struct RecordingProvisioner {
        calls: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Provisioner for RecordingProvisioner {
        async fn create(&self, name: &str, ttl_days: i64) -> Result<(), AppError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {} {}", name, ttl_days));
            match &self.fail_with {
                Some(out) => Err(AppError::ExternalFailure {
                    message: "failed to create client".into(),
                    output: out.clone(),
                }),
                None => Ok(()),
            }
        }

        async fn delete(&self, name: &str) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(format!("delete {}", name));
            Ok(())
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        vpn: PathBuf,
        az: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let vpn = tmp.path().join("vpn-udp");
        let az = tmp.path().join("antizapret-udp");
        std::fs::create_dir_all(&vpn).unwrap();
        std::fs::create_dir_all(&az).unwrap();
        Fixture { _tmp: tmp, vpn, az }
    }

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let f = File::create(dir.join(name)).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        f.set_modified(mtime).unwrap();
    }

    fn repo(fx: &Fixture, provisioner: Arc<dyn Provisioner>) -> ClientDirectoryRepository {
        ClientDirectoryRepository::new(&fx.vpn, &fx.az, provisioner)
    }

    fn plain_repo(fx: &Fixture) -> ClientDirectoryRepository {
        repo(fx, Arc::new(RecordingProvisioner::default()))
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(Alice R)-udp.ovpn", 200);
        touch(&fx.vpn, "vpn-bob-(Bob S).ovpn", 100);

        let clients = plain_repo(&fx).list_all().await.unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].id, 1);
        assert_eq!(clients[0].name, "bob");
        assert_eq!(clients[1].id, 2);
        assert_eq!(clients[1].name, "alice");
        assert_eq!(clients[0].kind, ClientKind::OpenVPN);
        assert_eq!(clients[0].status, ClientStatus::Active);
    }

    #[tokio::test]
    async fn test_list_all_skips_foreign_entries() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(Alice R)-udp.ovpn", 10);
        touch(&fx.vpn, "readme.txt", 5);
        touch(&fx.vpn, "vpn-bad.ovpn", 5);
        std::fs::create_dir(fx.vpn.join("vpn-dir-(x).ovpn")).unwrap();

        let clients = plain_repo(&fx).list_all().await.unwrap();
        let names: Vec<_> = clients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[tokio::test]
    async fn test_list_all_ids_dense_and_sorted() {
        let fx = fixture();
        for i in 0..7 {
            touch(&fx.vpn, &format!("vpn-c{}-(n).ovpn", i), 10 * (i + 1));
        }

        let clients = plain_repo(&fx).list_all().await.unwrap();
        let ids: Vec<i64> = clients.iter().map(|c| c.id).collect();
        assert_eq!(ids, (1..=7).collect::<Vec<_>>());
        assert!(clients
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_list_all_equal_mtimes_ordered_by_name() {
        let fx = fixture();
        let mtime = SystemTime::now() - Duration::from_secs(60);
        for name in ["vpn-zed-(z).ovpn", "vpn-amy-(a)-udp.ovpn", "vpn-max-(m).ovpn"] {
            File::create(fx.vpn.join(name))
                .unwrap()
                .set_modified(mtime)
                .unwrap();
        }
        touch(&fx.vpn, "vpn-new-(n).ovpn", 1);

        let repo = plain_repo(&fx);
        let first = repo.list_all().await.unwrap();
        let names: Vec<_> = first.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["new", "amy", "max", "zed"]);

        for _ in 0..5 {
            assert_eq!(repo.list_all().await.unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_list_all_missing_dir_is_io_unavailable() {
        let fx = fixture();
        let repo = ClientDirectoryRepository::new(
            fx.vpn.join("missing"),
            &fx.az,
            Arc::new(RecordingProvisioner::default()),
        );
        let err = repo.list_all().await.unwrap_err();
        assert!(matches!(err, AppError::IoUnavailable(_)));
    }

    #[tokio::test]
    async fn test_paginate_second_page() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(Alice R)-udp.ovpn", 200);
        touch(&fx.vpn, "vpn-bob-(Bob S).ovpn", 100);

        let page = plain_repo(&fx).list_paginated(2, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.clients.len(), 1);
        assert_eq!(page.clients[0].id, 2);
        assert_eq!(page.clients[0].name, "alice");
    }

    #[tokio::test]
    async fn test_paginate_out_of_range_keeps_total() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(a).ovpn", 20);
        touch(&fx.vpn, "vpn-bob-(b).ovpn", 10);

        let page = plain_repo(&fx).list_paginated(5, 10).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.clients.is_empty());
    }

    #[tokio::test]
    async fn test_pages_reconstruct_full_listing() {
        let fx = fixture();
        for i in 0..11 {
            touch(&fx.vpn, &format!("vpn-c{}-(n)-tcp.ovpn", i), 5 * (i + 1));
        }
        let repo = plain_repo(&fx);
        let all = repo.list_all().await.unwrap();

        for limit in 1..=12 {
            let mut stitched = Vec::new();
            let mut page = 1;
            loop {
                let p = repo.list_paginated(page, limit).await.unwrap();
                assert_eq!(p.total, all.len());
                if p.clients.is_empty() {
                    break;
                }
                stitched.extend(p.clients);
                page += 1;
            }
            assert_eq!(stitched, all, "limit {}", limit);
        }
    }

    #[test]
    fn test_paginate_clamps_zero_inputs() {
        let records: Vec<ClientRecord> = (1..=3)
            .map(|id| ClientRecord {
                id,
                name: format!("c{}", id),
                kind: ClientKind::OpenVPN,
                status: ClientStatus::Active,
                created_at: Utc::now(),
            })
            .collect();
        let page = paginate(records, 0, 0);
        assert_eq!(page.total, 3);
        assert_eq!(page.clients.len(), 1);
        assert_eq!(page.clients[0].id, 1);
    }

    #[tokio::test]
    async fn test_resolve_config_path_by_type() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(Alice R)-udp.ovpn", 10);
        touch(&fx.az, "antizapret-alice-(Alice R)-udp.ovpn", 10);
        let repo = plain_repo(&fx);

        let vpn = repo.resolve_config_path("alice", ConfigType::Vpn).await.unwrap();
        assert_eq!(vpn, fx.vpn.join("vpn-alice-(Alice R)-udp.ovpn"));

        let az = repo
            .resolve_config_path("alice", ConfigType::Antizapret)
            .await
            .unwrap();
        assert_eq!(az, fx.az.join("antizapret-alice-(Alice R)-udp.ovpn"));
    }

    #[tokio::test]
    async fn test_resolve_config_path_not_found() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(Alice R)-udp.ovpn", 10);
        let repo = plain_repo(&fx);

        let err = repo.resolve_config_path("bob", ConfigType::Vpn).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // Name must match exactly, not by prefix.
        let err = repo.resolve_config_path("ali", ConfigType::Vpn).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_config_path_unreadable_dir_is_not_found() {
        let fx = fixture();
        let repo = ClientDirectoryRepository::new(
            &fx.vpn,
            fx.az.join("missing"),
            Arc::new(RecordingProvisioner::default()),
        );
        let err = repo
            .resolve_config_path("alice", ConfigType::Antizapret)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_returns_provisional_record() {
        let fx = fixture();
        let provisioner = Arc::new(RecordingProvisioner::default());
        let repo = repo(&fx, provisioner.clone());

        let record = repo.create("carol", 30).await.unwrap();
        assert_eq!(record.id, -1);
        assert_eq!(record.name, "carol");
        assert_eq!(*provisioner.calls.lock().unwrap(), vec!["create carol 30"]);

        // Catalog is untouched until the script writes the file.
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_passes_output_through() {
        let fx = fixture();
        let provisioner = Arc::new(RecordingProvisioner {
            fail_with: Some("name taken".into()),
            ..Default::default()
        });
        let err = repo(&fx, provisioner).create("carol", 0).await.unwrap_err();
        match err {
            AppError::ExternalFailure { output, .. } => assert_eq!(output, "name taken"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_by_id_resolves_name() {
        let fx = fixture();
        touch(&fx.vpn, "vpn-alice-(a).ovpn", 200);
        touch(&fx.vpn, "vpn-bob-(b).ovpn", 100);
        let provisioner = Arc::new(RecordingProvisioner::default());
        let repo = repo(&fx, provisioner.clone());

        let deleted = repo.delete_by_id(2).await.unwrap();
        assert_eq!(deleted.name, "alice");
        assert_eq!(*provisioner.calls.lock().unwrap(), vec!["delete alice"]);

        let err = repo.delete_by_id(9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
