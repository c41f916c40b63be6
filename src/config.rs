use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 300;
pub const DEFAULT_TOKEN_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub vpn_clients_dir: PathBuf,
    pub antizapret_clients_dir: PathBuf,
    pub client_script_path: PathBuf,
    pub admin_username: String,
    pub admin_password: String,
    pub token_lifetime_secs: u64,
    pub token_sweep_interval_secs: u64,
    /// Upper bound on a single provisioning script run. `None` waits forever.
    pub provision_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset and empty values both take
    /// the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let parse_or = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(8080),
            vpn_clients_dir: env_or(
                "OPENVPN_CLIENTS_PATH",
                "mock_fs/root/antizapret/client/openvpn/vpn-udp/",
            )
            .into(),
            antizapret_clients_dir: env_or(
                "OPENVPN_ANTIZAPRET_PATH",
                "mock_fs/root/antizapret/client/openvpn/antizapret-udp/",
            )
            .into(),
            client_script_path: env_or(
                "CLIENT_SCRIPT_PATH",
                "./mock_fs/root/antizapret/client.sh",
            )
            .into(),
            admin_username: env_or("ADMIN_USERNAME", "admin"),
            admin_password: env_or("ADMIN_PASSWORD", "password"),
            token_lifetime_secs: parse_or("TOKEN_LIFETIME_SECS", DEFAULT_TOKEN_LIFETIME_SECS),
            token_sweep_interval_secs: parse_or(
                "TOKEN_SWEEP_INTERVAL_SECS",
                DEFAULT_TOKEN_SWEEP_INTERVAL_SECS,
            ),
            provision_timeout_secs: lookup("PROVISION_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|secs| *secs > 0),
            log_level: env_or("LOG_LEVEL", "info"),
        }
    }

    /// Token lifetime as a signed delta. Zero or unrepresentable values fall
    /// back to the default.
    pub fn token_lifetime(&self) -> chrono::Duration {
        let lifetime = i64::try_from(self.token_lifetime_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(chrono::Duration::try_seconds);

        match lifetime {
            Some(lifetime) => lifetime,
            None => {
                tracing::warn!(
                    value = self.token_lifetime_secs,
                    default = DEFAULT_TOKEN_LIFETIME_SECS,
                    "Invalid token lifetime, using default"
                );
                chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS as i64)
            }
        }
    }

    /// Sweep interval, never zero and never longer than the token lifetime.
    pub fn token_sweep_interval(&self) -> Duration {
        let lifetime_secs = self.token_lifetime().num_seconds() as u64;

        if self.token_sweep_interval_secs == 0 {
            tracing::warn!(
                default = DEFAULT_TOKEN_SWEEP_INTERVAL_SECS,
                "Token sweep interval is zero, using default"
            );
            return Duration::from_secs(DEFAULT_TOKEN_SWEEP_INTERVAL_SECS.min(lifetime_secs));
        }

        if self.token_sweep_interval_secs > lifetime_secs {
            tracing::warn!(
                interval = self.token_sweep_interval_secs,
                lifetime = lifetime_secs,
                "Token sweep interval exceeds token lifetime, clamping"
            );
            return Duration::from_secs(lifetime_secs);
        }

        Duration::from_secs(self.token_sweep_interval_secs)
    }

    pub fn provision_timeout(&self) -> Option<Duration> {
        self.provision_timeout_secs.map(Duration::from_secs)
    }
}
