use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Expiry used when a client is created without a positive day count.
pub const DEFAULT_CLIENT_TTL_DAYS: i64 = 3650;

const OP_CREATE: &str = "1";
const OP_DELETE: &str = "2";

/// The external tool that actually writes and removes client configs.
///
/// Implementations return only after the tool has finished. Failures carry
/// the tool's combined output unchanged.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create(&self, name: &str, ttl_days: i64) -> Result<(), AppError>;
    async fn delete(&self, name: &str) -> Result<(), AppError>;
}

/// Runs the client management script as `<script> <op> <args..>`.
#[derive(Debug, Clone)]
pub struct ScriptProvisioner {
    script_path: PathBuf,
    timeout: Option<Duration>,
}

impl ScriptProvisioner {
    pub fn new(script_path: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            script_path: script_path.into(),
            timeout,
        }
    }

    async fn run(&self, action: &str, args: &[&str]) -> Result<(), AppError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.script_path);
        cmd.args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            script = %self.script_path.display(),
            args = ?args,
            "Running provisioning command"
        );

        let child = cmd.spawn().map_err(|e| AppError::ExternalFailure {
            message: format!("failed to {}: {}", action, e),
            output: String::new(),
        })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                // Dropping the future drops the child, which kills it.
                Err(_) => {
                    return Err(AppError::ExternalFailure {
                        message: format!("failed to {}: timed out after {:?}", action, limit),
                        output: String::new(),
                    })
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| AppError::ExternalFailure {
            message: format!("failed to {}: {}", action, e),
            output: String::new(),
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            tracing::warn!(
                exit_code = output.status.code().unwrap_or(-1),
                duration_ms,
                "Provisioning command failed"
            );
            return Err(AppError::ExternalFailure {
                message: format!("failed to {}: {}", action, output.status),
                output: combined,
            });
        }

        tracing::debug!(duration_ms, "Provisioning command finished");
        Ok(())
    }
}

#[async_trait]
impl Provisioner for ScriptProvisioner {
    async fn create(&self, name: &str, ttl_days: i64) -> Result<(), AppError> {
        let days = if ttl_days <= 0 {
            DEFAULT_CLIENT_TTL_DAYS
        } else {
            ttl_days
        };
        let days = days.to_string();
        self.run("create client", &[OP_CREATE, name, &days]).await
    }

    async fn delete(&self, name: &str) -> Result<(), AppError> {
        self.run("delete client", &[OP_DELETE, name]).await
    }
}
