//! Daemon configuration

use drydock_core::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to Unix socket
    pub socket_path: PathBuf,

    /// Root for run workspaces and retained traces
    pub data_dir: PathBuf,

    /// How many checks may run concurrently
    pub max_concurrent_checks: usize,

    /// Sandbox configuration for checker runs
    pub sandbox: SandboxConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: drydock_core::config::default_socket_path(),
            data_dir: PathBuf::from("/var/lib/drydock"),
            max_concurrent_checks: 2,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Where run workspaces are allocated
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Where retained trace renderings live until their TTL
    #[must_use]
    pub fn traces_dir(&self) -> PathBuf {
        self.data_dir.join("traces")
    }
}
