//! Sandbox configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the containerized checker sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Container image holding the checker toolchain
    pub image: String,

    /// Entry script invoked inside the container
    pub entry_point: String,

    /// Where the run workspace is bind-mounted inside the container
    pub mount_point: PathBuf,

    /// Working directory inside the container
    pub workdir: PathBuf,

    /// In-container path of the structured report the checker writes
    pub report_path: PathBuf,

    /// In-container path of the optional trace rendering
    pub trace_path: PathBuf,

    /// Hard memory ceiling (docker syntax, e.g. "400M"); swap is capped to
    /// the same value so the limit cannot be dodged
    pub memory_limit: String,

    /// CPU share as a fraction of one core
    pub cpu_quota: f64,

    /// Wall-clock ceiling for the run command
    pub run_timeout: Duration,

    /// Ceiling for each artifact copy command
    pub copy_timeout: Duration,

    /// Ceiling for the container force-remove command
    pub remove_timeout: Duration,

    /// Exit code the container runtime reports when the memory ceiling
    /// killed the run
    pub oom_exit_code: i32,

    /// Exit code the entry script reports when the checker exhausted its own
    /// internal time budget
    pub time_budget_exit_code: i32,

    /// How long a retained trace rendering stays downloadable
    pub trace_ttl: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: String::from("drydock/checker"),
            entry_point: String::from("./check.sh"),
            mount_point: PathBuf::from("/code"),
            workdir: PathBuf::from("/checker"),
            report_path: PathBuf::from("/checker/report.json"),
            trace_path: PathBuf::from("/checker/trace.html"),
            memory_limit: String::from("400M"),
            cpu_quota: 0.5,
            run_timeout: Duration::from_secs(30),
            copy_timeout: Duration::from_secs(10),
            remove_timeout: Duration::from_secs(20),
            oom_exit_code: 137,
            time_budget_exit_code: 255,
            trace_ttl: Duration::from_secs(300),
        }
    }
}

impl SandboxConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }
}

/// Builder for SandboxConfig
#[derive(Debug, Default)]
pub struct SandboxConfigBuilder {
    config: SandboxConfig,
}

impl SandboxConfigBuilder {
    #[must_use]
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.config.image = image.into();
        self
    }

    #[must_use]
    pub fn memory_limit(mut self, limit: impl Into<String>) -> Self {
        self.config.memory_limit = limit.into();
        self
    }

    #[must_use]
    pub fn cpu_quota(mut self, quota: f64) -> Self {
        self.config.cpu_quota = quota;
        self
    }

    #[must_use]
    pub fn run_timeout(mut self, duration: Duration) -> Self {
        self.config.run_timeout = duration;
        self
    }

    #[must_use]
    pub fn run_timeout_secs(self, secs: u64) -> Self {
        self.run_timeout(Duration::from_secs(secs))
    }

    #[must_use]
    pub fn trace_ttl(mut self, duration: Duration) -> Self {
        self.config.trace_ttl = duration;
        self
    }

    #[must_use]
    pub fn oom_exit_code(mut self, code: i32) -> Self {
        self.config.oom_exit_code = code;
        self
    }

    #[must_use]
    pub fn time_budget_exit_code(mut self, code: i32) -> Self {
        self.config.time_budget_exit_code = code;
        self
    }

    #[must_use]
    pub fn build(self) -> SandboxConfig {
        self.config
    }
}

/// Get default socket path from DRYDOCK_SOCKET env var or system default
///
/// Returns:
/// - `$DRYDOCK_SOCKET` if set (for development)
/// - `/run/drydock/drydock.sock` otherwise (production)
pub fn default_socket_path() -> PathBuf {
    std::env::var("DRYDOCK_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/drydock/drydock.sock"))
}
