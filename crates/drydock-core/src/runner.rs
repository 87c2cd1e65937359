//! Check orchestration
//!
//! One [`CheckRunner::run`] call drives a single submission through the
//! sandbox: validate the entry file, launch the containerized checker,
//! copy the report and trace back out, force-remove the container, classify.
//! The steps are strictly sequential and never move backwards.
//!
//! Every failure along the way is folded into a [`CheckOutcome`] before this
//! module returns; callers never see a raw process or filesystem error. The
//! container is force-removed exactly once whenever the run command was
//! launched, no matter which later step failed. Deleting the workspace
//! directory is the caller's job, after it has taken the outcome.

use crate::driver::{DockerDriver, SandboxDriver, SandboxInvocation};
use crate::namespace::RunNamespace;
use crate::options::CheckOptions;
use crate::outcome::{CheckOutcome, RetainedTrace};
use crate::retention::{self, RetentionManager};
use crate::SandboxConfig;
use std::sync::Arc;

/// The sentinel the checker writes when it found nothing wrong
const NO_ISSUES: &str = "No issues";

/// Orchestrates sandboxed checker runs
pub struct CheckRunner {
    config: SandboxConfig,
    driver: Arc<dyn SandboxDriver>,
    retention: RetentionManager,
}

impl CheckRunner {
    /// Runner backed by the docker driver
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        let driver = Arc::new(DockerDriver::new(config.clone()));
        Self::with_driver(config, driver)
    }

    /// Runner backed by an arbitrary driver (fakes in tests)
    #[must_use]
    pub fn with_driver(config: SandboxConfig, driver: Arc<dyn SandboxDriver>) -> Self {
        Self {
            config,
            driver,
            retention: RetentionManager::new(),
        }
    }

    /// Run one submission to a verdict.
    pub async fn run(&self, namespace: &RunNamespace, options: Option<&str>) -> CheckOutcome {
        // Nothing has been launched yet, so a failure here issues no
        // cleanup command either.
        if !namespace.main_file_exists().await {
            tracing::error!(
                namespace = %namespace.id,
                main_file = %namespace.main_file.display(),
                "submitted file does not exist"
            );
            return CheckOutcome::Internal {
                message: String::from("submitted file could not be found on the server"),
            };
        }

        let options = match options.map_or(Ok(CheckOptions::default()), CheckOptions::parse) {
            Ok(options) => options,
            Err(e) => {
                return CheckOutcome::Error {
                    message: e.to_string(),
                };
            }
        };

        let invocation = SandboxInvocation::build(&self.config, namespace, &options);

        let run = self.driver.run(&invocation).await;
        if !run.ok() {
            tracing::info!(
                namespace = %namespace.id,
                exit_code = ?run.exit_code,
                timed_out = run.timed_out,
                error = ?run.error,
                stdout = %run.stdout,
                stderr = %run.stderr,
                "checker run failed"
            );
            let outcome = if run.exit_code == Some(self.config.oom_exit_code) {
                CheckOutcome::OutOfMemory {
                    message: run.stdout,
                }
            } else if run.timed_out || run.exit_code == Some(self.config.time_budget_exit_code) {
                CheckOutcome::Timeout {
                    message: run.stdout,
                }
            } else {
                CheckOutcome::Error {
                    message: run.stdout,
                }
            };
            self.remove_container(namespace, &invocation).await;
            return outcome;
        }

        // A copy that "succeeds" but complains on stderr is still a failed
        // retrieval.
        let report_copy = self.driver.copy_report(&invocation).await;
        if !report_copy.ok() || !report_copy.stderr.is_empty() {
            tracing::error!(
                namespace = %namespace.id,
                exit_code = ?report_copy.exit_code,
                error = ?report_copy.error,
                stderr = %report_copy.stderr,
                run_stdout = %run.stdout,
                "failed to retrieve the checker report"
            );
            self.remove_container(namespace, &invocation).await;
            return CheckOutcome::Internal {
                message: String::from("failed to produce the checker model"),
            };
        }

        // Trace retrieval is best effort; a miss only costs the reference.
        let trace_copy = self.driver.copy_trace(&invocation).await;
        let trace_saved = trace_copy.ok() && trace_copy.stderr.is_empty();
        if !trace_saved {
            tracing::debug!(
                namespace = %namespace.id,
                exit_code = ?trace_copy.exit_code,
                stderr = %trace_copy.stderr,
                "no trace rendering retrieved"
            );
        }

        // The container has given up everything useful; it goes away before
        // classification, which only touches host files from here on.
        self.remove_container(namespace, &invocation).await;

        let report: serde_json::Value = match self.read_report(namespace).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    namespace = %namespace.id,
                    error = %e,
                    run_stdout = %run.stdout,
                    "failed to parse the checker report"
                );
                if trace_saved {
                    // The rendering will never be referenced; drop it now
                    // instead of letting the retention timer find it.
                    retention::remove_artifact(&namespace.trace_file).await;
                }
                return CheckOutcome::Internal {
                    message: String::from("failed to parse the checker results"),
                };
            }
        };

        let has_issue = report
            .get("issue")
            .is_some_and(|issue| !issue.is_null() && issue != NO_ISSUES);

        if has_issue {
            let trace = trace_saved.then(|| {
                self.retention
                    .schedule_expiry(namespace.trace_file.clone(), self.config.trace_ttl);
                RetainedTrace {
                    location: format!("/download/{}", namespace.id),
                    ttl: self.config.trace_ttl,
                }
            });
            tracing::info!(namespace = %namespace.id, "checker reported a violation");
            CheckOutcome::Violation { report, trace }
        } else {
            tracing::info!(namespace = %namespace.id, "checker completed with no issues");
            CheckOutcome::Completed { output: run.stdout }
        }
    }

    async fn read_report(&self, namespace: &RunNamespace) -> crate::Result<serde_json::Value> {
        let data = tokio::fs::read(&namespace.report_file).await?;
        serde_json::from_slice(&data)
            .map_err(|e| crate::DrydockError::Execution(format!("malformed report: {e}")))
    }

    /// Issued exactly once per launched run; its own failure never reaches
    /// the caller.
    async fn remove_container(&self, namespace: &RunNamespace, invocation: &SandboxInvocation) {
        let removal = self.driver.remove(invocation).await;
        if !removal.ok() {
            tracing::warn!(
                namespace = %namespace.id,
                exit_code = ?removal.exit_code,
                stderr = %removal.stderr,
                "failed to remove sandbox container"
            );
        }
    }
}
