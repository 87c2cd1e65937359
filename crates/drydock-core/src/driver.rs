//! Sandbox driver
//!
//! The orchestrator never names a container technology. It builds one
//! [`SandboxInvocation`] per run and hands it to a [`SandboxDriver`], which
//! executes the individual commands under the configured timeouts. The
//! docker implementation here is the production driver; tests substitute a
//! scripted fake.

use crate::exec::{self, CommandLine, ExecResult};
use crate::namespace::RunNamespace;
use crate::options::CheckOptions;
use crate::SandboxConfig;
use async_trait::async_trait;

/// The four command lines bound to one run namespace.
///
/// Immutable once built; rebuilt for every run and never shared across
/// namespaces. The container name equals the namespace id, which is what
/// rules out name collisions between concurrent runs.
#[derive(Debug, Clone)]
pub struct SandboxInvocation {
    pub run: CommandLine,
    pub copy_report: CommandLine,
    pub copy_trace: CommandLine,
    pub remove: CommandLine,
}

impl SandboxInvocation {
    /// Materialize the command lines for one run. Pure function of its
    /// inputs; options are validated before this point.
    #[must_use]
    pub fn build(
        config: &SandboxConfig,
        namespace: &RunNamespace,
        options: &CheckOptions,
    ) -> Self {
        let mut run_args = vec![
            String::from("run"),
            String::from("--memory"),
            config.memory_limit.clone(),
            String::from("--memory-swap"),
            config.memory_limit.clone(),
            String::from("--cpus"),
            config.cpu_quota.to_string(),
            String::from("--name"),
            namespace.id.clone(),
            String::from("-v"),
            format!(
                "{}:{}",
                namespace.directory.display(),
                config.mount_point.display()
            ),
            String::from("-w"),
            config.workdir.display().to_string(),
            String::from("-t"),
            config.image.clone(),
            config.entry_point.clone(),
        ];
        run_args.extend(options.to_args());
        run_args.push(namespace.container_main_arg(&config.mount_point));

        Self {
            run: CommandLine::new("docker", run_args),
            copy_report: CommandLine::new(
                "docker",
                [
                    String::from("cp"),
                    format!("{}:{}", namespace.id, config.report_path.display()),
                    namespace.report_file.display().to_string(),
                ],
            ),
            copy_trace: CommandLine::new(
                "docker",
                [
                    String::from("cp"),
                    format!("{}:{}", namespace.id, config.trace_path.display()),
                    namespace.trace_file.display().to_string(),
                ],
            ),
            remove: CommandLine::new(
                "docker",
                [
                    String::from("container"),
                    String::from("rm"),
                    String::from("--force"),
                    namespace.id.clone(),
                ],
            ),
        }
    }
}

/// Narrow seam between the orchestrator and the container technology
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    /// Launch the sandboxed run and wait for it
    async fn run(&self, invocation: &SandboxInvocation) -> ExecResult;

    /// Copy the structured report out of the sandbox
    async fn copy_report(&self, invocation: &SandboxInvocation) -> ExecResult;

    /// Copy the optional trace rendering out of the sandbox
    async fn copy_trace(&self, invocation: &SandboxInvocation) -> ExecResult;

    /// Force-remove the sandbox container
    async fn remove(&self, invocation: &SandboxInvocation) -> ExecResult;
}

/// Production driver: shells out to the docker CLI
#[derive(Debug, Clone)]
pub struct DockerDriver {
    config: SandboxConfig,
}

impl DockerDriver {
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxDriver for DockerDriver {
    async fn run(&self, invocation: &SandboxInvocation) -> ExecResult {
        exec::execute(&invocation.run, self.config.run_timeout).await
    }

    async fn copy_report(&self, invocation: &SandboxInvocation) -> ExecResult {
        exec::execute(&invocation.copy_report, self.config.copy_timeout).await
    }

    async fn copy_trace(&self, invocation: &SandboxInvocation) -> ExecResult {
        exec::execute(&invocation.copy_trace, self.config.copy_timeout).await
    }

    async fn remove(&self, invocation: &SandboxInvocation) -> ExecResult {
        exec::execute(&invocation.remove, self.config.remove_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn namespace() -> RunNamespace {
        RunNamespace {
            id: String::from("ns-1"),
            directory: PathBuf::from("/data/uploads/ns-1"),
            main_file: PathBuf::from("/data/uploads/ns-1/main.ex"),
            main_filename: String::from("main.ex"),
            report_file: PathBuf::from("/data/uploads/ns-1/report-uuid"),
            trace_file: PathBuf::from("/data/traces/ns-1.html"),
        }
    }

    #[test]
    fn run_command_encodes_limits_mount_and_entry() {
        let invocation = SandboxInvocation::build(
            &SandboxConfig::default(),
            &namespace(),
            &CheckOptions::default(),
        );

        assert_eq!(invocation.run.program, "docker");
        assert_eq!(
            invocation.run.args,
            vec![
                "run",
                "--memory",
                "400M",
                "--memory-swap",
                "400M",
                "--cpus",
                "0.5",
                "--name",
                "ns-1",
                "-v",
                "/data/uploads/ns-1:/code",
                "-w",
                "/checker",
                "-t",
                "drydock/checker",
                "./check.sh",
                "../code/main.ex",
            ]
        );
    }

    #[test]
    fn run_command_appends_pass_through_options_before_the_main_file() {
        let options = CheckOptions::parse("-c C=3 -m std=v1").unwrap();
        let invocation =
            SandboxInvocation::build(&SandboxConfig::default(), &namespace(), &options);

        let args = &invocation.run.args;
        let tail = &args[args.len() - 5..];
        assert_eq!(
            tail,
            ["--const", "C=3", "--module", "std=v1", "../code/main.ex"]
        );
    }

    #[test]
    fn copy_commands_target_the_reserved_host_paths() {
        let invocation = SandboxInvocation::build(
            &SandboxConfig::default(),
            &namespace(),
            &CheckOptions::default(),
        );

        assert_eq!(
            invocation.copy_report.args,
            vec![
                "cp",
                "ns-1:/checker/report.json",
                "/data/uploads/ns-1/report-uuid",
            ]
        );
        assert_eq!(
            invocation.copy_trace.args,
            vec!["cp", "ns-1:/checker/trace.html", "/data/traces/ns-1.html"]
        );
    }

    #[test]
    fn remove_command_is_a_force_remove_by_container_name() {
        let invocation = SandboxInvocation::build(
            &SandboxConfig::default(),
            &namespace(),
            &CheckOptions::default(),
        );
        assert_eq!(
            invocation.remove.args,
            vec!["container", "rm", "--force", "ns-1"]
        );
    }

    #[test]
    fn memory_and_swap_ceilings_always_match() {
        let config = SandboxConfig::builder().memory_limit("600M").build();
        let invocation = SandboxInvocation::build(&config, &namespace(), &CheckOptions::default());

        let args = &invocation.run.args;
        let mem = args.iter().position(|a| a == "--memory").unwrap();
        let swap = args.iter().position(|a| a == "--memory-swap").unwrap();
        assert_eq!(args[mem + 1], "600M");
        assert_eq!(args[swap + 1], "600M");
    }
}
