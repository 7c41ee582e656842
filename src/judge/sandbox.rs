//! Docker sandbox for compile and execute processes
//!
//! Each run is one short-lived container: no network, CPU quota derived from
//! the configured share, a hard memory cap, and a single bind-mounted working
//! directory. The wall-clock deadline is enforced here, around the container
//! wait; in-container exit codes 124 and 137 are mapped to the time and
//! memory resource classes.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{AttachContainerResults, LogOutput};
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::{
    AttachContainerOptionsBuilder, CreateContainerOptionsBuilder, CreateImageOptionsBuilder,
    RemoveContainerOptionsBuilder,
};
use bollard::Docker;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::constants::{
    CPU_PERIOD_MICROS, STATUS_CODE_MEMORY_LIMIT_EXCEEDED, STATUS_CODE_TIME_LIMIT_EXCEEDED,
};
use crate::error::AppResult;
use crate::utils::text::trim_trailing_whitespace;

/// Resource ceilings for a single sandboxed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimits {
    /// Deadline enforced around the container wait
    pub wall_clock: Duration,
    /// Hard memory cap; swap is capped to the same value
    pub memory_bytes: u64,
    /// CPU share; quota = share * period
    pub cpu_share: f64,
}

/// One compile or execute process to run inside a container
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub image: String,
    pub workdir_host: PathBuf,
    pub workdir_container: PathBuf,
    pub argv: Vec<String>,
    pub limits: ResourceLimits,
    /// Fed to the process on stdin; the stream is closed after writing
    pub stdin: Option<String>,
}

/// How a sandboxed run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitClass {
    /// Exit code 0
    Ok,
    /// Any non-zero exit code other than the resource-class codes
    NonZero(i64),
    /// Exit code 124, or the wall-clock deadline fired
    TimeLimitExceeded,
    /// Exit code 137
    MemoryLimitExceeded,
    /// Infrastructure failure: create, attach, start, or daemon errors.
    /// Retryable, unlike every other class.
    Error(String),
}

impl ExitClass {
    /// Classify a container exit code
    pub fn from_status_code(code: i64) -> Self {
        match code {
            0 => Self::Ok,
            STATUS_CODE_TIME_LIMIT_EXCEEDED => Self::TimeLimitExceeded,
            STATUS_CODE_MEMORY_LIMIT_EXCEEDED => Self::MemoryLimitExceeded,
            other => Self::NonZero(other),
        }
    }
}

/// Result of a sandboxed run. stdout and stderr are demultiplexed and
/// right-trimmed.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit: ExitClass,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    fn error(reason: String) -> Self {
        Self {
            exit: ExitClass::Error(reason),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// The seam between the pipeline stages and the container engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    /// Run one process to completion. Never pulls images; infrastructure
    /// failures come back as `ExitClass::Error`.
    async fn run(&self, request: RunRequest) -> RunOutcome;

    /// Make an image available locally
    async fn ensure_image(&self, image: &str) -> AppResult<()>;
}

/// Docker-backed sandbox
pub struct DockerSandbox {
    docker: Docker,
}

impl DockerSandbox {
    /// Create a new sandbox on an established Docker connection
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    async fn run_inner(&self, request: &RunRequest) -> RunOutcome {
        let options = CreateContainerOptionsBuilder::default().build();

        let host_config = HostConfig {
            binds: Some(vec![format!(
                "{}:{}",
                request.workdir_host.display(),
                request.workdir_container.display()
            )]),
            network_mode: Some("none".to_string()),
            memory: Some(request.limits.memory_bytes as i64),
            memory_swap: Some(request.limits.memory_bytes as i64),
            cpu_period: Some(CPU_PERIOD_MICROS),
            cpu_quota: Some((request.limits.cpu_share * CPU_PERIOD_MICROS as f64) as i64),
            ..Default::default()
        };

        let config = ContainerCreateBody {
            image: Some(request.image.clone()),
            working_dir: Some(request.workdir_container.display().to_string()),
            cmd: Some(request.argv.clone()),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(true),
            stdin_once: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        };

        let container = match self.docker.create_container(Some(options), config).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "failed to create container");
                return RunOutcome::error(format!("create container: {e}"));
            }
        };

        let outcome = self.drive_container(&container.id, request).await;

        // Remove on every exit path; the attach stream was drained first
        let remove_options = RemoveContainerOptionsBuilder::default().force(true).build();
        if let Err(e) = self
            .docker
            .remove_container(&container.id, Some(remove_options))
            .await
        {
            tracing::error!(container_id = %container.id, error = %e, "failed to remove container");
        }

        outcome
    }

    async fn drive_container(&self, container_id: &str, request: &RunRequest) -> RunOutcome {
        let attach_options = AttachContainerOptionsBuilder::default()
            .stream(true)
            .stdin(true)
            .stdout(true)
            .stderr(true)
            .build();

        let AttachContainerResults {
            mut output,
            mut input,
        } = match self
            .docker
            .attach_container(container_id, Some(attach_options))
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(container_id = %container_id, error = %e, "failed to attach container");
                return RunOutcome::error(format!("attach container: {e}"));
            }
        };

        if let Some(stdin) = &request.stdin {
            if let Err(e) = input.write_all(stdin.as_bytes()).await {
                tracing::error!(container_id = %container_id, error = %e, "failed to write stdin");
                return RunOutcome::error(format!("write stdin: {e}"));
            }
        }
        if let Err(e) = input.shutdown().await {
            tracing::debug!(container_id = %container_id, error = %e, "stdin close failed");
        }

        if let Err(e) = self
            .docker
            .start_container(
                container_id,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
        {
            tracing::error!(container_id = %container_id, error = %e, "failed to start container");
            return RunOutcome::error(format!("start container: {e}"));
        }

        let mut wait_stream = self.docker.wait_container(
            container_id,
            None::<bollard::query_parameters::WaitContainerOptions>,
        );

        let status_code =
            match tokio::time::timeout(request.limits.wall_clock, wait_stream.next()).await {
                // Deadline expiry wins over whatever the container was doing
                Err(_) => {
                    tracing::info!(container_id = %container_id, "wall clock deadline exceeded");
                    return RunOutcome {
                        exit: ExitClass::TimeLimitExceeded,
                        stdout: String::new(),
                        stderr: String::new(),
                    };
                }
                Ok(Some(Ok(response))) => response.status_code,
                Ok(Some(Err(bollard::errors::Error::DockerContainerWaitError {
                    code, ..
                }))) => code,
                Ok(Some(Err(e))) => {
                    tracing::error!(container_id = %container_id, error = %e, "failed to wait for container");
                    return RunOutcome::error(format!("wait container: {e}"));
                }
                Ok(None) => {
                    return RunOutcome::error("container wait stream ended".to_string());
                }
            };

        // The container has exited; drain the attach stream so the captured
        // output is complete
        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(message) = output.next().await {
            match message {
                Ok(LogOutput::StdOut { message }) => {
                    stdout.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::StdErr { message }) => {
                    stderr.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(container_id = %container_id, error = %e, "failed to read container output");
                    return RunOutcome::error(format!("read output: {e}"));
                }
            }
        }

        RunOutcome {
            exit: ExitClass::from_status_code(status_code),
            stdout: trim_trailing_whitespace(&stdout).to_string(),
            stderr: trim_trailing_whitespace(&stderr).to_string(),
        }
    }
}

#[async_trait]
impl SandboxRunner for DockerSandbox {
    async fn run(&self, request: RunRequest) -> RunOutcome {
        self.run_inner(&request).await
    }

    async fn ensure_image(&self, image: &str) -> AppResult<()> {
        tracing::info!(image, "pulling image");

        let options = CreateImageOptionsBuilder::default().from_image(image).build();
        let mut pull_stream = self.docker.create_image(Some(options), None, None);

        while let Some(progress) = pull_stream.next().await {
            progress?;
        }

        tracing::info!(image, "image pulled successfully");
        Ok(())
    }
}
