//! Compile stage
//!
//! Materializes the submitted source to a fresh host working directory and
//! produces the program artifact: either by running the language's compile
//! command in a sandbox, or, for interpreted languages, by handing the source
//! file through untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use uuid::Uuid;

use crate::config::LanguageConfig;
use crate::constants::{PLACEHOLDER_PROGRAM, PLACEHOLDER_SOURCE, PROGRAM_FILE_SUFFIX};
use crate::judge::languages::substitute_template;
use crate::judge::sandbox::{ExitClass, ResourceLimits, RunRequest, SandboxRunner};

/// Result of the compile stage
#[derive(Debug)]
pub enum CompileOutcome {
    /// Compilation succeeded (or the language is interpreted). The working
    /// directory is owned by the execute stage from here on.
    Artifact {
        workdir: PathBuf,
        program_path: PathBuf,
    },
    /// The compiler rejected the source
    CompileError {
        stdout: String,
        stderr: String,
        code: i64,
    },
    /// Infrastructure failure; the dispatcher retries via redelivery
    Infra(String),
}

/// Compile stage
pub struct CompileStage {
    runner: Arc<dyn SandboxRunner>,
    workdir_root: PathBuf,
}

impl CompileStage {
    /// Create a new compile stage writing under the given workdir root
    pub fn new(runner: Arc<dyn SandboxRunner>, workdir_root: PathBuf) -> Self {
        Self {
            runner,
            workdir_root,
        }
    }

    /// Compile a submission's source for the given language
    pub async fn compile(&self, language: &LanguageConfig, source: &str) -> CompileOutcome {
        let workdir = self.workdir_root.join(Uuid::new_v4().to_string());
        if let Err(e) = fs::create_dir_all(&workdir).await {
            return CompileOutcome::Infra(format!("create workdir: {e}"));
        }

        let extension = language
            .compile
            .as_ref()
            .map(|compile| compile.source_file_extension.as_str())
            .unwrap_or_default();
        let source_path = workdir.join(format!("{}{}", Uuid::new_v4(), extension));

        if let Err(e) = fs::write(&source_path, source).await {
            self.cleanup(&workdir).await;
            return CompileOutcome::Infra(format!("write source file: {e}"));
        }

        // Interpreted language: the source file is the artifact
        let Some(compile_config) = &language.compile else {
            return CompileOutcome::Artifact {
                workdir,
                program_path: source_path,
            };
        };

        let program_path =
            PathBuf::from(format!("{}{}", source_path.display(), PROGRAM_FILE_SUFFIX));

        let argv = substitute_template(
            &compile_config.command_template,
            &[
                (PLACEHOLDER_SOURCE, &source_path.display().to_string()),
                (PLACEHOLDER_PROGRAM, &program_path.display().to_string()),
            ],
        );

        let outcome = self
            .runner
            .run(RunRequest {
                image: compile_config.image.clone(),
                workdir_host: workdir.clone(),
                workdir_container: workdir.clone(),
                argv,
                limits: ResourceLimits {
                    wall_clock: compile_config.timeout,
                    memory_bytes: compile_config.memory.as_u64(),
                    cpu_share: compile_config.cpus,
                },
                stdin: None,
            })
            .await;

        match outcome.exit {
            ExitClass::Ok => CompileOutcome::Artifact {
                workdir,
                program_path,
            },
            ExitClass::NonZero(code) => {
                tracing::info!(language = %language.value, code, "compilation failed");
                self.cleanup(&workdir).await;
                CompileOutcome::CompileError {
                    stdout: outcome.stdout,
                    stderr: outcome.stderr,
                    code,
                }
            }
            // A compiler hitting its own resource ceiling is an operational
            // problem, not a property of the submission
            ExitClass::TimeLimitExceeded => {
                self.cleanup(&workdir).await;
                CompileOutcome::Infra("compile step exceeded its time limit".to_string())
            }
            ExitClass::MemoryLimitExceeded => {
                self.cleanup(&workdir).await;
                CompileOutcome::Infra("compile step exceeded its memory limit".to_string())
            }
            ExitClass::Error(reason) => {
                self.cleanup(&workdir).await;
                CompileOutcome::Infra(reason)
            }
        }
    }

    async fn cleanup(&self, workdir: &Path) {
        if let Err(e) = fs::remove_dir_all(workdir).await {
            tracing::warn!(workdir = %workdir.display(), error = %e, "failed to remove workdir");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::sandbox::{MockSandboxRunner, RunOutcome};

    fn cpp_language() -> LanguageConfig {
        serde_yaml::from_str(
            r#"
value: cpp
name: C++
compile:
  image: gcc:14
  timeout: 10s
  memory: 1GB
  cpus: 1.0
  command_template: ["g++", "-O2", "-o", "$PROGRAM", "$SOURCE"]
  source_file_extension: .cpp
execute:
  image: gcc:14
  timeout: 1s
  memory: 256MB
  cpus: 1.0
  command_template: ["$PROGRAM"]
"#,
        )
        .unwrap()
    }

    fn python_language() -> LanguageConfig {
        serde_yaml::from_str(
            r#"
value: python
name: Python 3
execute:
  image: python:3.12-slim
  timeout: 2s
  memory: 256MB
  cpus: 1.0
  command_template: ["python3", "$PROGRAM"]
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_interpreted_language_source_is_artifact() {
        let temp = tempfile::tempdir().unwrap();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().never();

        let stage = CompileStage::new(Arc::new(runner), temp.path().to_path_buf());
        let outcome = stage
            .compile(&python_language(), "print(input())")
            .await;

        match outcome {
            CompileOutcome::Artifact {
                workdir,
                program_path,
            } => {
                assert!(program_path.starts_with(&workdir));
                let stored = std::fs::read_to_string(&program_path).unwrap();
                assert_eq!(stored, "print(input())");
            }
            other => panic!("expected artifact, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compile_error_reports_compiler_output() {
        let temp = tempfile::tempdir().unwrap();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(1).returning(|_| RunOutcome {
            exit: ExitClass::NonZero(1),
            stdout: String::new(),
            stderr: "error: expected ';'".to_string(),
        });

        let stage = CompileStage::new(Arc::new(runner), temp.path().to_path_buf());
        let outcome = stage.compile(&cpp_language(), "int main( {").await;

        match outcome {
            CompileOutcome::CompileError {
                stderr, code, ..
            } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("expected ';'"));
            }
            other => panic!("expected compile error, got {other:?}"),
        }

        // Failure paths leave nothing behind
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_compile_command_has_placeholders_substituted() {
        let temp = tempfile::tempdir().unwrap();
        let mut runner = MockSandboxRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|request: &RunRequest| {
                let source = &request.argv[4];
                let program = &request.argv[3];
                request.argv[..3] == ["g++", "-O2", "-o"]
                    && source.ends_with(".cpp")
                    && *program == format!("{source}.out")
                    && request.stdin.is_none()
            })
            .returning(|_| RunOutcome {
                exit: ExitClass::Ok,
                stdout: String::new(),
                stderr: String::new(),
            });

        let stage = CompileStage::new(Arc::new(runner), temp.path().to_path_buf());
        let outcome = stage.compile(&cpp_language(), "int main() {}").await;

        assert!(matches!(outcome, CompileOutcome::Artifact { .. }));
    }

    #[tokio::test]
    async fn test_compile_resource_exit_is_infra() {
        let temp = tempfile::tempdir().unwrap();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(1).returning(|_| RunOutcome {
            exit: ExitClass::TimeLimitExceeded,
            stdout: String::new(),
            stderr: String::new(),
        });

        let stage = CompileStage::new(Arc::new(runner), temp.path().to_path_buf());
        let outcome = stage.compile(&cpp_language(), "int main() {}").await;

        assert!(matches!(outcome, CompileOutcome::Infra(_)));
    }
}
