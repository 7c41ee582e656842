//! Execute stage
//!
//! Runs the program artifact against every test case of the problem in
//! stored order, feeding each case's input on stdin and comparing trimmed
//! stdout against the expected output. The first failing case decides the
//! outcome and stops the iteration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;

use crate::config::LanguageConfig;
use crate::constants::{PLACEHOLDER_PROGRAM, PLACEHOLDER_TIMEOUT};
use crate::judge::languages::substitute_template;
use crate::judge::sandbox::{ExitClass, ResourceLimits, RunRequest, SandboxRunner};
use crate::models::TestCase;
use crate::utils::text::outputs_match;

/// Result of running the artifact over all test cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Every case matched
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    /// Infrastructure failure; the dispatcher retries via redelivery
    Infra(String),
}

/// Per-case resource ceilings, derived from the problem with the language
/// execute configuration as fallback
#[derive(Debug, Clone, Copy)]
pub struct CaseLimits {
    pub wall_clock: Duration,
    pub memory_bytes: u64,
}

impl CaseLimits {
    /// Problem limits bound each case when positive; otherwise the language
    /// execute defaults apply.
    pub fn for_problem(language: &LanguageConfig, time_limit_ms: i64, memory_limit_bytes: i64) -> Self {
        let wall_clock = if time_limit_ms > 0 {
            Duration::from_millis(time_limit_ms as u64)
        } else {
            language.execute.timeout
        };

        let memory_bytes = if memory_limit_bytes > 0 {
            memory_limit_bytes as u64
        } else {
            language.execute.memory.as_u64()
        };

        Self {
            wall_clock,
            memory_bytes,
        }
    }
}

/// Execute stage
pub struct ExecuteStage {
    runner: Arc<dyn SandboxRunner>,
}

impl ExecuteStage {
    /// Create a new execute stage
    pub fn new(runner: Arc<dyn SandboxRunner>) -> Self {
        Self { runner }
    }

    /// Run all test cases against the artifact. The working directory is
    /// removed before returning, on every path; a retried message recompiles
    /// from scratch.
    pub async fn execute_all(
        &self,
        language: &LanguageConfig,
        workdir: &Path,
        program_path: &Path,
        limits: CaseLimits,
        test_cases: &[TestCase],
    ) -> ExecuteOutcome {
        let outcome = self
            .run_cases(language, workdir, program_path, limits, test_cases)
            .await;

        if let Err(e) = fs::remove_dir_all(workdir).await {
            tracing::warn!(workdir = %workdir.display(), error = %e, "failed to remove workdir");
        }

        outcome
    }

    async fn run_cases(
        &self,
        language: &LanguageConfig,
        workdir: &Path,
        program_path: &Path,
        limits: CaseLimits,
        test_cases: &[TestCase],
    ) -> ExecuteOutcome {
        let timeout_seconds = limits.wall_clock.as_secs().to_string();
        let argv = substitute_template(
            &language.execute.command_template,
            &[
                (PLACEHOLDER_PROGRAM, &program_path.display().to_string()),
                (PLACEHOLDER_TIMEOUT, &timeout_seconds),
            ],
        );

        for test_case in test_cases {
            let outcome = self
                .runner
                .run(RunRequest {
                    image: language.execute.image.clone(),
                    workdir_host: workdir.to_path_buf(),
                    workdir_container: workdir.to_path_buf(),
                    argv: argv.clone(),
                    limits: ResourceLimits {
                        wall_clock: limits.wall_clock,
                        memory_bytes: limits.memory_bytes,
                        cpu_share: language.execute.cpus,
                    },
                    stdin: Some(format!("{}\n", test_case.input)),
                })
                .await;

            match outcome.exit {
                ExitClass::TimeLimitExceeded => {
                    tracing::info!(test_case_id = test_case.id, "time limit exceeded");
                    return ExecuteOutcome::TimeLimitExceeded;
                }
                ExitClass::MemoryLimitExceeded => {
                    tracing::info!(test_case_id = test_case.id, "memory limit exceeded");
                    return ExecuteOutcome::MemoryLimitExceeded;
                }
                ExitClass::NonZero(code) => {
                    tracing::info!(test_case_id = test_case.id, code, "runtime error");
                    return ExecuteOutcome::RuntimeError;
                }
                ExitClass::Error(reason) => {
                    return ExecuteOutcome::Infra(reason);
                }
                ExitClass::Ok => {
                    if !outputs_match(&outcome.stdout, &test_case.output) {
                        tracing::info!(test_case_id = test_case.id, "wrong answer");
                        return ExecuteOutcome::WrongAnswer;
                    }
                }
            }
        }

        ExecuteOutcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::sandbox::{MockSandboxRunner, RunOutcome};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cpp_language() -> LanguageConfig {
        serde_yaml::from_str(
            r#"
value: cpp
name: C++
execute:
  image: gcc:14
  timeout: 1s
  memory: 256MB
  cpus: 1.0
  command_template: ["timeout", "$TIMEOUT", "$PROGRAM"]
"#,
        )
        .unwrap()
    }

    fn case(id: i64, input: &str, output: &str) -> TestCase {
        TestCase {
            id,
            of_problem_id: 1,
            input: input.to_string(),
            output: output.to_string(),
            is_hidden: false,
        }
    }

    fn limits() -> CaseLimits {
        CaseLimits {
            wall_clock: Duration::from_secs(1),
            memory_bytes: 128 * 1024 * 1024,
        }
    }

    fn workdir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[tokio::test]
    async fn test_all_cases_match_is_ok() {
        let temp = workdir();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(2).returning(|request| {
            let sum: i64 = request
                .stdin
                .unwrap()
                .split_whitespace()
                .map(|n| n.parse::<i64>().unwrap())
                .sum();
            RunOutcome {
                exit: ExitClass::Ok,
                stdout: sum.to_string(),
                stderr: String::new(),
            }
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "1 2", "3"), case(2, "10 20", "30")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::Ok);
    }

    #[tokio::test]
    async fn test_wrong_answer_stops_iteration() {
        let temp = workdir();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_mock = calls.clone();

        let mut runner = MockSandboxRunner::new();
        runner.expect_run().returning(move |_| {
            calls_in_mock.fetch_add(1, Ordering::SeqCst);
            RunOutcome {
                exit: ExitClass::Ok,
                stdout: "-1".to_string(),
                stderr: String::new(),
            }
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "1 2", "3"), case(2, "10 20", "30")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::WrongAnswer);
        // Only the first case ran
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_time_limit_stops_iteration() {
        let temp = workdir();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_mock = calls.clone();

        let mut runner = MockSandboxRunner::new();
        runner.expect_run().returning(move |_| {
            calls_in_mock.fetch_add(1, Ordering::SeqCst);
            RunOutcome {
                exit: ExitClass::TimeLimitExceeded,
                stdout: String::new(),
                stderr: String::new(),
            }
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "x", "y"), case(2, "x", "y"), case(3, "x", "y")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::TimeLimitExceeded);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_runtime_error() {
        let temp = workdir();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(1).returning(|_| RunOutcome {
            exit: ExitClass::NonZero(139),
            stdout: String::new(),
            stderr: "Segmentation fault".to_string(),
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "1 2", "3")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::RuntimeError);
    }

    #[tokio::test]
    async fn test_zero_cases_is_ok() {
        let temp = workdir();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().never();

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::Ok);
    }

    #[tokio::test]
    async fn test_trailing_whitespace_is_ignored_in_comparison() {
        let temp = workdir();
        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(1).returning(|_| RunOutcome {
            exit: ExitClass::Ok,
            stdout: "3".to_string(),
            stderr: String::new(),
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "1 2", "3  \n")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::Ok);
    }

    #[tokio::test]
    async fn test_stdin_gets_trailing_newline_and_timeout_substituted() {
        let temp = workdir();
        let mut runner = MockSandboxRunner::new();
        runner
            .expect_run()
            .times(1)
            .withf(|request: &RunRequest| {
                request.stdin.as_deref() == Some("1 2\n")
                    && request.argv[1] == "1"
                    && request.argv[2].ends_with("a.out")
            })
            .returning(|_| RunOutcome {
                exit: ExitClass::Ok,
                stdout: "3".to_string(),
                stderr: String::new(),
            });

        let stage = ExecuteStage::new(Arc::new(runner));
        let outcome = stage
            .execute_all(
                &cpp_language(),
                temp.path(),
                &temp.path().join("a.out"),
                limits(),
                &[case(1, "1 2", "3")],
            )
            .await;

        assert_eq!(outcome, ExecuteOutcome::Ok);
    }

    #[tokio::test]
    async fn test_workdir_removed_after_last_case() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("run");
        std::fs::create_dir_all(&workdir).unwrap();

        let mut runner = MockSandboxRunner::new();
        runner.expect_run().times(1).returning(|_| RunOutcome {
            exit: ExitClass::Ok,
            stdout: "3".to_string(),
            stderr: String::new(),
        });

        let stage = ExecuteStage::new(Arc::new(runner));
        stage
            .execute_all(
                &cpp_language(),
                &workdir,
                &workdir.join("a.out"),
                limits(),
                &[case(1, "1 2", "3")],
            )
            .await;

        assert!(!workdir.exists());
    }

    #[test]
    fn test_case_limits_prefer_problem_values() {
        let language = cpp_language();

        let from_problem = CaseLimits::for_problem(&language, 2_000, 64 * 1024 * 1024);
        assert_eq!(from_problem.wall_clock, Duration::from_secs(2));
        assert_eq!(from_problem.memory_bytes, 64 * 1024 * 1024);

        let fallback = CaseLimits::for_problem(&language, 0, 0);
        assert_eq!(fallback.wall_clock, Duration::from_secs(1));
        assert_eq!(fallback.memory_bytes, 256_000_000);
    }
}
