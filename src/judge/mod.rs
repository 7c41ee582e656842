//! Judge pipeline
//!
//! The path from a claimed submission to a verdict: resolve the language,
//! compile in a sandbox, execute each test case in a sandbox, reduce the
//! stage outcomes to a single result.

pub mod compile;
pub mod execute;
pub mod languages;
pub mod runner;
pub mod sandbox;
pub mod verdict;

pub use compile::{CompileOutcome, CompileStage};
pub use execute::{CaseLimits, ExecuteOutcome, ExecuteStage};
pub use languages::{substitute_template, LanguageRegistry};
pub use runner::JudgePipeline;
pub use sandbox::{DockerSandbox, ExitClass, ResourceLimits, RunOutcome, RunRequest, SandboxRunner};
pub use verdict::JudgeOutcome;
