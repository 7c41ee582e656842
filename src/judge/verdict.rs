//! Verdict reduction
//!
//! Pure mapping from stage outcomes to the submission result alphabet.
//! Infrastructure failures never become verdicts; they surface as a retry
//! signal and the dispatcher leaves the message unacknowledged.

use crate::judge::compile::CompileOutcome;
use crate::judge::execute::ExecuteOutcome;
use crate::models::SubmissionResult;

/// What the judge pipeline decided for a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeOutcome {
    /// A final verdict to persist
    Verdict(SubmissionResult),
    /// Do not finalize; rely on message redelivery
    Retry(String),
}

/// Verdict for a submission whose language is not configured
pub fn unsupported_language() -> JudgeOutcome {
    JudgeOutcome::Verdict(SubmissionResult::UnsupportedLanguage)
}

/// Reduce the compile stage outcome. `None` means compilation produced an
/// artifact and judging proceeds to the execute stage.
pub fn reduce_compile(outcome: &CompileOutcome) -> Option<JudgeOutcome> {
    match outcome {
        CompileOutcome::Artifact { .. } => None,
        CompileOutcome::CompileError { .. } => {
            Some(JudgeOutcome::Verdict(SubmissionResult::CompileError))
        }
        CompileOutcome::Infra(reason) => Some(JudgeOutcome::Retry(reason.clone())),
    }
}

/// Reduce the execute stage outcome to the final judgment
pub fn reduce_execute(outcome: &ExecuteOutcome) -> JudgeOutcome {
    match outcome {
        ExecuteOutcome::Ok => JudgeOutcome::Verdict(SubmissionResult::Ok),
        ExecuteOutcome::WrongAnswer => JudgeOutcome::Verdict(SubmissionResult::WrongAnswer),
        ExecuteOutcome::TimeLimitExceeded => {
            JudgeOutcome::Verdict(SubmissionResult::TimeLimitExceeded)
        }
        ExecuteOutcome::MemoryLimitExceeded => {
            JudgeOutcome::Verdict(SubmissionResult::MemoryLimitExceeded)
        }
        ExecuteOutcome::RuntimeError => JudgeOutcome::Verdict(SubmissionResult::RuntimeError),
        ExecuteOutcome::Infra(reason) => JudgeOutcome::Retry(reason.clone()),
    }
}
