//! Submission model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub of_problem_id: i64,
    pub author_id: i64,
    #[serde(skip_serializing)]
    pub content: String,
    pub language: String,
    pub status: i16,
    pub result: i16,
}

impl Submission {
    /// Typed view of the stored status value
    pub fn status(&self) -> Option<SubmissionStatus> {
        SubmissionStatus::from_i16(self.status)
    }

    /// Typed view of the stored result value
    pub fn result(&self) -> Option<SubmissionResult> {
        SubmissionResult::from_i16(self.result)
    }
}

/// Submission lifecycle status. Transitions are monotone:
/// `Submitted -> Executing -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Submitted,
    Executing,
    Finished,
}

impl SubmissionStatus {
    /// Stable wire value stored in the database
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Submitted => 1,
            Self::Executing => 2,
            Self::Finished => 3,
        }
    }

    /// Parse a stored wire value
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::Submitted),
            2 => Some(Self::Executing),
            3 => Some(Self::Finished),
            _ => None,
        }
    }

    /// Whether moving to `next` respects the monotone lifecycle chain
    pub fn can_transition(&self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Executing) | (Self::Executing, Self::Finished)
        )
    }
}

/// Final verdict of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionResult {
    Undefined,
    Ok,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompileError,
    UnsupportedLanguage,
}

impl SubmissionResult {
    /// Stable wire value stored in the database
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::Undefined => 0,
            Self::Ok => 1,
            Self::WrongAnswer => 2,
            Self::TimeLimitExceeded => 3,
            Self::MemoryLimitExceeded => 4,
            Self::RuntimeError => 5,
            Self::CompileError => 6,
            Self::UnsupportedLanguage => 7,
        }
    }

    /// Parse a stored wire value
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Undefined),
            1 => Some(Self::Ok),
            2 => Some(Self::WrongAnswer),
            3 => Some(Self::TimeLimitExceeded),
            4 => Some(Self::MemoryLimitExceeded),
            5 => Some(Self::RuntimeError),
            6 => Some(Self::CompileError),
            7 => Some(Self::UnsupportedLanguage),
            _ => None,
        }
    }

    /// Short code used in logs and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::Undefined => "UD",
            Self::Ok => "OK",
            Self::WrongAnswer => "WA",
            Self::TimeLimitExceeded => "TLE",
            Self::MemoryLimitExceeded => "MLE",
            Self::RuntimeError => "RE",
            Self::CompileError => "CE",
            Self::UnsupportedLanguage => "UL",
        }
    }

    /// A `Finished` submission must never carry `Undefined`
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Undefined)
    }
}

impl std::fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(SubmissionStatus::Submitted.as_i16(), 1);
        assert_eq!(SubmissionStatus::Executing.as_i16(), 2);
        assert_eq!(SubmissionStatus::Finished.as_i16(), 3);

        for status in [
            SubmissionStatus::Submitted,
            SubmissionStatus::Executing,
            SubmissionStatus::Finished,
        ] {
            assert_eq!(SubmissionStatus::from_i16(status.as_i16()), Some(status));
        }
        assert_eq!(SubmissionStatus::from_i16(0), None);
    }

    #[test]
    fn test_result_wire_values() {
        assert_eq!(SubmissionResult::Undefined.as_i16(), 0);
        assert_eq!(SubmissionResult::Ok.as_i16(), 1);
        assert_eq!(SubmissionResult::WrongAnswer.as_i16(), 2);
        assert_eq!(SubmissionResult::TimeLimitExceeded.as_i16(), 3);
        assert_eq!(SubmissionResult::MemoryLimitExceeded.as_i16(), 4);
        assert_eq!(SubmissionResult::RuntimeError.as_i16(), 5);
        assert_eq!(SubmissionResult::CompileError.as_i16(), 6);
        assert_eq!(SubmissionResult::UnsupportedLanguage.as_i16(), 7);
    }

    #[test]
    fn test_status_transitions_are_monotone() {
        use SubmissionStatus::*;

        assert!(Submitted.can_transition(Executing));
        assert!(Executing.can_transition(Finished));

        // No skips, no reversals
        assert!(!Submitted.can_transition(Finished));
        assert!(!Executing.can_transition(Submitted));
        assert!(!Finished.can_transition(Submitted));
        assert!(!Finished.can_transition(Executing));
        assert!(!Finished.can_transition(Finished));
    }

    #[test]
    fn test_undefined_is_not_final() {
        assert!(!SubmissionResult::Undefined.is_final());
        assert!(SubmissionResult::Ok.is_final());
        assert!(SubmissionResult::UnsupportedLanguage.is_final());
    }
}
