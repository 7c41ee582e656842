//! Domain models

pub mod account;
pub mod problem;
pub mod submission;
pub mod test_case;

pub use account::{Account, Role};
pub use problem::Problem;
pub use submission::{Submission, SubmissionResult, SubmissionStatus};
pub use test_case::TestCase;
