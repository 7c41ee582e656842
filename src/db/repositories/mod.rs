//! Database repositories
//!
//! Every operation takes an `impl PgExecutor`, so the same repository call
//! runs in auto-commit mode against the pool or inside a caller-managed
//! transaction scope.

pub mod account_repo;
pub mod problem_repo;
pub mod submission_repo;
pub mod test_case_repo;

pub use account_repo::AccountRepository;
pub use problem_repo::ProblemRepository;
pub use submission_repo::SubmissionRepository;
pub use test_case_repo::TestCaseRepository;
