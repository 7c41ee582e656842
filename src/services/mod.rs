//! Business logic services

pub mod auth_service;
pub mod role_service;
pub mod submission_service;

pub use auth_service::{AuthService, Claims};
pub use role_service::RoleService;
pub use submission_service::{CreateSubmissionInput, SubmissionService};
