//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// COMMAND TEMPLATE PLACEHOLDERS
// =============================================================================

/// Substituted with the source file path in compile command templates
pub const PLACEHOLDER_SOURCE: &str = "$SOURCE";

/// Substituted with the program (artifact) file path in compile and execute
/// command templates
pub const PLACEHOLDER_PROGRAM: &str = "$PROGRAM";

/// Substituted with the execute wall clock in integer seconds
pub const PLACEHOLDER_TIMEOUT: &str = "$TIMEOUT";

// =============================================================================
// SANDBOX
// =============================================================================

/// Exit code the container engine reports when the in-container timeout fires
pub const STATUS_CODE_TIME_LIMIT_EXCEEDED: i64 = 124;

/// Exit code reported when the kernel OOM-kills the contained process
pub const STATUS_CODE_MEMORY_LIMIT_EXCEEDED: i64 = 137;

/// CPU scheduler period; quota = cpu_share * period
pub const CPU_PERIOD_MICROS: i64 = 100_000;

/// Default root for per-run host working directories
pub const DEFAULT_WORKDIR_ROOT: &str = "/tmp/ojs-compile";

/// Suffix appended to the source file path to form the program path
pub const PROGRAM_FILE_SUFFIX: &str = ".out";

// =============================================================================
// MESSAGE QUEUE
// =============================================================================

/// Stream carrying ids of newly created submissions
pub const STREAM_SUBMISSION_CREATED: &str = "submission_created";

/// Consumer group the dispatchers join
pub const CONSUMER_GROUP_ID: &str = "ojs-consumer";

/// Field name holding the message payload in a stream entry
pub const MESSAGE_PAYLOAD_FIELD: &str = "payload";

/// Default XREADGROUP block timeout in milliseconds
pub const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 5_000;

/// Default idle time after which a pending message is claimed from a dead
/// consumer, in milliseconds
pub const DEFAULT_MIN_IDLE_FOR_CLAIM_MS: u64 = 60_000;

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// AUTHENTICATION DEFAULTS
// =============================================================================

/// Default bearer token expiry in hours
pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;

// =============================================================================
// METRICS
// =============================================================================

/// Default port for the Prometheus metrics endpoint
pub const DEFAULT_METRICS_PORT: u16 = 9091;

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Layered permission names; a granted prefix implies any longer name
pub mod permissions {
    pub const ACCOUNTS_READ_SELF: &str = "accounts:read:self";
    pub const ACCOUNTS_WRITE_SELF: &str = "accounts:write:self";
    pub const ACCOUNTS_READ_ALL: &str = "accounts:read";
    pub const ACCOUNTS_WRITE_ALL: &str = "accounts:write";

    pub const PROBLEMS_READ_SELF: &str = "problems:read:self";
    pub const PROBLEMS_WRITE_SELF: &str = "problems:write:self";
    pub const PROBLEMS_READ_ALL: &str = "problems:read";
    pub const PROBLEMS_WRITE_ALL: &str = "problems:write";

    pub const TEST_CASES_READ_SELF: &str = "testcases:read:self";
    pub const TEST_CASES_WRITE_SELF: &str = "testcases:write:self";
    pub const TEST_CASES_READ_ALL: &str = "testcases:read";
    pub const TEST_CASES_WRITE_ALL: &str = "testcases:write";

    pub const SUBMISSIONS_READ_SELF: &str = "submissions:read:self";
    pub const SUBMISSIONS_WRITE_SELF: &str = "submissions:write:self";
    pub const SUBMISSIONS_READ_ALL: &str = "submissions:read";
    pub const SUBMISSIONS_WRITE_ALL: &str = "submissions:write";
}
