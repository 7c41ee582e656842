//! OJS - Online Judge System
//!
//! This library provides the core of an online judge backend: accepting
//! submissions against programming problems, compiling and executing them in
//! isolated containers against per-problem test cases, and recording a
//! verdict.
//!
//! # Architecture
//!
//! The judge pipeline is the asynchronous path from an accepted submission to
//! a final verdict:
//! - **Intake** persists the submission and publishes its id to the broker
//! - **Dispatcher** consumes ids, claims each submission exactly once
//! - **Judge pipeline** compiles and executes inside sandboxed containers
//! - **State machine** walks `Submitted -> Executing -> Finished`

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod judge;
pub mod metrics;
pub mod models;
pub mod mq;
pub mod services;
pub mod utils;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
