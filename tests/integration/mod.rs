//! Integration tests module
//!
//! This module organizes all integration tests for the r-radiocli application.

pub mod commentary_test;
pub mod config_test;
pub mod orchestration_test;
pub mod plan_test;
