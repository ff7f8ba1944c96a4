//! Shared test utilities for sysdump
//!
//! Provides a throwaway entry directory plus mock host collaborators so
//! integration tests can open, drop and reopen a manager over real files.

pub mod fixtures;

pub use fixtures::TestEnv;
