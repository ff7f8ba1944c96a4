//! Integration tests for sysdump
//!
//! These tests drive the manager over a real entry directory and mock
//! host collaborators.

#[path = "../common/mod.rs"]
pub mod common;

pub mod invariants;
pub mod notify_flow;
pub mod restore_flow;
pub mod shared_directory;
