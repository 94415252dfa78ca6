//! Integration tests for the yalc library flows and CLI.

pub mod cli;
pub mod common;
pub mod workflow;
