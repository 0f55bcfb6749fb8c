//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - kintone REST API
//! - netrc credential store
//! - Interactive terminal prompts
//! - Local settings file tree
//! - Diff viewer process

pub mod diff_viewer;
pub mod kintone;
pub mod netrc;
pub mod prompt;
pub mod store;

// Re-export commonly used types
pub use netrc::CredentialStore;
pub use prompt::{Prompter, TerminalPrompter};
