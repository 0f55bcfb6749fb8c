//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O.
//! Types and functions here can be unit tested without mocking.

pub mod app;
pub mod catalog;
pub mod descriptor;
pub mod layout;
pub mod masking;
pub mod recovery;
pub mod request;

// Re-export commonly used types
pub use app::{AppId, AppSpec};
